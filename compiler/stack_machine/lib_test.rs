use compiler__block_graph::BlockGraphBuilder;
use compiler__instruction_set::{
    Branching, CodeLocation, Comparison, Constant, Final, Instruction, Sequential,
};
use compiler__linearizer::linearize;
use compiler__program_model::{
    BinaryOperator, ClassId, CodeId, Command, Expression, Literal, ProgramModel,
    ProgramModelBuilder, Type,
};
use compiler__reachability::close_program;
use compiler__reports::CompilerFailureKind;
use compiler__source::Span;
use compiler__stack_assembly::{AssembledProgram, AssemblyBuilder, assemble_program, cleanup};
use compiler__stack_machine::{MAX_ARRAY_LENGTH, ProgramResult, execute};
use tests__program_fixtures::{
    array_program, assign_field, binary, block, call, counter_program, declare, dispatch_program,
    field, int, local, new_object, return_value, sum_loop_program, this,
};

fn assemble(model: &ProgramModel, main: ClassId, run: CodeId) -> AssembledProgram {
    let mut entries = vec![run];
    entries.extend(model.zero_argument_constructor(main));
    let closed = close_program(model, &entries).unwrap();
    assemble_program(model, &closed).unwrap()
}

/// `class Main { <return type> run() { <body> } }`; the body builder may add
/// further classes.
fn single_method_program(
    return_type: Type,
    body: impl FnOnce(&mut ProgramModelBuilder) -> Command,
) -> AssembledProgram {
    let mut builder = ProgramModelBuilder::new();
    let object = builder.object_class();
    let main = builder.add_class("Main", object);
    let run = builder.add_method(main, "run", Vec::new(), return_type);
    let command = body(&mut builder);
    builder.set_body(run, command);
    let model = builder.finish();
    assemble(&model, main, run)
}

/// Runs `Main.run` with its body replaced by a hand-built graph that pushes
/// `left` and `right`, tests `condition` and returns 1 when it holds and 0
/// otherwise.
fn float_branch_result(condition: Branching, left: f32, right: f32) -> ProgramResult {
    let mut builder = ProgramModelBuilder::new();
    let object = builder.object_class();
    let main = builder.add_class("Main", object);
    let run = builder.add_method(main, "run", Vec::new(), Type::Int);
    builder.set_body(run, return_value(int(0)));
    let model = builder.finish();
    let mut program = assemble(&model, main, run);

    let location = CodeLocation::new(run, Span::synthesized());
    let constant = |constant: Constant| Instruction::new(Sequential::Constant(constant), location);
    let mut graph = BlockGraphBuilder::new(run);
    let exit = graph.final_block(Instruction::new(
        Final::ReturnValue {
            value_type: Type::Int,
        },
        location,
    ));
    let yes = graph.prefix(constant(Constant::Int(1)), exit);
    let no = graph.prefix(constant(Constant::Int(0)), exit);
    let test = graph.branch_block(Instruction::new(condition, location), yes, no);
    let entry = graph.prefix_all(
        vec![
            constant(Constant::float(left)),
            constant(Constant::float(right)),
        ],
        test,
    );
    let graph = graph.finish(entry).unwrap();

    let mut emitter = AssemblyBuilder::new(&model, run);
    linearize(&graph, &mut emitter);
    let instructions = cleanup(emitter.finish().unwrap());
    let main_class = program
        .classes
        .iter_mut()
        .find(|class| class.name == "Main")
        .unwrap();
    let run_member = main_class
        .methods
        .iter_mut()
        .find(|method| method.name == "run")
        .unwrap();
    run_member.instructions = instructions;
    execute(&program).unwrap()
}

#[test]
fn fixtures_execute_to_their_expected_results() {
    let sum = sum_loop_program();
    assert_eq!(
        execute(&assemble(&sum.model, sum.main, sum.run)).unwrap(),
        ProgramResult::Int(3)
    );

    let dispatch = dispatch_program();
    assert_eq!(
        execute(&assemble(&dispatch.model, dispatch.main, dispatch.run)).unwrap(),
        ProgramResult::Int(105)
    );

    let counter = counter_program();
    assert_eq!(
        execute(&assemble(&counter.model, counter.main, counter.run)).unwrap(),
        ProgramResult::Int(7)
    );

    let arrays = array_program();
    assert_eq!(
        execute(&assemble(&arrays.model, arrays.main, arrays.run)).unwrap(),
        ProgramResult::Int(10)
    );
}

#[test]
fn entry_constructor_runs_before_the_entry_method() {
    let mut builder = ProgramModelBuilder::new();
    let object = builder.object_class();
    let main = builder.add_class("Main", object);
    let seed = builder.add_field(main, "seed", Type::Int);
    let constructor = builder.add_constructor(main, Vec::new());
    builder.set_body(constructor, assign_field(this(main), seed, int(41)));
    let run = builder.add_method(main, "run", Vec::new(), Type::Int);
    builder.set_body(
        run,
        return_value(binary(
            BinaryOperator::Add,
            field(this(main), seed),
            int(1),
            Type::Int,
        )),
    );
    let model = builder.finish();

    assert_eq!(
        execute(&assemble(&model, main, run)).unwrap(),
        ProgramResult::Int(42)
    );
}

#[test]
fn boolean_results_render_as_booleans() {
    let assembled = single_method_program(Type::Boolean, |_| {
        return_value(binary(BinaryOperator::Less, int(3), int(4), Type::Int))
    });
    let result = execute(&assembled).unwrap();
    assert_eq!(result, ProgramResult::Boolean(true));
    assert_eq!(result.to_string(), "true");
}

#[test]
fn division_by_zero_is_a_run_failure() {
    let assembled = single_method_program(Type::Int, |_| {
        block(vec![
            declare(1, Type::Int, int(0)),
            return_value(binary(
                BinaryOperator::Divide,
                int(1),
                local(1, Type::Int),
                Type::Int,
            )),
        ])
    });
    let failure = execute(&assembled).unwrap_err();
    assert_eq!(failure.kind, CompilerFailureKind::RunFailed);
    assert_eq!(failure.message, "division by zero");
    assert_eq!(failure.member.as_deref(), Some("Main.run()I"));
}

#[test]
fn nil_receivers_are_rejected() {
    let assembled = single_method_program(Type::Int, |builder| {
        let object = builder.object_class();
        let holder = builder.add_class("Holder", object);
        let value = builder.add_field(holder, "value", Type::Int);
        let nil = Expression::Literal {
            literal: Literal::Nil,
            span: Span::synthesized(),
        };
        block(vec![
            declare(1, Type::Class(holder), nil),
            return_value(field(local(1, Type::Class(holder)), value)),
        ])
    });
    let failure = execute(&assembled).unwrap_err();
    assert_eq!(failure.message, "nil dereference");
}

#[test]
fn array_indices_are_bounds_checked() {
    let assembled = single_method_program(Type::Int, |builder| {
        let int_array = builder.array_of(Type::Int);
        block(vec![
            declare(
                1,
                int_array,
                Expression::NewArray {
                    array_type: int_array,
                    size: Box::new(int(2)),
                    span: Span::synthesized(),
                },
            ),
            return_value(Expression::ArrayElement {
                array: Box::new(local(1, int_array)),
                index: Box::new(int(5)),
                element_type: Type::Int,
                span: Span::synthesized(),
            }),
        ])
    });
    let failure = execute(&assembled).unwrap_err();
    assert_eq!(failure.message, "index 5 out of bounds for length 2");
}

#[test]
fn oversized_arrays_fail_the_run_before_allocating() {
    let assembled = single_method_program(Type::Int, |builder| {
        let int_array = builder.array_of(Type::Int);
        return_value(Expression::ArrayLength {
            array: Box::new(Expression::NewArray {
                array_type: int_array,
                size: Box::new(int(2_000_000_000)),
                span: Span::synthesized(),
            }),
            span: Span::synthesized(),
        })
    });
    let failure = execute(&assembled).unwrap_err();
    assert_eq!(failure.kind, CompilerFailureKind::RunFailed);
    assert_eq!(
        failure.message,
        format!("array length 2000000000 exceeds the maximum of {MAX_ARRAY_LENGTH}")
    );
    assert_eq!(failure.member.as_deref(), Some("Main.run()I"));
}

#[test]
fn failed_downcasts_are_reported() {
    let assembled = single_method_program(Type::Int, |builder| {
        let object = builder.object_class();
        let shape = builder.add_class("Shape", object);
        let square = builder.add_class("Square", shape);
        let circle = builder.add_class("Circle", shape);
        let square_constructor = builder.add_constructor(square, Vec::new());
        block(vec![
            declare(
                1,
                Type::Class(shape),
                new_object(square, square_constructor, Vec::new()),
            ),
            declare(
                2,
                Type::Class(circle),
                Expression::Cast {
                    expression: Box::new(local(1, Type::Class(shape))),
                    from: Type::Class(shape),
                    into: Type::Class(circle),
                    span: Span::synthesized(),
                },
            ),
            return_value(int(1)),
        ])
    });
    let failure = execute(&assembled).unwrap_err();
    assert_eq!(failure.message, "cannot cast Square to Circle");
}

#[test]
fn unbounded_recursion_exceeds_the_call_depth() {
    let mut builder = ProgramModelBuilder::new();
    let object = builder.object_class();
    let main = builder.add_class("Main", object);
    let spin = builder.add_method(main, "spin", Vec::new(), Type::Int);
    builder.set_body(spin, return_value(call(this(main), main, spin, Vec::new())));
    let run = builder.add_method(main, "run", Vec::new(), Type::Int);
    builder.set_body(run, return_value(call(this(main), main, spin, Vec::new())));
    let model = builder.finish();

    let failure = execute(&assemble(&model, main, run)).unwrap_err();
    assert_eq!(failure.message, "call depth exceeded 1024 frames");
    assert_eq!(failure.member.as_deref(), Some("Main.spin()I"));
}

#[test]
fn missing_entry_method_is_unlinked() {
    let sum = sum_loop_program();
    let mut assembled = assemble(&sum.model, sum.main, sum.run);
    assembled.entry.name = "missing".to_string();

    let failure = execute(&assembled).unwrap_err();
    assert_eq!(failure.kind, CompilerFailureKind::RunFailed);
    assert_eq!(failure.message, "unlinked member Main.missing()I");
}

#[test]
fn float_branch_and_its_negation_split_nan_operands() {
    for comparison in [
        Comparison::Less,
        Comparison::LessOrEqual,
        Comparison::Greater,
        Comparison::GreaterOrEqual,
        Comparison::Equal,
        Comparison::NotEqual,
    ] {
        let condition = Branching::compare(comparison, Type::Float);
        let negated = condition.negate();
        let (holds, complement) = if comparison == Comparison::NotEqual {
            (1, 0)
        } else {
            (0, 1)
        };
        assert_eq!(
            float_branch_result(condition, f32::NAN, 0.0),
            ProgramResult::Int(holds),
            "{comparison:?}"
        );
        assert_eq!(
            float_branch_result(negated, f32::NAN, 0.0),
            ProgramResult::Int(complement),
            "negated {comparison:?}"
        );
    }

    let less = Branching::compare(Comparison::Less, Type::Float);
    assert_eq!(
        float_branch_result(less.clone(), -1.0, 0.0),
        ProgramResult::Int(1)
    );
    assert_eq!(
        float_branch_result(less.negate(), -1.0, 0.0),
        ProgramResult::Int(0)
    );
}
