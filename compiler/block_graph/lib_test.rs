use compiler__block_graph::{
    Block, BlockExit, BlockGraph, BlockGraphBuilder, BlockId, verify_branches,
    verify_stack_heights,
};
use compiler__instruction_set::{
    ArithmeticOperator, Branching, CodeLocation, Comparison, Constant, Final, Instruction,
    Sequential, SequentialInstruction,
};
use compiler__program_model::{CodeId, ProgramModel, ProgramModelBuilder, Type};
use compiler__reports::CompilerFailureKind;
use compiler__source::Span;

fn model_with_method() -> (ProgramModel, CodeId) {
    let mut builder = ProgramModelBuilder::new();
    let object = builder.object_class();
    let main = builder.add_class("Main", object);
    let code = builder.add_method(main, "run", Vec::new(), Type::Int);
    (builder.finish(), code)
}

fn location(code: CodeId) -> CodeLocation {
    CodeLocation::new(code, Span::synthesized())
}

fn constant(code: CodeId, value: i32) -> SequentialInstruction {
    Instruction::new(Sequential::Constant(Constant::Int(value)), location(code))
}

fn int_return(code: CodeId) -> Instruction<Final> {
    Instruction::new(
        Final::ReturnValue {
            value_type: Type::Int,
        },
        location(code),
    )
}

#[test]
fn structurally_equal_blocks_are_shared() {
    let code = CodeId(0);
    let mut builder = BlockGraphBuilder::new(code);
    let first = builder.final_block(Instruction::new(Final::Return, location(code)));
    let second = builder.final_block(Instruction::new(
        Final::Return,
        CodeLocation::new(code, Span::new(10, 16, 3, 5)),
    ));
    assert_eq!(first, second);

    builder.do_not_merge(first);
    let third = builder.final_block(Instruction::new(Final::Return, location(code)));
    assert_ne!(first, third);
}

#[test]
fn prefixing_copies_mergeable_blocks_and_precedes_the_others() {
    let (model, code) = model_with_method();
    let mut builder = BlockGraphBuilder::new(code);
    let exit = builder.final_block(int_return(code));
    let mergeable = builder.prefix(constant(code, 1), exit);
    assert_ne!(mergeable, exit);
    assert!(builder.is_mergeable(mergeable));

    builder.do_not_merge(mergeable);
    let entry = builder.prefix_all(
        vec![
            constant(code, 2),
            Instruction::new(Sequential::Pop { value_type: Type::Int }, location(code)),
        ],
        mergeable,
    );
    let graph = builder.finish(entry).unwrap();

    assert_eq!(graph.len(), 2);
    let entry_block = graph.block(graph.entry());
    assert_eq!(entry_block.instructions.len(), 2);
    assert_eq!(entry_block.exit, BlockExit::Follow(BlockId(1)));
    assert_eq!(graph.block(BlockId(1)).instructions, vec![constant(code, 1)]);
    assert!(!graph.block(BlockId(1)).mergeable);
    assert_eq!(verify_stack_heights(&model, &graph).unwrap(), vec![0, 0]);
}

#[test]
fn prefixing_a_mergeable_block_keeps_its_exit() {
    let code = CodeId(0);
    let mut builder = BlockGraphBuilder::new(code);
    let exit = builder.final_block(int_return(code));
    let one = builder.prefix(constant(code, 1), exit);
    let two = builder.prefix(constant(code, 2), one);
    let graph = builder.finish(two).unwrap();

    assert_eq!(graph.len(), 1);
    assert_eq!(
        graph.block(graph.entry()).instructions,
        vec![constant(code, 2), constant(code, 1)]
    );
    assert_eq!(graph.block(graph.entry()).exit, BlockExit::Final(int_return(code)));
}

#[test]
fn branch_with_equal_successors_pops_its_operands() {
    let (model, code) = model_with_method();
    let mut builder = BlockGraphBuilder::new(code);
    let exit = builder.final_block(int_return(code));
    let target = builder.prefix(constant(code, 0), exit);
    let test = builder.branch_block(
        Instruction::new(
            Branching::compare(Comparison::Less, Type::Int),
            location(code),
        ),
        target,
        target,
    );
    let entry = builder.prefix_all(vec![constant(code, 1), constant(code, 2)], test);
    let graph = builder.finish(entry).unwrap();

    let pops = graph
        .sequential_instructions()
        .filter(|instruction| matches!(instruction.kind, Sequential::Pop { .. }))
        .count();
    assert_eq!(pops, 2);
    assert!(
        graph
            .block_ids()
            .all(|block_id| !matches!(graph.block(block_id).exit, BlockExit::Branch { .. }))
    );
    verify_branches(&model, &graph).unwrap();
    verify_stack_heights(&model, &graph).unwrap();
}

#[test]
fn finishing_keeps_reachable_blocks_in_discovery_order() {
    let code = CodeId(0);
    let mut builder = BlockGraphBuilder::new(code);
    let _unused = builder.final_block(Instruction::new(Final::Return, location(code)));
    let exit = builder.final_block(int_return(code));
    builder.do_not_merge(exit);
    let yes = builder.prefix(constant(code, 1), exit);
    let no = builder.prefix(constant(code, 2), exit);
    let test = builder.branch_block(
        Instruction::new(Branching::IfTrue, location(code)),
        yes,
        no,
    );
    let entry = builder.prefix(
        Instruction::new(Sequential::Constant(Constant::Boolean(true)), location(code)),
        test,
    );
    assert!(builder.allocated_block_count() > 4);
    let graph = builder.finish(entry).unwrap();

    assert_eq!(graph.len(), 4);
    assert_eq!(graph.entry(), BlockId(0));
    assert!(
        graph
            .block_ids()
            .all(|block_id| graph.block(block_id).exit
                != BlockExit::Final(Instruction::new(Final::Return, location(code))))
    );
    let BlockExit::Branch { yes, no, .. } = &graph.block(graph.entry()).exit else {
        panic!("entry must branch");
    };
    assert_eq!((*yes, *no), (BlockId(1), BlockId(2)));
    assert_eq!(graph.join_points().into_iter().collect::<Vec<_>>(), vec![BlockId(3)]);
}

#[test]
fn pivots_close_exactly_one_cycle() {
    let (model, code) = model_with_method();
    let mut builder = BlockGraphBuilder::new(code);
    let pivot = builder.new_pivot();
    let exit = builder.final_block(int_return(code));
    let after = builder.prefix(constant(code, 7), exit);
    let body = builder.prefix_all(
        vec![
            Instruction::new(Sequential::Load { slot: 1, value_type: Type::Int }, location(code)),
            constant(code, 1),
            Instruction::new(
                Sequential::Arithmetic {
                    operator: ArithmeticOperator::Add,
                    operand_type: Type::Int,
                },
                location(code),
            ),
            Instruction::new(Sequential::Store { slot: 1, value_type: Type::Int }, location(code)),
        ],
        pivot,
    );
    let test = builder.branch_block(
        Instruction::new(
            Branching::compare(Comparison::Less, Type::Int),
            location(code),
        ),
        body,
        after,
    );
    let test = builder.prefix_all(
        vec![
            Instruction::new(Sequential::Load { slot: 1, value_type: Type::Int }, location(code)),
            constant(code, 3),
        ],
        test,
    );
    builder.do_not_merge(test);
    builder.link_pivot(pivot, test);
    let entry = builder.prefix_all(
        vec![
            constant(code, 0),
            Instruction::new(Sequential::Store { slot: 1, value_type: Type::Int }, location(code)),
        ],
        test,
    );
    let graph = builder.finish(entry).unwrap();

    let back_edges = graph.back_edges();
    assert_eq!(back_edges.len(), 1);
    let (_, loop_head) = back_edges[0];
    assert!(matches!(
        graph.block(loop_head).exit,
        BlockExit::Branch { .. }
    ));
    verify_branches(&model, &graph).unwrap();
    verify_stack_heights(&model, &graph).unwrap();
}

#[test]
fn reachable_unlinked_pivot_is_an_invariant_violation() {
    let code = CodeId(0);
    let mut builder = BlockGraphBuilder::new(code);
    let pivot = builder.new_pivot();
    let entry = builder.prefix(constant(code, 1), pivot);
    let failure = builder.finish(entry).unwrap_err();
    assert_eq!(failure.kind, CompilerFailureKind::UnlinkedPivot);
    assert!(failure.kind.is_invariant_violation());
}

#[test]
fn unbalanced_stack_is_reported_with_the_member() {
    let (model, code) = model_with_method();
    let mut builder = BlockGraphBuilder::new(code);
    let exit = builder.final_block(int_return(code));
    let entry = builder.prefix_all(vec![constant(code, 1), constant(code, 2)], exit);
    let graph = builder.finish(entry).unwrap();

    let failure = verify_stack_heights(&model, &graph).unwrap_err();
    assert_eq!(failure.kind, CompilerFailureKind::StackImbalance);
    assert_eq!(failure.member.as_deref(), Some("Main.run(): int"));
    assert_eq!(failure.message, "`return int` leaves 1 values on the stack");
}

#[test]
fn branch_into_one_block_on_both_outcomes_is_malformed() {
    let (model, code) = model_with_method();
    let test = Block {
        instructions: vec![
            Instruction::new(Sequential::Constant(Constant::Boolean(true)), location(code)),
        ],
        exit: BlockExit::Branch {
            condition: Instruction::new(
                Branching::IfTrue,
                CodeLocation::new(code, Span::new(20, 24, 2, 9)),
            ),
            yes: BlockId(1),
            no: BlockId(1),
        },
        mergeable: true,
    };
    let exit = Block {
        instructions: vec![constant(code, 4)],
        exit: BlockExit::Final(int_return(code)),
        mergeable: true,
    };
    let graph = BlockGraph::from_blocks(code, vec![test, exit]);

    verify_stack_heights(&model, &graph).unwrap();
    let failure = verify_branches(&model, &graph).unwrap_err();
    assert_eq!(failure.kind, CompilerFailureKind::MalformedBranch);
    assert!(failure.kind.is_invariant_violation());
    assert_eq!(failure.member.as_deref(), Some("Main.run(): int"));
    assert_eq!(failure.span, Some(Span::new(20, 24, 2, 9)));
    assert_eq!(
        failure.message,
        "`if_true` in block 0 continues into block 1 on both outcomes"
    );
}
