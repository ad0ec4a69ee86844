use compiler__program_model::{
    AssignmentTarget, BinaryOperator, ClassId, CodeId, Command, Expression, FieldId, Literal,
    ProgramModel, ProgramModelBuilder, Type, UnaryOperator,
};
use compiler__source::Span;

#[must_use]
pub fn int(value: i32) -> Expression {
    Expression::Literal {
        literal: Literal::Int { value },
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn boolean(value: bool) -> Expression {
    Expression::Literal {
        literal: Literal::Boolean { value },
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn local(slot: u16, variable_type: Type) -> Expression {
    Expression::Variable {
        slot,
        variable_type,
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn this(class: ClassId) -> Expression {
    local(0, Type::Class(class))
}

#[must_use]
pub fn binary(
    operator: BinaryOperator,
    left: Expression,
    right: Expression,
    operand_type: Type,
) -> Expression {
    Expression::Binary {
        operator,
        left: Box::new(left),
        right: Box::new(right),
        operand_type,
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn not(operand: Expression) -> Expression {
    Expression::Unary {
        operator: UnaryOperator::Not,
        operand: Box::new(operand),
        operand_type: Type::Boolean,
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn field(receiver: Expression, field: FieldId) -> Expression {
    Expression::FieldAccess {
        receiver: Box::new(receiver),
        field,
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn call(
    receiver: Expression,
    receiver_class: ClassId,
    method: CodeId,
    arguments: Vec<Expression>,
) -> Expression {
    Expression::MethodCall {
        receiver: Box::new(receiver),
        receiver_class,
        method,
        arguments,
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn new_object(class: ClassId, constructor: CodeId, arguments: Vec<Expression>) -> Expression {
    Expression::NewObject {
        class,
        constructor,
        arguments,
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn declare(slot: u16, variable_type: Type, initializer: Expression) -> Command {
    Command::LocalDeclaration {
        slot,
        variable_type,
        initializer,
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn assign(slot: u16, variable_type: Type, value: Expression) -> Command {
    Command::Assignment {
        target: AssignmentTarget::Variable {
            slot,
            variable_type,
        },
        value,
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn assign_field(receiver: Expression, field: FieldId, value: Expression) -> Command {
    Command::Assignment {
        target: AssignmentTarget::Field {
            receiver: Box::new(receiver),
            field,
        },
        value,
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn assign_element(
    array: Expression,
    index: Expression,
    element_type: Type,
    value: Expression,
) -> Command {
    Command::Assignment {
        target: AssignmentTarget::ArrayElement {
            array: Box::new(array),
            index: Box::new(index),
            element_type,
        },
        value,
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn if_else(condition: Expression, then_branch: Command, else_branch: Command) -> Command {
    Command::If {
        condition,
        then_branch: Box::new(then_branch),
        else_branch: Box::new(else_branch),
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn while_loop(condition: Expression, body: Command) -> Command {
    Command::While {
        condition,
        body: Box::new(body),
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn for_loop(
    initialization: Command,
    condition: Expression,
    update: Command,
    body: Command,
) -> Command {
    Command::For {
        initialization: Box::new(initialization),
        condition,
        update: Box::new(update),
        body: Box::new(body),
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn block(commands: Vec<Command>) -> Command {
    Command::Block {
        commands,
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn return_value(value: Expression) -> Command {
    Command::Return {
        value: Some(value),
        span: Span::synthesized(),
    }
}

#[must_use]
pub fn call_command(
    receiver: Expression,
    receiver_class: ClassId,
    method: CodeId,
    arguments: Vec<Expression>,
) -> Command {
    Command::MethodCall {
        receiver,
        receiver_class,
        method,
        arguments,
        span: Span::synthesized(),
    }
}

pub struct SumLoopProgram {
    pub model: ProgramModel,
    pub main: ClassId,
    pub run: CodeId,
}

/// ```text
/// class Main {
///     int run() {
///         int sum = 0;
///         for (int i = 0; i < 3; i = i + 1) sum = sum + i;
///         return sum;
///     }
/// }
/// ```
#[must_use]
pub fn sum_loop_program() -> SumLoopProgram {
    let mut builder = ProgramModelBuilder::new();
    let object = builder.object_class();
    let main = builder.add_class("Main", object);
    let run = builder.add_method(main, "run", Vec::new(), Type::Int);
    let sum = 1;
    let i = 2;
    builder.set_body(
        run,
        block(vec![
            declare(sum, Type::Int, int(0)),
            for_loop(
                declare(i, Type::Int, int(0)),
                binary(BinaryOperator::Less, local(i, Type::Int), int(3), Type::Int),
                assign(
                    i,
                    Type::Int,
                    binary(BinaryOperator::Add, local(i, Type::Int), int(1), Type::Int),
                ),
                assign(
                    sum,
                    Type::Int,
                    binary(
                        BinaryOperator::Add,
                        local(sum, Type::Int),
                        local(i, Type::Int),
                        Type::Int,
                    ),
                ),
            ),
            return_value(local(sum, Type::Int)),
        ]),
    );
    SumLoopProgram {
        model: builder.finish(),
        main,
        run,
    }
}

pub struct DispatchProgram {
    pub model: ProgramModel,
    pub main: ClassId,
    pub run: CodeId,
    pub a: ClassId,
    pub b: ClassId,
    pub c: ClassId,
    pub d: ClassId,
    pub a_m: CodeId,
    pub b_m: CodeId,
    pub c_m: CodeId,
}

/// `A` declares `m`, `B` and `C` override it and `D` inherits it.
///
/// ```text
/// class Main {
///     int run() {
///         A x = new C();
///         return x.m(5);
///     }
/// }
/// ```
///
/// `A.m` returns its argument, `B.m` twice its argument and `C.m` its
/// argument plus 100.
#[must_use]
pub fn dispatch_program() -> DispatchProgram {
    let mut builder = ProgramModelBuilder::new();
    let object = builder.object_class();
    let a = builder.add_class("A", object);
    let b = builder.add_class("B", a);
    let c = builder.add_class("C", a);
    let d = builder.add_class("D", a);
    let main = builder.add_class("Main", object);
    let [_, _, c_constructor, _] =
        [a, b, c, d].map(|class| builder.add_constructor(class, Vec::new()));

    let a_m = builder.add_method(a, "m", vec![Type::Int], Type::Int);
    let b_m = builder.add_method(b, "m", vec![Type::Int], Type::Int);
    let c_m = builder.add_method(c, "m", vec![Type::Int], Type::Int);
    builder.set_body(a_m, return_value(local(1, Type::Int)));
    builder.set_body(
        b_m,
        return_value(binary(
            BinaryOperator::Multiply,
            local(1, Type::Int),
            int(2),
            Type::Int,
        )),
    );
    builder.set_body(
        c_m,
        return_value(binary(
            BinaryOperator::Add,
            local(1, Type::Int),
            int(100),
            Type::Int,
        )),
    );

    let run = builder.add_method(main, "run", Vec::new(), Type::Int);
    builder.set_body(
        run,
        block(vec![
            declare(1, Type::Class(a), new_object(c, c_constructor, Vec::new())),
            return_value(call(local(1, Type::Class(a)), a, a_m, vec![int(5)])),
        ]),
    );

    DispatchProgram {
        model: builder.finish(),
        main,
        run,
        a,
        b,
        c,
        d,
        a_m,
        b_m,
        c_m,
    }
}

pub struct CounterProgram {
    pub model: ProgramModel,
    pub main: ClassId,
    pub run: CodeId,
    pub counter: ClassId,
    pub count: FieldId,
    pub unused: FieldId,
    pub add: CodeId,
    pub reset: CodeId,
}

/// ```text
/// class Counter {
///     int count;
///     int unused;
///     Counter() { this.count = 0; }
///     void add(int amount) { this.count = this.count + amount; }
///     void reset() { this.count = 0; }
/// }
/// class Main {
///     Main() {}
///     int run() {
///         Counter counter = new Counter();
///         counter.add(2);
///         counter.add(5);
///         if (counter.count > 6 && !(counter.count == 8)) return counter.count;
///         return 0 - 1;
///     }
/// }
/// ```
#[must_use]
pub fn counter_program() -> CounterProgram {
    let mut builder = ProgramModelBuilder::new();
    let object = builder.object_class();
    let counter = builder.add_class("Counter", object);
    let main = builder.add_class("Main", object);
    let count = builder.add_field(counter, "count", Type::Int);
    let unused = builder.add_field(counter, "unused", Type::Int);
    let counter_constructor = builder.add_constructor(counter, Vec::new());
    builder.add_constructor(main, Vec::new());
    builder.set_body(
        counter_constructor,
        assign_field(this(counter), count, int(0)),
    );

    let add = builder.add_method(counter, "add", vec![Type::Int], Type::Void);
    builder.set_body(
        add,
        assign_field(
            this(counter),
            count,
            binary(
                BinaryOperator::Add,
                field(this(counter), count),
                local(1, Type::Int),
                Type::Int,
            ),
        ),
    );
    let reset = builder.add_method(counter, "reset", Vec::new(), Type::Void);
    builder.set_body(reset, assign_field(this(counter), count, int(0)));

    let run = builder.add_method(main, "run", Vec::new(), Type::Int);
    let counter_local = || local(1, Type::Class(counter));
    builder.set_body(
        run,
        block(vec![
            declare(
                1,
                Type::Class(counter),
                new_object(counter, counter_constructor, Vec::new()),
            ),
            call_command(counter_local(), counter, add, vec![int(2)]),
            call_command(counter_local(), counter, add, vec![int(5)]),
            if_else(
                binary(
                    BinaryOperator::And,
                    binary(
                        BinaryOperator::Greater,
                        field(counter_local(), count),
                        int(6),
                        Type::Int,
                    ),
                    not(binary(
                        BinaryOperator::Equal,
                        field(counter_local(), count),
                        int(8),
                        Type::Int,
                    )),
                    Type::Boolean,
                ),
                return_value(field(counter_local(), count)),
                Command::skip(),
            ),
            return_value(binary(
                BinaryOperator::Subtract,
                int(0),
                int(1),
                Type::Int,
            )),
        ]),
    );

    CounterProgram {
        model: builder.finish(),
        main,
        run,
        counter,
        count,
        unused,
        add,
        reset,
    }
}

pub struct ArrayProgram {
    pub model: ProgramModel,
    pub main: ClassId,
    pub run: CodeId,
}

/// ```text
/// class Main {
///     int run() {
///         int[] squares = new int[4];
///         int i = 0;
///         while (i < squares.length) { squares[i] = i * i; i = i + 1; }
///         int total = 0;
///         i = 0;
///         while (i < 4 && squares[i] < 5) { total = total + squares[i]; i = i + 1; }
///         float half = (float) total / 2.0;
///         return (int) (half * 4.0);
///     }
/// }
/// ```
#[must_use]
pub fn array_program() -> ArrayProgram {
    let mut builder = ProgramModelBuilder::new();
    let object = builder.object_class();
    let main = builder.add_class("Main", object);
    let int_array = builder.array_of(Type::Int);
    let run = builder.add_method(main, "run", Vec::new(), Type::Int);
    let (squares, i, total, half) = (1, 2, 3, 4);
    let squares_local = || local(squares, int_array);
    let i_local = || local(i, Type::Int);
    let element = |index: Expression| Expression::ArrayElement {
        array: Box::new(squares_local()),
        index: Box::new(index),
        element_type: Type::Int,
        span: Span::synthesized(),
    };
    let increment_i = assign(
        i,
        Type::Int,
        binary(BinaryOperator::Add, i_local(), int(1), Type::Int),
    );
    let float = |value: f32| Expression::Literal {
        literal: Literal::Float { value },
        span: Span::synthesized(),
    };
    let cast = |expression: Expression, from: Type, into: Type| Expression::Cast {
        expression: Box::new(expression),
        from,
        into,
        span: Span::synthesized(),
    };

    builder.set_body(
        run,
        block(vec![
            declare(
                squares,
                int_array,
                Expression::NewArray {
                    array_type: int_array,
                    size: Box::new(int(4)),
                    span: Span::synthesized(),
                },
            ),
            declare(i, Type::Int, int(0)),
            while_loop(
                binary(
                    BinaryOperator::Less,
                    i_local(),
                    Expression::ArrayLength {
                        array: Box::new(squares_local()),
                        span: Span::synthesized(),
                    },
                    Type::Int,
                ),
                block(vec![
                    assign_element(
                        squares_local(),
                        i_local(),
                        Type::Int,
                        binary(BinaryOperator::Multiply, i_local(), i_local(), Type::Int),
                    ),
                    increment_i.clone(),
                ]),
            ),
            declare(total, Type::Int, int(0)),
            assign(i, Type::Int, int(0)),
            while_loop(
                binary(
                    BinaryOperator::And,
                    binary(BinaryOperator::Less, i_local(), int(4), Type::Int),
                    binary(BinaryOperator::Less, element(i_local()), int(5), Type::Int),
                    Type::Boolean,
                ),
                block(vec![
                    assign(
                        total,
                        Type::Int,
                        binary(
                            BinaryOperator::Add,
                            local(total, Type::Int),
                            element(i_local()),
                            Type::Int,
                        ),
                    ),
                    increment_i,
                ]),
            ),
            declare(
                half,
                Type::Float,
                binary(
                    BinaryOperator::Divide,
                    cast(local(total, Type::Int), Type::Int, Type::Float),
                    float(2.0),
                    Type::Float,
                ),
            ),
            return_value(cast(
                binary(
                    BinaryOperator::Multiply,
                    local(half, Type::Float),
                    float(4.0),
                    Type::Float,
                ),
                Type::Float,
                Type::Int,
            )),
        ]),
    );

    ArrayProgram {
        model: builder.finish(),
        main,
        run,
    }
}
