use compiler__source::Span;
use serde::{Deserialize, Serialize};

use crate::{ClassId, CodeId, FieldId, ProgramModel, Type};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Literal {
    Int { value: i32 },
    Float { value: f32 },
    Boolean { value: bool },
    Nil,
    String { value: String },
}

impl Literal {
    #[must_use]
    pub fn static_type(&self) -> Type {
        match self {
            Literal::Int { .. } => Type::Int,
            Literal::Float { .. } => Type::Float,
            Literal::Boolean { .. } => Type::Boolean,
            Literal::Nil => Type::Nil,
            Literal::String { .. } => Type::String,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl BinaryOperator {
    #[must_use]
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo
        )
    }

    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Less
                | Self::LessOrEqual
                | Self::Greater
                | Self::GreaterOrEqual
                | Self::Equal
                | Self::NotEqual
        )
    }

    #[must_use]
    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOperator {
    Minus,
    Not,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expression {
    Literal {
        literal: Literal,
        #[serde(default)]
        span: Span,
    },
    Variable {
        slot: u16,
        variable_type: Type,
        #[serde(default)]
        span: Span,
    },
    FieldAccess {
        receiver: Box<Expression>,
        field: FieldId,
        #[serde(default)]
        span: Span,
    },
    ArrayElement {
        array: Box<Expression>,
        index: Box<Expression>,
        element_type: Type,
        #[serde(default)]
        span: Span,
    },
    ArrayLength {
        array: Box<Expression>,
        #[serde(default)]
        span: Span,
    },
    /// `operand_type` is the type both operands share after the type checker's
    /// promotions; the result type follows from the operator.
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        operand_type: Type,
        #[serde(default)]
        span: Span,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
        operand_type: Type,
        #[serde(default)]
        span: Span,
    },
    Cast {
        expression: Box<Expression>,
        from: Type,
        into: Type,
        #[serde(default)]
        span: Span,
    },
    NewObject {
        class: ClassId,
        constructor: CodeId,
        arguments: Vec<Expression>,
        #[serde(default)]
        span: Span,
    },
    NewArray {
        array_type: Type,
        size: Box<Expression>,
        #[serde(default)]
        span: Span,
    },
    MethodCall {
        receiver: Box<Expression>,
        receiver_class: ClassId,
        method: CodeId,
        arguments: Vec<Expression>,
        #[serde(default)]
        span: Span,
    },
}

impl Expression {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Expression::Literal { span, .. }
            | Expression::Variable { span, .. }
            | Expression::FieldAccess { span, .. }
            | Expression::ArrayElement { span, .. }
            | Expression::ArrayLength { span, .. }
            | Expression::Binary { span, .. }
            | Expression::Unary { span, .. }
            | Expression::Cast { span, .. }
            | Expression::NewObject { span, .. }
            | Expression::NewArray { span, .. }
            | Expression::MethodCall { span, .. } => *span,
        }
    }

    #[must_use]
    pub fn static_type(&self, model: &ProgramModel) -> Type {
        match self {
            Expression::Literal { literal, .. } => literal.static_type(),
            Expression::Variable { variable_type, .. } => *variable_type,
            Expression::FieldAccess { field, .. } => model.field(*field).field_type,
            Expression::ArrayElement { element_type, .. } => *element_type,
            Expression::ArrayLength { .. } => Type::Int,
            Expression::Binary {
                operator,
                operand_type,
                ..
            } => {
                if operator.is_arithmetic() {
                    *operand_type
                } else {
                    Type::Boolean
                }
            }
            Expression::Unary {
                operator,
                operand_type,
                ..
            } => match operator {
                UnaryOperator::Minus => *operand_type,
                UnaryOperator::Not => Type::Boolean,
            },
            Expression::Cast { into, .. } => *into,
            Expression::NewObject { class, .. } => Type::Class(*class),
            Expression::NewArray { array_type, .. } => *array_type,
            Expression::MethodCall { method, .. } => model.code(*method).return_type,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssignmentTarget {
    Variable {
        slot: u16,
        variable_type: Type,
    },
    Field {
        receiver: Box<Expression>,
        field: FieldId,
    },
    ArrayElement {
        array: Box<Expression>,
        index: Box<Expression>,
        element_type: Type,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    Skip {
        #[serde(default)]
        span: Span,
    },
    LocalDeclaration {
        slot: u16,
        variable_type: Type,
        initializer: Expression,
        #[serde(default)]
        span: Span,
    },
    Assignment {
        target: AssignmentTarget,
        value: Expression,
        #[serde(default)]
        span: Span,
    },
    If {
        condition: Expression,
        then_branch: Box<Command>,
        else_branch: Box<Command>,
        #[serde(default)]
        span: Span,
    },
    While {
        condition: Expression,
        body: Box<Command>,
        #[serde(default)]
        span: Span,
    },
    For {
        initialization: Box<Command>,
        condition: Expression,
        update: Box<Command>,
        body: Box<Command>,
        #[serde(default)]
        span: Span,
    },
    Block {
        commands: Vec<Command>,
        #[serde(default)]
        span: Span,
    },
    Return {
        value: Option<Expression>,
        #[serde(default)]
        span: Span,
    },
    MethodCall {
        receiver: Expression,
        receiver_class: ClassId,
        method: CodeId,
        arguments: Vec<Expression>,
        #[serde(default)]
        span: Span,
    },
}

impl Command {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Command::Skip { span }
            | Command::LocalDeclaration { span, .. }
            | Command::Assignment { span, .. }
            | Command::If { span, .. }
            | Command::While { span, .. }
            | Command::For { span, .. }
            | Command::Block { span, .. }
            | Command::Return { span, .. }
            | Command::MethodCall { span, .. } => *span,
        }
    }

    #[must_use]
    pub fn skip() -> Self {
        Command::Skip {
            span: Span::synthesized(),
        }
    }
}
