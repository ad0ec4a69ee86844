use compiler__program_model::{BinaryOperator, Literal, Type};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl ArithmeticOperator {
    #[must_use]
    pub fn from_binary_operator(operator: BinaryOperator) -> Option<Self> {
        match operator {
            BinaryOperator::Add => Some(Self::Add),
            BinaryOperator::Subtract => Some(Self::Subtract),
            BinaryOperator::Multiply => Some(Self::Multiply),
            BinaryOperator::Divide => Some(Self::Divide),
            BinaryOperator::Modulo => Some(Self::Modulo),
            _ => None,
        }
    }

    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "sub",
            Self::Multiply => "mul",
            Self::Divide => "div",
            Self::Modulo => "rem",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Comparison {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl Comparison {
    #[must_use]
    pub fn from_binary_operator(operator: BinaryOperator) -> Option<Self> {
        match operator {
            BinaryOperator::Equal => Some(Self::Equal),
            BinaryOperator::NotEqual => Some(Self::NotEqual),
            BinaryOperator::Less => Some(Self::Less),
            BinaryOperator::LessOrEqual => Some(Self::LessOrEqual),
            BinaryOperator::Greater => Some(Self::Greater),
            BinaryOperator::GreaterOrEqual => Some(Self::GreaterOrEqual),
            _ => None,
        }
    }

    /// Comparison holding exactly when `self` does not.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Equal => Self::NotEqual,
            Self::NotEqual => Self::Equal,
            Self::Less => Self::GreaterOrEqual,
            Self::LessOrEqual => Self::Greater,
            Self::Greater => Self::LessOrEqual,
            Self::GreaterOrEqual => Self::Less,
        }
    }

    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Equal => "eq",
            Self::NotEqual => "ne",
            Self::Less => "lt",
            Self::LessOrEqual => "le",
            Self::Greater => "gt",
            Self::GreaterOrEqual => "ge",
        }
    }
}

/// Constant operand. Floats are kept as their bit pattern so constants can be
/// hashed and compared structurally.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    Int(i32),
    Float(u32),
    Boolean(bool),
    Nil,
    String(String),
}

impl Constant {
    #[must_use]
    pub fn float(value: f32) -> Self {
        Self::Float(value.to_bits())
    }

    #[must_use]
    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Int { value } => Self::Int(*value),
            Literal::Float { value } => Self::float(*value),
            Literal::Boolean { value } => Self::Boolean(*value),
            Literal::Nil => Self::Nil,
            Literal::String { value } => Self::String(value.clone()),
        }
    }

    #[must_use]
    pub fn value_type(&self) -> Type {
        match self {
            Self::Int(_) => Type::Int,
            Self::Float(_) => Type::Float,
            Self::Boolean(_) => Type::Boolean,
            Self::Nil => Type::Nil,
            Self::String(_) => Type::String,
        }
    }
}
