use std::fmt;

use compiler__instruction_set::{ArithmeticOperator, Comparison};
use compiler__program_model::Type;
use serde::{Deserialize, Serialize};

/// Operand category selecting the typed form of an instruction (`i`, `f` or
/// `a` prefix). Booleans are ints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Int,
    Float,
    Reference,
}

impl ValueKind {
    #[must_use]
    pub fn of(value_type: Type) -> Self {
        match value_type {
            Type::Int | Type::Boolean | Type::Void => Self::Int,
            Type::Float => Self::Float,
            Type::String | Type::Nil | Type::Class(_) | Type::Array(_) => Self::Reference,
        }
    }

    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Int => "i",
            Self::Float => "f",
            Self::Reference => "a",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Condition {
    #[must_use]
    pub fn from_comparison(comparison: Comparison) -> Self {
        match comparison {
            Comparison::Equal => Self::Eq,
            Comparison::NotEqual => Self::Ne,
            Comparison::Less => Self::Lt,
            Comparison::LessOrEqual => Self::Le,
            Comparison::Greater => Self::Gt,
            Comparison::GreaterOrEqual => Self::Ge,
        }
    }

    /// Whether `ordering` (left compared with right) satisfies the condition.
    #[must_use]
    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        match self {
            Self::Eq => ordering.is_eq(),
            Self::Ne => ordering.is_ne(),
            Self::Lt => ordering.is_lt(),
            Self::Le => ordering.is_le(),
            Self::Gt => ordering.is_gt(),
            Self::Ge => ordering.is_ge(),
        }
    }

    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Operation {
    #[must_use]
    pub fn from_arithmetic_operator(operator: ArithmeticOperator) -> Self {
        match operator {
            ArithmeticOperator::Add => Self::Add,
            ArithmeticOperator::Subtract => Self::Sub,
            ArithmeticOperator::Multiply => Self::Mul,
            ArithmeticOperator::Divide => Self::Div,
            ArithmeticOperator::Modulo => Self::Rem,
        }
    }

    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Rem => "rem",
        }
    }
}

/// Symbolic reference to a field or member: declaring class, name and
/// descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberReference {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl fmt::Display for MemberReference {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}:{}", self.owner, self.name, self.descriptor)
    }
}

/// One instruction of the stack assembly. Branch targets are instruction
/// indices within the member's stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AssemblyInstruction {
    Nop,
    PushInt {
        value: i32,
    },
    PushFloat {
        value: f32,
    },
    PushString {
        value: String,
    },
    PushNull,
    Load {
        kind: ValueKind,
        slot: u16,
    },
    Store {
        kind: ValueKind,
        slot: u16,
    },
    GetField {
        field: MemberReference,
    },
    PutField {
        field: MemberReference,
    },
    ArrayLoad {
        kind: ValueKind,
    },
    ArrayStore {
        kind: ValueKind,
    },
    ArrayLength,
    New {
        class: String,
    },
    NewArray {
        element_descriptor: String,
    },
    Arithmetic {
        kind: ValueKind,
        operation: Operation,
    },
    Negate {
        kind: ValueKind,
    },
    Convert {
        from: ValueKind,
        into: ValueKind,
    },
    CheckCast {
        class: String,
    },
    /// Pushes -1, 0 or 1 comparing two floats; NaN yields 1 when
    /// `nan_is_greater` and -1 otherwise.
    FloatCompare {
        nan_is_greater: bool,
    },
    Dup,
    Pop,
    InvokeSpecial {
        member: MemberReference,
    },
    InvokeVirtual {
        member: MemberReference,
    },
    /// Jumps when the popped int satisfies `condition` against zero.
    If {
        condition: Condition,
        target: usize,
    },
    IfCompare {
        kind: ValueKind,
        condition: Condition,
        target: usize,
    },
    Goto {
        target: usize,
    },
    Return,
    ReturnValue {
        kind: ValueKind,
    },
}

impl AssemblyInstruction {
    #[must_use]
    pub fn branch_target(&self) -> Option<usize> {
        match self {
            Self::If { target, .. } | Self::IfCompare { target, .. } | Self::Goto { target } => {
                Some(*target)
            }
            _ => None,
        }
    }

    pub(crate) fn branch_target_mut(&mut self) -> Option<&mut usize> {
        match self {
            Self::If { target, .. } | Self::IfCompare { target, .. } | Self::Goto { target } => {
                Some(target)
            }
            _ => None,
        }
    }
}

impl fmt::Display for AssemblyInstruction {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nop => formatter.write_str("nop"),
            Self::PushInt { value } => write!(formatter, "ldc {value}"),
            Self::PushFloat { value } => write!(formatter, "ldc {value:?}f"),
            Self::PushString { value } => write!(formatter, "ldc {value:?}"),
            Self::PushNull => formatter.write_str("aconst_null"),
            Self::Load { kind, slot } => write!(formatter, "{}load {slot}", kind.prefix()),
            Self::Store { kind, slot } => write!(formatter, "{}store {slot}", kind.prefix()),
            Self::GetField { field } => write!(formatter, "getfield {field}"),
            Self::PutField { field } => write!(formatter, "putfield {field}"),
            Self::ArrayLoad { kind } => write!(formatter, "{}aload", kind.prefix()),
            Self::ArrayStore { kind } => write!(formatter, "{}astore", kind.prefix()),
            Self::ArrayLength => formatter.write_str("arraylength"),
            Self::New { class } => write!(formatter, "new {class}"),
            Self::NewArray { element_descriptor } => {
                write!(formatter, "newarray {element_descriptor}")
            }
            Self::Arithmetic { kind, operation } => {
                write!(formatter, "{}{}", kind.prefix(), operation.mnemonic())
            }
            Self::Negate { kind } => write!(formatter, "{}neg", kind.prefix()),
            Self::Convert { from, into } => {
                write!(formatter, "{}2{}", from.prefix(), into.prefix())
            }
            Self::CheckCast { class } => write!(formatter, "checkcast {class}"),
            Self::FloatCompare { nan_is_greater } => {
                formatter.write_str(if *nan_is_greater { "fcmpg" } else { "fcmpl" })
            }
            Self::Dup => formatter.write_str("dup"),
            Self::Pop => formatter.write_str("pop"),
            Self::InvokeSpecial { member } => write!(formatter, "invokespecial {member}"),
            Self::InvokeVirtual { member } => write!(formatter, "invokevirtual {member}"),
            Self::If { condition, target } => {
                write!(formatter, "if{} {target}", condition.mnemonic())
            }
            Self::IfCompare {
                kind,
                condition,
                target,
            } => write!(
                formatter,
                "if_{}cmp{} {target}",
                kind.prefix(),
                condition.mnemonic()
            ),
            Self::Goto { target } => write!(formatter, "goto {target}"),
            Self::Return => formatter.write_str("return"),
            Self::ReturnValue { kind } => write!(formatter, "{}return", kind.prefix()),
        }
    }
}
