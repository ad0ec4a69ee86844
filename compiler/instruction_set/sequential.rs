use compiler__program_model::{ArrayTypeId, ClassId, FieldId, Type};

use crate::{ArithmeticOperator, CallSite, Comparison, Constant, InstructionKind, StackEffect};

/// Instructions with exactly one logical successor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Sequential {
    Nop,
    Constant(Constant),
    Load {
        slot: u16,
        value_type: Type,
    },
    Store {
        slot: u16,
        value_type: Type,
    },
    GetField {
        field: FieldId,
        field_type: Type,
    },
    PutField {
        field: FieldId,
        field_type: Type,
    },
    ArrayLoad {
        element_type: Type,
    },
    ArrayStore {
        element_type: Type,
    },
    ArrayLength,
    NewObject {
        class: ClassId,
    },
    NewArray {
        array_type: ArrayTypeId,
        element_type: Type,
    },
    Arithmetic {
        operator: ArithmeticOperator,
        operand_type: Type,
    },
    Negate {
        operand_type: Type,
    },
    /// Pushes the boolean outcome of comparing the two topmost values.
    Compare {
        comparison: Comparison,
        operand_type: Type,
    },
    Convert {
        from: Type,
        into: Type,
    },
    CheckCast {
        class: ClassId,
    },
    Dup {
        value_type: Type,
    },
    Pop {
        value_type: Type,
    },
    ConstructorCall(CallSite),
    VirtualCall(CallSite),
}

impl InstructionKind for Sequential {
    fn stack_effect(&self) -> StackEffect {
        match self {
            Sequential::Nop => StackEffect::new(0, 0),
            Sequential::Constant(_) | Sequential::Load { .. } | Sequential::NewObject { .. } => {
                StackEffect::new(0, 1)
            }
            Sequential::Store { .. } | Sequential::Pop { .. } => StackEffect::new(1, 0),
            Sequential::GetField { .. }
            | Sequential::ArrayLength
            | Sequential::NewArray { .. }
            | Sequential::Negate { .. }
            | Sequential::Convert { .. }
            | Sequential::CheckCast { .. } => StackEffect::new(1, 1),
            Sequential::PutField { .. } => StackEffect::new(2, 0),
            Sequential::ArrayLoad { .. }
            | Sequential::Arithmetic { .. }
            | Sequential::Compare { .. } => StackEffect::new(2, 1),
            Sequential::ArrayStore { .. } => StackEffect::new(3, 0),
            Sequential::Dup { .. } => StackEffect::new(1, 2),
            Sequential::ConstructorCall(call_site) | Sequential::VirtualCall(call_site) => {
                StackEffect::new(
                    1 + call_site.argument_stack_size(),
                    call_site.return_type.stack_size(),
                )
            }
        }
    }

    fn call_site(&self) -> Option<&CallSite> {
        match self {
            Sequential::ConstructorCall(call_site) | Sequential::VirtualCall(call_site) => {
                Some(call_site)
            }
            _ => None,
        }
    }

    fn accessed_field(&self) -> Option<FieldId> {
        match self {
            Sequential::GetField { field, .. } | Sequential::PutField { field, .. } => Some(*field),
            _ => None,
        }
    }
}
