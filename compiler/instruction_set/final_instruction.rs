use compiler__program_model::Type;

use crate::{InstructionKind, StackEffect};

/// Terminates the execution of the enclosing member.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Final {
    Return,
    ReturnValue { value_type: Type },
}

impl Final {
    #[must_use]
    pub fn for_return_type(return_type: Type) -> Self {
        match return_type {
            Type::Void => Final::Return,
            value_type => Final::ReturnValue { value_type },
        }
    }
}

impl InstructionKind for Final {
    fn stack_effect(&self) -> StackEffect {
        match self {
            Final::Return => StackEffect::new(0, 0),
            Final::ReturnValue { .. } => StackEffect::new(1, 0),
        }
    }
}
