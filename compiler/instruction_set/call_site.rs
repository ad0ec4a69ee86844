use std::collections::BTreeSet;

use compiler__dispatch::call_targets;
use compiler__program_model::{ClassId, CodeId, ProgramModel, Type};

/// Operands shared by constructor and virtual calls.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallSite {
    pub static_receiver: ClassId,
    pub target: CodeId,
    pub parameter_types: Vec<Type>,
    pub return_type: Type,
    pub dynamic_targets: BTreeSet<CodeId>,
}

impl CallSite {
    /// Call of `target` through a receiver whose static class is
    /// `static_receiver`; dynamic targets are computed from the subclass
    /// lattice right away.
    #[must_use]
    pub fn new(model: &ProgramModel, static_receiver: ClassId, target: CodeId) -> Self {
        let signature = model.code(target);
        Self {
            static_receiver,
            target,
            parameter_types: signature.parameter_types.clone(),
            return_type: signature.return_type,
            dynamic_targets: call_targets(model, static_receiver, target),
        }
    }

    #[must_use]
    pub fn argument_stack_size(&self) -> usize {
        self.parameter_types
            .iter()
            .map(|parameter_type| parameter_type.stack_size())
            .sum()
    }
}
