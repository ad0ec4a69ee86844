use std::hash::{Hash, Hasher};

use compiler__program_model::{CodeId, FieldId};
use compiler__source::Span;

mod branching;
mod call_site;
mod describe;
mod final_instruction;
mod operators;
mod sequential;

pub use branching::Branching;
pub use call_site::CallSite;
pub use final_instruction::Final;
pub use operators::{ArithmeticOperator, Comparison, Constant};
pub use sequential::Sequential;

/// Code member an instruction was generated for, plus the source position it
/// derives from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeLocation {
    pub code: CodeId,
    pub span: Span,
}

impl CodeLocation {
    #[must_use]
    pub fn new(code: CodeId, span: Span) -> Self {
        Self { code, span }
    }
}

/// An instruction of one category (`Sequential`, `Branching` or `Final`).
/// Equality and hashing look at the kind and its operands only, so identical
/// instructions generated at different places compare equal.
#[derive(Clone, Debug)]
pub struct Instruction<K> {
    pub kind: K,
    pub location: CodeLocation,
}

pub type SequentialInstruction = Instruction<Sequential>;
pub type BranchingInstruction = Instruction<Branching>;
pub type FinalInstruction = Instruction<Final>;

impl<K> Instruction<K> {
    pub fn new(kind: K, location: CodeLocation) -> Self {
        Self { kind, location }
    }
}

impl<K: PartialEq> PartialEq for Instruction<K> {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl<K: Eq> Eq for Instruction<K> {}

impl<K: Hash> Hash for Instruction<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

impl BranchingInstruction {
    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            kind: self.kind.negate(),
            location: self.location,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackEffect {
    pub pops: usize,
    pub pushes: usize,
}

impl StackEffect {
    #[must_use]
    pub fn new(pops: usize, pushes: usize) -> Self {
        Self { pops, pushes }
    }

    #[must_use]
    pub fn net(self) -> isize {
        self.pushes as isize - self.pops as isize
    }
}

/// Properties every instruction category answers. The calling axis is
/// orthogonal to the category: only sequential instructions ever call.
pub trait InstructionKind {
    fn stack_effect(&self) -> StackEffect;

    fn call_site(&self) -> Option<&CallSite> {
        None
    }

    fn accessed_field(&self) -> Option<FieldId> {
        None
    }

    fn is_calling(&self) -> bool {
        self.call_site().is_some()
    }

    /// Never transfers control into another member's code, so a static
    /// analysis can abstract it locally.
    fn is_non_calling(&self) -> bool {
        !self.is_calling()
    }
}

impl<K: InstructionKind> Instruction<K> {
    #[must_use]
    pub fn stack_effect(&self) -> StackEffect {
        self.kind.stack_effect()
    }

    #[must_use]
    pub fn call_site(&self) -> Option<&CallSite> {
        self.kind.call_site()
    }

    #[must_use]
    pub fn accessed_field(&self) -> Option<FieldId> {
        self.kind.accessed_field()
    }
}
