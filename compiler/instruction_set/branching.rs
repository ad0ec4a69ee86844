use compiler__program_model::Type;

use crate::{Comparison, InstructionKind, StackEffect};

/// Discriminator between the two successors of a block. Holds for the
/// "yes" successor and fails for the "no" one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Branching {
    IfTrue,
    IfFalse,
    /// `unordered_holds` is the outcome when a float operand is NaN. Source
    /// comparisons hold on unordered operands only for `!=`; negation flips
    /// it so the negated test is the exact complement.
    IfCompare {
        comparison: Comparison,
        operand_type: Type,
        unordered_holds: bool,
    },
}

impl Branching {
    /// Test for a source-level comparison `left <comparison> right`.
    #[must_use]
    pub fn compare(comparison: Comparison, operand_type: Type) -> Self {
        Branching::IfCompare {
            comparison,
            operand_type,
            unordered_holds: comparison == Comparison::NotEqual,
        }
    }

    #[must_use]
    pub fn negate(&self) -> Self {
        match self {
            Branching::IfTrue => Branching::IfFalse,
            Branching::IfFalse => Branching::IfTrue,
            Branching::IfCompare {
                comparison,
                operand_type,
                unordered_holds,
            } => Branching::IfCompare {
                comparison: comparison.negate(),
                operand_type: *operand_type,
                unordered_holds: !unordered_holds,
            },
        }
    }

    /// Types of the values the test consumes, deepest first.
    #[must_use]
    pub fn operand_types(&self) -> Vec<Type> {
        match self {
            Branching::IfTrue | Branching::IfFalse => vec![Type::Boolean],
            Branching::IfCompare { operand_type, .. } => vec![*operand_type, *operand_type],
        }
    }
}

impl InstructionKind for Branching {
    fn stack_effect(&self) -> StackEffect {
        StackEffect::new(self.operand_types().len(), 0)
    }
}
