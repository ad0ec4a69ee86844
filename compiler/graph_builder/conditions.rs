use compiler__block_graph::BlockId;
use compiler__instruction_set::{Branching, Comparison, Instruction};
use compiler__program_model::{BinaryOperator, Expression, Literal, UnaryOperator};
use compiler__reports::CompilerFailure;

use super::Translator;

impl Translator<'_> {
    /// Block evaluating the boolean `condition` and continuing into `yes`
    /// when it holds and into `no` otherwise. Leaves the stack unchanged on
    /// both paths.
    pub(super) fn translate_test(
        &mut self,
        condition: &Expression,
        yes: BlockId,
        no: BlockId,
    ) -> Result<BlockId, CompilerFailure> {
        match condition {
            Expression::Literal {
                literal: Literal::Boolean { value },
                ..
            } => Ok(if *value { yes } else { no }),
            Expression::Unary {
                operator: UnaryOperator::Not,
                operand,
                ..
            } => self.translate_test(operand, no, yes),
            Expression::Binary {
                operator: BinaryOperator::And,
                left,
                right,
                ..
            } => {
                self.builder.do_not_merge(no);
                let right_entry = self.translate_test(right, yes, no)?;
                self.translate_test(left, right_entry, no)
            }
            Expression::Binary {
                operator: BinaryOperator::Or,
                left,
                right,
                ..
            } => {
                self.builder.do_not_merge(yes);
                let right_entry = self.translate_test(right, yes, no)?;
                self.translate_test(left, yes, right_entry)
            }
            Expression::Binary {
                operator,
                left,
                right,
                operand_type,
                span,
            } => {
                let Some(comparison) = Comparison::from_binary_operator(*operator) else {
                    return self.test_value(condition, yes, no);
                };
                let test = self.builder.branch_block(
                    Instruction::new(
                        Branching::compare(comparison, *operand_type),
                        self.location(*span),
                    ),
                    yes,
                    no,
                );
                let right_entry = self.translate_expression(right, test)?;
                self.translate_expression(left, right_entry)
            }
            _ => self.test_value(condition, yes, no),
        }
    }

    fn test_value(
        &mut self,
        condition: &Expression,
        yes: BlockId,
        no: BlockId,
    ) -> Result<BlockId, CompilerFailure> {
        let test = self.builder.branch_block(
            Instruction::new(Branching::IfTrue, self.location(condition.span())),
            yes,
            no,
        );
        self.translate_expression(condition, test)
    }
}
