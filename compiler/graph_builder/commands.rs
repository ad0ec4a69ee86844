use compiler__block_graph::BlockId;
use compiler__instruction_set::{Final, Sequential};
use compiler__program_model::{AssignmentTarget, Command, Expression, Type};
use compiler__reports::CompilerFailure;
use compiler__source::Span;

use super::Translator;

impl Translator<'_> {
    /// Block executing `command` and then `continuation`. Leaves the operand
    /// stack as it found it.
    pub(super) fn translate_command(
        &mut self,
        command: &Command,
        continuation: BlockId,
    ) -> Result<BlockId, CompilerFailure> {
        match command {
            Command::Skip { .. } => Ok(continuation),
            Command::LocalDeclaration {
                slot,
                variable_type,
                initializer,
                span,
            } => {
                let store = self.prefix(
                    Sequential::Store {
                        slot: *slot,
                        value_type: *variable_type,
                    },
                    *span,
                    continuation,
                );
                self.translate_expression(initializer, store)
            }
            Command::Assignment {
                target,
                value,
                span,
            } => self.translate_assignment(target, value, *span, continuation),
            Command::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.builder.do_not_merge(continuation);
                let yes = self.translate_command(then_branch, continuation)?;
                let no = self.translate_command(else_branch, continuation)?;
                self.translate_test(condition, yes, no)
            }
            Command::While {
                condition, body, ..
            } => self.translate_loop(condition, body, None, continuation),
            Command::For {
                initialization,
                condition,
                update,
                body,
                ..
            } => {
                let test =
                    self.translate_loop(condition, body, Some(update.as_ref()), continuation)?;
                self.translate_command(initialization, test)
            }
            Command::Block { commands, .. } => {
                let mut next = continuation;
                for nested in commands.iter().rev() {
                    next = self.translate_command(nested, next)?;
                }
                Ok(next)
            }
            Command::Return { value, span } => match value {
                Some(value) => {
                    let return_type = self.model.code(self.code).return_type;
                    let exit = self.final_block(Final::for_return_type(return_type), *span);
                    self.translate_expression(value, exit)
                }
                None => Ok(self.final_block(Final::Return, *span)),
            },
            Command::MethodCall {
                receiver,
                receiver_class,
                method,
                arguments,
                span,
            } => {
                let return_type = self.model.code(*method).return_type;
                let after_call = if return_type == Type::Void {
                    continuation
                } else {
                    self.prefix(
                        Sequential::Pop {
                            value_type: return_type,
                        },
                        *span,
                        continuation,
                    )
                };
                self.translate_method_call(
                    receiver,
                    *receiver_class,
                    *method,
                    arguments,
                    *span,
                    after_call,
                )
            }
        }
    }

    fn translate_assignment(
        &mut self,
        target: &AssignmentTarget,
        value: &Expression,
        span: Span,
        continuation: BlockId,
    ) -> Result<BlockId, CompilerFailure> {
        match target {
            AssignmentTarget::Variable {
                slot,
                variable_type,
            } => {
                let store = self.prefix(
                    Sequential::Store {
                        slot: *slot,
                        value_type: *variable_type,
                    },
                    span,
                    continuation,
                );
                self.translate_expression(value, store)
            }
            AssignmentTarget::Field { receiver, field } => {
                let put_field = self.prefix(
                    Sequential::PutField {
                        field: *field,
                        field_type: self.model.field(*field).field_type,
                    },
                    span,
                    continuation,
                );
                let value_entry = self.translate_expression(value, put_field)?;
                self.translate_expression(receiver, value_entry)
            }
            AssignmentTarget::ArrayElement {
                array,
                index,
                element_type,
            } => {
                let array_store = self.prefix(
                    Sequential::ArrayStore {
                        element_type: *element_type,
                    },
                    span,
                    continuation,
                );
                let value_entry = self.translate_expression(value, array_store)?;
                let index_entry = self.translate_expression(index, value_entry)?;
                self.translate_expression(array, index_entry)
            }
        }
    }

    /// Builds `test: if condition then (body; update; goto test) else
    /// continuation` and returns the test block. The pivot is the only block
    /// closing a cycle.
    fn translate_loop(
        &mut self,
        condition: &Expression,
        body: &Command,
        update: Option<&Command>,
        continuation: BlockId,
    ) -> Result<BlockId, CompilerFailure> {
        let pivot = self.builder.new_pivot();
        let update_entry = match update {
            Some(update) => self.translate_command(update, pivot)?,
            None => pivot,
        };
        let body_entry = self.translate_command(body, update_entry)?;
        let test = self.translate_test(condition, body_entry, continuation)?;
        self.builder.do_not_merge(test);
        self.builder.link_pivot(pivot, test);
        Ok(test)
    }
}
