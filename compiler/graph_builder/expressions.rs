use compiler__block_graph::BlockId;
use compiler__instruction_set::{ArithmeticOperator, CallSite, Comparison, Constant, Sequential};
use compiler__program_model::{ClassId, CodeId, Expression, Type, UnaryOperator};
use compiler__reports::{CompilerFailure, CompilerFailureKind};
use compiler__source::Span;

use super::Translator;

impl Translator<'_> {
    /// Block pushing the value of `expression` and then continuing into
    /// `continuation`.
    pub(super) fn translate_expression(
        &mut self,
        expression: &Expression,
        continuation: BlockId,
    ) -> Result<BlockId, CompilerFailure> {
        match expression {
            Expression::Literal { literal, span } => Ok(self.prefix(
                Sequential::Constant(Constant::from_literal(literal)),
                *span,
                continuation,
            )),
            Expression::Variable {
                slot,
                variable_type,
                span,
            } => Ok(self.prefix(
                Sequential::Load {
                    slot: *slot,
                    value_type: *variable_type,
                },
                *span,
                continuation,
            )),
            Expression::FieldAccess {
                receiver,
                field,
                span,
            } => {
                let get_field = self.prefix(
                    Sequential::GetField {
                        field: *field,
                        field_type: self.model.field(*field).field_type,
                    },
                    *span,
                    continuation,
                );
                self.translate_expression(receiver, get_field)
            }
            Expression::ArrayElement {
                array,
                index,
                element_type,
                span,
            } => {
                let array_load = self.prefix(
                    Sequential::ArrayLoad {
                        element_type: *element_type,
                    },
                    *span,
                    continuation,
                );
                let index_entry = self.translate_expression(index, array_load)?;
                self.translate_expression(array, index_entry)
            }
            Expression::ArrayLength { array, span } => {
                let array_length = self.prefix(Sequential::ArrayLength, *span, continuation);
                self.translate_expression(array, array_length)
            }
            Expression::Binary {
                operator,
                left,
                right,
                operand_type,
                span,
            } => {
                let arithmetic = ArithmeticOperator::from_binary_operator(*operator);
                let kind = if let Some(operator) = arithmetic {
                    Sequential::Arithmetic {
                        operator,
                        operand_type: *operand_type,
                    }
                } else if let Some(comparison) = Comparison::from_binary_operator(*operator) {
                    Sequential::Compare {
                        comparison,
                        operand_type: *operand_type,
                    }
                } else {
                    return self.translate_boolean_value(expression, continuation);
                };
                let operation = self.prefix(kind, *span, continuation);
                let right_entry = self.translate_expression(right, operation)?;
                self.translate_expression(left, right_entry)
            }
            Expression::Unary {
                operator: UnaryOperator::Minus,
                operand,
                operand_type,
                span,
            } => {
                let negate = self.prefix(
                    Sequential::Negate {
                        operand_type: *operand_type,
                    },
                    *span,
                    continuation,
                );
                self.translate_expression(operand, negate)
            }
            Expression::Unary {
                operator: UnaryOperator::Not,
                ..
            } => self.translate_boolean_value(expression, continuation),
            Expression::Cast {
                expression: operand,
                from,
                into,
                span,
            } => {
                let after_operand = match self.cast_instruction(*from, *into) {
                    Some(kind) => self.prefix(kind, *span, continuation),
                    None => continuation,
                };
                self.translate_expression(operand, after_operand)
            }
            Expression::NewObject {
                class,
                constructor,
                arguments,
                span,
            } => {
                let call = self.prefix(
                    Sequential::ConstructorCall(CallSite::new(self.model, *class, *constructor)),
                    *span,
                    continuation,
                );
                let arguments_entry = self.translate_arguments(arguments, call)?;
                let instructions = vec![
                    self.instruction(Sequential::NewObject { class: *class }, *span),
                    self.instruction(
                        Sequential::Dup {
                            value_type: Type::Class(*class),
                        },
                        *span,
                    ),
                ];
                Ok(self.builder.prefix_all(instructions, arguments_entry))
            }
            Expression::NewArray {
                array_type,
                size,
                span,
            } => {
                let Type::Array(array_type_id) = array_type else {
                    return Err(CompilerFailure::new(
                        CompilerFailureKind::InvalidProgramModel,
                        format!(
                            "array allocation of non-array type `{}`",
                            self.model.describe_type(*array_type)
                        ),
                    )
                    .at(*span));
                };
                let new_array = self.prefix(
                    Sequential::NewArray {
                        array_type: *array_type_id,
                        element_type: self.model.array_element_type(*array_type_id),
                    },
                    *span,
                    continuation,
                );
                self.translate_expression(size, new_array)
            }
            Expression::MethodCall {
                receiver,
                receiver_class,
                method,
                arguments,
                span,
            } => self.translate_method_call(
                receiver,
                *receiver_class,
                *method,
                arguments,
                *span,
                continuation,
            ),
        }
    }

    pub(super) fn translate_method_call(
        &mut self,
        receiver: &Expression,
        receiver_class: ClassId,
        method: CodeId,
        arguments: &[Expression],
        span: Span,
        continuation: BlockId,
    ) -> Result<BlockId, CompilerFailure> {
        let call = self.prefix(
            Sequential::VirtualCall(CallSite::new(self.model, receiver_class, method)),
            span,
            continuation,
        );
        let arguments_entry = self.translate_arguments(arguments, call)?;
        self.translate_expression(receiver, arguments_entry)
    }

    /// Arguments are evaluated left to right, so they are translated right to
    /// left.
    fn translate_arguments(
        &mut self,
        arguments: &[Expression],
        continuation: BlockId,
    ) -> Result<BlockId, CompilerFailure> {
        let mut next = continuation;
        for argument in arguments.iter().rev() {
            next = self.translate_expression(argument, next)?;
        }
        Ok(next)
    }

    /// Pushes `true` or `false` depending on the outcome of `expression`
    /// translated as a test.
    fn translate_boolean_value(
        &mut self,
        expression: &Expression,
        continuation: BlockId,
    ) -> Result<BlockId, CompilerFailure> {
        let span = expression.span();
        self.builder.do_not_merge(continuation);
        let yes = self.prefix(
            Sequential::Constant(Constant::Boolean(true)),
            span,
            continuation,
        );
        let no = self.prefix(
            Sequential::Constant(Constant::Boolean(false)),
            span,
            continuation,
        );
        self.translate_test(expression, yes, no)
    }

    /// Conversion between numeric types and checked downcasts emit code;
    /// widening reference casts do not.
    fn cast_instruction(&self, from: Type, into: Type) -> Option<Sequential> {
        if from == into {
            return None;
        }
        if from.is_numeric() && into.is_numeric() {
            return Some(Sequential::Convert { from, into });
        }
        match (from, into) {
            (Type::Class(from_class), Type::Class(into_class))
                if !self.model.is_subclass_of(from_class, into_class) =>
            {
                Some(Sequential::CheckCast { class: into_class })
            }
            _ => None,
        }
    }
}
