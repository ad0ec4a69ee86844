use std::cmp::Ordering;

use compiler__instruction_set::{
    Branching, BranchingInstruction, Comparison, Constant, Final, Sequential, SequentialInstruction,
};
use compiler__linearizer::{EmittedInstruction, Emitter};
use compiler__program_model::{CodeId, ProgramModel, Type};
use compiler__reports::{CompilerFailure, CompilerFailureKind};

use crate::descriptors::{field_reference, member_reference, type_descriptor};
use crate::{AssemblyInstruction, Condition, Operation, ValueKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssemblyLabel(usize);

/// Collects the instruction stream of one member. Every bound label marks a
/// `nop`, and jumps are recorded as patches resolved by [`Self::finish`].
#[derive(Debug)]
pub struct AssemblyBuilder<'a> {
    model: &'a ProgramModel,
    code: CodeId,
    instructions: Vec<AssemblyInstruction>,
    label_positions: Vec<Option<usize>>,
    patches: Vec<(usize, AssemblyLabel)>,
}

impl<'a> AssemblyBuilder<'a> {
    #[must_use]
    pub fn new(model: &'a ProgramModel, code: CodeId) -> Self {
        Self {
            model,
            code,
            instructions: Vec::new(),
            label_positions: Vec::new(),
            patches: Vec::new(),
        }
    }

    /// Resolves every recorded jump to the position its label was bound to.
    pub fn finish(mut self) -> Result<Vec<AssemblyInstruction>, CompilerFailure> {
        for (position, label) in std::mem::take(&mut self.patches) {
            let Some(target) = self.label_positions[label.0] else {
                return Err(CompilerFailure::new(
                    CompilerFailureKind::UnboundLabel,
                    format!(
                        "jump at {position} refers to label {} which was never bound",
                        label.0
                    ),
                )
                .in_member(self.model.describe_code(self.code)));
            };
            if let Some(slot) = self.instructions[position].branch_target_mut() {
                *slot = target;
            }
        }
        Ok(self.instructions)
    }

    fn push(&mut self, instruction: AssemblyInstruction) {
        self.instructions.push(instruction);
    }

    fn push_jump(&mut self, instruction: AssemblyInstruction, label: AssemblyLabel) {
        self.patches.push((self.instructions.len(), label));
        self.instructions.push(instruction);
    }

    fn append_sequential(&mut self, instruction: &SequentialInstruction) {
        let model = self.model;
        match &instruction.kind {
            Sequential::Nop => self.push(AssemblyInstruction::Nop),
            Sequential::Constant(constant) => self.push(push_constant(constant)),
            Sequential::Load { slot, value_type } => self.push(AssemblyInstruction::Load {
                kind: ValueKind::of(*value_type),
                slot: *slot,
            }),
            Sequential::Store { slot, value_type } => self.push(AssemblyInstruction::Store {
                kind: ValueKind::of(*value_type),
                slot: *slot,
            }),
            Sequential::GetField { field, .. } => self.push(AssemblyInstruction::GetField {
                field: field_reference(model, *field),
            }),
            Sequential::PutField { field, .. } => self.push(AssemblyInstruction::PutField {
                field: field_reference(model, *field),
            }),
            Sequential::ArrayLoad { element_type } => self.push(AssemblyInstruction::ArrayLoad {
                kind: ValueKind::of(*element_type),
            }),
            Sequential::ArrayStore { element_type } => {
                self.push(AssemblyInstruction::ArrayStore {
                    kind: ValueKind::of(*element_type),
                });
            }
            Sequential::ArrayLength => self.push(AssemblyInstruction::ArrayLength),
            Sequential::NewObject { class } => self.push(AssemblyInstruction::New {
                class: model.class(*class).name.clone(),
            }),
            Sequential::NewArray { element_type, .. } => {
                self.push(AssemblyInstruction::NewArray {
                    element_descriptor: type_descriptor(model, *element_type),
                });
            }
            Sequential::Arithmetic {
                operator,
                operand_type,
            } => self.push(AssemblyInstruction::Arithmetic {
                kind: ValueKind::of(*operand_type),
                operation: Operation::from_arithmetic_operator(*operator),
            }),
            Sequential::Negate { operand_type } => self.push(AssemblyInstruction::Negate {
                kind: ValueKind::of(*operand_type),
            }),
            Sequential::Compare {
                comparison,
                operand_type,
            } => self.append_comparison_value(
                *comparison,
                *operand_type,
                *comparison == Comparison::NotEqual,
            ),
            Sequential::Convert { from, into } => {
                let (from, into) = (ValueKind::of(*from), ValueKind::of(*into));
                if from != into {
                    self.push(AssemblyInstruction::Convert { from, into });
                }
            }
            Sequential::CheckCast { class } => self.push(AssemblyInstruction::CheckCast {
                class: model.class(*class).name.clone(),
            }),
            Sequential::Dup { .. } => self.push(AssemblyInstruction::Dup),
            Sequential::Pop { .. } => self.push(AssemblyInstruction::Pop),
            Sequential::ConstructorCall(call_site) => {
                self.push(AssemblyInstruction::InvokeSpecial {
                    member: member_reference(model, call_site.target),
                });
            }
            Sequential::VirtualCall(call_site) => {
                let mut member = member_reference(model, call_site.target);
                member.owner.clone_from(&model.class(call_site.static_receiver).name);
                self.push(AssemblyInstruction::InvokeVirtual { member });
            }
        }
    }

    /// Materializes a comparison as `0` or `1` through a local diamond.
    fn append_comparison_value(
        &mut self,
        comparison: Comparison,
        operand_type: Type,
        unordered_holds: bool,
    ) {
        let holds = self.new_label();
        let done = self.new_label();
        self.append_conditional_jump(comparison, operand_type, unordered_holds, holds);
        self.push(AssemblyInstruction::PushInt { value: 0 });
        self.append_jump_to(done);
        self.bind(holds);
        self.push(AssemblyInstruction::PushInt { value: 1 });
        self.bind(done);
    }

    /// Jumps to `target` when the comparison holds. For floats the NaN
    /// ordering is picked so an unordered pair jumps exactly when
    /// `unordered_holds` is set.
    fn append_conditional_jump(
        &mut self,
        comparison: Comparison,
        operand_type: Type,
        unordered_holds: bool,
        target: AssemblyLabel,
    ) {
        let condition = Condition::from_comparison(comparison);
        let kind = ValueKind::of(operand_type);
        if kind == ValueKind::Float {
            self.push(AssemblyInstruction::FloatCompare {
                nan_is_greater: condition.holds(Ordering::Greater) == unordered_holds,
            });
            self.push_jump(
                AssemblyInstruction::If {
                    condition,
                    target: 0,
                },
                target,
            );
        } else {
            self.push_jump(
                AssemblyInstruction::IfCompare {
                    kind,
                    condition,
                    target: 0,
                },
                target,
            );
        }
    }
}

fn push_constant(constant: &Constant) -> AssemblyInstruction {
    match constant {
        Constant::Int(value) => AssemblyInstruction::PushInt { value: *value },
        Constant::Float(bits) => AssemblyInstruction::PushFloat {
            value: f32::from_bits(*bits),
        },
        Constant::Boolean(value) => AssemblyInstruction::PushInt {
            value: i32::from(*value),
        },
        Constant::Nil => AssemblyInstruction::PushNull,
        Constant::String(value) => AssemblyInstruction::PushString {
            value: value.clone(),
        },
    }
}

impl Emitter for AssemblyBuilder<'_> {
    type Label = AssemblyLabel;

    fn new_label(&mut self) -> AssemblyLabel {
        self.label_positions.push(None);
        AssemblyLabel(self.label_positions.len() - 1)
    }

    fn append(&mut self, instruction: EmittedInstruction<'_>) {
        match instruction {
            EmittedInstruction::Sequential(instruction) => self.append_sequential(instruction),
            EmittedInstruction::Final(instruction) => match &instruction.kind {
                Final::Return => self.push(AssemblyInstruction::Return),
                Final::ReturnValue { value_type } => self.push(AssemblyInstruction::ReturnValue {
                    kind: ValueKind::of(*value_type),
                }),
            },
        }
    }

    fn append_jump_to(&mut self, label: AssemblyLabel) {
        self.push_jump(AssemblyInstruction::Goto { target: 0 }, label);
    }

    fn append_branch(
        &mut self,
        condition: &BranchingInstruction,
        yes: AssemblyLabel,
        no: AssemblyLabel,
    ) {
        match &condition.kind {
            Branching::IfTrue | Branching::IfFalse => {
                let condition = if condition.kind == Branching::IfTrue {
                    Condition::Ne
                } else {
                    Condition::Eq
                };
                self.push_jump(
                    AssemblyInstruction::If {
                        condition,
                        target: 0,
                    },
                    yes,
                );
            }
            Branching::IfCompare {
                comparison,
                operand_type,
                unordered_holds,
            } => self.append_conditional_jump(*comparison, *operand_type, *unordered_holds, yes),
        }
        self.append_jump_to(no);
    }

    fn bind(&mut self, label: AssemblyLabel) {
        self.label_positions[label.0] = Some(self.instructions.len());
        self.push(AssemblyInstruction::Nop);
    }
}
