use crate::AssemblyInstruction;

/// Removes no-ops and jumps to the textually next instruction until none is
/// left. Targets of a removed instruction move to its successor. The stream is
/// never emptied, and a targeted last instruction is kept.
#[must_use]
pub fn cleanup(mut instructions: Vec<AssemblyInstruction>) -> Vec<AssemblyInstruction> {
    if instructions.is_empty() {
        return vec![AssemblyInstruction::Nop];
    }
    while let Some(position) = removable_position(&instructions) {
        instructions.remove(position);
        for instruction in &mut instructions {
            if let Some(target) = instruction.branch_target_mut()
                && *target > position
            {
                *target -= 1;
            }
        }
    }
    instructions
}

fn removable_position(instructions: &[AssemblyInstruction]) -> Option<usize> {
    if instructions.len() <= 1 {
        return None;
    }
    let last = instructions.len() - 1;
    instructions
        .iter()
        .enumerate()
        .position(|(position, instruction)| {
            let removable = match instruction {
                AssemblyInstruction::Nop => true,
                AssemblyInstruction::Goto { target } => *target == position + 1,
                _ => false,
            };
            removable && (position < last || !is_targeted(instructions, position))
        })
}

fn is_targeted(instructions: &[AssemblyInstruction], position: usize) -> bool {
    instructions
        .iter()
        .any(|instruction| instruction.branch_target() == Some(position))
}
