use std::collections::VecDeque;

use compiler__instruction_set::InstructionKind;
use compiler__program_model::ProgramModel;
use compiler__reports::{CompilerFailure, CompilerFailureKind};

use crate::{BlockExit, BlockGraph, BlockId};

/// Rejects a branch continuing into the same block on both outcomes.
/// `BlockGraphBuilder::branch_block` pops the operands instead, so only
/// graphs assembled with [`BlockGraph::from_blocks`] can carry one.
pub fn verify_branches(model: &ProgramModel, graph: &BlockGraph) -> Result<(), CompilerFailure> {
    for block_id in graph.block_ids() {
        if let BlockExit::Branch { condition, yes, no } = &graph.block(block_id).exit
            && yes == no
        {
            return Err(CompilerFailure::new(
                CompilerFailureKind::MalformedBranch,
                format!(
                    "`{}` in block {} continues into block {} on both outcomes",
                    condition.describe(model),
                    block_id.0,
                    yes.0
                ),
            )
            .in_member(model.describe_code(graph.code()))
            .at(condition.location.span));
        }
    }
    Ok(())
}

/// Stack height on entry to every block, indexed by block id. Each block
/// must be entered with a single height, no instruction may pop below the
/// bottom, and every final instruction must leave the stack empty.
pub fn verify_stack_heights(
    model: &ProgramModel,
    graph: &BlockGraph,
) -> Result<Vec<usize>, CompilerFailure> {
    let member = model.describe_code(graph.code());
    let mut height_by_block: Vec<Option<usize>> = vec![None; graph.len()];
    let mut queue = VecDeque::from([graph.entry()]);
    height_by_block[graph.entry().index()] = Some(0);

    while let Some(block_id) = queue.pop_front() {
        let block = graph.block(block_id);
        let mut height = height_by_block[block_id.index()].unwrap_or_default();
        for instruction in &block.instructions {
            let effect = instruction.stack_effect();
            if effect.pops > height {
                return Err(CompilerFailure::new(
                    CompilerFailureKind::StackImbalance,
                    format!(
                        "`{}` pops {} values from a stack of height {height}",
                        instruction.describe(model),
                        effect.pops
                    ),
                )
                .in_member(member)
                .at(instruction.location.span));
            }
            height = height.saturating_add_signed(effect.net());
        }

        let mut successor_height = |successor: BlockId, height: usize| {
            match height_by_block[successor.index()] {
                None => {
                    height_by_block[successor.index()] = Some(height);
                    queue.push_back(successor);
                    Ok(())
                }
                Some(recorded) if recorded == height => Ok(()),
                Some(recorded) => Err(CompilerFailure::new(
                    CompilerFailureKind::StackImbalance,
                    format!(
                        "block {} is entered with stack heights {recorded} and {height}",
                        successor.0
                    ),
                )),
            }
        };

        match &block.exit {
            BlockExit::Final(instruction) => {
                let pops = instruction.stack_effect().pops;
                if height != pops {
                    return Err(CompilerFailure::new(
                        CompilerFailureKind::StackImbalance,
                        format!(
                            "`{}` leaves {} values on the stack",
                            instruction.describe(model),
                            height.abs_diff(pops)
                        ),
                    )
                    .in_member(member)
                    .at(instruction.location.span));
                }
            }
            BlockExit::Follow(next) => {
                successor_height(*next, height).map_err(|failure| failure.in_member(&member))?;
            }
            BlockExit::Branch { condition, yes, no } => {
                let pops = condition.stack_effect().pops;
                if pops > height {
                    return Err(CompilerFailure::new(
                        CompilerFailureKind::StackImbalance,
                        format!(
                            "`{}` tests {pops} values on a stack of height {height}",
                            condition.describe(model)
                        ),
                    )
                    .in_member(member)
                    .at(condition.location.span));
                }
                for successor in [*yes, *no] {
                    successor_height(successor, height - pops).map_err(|failure| {
                        failure.in_member(&member).at(condition.location.span)
                    })?;
                }
            }
        }
    }

    Ok(height_by_block
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}
