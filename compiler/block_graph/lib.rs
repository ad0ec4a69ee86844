use std::collections::BTreeSet;

use compiler__instruction_set::{BranchingInstruction, FinalInstruction, SequentialInstruction};
use compiler__program_model::CodeId;

mod builder;
mod verify;

pub use builder::BlockGraphBuilder;
pub use verify::{verify_branches, verify_stack_heights};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How control leaves a block. A branching instruction is never stored in a
/// block's sequence; it only discriminates the two successors.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlockExit {
    Final(FinalInstruction),
    Follow(BlockId),
    Branch {
        condition: BranchingInstruction,
        yes: BlockId,
        no: BlockId,
    },
}

impl BlockExit {
    #[must_use]
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            BlockExit::Final(_) => Vec::new(),
            BlockExit::Follow(next) => vec![*next],
            BlockExit::Branch { yes, no, .. } => vec![*yes, *no],
        }
    }
}

#[derive(Clone, Debug)]
pub struct Block {
    pub instructions: Vec<SequentialInstruction>,
    pub exit: BlockExit,
    pub mergeable: bool,
}

/// Finished control-flow graph of one code member. Only blocks reachable
/// from the entry are kept, numbered in breadth-first discovery order, with
/// the entry as block 0.
#[derive(Clone, Debug)]
pub struct BlockGraph {
    code: CodeId,
    blocks: Vec<Block>,
}

impl BlockGraph {
    /// Graph over already numbered blocks; the first one is the entry and
    /// every successor must index into `blocks`.
    #[must_use]
    pub fn from_blocks(code: CodeId, blocks: Vec<Block>) -> Self {
        Self { code, blocks }
    }

    #[must_use]
    pub fn code(&self) -> CodeId {
        self.code
    }

    #[must_use]
    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    #[must_use]
    pub fn block(&self, block_id: BlockId) -> &Block {
        &self.blocks[block_id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len()).map(|index| BlockId(index as u32))
    }

    pub fn sequential_instructions(&self) -> impl Iterator<Item = &SequentialInstruction> + '_ {
        self.blocks.iter().flat_map(|block| block.instructions.iter())
    }

    /// Edges `(from, to)` closing a cycle in a depth-first walk from the
    /// entry. Loops contribute exactly one each.
    #[must_use]
    pub fn back_edges(&self) -> Vec<(BlockId, BlockId)> {
        let mut back_edges = Vec::new();
        let mut on_path = vec![false; self.blocks.len()];
        let mut visited = vec![false; self.blocks.len()];
        let mut stack: Vec<(BlockId, usize)> = vec![(self.entry(), 0)];
        visited[self.entry().index()] = true;
        on_path[self.entry().index()] = true;

        while let Some((block_id, next_successor)) = stack.last().copied() {
            let successors = self.block(block_id).exit.successors();
            if let Some(successor) = successors.get(next_successor).copied() {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                if on_path[successor.index()] {
                    back_edges.push((block_id, successor));
                } else if !visited[successor.index()] {
                    visited[successor.index()] = true;
                    on_path[successor.index()] = true;
                    stack.push((successor, 0));
                }
            } else {
                on_path[block_id.index()] = false;
                stack.pop();
            }
        }
        back_edges
    }

    /// Blocks with more than one predecessor edge.
    #[must_use]
    pub fn join_points(&self) -> BTreeSet<BlockId> {
        let mut predecessor_counts = vec![0usize; self.blocks.len()];
        for block in &self.blocks {
            for successor in block.exit.successors() {
                predecessor_counts[successor.index()] += 1;
            }
        }
        self.block_ids()
            .filter(|block_id| predecessor_counts[block_id.index()] > 1)
            .collect()
    }
}
