use std::collections::{HashMap, VecDeque};

use compiler__instruction_set::{
    BranchingInstruction, FinalInstruction, Instruction, Sequential, SequentialInstruction,
};
use compiler__program_model::CodeId;
use compiler__reports::{CompilerFailure, CompilerFailureKind};

use crate::{Block, BlockExit, BlockGraph, BlockId};

struct PendingBlock {
    instructions: Vec<SequentialInstruction>,
    exit: Option<BlockExit>,
    mergeable: bool,
}

#[derive(PartialEq, Eq, Hash)]
struct BlockContent {
    instructions: Vec<SequentialInstruction>,
    exit: BlockExit,
}

/// Builds the graph of one member back to front: every constructor takes the
/// blocks control continues into and returns the block to continue from.
///
/// Structurally equal mergeable blocks are shared. The content table is only
/// ever looked up, never iterated, and is dropped together with the builder.
pub struct BlockGraphBuilder {
    code: CodeId,
    blocks: Vec<PendingBlock>,
    block_by_content: HashMap<BlockContent, BlockId>,
}

impl BlockGraphBuilder {
    #[must_use]
    pub fn new(code: CodeId) -> Self {
        Self {
            code,
            blocks: Vec::new(),
            block_by_content: HashMap::new(),
        }
    }

    #[must_use]
    pub fn code(&self) -> CodeId {
        self.code
    }

    /// Number of blocks allocated so far, including unreachable ones.
    #[must_use]
    pub fn allocated_block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn final_block(&mut self, instruction: FinalInstruction) -> BlockId {
        self.intern(Vec::new(), BlockExit::Final(instruction))
    }

    /// Block running `instructions` then continuing into `next`. With no
    /// instructions this is `next` itself.
    pub fn follow_block(
        &mut self,
        instructions: Vec<SequentialInstruction>,
        next: BlockId,
    ) -> BlockId {
        if instructions.is_empty() {
            return next;
        }
        self.intern(instructions, BlockExit::Follow(next))
    }

    /// Block testing `condition`. When both successors coincide the operands
    /// are popped instead and control falls through.
    pub fn branch_block(
        &mut self,
        condition: BranchingInstruction,
        yes: BlockId,
        no: BlockId,
    ) -> BlockId {
        if yes == no {
            let pops = condition
                .kind
                .operand_types()
                .into_iter()
                .rev()
                .map(|value_type| {
                    Instruction::new(Sequential::Pop { value_type }, condition.location)
                })
                .collect();
            return self.follow_block(pops, yes);
        }
        self.intern(Vec::new(), BlockExit::Branch { condition, yes, no })
    }

    pub fn prefix(&mut self, instruction: SequentialInstruction, block_id: BlockId) -> BlockId {
        self.prefix_all(vec![instruction], block_id)
    }

    /// Block running `instructions` before `block_id`. A mergeable block is
    /// copied with the instructions prepended; any other block gets a fresh
    /// predecessor.
    pub fn prefix_all(
        &mut self,
        instructions: Vec<SequentialInstruction>,
        block_id: BlockId,
    ) -> BlockId {
        if instructions.is_empty() {
            return block_id;
        }
        let block = &self.blocks[block_id.index()];
        let copied = match &block.exit {
            Some(exit) if self.is_mergeable(block_id) => {
                Some((block.instructions.clone(), exit.clone()))
            }
            _ => None,
        };
        match copied {
            Some((suffix, exit)) => {
                let mut merged = instructions;
                merged.extend(suffix);
                self.intern(merged, exit)
            }
            None => self.intern(instructions, BlockExit::Follow(block_id)),
        }
    }

    /// Excludes the block from sharing and from prefix copying, so every
    /// predecessor reaches this very block.
    pub fn do_not_merge(&mut self, block_id: BlockId) {
        let block = &mut self.blocks[block_id.index()];
        if !block.mergeable {
            return;
        }
        block.mergeable = false;
        if let Some(exit) = &block.exit {
            let content = BlockContent {
                instructions: block.instructions.clone(),
                exit: exit.clone(),
            };
            if self.block_by_content.get(&content) == Some(&block_id) {
                self.block_by_content.remove(&content);
            }
        }
    }

    #[must_use]
    pub fn is_mergeable(&self, block_id: BlockId) -> bool {
        self.blocks[block_id.index()].mergeable
    }

    /// Empty block whose exit is supplied later by `link_pivot`.
    pub fn new_pivot(&mut self) -> BlockId {
        self.push(PendingBlock {
            instructions: Vec::new(),
            exit: None,
            mergeable: false,
        })
    }

    pub fn link_pivot(&mut self, pivot: BlockId, target: BlockId) {
        let block = &mut self.blocks[pivot.index()];
        debug_assert!(block.exit.is_none(), "pivot {pivot:?} linked twice");
        block.exit = Some(BlockExit::Follow(target));
    }

    /// Keeps the blocks reachable from `entry`, renumbered in breadth-first
    /// discovery order.
    pub fn finish(self, entry: BlockId) -> Result<BlockGraph, CompilerFailure> {
        let mut new_id_by_old_id: Vec<Option<BlockId>> = vec![None; self.blocks.len()];
        let mut discovery_order = Vec::new();
        let mut queue = VecDeque::from([entry]);
        new_id_by_old_id[entry.index()] = Some(BlockId(0));

        while let Some(old_id) = queue.pop_front() {
            discovery_order.push(old_id);
            let Some(exit) = &self.blocks[old_id.index()].exit else {
                return Err(CompilerFailure::new(
                    CompilerFailureKind::UnlinkedPivot,
                    format!("pivot block {} was never linked", old_id.0),
                ));
            };
            for successor in exit.successors() {
                if new_id_by_old_id[successor.index()].is_none() {
                    let new_id = BlockId(
                        u32::try_from(discovery_order.len() + queue.len()).unwrap_or(u32::MAX),
                    );
                    new_id_by_old_id[successor.index()] = Some(new_id);
                    queue.push_back(successor);
                }
            }
        }

        let renumber = |old_id: BlockId| new_id_by_old_id[old_id.index()].unwrap_or(old_id);
        let mut blocks = Vec::with_capacity(discovery_order.len());
        let mut pending_blocks = self.blocks.into_iter().map(Some).collect::<Vec<_>>();
        for old_id in discovery_order {
            let Some(PendingBlock {
                instructions,
                exit: Some(exit),
                mergeable,
            }) = pending_blocks[old_id.index()].take()
            else {
                continue;
            };
            let exit = match exit {
                BlockExit::Final(instruction) => BlockExit::Final(instruction),
                BlockExit::Follow(next) => BlockExit::Follow(renumber(next)),
                BlockExit::Branch { condition, yes, no } => BlockExit::Branch {
                    condition,
                    yes: renumber(yes),
                    no: renumber(no),
                },
            };
            blocks.push(Block {
                instructions,
                exit,
                mergeable,
            });
        }

        Ok(BlockGraph::from_blocks(self.code, blocks))
    }

    fn intern(&mut self, instructions: Vec<SequentialInstruction>, exit: BlockExit) -> BlockId {
        let content = BlockContent { instructions, exit };
        if let Some(block_id) = self.block_by_content.get(&content) {
            return *block_id;
        }
        let block_id = self.push(PendingBlock {
            instructions: content.instructions.clone(),
            exit: Some(content.exit.clone()),
            mergeable: true,
        });
        self.block_by_content.insert(content, block_id);
        block_id
    }

    fn push(&mut self, block: PendingBlock) -> BlockId {
        let block_id = BlockId(u32::try_from(self.blocks.len()).unwrap_or(u32::MAX));
        self.blocks.push(block);
        block_id
    }
}
