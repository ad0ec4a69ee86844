use compiler__block_graph::{BlockExit, BlockGraph};
use compiler__instruction_set::{BranchingInstruction, FinalInstruction, SequentialInstruction};
use tracing::trace;

/// Straight-line instruction handed to [`Emitter::append`].
#[derive(Clone, Copy, Debug)]
pub enum EmittedInstruction<'a> {
    Sequential(&'a SequentialInstruction),
    Final(&'a FinalInstruction),
}

/// Narrow interface to a concrete target. Labels are opaque positions that
/// are bound once and may be referenced before they are bound.
pub trait Emitter {
    type Label: Copy;

    fn new_label(&mut self) -> Self::Label;

    fn append(&mut self, instruction: EmittedInstruction<'_>);

    fn append_jump_to(&mut self, label: Self::Label);

    /// Continues at `yes` when `condition` holds and at `no` otherwise.
    fn append_branch(
        &mut self,
        condition: &BranchingInstruction,
        yes: Self::Label,
        no: Self::Label,
    );

    /// Binds `label` to the position of the next appended instruction.
    fn bind(&mut self, label: Self::Label);
}

/// Emits every block of `graph` once, depth first from the entry. A block
/// following into another is always closed by an explicit jump; the
/// successor is emitted right after it when it was not emitted yet, so the
/// jump usually lands on the next instruction. After a branch the "no"
/// successor comes first.
pub fn linearize<E: Emitter>(graph: &BlockGraph, emitter: &mut E) {
    let mut label_by_block: Vec<Option<E::Label>> = vec![None; graph.len()];
    let mut emitted = vec![false; graph.len()];
    let mut pending = vec![graph.entry()];

    let mut label_for = |emitter: &mut E, block_index: usize| {
        *label_by_block[block_index].get_or_insert_with(|| emitter.new_label())
    };

    while let Some(block_id) = pending.pop() {
        if emitted[block_id.index()] {
            continue;
        }
        emitted[block_id.index()] = true;
        let label = label_for(emitter, block_id.index());
        emitter.bind(label);

        let block = graph.block(block_id);
        for instruction in &block.instructions {
            emitter.append(EmittedInstruction::Sequential(instruction));
        }
        match &block.exit {
            BlockExit::Final(instruction) => {
                emitter.append(EmittedInstruction::Final(instruction));
            }
            BlockExit::Follow(next) => {
                let next_label = label_for(emitter, next.index());
                emitter.append_jump_to(next_label);
                pending.push(*next);
            }
            BlockExit::Branch { condition, yes, no } => {
                let yes_label = label_for(emitter, yes.index());
                let no_label = label_for(emitter, no.index());
                emitter.append_branch(condition, yes_label, no_label);
                pending.push(*yes);
                pending.push(*no);
            }
        }
    }

    trace!(blocks = graph.len(), code = graph.code().0, "linearized block graph");
}
