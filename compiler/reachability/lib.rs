use std::collections::{BTreeSet, VecDeque};

use compiler__block_graph::{BlockExit, BlockGraph, BlockId};
use compiler__graph_builder::CodeTranslations;
use compiler__program_model::{CodeId, FieldId, ProgramModel};
use compiler__reports::{CompilerFailure, CompilerFailureKind};
use tracing::{debug, trace};

/// Whole-program closure: the members and fields live from the entry points,
/// each reachable member with its block graph.
#[derive(Debug)]
pub struct Program {
    entries: Vec<CodeId>,
    reachable_code: BTreeSet<CodeId>,
    reachable_fields: BTreeSet<FieldId>,
    translations: CodeTranslations,
}

impl Program {
    /// The designated entry point, the first root the closure started from.
    #[must_use]
    pub fn entry(&self) -> CodeId {
        self.entries[0]
    }

    #[must_use]
    pub fn entries(&self) -> &[CodeId] {
        &self.entries
    }

    #[must_use]
    pub fn reachable_code(&self) -> &BTreeSet<CodeId> {
        &self.reachable_code
    }

    #[must_use]
    pub fn reachable_fields(&self) -> &BTreeSet<FieldId> {
        &self.reachable_fields
    }

    #[must_use]
    pub fn is_reachable(&self, code: CodeId) -> bool {
        self.reachable_code.contains(&code)
    }

    pub fn block_graph(
        &self,
        model: &ProgramModel,
        code: CodeId,
    ) -> Result<&BlockGraph, CompilerFailure> {
        self.translations.get(code).ok_or_else(|| {
            CompilerFailure::new(
                CompilerFailureKind::MissingBlockGraph,
                "member has no block graph in the closed program",
            )
            .in_member(model.describe_code(code))
        })
    }
}

/// Work-list fixpoint from `entries`: every member reached is translated once
/// and scanned for accessed fields and for the dynamic targets of its calls.
pub fn close_program(
    model: &ProgramModel,
    entries: &[CodeId],
) -> Result<Program, CompilerFailure> {
    if entries.is_empty() {
        return Err(CompilerFailure::new(
            CompilerFailureKind::EntryPointNotFound,
            "closing a program requires at least one entry point",
        ));
    }

    let mut translations = CodeTranslations::new();
    let mut reachable_code = BTreeSet::new();
    let mut reachable_fields = BTreeSet::new();
    let mut work_list = VecDeque::new();
    for entry in entries {
        if reachable_code.insert(*entry) {
            work_list.push_back(*entry);
        }
    }

    while let Some(code) = work_list.pop_front() {
        let graph = translations.translate(model, code)?;
        let mut seen = vec![false; graph.len()];
        let mut pending = vec![graph.entry()];
        seen[graph.entry().index()] = true;

        while let Some(block_id) = pending.pop() {
            let block = graph.block(block_id);
            for instruction in &block.instructions {
                if let Some(field) = instruction.accessed_field() {
                    reachable_fields.insert(field);
                }
                let Some(call_site) = instruction.call_site() else {
                    continue;
                };
                if call_site.dynamic_targets.is_empty() {
                    return Err(CompilerFailure::new(
                        CompilerFailureKind::UnresolvedCallSite,
                        format!(
                            "call of `{}` through `{}` has no dynamic target",
                            model.describe_code(call_site.target),
                            model.class(call_site.static_receiver).name
                        ),
                    )
                    .in_member(model.describe_code(code))
                    .at(instruction.location.span));
                }
                for target in &call_site.dynamic_targets {
                    if reachable_code.insert(*target) {
                        trace!(
                            caller = %model.describe_code(code),
                            callee = %model.describe_code(*target),
                            "reached member"
                        );
                        work_list.push_back(*target);
                    }
                }
            }
            push_unseen_successors(&block.exit, &mut seen, &mut pending);
        }
    }

    debug!(
        entries = entries.len(),
        reachable_code = reachable_code.len(),
        reachable_fields = reachable_fields.len(),
        "closed program"
    );
    Ok(Program {
        entries: entries.to_vec(),
        reachable_code,
        reachable_fields,
        translations,
    })
}

fn push_unseen_successors(exit: &BlockExit, seen: &mut [bool], pending: &mut Vec<BlockId>) {
    for successor in exit.successors() {
        if !seen[successor.index()] {
            seen[successor.index()] = true;
            pending.push(successor);
        }
    }
}
