use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use compiler__block_graph::{
    BlockExit, BlockGraph, BlockGraphBuilder, BlockId, verify_branches, verify_stack_heights,
};
use compiler__instruction_set::{
    CallSite, CodeLocation, Final, Instruction, Sequential, SequentialInstruction,
};
use compiler__program_model::{CodeId, ProgramModel, Type};
use compiler__reports::{CompilerFailure, CompilerFailureKind};
use compiler__source::Span;
use tracing::debug;

mod commands;
mod conditions;
mod expressions;

/// Block graphs of the members translated so far, keyed by member. Each
/// member is translated at most once per compilation.
#[derive(Debug, Default)]
pub struct CodeTranslations {
    graph_by_code: BTreeMap<CodeId, BlockGraph>,
}

impl CodeTranslations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph of `code`, translating it on the first request.
    pub fn translate(
        &mut self,
        model: &ProgramModel,
        code: CodeId,
    ) -> Result<&BlockGraph, CompilerFailure> {
        match self.graph_by_code.entry(code) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(translate_code(model, code)?)),
        }
    }

    #[must_use]
    pub fn get(&self, code: CodeId) -> Option<&BlockGraph> {
        self.graph_by_code.get(&code)
    }

    #[must_use]
    pub fn contains(&self, code: CodeId) -> bool {
        self.graph_by_code.contains_key(&code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.graph_by_code.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph_by_code.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = CodeId> + '_ {
        self.graph_by_code.keys().copied()
    }
}

/// Translates the body of one constructor or method into a finished, verified
/// block graph.
pub fn translate_code(model: &ProgramModel, code: CodeId) -> Result<BlockGraph, CompilerFailure> {
    let signature = model.code(code);
    let member = model.describe_code(code);
    let mut translator = Translator {
        model,
        code,
        builder: BlockGraphBuilder::new(code),
    };

    let body_exit = if signature.return_type == Type::Void {
        translator.final_block(Final::Return, signature.body.span())
    } else {
        let sentinel = translator.final_block(Final::Return, signature.body.span());
        translator.builder.do_not_merge(sentinel);
        sentinel
    };
    let mut entry = translator
        .translate_command(&signature.body, body_exit)
        .map_err(|failure| failure.in_member(&member))?;
    if signature.is_constructor() {
        entry = translator.prefix_superclass_constructor_call(entry);
    }

    let allocated_blocks = translator.builder.allocated_block_count();
    let graph = translator
        .builder
        .finish(entry)
        .map_err(|failure| failure.in_member(&member))?;

    if signature.return_type != Type::Void
        && let Some(span) =
            graph
                .block_ids()
                .find_map(|block_id| match &graph.block(block_id).exit {
                    BlockExit::Final(instruction) if instruction.kind == Final::Return => {
                        Some(instruction.location.span)
                    }
                    _ => None,
                })
    {
        return Err(CompilerFailure::new(
            CompilerFailureKind::MissingReturn,
            "control can reach the end of a member that returns a value",
        )
        .in_member(member)
        .at(span));
    }

    verify_branches(model, &graph)?;
    verify_stack_heights(model, &graph)?;

    debug!(
        member = %member,
        allocated_blocks,
        blocks = graph.len(),
        join_points = graph.join_points().len(),
        back_edges = graph.back_edges().len(),
        "translated member"
    );
    Ok(graph)
}

pub(crate) struct Translator<'a> {
    model: &'a ProgramModel,
    code: CodeId,
    builder: BlockGraphBuilder,
}

impl Translator<'_> {
    fn location(&self, span: Span) -> CodeLocation {
        CodeLocation::new(self.code, span)
    }

    fn instruction(&self, kind: Sequential, span: Span) -> SequentialInstruction {
        Instruction::new(kind, self.location(span))
    }

    fn final_block(&mut self, kind: Final, span: Span) -> BlockId {
        let instruction = Instruction::new(kind, self.location(span));
        self.builder.final_block(instruction)
    }

    fn prefix(&mut self, kind: Sequential, span: Span, continuation: BlockId) -> BlockId {
        let instruction = self.instruction(kind, span);
        self.builder.prefix(instruction, continuation)
    }

    /// Constructors start by running the superclass's zero-argument
    /// constructor on `this`, when the superclass declares one.
    fn prefix_superclass_constructor_call(&mut self, body_entry: BlockId) -> BlockId {
        let class = self.model.code(self.code).class;
        let Some(superclass) = self.model.class(class).superclass else {
            return body_entry;
        };
        let Some(constructor) = self.model.zero_argument_constructor(superclass) else {
            return body_entry;
        };
        let instructions = vec![
            self.instruction(
                Sequential::Load {
                    slot: 0,
                    value_type: Type::Class(class),
                },
                Span::synthesized(),
            ),
            self.instruction(
                Sequential::ConstructorCall(CallSite::new(self.model, superclass, constructor)),
                Span::synthesized(),
            ),
        ];
        self.builder.prefix_all(instructions, body_entry)
    }
}
