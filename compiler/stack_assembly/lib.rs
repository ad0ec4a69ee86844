use compiler__linearizer::linearize;
use compiler__program_model::{ClassId, CodeId, ProgramModel};
use compiler__reachability::Program;
use compiler__reports::CompilerFailure;
use serde::{Deserialize, Serialize};
use tracing::debug;

mod builder;
mod cleanup;
mod descriptors;
mod instructions;

pub use builder::{AssemblyBuilder, AssemblyLabel};
pub use cleanup::cleanup;
pub use descriptors::{field_reference, member_descriptor, member_reference, type_descriptor};
pub use instructions::{AssemblyInstruction, Condition, MemberReference, Operation, ValueKind};

/// Build artifact: every class of the model, carrying only its reachable
/// fields and members.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssembledProgram {
    pub entry: MemberReference,
    pub classes: Vec<AssembledClass>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssembledClass {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    pub fields: Vec<AssembledField>,
    pub constructors: Vec<AssembledMember>,
    pub methods: Vec<AssembledMember>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssembledField {
    pub name: String,
    pub descriptor: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssembledMember {
    pub name: String,
    pub descriptor: String,
    pub max_locals: u16,
    pub instructions: Vec<AssemblyInstruction>,
}

impl AssembledProgram {
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&AssembledClass> {
        self.classes.iter().find(|class| class.name == name)
    }
}

impl AssembledClass {
    #[must_use]
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&AssembledMember> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }

    #[must_use]
    pub fn constructor(&self, descriptor: &str) -> Option<&AssembledMember> {
        self.constructors
            .iter()
            .find(|constructor| constructor.descriptor == descriptor)
    }
}

/// Linearizes and cleans every reachable member of `program`.
pub fn assemble_program(
    model: &ProgramModel,
    program: &Program,
) -> Result<AssembledProgram, CompilerFailure> {
    let classes = model
        .class_ids()
        .map(|class| assemble_class(model, program, class))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        classes = classes.len(),
        members = program.reachable_code().len(),
        "assembled program"
    );
    Ok(AssembledProgram {
        entry: member_reference(model, program.entry()),
        classes,
    })
}

fn assemble_class(
    model: &ProgramModel,
    program: &Program,
    class: ClassId,
) -> Result<AssembledClass, CompilerFailure> {
    let declaration = model.class(class);
    let fields = declaration
        .field_by_name
        .values()
        .filter(|field| program.reachable_fields().contains(field))
        .map(|field| {
            let signature = model.field(*field);
            AssembledField {
                name: signature.name.clone(),
                descriptor: type_descriptor(model, signature.field_type),
            }
        })
        .collect();

    let mut constructors = Vec::new();
    let mut methods = Vec::new();
    for code in program
        .reachable_code()
        .iter()
        .filter(|code| model.code(**code).class == class)
    {
        let member = assemble_member(model, program, *code)?;
        if model.code(*code).is_constructor() {
            constructors.push(member);
        } else {
            methods.push(member);
        }
    }

    Ok(AssembledClass {
        name: declaration.name.clone(),
        superclass: declaration
            .superclass
            .map(|superclass| model.class(superclass).name.clone()),
        fields,
        constructors,
        methods,
    })
}

/// Emits the block graph of `code` into a fresh stream, resolves its labels
/// and cleans it up.
pub fn assemble_member(
    model: &ProgramModel,
    program: &Program,
    code: CodeId,
) -> Result<AssembledMember, CompilerFailure> {
    let graph = program.block_graph(model, code)?;
    let mut builder = AssemblyBuilder::new(model, code);
    linearize(graph, &mut builder);
    let emitted = builder.finish()?;
    let emitted_len = emitted.len();
    let instructions = cleanup(emitted);
    debug!(
        member = %model.describe_code(code),
        emitted = emitted_len,
        kept = instructions.len(),
        "assembled member"
    );

    let signature = model.code(code);
    Ok(AssembledMember {
        name: descriptors::member_name(model, code).to_string(),
        descriptor: member_descriptor(model, code),
        max_locals: max_locals(signature.parameter_slot_count(), &instructions),
        instructions,
    })
}

/// Slots the member needs: its receiver and parameters plus every local it
/// loads or stores.
fn max_locals(parameter_slots: usize, instructions: &[AssemblyInstruction]) -> u16 {
    let parameter_slots = u16::try_from(parameter_slots).unwrap_or(u16::MAX);
    instructions
        .iter()
        .filter_map(|instruction| match instruction {
            AssemblyInstruction::Load { slot, .. } | AssemblyInstruction::Store { slot, .. } => {
                Some(slot.saturating_add(1))
            }
            _ => None,
        })
        .fold(parameter_slots, u16::max)
}
