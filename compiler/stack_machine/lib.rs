use std::fmt;

use compiler__reports::{CompilerFailure, CompilerFailureKind};
use compiler__stack_assembly::AssembledProgram;
use tracing::debug;

mod machine;
mod values;

pub use machine::{MAX_ARRAY_LENGTH, MAX_CALL_DEPTH};

use machine::{Machine, RuntimeExecutionError};
use values::{HeapEntry, RuntimeValue, parameter_count, return_descriptor};

/// Value the entry method returned, typed by its descriptor.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgramResult {
    Void,
    Int(i32),
    Float(f32),
    Boolean(bool),
    String(String),
    Nil,
    Object { class: String },
    Array { length: usize },
}

impl fmt::Display for ProgramResult {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => Ok(()),
            Self::Int(value) => write!(formatter, "{value}"),
            Self::Float(value) => write!(formatter, "{value:?}"),
            Self::Boolean(value) => write!(formatter, "{value}"),
            Self::String(value) => formatter.write_str(value),
            Self::Nil => formatter.write_str("nil"),
            Self::Object { class } => write!(formatter, "<{class}>"),
            Self::Array { length } => write!(formatter, "<array of {length}>"),
        }
    }
}

/// Instantiates the entry class, runs its zero-argument constructor when one
/// was assembled and returns what the entry method yields.
pub fn execute(program: &AssembledProgram) -> Result<ProgramResult, CompilerFailure> {
    let entry = &program.entry;
    debug!(entry = %entry, classes = program.classes.len(), "executing program");
    if parameter_count(&entry.descriptor) != Some(0) {
        return Err(run_failed(format!(
            "entry point {entry} must not take parameters"
        )));
    }

    let mut machine = Machine::new(program);
    let receiver = machine
        .instantiate(&entry.owner)
        .map_err(|error| error.into_failure(None))?;
    if let Ok((owner, constructor)) = machine.constructor(&entry.owner, "()V") {
        machine.invoke(owner, constructor, vec![receiver.clone()])?;
    }
    let (owner, method) = machine
        .resolve_virtual(&entry.owner, &entry.name, &entry.descriptor)
        .map_err(|error| error.into_failure(None))?;
    let value = machine.invoke(owner, method, vec![receiver])?;

    let result = program_result(&machine, value, return_descriptor(&entry.descriptor))
        .map_err(|error| error.into_failure(Some(entry.to_string())))?;
    debug!(result = %result, "program finished");
    Ok(result)
}

fn program_result(
    machine: &Machine<'_>,
    value: Option<RuntimeValue>,
    descriptor: Option<&str>,
) -> Result<ProgramResult, RuntimeExecutionError> {
    Ok(match (value, descriptor) {
        (None, Some("V")) => ProgramResult::Void,
        (Some(RuntimeValue::Int(value)), Some("Z")) => ProgramResult::Boolean(value != 0),
        (Some(RuntimeValue::Int(value)), _) => ProgramResult::Int(value),
        (Some(RuntimeValue::Float(value)), _) => ProgramResult::Float(value),
        (Some(RuntimeValue::String(value)), _) => ProgramResult::String(value.to_string()),
        (Some(RuntimeValue::Null), _) => ProgramResult::Nil,
        (Some(RuntimeValue::Reference(reference)), _) => match machine.heap_entry(reference) {
            Some(HeapEntry::Object { class, .. }) => ProgramResult::Object {
                class: class.clone(),
            },
            Some(HeapEntry::Array { elements }) => ProgramResult::Array {
                length: elements.len(),
            },
            None => {
                return Err(RuntimeExecutionError::InvalidProgram(
                    "entry point returned a dangling reference".to_string(),
                ));
            }
        },
        (None, _) => {
            return Err(RuntimeExecutionError::InvalidProgram(
                "entry point returned no value".to_string(),
            ));
        }
    })
}

pub(crate) fn run_failed(message: String) -> CompilerFailure {
    CompilerFailure::new(CompilerFailureKind::RunFailed, message)
}
