use std::fs;
use std::path::{Path, PathBuf};

use compiler__program_model::{CodeId, ProgramModel, check_consistency};
use compiler__reachability::close_program;
use compiler__reports::{CompilerFailure, CompilerFailureKind};
use compiler__stack_assembly::{AssembledProgram, assemble_program};
use compiler__stack_machine::{ProgramResult, execute};
use tracing::{debug, info};

/// Extension of the artifact `build_program` writes.
pub const ARTIFACT_EXTENSION: &str = "stack.json";

pub const DEFAULT_ENTRY_METHOD: &str = "run";

pub struct EntryPoint {
    pub class: String,
    pub method: String,
}

pub struct BuiltProgram {
    pub artifact_path: PathBuf,
}

pub fn read_program_model(path: &Path) -> Result<ProgramModel, CompilerFailure> {
    let source = fs::read_to_string(path).map_err(|error| {
        CompilerFailure::new(
            CompilerFailureKind::ReadInput,
            format!("failed to read program model: {error}"),
        )
        .at_path(path.display().to_string())
    })?;
    serde_json::from_str(&source).map_err(|error| {
        CompilerFailure::new(
            CompilerFailureKind::InvalidProgramModel,
            format!("failed to parse program model: {error}"),
        )
        .at_path(path.display().to_string())
    })
}

/// Checks the model, closes it from the entry point and assembles every
/// reachable member. The entry class's zero-argument constructor is a second
/// root so the machine can instantiate it.
pub fn compile_program(
    model: &ProgramModel,
    entry_point: &EntryPoint,
) -> Result<AssembledProgram, CompilerFailure> {
    check_consistency(model)?;
    let (entry_method, entry_constructor) = resolve_entry_point(model, entry_point)?;

    let mut entries = vec![entry_method];
    entries.extend(entry_constructor);
    let program = close_program(model, &entries)?;
    debug!(
        entry = %model.describe_code(entry_method),
        reachable_code = program.reachable_code().len(),
        "closed program"
    );
    assemble_program(model, &program)
}

fn resolve_entry_point(
    model: &ProgramModel,
    entry_point: &EntryPoint,
) -> Result<(CodeId, Option<CodeId>), CompilerFailure> {
    let Some(class) = model.class_named(&entry_point.class) else {
        return Err(CompilerFailure::new(
            CompilerFailureKind::EntryPointNotFound,
            format!("entry class '{}' does not exist", entry_point.class),
        ));
    };
    let Some(method) = model.method_in_class(class, &entry_point.method, &[]) else {
        return Err(CompilerFailure::new(
            CompilerFailureKind::EntryPointNotFound,
            format!(
                "class '{}' declares no method '{}' without parameters",
                entry_point.class, entry_point.method
            ),
        ));
    };
    Ok((method, model.zero_argument_constructor(class)))
}

pub fn build_program(
    program: &AssembledProgram,
    build_directory: &Path,
) -> Result<BuiltProgram, CompilerFailure> {
    fs::create_dir_all(build_directory).map_err(|error| {
        build_failed(
            format!("failed to create build output directory: {error}"),
            build_directory,
        )
    })?;

    let artifact_path =
        build_directory.join(format!("{}.{ARTIFACT_EXTENSION}", program.entry.owner));
    let serialized_artifact = serde_json::to_string_pretty(program).map_err(|error| {
        build_failed(
            format!("failed to serialize build artifact: {error}"),
            &artifact_path,
        )
    })?;
    fs::write(&artifact_path, serialized_artifact).map_err(|error| {
        build_failed(
            format!("failed to write build artifact: {error}"),
            &artifact_path,
        )
    })?;

    info!(artifact = %artifact_path.display(), "wrote build artifact");
    Ok(BuiltProgram { artifact_path })
}

pub fn run_program(artifact_path: &Path) -> Result<ProgramResult, CompilerFailure> {
    let artifact_source = fs::read_to_string(artifact_path).map_err(|error| {
        run_failed(
            format!("failed to read build artifact: {error}"),
            artifact_path,
        )
    })?;
    let program: AssembledProgram = serde_json::from_str(&artifact_source).map_err(|error| {
        run_failed(
            format!("failed to parse build artifact: {error}"),
            artifact_path,
        )
    })?;
    execute(&program)
}

fn build_failed(message: String, path: &Path) -> CompilerFailure {
    CompilerFailure::new(CompilerFailureKind::BuildFailed, message)
        .at_path(path.display().to_string())
}

fn run_failed(message: String, path: &Path) -> CompilerFailure {
    CompilerFailure::new(CompilerFailureKind::RunFailed, message)
        .at_path(path.display().to_string())
}
