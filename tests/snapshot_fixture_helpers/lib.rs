use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const TMP_OUTPUT_DIR_PLACEHOLDER: &str = "${TMP_OUTPUT_DIR}";
pub const INPUT_DIR_PLACEHOLDER: &str = "${INPUT_DIR}";

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFixtureRunMode {
    Check,
    Update,
}

#[must_use]
pub fn snapshot_fixture_run_mode_from_environment() -> SnapshotFixtureRunMode {
    if env::var_os("UPDATE_SNAPSHOTS").is_some() {
        SnapshotFixtureRunMode::Update
    } else {
        SnapshotFixtureRunMode::Check
    }
}

/// Case directories below `root_directory`, identified by containing
/// `case_marker_file_name`, sorted so runs are reproducible.
#[must_use]
pub fn collect_snapshot_fixture_cases(
    root_directory: &Path,
    case_marker_file_name: &str,
) -> Vec<PathBuf> {
    let mut case_directories = Vec::new();
    collect_into(root_directory, case_marker_file_name, &mut case_directories);
    case_directories.sort();
    case_directories
}

fn collect_into(directory: &Path, case_marker_file_name: &str, cases: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(directory).unwrap() {
        let path = entry.unwrap().path();
        if !path.is_dir() {
            continue;
        }
        if path.join(case_marker_file_name).is_file() {
            cases.push(path);
        } else {
            collect_into(&path, case_marker_file_name, cases);
        }
    }
}

/// Contents without the mandatory trailing newline; an empty file reads as
/// empty text.
#[must_use]
pub fn read_snapshot_fixture_file(case_directory: &Path, file_name: &str) -> String {
    let path = case_directory.join(file_name);
    let raw_contents = fs::read_to_string(&path).unwrap_or_else(|error| {
        panic!(
            "failed to read {file_name} for case {}: {error}",
            case_directory.display()
        )
    });
    if raw_contents.is_empty() {
        return String::new();
    }
    let contents = raw_contents.strip_suffix('\n').unwrap_or_else(|| {
        panic!(
            "{file_name} must end with a trailing newline for case {}",
            case_directory.display()
        )
    });
    assert!(
        !contents.is_empty(),
        "{file_name} must be empty or non-empty text ending with a newline for case {}",
        case_directory.display()
    );
    contents.to_string()
}

pub fn write_snapshot_fixture_file_if_changed(
    case_directory: &Path,
    file_name: &str,
    content: &str,
) {
    let canonical_content = if content.is_empty() {
        String::new()
    } else {
        format!("{content}\n")
    };
    let path = case_directory.join(file_name);
    let existing_contents = fs::read_to_string(&path).unwrap_or_default();
    if existing_contents != canonical_content {
        fs::write(&path, canonical_content).unwrap();
        println!("updated: {}", path.display());
    }
}

/// Non-empty, non-comment lines of an argument file with placeholders
/// expanded.
#[must_use]
pub fn parse_lines_with_placeholders(
    contents: &str,
    temp_output_directory: &Path,
    input_directory: &Path,
) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            line.replace(
                TMP_OUTPUT_DIR_PLACEHOLDER,
                &temp_output_directory.to_string_lossy(),
            )
            .replace(INPUT_DIR_PLACEHOLDER, &input_directory.to_string_lossy())
        })
        .collect()
}

/// Process output with one trailing newline dropped and the run's temporary
/// paths replaced by their placeholders.
#[must_use]
pub fn normalize_snapshot_fixture_process_output(
    output: &[u8],
    temp_output_directory: &Path,
    input_directory: &Path,
) -> String {
    let text = String::from_utf8_lossy(output);
    text.strip_suffix('\n')
        .unwrap_or(&text)
        .replace(
            temp_output_directory.to_string_lossy().as_ref(),
            TMP_OUTPUT_DIR_PLACEHOLDER,
        )
        .replace(
            input_directory.to_string_lossy().as_ref(),
            INPUT_DIR_PLACEHOLDER,
        )
}
