use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use compiler__driver::{
    DEFAULT_ENTRY_METHOD, EntryPoint, build_program, compile_program, read_program_model,
    run_program,
};
use compiler__reports::{CompilerFailure, ReportFormat, render_failure};
use compiler__stack_machine::ProgramResult;
use tracing_subscriber::EnvFilter;

const LOG_FILTER_VARIABLE: &str = "STACKC_LOG";

#[derive(Parser)]
#[command(name = "stackc", version)]
struct CommandLine {
    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Compile a program model into a stack assembly artifact.
    Build {
        /// JSON serialization of the typed program model.
        model: PathBuf,
        #[arg(long)]
        entry_class: String,
        #[arg(long, default_value = DEFAULT_ENTRY_METHOD)]
        entry_method: String,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value = "text")]
        report_format: ReportFormat,
    },
    /// Execute a previously built artifact and print its result.
    Run {
        artifact: PathBuf,
        #[arg(long, default_value = "text")]
        report_format: ReportFormat,
    },
}

fn main() -> ExitCode {
    initialize_logging();
    let command_line = CommandLine::parse();
    match command_line.command {
        Mode::Build {
            model,
            entry_class,
            entry_method,
            output,
            report_format,
        } => {
            let entry_point = EntryPoint {
                class: entry_class,
                method: entry_method,
            };
            let result = read_program_model(&model)
                .and_then(|model| compile_program(&model, &entry_point))
                .and_then(|program| build_program(&program, &output));
            match result {
                Ok(_) => ExitCode::SUCCESS,
                Err(failure) => report(&failure, report_format),
            }
        }
        Mode::Run {
            artifact,
            report_format,
        } => match run_program(&artifact) {
            Ok(ProgramResult::Void) => ExitCode::SUCCESS,
            Ok(result) => {
                println!("{result}");
                ExitCode::SUCCESS
            }
            Err(failure) => report(&failure, report_format),
        },
    }
}

fn report(failure: &CompilerFailure, format: ReportFormat) -> ExitCode {
    eprintln!("{}", render_failure(failure, format));
    ExitCode::FAILURE
}

fn initialize_logging() {
    let filter = env::var(LOG_FILTER_VARIABLE)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .init();
}
