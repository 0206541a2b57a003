use std::ffi::OsString;
use std::io;
use std::process::{ExitCode, Termination};

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use colored::Colorize;
use parade_cli::{Args, Command, CoordinateCommand, RunCommand, RunOptions};
use parade_logging::{Printer, VerbosityLevel, set_colored_override, setup_tracing};
use parade_metadata::{ProjectMetadata, ProjectOptionsOverrides, ProjectSettings};
use parade_protocol::MessageWriter;
use parade_runner::GlobDiscovery;

mod presenter;
mod render;

pub fn parade_main(f: impl FnOnce(Vec<OsString>) -> Vec<OsString>) -> ExitStatus {
    run(f).unwrap_or_else(|error| {
        use std::io::Write;

        let mut stderr = std::io::stderr().lock();

        writeln!(stderr, "{}", "Parade failed".red().bold()).ok();
        for cause in error.chain() {
            if let Some(ioerr) = cause.downcast_ref::<io::Error>() {
                if ioerr.kind() == io::ErrorKind::BrokenPipe {
                    return ExitStatus::Success;
                }
            }

            writeln!(stderr, "  {} {cause}", "Cause:".bold()).ok();
        }

        ExitStatus::Error
    })
}

fn run(f: impl FnOnce(Vec<OsString>) -> Vec<OsString>) -> anyhow::Result<ExitStatus> {
    let args = wild::args_os();

    let args = f(
        argfile::expand_args_from(args, argfile::parse_fromfile, argfile::PREFIX)
            .context("Failed to read CLI arguments from file")?,
    );

    let args = Args::parse_from(args);
    let verbosity = args.verbosity.level();

    match args.command {
        Some(Command::Coordinate(command)) => coordinate(command, verbosity),
        None => test(args.run, verbosity),
    }
}

/// Validate the run, then present the coordinator's results.
fn test(args: RunCommand, verbosity: VerbosityLevel) -> anyhow::Result<ExitStatus> {
    set_colored_override(args.color);
    setup_tracing(verbosity);

    let printer = Printer::new(verbosity, args.no_progress);
    let pattern = args.pattern.context("No test file pattern given")?;

    let cwd = current_dir()?;
    tracing::debug!(cwd = %cwd, "Working directory");

    // The coordinator runs in the same directory, but resolve the config
    // file here so a bad path is reported once, before anything starts.
    let options = RunOptions {
        config_file: args.options.config_file.map(|path| cwd.join(path)),
        ..args.options
    };

    let settings = project_settings(&cwd, options.clone())?;
    GlobDiscovery::new(&pattern, settings.discovery().clone())?;

    presenter::present(printer, &pattern, &options)
}

/// Run the coordinator, writing the merged event stream to stdout.
fn coordinate(args: CoordinateCommand, verbosity: VerbosityLevel) -> anyhow::Result<ExitStatus> {
    setup_tracing(verbosity);

    let cwd = current_dir()?;
    let settings = project_settings(&cwd, args.options)?;

    let mut writer = MessageWriter::new(io::stdout().lock());
    parade_runner::run_coordinator(&args.pattern, &settings, &mut writer)?;

    Ok(ExitStatus::Success)
}

fn project_settings(cwd: &Utf8Path, options: RunOptions) -> anyhow::Result<ProjectSettings> {
    let config_file = options.config_file.clone();
    let project_options_overrides = ProjectOptionsOverrides::new(config_file, options.into_options());

    let mut project_metadata = ProjectMetadata::load(cwd, &project_options_overrides)?;
    tracing::debug!(
        root = %project_metadata.root(),
        config_file = ?project_metadata.config_file(),
        options = ?project_metadata.options(),
        "Loaded project configuration"
    );

    project_metadata.apply_overrides(&project_options_overrides);

    Ok(project_metadata.to_settings()?)
}

fn current_dir() -> anyhow::Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().context("Failed to get the current working directory")?;
    Utf8PathBuf::from_path_buf(cwd).map_err(|path| {
        anyhow::anyhow!(
            "The current working directory `{}` contains non-Unicode characters. parade only supports Unicode paths.",
            path.display()
        )
    })
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    /// Every test passed or was skipped.
    Success = 0,

    /// At least one test failed.
    Failure = 1,

    /// The run itself failed.
    Error = 2,
}

impl Termination for ExitStatus {
    fn report(self) -> ExitCode {
        ExitCode::from(self as u8)
    }
}

impl ExitStatus {
    pub const fn to_i32(self) -> i32 {
        self as i32
    }
}
