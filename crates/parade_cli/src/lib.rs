use std::ffi::OsString;
use std::num::NonZeroUsize;

use camino::Utf8PathBuf;
use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use parade_logging::{TerminalColor, VerbosityLevel};
use parade_metadata::{Options, WorkerOptions};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(clap::Args, Debug, Clone, Default)]
#[command(about = None, long_about = None)]
pub struct Verbosity {
    #[arg(
        long,
        short = 'v',
        help = "Use verbose output (or `-vv` and `-vvv` for more verbose output)",
        action = clap::ArgAction::Count,
        global = true,
        overrides_with = "quiet",
    )]
    verbose: u8,

    #[arg(
        long,
        short,
        help = "Use quiet output (or `-qq` for silent output)",
        action = clap::ArgAction::Count,
        global = true,
        overrides_with = "verbose",
    )]
    quiet: u8,
}

impl Verbosity {
    /// Returns the verbosity level based on the number of `-v` and `-q` flags.
    pub const fn level(&self) -> VerbosityLevel {
        // `--quiet` and `--verbose` override each other, so at most one is set.
        match self.quiet {
            0 => {}
            1 => return VerbosityLevel::Quiet,
            _ => return VerbosityLevel::Silent,
        }

        match self.verbose {
            0 => VerbosityLevel::Default,
            1 => VerbosityLevel::Verbose,
            2 => VerbosityLevel::ExtraVerbose,
            _ => VerbosityLevel::Trace,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    name = "parade",
    about = "Run test files in parallel and report their results."
)]
#[command(version)]
#[command(styles = STYLES)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunCommand,

    #[command(flatten)]
    pub verbosity: Verbosity,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Run the coordinator and write the merged event stream to stdout.
    #[command(hide = true)]
    Coordinate(CoordinateCommand),
}

/// Options shared by the presenter and the coordinator it starts.
#[derive(Debug, clap::Args, Clone, Default)]
pub struct RunOptions {
    /// The path to a `parade.toml` file to use for configuration.
    #[arg(long, env = "PARADE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<Utf8PathBuf>,

    /// Maximum number of test files running at once (default: unbounded).
    #[arg(short = 'n', long, value_name = "N")]
    pub max_workers: Option<NonZeroUsize>,
}

impl RunOptions {
    pub fn into_options(self) -> Options {
        Options {
            discovery: None,
            worker: Some(WorkerOptions {
                launcher: None,
                max_workers: self.max_workers,
            }),
        }
    }

    /// The command-line arguments that reproduce these options in the coordinator.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(config_file) = &self.config_file {
            args.push(OsString::from("--config-file"));
            args.push(OsString::from(config_file.as_str()));
        }
        if let Some(max_workers) = self.max_workers {
            args.push(OsString::from("--max-workers"));
            args.push(OsString::from(max_workers.to_string()));
        }
        args
    }
}

#[derive(Debug, clap::Args, Default)]
pub struct RunCommand {
    /// Glob pattern selecting the test files, e.g. `tests/**/*.test`.
    #[arg(required = true, value_name = "PATTERN")]
    pub pattern: Option<String>,

    /// Control when colored output is used.
    #[arg(long)]
    pub color: Option<TerminalColor>,

    /// Hide the live progress spinner.
    #[arg(long)]
    pub no_progress: bool,

    #[command(flatten)]
    pub options: RunOptions,
}

#[derive(Debug, clap::Args)]
pub struct CoordinateCommand {
    #[arg(value_name = "PATTERN")]
    pub pattern: String,

    #[command(flatten)]
    pub options: RunOptions,
}
