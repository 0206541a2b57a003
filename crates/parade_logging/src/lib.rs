mod printer;

pub use printer::{Printer, Stdout, StdoutLock};

use std::fmt::Write as _;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

/// Environment variable that overrides the verbosity-derived log filter.
pub const LOG_ENV_VAR: &str = "PARADE_LOG";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerbosityLevel {
    /// Nothing is printed, not even the summary.
    Silent,

    /// Only the summary line is printed.
    Quiet,

    /// Live progress, failure and skip details, and the summary.
    #[default]
    Default,

    /// Also log debug messages from parade itself.
    Verbose,

    /// Also log debug messages from every crate.
    ExtraVerbose,

    /// Log everything, with timestamps.
    Trace,
}

impl VerbosityLevel {
    pub const fn level_filter(self) -> LevelFilter {
        match self {
            Self::Silent | Self::Quiet => LevelFilter::ERROR,
            Self::Default => LevelFilter::WARN,
            Self::Verbose | Self::ExtraVerbose => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }

    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet | Self::Silent)
    }

    pub const fn is_silent(self) -> bool {
        matches!(self, Self::Silent)
    }

    /// The command-line flag that reproduces this level in a child process.
    pub const fn flag(self) -> Option<&'static str> {
        match self {
            Self::Silent => Some("-qq"),
            Self::Quiet => Some("-q"),
            Self::Default => None,
            Self::Verbose => Some("-v"),
            Self::ExtraVerbose => Some("-vv"),
            Self::Trace => Some("-vvv"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TerminalColor {
    /// Display colors if the output goes to an interactive terminal.
    #[default]
    Auto,

    /// Always display colors.
    Always,

    /// Never display colors.
    Never,
}

pub fn set_colored_override(color: Option<TerminalColor>) {
    match color.unwrap_or_default() {
        TerminalColor::Auto => colored::control::unset_override(),
        TerminalColor::Always => colored::control::set_override(true),
        TerminalColor::Never => colored::control::set_override(false),
    }
}

struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Install the global `tracing` subscriber, writing to stderr.
///
/// `PARADE_LOG` takes precedence over the verbosity flags. Installing twice is a no-op.
pub fn setup_tracing(level: VerbosityLevel) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| {
        let directive = match level {
            VerbosityLevel::Verbose => format!("{},parade={}", LevelFilter::WARN, LevelFilter::DEBUG),
            other => other.level_filter().to_string(),
        };
        EnvFilter::new(directive)
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(level >= VerbosityLevel::ExtraVerbose);

    let result = if level == VerbosityLevel::Trace {
        builder.with_timer(LocalTime).try_init()
    } else {
        builder.without_time().try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
