use std::io::{self, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::VerbosityLevel;

const SPINNER_TICK: Duration = Duration::from_millis(80);

/// Hands out stdout streams gated by verbosity, plus the live status spinner.
#[derive(Debug, Default, Clone, Copy)]
pub struct Printer {
    verbosity: VerbosityLevel,
    no_progress: bool,
}

impl Printer {
    pub const fn new(verbosity: VerbosityLevel, no_progress: bool) -> Self {
        Self {
            verbosity,
            no_progress,
        }
    }

    pub const fn verbosity(self) -> VerbosityLevel {
        self.verbosity
    }

    /// Stream for per-test failure and skip details.
    pub fn stream_for_details(self) -> Stdout {
        Stdout::new(!self.verbosity.is_quiet())
    }

    /// Stream for the final summary line.
    pub fn stream_for_summary(self) -> Stdout {
        Stdout::new(!self.verbosity.is_silent())
    }

    /// A steadily ticking spinner on stderr, or a hidden one when progress is disabled.
    pub fn status_spinner(self) -> ProgressBar {
        if self.no_progress || self.verbosity.is_quiet() {
            return ProgressBar::hidden();
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(SPINNER_TICK);
        spinner
    }
}

#[derive(Debug)]
pub struct Stdout {
    enabled: bool,
}

impl Stdout {
    const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn lock(self) -> StdoutLock<'static> {
        StdoutLock {
            enabled: self.enabled,
            lock: io::stdout().lock(),
        }
    }
}

/// A locked stdout that silently discards writes when disabled.
#[derive(Debug)]
pub struct StdoutLock<'a> {
    enabled: bool,
    lock: io::StdoutLock<'a>,
}

impl StdoutLock<'_> {
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Write for StdoutLock<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.enabled {
            self.lock.write(buf)
        } else {
            Ok(buf.len())
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock.flush()
    }
}
