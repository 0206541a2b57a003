use std::fmt::Write;
use std::time::Duration;

use camino::Utf8Path;
use colored::Colorize;
use parade_protocol::{Failure, TestIdentity};

const FAIL_TAG: &str = " FAIL ";
const SKIP_TAG: &str = " SKIP ";

/// Indentation that lines continuation text up under the title, one past the tag.
const PAD: &str = "       ";

/// Test-level counters of a run as seen by the presenter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tally {
    pub(crate) found: usize,
    pub(crate) passing: usize,
    pub(crate) failing: usize,
    pub(crate) pending: usize,
    pub(crate) all_found: bool,
    pub(crate) complete: bool,
}

impl Tally {
    pub(crate) const fn remaining(&self) -> usize {
        self.found
            .saturating_sub(self.passing)
            .saturating_sub(self.failing)
            .saturating_sub(self.pending)
    }

    fn parts(&self) -> String {
        let mut parts = Vec::new();
        if self.passing > 0 {
            parts.push(format!("{} passed", self.passing).green().to_string());
        }
        if self.failing > 0 {
            parts.push(format!("{} failed", self.failing).red().to_string());
        }
        if self.pending > 0 {
            parts.push(format!("{} skipped", self.pending).cyan().to_string());
        }
        parts.join(", ")
    }
}

/// The spinner message while the run is in progress.
pub(crate) fn status_line(tally: &Tally) -> String {
    let progress = if tally.all_found {
        format!("{} tests remaining...", tally.remaining())
    } else {
        "loading more tests...".to_string()
    };

    let parts = tally.parts();
    if parts.is_empty() {
        progress.dimmed().to_string()
    } else {
        format!("{parts} {}", progress.dimmed())
    }
}

fn heading(tag: colored::ColoredString, test: &TestIdentity) -> String {
    if test.path.is_empty() {
        format!("{tag} {}", test.title)
    } else {
        format!("{tag} {} {}", test.title, test.breadcrumb())
    }
}

pub(crate) fn failure_block(file: &Utf8Path, failure: &Failure) -> String {
    let mut block = String::new();
    let error = &failure.error;

    writeln!(block, "{}", heading(FAIL_TAG.on_red().bold(), &failure.test)).ok();
    writeln!(block, "{PAD}{}", file.as_str().yellow()).ok();
    writeln!(block).ok();

    let message = error.message.replace('\n', &format!("\n{PAD}"));
    writeln!(block, "{PAD}{}: {message}", error.kind.red()).ok();
    for frame in &error.stack {
        writeln!(block, "{}", format!("{PAD}    at {frame}").dimmed()).ok();
    }

    block.push_str("\n\n");
    block
}

pub(crate) fn skip_block(file: &Utf8Path, test: &TestIdentity) -> String {
    let mut block = String::new();
    writeln!(block, "{}", heading(SKIP_TAG.on_cyan().bold(), test)).ok();
    writeln!(block, "{PAD}{}", file.as_str().yellow()).ok();
    block.push_str("\n\n");
    block
}

/// The final line: outcome glyph, tally and elapsed time.
pub(crate) fn summary_line(tally: &Tally, elapsed: Duration) -> String {
    let duration = format!("({})", format_duration(elapsed)).dimmed();

    if tally.failing > 0 {
        format!("{} {} {duration}", "\u{2716}".red(), tally.parts())
    } else if tally.passing > 0 {
        format!("{} {} {duration}", "\u{2714}".green(), tally.parts())
    } else if tally.pending > 0 {
        format!("{} {} {duration}", "\u{2139}".blue(), tally.parts())
    } else {
        format!("{} No tests found", "\u{2139}".blue())
    }
}

/// `1m 4.250s`, or just `0.512s` under a minute.
pub(crate) fn format_duration(elapsed: Duration) -> String {
    let minutes = elapsed.as_secs() / 60;
    let seconds = elapsed.as_secs_f64() % 60.0;

    if minutes > 0 {
        format!("{minutes}m {seconds:.3}s")
    } else {
        format!("{seconds:.3}s")
    }
}
