//! The worker side of parade.
//!
//! A test file is an executable whose `main` builds a [`SuiteTree`] and hands
//! it to [`main`]. Invoked by the coordinator with `--reporter message`, the
//! file writes its lifecycle as [`parade_protocol::WorkerMessage`]s to stdout;
//! run by hand it prints a plain report.
//!
//! ```no_run
//! use parade_harness::SuiteTree;
//!
//! fn main() -> std::process::ExitCode {
//!     let mut tree = SuiteTree::new();
//!     let math = tree.suite(tree.root(), "math");
//!     tree.test(math, "adds", || assert_eq!(1 + 1, 2));
//!     tree.skip(math, "integrates");
//!     parade_harness::main(tree)
//! }
//! ```

mod capture;
mod engine;
mod reporter;
mod suite;

pub use capture::{FrameFilter, INTERNAL_FRAME_PATTERN, RaisedError, install_panic_capture};
pub use engine::{Listener, RunCounts, run};
pub use reporter::{ConsoleReporter, MessageReporter};
pub use suite::{SuiteId, SuiteTree, TestId, TestOutcome};

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum ReporterKind {
    /// Machine-readable messages for the parade coordinator.
    Message,

    /// A human-readable line per test.
    #[default]
    Console,
}

#[derive(Debug, Parser)]
#[command(about = "A parade test file")]
struct HarnessArgs {
    /// How results are reported.
    #[arg(long, value_enum, default_value_t)]
    reporter: ReporterKind,
}

/// Run `tree` with the reporter selected on the command line.
pub fn main(tree: SuiteTree) -> ExitCode {
    if run_with_args(&tree, std::env::args_os(), std::io::stdout()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Parse `args` and run `tree`, reporting to `out`. Returns whether the
/// process should exit successfully.
///
/// Under the message reporter failures are part of the report, so the worker
/// itself still succeeds.
fn run_with_args<I, T, W>(tree: &SuiteTree, args: I, out: W) -> bool
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    W: Write,
{
    let args = HarnessArgs::parse_from(args);

    install_panic_capture();

    match args.reporter {
        ReporterKind::Message => {
            let mut reporter = MessageReporter::new(out);
            run(tree, &mut reporter);
            true
        }
        ReporterKind::Console => {
            let mut reporter = ConsoleReporter::new(out);
            run(tree, &mut reporter).failed == 0
        }
    }
}
