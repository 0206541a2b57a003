use std::io::Write;

use colored::Colorize;
use parade_protocol::{Failure, MessageWriter, WorkerMessage};

use crate::capture::{FrameFilter, RaisedError};
use crate::engine::{Listener, RunCounts};
use crate::suite::{SuiteTree, TestId};

/// Translates engine events into [`WorkerMessage`]s on the worker's stdout.
///
/// Suite boundaries and test-end events are not forwarded. Writing never
/// panics: a message that cannot be written is logged and dropped.
pub struct MessageReporter<W: Write> {
    writer: MessageWriter<W>,
    frames: FrameFilter,
}

impl<W: Write> MessageReporter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_frame_filter(inner, FrameFilter::default())
    }

    pub const fn with_frame_filter(inner: W, frames: FrameFilter) -> Self {
        Self {
            writer: MessageWriter::new(inner),
            frames,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn send(&mut self, message: &WorkerMessage) {
        if let Err(error) = self.writer.send(message) {
            tracing::warn!(name = message.name(), "Failed to send message: {error}");
        }
    }
}

impl<W: Write> Listener for MessageReporter<W> {
    fn start(&mut self, total: usize) {
        self.send(&WorkerMessage::Started { total });
    }

    fn pass(&mut self, _tree: &SuiteTree, _test: TestId) {
        self.send(&WorkerMessage::Passed);
    }

    fn fail(&mut self, tree: &SuiteTree, test: TestId, error: RaisedError) {
        let failure = Failure {
            test: tree.identity(test),
            error: error.into_captured(&self.frames),
        };
        self.send(&WorkerMessage::Failed(failure));
    }

    fn pending(&mut self, tree: &SuiteTree, test: TestId) {
        self.send(&WorkerMessage::Pending(tree.identity(test)));
    }

    fn end(&mut self) {
        self.send(&WorkerMessage::Ended);
    }
}

/// Plain per-test output for running a test file by hand.
pub struct ConsoleReporter<W: Write> {
    out: W,
    frames: FrameFilter,
    counts: RunCounts,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            frames: FrameFilter::default(),
            counts: RunCounts::default(),
        }
    }

    pub const fn counts(&self) -> RunCounts {
        self.counts
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, tree: &SuiteTree, test: TestId, status: &str) {
        let identity = tree.identity(test);
        let mut name = identity.path;
        name.push(identity.title);
        writeln!(self.out, "test {} ... {status}", name.join(" \u{2192} ")).ok();
    }
}

impl<W: Write> Listener for ConsoleReporter<W> {
    fn start(&mut self, total: usize) {
        writeln!(self.out, "running {total} tests").ok();
    }

    fn pass(&mut self, tree: &SuiteTree, test: TestId) {
        self.counts.passed += 1;
        self.line(tree, test, &"ok".green().to_string());
    }

    fn fail(&mut self, tree: &SuiteTree, test: TestId, error: RaisedError) {
        self.counts.failed += 1;
        self.line(tree, test, &"FAILED".red().to_string());

        let error = error.into_captured(&self.frames);
        writeln!(self.out, "    {}: {}", error.kind, error.message).ok();
        for frame in &error.stack {
            writeln!(self.out, "        at {frame}").ok();
        }
    }

    fn pending(&mut self, tree: &SuiteTree, test: TestId) {
        self.counts.pending += 1;
        self.line(tree, test, &"skipped".cyan().to_string());
    }

    fn end(&mut self) {
        let RunCounts {
            passed,
            failed,
            pending,
        } = self.counts;
        let result = if failed == 0 {
            "ok".green()
        } else {
            "FAILED".red()
        };
        writeln!(
            self.out,
            "\ntest result: {result}. {passed} passed; {failed} failed; {pending} skipped"
        )
        .ok();
    }
}
