use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Instant;

use anyhow::Context;
use indicatif::ProgressBar;
use parade_cli::RunOptions;
use parade_logging::Printer;
use parade_protocol::{RunEvent, decode_event_line};

use crate::ExitStatus;
use crate::render::{self, Tally};

/// Renders the coordinator's event stream: a live status line, a block per
/// failing or skipped test, and the final summary.
pub(crate) struct Presenter {
    printer: Printer,
    spinner: ProgressBar,
    tally: Tally,
    started: Instant,
}

impl Presenter {
    pub(crate) fn new(printer: Printer) -> Self {
        let spinner = printer.status_spinner();
        let tally = Tally::default();
        spinner.set_message(render::status_line(&tally));

        Self {
            printer,
            spinner,
            tally,
            started: Instant::now(),
        }
    }

    /// Apply one event. Returns the exit status once the run has ended.
    pub(crate) fn handle(&mut self, event: RunEvent) -> Option<ExitStatus> {
        match event {
            RunEvent::Tests(found) => {
                self.tally.found = found;
                self.tally.all_found = true;
            }
            RunEvent::Pass { .. } => self.tally.passing += 1,
            RunEvent::Fail { file, failure } => {
                self.tally.failing += 1;
                self.print_details(&render::failure_block(&file, &failure));
            }
            RunEvent::Pending { file, test } => {
                self.tally.pending += 1;
                self.print_details(&render::skip_block(&file, &test));
            }
            RunEvent::End => {
                self.tally.complete = true;
                return Some(self.finish());
            }
        }

        self.spinner.set_message(render::status_line(&self.tally));
        None
    }

    #[cfg(test)]
    pub(crate) const fn tally(&self) -> &Tally {
        &self.tally
    }

    fn print_details(&self, block: &str) {
        let printer = self.printer;
        let result = self.spinner.suspend(|| {
            let mut stdout = printer.stream_for_details().lock();
            stdout.write_all(block.as_bytes())?;
            stdout.flush()
        });

        if let Err(error) = result {
            tracing::warn!("Failed to print test details: {error}");
        }
    }

    fn finish(&self) -> ExitStatus {
        self.spinner.finish_and_clear();

        let summary = render::summary_line(&self.tally, self.started.elapsed());
        let mut stdout = self.printer.stream_for_summary().lock();
        if let Err(error) = writeln!(stdout, "{summary}") {
            tracing::warn!("Failed to print the summary: {error}");
        }

        if self.tally.failing > 0 {
            ExitStatus::Failure
        } else {
            ExitStatus::Success
        }
    }

    fn abandon(&self) {
        self.spinner.finish_and_clear();
    }
}

/// Start the coordinator for `pattern` as a child of this executable and
/// present its events until it reports `end`.
pub(crate) fn present(
    printer: Printer,
    pattern: &str,
    options: &RunOptions,
) -> anyhow::Result<ExitStatus> {
    let executable = std::env::current_exe().context("Failed to locate the parade executable")?;

    let mut command = Command::new(executable);
    command.arg("coordinate");
    if let Some(flag) = printer.verbosity().flag() {
        command.arg(flag);
    }
    command
        .args(options.to_args())
        .arg("--")
        .arg(pattern)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    tracing::debug!(?command, "Starting coordinator");
    let mut child = command.spawn().context("Failed to start the coordinator")?;
    let stdout = child
        .stdout
        .take()
        .context("Coordinator stdout was not captured")?;

    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("coordinator".to_string())
        .spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(error) => {
                        tracing::warn!("Failed to read coordinator output: {error}");
                        break;
                    }
                };

                if line.trim().is_empty() {
                    continue;
                }

                match decode_event_line(&line) {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(error) => tracing::warn!("Ignoring malformed event `{line}`: {error}"),
                }
            }
        })
        .context("Failed to start the coordinator reader")?;

    let mut presenter = Presenter::new(printer);
    for event in &rx {
        tracing::trace!(event = event.name(), "Received event");
        if let Some(status) = presenter.handle(event) {
            if let Err(error) = child.wait() {
                tracing::debug!("Failed to wait for the coordinator: {error}");
            }
            return Ok(status);
        }
    }

    presenter.abandon();
    let status = child.wait().context("Failed to wait for the coordinator")?;
    anyhow::bail!("The coordinator stopped before the run finished ({status})")
}
