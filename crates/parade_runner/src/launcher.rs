use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use camino::{Utf8Path, Utf8PathBuf};
use crossbeam_channel::Sender;
use parade_protocol::{REPORTER_ARGS, decode_worker_line};

use crate::orchestration::Inbound;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("failed to start a worker for `{file}`")]
    Spawn {
        file: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Starts the worker for one test file.
///
/// Every message the worker produces, followed by exactly one
/// [`Inbound::WorkerExited`], must be sent on `events`.
pub(crate) trait WorkerLauncher {
    fn launch(&mut self, file: &Utf8Path, events: &Sender<Inbound>) -> Result<(), LaunchError>;

    /// Stop every worker that is still running.
    fn abort(&mut self);
}

/// Child processes whose output is still being read, keyed by test file.
type RunningWorkers = Arc<Mutex<HashMap<Utf8PathBuf, Child>>>;

/// Runs each test file as a child process with `--reporter message`.
///
/// Without a launcher the file itself is executed; otherwise the launcher
/// program runs with its arguments followed by the file.
#[derive(Debug, Default)]
pub struct ProcessLauncher {
    launcher: Vec<String>,
    running: RunningWorkers,
}

impl ProcessLauncher {
    pub fn new(launcher: Vec<String>) -> Self {
        Self {
            launcher,
            running: RunningWorkers::default(),
        }
    }

    fn command(&self, file: &Utf8Path) -> std::io::Result<Command> {
        let mut command = match self.launcher.split_first() {
            Some((program, args)) => {
                let mut command = Command::new(program);
                command.args(args).arg(file);
                command
            }
            // A bare relative name would otherwise be looked up on `PATH`.
            None => Command::new(std::path::absolute(file)?),
        };

        command
            .args(REPORTER_ARGS)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        Ok(command)
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(&mut self, file: &Utf8Path, events: &Sender<Inbound>) -> Result<(), LaunchError> {
        let spawn_error = |source| LaunchError::Spawn {
            file: file.to_path_buf(),
            source,
        };

        let mut child = self
            .command(file)
            .and_then(|mut command| command.spawn())
            .map_err(spawn_error)?;
        tracing::debug!(%file, pid = child.id(), "Started worker");

        let Some(stdout) = child.stdout.take() else {
            return Err(spawn_error(std::io::Error::other("worker stdout was not captured")));
        };

        let file = file.to_path_buf();
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file.clone(), child);

        let events = events.clone();
        let running = Arc::clone(&self.running);
        thread::Builder::new()
            .name(format!("worker {file}"))
            .spawn(move || {
                forward_output(&file, stdout, &events);

                // Absent when `abort` already stopped and reaped the worker.
                let child = running
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&file);
                let status: Option<ExitStatus> = child.and_then(|mut child| child.wait().ok());
                events.send(Inbound::WorkerExited { file, status }).ok();
            })
            .map_err(spawn_error)?;

        Ok(())
    }

    fn abort(&mut self) {
        let children: Vec<_> = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        for (file, mut child) in children {
            tracing::debug!(%file, pid = child.id(), "Stopping worker");
            if let Err(error) = child.kill() {
                tracing::warn!(%file, "Failed to stop worker: {error}");
            }
            child.wait().ok();
        }
    }
}

/// Forward every tagged message on a worker's stdout until it closes.
///
/// Lines are split on raw bytes, so output that is not valid UTF-8 only
/// affects the line it appears on.
fn forward_output(file: &Utf8Path, stdout: impl Read, events: &Sender<Inbound>) {
    let mut reader = BufReader::new(stdout);
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => return,
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(%file, "Failed to read worker output: {error}");
                return;
            }
        }

        let line = String::from_utf8_lossy(&buffer);
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        match decode_worker_line(line) {
            Some(Ok(message)) => {
                let inbound = Inbound::Worker {
                    file: file.to_path_buf(),
                    message,
                };
                if events.send(inbound).is_err() {
                    return;
                }
            }
            Some(Err(error)) => {
                tracing::warn!(%file, "Dropping malformed message: {error}");
            }
            None => tracing::debug!(%file, "worker: {line}"),
        }
    }
}
