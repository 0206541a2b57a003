use std::collections::VecDeque;
use std::io::Write;
use std::num::NonZeroUsize;
use std::process::ExitStatus;
use std::thread;

use anyhow::Context;
use camino::Utf8PathBuf;
use crossbeam_channel::{Receiver, Sender};
use parade_metadata::ProjectSettings;
use parade_protocol::{MessageWriter, ProtocolError, RunEvent, WorkerMessage};

use crate::discovery::{DiscoveryError, DiscoverySource, GlobDiscovery};
use crate::launcher::{ProcessLauncher, WorkerLauncher};
use crate::tally::FileCounters;

/// Everything the coordinator loop reacts to, from whichever thread produced it.
#[derive(Debug)]
pub(crate) enum Inbound {
    Discovered(Utf8PathBuf),
    DiscoveryComplete,
    DiscoveryFailed(DiscoveryError),
    Worker {
        file: Utf8PathBuf,
        message: WorkerMessage,
    },
    WorkerExited {
        file: Utf8PathBuf,
        status: Option<ExitStatus>,
    },
}

/// Where the merged event stream goes.
pub trait EventSink {
    fn emit(&mut self, event: &RunEvent) -> Result<(), ProtocolError>;
}

impl<W: Write> EventSink for MessageWriter<W> {
    fn emit(&mut self, event: &RunEvent) -> Result<(), ProtocolError> {
        self.send(event)
    }
}

/// Discover files matching `pattern`, run one worker per file and merge
/// their messages into `sink`.
///
/// Returns once `end` has been emitted.
pub fn run_coordinator(
    pattern: &str,
    settings: &ProjectSettings,
    sink: &mut dyn EventSink,
) -> anyhow::Result<()> {
    let discovery = GlobDiscovery::new(pattern, settings.discovery().clone())?;
    tracing::debug!(pattern, root = %discovery.root(), "Starting discovery");

    let worker = settings.worker();
    let launcher = ProcessLauncher::new(worker.launcher.clone());
    coordinate(discovery, launcher, worker.max_workers, sink)
}

pub(crate) fn coordinate<D, L>(
    discovery: D,
    mut launcher: L,
    max_workers: Option<NonZeroUsize>,
    sink: &mut dyn EventSink,
) -> anyhow::Result<()>
where
    D: DiscoverySource,
    L: WorkerLauncher,
{
    let (tx, rx) = crossbeam_channel::unbounded();

    let discovery_tx = tx.clone();
    thread::Builder::new()
        .name("discovery".to_string())
        .spawn(move || discovery.discover(&discovery_tx))
        .context("Failed to start discovery")?;

    let result = merge(&rx, &tx, &mut launcher, max_workers, sink);
    if result.is_err() {
        // Workers already started must not outlive a fatal error.
        launcher.abort();
    }
    result
}

fn merge<L: WorkerLauncher>(
    rx: &Receiver<Inbound>,
    tx: &Sender<Inbound>,
    launcher: &mut L,
    max_workers: Option<NonZeroUsize>,
    sink: &mut dyn EventSink,
) -> anyhow::Result<()> {
    let mut counters = FileCounters::default();
    let mut pool = WorkerPool::new(max_workers);

    // `tx` stays alive for launching workers, so the channel never disconnects
    // while the loop runs.
    for inbound in rx {
        let events = match inbound {
            Inbound::Discovered(file) => {
                if counters.file_discovered(&file) {
                    pool.push(file);
                    pool.start_ready(launcher, tx)?;
                }
                Vec::new()
            }
            Inbound::DiscoveryComplete => counters.discovery_completed(),
            Inbound::DiscoveryFailed(error) => {
                return Err(error).context("Test file discovery failed");
            }
            Inbound::Worker { file, message } => counters.worker_message(&file, message),
            Inbound::WorkerExited { file, status } => {
                if !counters.has_ended(&file) {
                    tracing::warn!(
                        %file,
                        status = ?status,
                        "Worker exited without reporting `end`"
                    );
                }
                pool.release();
                pool.start_ready(launcher, tx)?;
                Vec::new()
            }
        };

        for event in &events {
            sink.emit(event)
                .with_context(|| format!("Failed to send `{}` event", event.name()))?;
        }

        if counters.is_finished() {
            tracing::debug!(files = counters.files_completed(), "Run finished");
            return Ok(());
        }
    }

    anyhow::bail!("Coordinator channel closed before the run finished")
}

/// Files waiting for a worker, started as slots become free.
///
/// Without a limit every file starts as soon as it is discovered. A slot is
/// freed when the worker process exits.
#[derive(Debug)]
struct WorkerPool {
    limit: Option<NonZeroUsize>,
    running: usize,
    queued: VecDeque<Utf8PathBuf>,
}

impl WorkerPool {
    const fn new(limit: Option<NonZeroUsize>) -> Self {
        Self {
            limit,
            running: 0,
            queued: VecDeque::new(),
        }
    }

    fn push(&mut self, file: Utf8PathBuf) {
        self.queued.push_back(file);
    }

    fn has_free_slot(&self) -> bool {
        self.limit.is_none_or(|limit| self.running < limit.get())
    }

    fn next_ready(&mut self) -> Option<Utf8PathBuf> {
        if !self.has_free_slot() {
            return None;
        }
        let file = self.queued.pop_front()?;
        self.running += 1;
        Some(file)
    }

    fn release(&mut self) {
        self.running = self.running.saturating_sub(1);
    }

    fn start_ready<L: WorkerLauncher>(
        &mut self,
        launcher: &mut L,
        events: &Sender<Inbound>,
    ) -> anyhow::Result<()> {
        while let Some(file) = self.next_ready() {
            launcher.launch(&file, events)?;
        }
        Ok(())
    }
}
