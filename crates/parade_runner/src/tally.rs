use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use parade_protocol::{RunEvent, WorkerMessage};

#[derive(Debug, Default)]
struct WorkerState {
    reported_total: bool,
    ended: bool,
}

/// File-level counters of one coordinator run, and the rules for when the
/// merged stream may announce the grand total and its end.
///
/// Neither announcement happens before discovery has completed, and each
/// happens at most once. Counters only ever grow.
#[derive(Debug, Default)]
pub(crate) struct FileCounters {
    files_discovered: usize,
    files_completed: usize,
    files_totals_reported: usize,
    tests_reported: usize,
    discovery_complete: bool,
    tests_sent: bool,
    end_sent: bool,
    workers: HashMap<Utf8PathBuf, WorkerState>,
}

impl FileCounters {
    /// Record a newly matched file. Returns `false` if the file was already known.
    pub(crate) fn file_discovered(&mut self, file: &Utf8Path) -> bool {
        if self.workers.contains_key(file) {
            tracing::warn!(%file, "File matched twice, ignoring the duplicate");
            return false;
        }

        self.workers.insert(file.to_path_buf(), WorkerState::default());
        self.files_discovered += 1;
        true
    }

    pub(crate) fn discovery_completed(&mut self) -> Vec<RunEvent> {
        tracing::debug!(files = self.files_discovered, "Discovery complete");

        self.discovery_complete = true;
        let mut events = Vec::new();
        self.settle(&mut events);
        events
    }

    /// Apply one message from the worker running `file`, returning the events to send upward.
    pub(crate) fn worker_message(&mut self, file: &Utf8Path, message: WorkerMessage) -> Vec<RunEvent> {
        let mut events = Vec::new();

        let Some(state) = self.workers.get_mut(file) else {
            tracing::warn!(%file, name = message.name(), "Message from an unknown worker");
            return events;
        };

        if state.ended {
            tracing::warn!(%file, name = message.name(), "Message after `end`, ignoring");
            return events;
        }

        match message {
            WorkerMessage::Started { total } => {
                if state.reported_total {
                    tracing::warn!(%file, "Worker reported its total twice, ignoring");
                    return events;
                }
                state.reported_total = true;
                self.files_totals_reported += 1;
                self.tests_reported += total;
                tracing::debug!(%file, total, "Worker reported its tests");
            }
            WorkerMessage::Ended => {
                state.ended = true;
                self.files_completed += 1;
                tracing::debug!(
                    %file,
                    completed = self.files_completed,
                    discovered = self.files_discovered,
                    "Worker finished"
                );
            }
            WorkerMessage::Passed => events.push(RunEvent::Pass {
                file: file.to_path_buf(),
            }),
            WorkerMessage::Failed(failure) => events.push(RunEvent::Fail {
                file: file.to_path_buf(),
                failure,
            }),
            WorkerMessage::Pending(test) => events.push(RunEvent::Pending {
                file: file.to_path_buf(),
                test,
            }),
        }

        self.settle(&mut events);
        events
    }

    fn settle(&mut self, events: &mut Vec<RunEvent>) {
        if !self.discovery_complete {
            return;
        }

        if !self.tests_sent && self.files_totals_reported == self.files_discovered {
            self.tests_sent = true;
            events.push(RunEvent::Tests(self.tests_reported));
        }

        if !self.end_sent && self.files_completed == self.files_discovered {
            if !self.tests_sent {
                tracing::warn!(
                    reported = self.files_totals_reported,
                    discovered = self.files_discovered,
                    "Every worker ended but some never reported a test count"
                );
                self.tests_sent = true;
                events.push(RunEvent::Tests(self.tests_reported));
            }
            self.end_sent = true;
            events.push(RunEvent::End);
        }
    }

    pub(crate) fn has_ended(&self, file: &Utf8Path) -> bool {
        self.workers.get(file).is_some_and(|state| state.ended)
    }

    pub(crate) const fn is_finished(&self) -> bool {
        self.end_sent
    }

    pub(crate) const fn files_discovered(&self) -> usize {
        self.files_discovered
    }

    pub(crate) const fn files_completed(&self) -> usize {
        self.files_completed
    }
}
