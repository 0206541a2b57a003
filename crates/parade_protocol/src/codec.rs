use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use crate::{ProtocolError, RunEvent, TAG, WorkerMessage};

/// Writes one JSON document per line and flushes after each.
///
/// The peer reads the stream line by line as it arrives, so every message is
/// flushed immediately rather than buffered. Each document is preceded by a
/// newline: worker stdout is shared with the code under test, and output
/// without a trailing newline would otherwise run into the next message.
#[derive(Debug)]
pub struct MessageWriter<W: Write> {
    inner: W,
}

impl<W: Write> MessageWriter<W> {
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn send<T: Serialize>(&mut self, message: &T) -> Result<(), ProtocolError> {
        self.inner.write_all(b"\n")?;
        serde_json::to_writer(&mut self.inner, message)?;
        self.inner.write_all(b"\n")?;
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Decode one line of a worker's stdout.
///
/// Returns `None` for anything that is not tagged parade traffic, such as
/// output printed by the code under test. A tagged object that does not start
/// the line is still found, so text printed without a trailing newline cannot
/// hide the message that follows it.
pub fn decode_worker_line(line: &str) -> Option<Result<WorkerMessage, ProtocolError>> {
    let line = line.trim();
    let value = line
        .match_indices('{')
        .find_map(|(start, _)| tagged_value(&line[start..]))?;
    Some(serde_json::from_value(value).map_err(ProtocolError::from))
}

fn tagged_value(text: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(text).ok()?;
    (value.get(TAG) == Some(&Value::Bool(true))).then_some(value)
}

/// Decode one line of the coordinator's stdout.
pub fn decode_event_line(line: &str) -> Result<RunEvent, ProtocolError> {
    Ok(serde_json::from_str(line.trim())?)
}
