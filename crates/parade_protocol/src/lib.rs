//! Wire types shared by the three process tiers.
//!
//! Workers write [`WorkerMessage`]s to their stdout, the coordinator reads them,
//! re-tags them with the originating file and writes [`RunEvent`]s to its own
//! stdout for the presenter. Both directions use newline-delimited JSON, see
//! [`MessageWriter`].

mod codec;
mod event;
mod worker;

pub use codec::{MessageWriter, decode_event_line, decode_worker_line};
pub use event::RunEvent;
pub use test::{CapturedError, Failure, StackFrame, TestIdentity};
pub use worker::{TAG, WorkerMessage};

/// Arguments appended to a test file's command line to select the message reporter.
pub const REPORTER_ARGS: [&str; 2] = ["--reporter", "message"];

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("failed to write message")]
    Io(#[from] std::io::Error),

    #[error("malformed message")]
    Json(#[from] serde_json::Error),

    #[error("message is missing the `{TAG}` tag")]
    Untagged,

    #[error("unknown message name `{0}`")]
    UnknownName(String),

    #[error("`{0}` message is missing its payload")]
    MissingPayload(&'static str),

    #[error("`{0}` event is missing its `file`")]
    MissingFile(&'static str),

    #[error("`{name}` message has an invalid payload")]
    InvalidPayload {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
