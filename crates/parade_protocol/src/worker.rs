use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Failure, ProtocolError, TestIdentity};

/// Field that marks a line on a worker's stdout as parade traffic.
pub const TAG: &str = "parade";

/// A lifecycle event emitted by the harness inside a worker process.
///
/// Within one worker the order is `Started`, any number of per-test messages,
/// then `Ended`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Envelope", into = "Envelope")]
pub enum WorkerMessage {
    /// The run is starting; `total` tests were enumerated before any executed.
    Started { total: usize },
    Ended,
    Passed,
    Failed(Failure),
    Pending(TestIdentity),
}

impl WorkerMessage {
    /// The wire name of this message.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "tests",
            Self::Ended => "end",
            Self::Passed => "pass",
            Self::Failed(_) => "fail",
            Self::Pending(_) => "pending",
        }
    }
}

/// `{"parade": true, "name": ..., "args": [...]}`
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    #[serde(default)]
    parade: bool,
    name: String,
    #[serde(default)]
    args: Vec<Value>,
}

impl From<WorkerMessage> for Envelope {
    fn from(message: WorkerMessage) -> Self {
        let name = message.name().to_string();
        let args = match message {
            WorkerMessage::Started { total } => vec![Value::from(total)],
            WorkerMessage::Ended | WorkerMessage::Passed => Vec::new(),
            WorkerMessage::Failed(failure) => {
                vec![serde_json::to_value(failure).unwrap_or_default()]
            }
            WorkerMessage::Pending(test) => vec![serde_json::to_value(test).unwrap_or_default()],
        };

        Self {
            parade: true,
            name,
            args,
        }
    }
}

impl TryFrom<Envelope> for WorkerMessage {
    type Error = ProtocolError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        if !envelope.parade {
            return Err(ProtocolError::Untagged);
        }

        let Envelope { name, args, .. } = envelope;
        match name.as_str() {
            "tests" => Ok(Self::Started {
                total: first_arg("tests", args)?,
            }),
            "end" => Ok(Self::Ended),
            "pass" => Ok(Self::Passed),
            "fail" => Ok(Self::Failed(first_arg("fail", args)?)),
            "pending" => Ok(Self::Pending(first_arg("pending", args)?)),
            _ => Err(ProtocolError::UnknownName(name)),
        }
    }
}

fn first_arg<T: DeserializeOwned>(name: &'static str, args: Vec<Value>) -> Result<T, ProtocolError> {
    let value = args
        .into_iter()
        .next()
        .ok_or(ProtocolError::MissingPayload(name))?;
    serde_json::from_value(value).map_err(|source| ProtocolError::InvalidPayload { name, source })
}
