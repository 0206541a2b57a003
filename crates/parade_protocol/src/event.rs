use camino::Utf8PathBuf;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Failure, ProtocolError, TestIdentity};

/// A single entry of the coordinator's merged event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent", into = "RawEvent")]
pub enum RunEvent {
    /// Grand total of tests across every discovered file. Sent exactly once.
    Tests(usize),

    /// Every worker has finished. Sent exactly once, always last.
    End,

    Pass {
        file: Utf8PathBuf,
    },

    Fail {
        file: Utf8PathBuf,
        failure: Failure,
    },

    Pending {
        file: Utf8PathBuf,
        test: TestIdentity,
    },
}

impl RunEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tests(_) => "tests",
            Self::End => "end",
            Self::Pass { .. } => "pass",
            Self::Fail { .. } => "fail",
            Self::Pending { .. } => "pending",
        }
    }
}

/// `{"event": ..., "data": ..., "file": ...}`
#[derive(Debug, Serialize, Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<Utf8PathBuf>,
}

impl From<RunEvent> for RawEvent {
    fn from(event: RunEvent) -> Self {
        let name = event.name().to_string();
        let (data, file) = match event {
            RunEvent::Tests(total) => (Some(Value::from(total)), None),
            RunEvent::End => (None, None),
            RunEvent::Pass { file } => (None, Some(file)),
            RunEvent::Fail { file, failure } => (serde_json::to_value(failure).ok(), Some(file)),
            RunEvent::Pending { file, test } => (serde_json::to_value(test).ok(), Some(file)),
        };

        Self {
            event: name,
            data,
            file,
        }
    }
}

impl TryFrom<RawEvent> for RunEvent {
    type Error = ProtocolError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let RawEvent { event, data, file } = raw;
        let file = |name| file.ok_or(ProtocolError::MissingFile(name));

        match event.as_str() {
            "tests" => Ok(Self::Tests(payload("tests", data)?)),
            "end" => Ok(Self::End),
            "pass" => Ok(Self::Pass { file: file("pass")? }),
            "fail" => Ok(Self::Fail {
                file: file("fail")?,
                failure: payload("fail", data)?,
            }),
            "pending" => Ok(Self::Pending {
                file: file("pending")?,
                test: payload("pending", data)?,
            }),
            _ => Err(ProtocolError::UnknownName(event)),
        }
    }
}

fn payload<T: DeserializeOwned>(name: &'static str, data: Option<Value>) -> Result<T, ProtocolError> {
    let value = data.ok_or(ProtocolError::MissingPayload(name))?;
    serde_json::from_value(value).map_err(|source| ProtocolError::InvalidPayload { name, source })
}
