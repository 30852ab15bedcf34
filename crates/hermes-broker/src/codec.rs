//! Wire codec for relay commands.
//!
//! One text frame carries exactly one [`Command`]. Two encodings exist:
//!
//! - **Structured** (JSON):
//!   `{"kind":"Publish","topic":"news","payload":"hello"}`
//! - **Legacy** free text, split on the first space:
//!   `SUBSCRIBE news`, `UNSUBSCRIBE news`, `news hello`
//!
//! Decoding tries them in that order. A frame that starts with `{` but is not
//! JSON falls back to the legacy form, so `{room} hi` publishes to `{room}`.
//! A frame that is JSON must be a valid command.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{BrokerError, BrokerResult};

const SUBSCRIBE: &str = "SUBSCRIBE";
const UNSUBSCRIBE: &str = "UNSUBSCRIBE";

/// A decoded relay command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Command {
    /// Add the sender to a topic's subscriber set.
    Subscribe {
        /// Topic name.
        topic: String,
    },
    /// Remove the sender from a topic's subscriber set.
    Unsubscribe {
        /// Topic name.
        topic: String,
    },
    /// Relay `payload` to every other subscriber of `topic`.
    Publish {
        /// Topic name.
        topic: String,
        /// Opaque payload, possibly empty.
        payload: String,
    },
}

impl Command {
    /// Create a subscribe command.
    pub fn subscribe(topic: impl Into<String>) -> Self {
        Self::Subscribe {
            topic: topic.into(),
        }
    }

    /// Create an unsubscribe command.
    pub fn unsubscribe(topic: impl Into<String>) -> Self {
        Self::Unsubscribe {
            topic: topic.into(),
        }
    }

    /// Create a publish command.
    pub fn publish(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// The topic this command addresses.
    pub fn topic(&self) -> &str {
        match self {
            Self::Subscribe { topic } | Self::Unsubscribe { topic } | Self::Publish { topic, .. } => {
                topic
            }
        }
    }

    /// Lower-case command kind, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::Publish { .. } => "publish",
        }
    }
}

/// Encoding used for frames the relay sends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// JSON objects.
    #[default]
    Structured,
    /// Space-separated text understood by older clients.
    Legacy,
}

impl std::str::FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "structured" | "json" => Ok(Self::Structured),
            "legacy" | "text" => Ok(Self::Legacy),
            other => Err(format!("unknown wire format: {other}")),
        }
    }
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structured => write!(f, "structured"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

/// Encode a command in the structured form.
pub fn encode(command: &Command) -> String {
    encode_as(command, WireFormat::Structured)
}

/// Encode a command in the given wire format.
pub fn encode_as(command: &Command, format: WireFormat) -> String {
    match format {
        WireFormat::Structured => encode_structured(command),
        WireFormat::Legacy => encode_legacy(command),
    }
}

fn encode_structured(command: &Command) -> String {
    let value = match command {
        Command::Subscribe { topic } => json!({ "kind": "Subscribe", "topic": topic }),
        Command::Unsubscribe { topic } => json!({ "kind": "Unsubscribe", "topic": topic }),
        Command::Publish { topic, payload } => {
            json!({ "kind": "Publish", "topic": topic, "payload": payload })
        }
    };
    value.to_string()
}

fn encode_legacy(command: &Command) -> String {
    match command {
        Command::Subscribe { topic } => format!("{SUBSCRIBE} {topic}"),
        Command::Unsubscribe { topic } => format!("{UNSUBSCRIBE} {topic}"),
        Command::Publish { topic, payload } => format!("{topic} {payload}"),
    }
}

/// Decode one inbound text frame.
pub fn decode(frame: &str) -> BrokerResult<Command> {
    let trimmed = frame.trim_start();
    if trimmed.is_empty() {
        return Err(BrokerError::malformed("empty frame"));
    }

    let command = if trimmed.starts_with('{') {
        decode_structured(trimmed).or_else(|structured| match structured {
            StructuredError::NotJson(reason) => decode_legacy(frame).map_err(|_| {
                BrokerError::malformed(format!("invalid structured frame: {reason}"))
            }),
            StructuredError::InvalidCommand(err) => Err(err),
        })?
    } else {
        decode_legacy(frame)?
    };

    if command.topic().is_empty() {
        return Err(BrokerError::malformed("empty topic"));
    }
    Ok(command)
}

enum StructuredError {
    NotJson(serde_json::Error),
    InvalidCommand(BrokerError),
}

fn decode_structured(frame: &str) -> Result<Command, StructuredError> {
    let value: serde_json::Value = serde_json::from_str(frame).map_err(StructuredError::NotJson)?;
    Command::deserialize(value).map_err(|e| {
        StructuredError::InvalidCommand(BrokerError::malformed(format!("invalid command: {e}")))
    })
}

fn decode_legacy(frame: &str) -> BrokerResult<Command> {
    let (token, rest) = frame
        .split_once(' ')
        .ok_or_else(|| BrokerError::malformed("no command separator"))?;

    match token {
        SUBSCRIBE => Ok(Command::subscribe(rest.trim())),
        UNSUBSCRIBE => Ok(Command::unsubscribe(rest.trim())),
        topic => Ok(Command::publish(topic, rest)),
    }
}
