use std::time::Duration;
use thiserror::Error;

/// Every failure the telemetry core can observe.
///
/// None of these escape a poll cycle or a command dispatch: they are caught
/// there and folded into counters, `valid` flags and `last_error` strings.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TelemetryError {
    #[error("TIMEOUT after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("ERROR: {0}")]
    Transport(String),

    #[error("channel {channel} unavailable: {reply}")]
    Unavailable { channel: String, reply: String },

    #[error("channel {channel} returned non-numeric reply {reply:?}")]
    Parse { channel: String, reply: String },

    #[error("command {command} rejected: server returned {reply:?}")]
    CommandRejected { command: String, reply: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TelemetryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TelemetryError::Timeout(_))
    }

    /// Short stable label, used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryError::Timeout(_) => "timeout",
            TelemetryError::Transport(_) => "transport",
            TelemetryError::Unavailable { .. } => "unavailable",
            TelemetryError::Parse { .. } => "parse",
            TelemetryError::CommandRejected { .. } => "rejected",
            TelemetryError::InvalidRequest(_) => "invalid_request",
        }
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(e: std::io::Error) -> Self {
        TelemetryError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
