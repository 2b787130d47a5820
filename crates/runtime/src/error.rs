//! Error types surfaced by the strategic layer.
//!
//! Only construction-time failures ([`ConfigError`], [`SchedulerError`]) ever
//! reach the caller as `Err`. Everything that goes wrong during a tick is
//! folded into an [`ErrorKind`] and reported to error observers instead.
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Failure raised by an [`LlmClient`](crate::LlmClient) inside a worker.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    Api(String),
}

/// Rejection of a response by a parser. The blackboard is left untouched.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid scheduler config: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },

    #[error("failed to parse scheduler config")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start worker pool")]
    Pool(#[source] std::io::Error),
}

/// Category attached to every error observer event.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The client returned an error.
    QueryError,
    /// The query outlived the configured timeout.
    Timeout,
    /// The parser rejected the response.
    ParseError,
    /// Role, personality, context or parser name does not resolve.
    MissingDefinition,
    /// No client is registered.
    NoClient,
    /// The worker ended without delivering a result.
    WorkerLost,
}

impl ErrorKind {
    /// Whether the category counts against the agent's retry budget.
    pub fn is_transient(self) -> bool {
        !matches!(self, ErrorKind::MissingDefinition | ErrorKind::NoClient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_labels_are_snake_case() {
        assert_eq!(ErrorKind::MissingDefinition.to_string(), "missing_definition");
        assert_eq!(ErrorKind::WorkerLost.as_ref(), "worker_lost");
        assert_eq!("no_client".parse::<ErrorKind>().unwrap(), ErrorKind::NoClient);
        assert_eq!(
            serde_json::to_string(&ErrorKind::ParseError).unwrap(),
            r#""parse_error""#
        );
    }

    #[test]
    fn configuration_mistakes_are_not_transient() {
        assert!(ErrorKind::Timeout.is_transient());
        assert!(ErrorKind::QueryError.is_transient());
        assert!(!ErrorKind::NoClient.is_transient());
        assert!(!ErrorKind::MissingDefinition.is_transient());
    }
}
