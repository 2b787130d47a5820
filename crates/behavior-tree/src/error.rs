//! Registration-time errors.
//!
//! Tree graphs are validated once, when they are defined. Evaluation itself
//! has no error path beyond the three node statuses.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("root node '{0}' not found in nodes")]
    MissingRoot(String),

    #[error("node key '{key}' does not match node id '{id}'")]
    MislabeledNode { key: String, id: String },

    #[error("node '{parent}' references unknown child '{child}'")]
    MissingChild { parent: String, child: String },

    #[error("node '{0}' is reachable from itself")]
    Cycle(String),
}

pub type Result<T> = std::result::Result<T, TreeError>;
