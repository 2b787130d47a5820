//! Status returned by behavior nodes.

use serde::{Deserialize, Serialize};

/// The result of evaluating a behavior node.
///
/// # Multi-tick Semantics
///
/// Conditions always resolve within a tick. Actions may report `Running` to
/// signal work that spans several ticks; the tree then resumes at that action
/// on the next tick instead of re-deriving the siblings before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The behavior completed successfully.
    ///
    /// For conditions: The condition was met.
    /// For actions: The action finished without errors.
    Success,

    /// The behavior failed.
    ///
    /// For conditions: The condition was not met.
    /// For actions: The action could not be carried out.
    Failure,

    /// The behavior needs more ticks to finish.
    Running,
}

impl Status {
    /// Returns `true` if this status is `Success`.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    /// Returns `true` if this status is `Failure`.
    #[inline]
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failure)
    }

    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, Status::Running)
    }

    /// Returns `true` for `Success` and `Failure`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        !self.is_running()
    }

    /// Swaps Success and Failure. `Running` passes through unchanged.
    #[inline]
    pub fn invert(self) -> Self {
        match self {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
            Status::Running => Status::Running,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Failure => "failure",
            Status::Running => "running",
        }
    }
}

impl From<bool> for Status {
    fn from(value: bool) -> Self {
        if value {
            Status::Success
        } else {
            Status::Failure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invert_keeps_running() {
        assert_eq!(Status::Success.invert(), Status::Failure);
        assert_eq!(Status::Failure.invert(), Status::Success);
        assert_eq!(Status::Running.invert(), Status::Running);
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&Status::Running).unwrap();
        assert_eq!(json, "\"running\"");
    }
}
