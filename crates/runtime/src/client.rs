//! External reasoning client boundary.

use crate::error::QueryError;

/// A blocking request/response client, called only from worker threads.
///
/// Implementations receive two strings and return one. They never see entity
/// state, blackboards or registries.
pub trait LlmClient: Send + Sync {
    fn query(&self, system_prompt: &str, user_message: &str) -> Result<String, QueryError>;
}

impl<F> LlmClient for F
where
    F: Fn(&str, &str) -> Result<String, QueryError> + Send + Sync,
{
    fn query(&self, system_prompt: &str, user_message: &str) -> Result<String, QueryError> {
        self(system_prompt, user_message)
    }
}
