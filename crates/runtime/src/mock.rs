//! Deterministic client for tests and offline runs.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::client::LlmClient;
use crate::error::QueryError;

type Responder = Box<dyn Fn(&str, &str) -> String + Send + Sync>;

enum Responses {
    Fixed(HashMap<(String, String), String>),
    Dynamic(Responder),
}

/// Canned responses with optional latency and failure injection.
///
/// Fixed responses are keyed by `(system_prompt, user_message)`; unmatched
/// prompts get `"{}"`. Failure injection is decided before the simulated
/// latency, so an injected failure returns immediately.
pub struct MockClient {
    responses: Responses,
    latency: Duration,
    error_rate: f64,
    error_message: String,
    rng: Mutex<StdRng>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::with_responses(HashMap::new())
    }

    pub fn with_responses(responses: HashMap<(String, String), String>) -> Self {
        Self::from_responses(Responses::Fixed(responses))
    }

    /// Computes every response from the prompt.
    pub fn with_responder<F>(f: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        Self::from_responses(Responses::Dynamic(Box::new(f)))
    }

    fn from_responses(responses: Responses) -> Self {
        Self {
            responses,
            latency: Duration::ZERO,
            error_rate: 0.0,
            error_message: "mock error".to_owned(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Adds a fixed response for one prompt pair.
    pub fn respond(
        mut self,
        system_prompt: impl Into<String>,
        user_message: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        if let Responses::Fixed(map) = &mut self.responses {
            map.insert((system_prompt.into(), user_message.into()), response.into());
        }
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Probability in `[0, 1]` that a call fails.
    pub fn error_rate(mut self, rate: f64) -> Self {
        self.error_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Makes failure injection reproducible.
    pub fn seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    fn should_fail(&self) -> bool {
        if self.error_rate <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.r#gen::<f64>() < self.error_rate
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmClient for MockClient {
    fn query(&self, system_prompt: &str, user_message: &str) -> Result<String, QueryError> {
        if self.should_fail() {
            return Err(QueryError::Api(self.error_message.clone()));
        }

        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        Ok(match &self.responses {
            Responses::Dynamic(f) => f(system_prompt, user_message),
            Responses::Fixed(map) => map
                .get(&(system_prompt.to_owned(), user_message.to_owned()))
                .cloned()
                .unwrap_or_else(|| "{}".to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_responses_fall_back_to_empty_object() {
        let client = MockClient::new().respond("sys", "user", r#"{"goal":"flee"}"#);

        assert_eq!(client.query("sys", "user").unwrap(), r#"{"goal":"flee"}"#);
        assert_eq!(client.query("sys", "other").unwrap(), "{}");
    }

    #[test]
    fn responder_sees_both_prompts() {
        let client = MockClient::with_responder(|system, user| format!("{system}|{user}"));
        assert_eq!(client.query("a", "b").unwrap(), "a|b");
    }

    #[test]
    fn error_rate_extremes() {
        let always = MockClient::new().error_rate(1.0).error_message("boom");
        let err = always.query("s", "u").unwrap_err();
        assert_eq!(err.to_string(), "boom");

        let never = MockClient::new().error_rate(0.0);
        assert!((0..50).all(|_| never.query("s", "u").is_ok()));
    }

    #[test]
    fn seeded_failures_are_reproducible() {
        let outcomes = |seed| {
            let client = MockClient::new().error_rate(0.5).seed(seed);
            (0..32)
                .map(|_| client.query("s", "u").is_ok())
                .collect::<Vec<_>>()
        };
        assert_eq!(outcomes(7), outcomes(7));
    }
}
