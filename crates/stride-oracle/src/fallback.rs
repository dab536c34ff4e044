use std::sync::Arc;

use crate::error::BackendFailure;
use crate::types::{Completion, OracleRequest};
use crate::{Oracle, OracleError, Result};

/// Tries each backend in order and returns the first successful completion.
///
/// This is transport-level fallback only: a backend that answers with text
/// the caller cannot use is still a success here.
pub struct FallbackOracle {
    backends: Vec<Arc<dyn Oracle>>,
}

impl FallbackOracle {
    pub fn new(backends: Vec<Arc<dyn Oracle>>) -> Self {
        Self { backends }
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

#[async_trait::async_trait]
impl Oracle for FallbackOracle {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn complete(&self, request: &OracleRequest) -> Result<Completion> {
        if self.backends.is_empty() {
            return Err(OracleError::NoBackends);
        }

        let mut failures = Vec::new();
        for backend in &self.backends {
            match backend.complete(request).await {
                Ok(completion) => {
                    if !failures.is_empty() {
                        tracing::info!(
                            model = backend.name(),
                            skipped = failures.len(),
                            "oracle fallback succeeded"
                        );
                    }
                    return Ok(completion);
                }
                Err(e) => {
                    tracing::warn!(model = backend.name(), error = %e, "oracle backend failed");
                    failures.push(BackendFailure {
                        backend: backend.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(OracleError::AllFailed(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedOracle;

    fn request() -> OracleRequest {
        OracleRequest::new("system", "user")
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let first = Arc::new(ScriptedOracle::named("a").reply("from a"));
        let second = Arc::new(ScriptedOracle::named("b").reply("from b"));
        let oracle = FallbackOracle::new(vec![
            first.clone() as Arc<dyn Oracle>,
            second.clone() as Arc<dyn Oracle>,
        ]);

        let completion = oracle.complete(&request()).await.unwrap();
        assert_eq!(completion.text, "from a");
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn falls_back_after_failure() {
        let first = Arc::new(ScriptedOracle::named("a").fail("connection refused"));
        let second = Arc::new(ScriptedOracle::named("b").reply("from b"));
        let oracle = FallbackOracle::new(vec![first.clone() as Arc<dyn Oracle>, second]);

        let completion = oracle.complete(&request()).await.unwrap();
        assert_eq!(completion.text, "from b");
        assert_eq!(completion.model, "b");
        assert_eq!(first.calls(), 1);
    }

    #[tokio::test]
    async fn all_failures_are_accumulated() {
        let oracle = FallbackOracle::new(vec![
            Arc::new(ScriptedOracle::named("a").fail("down")) as Arc<dyn Oracle>,
            Arc::new(ScriptedOracle::named("b").fail("rate limited")),
        ]);

        let err = oracle.complete(&request()).await.unwrap_err();
        let OracleError::AllFailed(failures) = err else {
            panic!("expected AllFailed");
        };
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].backend, "a");
        assert_eq!(failures[1].backend, "b");
        assert!(failures[1].reason.contains("rate limited"));
    }

    #[tokio::test]
    async fn empty_backend_list_is_an_error() {
        let oracle = FallbackOracle::new(vec![]);
        let err = oracle.complete(&request()).await.unwrap_err();
        assert!(matches!(err, OracleError::NoBackends));
    }
}
