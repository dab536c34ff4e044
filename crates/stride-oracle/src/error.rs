use thiserror::Error;

/// One backend's failure, kept for diagnostics when every backend fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFailure {
    pub backend: String,
    pub reason: String,
}

impl std::fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.backend, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("oracle returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("oracle returned an empty completion")]
    EmptyCompletion,

    #[error("failed to decode oracle response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no oracle backends configured")]
    NoBackends,

    #[error("all oracle backends failed: {}", format_failures(.0))]
    AllFailed(Vec<BackendFailure>),

    #[error("scripted oracle exhausted")]
    Exhausted,
}

fn format_failures(failures: &[BackendFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_failed_lists_every_backend() {
        let err = OracleError::AllFailed(vec![
            BackendFailure {
                backend: "gpt-4o-mini".into(),
                reason: "status 503".into(),
            },
            BackendFailure {
                backend: "gpt-4o".into(),
                reason: "timeout".into(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("gpt-4o-mini: status 503"));
        assert!(msg.contains("gpt-4o: timeout"));
    }
}
