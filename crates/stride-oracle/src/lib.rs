//! `stride-oracle`: the text-completion backend the assistant asks to turn
//! a free-text instruction into a JSON instruction batch.
//!
//! # Architecture
//!
//! ```text
//! OracleRequest (system prompt + user message)
//!     │
//!     ▼
//! FallbackOracle  ← ordered list of backends, first success wins
//!     │
//!     ▼
//! HttpOracle      ← OpenAI-compatible `chat/completions` over reqwest
//!     │
//!     ▼
//! Completion      ← raw text, not guaranteed to be well-formed JSON
//! ```
//!
//! The oracle is opaque to the rest of the workspace: callers get raw text
//! and are responsible for extracting structure from it.

pub mod error;
pub mod fallback;
pub mod http;
pub mod mock;
pub mod types;

pub use error::{BackendFailure, OracleError};
pub use fallback::FallbackOracle;
pub use http::{HttpOracle, HttpOracleOptions};
pub use mock::ScriptedOracle;
pub use types::{Completion, OracleRequest};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, OracleError>;

/// A text-completion service.
///
/// Implementations must be cheap to share behind an `Arc` and safe to call
/// from concurrent request handlers.
#[async_trait::async_trait]
pub trait Oracle: Send + Sync {
    /// Human-readable identifier used in logs and fallback diagnostics.
    fn name(&self) -> &str;

    /// Send one request and return the raw completion text.
    async fn complete(&self, request: &OracleRequest) -> Result<Completion>;
}
