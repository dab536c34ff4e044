use std::sync::Arc;

use stride_core::Assistant;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
    /// Lower-cased name of the header carrying the user id.
    pub user_header: String,
    pub expose_details: bool,
}

impl AppState {
    pub fn new(assistant: Assistant, user_header: impl Into<String>) -> Self {
        Self {
            assistant: Arc::new(assistant),
            user_header: user_header.into().to_ascii_lowercase(),
            expose_details: true,
        }
    }

    pub fn with_details(mut self, expose: bool) -> Self {
        self.expose_details = expose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stride_core::MemoryStore;
    use stride_oracle::ScriptedOracle;

    #[test]
    fn header_name_is_lowercased() {
        let assistant = Assistant::new(Arc::new(MemoryStore::new()), Arc::new(ScriptedOracle::new()));
        let state = AppState::new(assistant, "X-User-Id").with_details(false);
        assert_eq!(state.user_header, "x-user-id");
        assert!(!state.expose_details);
    }
}
