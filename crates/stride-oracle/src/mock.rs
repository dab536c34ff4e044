//! Scripted oracle for tests: replays queued replies in order and records
//! every request it receives.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::types::{Completion, OracleRequest};
use crate::{Oracle, OracleError, Result};

enum Step {
    Reply(String),
    Fail(String),
}

pub struct ScriptedOracle {
    name: String,
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::named("scripted")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful completion.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Step::Reply(text.into()));
        self
    }

    /// Queue a transport failure.
    pub fn fail(self, reason: impl Into<String>) -> Self {
        self.push(Step::Fail(reason.into()));
        self
    }

    /// Number of requests received so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Copy of every request received so far.
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn push(&self, step: Step) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push_back(step);
        }
    }
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &OracleRequest) -> Result<Completion> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let step = self
            .steps
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .ok_or(OracleError::Exhausted)?;
        match step {
            Step::Reply(text) => Ok(Completion {
                text,
                model: self.name.clone(),
            }),
            Step::Fail(reason) => Err(OracleError::Status {
                status: 503,
                body: reason,
            }),
        }
    }
}
