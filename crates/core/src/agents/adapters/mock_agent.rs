//! Mock agent implementation for testing.

use crate::agents::base::{AgentError, CompletionAgent, CompletionRequest};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Completion agent that replays scripted responses and records calls.
///
/// Clones share the script and the call log, so a test can hand one clone
/// to the code under test and inspect the other.
#[derive(Clone)]
pub struct MockAgent {
    available: bool,
    responses: Arc<Mutex<VecDeque<Result<String, AgentError>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    calls: Arc<AtomicUsize>,
}

impl MockAgent {
    pub fn new(available: bool, responses: Vec<Result<String, AgentError>>) -> Self {
        Self {
            available,
            responses: Arc::new(Mutex::new(responses.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always answers with `response`.
    pub fn success(response: impl Into<String>) -> Self {
        Self::new(true, vec![Ok(response.into())])
    }

    /// Answers with each response in turn; the last one repeats.
    pub fn scripted(responses: Vec<Result<String, AgentError>>) -> Self {
        Self::new(true, responses)
    }

    pub fn unavailable() -> Self {
        Self::new(false, vec![])
    }

    pub fn failing() -> Self {
        Self::new(
            true,
            vec![Err(AgentError::ExecutionError("Mock failure".to_string()))],
        )
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn next_response(&self) -> Result<String, AgentError> {
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| AgentError::ExecutionError("mock script poisoned".to_string()))?;

        let next = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        };
        next.unwrap_or_else(|| Err(AgentError::ExecutionError("no scripted response".to_string())))
    }
}

#[async_trait]
impl CompletionAgent for MockAgent {
    fn name(&self) -> &str {
        "mock"
    }

    async fn check_availability(&self) -> bool {
        self.available
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if !self.available {
            return Err(AgentError::NotAvailable("Mock agent not available".to_string()));
        }
        self.next_response()
    }
}
