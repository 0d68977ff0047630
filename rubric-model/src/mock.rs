use async_trait::async_trait;
use rubric_core::{ChatModel, ChatRequest, ChatResponse, Result, RubricError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = Arc<dyn Fn(&ChatRequest) -> Result<ChatResponse> + Send + Sync>;
type Latency = Arc<dyn Fn(&ChatRequest) -> Duration + Send + Sync>;

enum Scripted {
    Reply(ChatResponse),
    Fail(String),
}

/// Programmable [`ChatModel`] for tests.
///
/// Replies come from a FIFO script, or from a handler closure when one is
/// set. Every call records the request and the number of calls in flight.
pub struct MockModel {
    name: String,
    script: Mutex<VecDeque<Scripted>>,
    handler: Option<Handler>,
    latency: Option<Latency>,
    requests: Mutex<Vec<ChatRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            handler: None,
            latency: None,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn from_fn<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<ChatResponse> + Send + Sync + 'static,
    {
        let mut mock = Self::new(name);
        mock.handler = Some(Arc::new(handler));
        mock
    }

    pub fn with_response(self, response: ChatResponse) -> Self {
        self.push(Scripted::Reply(response));
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_response(ChatResponse::text(text))
    }

    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(Scripted::Fail(message.into()));
        self
    }

    /// Delay every call by the duration computed from its request.
    pub fn with_latency<F>(mut self, latency: F) -> Self
    where
        F: Fn(&ChatRequest) -> Duration + Send + Sync + 'static,
    {
        self.latency = Some(Arc::new(latency));
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Highest number of calls that were awaiting a reply at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn push(&self, entry: Scripted) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
    }

    fn reply(&self, request: &ChatRequest) -> Result<ChatResponse> {
        if let Some(handler) = &self.handler {
            return handler(request);
        }
        let next = self.script.lock().ok().and_then(|mut script| script.pop_front());
        match next {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(RubricError::Model(message)),
            None => Err(RubricError::Model(format!("mock model '{}' has no replies left", self.name))),
        }
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatModel for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if let Some(latency) = &self.latency {
            tokio::time::sleep(latency(&request)).await;
        }

        let response = self.reply(&request)?;
        if response.text.trim().is_empty() {
            return Err(RubricError::Model(format!("mock model '{}' returned empty content", self.name)));
        }
        Ok(response)
    }
}
