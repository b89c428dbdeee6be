//! Test doubles shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::Method;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::domain::{ApiError, Task, TransportError};
use crate::ports::{HttpRequest, HttpResponse, TaskLoader, Transport};

/// One scripted reaction of [`ScriptedTransport`].
pub(crate) enum Step {
    Respond(u16, String),
    Fail(&'static str),
    /// Never answers (the caller's deadline has to fire).
    Hang,
    /// Answers once the gate is notified.
    Gated(Arc<Notify>, u16, String),
}

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub at: Instant,
    pub method: Method,
    pub url: String,
    pub body: Option<Vec<u8>>,
    pub content_type: Option<String>,
}

/// Transport that plays back a fixed script and records every call.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(Call {
            at: Instant::now(),
            method: request.method.clone(),
            url: request.url.clone(),
            body: request.body.clone(),
            content_type: request
                .headers
                .get(http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Step::Fail(msg)) => Err(TransportError::new(msg)),
            Some(Step::Hang) => std::future::pending().await,
            Some(Step::Gated(gate, status, body)) => {
                gate.notified().await;
                Ok(HttpResponse::new(status, body))
            }
            None => Err(TransportError::new("script exhausted")),
        }
    }
}

/// Loader backed by a mutable map standing in for upstream truth.
#[derive(Default)]
pub(crate) struct MapLoader {
    truth: Mutex<HashMap<String, Vec<Task>>>,
    failing: Mutex<bool>,
    loads: Mutex<Vec<String>>,
}

impl MapLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, key: &str, tasks: Vec<Task>) {
        self.truth.lock().unwrap().insert(key.to_string(), tasks);
    }

    pub fn fail_loads(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskLoader for MapLoader {
    async fn load(&self, key: &str) -> Result<Vec<Task>, ApiError> {
        self.loads.lock().unwrap().push(key.to_string());
        if *self.failing.lock().unwrap() {
            return Err(TransportError::new("loader offline").into());
        }
        Ok(self
            .truth
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default())
    }
}
