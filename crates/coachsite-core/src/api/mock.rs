//! Scripted transport for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::request::{ApiRequest, Method, RawResponse};
use super::{ApiError, Transport};

type Reply = Result<RawResponse, ApiError>;

/// Answers requests from per-route queues keyed by `"METHOD /path"`
/// (query string ignored). The last reply on a route is reused.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<ApiRequest>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every response for `delay` so callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn route(method: Method, path: &str) -> String {
        format!("{} {}", method.as_str(), path)
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        let mut routes = self.routes.lock().unwrap();
        routes
            .entry(Self::route(method, path))
            .or_default()
            .push_back(reply);
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.push(
            method,
            path,
            Ok(RawResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    /// Shorthand for a 200 with `{ success: true, data }`.
    pub fn ok_data(&self, method: Method, path: &str, data: Value) {
        self.respond(
            method,
            path,
            200,
            serde_json::json!({ "success": true, "data": data }),
        );
    }

    pub fn fail(&self, method: Method, path: &str, error: ApiError) {
        self.push(method, path, Err(error));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let key = Self::route(request.method, &request.path);
        self.requests.lock().unwrap().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Ok(RawResponse {
                status: 404,
                body: serde_json::json!({ "message": format!("No route for {}", key) })
                    .to_string(),
            }),
        }
    }
}
