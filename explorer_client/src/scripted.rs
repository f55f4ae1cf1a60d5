//! Scripted transport for tests, no network involved.

use crate::error::FetchError;
use crate::transport::{HttpTransport, DEFAULT_TIMEOUT_SECONDS};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use url::Url;

/// Canned reply served by [`ScriptedTransport`]
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Timeout,
    RateLimited,
    Status(u16, String),
    Network(String),
}

impl Reply {
    fn into_result(self) -> Result<Value, FetchError> {
        match self {
            Reply::Json(value) => Ok(value),
            Reply::Timeout => Err(FetchError::Timeout {
                seconds: DEFAULT_TIMEOUT_SECONDS,
            }),
            Reply::RateLimited => Err(FetchError::RateLimited),
            Reply::Status(status, body) => Err(FetchError::Http { status, body }),
            Reply::Network(message) => Err(FetchError::Network(message)),
        }
    }
}

struct Route {
    pattern: String,
    replies: VecDeque<Reply>,
}

/// In-memory transport that answers from a script instead of the network.
///
/// Each route matches URLs containing its pattern; the first matching route
/// wins. Replies are served in order and the last one repeats. Every
/// requested URL is recorded.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, pattern: &str, replies: Vec<Reply>) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(Route {
                pattern: pattern.to_string(),
                replies: replies.into(),
            });
        }
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of recorded requests whose URL contains `pattern`
    pub fn count(&self, pattern: &str) -> usize {
        self.requests()
            .iter()
            .filter(|url| url.contains(pattern))
            .count()
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().ok()?;
        let route = routes.iter_mut().find(|r| url.contains(&r.pattern))?;
        if route.replies.len() > 1 {
            route.replies.pop_front()
        } else {
            route.replies.front().cloned()
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get_json(&self, url: &Url) -> Result<Value, FetchError> {
        let url = url.to_string();
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.clone());
        }

        match self.next_reply(&url) {
            Some(reply) => reply.into_result(),
            None => Err(FetchError::Network(format!("no scripted reply for {}", url))),
        }
    }
}
