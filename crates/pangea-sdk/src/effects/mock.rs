use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::http::{HttpClient, HttpRequest, HttpResponse, Method};
use crate::error::{TransportError, TransportErrorKind};

#[derive(Clone)]
enum Reply {
    Ready(Result<HttpResponse, TransportError>),
    /// Never answers.
    Stall,
}

struct Route {
    method: Method,
    suffix: String,
    replies: VecDeque<Reply>,
}

#[derive(Default)]
struct State {
    routes:   Vec<Route>,
    requests: Vec<HttpRequest>,
}

/// Scripted in-process [`HttpClient`] for tests.
///
/// Replies are registered per method and URL path suffix and served in
/// order; the last reply of a route repeats forever. Every request is
/// recorded. Clones share the script and the record.
#[derive(Clone, Default)]
pub struct MockHttpClient {
    state: Arc<Mutex<State>>,
}

impl MockHttpClient {
    pub fn new() -> Self { Self::default() }

    /// Queue `response` for requests whose URL path ends with `suffix`.
    pub fn on(&self, method: Method, suffix: &str, response: HttpResponse) -> &Self {
        self.push(method, suffix, Reply::Ready(Ok(response)))
    }

    /// Queue a transport failure.
    pub fn on_error(&self, method: Method, suffix: &str, kind: TransportErrorKind) -> &Self {
        self.push(method, suffix, Reply::Ready(Err(TransportError::new(kind, "scripted failure"))))
    }

    /// Queue a JSON response.
    pub fn on_json(&self, method: Method, suffix: &str, status: u16, body: serde_json::Value) -> &Self {
        let response = HttpResponse::new(status, body.to_string()).with_header("content-type", "application/json");
        self.on(method, suffix, response)
    }

    /// Queue a reply that never arrives, as from a hung server.
    pub fn on_stall(&self, method: Method, suffix: &str) -> &Self { self.push(method, suffix, Reply::Stall) }

    fn push(&self, method: Method, suffix: &str, reply: Reply) -> &Self {
        let mut state = self.lock();
        match state.routes.iter_mut().find(|r| r.method == method && r.suffix == suffix) {
            Some(route) => route.replies.push_back(reply),
            None => state.routes.push(Route {
                method,
                suffix: suffix.to_string(),
                replies: VecDeque::from([reply]),
            }),
        }
        drop(state);
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> { self.lock().requests.clone() }

    /// Requests whose URL path ends with `suffix`.
    pub fn requests_to(&self, method: Method, suffix: &str) -> Vec<HttpRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method && url_path(&r.url).ends_with(suffix))
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> { self.state.lock().unwrap_or_else(|e| e.into_inner()) }

    fn reply(&self, request: HttpRequest) -> Reply {
        let mut state = self.lock();
        let path = url_path(&request.url).to_string();
        let method = request.method;
        state.requests.push(request);

        let route = state
            .routes
            .iter_mut()
            .filter(|r| r.method == method && path.ends_with(&r.suffix))
            .max_by_key(|r| r.suffix.len());
        let Some(route) = route else {
            return Reply::Ready(Err(TransportError::new(
                TransportErrorKind::Other,
                format!("no scripted reply for {method} {path}"),
            )));
        };
        if route.replies.len() > 1 {
            route.replies.pop_front().unwrap_or_else(|| unreachable_reply(&path))
        } else {
            route.replies.front().cloned().unwrap_or_else(|| unreachable_reply(&path))
        }
    }
}

fn unreachable_reply(path: &str) -> Reply {
    Reply::Ready(Err(TransportError::new(
        TransportErrorKind::Other,
        format!("script for {path} is empty"),
    )))
}

fn url_path(url: &str) -> &str { url.split(['?', '#']).next().unwrap_or(url) }

impl HttpClient for MockHttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        match self.reply(request) {
            Reply::Ready(reply) => reply,
            Reply::Stall => std::future::pending().await,
        }
    }
}
