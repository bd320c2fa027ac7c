//! POST-only HTTP seam under the GraphQL client.
//!
//! The client builds an [`HttpRequest`] and hands it to an [`HttpTransport`].
//! Production uses [`ReqwestTransport`]; tests script replies with the
//! in-crate mock.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// A JSON POST to a single endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Status, headers and raw body of a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures below the HTTP status layer.
///
/// Every variant except `Unscripted` is a network-level condition that may
/// clear up on its own.
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("response body truncated: {0}")]
    Body(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("no scripted reply for POST {url}")]
    Unscripted { url: String },
}

impl HttpError {
    /// Whether the failure is worth another attempt.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, HttpError::Unscripted { .. })
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

// ─── reqwest ─────────────────────────────────────────────────────────────────

/// Transport backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a client with a per-request `timeout` and the crate user agent.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gitrank/", env!("CARGO_PKG_VERSION")))
            .build()
            .map(Self::new)
            .map_err(|e| HttpError::Transport(e.to_string()))
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            HttpError::Timeout(message)
        } else if err.is_connect() {
            HttpError::Connect(message)
        } else if err.is_body() || err.is_decode() {
            HttpError::Body(message)
        } else {
            HttpError::Transport(message)
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let builder = request
            .headers
            .iter()
            .fold(self.client.post(&request.url), |builder, (key, value)| {
                builder.header(key, value)
            });

        let reply = builder.body(request.body).send().await?;

        let status = reply.status().as_u16();
        let headers = reply
            .headers()
            .iter()
            .filter_map(|(key, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (key.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = reply.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

// ─── Scripted transport (tests) ──────────────────────────────────────────────

#[cfg(test)]
pub use scripted::MockTransport;

#[cfg(test)]
mod scripted {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex, MutexGuard};

    use async_trait::async_trait;

    use super::{HttpError, HttpRequest, HttpResponse, HttpTransport};

    type Reply = Result<HttpResponse, HttpError>;

    /// Replies queued per URL and handed out first in, first out. Every
    /// request is recorded so tests can inspect bodies and headers.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        state: Arc<Mutex<State>>,
    }

    #[derive(Default)]
    struct State {
        replies: HashMap<String, VecDeque<Reply>>,
        seen: Vec<HttpRequest>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        fn state(&self) -> MutexGuard<'_, State> {
            self.state.lock().expect("scripted transport lock poisoned")
        }

        pub fn push_response(&self, url: &str, response: HttpResponse) {
            self.queue(url, Ok(response));
        }

        pub fn push_error(&self, url: &str, error: HttpError) {
            self.queue(url, Err(error));
        }

        fn queue(&self, url: &str, reply: Reply) {
            self.state()
                .replies
                .entry(url.to_string())
                .or_default()
                .push_back(reply);
        }

        /// Every request received so far, oldest first.
        pub fn requests(&self) -> Vec<HttpRequest> {
            self.state().seen.clone()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn post(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let mut state = self.state();
            let url = request.url.clone();
            state.seen.push(request);
            state
                .replies
                .get_mut(&url)
                .and_then(VecDeque::pop_front)
                .unwrap_or(Err(HttpError::Unscripted { url }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(url: &str) -> HttpRequest {
        HttpRequest {
            url: url.to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: br#"{"query":""}"#.to_vec(),
        }
    }

    #[test]
    fn test_success_is_2xx_only() {
        let mut response = HttpResponse {
            status: 204,
            headers: Vec::new(),
            body: Vec::new(),
        };
        assert!(response.is_success());
        response.status = 429;
        assert!(!response.is_success());
    }

    #[test]
    fn test_only_unscripted_replies_are_permanent() {
        assert!(HttpError::Connect("refused".into()).is_transient());
        assert!(HttpError::Timeout("30s".into()).is_transient());
        assert!(HttpError::Body("eof".into()).is_transient());
        assert!(HttpError::Transport("reset".into()).is_transient());
        assert!(!HttpError::Unscripted { url: "https://x".into() }.is_transient());
    }

    #[tokio::test]
    async fn test_scripted_replies_come_back_in_order() {
        let transport = MockTransport::new();
        let url = "https://api.test/graphql";
        transport.push_error(url, HttpError::Timeout("slow".into()));
        transport.push_response(
            url,
            HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: b"{}".to_vec(),
            },
        );

        let first = transport.post(post(url)).await;
        assert!(matches!(first, Err(HttpError::Timeout(_))));
        let second = transport.post(post(url)).await.expect("second reply");
        assert_eq!(second.status, 200);

        let third = transport.post(post(url)).await.expect_err("queue drained");
        assert!(matches!(third, HttpError::Unscripted { .. }));
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_refused_connection_is_transient() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let transport = ReqwestTransport::with_timeout(Duration::from_secs(5)).expect("client");
        let err = transport
            .post(post(&format!("http://{addr}/graphql")))
            .await
            .expect_err("nothing is listening");
        assert!(matches!(err, HttpError::Connect(_)), "got {err:?}");
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_unparseable_url_is_a_transport_error() {
        let transport = ReqwestTransport::new(reqwest::Client::new());
        let err = transport.post(post("not a url")).await.expect_err("bad url");
        assert!(matches!(err, HttpError::Transport(_)), "got {err:?}");
    }
}
