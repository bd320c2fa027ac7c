//! GitHub GraphQL client: request pacing, retry and rate-limit cooldown.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::http::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::retry::RetryPolicy;

use super::error::{GitHubError, short_error_message};
use super::search::SearchKind;
use super::types::{GraphQlRequest, GraphQlResponse, SearchData, SearchEdge};

/// Public GitHub GraphQL endpoint.
pub const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Largest page the search API will serve.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Client settings. Every value is fixed for the client's lifetime.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub endpoint: String,
    /// Bearer token. Requests go out unauthenticated without one.
    pub token: Option<String>,
    /// Pause before every request attempt, retries included.
    pub request_delay: Duration,
    /// Retry schedule for transient failures.
    pub retry: RetryPolicy,
    /// Wait after an HTTP 429 before re-issuing the same request.
    pub rate_limit_cooldown: Duration,
    /// Give up after this many consecutive cooldowns. `None` waits indefinitely.
    pub max_rate_limit_waits: Option<u32>,
    /// Per-request timeout for the default transport.
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: GITHUB_GRAPHQL_URL.to_string(),
            token: None,
            request_delay: Duration::from_secs(1),
            retry: RetryPolicy::default(),
            rate_limit_cooldown: Duration::from_secs(10),
            max_rate_limit_waits: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// One decoded page of search results.
#[derive(Debug)]
pub struct SearchPage<T> {
    /// Total hits reported by the server.
    pub total: Option<u64>,
    /// Edges returned, including any that failed to decode.
    pub edge_count: usize,
    pub items: Vec<T>,
    pub dropped: usize,
    /// Cursor of the last edge.
    pub end_cursor: Option<String>,
}

/// GitHub GraphQL API client.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    options: ClientOptions,
}

impl GitHubClient {
    /// Create a client backed by reqwest.
    pub fn new(options: ClientOptions) -> Result<Self, GitHubError> {
        let transport = ReqwestTransport::with_timeout(options.timeout)?;
        Ok(Self::new_with_transport(options, Arc::new(transport)))
    }

    pub fn new_with_transport(options: ClientOptions, transport: Arc<dyn HttpTransport>) -> Self {
        if options.token.as_deref().is_none_or(str::is_empty) {
            tracing::warn!("No GitHub token configured, sending unauthenticated requests");
        }
        Self { transport, options }
    }

    /// Fetch one page of `search`, asking for `first` items after `after`.
    pub async fn search_page<S: SearchKind>(
        &self,
        search: &S,
        first: u32,
        after: Option<&str>,
    ) -> Result<SearchPage<S::Item>, GitHubError> {
        let request = GraphQlRequest {
            query: search.document(),
            variables: search.variables(first, after),
        };
        let data: SearchData = self.graphql(search.label(), &request).await?;
        let connection = data.search;

        let total = search
            .total(&connection)
            .and_then(|t| u64::try_from(t).ok());
        let edge_count = connection.edges.len();
        let mut end_cursor = None;
        let mut items = Vec::with_capacity(edge_count);
        let mut dropped = 0;
        for raw in connection.edges {
            let edge = serde_json::from_value::<SearchEdge>(raw).ok();
            let cursor = edge.as_ref().and_then(|e| e.cursor.clone());
            if cursor.is_some() {
                end_cursor.clone_from(&cursor);
            }

            let decoded = match edge {
                Some(SearchEdge {
                    node: Some(node), ..
                }) => search.decode(node),
                Some(_) => Err("node is null".to_string()),
                None => Err("edge is null or malformed".to_string()),
            };
            match decoded {
                Ok(item) => items.push(item),
                Err(reason) => {
                    dropped += 1;
                    tracing::warn!(
                        search = search.label(),
                        cursor = cursor.as_deref().unwrap_or("-"),
                        %reason,
                        "Dropping malformed search result"
                    );
                }
            }
        }

        Ok(SearchPage {
            total,
            edge_count,
            items,
            dropped,
            end_cursor,
        })
    }

    /// Post a GraphQL request and decode `data`.
    ///
    /// Transient failures are retried under the client's [`RetryPolicy`].
    /// An HTTP 429 is answered with a cooldown and the identical request,
    /// outside the retry budget.
    async fn graphql<V, T>(&self, label: &str, request: &GraphQlRequest<'_, V>) -> Result<T, GitHubError>
    where
        V: serde::Serialize,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(request).map_err(|e| GitHubError::Request(e.to_string()))?;
        let mut waits = 0u32;

        loop {
            let result = self
                .options
                .retry
                .run(label, || self.send_once::<T>(&body), GitHubError::is_transient)
                .await
                .map_err(GitHubError::from);

            match result {
                Err(GitHubError::RateLimited) => {
                    waits += 1;
                    if let Some(max) = self.options.max_rate_limit_waits
                        && waits > max
                    {
                        return Err(GitHubError::RateLimitWaitsExhausted { waits: max });
                    }
                    tracing::warn!(
                        call = label,
                        waits,
                        cooldown_secs = self.options.rate_limit_cooldown.as_secs(),
                        "Rate limited, waiting before repeating the request"
                    );
                    tokio::time::sleep(self.options.rate_limit_cooldown).await;
                }
                Err(e) => {
                    tracing::error!(call = label, error = %short_error_message(&e), "GitHub request failed");
                    return Err(e);
                }
                Ok(data) => return Ok(data),
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T, GitHubError> {
        if !self.options.request_delay.is_zero() {
            tokio::time::sleep(self.options.request_delay).await;
        }

        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), "gitrank".to_string()),
        ];
        if let Some(token) = self.options.token.as_deref().filter(|t| !t.is_empty()) {
            headers.push(("Authorization".to_string(), format!("bearer {token}")));
        }

        let request = HttpRequest {
            url: self.options.endpoint.clone(),
            headers,
            body: body.to_vec(),
        };

        let response = self.transport.post(request).await?;

        if response.status == 429 {
            return Err(GitHubError::RateLimited);
        }
        if !response.is_success() {
            return Err(GitHubError::Status {
                status: response.status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            });
        }

        let envelope: GraphQlResponse<T> = serde_json::from_slice(&response.body).map_err(|e| {
            if e.is_eof() {
                GitHubError::Truncated(e.to_string())
            } else {
                GitHubError::Malformed(e.to_string())
            }
        })?;

        if envelope.errors.iter().any(|e| e.is_rate_limit()) {
            return Err(GitHubError::RateLimited);
        }

        match envelope.data {
            Some(data) => {
                if !envelope.errors.is_empty() {
                    tracing::warn!(
                        errors = envelope.errors.len(),
                        first = %envelope.errors[0].message,
                        "GraphQL response carried errors alongside data"
                    );
                }
                Ok(data)
            }
            None if !envelope.errors.is_empty() => Err(GitHubError::GraphQl(
                envelope
                    .errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            )),
            None => Err(GitHubError::Malformed(
                "response has neither data nor errors".to_string(),
            )),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::http::{HttpResponse, MockTransport};

    /// Options that never sleep, for fast tests.
    pub fn instant_options(endpoint: &str) -> ClientOptions {
        ClientOptions {
            endpoint: endpoint.to_string(),
            token: Some("test-token".to_string()),
            request_delay: Duration::ZERO,
            retry: RetryPolicy::new(Duration::ZERO, 3),
            rate_limit_cooldown: Duration::ZERO,
            max_rate_limit_waits: None,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.to_string().into_bytes(),
        }
    }

    /// A repository search page with ids `start..start+count`.
    pub fn repository_page(total: i64, start: i64, count: i64) -> serde_json::Value {
        let edges: Vec<_> = (start..start + count)
            .map(|id| {
                serde_json::json!({
                    "cursor": format!("cursor-{id}"),
                    "node": {
                        "databaseId": id,
                        "id": format!("R_{id}"),
                        "name": format!("repo-{id}"),
                        "url": format!("https://github.com/o/repo-{id}"),
                        "languages": {"nodes": [{"name": "Rust"}]},
                        "stargazerCount": 1_000_000 - id,
                        "description": null,
                        "createdAt": "2020-01-01T00:00:00Z"
                    }
                })
            })
            .collect();
        serde_json::json!({
            "data": {"search": {"repositoryCount": total, "edges": edges}}
        })
    }

    pub fn mock_client(transport: &MockTransport, endpoint: &str) -> GitHubClient {
        GitHubClient::new_with_transport(instant_options(endpoint), Arc::new(transport.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::github::search::RepositorySearch;
    use crate::http::{HttpError, HttpResponse, MockTransport};
    use serde_json::json;

    const URL: &str = "https://api.test/graphql";

    #[tokio::test]
    async fn test_search_page_decodes_edges_and_sends_bearer_token() {
        let transport = MockTransport::new();
        transport.push_response(URL, json_response(200, repository_page(5, 1, 2)));
        let client = mock_client(&transport, URL);

        let page = client
            .search_page(&RepositorySearch::default(), 2, None)
            .await
            .expect("page");

        assert_eq!(page.total, Some(5));
        assert_eq!(page.edge_count, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.end_cursor.as_deref(), Some("cursor-2"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let auth = requests[0]
            .headers
            .iter()
            .find(|(k, _)| k == "Authorization")
            .map(|(_, v)| v.as_str());
        assert_eq!(auth, Some("bearer test-token"));
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["variables"]["first"], 2);
        assert!(body["variables"]["after"].is_null());
    }

    #[tokio::test]
    async fn test_malformed_nodes_are_dropped_not_fatal() {
        let transport = MockTransport::new();
        let mut page = repository_page(3, 1, 2);
        page["data"]["search"]["edges"]
            .as_array_mut()
            .unwrap()
            .push(json!({"cursor": "cursor-bad", "node": {}}));
        transport.push_response(URL, json_response(200, page));
        let client = mock_client(&transport, URL);

        let page = client
            .search_page(&RepositorySearch::default(), 3, None)
            .await
            .expect("page");
        assert_eq!(page.edge_count, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.dropped, 1);
        assert_eq!(page.end_cursor.as_deref(), Some("cursor-bad"));
    }

    #[tokio::test]
    async fn test_null_and_cursorless_edges_are_dropped_not_fatal() {
        let transport = MockTransport::new();
        let mut page = repository_page(4, 1, 2);
        let edges = page["data"]["search"]["edges"].as_array_mut().unwrap();
        edges.insert(1, serde_json::Value::Null);
        edges.push(json!({"node": {"databaseId": 9}}));
        transport.push_response(URL, json_response(200, page));
        let client = mock_client(&transport, URL);

        let page = client
            .search_page(&RepositorySearch::default(), 4, None)
            .await
            .expect("page survives bad edges");

        assert_eq!(page.edge_count, 4);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.dropped, 2);
        assert_eq!(page.end_cursor.as_deref(), Some("cursor-2"));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_with_same_body() {
        let transport = MockTransport::new();
        transport.push_error(URL, HttpError::Timeout("slow".into()));
        transport.push_response(URL, json_response(502, json!({})));
        transport.push_response(
            URL,
            HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: br#"{"data": {"search": {"repositoryCo"#.to_vec(),
            },
        );
        transport.push_response(URL, json_response(200, repository_page(1, 1, 1)));
        let client = mock_client(&transport, URL);

        let page = client
            .search_page(&RepositorySearch::default(), 1, Some("cursor-0"))
            .await
            .expect("fourth attempt succeeds");
        assert_eq!(page.items.len(), 1);

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests.iter().all(|r| r.body == requests[0].body));
    }

    #[tokio::test]
    async fn test_retries_exhaust_into_error() {
        let transport = MockTransport::new();
        for _ in 0..4 {
            transport.push_error(URL, HttpError::Connect("refused".into()));
        }
        let client = mock_client(&transport, URL);

        let err = client
            .search_page(&RepositorySearch::default(), 1, None)
            .await
            .expect_err("all attempts fail");
        assert!(matches!(err, GitHubError::RetriesExhausted { attempts: 4, .. }));
        assert_eq!(transport.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_client_errors_are_fatal_immediately() {
        let transport = MockTransport::new();
        transport.push_response(
            URL,
            json_response(401, json!({"message": "Bad credentials"})),
        );
        let client = mock_client(&transport, URL);

        let err = client
            .search_page(&RepositorySearch::default(), 1, None)
            .await
            .expect_err("401 is fatal");
        assert!(matches!(err, GitHubError::Status { status: 401, .. }));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_cools_down_and_repeats_request() {
        let transport = MockTransport::new();
        transport.push_response(URL, json_response(429, json!({})));
        transport.push_response(
            URL,
            json_response(
                200,
                json!({"data": null, "errors": [{"type": "RATE_LIMITED", "message": "API rate limit exceeded"}]}),
            ),
        );
        transport.push_response(URL, json_response(200, repository_page(1, 1, 1)));
        let client = mock_client(&transport, URL);

        let page = client
            .search_page(&RepositorySearch::default(), 1, Some("cursor-7"))
            .await
            .expect("succeeds after cooldowns");
        assert_eq!(page.items.len(), 1);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        for request in &requests {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            assert_eq!(body["variables"]["after"], "cursor-7");
        }
    }

    #[tokio::test]
    async fn test_rate_limit_waits_can_be_capped() {
        let transport = MockTransport::new();
        for _ in 0..3 {
            transport.push_response(URL, json_response(429, json!({})));
        }
        let mut options = instant_options(URL);
        options.max_rate_limit_waits = Some(2);
        let client = GitHubClient::new_with_transport(options, Arc::new(transport.clone()));

        let err = client
            .search_page(&RepositorySearch::default(), 1, None)
            .await
            .expect_err("cap reached");
        assert!(matches!(err, GitHubError::RateLimitWaitsExhausted { waits: 2 }));
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_graphql_errors_without_data_are_fatal() {
        let transport = MockTransport::new();
        transport.push_response(
            URL,
            json_response(200, json!({"errors": [{"message": "Parse error on \"}\""}]})),
        );
        let client = mock_client(&transport, URL);

        let err = client
            .search_page(&RepositorySearch::default(), 1, None)
            .await
            .expect_err("no data");
        assert!(matches!(err, GitHubError::GraphQl(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_delay_precedes_each_request() {
        let transport = MockTransport::new();
        transport.push_response(URL, json_response(200, repository_page(1, 1, 1)));
        let mut options = instant_options(URL);
        options.request_delay = Duration::from_secs(1);
        let client = GitHubClient::new_with_transport(options, Arc::new(transport.clone()));

        let started = tokio::time::Instant::now();
        client
            .search_page(&RepositorySearch::default(), 1, None)
            .await
            .expect("page");
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_delay_precedes_every_retry() {
        let transport = MockTransport::new();
        transport.push_error(URL, HttpError::Timeout("slow".into()));
        transport.push_response(URL, json_response(200, repository_page(1, 1, 1)));
        let mut options = instant_options(URL);
        options.request_delay = Duration::from_secs(1);
        let client = GitHubClient::new_with_transport(options, Arc::new(transport.clone()));

        let started = tokio::time::Instant::now();
        client
            .search_page(&RepositorySearch::default(), 1, None)
            .await
            .expect("second attempt succeeds");

        assert_eq!(transport.requests().len(), 2);
        assert!(started.elapsed() >= Duration::from_secs(2), "waited {:?}", started.elapsed());
    }
}
