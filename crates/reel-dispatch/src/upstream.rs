//! Upstream client adapter: the only code that talks to the metadata API.
//!
//! Builds the upstream URL (base + path segments + query, with the API key
//! injected), performs one GET, and classifies what came back:
//!
//! • 2xx            → body decoded as JSON, `UpstreamReply::Success`
//! • any other code → status and body verbatim, `UpstreamReply::Status`
//! • no response    → `UpstreamError::Transport`
//!
//! There is no retry.  The API key travels in the query string, so nothing in
//! here logs a full URL, and transport errors are stripped of theirs before
//! they are rendered.
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, warn};

const CREDENTIAL_PARAM: &str = "api_key";

/// The upstream API key.  Read once at startup and never printed.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// `None` when the variable is unset or blank.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Self::new)
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// One upstream call: path segments under the base URL plus query params.
/// Each segment is percent-encoded on its own, so an id can't smuggle in `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub segments: Vec<String>,
    pub params: Vec<(&'static str, String)>,
}

impl UpstreamRequest {
    pub fn new<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    /// Path for logs, e.g. `movie/550/videos`.
    pub fn path(&self) -> String {
        self.segments.join("/")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamReply {
    Success(serde_json::Value),
    Status { status: u16, body: String },
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream returned an unreadable body: {0}")]
    Decode(String),
    #[error("cannot build upstream URL for {0}")]
    Url(String),
}

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch(
        &self,
        credential: &Credential,
        request: &UpstreamRequest,
    ) -> Result<UpstreamReply, UpstreamError>;
}

/// reqwest-backed adapter for the movie metadata API.
pub struct TmdbClient {
    client: Client,
    base: Url,
}

impl TmdbClient {
    pub fn new(base: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base = Url::parse(base)?;
        if base.cannot_be_a_base() {
            anyhow::bail!("upstream base {} cannot take a path", base);
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("reel-dispatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base })
    }

    fn build_url(
        &self,
        credential: &Credential,
        request: &UpstreamRequest,
    ) -> Result<Url, UpstreamError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Url(request.path()))?
            .pop_if_empty()
            .extend(&request.segments);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(CREDENTIAL_PARAM, credential.expose());
            for (key, value) in &request.params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Upstream for TmdbClient {
    async fn fetch(
        &self,
        credential: &Credential,
        request: &UpstreamRequest,
    ) -> Result<UpstreamReply, UpstreamError> {
        let path = request.path();
        let url = self.build_url(credential, request)?;
        debug!("upstream: GET {}", path);

        let response = self.client.get(url).send().await.map_err(|e| {
            let e = e.without_url();
            warn!("upstream: {} failed: {}", path, e);
            UpstreamError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            let body = response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| UpstreamError::Decode(e.without_url().to_string()))?;
            return Ok(UpstreamReply::Success(body));
        }

        warn!("upstream: {} returned {}", path, status);
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.without_url().to_string()))?;
        Ok(UpstreamReply::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::extract::{OriginalUri, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use std::sync::{Arc, Mutex};

    pub(crate) type Seen = Arc<Mutex<Vec<String>>>;

    /// Stand-in metadata API on an ephemeral port, recording every request URI.
    pub(crate) async fn stub_upstream() -> (String, Seen) {
        async fn discover(State(seen): State<Seen>, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
            seen.lock().unwrap().push(uri.to_string());
            axum::Json(serde_json::json!({ "results": [{ "id": 1, "title": "X" }] }))
        }
        async fn videos(State(seen): State<Seen>, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
            seen.lock().unwrap().push(uri.to_string());
            (
                StatusCode::NOT_FOUND,
                r#"{"status_code":34,"status_message":"The resource you requested could not be found."}"#,
            )
        }
        async fn details(State(seen): State<Seen>, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
            seen.lock().unwrap().push(uri.to_string());
            "<html>maintenance</html>"
        }

        let seen: Seen = Arc::default();
        let app = Router::new()
            .route("/3/discover/movie", get(discover))
            .route("/3/movie/:id/videos", get(videos))
            .route("/3/movie/:id", get(details))
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{}/3", addr), seen)
    }

    fn client(base: &str) -> TmdbClient {
        TmdbClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_build_url_injects_key_and_encodes_segments() {
        let c = client("https://api.themoviedb.org/3/");
        let key = Credential::new("s3cret");

        let discover = UpstreamRequest::new(["discover", "movie"])
            .param("with_genres", "878")
            .param("sort_by", "popularity.desc")
            .param("page", "1");
        assert_eq!(
            c.build_url(&key, &discover).unwrap().as_str(),
            "https://api.themoviedb.org/3/discover/movie?api_key=s3cret&with_genres=878&sort_by=popularity.desc&page=1"
        );

        let sneaky = UpstreamRequest::new(["movie", "550/credits", "videos"]);
        assert_eq!(
            c.build_url(&key, &sneaky).unwrap().path(),
            "/3/movie/550%2Fcredits/videos"
        );
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let key = Credential::new("s3cret");
        assert_eq!(format!("{:?}", key), "Credential(***)");
    }

    #[test]
    fn test_rejects_unusable_base() {
        assert!(TmdbClient::new("mailto:someone@example.com", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_success_is_decoded_json() {
        let (base, seen) = stub_upstream().await;
        let reply = client(&base)
            .fetch(
                &Credential::new("k"),
                &UpstreamRequest::new(["discover", "movie"]).param("with_genres", ""),
            )
            .await
            .unwrap();
        assert_eq!(
            reply,
            UpstreamReply::Success(serde_json::json!({ "results": [{ "id": 1, "title": "X" }] }))
        );
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            ["/3/discover/movie?api_key=k&with_genres="]
        );
    }

    #[tokio::test]
    async fn test_non_success_passes_status_and_body_through() {
        let (base, _) = stub_upstream().await;
        let reply = client(&base)
            .fetch(&Credential::new("k"), &UpstreamRequest::new(["movie", "9", "videos"]))
            .await
            .unwrap();
        match reply {
            UpstreamReply::Status { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("\"status_code\":34"));
            }
            other => panic!("expected pass-through, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_that_is_not_json_is_a_decode_error() {
        let (base, _) = stub_upstream().await;
        let err = client(&base)
            .fetch(&Credential::new("k"), &UpstreamRequest::new(["movie", "9"]))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_and_hides_key() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{}/3", addr))
            .fetch(&Credential::new("s3cret"), &UpstreamRequest::new(["movie", "1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)), "got {:?}", err);
        assert!(!err.to_string().contains("s3cret"));
    }
}
