//! HTTP surface: `GET /api/tmdb?type=…` in, `ResponseEnvelope` out.
use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use axum::routing::get;
use axum::Router;
use reel_proto::query::TypedQuery;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::dispatcher::Dispatcher;
use crate::envelope::ResponseEnvelope;

#[derive(Clone)]
struct HttpState {
    dispatcher: Arc<Dispatcher>,
}

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/api/tmdb", get(query))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(HttpState { dispatcher })
}

/// Bind and serve until ctrl-c.
pub async fn serve(bind_address: &str, port: u16, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", bind_address, port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Dispatcher listening on http://{}/api/tmdb", addr);

    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Dispatcher: shutdown requested");
        })
        .await?;
    Ok(())
}

async fn query(
    State(state): State<HttpState>,
    Query(params): Query<HashMap<String, String>>,
) -> ResponseEnvelope {
    let query = TypedQuery::from_params(&params);
    info!(
        "HTTP API: type={} genre={:?} movieId={:?}",
        query.kind.as_str(),
        query.genre_id,
        query.item_id
    );
    let envelope = state.dispatcher.dispatch(&query).await;
    debug!(
        "HTTP API: -> {}{}",
        envelope.status_code,
        if envelope.header(&ACCESS_CONTROL_ALLOW_ORIGIN).is_some() { " (cors)" } else { "" }
    );
    envelope
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::tests::stub_upstream;
    use crate::upstream::{Credential, TmdbClient};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn app_against_stub(credential: Option<&str>) -> (Router, crate::upstream::tests::Seen) {
        let (base, seen) = stub_upstream().await;
        let upstream = Arc::new(TmdbClient::new(&base, Duration::from_secs(5)).unwrap());
        let dispatcher = Dispatcher::new(credential.map(Credential::new), upstream);
        (router(Arc::new(dispatcher)), seen)
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_discover_end_to_end() {
        let (app, seen) = app_against_stub(Some("k")).await;
        let response = get(app, "/api/tmdb?type=discover&genre=878").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body, serde_json::json!({ "results": [{ "id": 1, "title": "X" }] }));
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            ["/3/discover/movie?api_key=k&with_genres=878&sort_by=popularity.desc&page=1"]
        );
    }

    #[tokio::test]
    async fn test_upstream_404_passes_through_without_cors() {
        let (app, _) = app_against_stub(Some("k")).await;
        let response = get(app, "/api/tmdb?type=videos&movieId=9").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert!(body_text(response).await.contains("\"status_code\":34"));
    }

    #[tokio::test]
    async fn test_validation_never_reaches_upstream() {
        let (app, seen) = app_against_stub(Some("k")).await;
        let response = get(app.clone(), "/api/tmdb?type=movie").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, r#"{"error":"movieId required"}"#);

        let response = get(app, "/api/tmdb?movieId=5").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, r#"{"error":"Unknown type"}"#);

        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credential_is_500() {
        let (app, seen) = app_against_stub(None).await;
        let response = get(app, "/api/tmdb?type=discover").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_text(response).await,
            r#"{"error":"credential not configured"}"#
        );
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_healthz() {
        let (app, _) = app_against_stub(None).await;
        let response = get(app, "/healthz").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }
}
