//! Request dispatcher: validates a `TypedQuery`, routes it to the upstream
//! adapter, and turns whatever happens into a `ResponseEnvelope`.
//!
//! Holds no per-request state; the credential is read once at startup and
//! only ever read afterwards, so one `Dispatcher` serves every request.
use std::sync::Arc;

use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use reel_proto::query::{QueryKind, TypedQuery};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::envelope::ResponseEnvelope;
use crate::upstream::{Credential, Upstream, UpstreamError, UpstreamReply, UpstreamRequest};

#[derive(Debug, thiserror::Error)]
pub enum DispatchFault {
    /// No API key in the environment.  Permanent until redeployed.
    #[error("credential not configured")]
    CredentialMissing,
    #[error("movieId required")]
    MissingItemId,
    #[error("Unknown type")]
    UnknownKind(String),
    /// Non-2xx from upstream; forwarded as-is.
    #[error("upstream returned {status}")]
    Upstream { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] UpstreamError),
}

impl DispatchFault {
    pub fn status(&self) -> u16 {
        match self {
            DispatchFault::CredentialMissing | DispatchFault::Transport(_) => 500,
            DispatchFault::MissingItemId | DispatchFault::UnknownKind(_) => 400,
            DispatchFault::Upstream { status, .. } => *status,
        }
    }

    pub fn into_envelope(self) -> ResponseEnvelope {
        match self {
            DispatchFault::Upstream { status, body } => ResponseEnvelope::text(status, body),
            other => ResponseEnvelope::error(other.status(), other.to_string()),
        }
    }
}

pub struct Dispatcher {
    credential: Option<Credential>,
    upstream: Arc<dyn Upstream>,
}

impl Dispatcher {
    pub fn new(credential: Option<Credential>, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            credential,
            upstream,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub async fn dispatch(&self, query: &TypedQuery) -> ResponseEnvelope {
        match self.try_dispatch(query).await {
            // Only successful responses carry the CORS header; upstream
            // errors go back exactly as they arrived.
            Ok(body) => ResponseEnvelope::json(200, body).with_header(ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            Err(fault) => {
                match &fault {
                    DispatchFault::CredentialMissing => error!("dispatch: {}", fault),
                    DispatchFault::MissingItemId => {
                        debug!("dispatch: rejected {}: {}", query.kind.as_str(), fault)
                    }
                    DispatchFault::UnknownKind(raw) => debug!("dispatch: rejected type {:?}", raw),
                    _ => warn!("dispatch: {} failed: {}", query.kind.as_str(), fault),
                }
                fault.into_envelope()
            }
        }
    }

    async fn try_dispatch(&self, query: &TypedQuery) -> Result<Value, DispatchFault> {
        let credential = self
            .credential
            .as_ref()
            .ok_or(DispatchFault::CredentialMissing)?;
        let request = route(query)?;
        match self.upstream.fetch(credential, &request).await? {
            UpstreamReply::Success(body) => Ok(body),
            UpstreamReply::Status { status, body } => Err(DispatchFault::Upstream { status, body }),
        }
    }
}

/// Map a query to its upstream call, or reject it before any I/O.
pub fn route(query: &TypedQuery) -> Result<UpstreamRequest, DispatchFault> {
    match &query.kind {
        QueryKind::Discover => Ok(UpstreamRequest::new(["discover", "movie"])
            .param("with_genres", query.genre_id.clone().unwrap_or_default())
            .param("sort_by", query.sort_key())
            .param("page", "1")),
        QueryKind::Videos => {
            let id = item_id(query)?;
            Ok(UpstreamRequest::new(["movie", id, "videos"]))
        }
        QueryKind::Details => {
            let id = item_id(query)?;
            Ok(UpstreamRequest::new(["movie", id]))
        }
        QueryKind::Unknown(raw) => Err(DispatchFault::UnknownKind(raw.clone())),
    }
}

fn item_id(query: &TypedQuery) -> Result<&str, DispatchFault> {
    query.item_id.as_deref().ok_or(DispatchFault::MissingItemId)
}
