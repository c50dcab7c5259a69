//! The single response shape the dispatcher hands back, for success and
//! failure alike.
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeBody {
    Json(Value),
    /// Upstream error bodies, forwarded untouched.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub body: EnvelopeBody,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl ResponseEnvelope {
    pub fn json(status_code: u16, body: Value) -> Self {
        Self {
            status_code,
            body: EnvelopeBody::Json(body),
            headers: Vec::new(),
        }
    }

    pub fn text(status_code: u16, body: String) -> Self {
        Self {
            status_code,
            body: EnvelopeBody::Text(body),
            headers: Vec::new(),
        }
    }

    /// `{ "error": message }`
    pub fn error(status_code: u16, message: impl Into<String>) -> Self {
        Self::json(status_code, serde_json::json!({ "error": message.into() }))
    }

    pub fn with_header(mut self, name: HeaderName, value: &'static str) -> Self {
        self.headers.push((name, HeaderValue::from_static(value)));
        self
    }

    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.to_str().ok())
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_GATEWAY);
        let mut response = match self.body {
            EnvelopeBody::Json(value) => axum::Json(value).into_response(),
            EnvelopeBody::Text(text) => Response::new(Body::from(text)),
        };
        *response.status_mut() = status;
        for (name, value) in self.headers {
            response.headers_mut().insert(name, value);
        }
        response
    }
}
