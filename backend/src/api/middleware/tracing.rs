//! Request correlation IDs.
//!
//! Each request runs inside an `http_request` span carrying its correlation
//! ID, so service and store log lines can be tied back to the call.

use std::fmt;

use axum::{extract::Request, http::header::HeaderValue, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Longest client-supplied ID we echo back.
const MAX_ID_LEN: usize = 128;

/// Correlation ID of the current request, available as a request extension.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a client-supplied ID if it is short and printable.
    pub fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        let acceptable = !value.is_empty()
            && value.len() <= MAX_ID_LEN
            && value.chars().all(|c| c.is_ascii_graphic());
        acceptable.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(CorrelationId::from_header)
        .unwrap_or_else(CorrelationId::generate);

    request.extensions_mut().insert(correlation_id.clone());

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        let mut response = next.run(request).await;
        if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
            response.headers_mut().insert(CORRELATION_ID_HEADER, value);
        }
        tracing::info!(status = response.status().as_u16(), "Request completed");
        response
    }
    .instrument(span)
    .await
}
