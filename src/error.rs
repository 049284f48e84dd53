//! Error taxonomy shared by the whole service.
//!
//! Every fallible operation returns `CanvasError`. The variants mirror what a
//! caller can actually do about the failure:
//!   - MalformedContent: the generation backend produced unusable output; the
//!     user retries, nothing was persisted.
//!   - InvalidPath / IndexOutOfRange: a bad edit command (editing-UI bug);
//!     the edit is rejected and the draft stays unchanged.
//!   - WriteDenied / NotFound / Unavailable: persistence gateway outcomes.
//!   - InvalidRequest: the HTTP/WS input itself was malformed.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanvasError {
  #[error("generated content unusable: {0}")]
  MalformedContent(String),

  #[error("invalid edit path: {0}")]
  InvalidPath(String),

  #[error("index {index} out of range (length {len})")]
  IndexOutOfRange { index: usize, len: usize },

  #[error("write denied: {0}")]
  WriteDenied(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("backend unavailable: {0}")]
  Unavailable(String),

  #[error("invalid request: {0}")]
  InvalidRequest(String),
}

impl CanvasError {
  /// Stable machine-readable code used on the wire (HTTP body and WS error messages).
  pub fn code(&self) -> &'static str {
    match self {
      CanvasError::MalformedContent(_) => "malformed_content",
      CanvasError::InvalidPath(_) => "invalid_path",
      CanvasError::IndexOutOfRange { .. } => "index_out_of_range",
      CanvasError::WriteDenied(_) => "write_denied",
      CanvasError::NotFound(_) => "not_found",
      CanvasError::Unavailable(_) => "unavailable",
      CanvasError::InvalidRequest(_) => "invalid_request",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      CanvasError::MalformedContent(_) => StatusCode::BAD_GATEWAY,
      CanvasError::InvalidPath(_) => StatusCode::BAD_REQUEST,
      CanvasError::IndexOutOfRange { .. } => StatusCode::BAD_REQUEST,
      CanvasError::WriteDenied(_) => StatusCode::FORBIDDEN,
      CanvasError::NotFound(_) => StatusCode::NOT_FOUND,
      CanvasError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      CanvasError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
  }
}

/// Transport failures from either external client surface as `Unavailable`.
impl From<reqwest::Error> for CanvasError {
  fn from(e: reqwest::Error) -> Self {
    CanvasError::Unavailable(e.to_string())
  }
}

#[derive(Serialize)]
struct ErrorBody {
  error: &'static str,
  message: String,
}

impl IntoResponse for CanvasError {
  fn into_response(self) -> Response {
    let body = ErrorBody { error: self.code(), message: self.to_string() };
    (self.status(), Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codes_are_stable() {
    assert_eq!(CanvasError::MalformedContent("x".into()).code(), "malformed_content");
    assert_eq!(CanvasError::IndexOutOfRange { index: 9, len: 3 }.code(), "index_out_of_range");
    assert_eq!(CanvasError::WriteDenied("x".into()).code(), "write_denied");
  }

  #[test]
  fn statuses_follow_the_taxonomy() {
    assert_eq!(CanvasError::MalformedContent("x".into()).status(), StatusCode::BAD_GATEWAY);
    assert_eq!(CanvasError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
    assert_eq!(CanvasError::Unavailable("x".into()).status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(CanvasError::InvalidPath("x".into()).status(), StatusCode::BAD_REQUEST);
  }
}
