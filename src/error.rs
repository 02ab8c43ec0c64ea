//! Application error taxonomy.
//!
//! Every handler returns typed JSON errors; error variants map onto HTTP
//! status codes in one place so the surface stays consistent.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  /// Missing or malformed request fields. No side effects have occurred.
  #[error("{0}")]
  Validation(String),

  #[error("Authentication required")]
  Unauthorized,

  #[error("Admin access required")]
  Forbidden,

  #[error("{0}")]
  NotFound(String),

  /// A required binding (database, provider, storage) is absent.
  /// The operation aborted before any write.
  #[error("{0} not configured")]
  NotConfigured(&'static str),

  /// The rolling translation character quota is exhausted for the current
  /// period. Callers should stop polling rather than retry.
  #[error("translation quota exceeded: {used}/{limit} chars used this period")]
  QuotaExceeded { used: i64, limit: i64 },

  /// Upstream translation provider failure.
  #[error("translation provider error: {0}")]
  Provider(String),

  /// Tokenization or storage failure while processing an upload. The
  /// subtitle file is marked failed; re-upload is the recovery path.
  #[error("subtitle pipeline failure: {0}")]
  Pipeline(String),

  #[error("database error: {0}")]
  Db(#[from] rusqlite::Error),

  #[error("storage error: {0}")]
  Storage(#[from] std::io::Error),
}

impl AppError {
  pub fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Unauthorized => StatusCode::UNAUTHORIZED,
      AppError::Forbidden => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
      AppError::Provider(_) => StatusCode::BAD_GATEWAY,
      AppError::NotConfigured(_)
      | AppError::Pipeline(_)
      | AppError::Db(_)
      | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!("{}", self);
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

impl From<crate::db::DbLockError> for AppError {
  fn from(e: crate::db::DbLockError) -> Self {
    AppError::Pipeline(e.to_string())
  }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_codes() {
    assert_eq!(
      AppError::Validation("missing field".into()).status_code(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(
      AppError::QuotaExceeded { used: 100, limit: 100 }.status_code(),
      StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(
      AppError::Provider("timeout".into()).status_code(),
      StatusCode::BAD_GATEWAY
    );
    assert_eq!(
      AppError::NotConfigured("translation provider").status_code(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }

  #[test]
  fn test_quota_message_includes_usage() {
    let err = AppError::QuotaExceeded { used: 95, limit: 100 };
    assert!(err.to_string().contains("95/100"));
  }
}
