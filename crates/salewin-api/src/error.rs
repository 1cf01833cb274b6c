//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Malformed requests never reach a handler: axum's extractors reject them
//! with `400 Bad Request` on their own.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  /// Well-formed input the catalog refuses, e.g. an inverted sale window.
  #[error("{0}")]
  Validation(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<salewin_core::Error> for ApiError {
  fn from(e: salewin_core::Error) -> Self {
    use salewin_core::Error as E;
    match e {
      E::AttributeValueNotFound(_)
      | E::TemplateNotFound(_)
      | E::VariantNotFound(_)
      | E::LinkNotFound(_) => ApiError::NotFound(e.to_string()),
      E::InvalidRange { .. } | E::DuplicateLink { .. } | E::DuplicateDimension(_) => {
        ApiError::Validation(e.to_string())
      }
      E::Store(inner) => ApiError::Store(inner),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Validation(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  #[test]
  fn core_errors_map_to_statuses() {
    let cases = [
      (salewin_core::Error::TemplateNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
      (
        salewin_core::Error::InvalidRange { name: "Early Adopter".into() },
        StatusCode::UNPROCESSABLE_ENTITY,
      ),
      (salewin_core::Error::DuplicateDimension("Size".into()), StatusCode::UNPROCESSABLE_ENTITY),
      (
        salewin_core::Error::DuplicateLink { template_id: Uuid::nil(), value_id: Uuid::nil() },
        StatusCode::UNPROCESSABLE_ENTITY,
      ),
      (salewin_core::Error::LinkNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
      (salewin_core::Error::store(std::io::Error::other("disk full")), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }
}
