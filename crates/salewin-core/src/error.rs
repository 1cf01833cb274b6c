//! Error types for `salewin-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// Both bounds of a sale window are set and the start is not strictly
  /// before the end. The message is shown verbatim to catalog managers.
  #[error("Sale start date must be before sale end date for attribute value {name}.")]
  InvalidRange { name: String },

  #[error("attribute value not found: {0}")]
  AttributeValueNotFound(Uuid),

  #[error("template not found: {0}")]
  TemplateNotFound(Uuid),

  #[error("variant not found: {0}")]
  VariantNotFound(Uuid),

  #[error("link not found: {0}")]
  LinkNotFound(Uuid),

  #[error("template {template_id} already offers attribute value {value_id}")]
  DuplicateLink { template_id: Uuid, value_id: Uuid },

  #[error("variant has more than one value for attribute {0:?}")]
  DuplicateDimension(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// `true` for errors the user can fix by correcting their input.
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Self::InvalidRange { .. }
        | Self::DuplicateLink { .. }
        | Self::DuplicateDimension(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
