//! Error type for `salewin-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {column} value: {value:?}")]
  UnknownEnum { column: &'static str, value: String },

  #[error("variant not found: {0}")]
  VariantNotFound(uuid::Uuid),

  #[error("template not found: {0}")]
  TemplateNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
