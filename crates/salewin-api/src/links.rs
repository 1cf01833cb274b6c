//! Handler for `POST /links`: offer an attribute value on a template.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use salewin_core::{SaleEngine, catalog::NewLink, store::CatalogStore};

use crate::{Recomputed, error::ApiError};

/// `POST /links`, body: `{"template_id","value_id","configured_visible"}`.
///
/// 422 if the template already offers the value.
pub async fn create<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
  Json(body): Json<NewLink>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CatalogStore + 'static,
{
  let (link, report) = engine.add_link(body, Utc::now()).await?;
  Ok((StatusCode::CREATED, Json(Recomputed { item: link, report })))
}
