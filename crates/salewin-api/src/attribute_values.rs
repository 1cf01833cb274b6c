//! Handlers for `/attribute-values` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/attribute-values` | All values, by attribute then name |
//! | `POST` | `/attribute-values` | Body: `{"attribute","name","sale_start","sale_end"}`; 422 on an inverted window |
//! | `PUT`  | `/attribute-values/{id}/window` | Body: `{"sale_start","sale_end"}`; cascades to every linked template |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use salewin_core::{
  SaleEngine, SaleWindow,
  catalog::{AttributeValue, NewAttributeValue},
  store::CatalogStore,
};
use uuid::Uuid;

use crate::{Recomputed, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /attribute-values`
pub async fn list<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
) -> Result<Json<Vec<AttributeValue>>, ApiError>
where
  S: CatalogStore + 'static,
{
  let values = engine
    .store()
    .list_attribute_values()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(values))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /attribute-values` returns 201 + the stored value.
pub async fn create<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
  Json(body): Json<NewAttributeValue>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CatalogStore + 'static,
{
  let value = engine.create_attribute_value(body, Utc::now()).await?;
  Ok((StatusCode::CREATED, Json(value)))
}

// ─── Update window ────────────────────────────────────────────────────────────

/// `PUT /attribute-values/{id}/window`
pub async fn update_window<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
  Path(id): Path<Uuid>,
  Json(window): Json<SaleWindow>,
) -> Result<Json<Recomputed<AttributeValue>>, ApiError>
where
  S: CatalogStore + 'static,
{
  let (value, report) = engine
    .update_attribute_value_window(id, window, Utc::now())
    .await?;
  Ok(Json(Recomputed { item: value, report }))
}
