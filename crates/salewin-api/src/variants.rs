//! Handlers for `/variants` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/variants` | Body: `{"template_id","link_ids":[...]}`; one link per attribute |
//! | `GET`  | `/variants/{id}` | 404 if not found |
//! | `GET`  | `/variants/{id}/purchasable` | Optional `?upstream=false` to fold in a failed upstream check |
//! | `GET`  | `/variants/{id}/combination-info` | `null` for archived variants |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use salewin_core::{
  SaleEngine,
  catalog::{NewVariant, Variant},
  store::CatalogStore,
  storefront::CombinationInfo,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Recomputed, error::ApiError};

/// `POST /variants` returns 201 + the variant after its first recompute.
pub async fn create<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
  Json(body): Json<NewVariant>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CatalogStore + 'static,
{
  let (variant, report) = engine.add_variant(body, Utc::now()).await?;
  Ok((StatusCode::CREATED, Json(Recomputed { item: variant, report })))
}

/// `GET /variants/{id}`
pub async fn get_one<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Variant>, ApiError>
where
  S: CatalogStore + 'static,
{
  let variant = engine
    .store()
    .get_variant(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("variant {id} not found")))?;
  Ok(Json(variant))
}

// ─── Purchasable ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PurchasableParams {
  /// Verdict of every other eligibility check. Defaults to `true`.
  #[serde(default = "default_upstream")]
  pub upstream: bool,
}

fn default_upstream() -> bool { true }

#[derive(Debug, Serialize)]
pub struct Purchasable {
  pub variant_id:  Uuid,
  pub purchasable: bool,
}

/// `GET /variants/{id}/purchasable[?upstream=false]`
pub async fn purchasable<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
  Path(id): Path<Uuid>,
  Query(params): Query<PurchasableParams>,
) -> Result<Json<Purchasable>, ApiError>
where
  S: CatalogStore + 'static,
{
  let purchasable = engine.is_purchasable(id, params.upstream).await?;
  Ok(Json(Purchasable { variant_id: id, purchasable }))
}

/// `GET /variants/{id}/combination-info`
pub async fn combination_info<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Option<CombinationInfo>>, ApiError>
where
  S: CatalogStore + 'static,
{
  Ok(Json(engine.combination_display_info(id).await?))
}
