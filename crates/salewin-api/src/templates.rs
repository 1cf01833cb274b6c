//! Handlers for `/templates` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/templates` | All templates, by name |
//! | `POST` | `/templates` | Body: `{"name":"...","published":true}` |
//! | `GET`  | `/templates/{id}` | 404 if not found |
//! | `POST` | `/templates/{id}/publish` | Manual re-publish; never done automatically |
//! | `POST` | `/templates/{id}/recompute` | Re-derive at the current time |
//! | `GET`  | `/templates/{id}/offerable-variants` | Usable variants inside their window |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use salewin_core::{
  RecomputeReport, SaleEngine,
  catalog::{NewTemplate, Template, Variant},
  store::CatalogStore,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /templates`
pub async fn list<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
) -> Result<Json<Vec<Template>>, ApiError>
where
  S: CatalogStore + 'static,
{
  let templates = engine
    .store()
    .list_templates()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(templates))
}

/// `POST /templates` returns 201 + the stored template.
pub async fn create<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
  Json(body): Json<NewTemplate>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CatalogStore + 'static,
{
  let template = engine.create_template(body, Utc::now()).await?;
  Ok((StatusCode::CREATED, Json(template)))
}

/// `GET /templates/{id}`
pub async fn get_one<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Template>, ApiError>
where
  S: CatalogStore + 'static,
{
  let template = engine
    .store()
    .get_template(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("template {id} not found")))?;
  Ok(Json(template))
}

/// `POST /templates/{id}/publish`
pub async fn publish<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Template>, ApiError>
where
  S: CatalogStore + 'static,
{
  Ok(Json(engine.republish_template(id).await?))
}

/// `POST /templates/{id}/recompute`
pub async fn recompute<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RecomputeReport>, ApiError>
where
  S: CatalogStore + 'static,
{
  Ok(Json(engine.recompute_template(id, Utc::now()).await?))
}

/// `GET /templates/{id}/offerable-variants`
pub async fn offerable_variants<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Variant>>, ApiError>
where
  S: CatalogStore + 'static,
{
  Ok(Json(engine.list_offerable_variants(id).await?))
}
