//! Handler for `POST /reconcile`.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::Utc;
use salewin_core::{ReconcileSummary, SaleEngine, store::CatalogStore};

use crate::error::ApiError;

/// `POST /reconcile`: sweep the whole catalog at the current time.
pub async fn run<S>(
  State(engine): State<Arc<SaleEngine<S>>>,
) -> Result<Json<ReconcileSummary>, ApiError>
where
  S: CatalogStore + 'static,
{
  Ok(Json(engine.reconcile(Utc::now()).await?))
}
