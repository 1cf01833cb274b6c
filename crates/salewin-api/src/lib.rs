//! JSON REST API for the sale-window engine.
//!
//! Exposes an axum [`Router`] backed by a [`SaleEngine`] over any
//! [`CatalogStore`]. Handlers read the clock once per request and pass it
//! down; auth, TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", salewin_api::api_router(engine.clone()))
//! ```

pub mod attribute_values;
pub mod error;
pub mod links;
pub mod reconcile;
pub mod templates;
pub mod variants;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use salewin_core::{RecomputeReport, SaleEngine, store::CatalogStore};
use serde::Serialize;

pub use error::ApiError;

/// An entity together with the side effects its recomputation caused.
#[derive(Debug, Serialize)]
pub struct Recomputed<T> {
  pub item:   T,
  pub report: RecomputeReport,
}

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<SaleEngine<S>>) -> Router<()>
where
  S: CatalogStore + 'static,
{
  Router::new()
    // Attribute values
    .route(
      "/attribute-values",
      get(attribute_values::list::<S>).post(attribute_values::create::<S>),
    )
    .route("/attribute-values/{id}/window", put(attribute_values::update_window::<S>))
    // Templates
    .route("/templates", get(templates::list::<S>).post(templates::create::<S>))
    .route("/templates/{id}", get(templates::get_one::<S>))
    .route("/templates/{id}/publish", post(templates::publish::<S>))
    .route("/templates/{id}/recompute", post(templates::recompute::<S>))
    .route("/templates/{id}/offerable-variants", get(templates::offerable_variants::<S>))
    // Links and variants
    .route("/links", post(links::create::<S>))
    .route("/variants", post(variants::create::<S>))
    .route("/variants/{id}", get(variants::get_one::<S>))
    .route("/variants/{id}/purchasable", get(variants::purchasable::<S>))
    .route("/variants/{id}/combination-info", get(variants::combination_info::<S>))
    // Batch
    .route("/reconcile", post(reconcile::run::<S>))
    .with_state(engine)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
