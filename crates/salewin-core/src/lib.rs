//! Core types and the propagation engine for product sale windows.
//!
//! A sale window is authored on attribute values and aggregated upward:
//! attribute value → template link → variant → template. This crate holds the
//! pure derivations for each level, the side-effect planning that follows a
//! derived flag, the [`store::CatalogStore`] abstraction and the
//! [`engine::SaleEngine`] that drives them. It has no HTTP or database
//! dependencies.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod derive;
pub mod effects;
pub mod engine;
pub mod error;
pub mod store;
pub mod storefront;
pub mod window;

pub use config::EngineConfig;
pub use engine::{ReconcileSummary, RecomputeReport, SaleEngine};
pub use error::{Error, Result};
pub use window::{SaleWindow, window_active};
