//! Catalog entities touched by the sale-window engine.
//!
//! Fields are grouped into *authored* (entered by a catalog manager),
//! *derived* (recomputed by the pipeline in [`crate::derive`]) and
//! *side-effected* (`archived`, `published`, `badge`), which only change as a
//! reaction to a derived flag and may be overridden by hand.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::window::SaleWindow;

// ─── Attribute value ─────────────────────────────────────────────────────────

/// A selectable value of a product attribute, e.g. "Early Adopter" for the
/// attribute "Release". Shared across templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
  pub value_id:  Uuid,
  /// Name of the attribute this value belongs to (the variant dimension).
  pub attribute: String,
  pub name:      String,
  #[serde(flatten)]
  pub window:    SaleWindow,
  pub is_active: bool,
  pub label:     String,
}

/// Input to [`crate::engine::SaleEngine::create_attribute_value`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewAttributeValue {
  pub attribute: String,
  pub name:      String,
  #[serde(flatten)]
  pub window:    SaleWindow,
}

// ─── Template link ───────────────────────────────────────────────────────────

/// The per-template join between a template and an attribute value it offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValueLink {
  pub link_id:            Uuid,
  pub template_id:        Uuid,
  /// `None` once the underlying value has been removed from the catalog.
  pub value_id:           Option<Uuid>,
  /// Visibility as configured by an administrator.
  pub configured_visible: bool,
  /// Mirrored verbatim from the attribute value.
  #[serde(flatten)]
  pub window:             SaleWindow,
  pub is_active:          bool,
  pub label:              String,
  /// The flag the configurator reads.
  pub effective_visible:  bool,
}

/// Input to [`crate::engine::SaleEngine::add_link`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewLink {
  pub template_id:        Uuid,
  pub value_id:           Uuid,
  #[serde(default = "default_true")]
  pub configured_visible: bool,
}

// ─── Variant ─────────────────────────────────────────────────────────────────

/// One concrete attribute-value combination of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
  pub variant_id:  Uuid,
  pub template_id: Uuid,
  /// One link per attribute dimension.
  pub link_ids:    Vec<Uuid>,
  #[serde(flatten)]
  pub window:      SaleWindow,
  pub is_active:   bool,
  pub label:       String,
  pub archived:    bool,
  pub badge:       Option<Badge>,
}

/// Input to [`crate::engine::SaleEngine::add_variant`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewVariant {
  pub template_id: Uuid,
  pub link_ids:    Vec<Uuid>,
}

// ─── Template ────────────────────────────────────────────────────────────────

/// A product; the root of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
  pub template_id: Uuid,
  pub name:        String,
  #[serde(flatten)]
  pub window:      SaleWindow,
  pub is_active:   bool,
  pub label:       String,
  pub published:   bool,
}

/// Input to [`crate::engine::SaleEngine::create_template`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewTemplate {
  pub name:      String,
  #[serde(default = "default_true")]
  pub published: bool,
}

// ─── Badge ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgePosition {
  Left,
  Right,
}

/// A shared display label ("ribbon"), unique by `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
  pub badge_id:   Uuid,
  pub label:      String,
  pub bg_color:   String,
  pub text_color: String,
  pub position:   BadgePosition,
}

impl Badge {
  pub const BG_COLOR: &'static str = "#17a2b8";
  pub const TEXT_COLOR: &'static str = "#ffffff";

  /// A badge for `label` in the fixed sale-period style.
  pub fn sale_period(label: impl Into<String>) -> Self {
    Self {
      badge_id:   Uuid::new_v4(),
      label:      label.into(),
      bg_color:   Self::BG_COLOR.to_owned(),
      text_color: Self::TEXT_COLOR.to_owned(),
      position:   BadgePosition::Right,
    }
  }
}

fn default_true() -> bool { true }
