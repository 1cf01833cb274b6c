//! Planning the writes that a derived flag causes.
//!
//! Planning is kept apart from derivation: [`crate::derive`] says what is
//! true, this module decides which writes follow from it. Two kinds of
//! planning exist:
//!
//! - *edge-triggered* (`plan_*`): archive/reactivate and unpublish fire only
//!   when the flag changed in this pass and the persisted state differs from
//!   the target;
//! - *corrective* (`correct_*`): used by reconciliation, compares the derived
//!   flag with the persisted state regardless of history.
//!
//! Badge planning is always level-based; binding the same badge twice is a
//! no-op, so it needs no edge.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  catalog::{Template, Variant},
  derive::{Derived, Transitions},
  store::TemplateGraph,
};

// ─── Effects ─────────────────────────────────────────────────────────────────

/// A write outside the derivation graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffect {
  ArchiveVariant { variant_id: Uuid },
  ReactivateVariant { variant_id: Uuid },
  UnpublishTemplate { template_id: Uuid },
  BindBadge { variant_id: Uuid, label: String },
  ClearBadge { variant_id: Uuid },
}

impl SideEffect {
  /// Id of the entity the effect writes to, for logging.
  pub fn entity_id(&self) -> Uuid {
    match self {
      Self::ArchiveVariant { variant_id }
      | Self::ReactivateVariant { variant_id }
      | Self::BindBadge { variant_id, .. }
      | Self::ClearBadge { variant_id } => *variant_id,
      Self::UnpublishTemplate { template_id } => *template_id,
    }
  }
}

/// Whether a recomputation pass may plan edge-triggered effects.
///
/// Reconciliation recomputes with effects `Suppressed` and then corrects state
/// explicitly, so its recomputation never re-enters the edge-triggered path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectMode {
  EdgeTriggered,
  Suppressed,
}

/// How variants get their sale-period badge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeMode {
  /// Never touch badges.
  Off,
  /// Keep the badge in sync: bound while active with an end date, cleared
  /// otherwise.
  #[default]
  Automatic,
  /// Only fill an empty slot; an existing badge is never replaced or cleared.
  ManualOverride,
}

// ─── Edge-triggered ──────────────────────────────────────────────────────────

pub fn plan_archive(
  variant: &Variant,
  active: Derived<bool>,
  mode: EffectMode,
) -> Option<SideEffect> {
  if mode == EffectMode::Suppressed || !active.changed {
    return None;
  }
  archive_target(variant, active.value)
}

pub fn plan_unpublish(
  template: &Template,
  active: Derived<bool>,
  mode: EffectMode,
) -> Option<SideEffect> {
  if mode == EffectMode::Suppressed || !active.changed {
    return None;
  }
  unpublish_target(template)
}

// ─── Corrective ──────────────────────────────────────────────────────────────

pub fn correct_archive(variant: &Variant) -> Option<SideEffect> {
  archive_target(variant, variant.is_active)
}

pub fn correct_publish(template: &Template) -> Option<SideEffect> {
  unpublish_target(template)
}

fn archive_target(variant: &Variant, active: bool) -> Option<SideEffect> {
  let variant_id = variant.variant_id;
  match (active, variant.archived) {
    (false, false) => Some(SideEffect::ArchiveVariant { variant_id }),
    (true, true) => Some(SideEffect::ReactivateVariant { variant_id }),
    _ => None,
  }
}

fn unpublish_target(template: &Template) -> Option<SideEffect> {
  (!template.is_active && template.published).then_some(SideEffect::UnpublishTemplate {
    template_id: template.template_id,
  })
}

// ─── Badges ──────────────────────────────────────────────────────────────────

pub fn plan_badge(variant: &Variant, mode: BadgeMode) -> Option<SideEffect> {
  let variant_id = variant.variant_id;
  let wanted = (variant.is_active && variant.window.end.is_some())
    .then(|| variant.label.clone());
  let current = variant.badge.as_ref().map(|b| b.label.as_str());

  match mode {
    BadgeMode::Off => None,
    BadgeMode::Automatic => match (wanted, current) {
      (Some(label), Some(bound)) if label == bound => None,
      (Some(label), _) => Some(SideEffect::BindBadge { variant_id, label }),
      (None, Some(_)) => Some(SideEffect::ClearBadge { variant_id }),
      (None, None) => None,
    },
    BadgeMode::ManualOverride => match (wanted, current) {
      (Some(label), None) => Some(SideEffect::BindBadge { variant_id, label }),
      _ => None,
    },
  }
}

// ─── Whole graph ─────────────────────────────────────────────────────────────

/// Effects following one recomputation pass of `graph`.
pub fn plan_graph(
  graph: &TemplateGraph,
  transitions: &Transitions,
  badge_mode: BadgeMode,
  mode: EffectMode,
) -> Vec<SideEffect> {
  let mut effects = Vec::new();
  if mode == EffectMode::Suppressed {
    return effects;
  }

  for (variant_id, active) in &transitions.variants {
    let Some(variant) = graph.variant(*variant_id) else {
      continue;
    };
    effects.extend(plan_archive(variant, *active, mode));
    effects.extend(plan_badge(variant, badge_mode));
  }
  effects.extend(plan_unpublish(&graph.template, transitions.template, mode));
  effects
}

/// Corrections for `graph` as seen by reconciliation.
pub fn correct_graph(graph: &TemplateGraph, badge_mode: BadgeMode) -> Vec<SideEffect> {
  let mut effects = Vec::new();
  for variant in &graph.variants {
    effects.extend(correct_archive(variant));
    effects.extend(plan_badge(variant, badge_mode));
  }
  effects.extend(correct_publish(&graph.template));
  effects
}
