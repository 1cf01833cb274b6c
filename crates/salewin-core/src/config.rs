//! Engine configuration.
//!
//! Every field has a default so an empty `[engine]` table (or none at all) is
//! a valid configuration.

use serde::{Deserialize, Serialize};

use crate::{aggregate::AggregationPolicy, effects::BadgeMode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// How a variant combines its link windows.
  pub variant_policy:       AggregationPolicy,
  pub badge_mode:           BadgeMode,
  /// Fold the sale-window flag into each link's visibility.
  pub fold_visibility:      bool,
  /// Templates per committed chunk during reconciliation.
  pub reconcile_chunk_size: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      variant_policy:       AggregationPolicy::MostRestrictive,
      badge_mode:           BadgeMode::Automatic,
      fold_visibility:      true,
      reconcile_chunk_size: 50,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_config_uses_defaults() {
    let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(cfg, EngineConfig::default());
  }

  #[test]
  fn overrides_parse_in_snake_case() {
    let cfg: EngineConfig = serde_json::from_str(
      r#"{"variant_policy":"least_restrictive","badge_mode":"manual_override"}"#,
    )
    .unwrap();
    assert_eq!(cfg.variant_policy, AggregationPolicy::LeastRestrictive);
    assert_eq!(cfg.badge_mode, BadgeMode::ManualOverride);
    assert!(cfg.fold_visibility);
  }
}
