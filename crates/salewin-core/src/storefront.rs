//! What the storefront and checkout layers see of sale windows.

use serde::{Deserialize, Serialize};

use crate::catalog::Variant;

/// Sale-period fields merged into a variant's combination payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationInfo {
  pub is_active: bool,
  pub label:     String,
}

/// A variant the surrounding catalog still offers at all. Archived variants
/// are not, whatever their sale window says.
pub fn is_usable(variant: &Variant) -> bool { !variant.archived }

/// Variants a shopper may pick: usable and inside their sale window.
pub fn offerable<'a, I>(variants: I) -> Vec<&'a Variant>
where
  I: IntoIterator<Item = &'a Variant>,
{
  variants
    .into_iter()
    .filter(|v| is_usable(v) && v.is_active)
    .collect()
}

/// Fold the sale window into an eligibility verdict computed elsewhere
/// (stock, pricing). The window can only block, never grant.
pub fn purchase_allowed(variant: &Variant, upstream: bool) -> bool {
  upstream && is_usable(variant) && variant.is_active
}

/// `None` for unusable variants so their sale text never reaches the page.
pub fn combination_info(variant: &Variant) -> Option<CombinationInfo> {
  is_usable(variant).then(|| CombinationInfo {
    is_active: variant.is_active,
    label:     variant.label.clone(),
  })
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;
  use crate::window::SaleWindow;

  fn variant(is_active: bool, archived: bool) -> Variant {
    Variant {
      variant_id: Uuid::new_v4(),
      template_id: Uuid::nil(),
      link_ids: vec![],
      window: SaleWindow::OPEN,
      is_active,
      label: "Until 1st Aug".into(),
      archived,
      badge: None,
    }
  }

  #[test]
  fn offerable_keeps_active_usable_variants() {
    let all = vec![variant(true, false), variant(false, false), variant(true, true)];
    let picked = offerable(&all);
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].variant_id, all[0].variant_id);
  }

  #[test]
  fn window_composes_with_upstream_checks() {
    let live = variant(true, false);
    assert!(purchase_allowed(&live, true));
    assert!(!purchase_allowed(&live, false));
    assert!(!purchase_allowed(&variant(false, false), true));
  }

  #[test]
  fn archived_variants_leak_nothing() {
    assert_eq!(combination_info(&variant(true, true)), None);
    let info = combination_info(&variant(false, false)).unwrap();
    assert!(!info.is_active);
    assert_eq!(info.label, "Until 1st Aug");
  }
}
