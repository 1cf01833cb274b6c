//! The derivation pipeline: value → link → variant → template.
//!
//! Every function here is pure apart from mutating the record it is given,
//! takes `now` explicitly, and never plans a side effect. Flag derivations
//! return a [`Derived`] so the caller can tell an edge from a level.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  aggregate::{aggregate, aggregate_template},
  catalog::{AttributeValue, AttributeValueLink, Template, Variant},
  config::EngineConfig,
  store::TemplateGraph,
  window::SaleWindow,
};

/// A freshly derived value and whether it differs from the one it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Derived<T> {
  pub value:   T,
  pub changed: bool,
}

impl<T: PartialEq> Derived<T> {
  pub fn compare(previous: &T, value: T) -> Self {
    let changed = *previous != value;
    Self { value, changed }
  }
}

// ─── Per-level derivations ───────────────────────────────────────────────────

pub fn derive_value(value: &mut AttributeValue, now: DateTime<Utc>) {
  value.is_active = value.window.is_active(now);
  value.label = value.window.label();
}

/// Copy the source window onto the link verbatim; no source means no window.
pub fn mirror(link: &mut AttributeValueLink, source: Option<&AttributeValue>) {
  link.window = source.map(|v| v.window).unwrap_or(SaleWindow::OPEN);
}

pub fn derive_link(
  link: &mut AttributeValueLink,
  fold_visibility: bool,
  now: DateTime<Utc>,
) {
  link.is_active = link.window.is_active(now);
  link.label = link.window.label();
  link.effective_visible = if fold_visibility {
    link.configured_visible && link.is_active
  } else {
    link.configured_visible
  };
}

pub fn derive_variant<I>(
  variant: &mut Variant,
  link_windows: I,
  config: &EngineConfig,
  now: DateTime<Utc>,
) -> Derived<bool>
where
  I: IntoIterator<Item = SaleWindow>,
{
  variant.window = aggregate(link_windows, config.variant_policy);
  variant.label = variant.window.label();
  let active = Derived::compare(&variant.is_active, variant.window.is_active(now));
  variant.is_active = active.value;
  active
}

pub fn derive_template<I>(
  template: &mut Template,
  variant_windows: I,
  now: DateTime<Utc>,
) -> Derived<bool>
where
  I: IntoIterator<Item = SaleWindow>,
{
  template.window = aggregate_template(variant_windows);
  template.label = template.window.label();
  let active = Derived::compare(&template.is_active, template.window.is_active(now));
  template.is_active = active.value;
  active
}

// ─── Whole graph ─────────────────────────────────────────────────────────────

/// Flag transitions produced by one pass of [`recompute_graph`].
#[derive(Debug, Clone)]
pub struct Transitions {
  /// One entry per variant, in graph order.
  pub variants: Vec<(Uuid, Derived<bool>)>,
  pub template: Derived<bool>,
}

/// Recompute every derived field of `graph` in dependency order.
pub fn recompute_graph(
  graph: &mut TemplateGraph,
  config: &EngineConfig,
  now: DateTime<Utc>,
) -> Transitions {
  for value in &mut graph.values {
    derive_value(value, now);
  }

  for link in &mut graph.links {
    let source = link
      .value_id
      .and_then(|id| graph.values.iter().find(|v| v.value_id == id));
    mirror(link, source);
    derive_link(link, config.fold_visibility, now);
  }

  let links = &graph.links;
  let variants = graph
    .variants
    .iter_mut()
    .map(|variant| {
      let windows: Vec<SaleWindow> = variant
        .link_ids
        .iter()
        .filter_map(|id| links.iter().find(|l| l.link_id == *id))
        .map(|l| l.window)
        .collect();
      let active = derive_variant(variant, windows, config, now);
      (variant.variant_id, active)
    })
    .collect();

  let template = derive_template(
    &mut graph.template,
    graph.variants.iter().map(|v| v.window),
    now,
  );

  Transitions { variants, template }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;
  use crate::aggregate::AggregationPolicy;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap() }

  fn days(n: i64) -> Option<DateTime<Utc>> { Some(now() + Duration::days(n)) }

  fn value(attribute: &str, name: &str, window: SaleWindow) -> AttributeValue {
    AttributeValue {
      value_id: Uuid::new_v4(),
      attribute: attribute.into(),
      name: name.into(),
      window,
      is_active: true,
      label: String::new(),
    }
  }

  fn link(template_id: Uuid, value: &AttributeValue) -> AttributeValueLink {
    AttributeValueLink {
      link_id: Uuid::new_v4(),
      template_id,
      value_id: Some(value.value_id),
      configured_visible: true,
      window: SaleWindow::OPEN,
      is_active: true,
      label: String::new(),
      effective_visible: true,
    }
  }

  fn variant(template_id: Uuid, link_ids: Vec<Uuid>) -> Variant {
    Variant {
      variant_id: Uuid::new_v4(),
      template_id,
      link_ids,
      window: SaleWindow::OPEN,
      is_active: true,
      label: String::new(),
      archived: false,
      badge: None,
    }
  }

  /// Early Adopter (-30d..+30d) and Standard (+7d..+60d) on "Release", plus
  /// Small (-10d..+10d) on "Size". Variants: [EA], [Std], [EA, Small].
  fn graph() -> TemplateGraph {
    let template_id = Uuid::new_v4();
    let early = value("Release", "Early Adopter", SaleWindow::new(days(-30), days(30)));
    let standard = value("Release", "Standard", SaleWindow::new(days(7), days(60)));
    let small = value("Size", "Small", SaleWindow::new(days(-10), days(10)));
    let links = vec![link(template_id, &early), link(template_id, &standard), link(template_id, &small)];
    let variants = vec![
      variant(template_id, vec![links[0].link_id]),
      variant(template_id, vec![links[1].link_id]),
      variant(template_id, vec![links[0].link_id, links[2].link_id]),
    ];
    TemplateGraph {
      template: Template {
        template_id,
        name: "VIP Ticket".into(),
        window: SaleWindow::OPEN,
        is_active: true,
        label: String::new(),
        published: true,
      },
      links,
      values: vec![early, standard, small],
      variants,
    }
  }

  #[test]
  fn values_and_links_follow_their_window() {
    let mut g = graph();
    recompute_graph(&mut g, &EngineConfig::default(), now());

    assert!(g.values[0].is_active);
    assert!(!g.values[1].is_active);
    assert_eq!(g.links[1].window, g.values[1].window);
    assert!(!g.links[1].is_active);
    assert!(!g.links[1].effective_visible);
    assert_eq!(g.links[0].label, "Until 31st Jul");
  }

  #[test]
  fn visibility_is_left_alone_without_folding() {
    let mut g = graph();
    let config = EngineConfig { fold_visibility: false, ..EngineConfig::default() };
    recompute_graph(&mut g, &config, now());
    assert!(!g.links[1].is_active);
    assert!(g.links[1].effective_visible);
  }

  #[test]
  fn administrator_hidden_link_stays_hidden() {
    let mut g = graph();
    g.links[0].configured_visible = false;
    recompute_graph(&mut g, &EngineConfig::default(), now());
    assert!(g.links[0].is_active);
    assert!(!g.links[0].effective_visible);
  }

  #[test]
  fn link_without_value_is_open() {
    let mut g = graph();
    g.links[1].value_id = None;
    recompute_graph(&mut g, &EngineConfig::default(), now());
    assert!(g.links[1].window.is_open());
    assert!(g.links[1].is_active);
    assert_eq!(g.links[1].label, "");
  }

  #[test]
  fn variants_aggregate_most_restrictively_by_default() {
    let mut g = graph();
    let t = recompute_graph(&mut g, &EngineConfig::default(), now());

    let combined = &g.variants[2];
    assert_eq!(combined.window, SaleWindow::new(days(-10), days(10)));
    assert!(combined.is_active);

    assert!(!g.variants[1].is_active);
    assert_eq!(t.variants[1].1, Derived { value: false, changed: true });
    assert_eq!(t.variants[0].1, Derived { value: true, changed: false });
  }

  #[test]
  fn least_restrictive_variant_policy() {
    let mut g = graph();
    let config = EngineConfig {
      variant_policy: AggregationPolicy::LeastRestrictive,
      ..EngineConfig::default()
    };
    recompute_graph(&mut g, &config, now());
    assert_eq!(g.variants[2].window, SaleWindow::new(days(-30), days(30)));
  }

  #[test]
  fn variant_without_links_is_open() {
    let mut g = graph();
    g.variants[0].link_ids.clear();
    recompute_graph(&mut g, &EngineConfig::default(), now());
    assert!(g.variants[0].window.is_open());
    assert!(g.variants[0].is_active);
  }

  #[test]
  fn template_spans_all_variants() {
    let mut g = graph();
    g.variants[2].archived = true;
    let t = recompute_graph(&mut g, &EngineConfig::default(), now());
    assert_eq!(g.template.window, SaleWindow::new(days(-30), days(60)));
    assert!(g.template.is_active);
    assert!(!t.template.changed);
    assert!(g.template.published);
  }

  #[test]
  fn second_pass_reports_no_changes() {
    let mut g = graph();
    let config = EngineConfig::default();
    recompute_graph(&mut g, &config, now());
    let t = recompute_graph(&mut g, &config, now());
    assert!(t.variants.iter().all(|(_, d)| !d.changed));
    assert!(!t.template.changed);
  }
}
