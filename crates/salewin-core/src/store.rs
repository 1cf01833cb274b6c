//! The `CatalogStore` trait and the unit-of-work types it exchanges with the
//! engine.
//!
//! The trait is implemented by storage backends (e.g. `salewin-store-sqlite`).
//! Through [`CatalogStore::transact`] the engine loads a [`Slice`] of the
//! catalog, recomputes it in memory and writes every derived value back
//! through a single [`ChangeSet`], all inside one write transaction. One
//! triggering mutation is therefore one transaction, and nothing committed
//! concurrently can be overwritten with rows read before it. Side-effect
//! writes (`archived`, `published`, badge binding) are separate primitive
//! calls made after that transaction.

use std::future::Future;

use uuid::Uuid;

use crate::catalog::{AttributeValue, AttributeValueLink, Badge, Template, Variant};

// ─── Unit of work ────────────────────────────────────────────────────────────

/// Everything the derivation pipeline needs to recompute one template.
#[derive(Debug, Clone)]
pub struct TemplateGraph {
  pub template: Template,
  pub links:    Vec<AttributeValueLink>,
  /// The attribute values referenced by `links`.
  pub values:   Vec<AttributeValue>,
  /// In template order.
  pub variants: Vec<Variant>,
}

impl TemplateGraph {
  pub fn value(&self, value_id: Uuid) -> Option<&AttributeValue> {
    self.values.iter().find(|v| v.value_id == value_id)
  }

  pub fn link(&self, link_id: Uuid) -> Option<&AttributeValueLink> {
    self.links.iter().find(|l| l.link_id == link_id)
  }

  pub fn variant(&self, variant_id: Uuid) -> Option<&Variant> {
    self.variants.iter().find(|v| v.variant_id == variant_id)
  }
}

/// What [`CatalogStore::transact`] loads inside its write transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
  /// Templates to load as graphs. Unknown ids are skipped.
  pub templates: Vec<Uuid>,
  /// Attribute values to load in their own right. Unknown ids are skipped.
  pub values:    Vec<Uuid>,
  /// Also load the graph of every template linking one of `values`.
  pub cascade:   bool,
  /// Also load every attribute value no template links.
  pub unlinked:  bool,
}

impl Scope {
  pub fn template(template_id: Uuid) -> Self { Self::templates(vec![template_id]) }

  pub fn templates(template_ids: Vec<Uuid>) -> Self {
    Self { templates: template_ids, ..Self::default() }
  }

  /// An attribute value plus every template offering it.
  pub fn cascade_from(value_id: Uuid) -> Self {
    Self { values: vec![value_id], cascade: true, ..Self::default() }
  }

  pub fn unlinked_values() -> Self { Self { unlinked: true, ..Self::default() } }

  pub fn with_value(mut self, value_id: Uuid) -> Self {
    self.values.push(value_id);
    self
  }
}

/// The rows loaded for a [`Scope`].
#[derive(Debug, Clone, Default)]
pub struct Slice {
  pub graphs: Vec<TemplateGraph>,
  /// Values named by the scope, or unlinked ones. A value may also appear
  /// inside a graph.
  pub values: Vec<AttributeValue>,
}

impl Slice {
  pub fn value(&self, value_id: Uuid) -> Option<&AttributeValue> {
    self.values.iter().find(|v| v.value_id == value_id)
  }
}

/// Rows to write atomically, applied in dependency order: values, value
/// flags, templates, links, variants.
///
/// `values` carries authored rows: a new value, or one whose window is being
/// replaced. `value_flags` rewrites only `is_active` and `label` of existing
/// values. Upserting an existing template, link or variant rewrites only its
/// window and derived columns; `archived`, `published` and the badge binding
/// are never written through a change set once a row exists.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
  pub values:      Vec<AttributeValue>,
  pub value_flags: Vec<AttributeValue>,
  pub templates:   Vec<Template>,
  pub links:       Vec<AttributeValueLink>,
  pub variants:    Vec<Variant>,
}

impl ChangeSet {
  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
      && self.value_flags.is_empty()
      && self.templates.is_empty()
      && self.links.is_empty()
      && self.variants.is_empty()
  }

  /// Queue every derived row of `graph`. Its attribute values contribute
  /// their derived flags only, never their windows.
  pub fn push_graph(&mut self, graph: &TemplateGraph) {
    for value in &graph.values {
      let queued = self
        .values
        .iter()
        .chain(&self.value_flags)
        .any(|v| v.value_id == value.value_id);
      if !queued {
        self.value_flags.push(value.clone());
      }
    }
    self.templates.push(graph.template.clone());
    self.links.extend(graph.links.iter().cloned());
    self.variants.extend(graph.variants.iter().cloned());
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the catalog storage backend.
///
/// All methods return `Send` futures so the trait can be used behind `axum`.
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_attribute_value(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AttributeValue>, Self::Error>> + Send + '_;

  fn list_attribute_values(
    &self,
  ) -> impl Future<Output = Result<Vec<AttributeValue>, Self::Error>> + Send + '_;

  fn get_template(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Template>, Self::Error>> + Send + '_;

  fn list_templates(
    &self,
  ) -> impl Future<Output = Result<Vec<Template>, Self::Error>> + Send + '_;

  fn get_variant(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Variant>, Self::Error>> + Send + '_;

  /// Load a template with all its links, their values and its variants.
  /// Returns `None` if the template does not exist.
  fn load_template_graph(
    &self,
    template_id: Uuid,
  ) -> impl Future<Output = Result<Option<TemplateGraph>, Self::Error>> + Send + '_;

  /// Up to `limit` template ids greater than `after`, in ascending order.
  fn template_ids_page(
    &self,
    after: Option<Uuid>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  // ── Derived writes ────────────────────────────────────────────────────

  /// Apply `changes` in a single transaction.
  fn commit(
    &self,
    changes: ChangeSet,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Load `scope`, hand it to `update` and commit the change set `update`
  /// returns, all in one write transaction that excludes other writers.
  /// Resolves to the second half of `update`'s result.
  fn transact<F, T>(
    &self,
    scope: Scope,
    update: F,
  ) -> impl Future<Output = Result<T, Self::Error>> + Send + '_
  where
    F: FnOnce(&mut Slice) -> (ChangeSet, T) + Send + 'static,
    T: Send + 'static;

  // ── Side-effect writes ────────────────────────────────────────────────

  fn set_variant_archived(
    &self,
    variant_id: Uuid,
    archived: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn set_template_published(
    &self,
    template_id: Uuid,
    published: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Return the badge labelled `label`, creating it in the sale-period style
  /// if absent. Must be safe to call concurrently for the same label.
  fn badge_for_label<'a>(
    &'a self,
    label: &'a str,
  ) -> impl Future<Output = Result<Badge, Self::Error>> + Send + 'a;

  fn bind_badge(
    &self,
    variant_id: Uuid,
    badge_id: Option<Uuid>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
