//! [`SaleEngine`]: the mutation path and batch sweep over a [`CatalogStore`].
//!
//! Every mutation follows the same sequence:
//!
//! 1. load the affected [`TemplateGraph`]s and apply the authored change in
//!    memory;
//! 2. run [`recompute_graph`] on each (value → link → variant → template);
//! 3. commit every derived row in one [`ChangeSet`];
//! 4. plan side effects from the flag transitions and apply them one by one,
//!    logging and skipping failures.
//!
//! Steps 1-3 run inside a single [`CatalogStore::transact`], so a
//! recomputation always derives from rows no other writer can change before
//! it commits. Step 4 runs after the commit, so a failing archive or badge
//! write can never undo a derived flag, and writing `archived` never feeds
//! back into a recomputation.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::{
    AttributeValue, AttributeValueLink, NewAttributeValue, NewLink, NewTemplate,
    NewVariant, Template, Variant,
  },
  config::EngineConfig,
  derive::{derive_template, derive_value, recompute_graph},
  effects::{EffectMode, SideEffect, correct_graph, plan_graph},
  store::{CatalogStore, ChangeSet, Scope, Slice, TemplateGraph},
  storefront::{self, CombinationInfo},
  window::SaleWindow,
};

// ─── Reports ─────────────────────────────────────────────────────────────────

/// What a recomputation did beyond updating derived fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeReport {
  pub templates: usize,
  pub applied:   Vec<SideEffect>,
  pub failed:    Vec<SideEffect>,
}

impl RecomputeReport {
  /// Applied effects of one kind, e.g. archives.
  pub fn count(&self, pred: impl Fn(&SideEffect) -> bool) -> usize {
    self.applied.iter().filter(|e| pred(e)).count()
  }
}

/// Outcome of [`SaleEngine::reconcile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
  pub archived:    usize,
  pub reactivated: usize,
  pub unpublished: usize,
  /// Items skipped because a read, commit or write failed.
  pub failed:      usize,
}

impl ReconcileSummary {
  fn record(&mut self, effect: &SideEffect) {
    match effect {
      SideEffect::ArchiveVariant { .. } => self.archived += 1,
      SideEffect::ReactivateVariant { .. } => self.reactivated += 1,
      SideEffect::UnpublishTemplate { .. } => self.unpublished += 1,
      SideEffect::BindBadge { .. } | SideEffect::ClearBadge { .. } => {}
    }
  }
}

/// What one transactional recomputation produced.
struct Pass<T> {
  /// Returned by the authored edit.
  edited:  T,
  /// The graphs as derived and committed.
  graphs:  Vec<TemplateGraph>,
  planned: Vec<SideEffect>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The sale-window engine. Cloning is cheap; the store is shared.
pub struct SaleEngine<S> {
  store:  Arc<S>,
  config: EngineConfig,
}

impl<S> Clone for SaleEngine<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), config: self.config.clone() }
  }
}

impl<S: CatalogStore> SaleEngine<S> {
  pub fn new(store: Arc<S>, config: EngineConfig) -> Self { Self { store, config } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  // ── Authoring ─────────────────────────────────────────────────────────

  /// Validate and persist a new attribute value.
  pub async fn create_attribute_value(
    &self,
    input: NewAttributeValue,
    now: DateTime<Utc>,
  ) -> Result<AttributeValue> {
    let window = input.window.at_micros();
    window.validate(&input.name)?;

    let mut value = AttributeValue {
      value_id: Uuid::new_v4(),
      attribute: input.attribute,
      name: input.name,
      window,
      is_active: true,
      label: String::new(),
    };
    derive_value(&mut value, now);

    let changes = ChangeSet { values: vec![value.clone()], ..ChangeSet::default() };
    self.store.commit(changes).await.map_err(Error::store)?;
    Ok(value)
  }

  /// Replace the sale window of an attribute value and cascade the change
  /// through every template offering it, in one commit.
  pub async fn update_attribute_value_window(
    &self,
    value_id: Uuid,
    window: SaleWindow,
    now: DateTime<Utc>,
  ) -> Result<(AttributeValue, RecomputeReport)> {
    let window = window.at_micros();

    let pass = self
      .recompute_scope(
        Scope::cascade_from(value_id),
        now,
        EffectMode::EdgeTriggered,
        move |slice, changes| {
          let mut value = slice
            .value(value_id)
            .cloned()
            .ok_or(Error::AttributeValueNotFound(value_id))?;
          window.validate(&value.name)?;
          value.window = window;
          derive_value(&mut value, now);
          changes.values.push(value.clone());

          for graph in &mut slice.graphs {
            for v in graph.values.iter_mut().filter(|v| v.value_id == value_id) {
              v.window = window;
            }
          }
          Ok(value)
        },
      )
      .await?;

    let templates = pass.graphs.len();
    let report = self.apply_planned(templates, pass.planned).await;
    Ok((pass.edited, report))
  }

  pub async fn create_template(
    &self,
    input: NewTemplate,
    now: DateTime<Utc>,
  ) -> Result<Template> {
    let mut template = Template {
      template_id: Uuid::new_v4(),
      name:        input.name,
      window:      SaleWindow::OPEN,
      is_active:   true,
      label:       String::new(),
      published:   input.published,
    };
    derive_template(&mut template, Vec::<SaleWindow>::new(), now);

    let changes = ChangeSet { templates: vec![template.clone()], ..ChangeSet::default() };
    self.store.commit(changes).await.map_err(Error::store)?;
    Ok(template)
  }

  /// Offer an attribute value on a template.
  pub async fn add_link(
    &self,
    input: NewLink,
    now: DateTime<Utc>,
  ) -> Result<(AttributeValueLink, RecomputeReport)> {
    let link_id = Uuid::new_v4();
    let scope = Scope::template(input.template_id).with_value(input.value_id);

    let pass = self
      .recompute_scope(scope, now, EffectMode::EdgeTriggered, move |slice, _| {
        let value = slice
          .value(input.value_id)
          .cloned()
          .ok_or(Error::AttributeValueNotFound(input.value_id))?;
        let graph = slice
          .graphs
          .first_mut()
          .ok_or(Error::TemplateNotFound(input.template_id))?;

        if graph.links.iter().any(|l| l.value_id == Some(input.value_id)) {
          return Err(Error::DuplicateLink {
            template_id: input.template_id,
            value_id:    input.value_id,
          });
        }

        graph.links.push(AttributeValueLink {
          link_id,
          template_id: input.template_id,
          value_id: Some(value.value_id),
          configured_visible: input.configured_visible,
          window: SaleWindow::OPEN,
          is_active: true,
          label: String::new(),
          effective_visible: input.configured_visible,
        });
        if graph.value(value.value_id).is_none() {
          graph.values.push(value);
        }
        Ok(())
      })
      .await?;

    let link = pass
      .graphs
      .iter()
      .find_map(|g| g.link(link_id))
      .cloned()
      .ok_or(Error::LinkNotFound(link_id))?;
    let report = self.apply_planned(pass.graphs.len(), pass.planned).await;
    Ok((link, report))
  }

  /// Create a variant from one link per attribute dimension.
  ///
  /// A new variant starts live and unarchived; if its window is already
  /// closed the first recomputation archives it.
  pub async fn add_variant(
    &self,
    input: NewVariant,
    now: DateTime<Utc>,
  ) -> Result<(Variant, RecomputeReport)> {
    let variant_id = Uuid::new_v4();

    let pass = self
      .recompute_scope(
        Scope::template(input.template_id),
        now,
        EffectMode::EdgeTriggered,
        move |slice, _| {
          let graph = slice
            .graphs
            .first_mut()
            .ok_or(Error::TemplateNotFound(input.template_id))?;

          let mut dimensions = HashSet::new();
          for link_id in &input.link_ids {
            let link = graph.link(*link_id).ok_or(Error::LinkNotFound(*link_id))?;
            let attribute = link
              .value_id
              .and_then(|id| graph.value(id))
              .map(|v| v.attribute.clone());
            if let Some(attribute) = attribute
              && !dimensions.insert(attribute.clone())
            {
              return Err(Error::DuplicateDimension(attribute));
            }
          }

          graph.variants.push(Variant {
            variant_id,
            template_id: input.template_id,
            link_ids: input.link_ids,
            window: SaleWindow::OPEN,
            is_active: true,
            label: String::new(),
            archived: false,
            badge: None,
          });
          Ok(())
        },
      )
      .await?;

    let report = self.apply_planned(pass.graphs.len(), pass.planned).await;
    let variant = self.get_variant(variant_id).await?;
    Ok((variant, report))
  }

  /// Re-derive one template at `now`, e.g. after time moved a window edge.
  pub async fn recompute_template(
    &self,
    template_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<RecomputeReport> {
    let pass = self
      .recompute_scope(
        Scope::template(template_id),
        now,
        EffectMode::EdgeTriggered,
        move |slice, _| {
          if slice.graphs.is_empty() {
            return Err(Error::TemplateNotFound(template_id));
          }
          Ok(())
        },
      )
      .await?;
    Ok(self.apply_planned(pass.graphs.len(), pass.planned).await)
  }

  /// Put a template back on the storefront. Never done automatically.
  pub async fn republish_template(&self, template_id: Uuid) -> Result<Template> {
    let mut template = self.get_template(template_id).await?;
    if !template.is_active {
      tracing::warn!(%template_id, "republishing a template outside its sale window");
    }
    self
      .store
      .set_template_published(template_id, true)
      .await
      .map_err(Error::store)?;
    template.published = true;
    Ok(template)
  }

  // ── Storefront ────────────────────────────────────────────────────────

  pub async fn list_offerable_variants(&self, template_id: Uuid) -> Result<Vec<Variant>> {
    let graph = self
      .store
      .load_template_graph(template_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TemplateNotFound(template_id))?;
    Ok(storefront::offerable(&graph.variants).into_iter().cloned().collect())
  }

  /// `upstream` is the verdict of every other eligibility check.
  pub async fn is_purchasable(&self, variant_id: Uuid, upstream: bool) -> Result<bool> {
    let variant = self.get_variant(variant_id).await?;
    Ok(storefront::purchase_allowed(&variant, upstream))
  }

  pub async fn combination_display_info(
    &self,
    variant_id: Uuid,
  ) -> Result<Option<CombinationInfo>> {
    let variant = self.get_variant(variant_id).await?;
    Ok(storefront::combination_info(&variant))
  }

  // ── Reconciliation ────────────────────────────────────────────────────

  /// Re-derive every attribute value, template and variant and correct
  /// persisted state that disagrees with it.
  ///
  /// Works through templates in chunks of `reconcile_chunk_size`, each chunk
  /// in its own transaction, then refreshes the flags of values no template
  /// links. A failing template or write is logged, counted in
  /// [`ReconcileSummary::failed`] and skipped. Running it twice in a row
  /// yields an all-zero summary the second time.
  pub async fn reconcile(&self, now: DateTime<Utc>) -> Result<ReconcileSummary> {
    let chunk_size = self.config.reconcile_chunk_size.max(1);
    let mut summary = ReconcileSummary::default();
    let mut after = None;

    loop {
      let ids = self
        .store
        .template_ids_page(after, chunk_size)
        .await
        .map_err(Error::store)?;
      let Some(last) = ids.last().copied() else {
        break;
      };
      after = Some(last);

      let corrections = match self.reconcile_scope(Scope::templates(ids.clone()), now).await {
        Ok(corrections) => corrections,
        Err(e) => {
          tracing::warn!(error = %e, "reconcile: chunk failed, retrying per template");
          let mut corrections = Vec::new();
          for template_id in ids {
            match self.reconcile_scope(Scope::template(template_id), now).await {
              Ok(planned) => corrections.extend(planned),
              Err(e) => {
                tracing::warn!(%template_id, error = %e, "reconcile: template failed");
                summary.failed += 1;
              }
            }
          }
          corrections
        }
      };

      for effect in corrections {
        match self.apply(&effect).await {
          Ok(()) => summary.record(&effect),
          Err(e) => {
            tracing::warn!(
              entity_id = %effect.entity_id(),
              ?effect,
              error = %e,
              "reconcile: correction failed"
            );
            summary.failed += 1;
          }
        }
      }
    }

    // Unlinked values belong to no graph, so the sweep above never saw them.
    let refreshed = self
      .recompute_scope(
        Scope::unlinked_values(),
        now,
        EffectMode::Suppressed,
        move |slice, changes| {
          let mut refreshed = 0_usize;
          for value in &mut slice.values {
            let before = (value.is_active, value.label.clone());
            derive_value(value, now);
            if before != (value.is_active, value.label.clone()) {
              changes.value_flags.push(value.clone());
              refreshed += 1;
            }
          }
          Ok(refreshed)
        },
      )
      .await;
    match refreshed {
      Ok(pass) => tracing::debug!(values = pass.edited, "reconcile: unlinked values refreshed"),
      Err(e) => {
        tracing::warn!(error = %e, "reconcile: failed to refresh unlinked values");
        summary.failed += 1;
      }
    }

    tracing::info!(
      archived = summary.archived,
      reactivated = summary.reactivated,
      unpublished = summary.unpublished,
      failed = summary.failed,
      "reconcile finished"
    );
    Ok(summary)
  }

  /// Re-derive `scope` with effects suppressed and return the corrections
  /// its committed state calls for.
  async fn reconcile_scope(&self, scope: Scope, now: DateTime<Utc>) -> Result<Vec<SideEffect>> {
    let pass = self
      .recompute_scope(scope, now, EffectMode::Suppressed, |_, _| Ok(()))
      .await?;
    debug_assert!(pass.planned.is_empty());

    let badge_mode = self.config.badge_mode;
    Ok(pass.graphs.iter().flat_map(|g| correct_graph(g, badge_mode)).collect())
  }

  // ── Internals ─────────────────────────────────────────────────────────

  async fn get_template(&self, template_id: Uuid) -> Result<Template> {
    self
      .store
      .get_template(template_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TemplateNotFound(template_id))
  }

  async fn get_variant(&self, variant_id: Uuid) -> Result<Variant> {
    self
      .store
      .get_variant(variant_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::VariantNotFound(variant_id))
  }

  /// Steps 1-3 of the mutation sequence for `scope` in one store transaction.
  ///
  /// `edit` applies the authored change to the loaded slice and may queue
  /// authored rows. If it fails nothing is written.
  async fn recompute_scope<T, F>(
    &self,
    scope: Scope,
    now: DateTime<Utc>,
    mode: EffectMode,
    edit: F,
  ) -> Result<Pass<T>>
  where
    F: FnOnce(&mut Slice, &mut ChangeSet) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let config = self.config.clone();

    self
      .store
      .transact(scope, move |slice| {
        let mut changes = ChangeSet::default();
        let edited = match edit(slice, &mut changes) {
          Ok(edited) => edited,
          Err(e) => return (ChangeSet::default(), Err(e)),
        };

        let mut planned = Vec::new();
        for graph in &mut slice.graphs {
          let transitions = recompute_graph(graph, &config, now);
          planned.extend(plan_graph(graph, &transitions, config.badge_mode, mode));
          changes.push_graph(graph);
        }

        let graphs = std::mem::take(&mut slice.graphs);
        (changes, Ok(Pass { edited, graphs, planned }))
      })
      .await
      .map_err(Error::store)?
  }

  /// Step 4: apply `planned` one by one, logging and skipping failures.
  async fn apply_planned(&self, templates: usize, planned: Vec<SideEffect>) -> RecomputeReport {
    let mut report = RecomputeReport { templates, ..RecomputeReport::default() };
    for effect in planned {
      match self.apply(&effect).await {
        Ok(()) => {
          tracing::debug!(entity_id = %effect.entity_id(), ?effect, "side effect applied");
          report.applied.push(effect);
        }
        Err(e) => {
          tracing::warn!(
            entity_id = %effect.entity_id(),
            ?effect,
            error = %e,
            "side effect failed; derived state kept"
          );
          report.failed.push(effect);
        }
      }
    }
    report
  }

  async fn apply(&self, effect: &SideEffect) -> Result<(), S::Error> {
    match effect {
      SideEffect::ArchiveVariant { variant_id } => {
        self.store.set_variant_archived(*variant_id, true).await
      }
      SideEffect::ReactivateVariant { variant_id } => {
        self.store.set_variant_archived(*variant_id, false).await
      }
      SideEffect::UnpublishTemplate { template_id } => {
        self.store.set_template_published(*template_id, false).await
      }
      SideEffect::BindBadge { variant_id, label } => {
        let badge = self.store.badge_for_label(label).await?;
        self.store.bind_badge(*variant_id, Some(badge.badge_id)).await
      }
      SideEffect::ClearBadge { variant_id } => {
        self.store.bind_badge(*variant_id, None).await
      }
    }
  }
}
