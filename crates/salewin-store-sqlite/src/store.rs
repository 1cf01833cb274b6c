//! [`SqliteStore`]: the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use salewin_core::{
  catalog::{AttributeValue, Badge, Template, Variant},
  store::{CatalogStore, ChangeSet, Scope, Slice, TemplateGraph},
};

use crate::{
  Error, Result,
  encode::{
    BADGE_COLUMNS, LINK_COLUMNS, RawAttributeValue, RawBadge, RawLink, RawTemplate,
    RawVariant, TEMPLATE_COLUMNS, VALUE_COLUMNS, VARIANT_SELECT, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A catalog store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Encoded form of a [`ChangeSet`], ready to move onto the database thread.
struct RawChangeSet {
  values:      Vec<RawAttributeValue>,
  value_flags: Vec<RawAttributeValue>,
  templates:   Vec<RawTemplate>,
  links:       Vec<RawLink>,
  variants:    Vec<RawVariant>,
}

impl RawChangeSet {
  fn encode(changes: &ChangeSet) -> Self {
    Self {
      values:      changes.values.iter().map(RawAttributeValue::encode).collect(),
      value_flags: changes.value_flags.iter().map(RawAttributeValue::encode).collect(),
      templates:   changes.templates.iter().map(RawTemplate::encode).collect(),
      links:       changes.links.iter().map(RawLink::encode).collect(),
      variants:    changes.variants.iter().map(RawVariant::encode).collect(),
    }
  }
}

/// Encoded rows of a [`TemplateGraph`].
struct RawGraph {
  template: RawTemplate,
  links:    Vec<RawLink>,
  values:   Vec<RawAttributeValue>,
  variants: Vec<RawVariant>,
}

impl RawGraph {
  fn into_graph(self) -> Result<TemplateGraph> {
    Ok(TemplateGraph {
      template: self.template.into_template()?,
      links:    self.links.into_iter().map(RawLink::into_link).collect::<Result<_>>()?,
      values:   self
        .values
        .into_iter()
        .map(RawAttributeValue::into_value)
        .collect::<Result<_>>()?,
      variants: self
        .variants
        .into_iter()
        .map(RawVariant::into_variant)
        .collect::<Result<_>>()?,
    })
  }
}

/// Surface a decode failure from inside a database-thread closure.
fn decode_failed(e: Error) -> tokio_rusqlite::Error { tokio_rusqlite::Error::Other(Box::new(e)) }

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, e.g. for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run raw SQL, e.g. to install a failing trigger in tests.
  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &str) -> Result<()> {
    let sql = sql.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fill in `link_ids` for each variant, in link order.
  fn read_variant_links(
    conn: &rusqlite::Connection,
    variants: &mut [RawVariant],
  ) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
      "SELECT link_id FROM variant_links WHERE variant_id = ?1 ORDER BY position",
    )?;
    for variant in variants {
      variant.link_ids = stmt
        .query_map(rusqlite::params![variant.variant_id], |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    }
    Ok(())
  }

  /// Read one template's graph rows. `None` if the template does not exist.
  fn read_graph(conn: &rusqlite::Connection, id_str: &str) -> rusqlite::Result<Option<RawGraph>> {
    let template = conn
      .query_row(
        &format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE template_id = ?1"),
        rusqlite::params![id_str],
        RawTemplate::read,
      )
      .optional()?;
    let Some(template) = template else {
      return Ok(None);
    };

    let links = conn
      .prepare(&format!(
        "SELECT {LINK_COLUMNS} FROM template_links WHERE template_id = ?1 ORDER BY rowid"
      ))?
      .query_map(rusqlite::params![id_str], RawLink::read)?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    let values = conn
      .prepare(&format!(
        "SELECT {VALUE_COLUMNS} FROM attribute_values
         WHERE value_id IN (
           SELECT value_id FROM template_links WHERE template_id = ?1
         )"
      ))?
      .query_map(rusqlite::params![id_str], RawAttributeValue::read)?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut variants = conn
      .prepare(&format!("{VARIANT_SELECT} WHERE v.template_id = ?1 ORDER BY v.position"))?
      .query_map(rusqlite::params![id_str], RawVariant::read)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Self::read_variant_links(conn, &mut variants)?;

    Ok(Some(RawGraph { template, links, values, variants }))
  }

  /// Read the rows `scope` names, as one consistent slice.
  fn read_slice(
    conn: &rusqlite::Connection,
    scope: &Scope,
  ) -> rusqlite::Result<(Vec<RawGraph>, Vec<RawAttributeValue>)> {
    let mut template_ids: Vec<String> =
      scope.templates.iter().copied().map(encode_uuid).collect();
    let mut values = Vec::new();

    for value_id in scope.values.iter().copied().map(encode_uuid) {
      let value = conn
        .query_row(
          &format!("SELECT {VALUE_COLUMNS} FROM attribute_values WHERE value_id = ?1"),
          rusqlite::params![value_id],
          RawAttributeValue::read,
        )
        .optional()?;
      values.extend(value);

      if scope.cascade {
        let linking = conn
          .prepare(
            "SELECT DISTINCT template_id FROM template_links
             WHERE value_id = ?1
             ORDER BY template_id",
          )?
          .query_map(rusqlite::params![value_id], |r| r.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for id in linking {
          if !template_ids.contains(&id) {
            template_ids.push(id);
          }
        }
      }
    }

    if scope.unlinked {
      let unlinked = conn
        .prepare(&format!(
          "SELECT {VALUE_COLUMNS} FROM attribute_values
           WHERE value_id NOT IN (
             SELECT value_id FROM template_links WHERE value_id IS NOT NULL
           )
           ORDER BY attribute, name"
        ))?
        .query_map([], RawAttributeValue::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      values.extend(unlinked);
    }

    let mut graphs = Vec::with_capacity(template_ids.len());
    for id in &template_ids {
      graphs.extend(Self::read_graph(conn, id)?);
    }
    Ok((graphs, values))
  }

  fn write_changes(tx: &rusqlite::Transaction<'_>, raw: &RawChangeSet) -> rusqlite::Result<()> {
    for v in &raw.values {
      tx.execute(
        "INSERT INTO attribute_values
           (value_id, attribute, name, sale_start, sale_end, is_active, label)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (value_id) DO UPDATE SET
           sale_start = excluded.sale_start,
           sale_end   = excluded.sale_end,
           is_active  = excluded.is_active,
           label      = excluded.label",
        rusqlite::params![
          v.value_id,
          v.attribute,
          v.name,
          v.window.sale_start,
          v.window.sale_end,
          v.is_active,
          v.label,
        ],
      )?;
    }

    for v in &raw.value_flags {
      tx.execute(
        "UPDATE attribute_values SET is_active = ?2, label = ?3 WHERE value_id = ?1",
        rusqlite::params![v.value_id, v.is_active, v.label],
      )?;
    }

    for t in &raw.templates {
      tx.execute(
        "INSERT INTO templates
           (template_id, name, sale_start, sale_end, is_active, label, published)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (template_id) DO UPDATE SET
           sale_start = excluded.sale_start,
           sale_end   = excluded.sale_end,
           is_active  = excluded.is_active,
           label      = excluded.label",
        rusqlite::params![
          t.template_id,
          t.name,
          t.window.sale_start,
          t.window.sale_end,
          t.is_active,
          t.label,
          t.published,
        ],
      )?;
    }

    for l in &raw.links {
      tx.execute(
        "INSERT INTO template_links
           (link_id, template_id, value_id, configured_visible,
            sale_start, sale_end, is_active, label, effective_visible)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT (link_id) DO UPDATE SET
           sale_start        = excluded.sale_start,
           sale_end          = excluded.sale_end,
           is_active         = excluded.is_active,
           label             = excluded.label,
           effective_visible = excluded.effective_visible",
        rusqlite::params![
          l.link_id,
          l.template_id,
          l.value_id,
          l.configured_visible,
          l.window.sale_start,
          l.window.sale_end,
          l.is_active,
          l.label,
          l.effective_visible,
        ],
      )?;
    }

    for v in &raw.variants {
      tx.execute(
        "INSERT INTO variants
           (variant_id, template_id, position, sale_start, sale_end,
            is_active, label, archived)
         VALUES (
           ?1, ?2,
           (SELECT COALESCE(MAX(position), -1) + 1 FROM variants WHERE template_id = ?2),
           ?3, ?4, ?5, ?6, ?7
         )
         ON CONFLICT (variant_id) DO UPDATE SET
           sale_start = excluded.sale_start,
           sale_end   = excluded.sale_end,
           is_active  = excluded.is_active,
           label      = excluded.label",
        rusqlite::params![
          v.variant_id,
          v.template_id,
          v.window.sale_start,
          v.window.sale_end,
          v.is_active,
          v.label,
          v.archived,
        ],
      )?;
      for (position, link_id) in v.link_ids.iter().enumerate() {
        tx.execute(
          "INSERT OR IGNORE INTO variant_links (variant_id, link_id, position)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![v.variant_id, link_id, position as i64],
        )?;
      }
    }

    Ok(())
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_attribute_value(&self, id: Uuid) -> Result<Option<AttributeValue>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAttributeValue> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {VALUE_COLUMNS} FROM attribute_values WHERE value_id = ?1"),
            rusqlite::params![id_str],
            RawAttributeValue::read,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAttributeValue::into_value).transpose()
  }

  async fn list_attribute_values(&self) -> Result<Vec<AttributeValue>> {
    let raws: Vec<RawAttributeValue> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {VALUE_COLUMNS} FROM attribute_values ORDER BY attribute, name"
        ))?;
        let rows = stmt
          .query_map([], RawAttributeValue::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttributeValue::into_value).collect()
  }

  async fn get_template(&self, id: Uuid) -> Result<Option<Template>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTemplate> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE template_id = ?1"),
            rusqlite::params![id_str],
            RawTemplate::read,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawTemplate::into_template).transpose()
  }

  async fn list_templates(&self) -> Result<Vec<Template>> {
    let raws: Vec<RawTemplate> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {TEMPLATE_COLUMNS} FROM templates ORDER BY name"))?;
        let rows = stmt
          .query_map([], RawTemplate::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTemplate::into_template).collect()
  }

  async fn get_variant(&self, id: Uuid) -> Result<Option<Variant>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawVariant> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!("{VARIANT_SELECT} WHERE v.variant_id = ?1"),
            rusqlite::params![id_str],
            RawVariant::read,
          )
          .optional()?;
        let Some(raw) = raw else {
          return Ok(None);
        };
        let mut one = [raw];
        Self::read_variant_links(conn, &mut one)?;
        let [raw] = one;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawVariant::into_variant).transpose()
  }

  async fn load_template_graph(&self, template_id: Uuid) -> Result<Option<TemplateGraph>> {
    let id_str = encode_uuid(template_id);

    let raw: Option<RawGraph> =
      self.conn.call(move |conn| Ok(Self::read_graph(conn, &id_str)?)).await?;

    raw.map(RawGraph::into_graph).transpose()
  }

  async fn template_ids_page(&self, after: Option<Uuid>, limit: usize) -> Result<Vec<Uuid>> {
    let after_str = after.map(encode_uuid);
    let limit_val = limit as i64;

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT template_id FROM templates
           WHERE ?1 IS NULL OR template_id > ?1
           ORDER BY template_id
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![after_str, limit_val], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    ids.iter().map(|s| Ok(Uuid::parse_str(s)?)).collect()
  }

  // ── Derived writes ────────────────────────────────────────────────────────

  async fn commit(&self, changes: ChangeSet) -> Result<()> {
    let raw = RawChangeSet::encode(&changes);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        Self::write_changes(&tx, &raw)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn transact<F, T>(&self, scope: Scope, update: F) -> Result<T>
  where
    F: FnOnce(&mut Slice) -> (ChangeSet, T) + Send + 'static,
    T: Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock before the first read, so no other
        // writer can commit between loading the slice and writing it back.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (raw_graphs, raw_values) = Self::read_slice(&tx, &scope)?;
        let mut slice = Slice {
          graphs: raw_graphs
            .into_iter()
            .map(RawGraph::into_graph)
            .collect::<Result<_>>()
            .map_err(decode_failed)?,
          values: raw_values
            .into_iter()
            .map(RawAttributeValue::into_value)
            .collect::<Result<_>>()
            .map_err(decode_failed)?,
        };

        let (changes, outcome) = update(&mut slice);
        if !changes.is_empty() {
          Self::write_changes(&tx, &RawChangeSet::encode(&changes))?;
        }
        tx.commit()?;
        Ok(outcome)
      })
      .await?;
    Ok(outcome)
  }

  // ── Side-effect writes ────────────────────────────────────────────────────

  async fn set_variant_archived(&self, variant_id: Uuid, archived: bool) -> Result<()> {
    let id_str = encode_uuid(variant_id);

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE variants SET archived = ?2 WHERE variant_id = ?1",
          rusqlite::params![id_str, archived],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::VariantNotFound(variant_id));
    }
    Ok(())
  }

  async fn set_template_published(&self, template_id: Uuid, published: bool) -> Result<()> {
    let id_str = encode_uuid(template_id);

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE templates SET published = ?2 WHERE template_id = ?1",
          rusqlite::params![id_str, published],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::TemplateNotFound(template_id));
    }
    Ok(())
  }

  async fn badge_for_label<'a>(&'a self, label: &'a str) -> Result<Badge> {
    // The UNIQUE constraint on `label` makes the insert a no-op for a label
    // that already exists, so concurrent callers converge on one row.
    let candidate = RawBadge::encode(&Badge::sale_period(label));

    let raw: RawBadge = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO badges (badge_id, label, bg_color, text_color, position)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (label) DO NOTHING",
          rusqlite::params![
            candidate.badge_id,
            candidate.label,
            candidate.bg_color,
            candidate.text_color,
            candidate.position,
          ],
        )?;
        let badge = conn.query_row(
          &format!("SELECT {BADGE_COLUMNS} FROM badges WHERE label = ?1"),
          rusqlite::params![candidate.label],
          |row| {
            Ok(RawBadge {
              badge_id:   row.get(0)?,
              label:      row.get(1)?,
              bg_color:   row.get(2)?,
              text_color: row.get(3)?,
              position:   row.get(4)?,
            })
          },
        )?;
        Ok(badge)
      })
      .await?;

    raw.into_badge()
  }

  async fn bind_badge(&self, variant_id: Uuid, badge_id: Option<Uuid>) -> Result<()> {
    let id_str = encode_uuid(variant_id);
    let badge_str = badge_id.map(encode_uuid);

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE variants SET badge_id = ?2 WHERE variant_id = ?1",
          rusqlite::params![id_str, badge_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::VariantNotFound(variant_id));
    }
    Ok(())
  }
}
