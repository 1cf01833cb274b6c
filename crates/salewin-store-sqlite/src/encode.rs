//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! precision and a `Z` suffix. UUIDs are stored as hyphenated lowercase
//! strings. Booleans use SQLite integers.

use chrono::{DateTime, SecondsFormat, Utc};
use salewin_core::{
  SaleWindow,
  catalog::{AttributeValue, AttributeValueLink, Badge, BadgePosition, Template, Variant},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

pub fn encode_position(p: BadgePosition) -> &'static str {
  match p {
    BadgePosition::Left => "left",
    BadgePosition::Right => "right",
  }
}

pub fn decode_position(s: &str) -> Result<BadgePosition> {
  match s {
    "left" => Ok(BadgePosition::Left),
    "right" => Ok(BadgePosition::Right),
    other => Err(Error::UnknownEnum { column: "badges.position", value: other.to_owned() }),
  }
}

// ─── Window ──────────────────────────────────────────────────────────────────

/// The two nullable window columns, encoded.
#[derive(Debug, Clone)]
pub struct RawWindow {
  pub sale_start: Option<String>,
  pub sale_end:   Option<String>,
}

impl RawWindow {
  pub fn encode(w: &SaleWindow) -> Self {
    Self { sale_start: w.start.map(encode_dt), sale_end: w.end.map(encode_dt) }
  }

  fn decode(&self) -> Result<SaleWindow> {
    Ok(SaleWindow::new(
      decode_opt_dt(self.sale_start.as_deref())?,
      decode_opt_dt(self.sale_end.as_deref())?,
    ))
  }
}

// ─── Attribute value ─────────────────────────────────────────────────────────

pub const VALUE_COLUMNS: &str =
  "value_id, attribute, name, sale_start, sale_end, is_active, label";

#[derive(Debug, Clone)]
pub struct RawAttributeValue {
  pub value_id:  String,
  pub attribute: String,
  pub name:      String,
  pub window:    RawWindow,
  pub is_active: bool,
  pub label:     String,
}

impl RawAttributeValue {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      value_id:  row.get(0)?,
      attribute: row.get(1)?,
      name:      row.get(2)?,
      window:    RawWindow { sale_start: row.get(3)?, sale_end: row.get(4)? },
      is_active: row.get(5)?,
      label:     row.get(6)?,
    })
  }

  pub fn encode(v: &AttributeValue) -> Self {
    Self {
      value_id:  encode_uuid(v.value_id),
      attribute: v.attribute.clone(),
      name:      v.name.clone(),
      window:    RawWindow::encode(&v.window),
      is_active: v.is_active,
      label:     v.label.clone(),
    }
  }

  pub fn into_value(self) -> Result<AttributeValue> {
    Ok(AttributeValue {
      value_id:  decode_uuid(&self.value_id)?,
      attribute: self.attribute,
      name:      self.name,
      window:    self.window.decode()?,
      is_active: self.is_active,
      label:     self.label,
    })
  }
}

// ─── Template ────────────────────────────────────────────────────────────────

pub const TEMPLATE_COLUMNS: &str =
  "template_id, name, sale_start, sale_end, is_active, label, published";

#[derive(Debug, Clone)]
pub struct RawTemplate {
  pub template_id: String,
  pub name:        String,
  pub window:      RawWindow,
  pub is_active:   bool,
  pub label:       String,
  pub published:   bool,
}

impl RawTemplate {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      template_id: row.get(0)?,
      name:        row.get(1)?,
      window:      RawWindow { sale_start: row.get(2)?, sale_end: row.get(3)? },
      is_active:   row.get(4)?,
      label:       row.get(5)?,
      published:   row.get(6)?,
    })
  }

  pub fn encode(t: &Template) -> Self {
    Self {
      template_id: encode_uuid(t.template_id),
      name:        t.name.clone(),
      window:      RawWindow::encode(&t.window),
      is_active:   t.is_active,
      label:       t.label.clone(),
      published:   t.published,
    }
  }

  pub fn into_template(self) -> Result<Template> {
    Ok(Template {
      template_id: decode_uuid(&self.template_id)?,
      name:        self.name,
      window:      self.window.decode()?,
      is_active:   self.is_active,
      label:       self.label,
      published:   self.published,
    })
  }
}

// ─── Link ────────────────────────────────────────────────────────────────────

pub const LINK_COLUMNS: &str = "link_id, template_id, value_id, configured_visible, \
                                sale_start, sale_end, is_active, label, effective_visible";

#[derive(Debug, Clone)]
pub struct RawLink {
  pub link_id:            String,
  pub template_id:        String,
  pub value_id:           Option<String>,
  pub configured_visible: bool,
  pub window:             RawWindow,
  pub is_active:          bool,
  pub label:              String,
  pub effective_visible:  bool,
}

impl RawLink {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      link_id:            row.get(0)?,
      template_id:        row.get(1)?,
      value_id:           row.get(2)?,
      configured_visible: row.get(3)?,
      window:             RawWindow { sale_start: row.get(4)?, sale_end: row.get(5)? },
      is_active:          row.get(6)?,
      label:              row.get(7)?,
      effective_visible:  row.get(8)?,
    })
  }

  pub fn encode(l: &AttributeValueLink) -> Self {
    Self {
      link_id:            encode_uuid(l.link_id),
      template_id:        encode_uuid(l.template_id),
      value_id:           l.value_id.map(encode_uuid),
      configured_visible: l.configured_visible,
      window:             RawWindow::encode(&l.window),
      is_active:          l.is_active,
      label:              l.label.clone(),
      effective_visible:  l.effective_visible,
    }
  }

  pub fn into_link(self) -> Result<AttributeValueLink> {
    Ok(AttributeValueLink {
      link_id:            decode_uuid(&self.link_id)?,
      template_id:        decode_uuid(&self.template_id)?,
      value_id:           decode_opt_uuid(self.value_id.as_deref())?,
      configured_visible: self.configured_visible,
      window:             self.window.decode()?,
      is_active:          self.is_active,
      label:              self.label,
      effective_visible:  self.effective_visible,
    })
  }
}

// ─── Badge ───────────────────────────────────────────────────────────────────

pub const BADGE_COLUMNS: &str = "badge_id, label, bg_color, text_color, position";

#[derive(Debug, Clone)]
pub struct RawBadge {
  pub badge_id:   String,
  pub label:      String,
  pub bg_color:   String,
  pub text_color: String,
  pub position:   String,
}

impl RawBadge {
  /// Read the five badge columns starting at `offset`.
  pub fn read_at(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Option<Self>> {
    let badge_id: Option<String> = row.get(offset)?;
    let Some(badge_id) = badge_id else {
      return Ok(None);
    };
    Ok(Some(Self {
      badge_id,
      label:      row.get(offset + 1)?,
      bg_color:   row.get(offset + 2)?,
      text_color: row.get(offset + 3)?,
      position:   row.get(offset + 4)?,
    }))
  }

  pub fn encode(b: &Badge) -> Self {
    Self {
      badge_id:   encode_uuid(b.badge_id),
      label:      b.label.clone(),
      bg_color:   b.bg_color.clone(),
      text_color: b.text_color.clone(),
      position:   encode_position(b.position).to_owned(),
    }
  }

  pub fn into_badge(self) -> Result<Badge> {
    Ok(Badge {
      badge_id:   decode_uuid(&self.badge_id)?,
      label:      self.label,
      bg_color:   self.bg_color,
      text_color: self.text_color,
      position:   decode_position(&self.position)?,
    })
  }
}

// ─── Variant ─────────────────────────────────────────────────────────────────

/// Variant columns joined with its badge; expects `variants v` and
/// `badges b` aliases.
pub const VARIANT_SELECT: &str = "SELECT
     v.variant_id, v.template_id, v.sale_start, v.sale_end,
     v.is_active, v.label, v.archived,
     b.badge_id, b.label, b.bg_color, b.text_color, b.position
   FROM variants v
   LEFT JOIN badges b ON b.badge_id = v.badge_id";

#[derive(Debug, Clone)]
pub struct RawVariant {
  pub variant_id:  String,
  pub template_id: String,
  pub link_ids:    Vec<String>,
  pub window:      RawWindow,
  pub is_active:   bool,
  pub label:       String,
  pub archived:    bool,
  pub badge:       Option<RawBadge>,
}

impl RawVariant {
  /// Read a [`VARIANT_SELECT`] row; `link_ids` are filled in separately.
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      variant_id:  row.get(0)?,
      template_id: row.get(1)?,
      link_ids:    Vec::new(),
      window:      RawWindow { sale_start: row.get(2)?, sale_end: row.get(3)? },
      is_active:   row.get(4)?,
      label:       row.get(5)?,
      archived:    row.get(6)?,
      badge:       RawBadge::read_at(row, 7)?,
    })
  }

  pub fn encode(v: &Variant) -> Self {
    Self {
      variant_id:  encode_uuid(v.variant_id),
      template_id: encode_uuid(v.template_id),
      link_ids:    v.link_ids.iter().copied().map(encode_uuid).collect(),
      window:      RawWindow::encode(&v.window),
      is_active:   v.is_active,
      label:       v.label.clone(),
      archived:    v.archived,
      badge:       v.badge.as_ref().map(RawBadge::encode),
    }
  }

  pub fn into_variant(self) -> Result<Variant> {
    Ok(Variant {
      variant_id:  decode_uuid(&self.variant_id)?,
      template_id: decode_uuid(&self.template_id)?,
      link_ids:    self
        .link_ids
        .iter()
        .map(|s| decode_uuid(s))
        .collect::<Result<_>>()?,
      window:      self.window.decode()?,
      is_active:   self.is_active,
      label:       self.label,
      archived:    self.archived,
      badge:       self.badge.map(RawBadge::into_badge).transpose()?,
    })
  }
}
