//! SQL schema for the sale-window SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
///
/// Timestamps are fixed-width RFC 3339 UTC strings, so text comparison orders
/// them chronologically and the window CHECK works on the raw columns.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS attribute_values (
    value_id    TEXT PRIMARY KEY,
    attribute   TEXT NOT NULL,
    name        TEXT NOT NULL,
    sale_start  TEXT,
    sale_end    TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1,
    label       TEXT NOT NULL DEFAULT '',
    CHECK (sale_start IS NULL OR sale_end IS NULL OR sale_start < sale_end)
);

CREATE TABLE IF NOT EXISTS templates (
    template_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    sale_start  TEXT,
    sale_end    TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1,
    label       TEXT NOT NULL DEFAULT '',
    published   INTEGER NOT NULL DEFAULT 1
);

-- Shared, one row per label.
CREATE TABLE IF NOT EXISTS badges (
    badge_id    TEXT PRIMARY KEY,
    label       TEXT NOT NULL UNIQUE,
    bg_color    TEXT NOT NULL,
    text_color  TEXT NOT NULL,
    position    TEXT NOT NULL    -- 'left' | 'right'
);

CREATE TABLE IF NOT EXISTS template_links (
    link_id             TEXT PRIMARY KEY,
    template_id         TEXT NOT NULL REFERENCES templates(template_id),
    value_id            TEXT REFERENCES attribute_values(value_id) ON DELETE SET NULL,
    configured_visible  INTEGER NOT NULL DEFAULT 1,
    sale_start          TEXT,
    sale_end            TEXT,
    is_active           INTEGER NOT NULL DEFAULT 1,
    label               TEXT NOT NULL DEFAULT '',
    effective_visible   INTEGER NOT NULL DEFAULT 1,
    UNIQUE (template_id, value_id)
);

CREATE TABLE IF NOT EXISTS variants (
    variant_id  TEXT PRIMARY KEY,
    template_id TEXT NOT NULL REFERENCES templates(template_id),
    position    INTEGER NOT NULL,
    sale_start  TEXT,
    sale_end    TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1,
    label       TEXT NOT NULL DEFAULT '',
    archived    INTEGER NOT NULL DEFAULT 0,
    badge_id    TEXT REFERENCES badges(badge_id)
);

CREATE TABLE IF NOT EXISTS variant_links (
    variant_id  TEXT NOT NULL REFERENCES variants(variant_id),
    link_id     TEXT NOT NULL REFERENCES template_links(link_id),
    position    INTEGER NOT NULL,
    PRIMARY KEY (variant_id, link_id)
);

CREATE INDEX IF NOT EXISTS links_template_idx   ON template_links(template_id);
CREATE INDEX IF NOT EXISTS links_value_idx      ON template_links(value_id);
CREATE INDEX IF NOT EXISTS variants_template_idx ON variants(template_id);

PRAGMA user_version = 1;
";
