//! Canonical article schema shared by the harmoniser and the graph builder.
//!
//! Every `CanonicalRecord` carries all nine fields; a value the source did
//! not provide is `FieldValue::Unavailable`, serialised as the `"N/A"` sentinel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::UNAVAILABLE;

/// Canonical column names, in table order.
pub const CANONICAL_FIELDS: [&str; 9] = [
    "Author",
    "Title",
    "Abstract",
    "Journal",
    "DOI",
    "URL",
    "PublicationDate",
    "Year",
    "Source",
];

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// A single cell of the canonical table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FieldValue {
    #[default]
    Unavailable,
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Builds a text cell; blank strings and the sentinel itself count as absent.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if is_null_like(&s) {
            FieldValue::Unavailable
        } else {
            FieldValue::Text(s)
        }
    }

    /// Builds a multi-valued cell, dropping blank entries. An empty list is absent.
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items
            .into_iter()
            .map(Into::into)
            .filter(|s| !is_null_like(s))
            .collect();
        if items.is_empty() {
            FieldValue::Unavailable
        } else {
            FieldValue::List(items)
        }
    }

    pub fn from_option(value: Option<impl Into<String>>) -> Self {
        value.map(FieldValue::text).unwrap_or_default()
    }

    /// Converts an arbitrary JSON cell; `null` and null-like strings become `Unavailable`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Unavailable,
            Value::String(s) => FieldValue::text(s.as_str()),
            Value::Number(n) => FieldValue::Text(n.to_string()),
            Value::Bool(b) => FieldValue::Text(b.to_string()),
            Value::Array(items) => FieldValue::list(items.iter().filter_map(|item| match item {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })),
            Value::Object(_) => FieldValue::Text(value.to_string()),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, FieldValue::Unavailable)
    }

    /// All values in the cell: one for text, each element for a list, none when absent.
    pub fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::Unavailable => Vec::new(),
            FieldValue::Text(s) => vec![s.as_str()],
            FieldValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Human-readable rendering used in table previews.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Unavailable => UNAVAILABLE.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items.join("; "),
        }
    }
}

fn is_null_like(s: &str) -> bool {
    let t = s.trim();
    t.is_empty() || t.eq_ignore_ascii_case(UNAVAILABLE)
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::from_json(&value)
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Unavailable => Value::String(UNAVAILABLE.to_string()),
            FieldValue::Text(s) => Value::String(s),
            FieldValue::List(items) => Value::Array(items.into_iter().map(Value::String).collect()),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One harmonised article row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalRecord {
    #[serde(rename = "Author")]
    pub author: FieldValue,
    #[serde(rename = "Title")]
    pub title: FieldValue,
    #[serde(rename = "Abstract")]
    pub abstract_text: FieldValue,
    #[serde(rename = "Journal")]
    pub journal: FieldValue,
    #[serde(rename = "DOI")]
    pub doi: FieldValue,
    #[serde(rename = "URL")]
    pub url: FieldValue,
    #[serde(rename = "PublicationDate")]
    pub publication_date: FieldValue,
    #[serde(rename = "Year")]
    pub year: FieldValue,
    #[serde(rename = "Source")]
    pub source: FieldValue,
}

impl CanonicalRecord {
    /// Looks up a cell by canonical column name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        match name {
            "Author" => Some(&self.author),
            "Title" => Some(&self.title),
            "Abstract" => Some(&self.abstract_text),
            "Journal" => Some(&self.journal),
            "DOI" => Some(&self.doi),
            "URL" => Some(&self.url),
            "PublicationDate" => Some(&self.publication_date),
            "Year" => Some(&self.year),
            "Source" => Some(&self.source),
            _ => None,
        }
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        match name {
            "Author" => Some(&mut self.author),
            "Title" => Some(&mut self.title),
            "Abstract" => Some(&mut self.abstract_text),
            "Journal" => Some(&mut self.journal),
            "DOI" => Some(&mut self.doi),
            "URL" => Some(&mut self.url),
            "PublicationDate" => Some(&mut self.publication_date),
            "Year" => Some(&mut self.year),
            "Source" => Some(&mut self.source),
            _ => None,
        }
    }

    /// Builds a record from `(canonical column, value)` pairs. Unknown
    /// columns are ignored; a later available value for the same column
    /// wins over an earlier one, but never over it with `Unavailable`.
    pub fn from_cells<'a, I>(cells: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, FieldValue)>,
    {
        let mut record = CanonicalRecord::default();
        for (name, value) in cells {
            if let Some(slot) = record.field_mut(name) {
                if value.is_available() || !slot.is_available() {
                    *slot = value;
                }
            }
        }
        record
    }

    /// `(column, value)` pairs in canonical order.
    pub fn cells(&self) -> [(&'static str, &FieldValue); 9] {
        [
            ("Author", &self.author),
            ("Title", &self.title),
            ("Abstract", &self.abstract_text),
            ("Journal", &self.journal),
            ("DOI", &self.doi),
            ("URL", &self.url),
            ("PublicationDate", &self.publication_date),
            ("Year", &self.year),
            ("Source", &self.source),
        ]
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Ordered collection of harmonised rows. Duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalTable {
    rows: Vec<CanonicalRecord>,
}

impl CanonicalTable {
    pub fn from_rows(rows: Vec<CanonicalRecord>) -> Self {
        Self { rows }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        &CANONICAL_FIELDS
    }

    pub fn rows(&self) -> &[CanonicalRecord] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CanonicalRecord> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> &[CanonicalRecord] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Renders the first `n` rows as a tab-separated preview.
    pub fn preview(&self, n: usize) -> String {
        let mut out = CANONICAL_FIELDS.join("\t");
        for row in self.head(n) {
            out.push('\n');
            let cells: Vec<String> = row.cells().iter().map(|(_, v)| v.display()).collect();
            out.push_str(&cells.join("\t"));
        }
        out
    }
}

impl<'a> IntoIterator for &'a CanonicalTable {
    type Item = &'a CanonicalRecord;
    type IntoIter = std::slice::Iter<'a, CanonicalRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
