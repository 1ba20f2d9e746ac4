//! Pure mappings from each raw row shape into a `CanonicalRecord`.

use resai_common::{CanonicalRecord, FieldValue, CANONICAL_FIELDS};
use serde_json::{Map, Value};

use crate::models::{ArticleRecord, SourceRow};

/// Raw column name → canonical column name.
pub const FIELD_MAPPING: [(&str, &str); 9] = [
    ("authors", "Author"),
    ("title", "Title"),
    ("abstract", "Abstract"),
    ("journal", "Journal"),
    ("doi", "DOI"),
    ("url", "URL"),
    ("publication_date", "PublicationDate"),
    ("year", "Year"),
    ("source", "Source"),
];

/// Canonical name for a raw column, if it maps to one. Already-canonical
/// names map to themselves.
pub fn canonical_name(column: &str) -> Option<&'static str> {
    FIELD_MAPPING
        .iter()
        .find(|(raw, _)| *raw == column)
        .map(|(_, canonical)| *canonical)
        .or_else(|| CANONICAL_FIELDS.iter().copied().find(|c| *c == column))
}

pub fn map_row(row: &SourceRow) -> CanonicalRecord {
    match row {
        SourceRow::Article(article) => map_article(article),
        SourceRow::Loose(object) => map_object(object),
    }
}

pub fn map_article(article: &ArticleRecord) -> CanonicalRecord {
    CanonicalRecord {
        author: FieldValue::list(article.authors.iter().cloned()),
        title: FieldValue::from_option(article.title.clone()),
        abstract_text: FieldValue::from_option(article.abstract_text.clone()),
        journal: FieldValue::from_option(article.journal.clone()),
        doi: FieldValue::from_option(article.doi.clone()),
        url: FieldValue::from_option(article.url.clone()),
        publication_date: FieldValue::from_option(article.publication_date.clone()),
        year: FieldValue::from_option(article.year.map(|y| y.to_string())),
        source: FieldValue::text(article.source.as_str()),
    }
}

/// Renames columns through `FIELD_MAPPING`; columns with no canonical
/// counterpart are dropped, missing ones stay `Unavailable`.
pub fn map_object(object: &Map<String, Value>) -> CanonicalRecord {
    CanonicalRecord::from_cells(
        object
            .iter()
            .filter_map(|(column, value)| canonical_name(column).map(|c| (c, FieldValue::from_json(value)))),
    )
}
