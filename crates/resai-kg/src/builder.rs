//! Canonical table → RDF graph.
//!
//! Each row becomes one `resai:Article` subject with a freshly generated
//! UUID-based IRI. Identifiers are not derived from content, so building
//! the same table twice yields two disjoint sets of subjects.

use chrono::{DateTime, NaiveDate};
use oxrdf::vocab::{rdf, rdfs, xsd};
use oxrdf::{Graph, Literal, NamedNode, Triple};
use resai_common::{CanonicalRecord, CanonicalTable, FieldValue};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::KgError;
use crate::ontology::OntologySchema;
use crate::turtle;

/// The built graph plus the subjects minted for each input row, in row order.
#[derive(Debug, Clone)]
pub struct ArticleGraph {
    graph: Graph,
    articles: Vec<NamedNode>,
    prefixes: Vec<(String, String)>,
}

impl ArticleGraph {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Article subjects; `articles()[i]` was minted for row `i`.
    pub fn articles(&self) -> &[NamedNode] {
        &self.articles
    }

    /// Number of triples.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn to_turtle(&self) -> Result<String, KgError> {
        turtle::to_turtle(&self.graph, &self.prefixes)
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }
}

/// Projects every row of `table` into the graph. Never fails per row:
/// absent fields are skipped and unparsable dates fall back to plain literals.
pub fn build_graph(table: &CanonicalTable, schema: &OntologySchema) -> ArticleGraph {
    let mut graph = Graph::new();
    let mut articles = Vec::with_capacity(table.len());

    for row in table {
        let subject = schema.article_iri(Uuid::new_v4());
        add_article(&mut graph, schema, &subject, row);
        articles.push(subject);
    }

    for axiom in schema.axioms() {
        graph.insert(&axiom);
    }

    info!(articles = articles.len(), triples = graph.len(), "RDF graph built");

    ArticleGraph {
        graph,
        articles,
        prefixes: schema.prefixes(),
    }
}

fn add_article(graph: &mut Graph, schema: &OntologySchema, subject: &NamedNode, row: &CanonicalRecord) {
    let mut add = |predicate: &NamedNode, object: Literal| {
        graph.insert(&Triple::new(subject.clone(), predicate.clone(), object));
    };

    let plain = |field: &FieldValue| -> Vec<Literal> {
        field.values().into_iter().map(Literal::new_simple_literal).collect()
    };

    for lit in plain(&row.title) {
        add(&schema.title, lit);
    }
    // Text and list cells both land here, one triple per author.
    for lit in plain(&row.author) {
        add(&schema.author, lit);
    }
    for lit in plain(&row.abstract_text) {
        add(&schema.abstract_text, lit);
    }
    for raw in row.publication_date.values() {
        add(&schema.publication_date, date_literal(raw));
    }
    for lit in plain(&row.journal) {
        add(&schema.journal, lit);
    }
    for lit in plain(&row.doi) {
        add(&schema.doi, lit);
    }
    for lit in plain(&row.url) {
        add(&schema.url, lit);
    }
    for raw in row.year.values() {
        add(&schema.year, year_literal(raw));
    }
    for lit in plain(&row.source) {
        add(&schema.source, lit);
    }

    graph.insert(&Triple::new(subject.clone(), rdf::TYPE.into_owned(), schema.article.clone()));

    if row.abstract_text.is_available() {
        let text = row.abstract_text.values().join(" ");
        for concept in schema.linked_concepts(&text) {
            graph.insert(&Triple::new(
                subject.clone(),
                rdfs::SEE_ALSO.into_owned(),
                concept.clone(),
            ));
        }
    }
}

/// `xsd:date` literal when `raw` is a calendar date, else a plain string literal.
pub fn date_literal(raw: &str) -> Literal {
    match parse_publication_date(raw) {
        Some(date) => Literal::new_typed_literal(date.format("%Y-%m-%d").to_string(), xsd::DATE),
        None => {
            debug!(raw, "Publication date not parseable, keeping string literal");
            Literal::new_simple_literal(raw)
        }
    }
}

fn parse_publication_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn year_literal(raw: &str) -> Literal {
    let raw = raw.trim();
    if raw.len() == 4 && raw.chars().all(|c| c.is_ascii_digit()) {
        Literal::new_typed_literal(raw, xsd::G_YEAR)
    } else {
        Literal::new_simple_literal(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{NamedNodeRef, TermRef};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn row(title: &str, abstract_text: &str) -> CanonicalRecord {
        CanonicalRecord {
            title: FieldValue::text(title),
            abstract_text: FieldValue::text(abstract_text),
            ..Default::default()
        }
    }

    fn objects<'a>(g: &'a ArticleGraph, s: &'a NamedNode, p: &'a NamedNode) -> Vec<TermRef<'a>> {
        g.graph().objects_for_subject_predicate(s.as_ref(), p.as_ref()).collect()
    }

    fn count_predicate(g: &ArticleGraph, p: NamedNodeRef<'_>) -> usize {
        g.graph().triples_for_predicate(p).count()
    }

    #[test]
    fn test_one_type_triple_per_row_and_distinct_subjects() {
        let schema = OntologySchema::default();
        let table = CanonicalTable::from_rows(vec![row("Same", "Same"); 3]);
        let g = build_graph(&table, &schema);

        let typed: Vec<_> = g
            .graph()
            .triples_for_predicate(rdf::TYPE)
            .filter(|t| t.object == TermRef::from(schema.article.as_ref()))
            .collect();
        assert_eq!(typed.len(), 3);

        let subjects: HashSet<&NamedNode> = g.articles().iter().collect();
        assert_eq!(subjects.len(), 3);
    }

    #[test]
    fn test_cancer_abstract_gets_one_see_also() {
        let schema = OntologySchema::default();
        let table = CanonicalTable::from_rows(vec![
            row("A", "Metformin in Cancer therapy; cancer outcomes"),
            row("B", "Mitochondrial dynamics in aging"),
        ]);
        let g = build_graph(&table, &schema);
        let see_also = rdfs::SEE_ALSO.into_owned();

        let first = objects(&g, &g.articles()[0], &see_also);
        assert_eq!(first.len(), 1);
        assert_eq!(
            first[0],
            TermRef::from(NamedNodeRef::new_unchecked(
                "http://bioportal.bioontology.org/ontologies/Cancer"
            ))
        );
        assert!(objects(&g, &g.articles()[1], &see_also).is_empty());
    }

    #[test]
    fn test_unavailable_fields_emit_nothing() {
        let schema = OntologySchema::default();
        let table = CanonicalTable::from_rows(vec![CanonicalRecord::default()]);
        let g = build_graph(&table, &schema);
        // type triple + two axioms
        assert_eq!(g.len(), 3);
        assert_eq!(count_predicate(&g, rdfs::SEE_ALSO), 0);
    }

    #[test]
    fn test_author_text_and_list_each_emit_per_author() {
        let schema = OntologySchema::default();
        let table = CanonicalTable::from_rows(vec![
            CanonicalRecord {
                author: FieldValue::List(vec!["Doe".into(), "Roe".into()]),
                ..Default::default()
            },
            CanonicalRecord {
                author: FieldValue::Text("Solo".into()),
                ..Default::default()
            },
        ]);
        let g = build_graph(&table, &schema);
        assert_eq!(objects(&g, &g.articles()[0], &schema.author).len(), 2);
        assert_eq!(objects(&g, &g.articles()[1], &schema.author).len(), 1);
    }

    #[test]
    fn test_date_typed_or_fallback() {
        let schema = OntologySchema::default();
        let table = CanonicalTable::from_rows(vec![
            CanonicalRecord {
                publication_date: FieldValue::text("2024-06-01"),
                ..Default::default()
            },
            CanonicalRecord {
                publication_date: FieldValue::text("Spring 2021"),
                ..Default::default()
            },
        ]);
        let g = build_graph(&table, &schema);

        let typed = objects(&g, &g.articles()[0], &schema.publication_date);
        let TermRef::Literal(lit) = typed[0] else { panic!("expected literal") };
        assert_eq!(lit.value(), "2024-06-01");
        assert_eq!(lit.datatype(), xsd::DATE);

        let fallback = objects(&g, &g.articles()[1], &schema.publication_date);
        assert_eq!(fallback.len(), 1);
        let TermRef::Literal(lit) = fallback[0] else { panic!("expected literal") };
        assert_eq!(lit.value(), "Spring 2021");
        assert_eq!(lit.datatype(), xsd::STRING);
    }

    #[test]
    fn test_date_literal_accepts_rfc3339() {
        let lit = date_literal("2023-02-11T18:00:00Z");
        assert_eq!(lit.value(), "2023-02-11");
        assert_eq!(lit.datatype(), xsd::DATE);
        assert_eq!(date_literal("2024-13-45").datatype(), xsd::STRING);
    }

    #[test]
    fn test_year_literal_typing() {
        assert_eq!(year_literal("2021").datatype(), xsd::G_YEAR);
        assert_eq!(year_literal("c. 2021").datatype(), xsd::STRING);
    }

    #[test]
    fn test_axioms_present_once() {
        let schema = OntologySchema::default();
        let g = build_graph(&CanonicalTable::default(), &schema);
        assert_eq!(g.len(), 2);
        assert_eq!(count_predicate(&g, rdfs::SUB_CLASS_OF), 1);
        assert!(g.articles().is_empty());
    }
}
