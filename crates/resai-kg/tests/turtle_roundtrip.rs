//! Turtle export must re-import to the same triple set.

use std::collections::HashSet;

use oxrdf::{Graph, Triple};
use resai_common::{CanonicalRecord, CanonicalTable, FieldValue};
use resai_kg::{build_graph, from_turtle, OntologySchema};

fn triples(graph: &Graph) -> HashSet<Triple> {
    graph.iter().map(|t| t.into_owned()).collect()
}

fn sample_table() -> CanonicalTable {
    CanonicalTable::from_rows(vec![
        CanonicalRecord {
            author: FieldValue::List(vec!["Jane Doe".into(), "Kim Lee".into()]),
            title: FieldValue::text("Autophagy \"in vivo\": a review"),
            abstract_text: FieldValue::text("Line one.\nCancer cells rely on autophagy."),
            journal: FieldValue::text("Nature Aging"),
            doi: FieldValue::text("10.1000/xyz123"),
            url: FieldValue::text("https://doi.org/10.1000/xyz123"),
            publication_date: FieldValue::text("2023-05-17"),
            year: FieldValue::text("2023"),
            source: FieldValue::text("CrossRef"),
        },
        CanonicalRecord {
            author: FieldValue::text("Solo Author"),
            title: FieldValue::text("Protein folding at scale"),
            publication_date: FieldValue::text("May 2022"),
            source: FieldValue::text("arXiv"),
            ..Default::default()
        },
        CanonicalRecord::default(),
    ])
}

#[test]
fn turtle_roundtrip_preserves_triples() {
    let schema = OntologySchema::default();
    let article_graph = build_graph(&sample_table(), &schema);

    let ttl = article_graph.to_turtle().expect("serialise");
    let reparsed = from_turtle(&ttl).expect("parse");

    assert_eq!(triples(article_graph.graph()), triples(&reparsed));
}

#[test]
fn rebuilding_mints_new_subjects() {
    let schema = OntologySchema::default();
    let table = sample_table();
    let first = build_graph(&table, &schema);
    let second = build_graph(&table, &schema);

    assert_eq!(first.len(), second.len());
    for subject in first.articles() {
        assert!(!second.articles().contains(subject));
    }
}
