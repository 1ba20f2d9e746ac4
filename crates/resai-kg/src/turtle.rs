//! Turtle export/import for article graphs.

use oxrdf::Graph;
use oxttl::{TurtleParser, TurtleSerializer};

use crate::error::KgError;

/// Serialises `graph` as Turtle, declaring the given `(name, iri)` prefixes.
pub fn to_turtle(graph: &Graph, prefixes: &[(String, String)]) -> Result<String, KgError> {
    let mut serializer = TurtleSerializer::new();
    for (name, iri) in prefixes {
        serializer = serializer
            .with_prefix(name.as_str(), iri.as_str())
            .map_err(|e| KgError::InvalidIri {
                iri: iri.clone(),
                reason: e.to_string(),
            })?;
    }

    let mut writer = serializer.for_writer(Vec::new());
    for triple in graph.iter() {
        writer.serialize_triple(triple)?;
    }
    let bytes = writer.finish()?;
    Ok(String::from_utf8(bytes)?)
}

/// Parses Turtle text back into a graph.
pub fn from_turtle(text: &str) -> Result<Graph, KgError> {
    let mut graph = Graph::new();
    for triple in TurtleParser::new().for_slice(text.as_bytes()) {
        let triple = triple.map_err(|e| KgError::Parse(e.to_string()))?;
        graph.insert(&triple);
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{Literal, NamedNode, Triple};

    #[test]
    fn test_prefixes_are_declared() {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(
            NamedNode::new_unchecked("http://researchassistai.org/ontology/article/1"),
            NamedNode::new_unchecked("http://researchassistai.org/ontology/title"),
            Literal::new_simple_literal("Autophagy"),
        ));
        let ttl = to_turtle(
            &graph,
            &[("resai".to_string(), "http://researchassistai.org/ontology/".to_string())],
        )
        .unwrap();
        assert!(ttl.contains("@prefix resai: <http://researchassistai.org/ontology/>"));
        assert_eq!(from_turtle(&ttl).unwrap(), graph);
    }

    #[test]
    fn test_malformed_turtle_is_parse_error() {
        let err = from_turtle("<http://a> <http://b> ").unwrap_err();
        assert!(matches!(err, KgError::Parse(_)));
    }
}
