//! resai-kg: Linked-data projection of harmonised articles.
//!
//! - `ontology`: namespaces, class/property IRIs, concept-link heuristics
//! - `builder`: canonical table → RDF graph
//! - `turtle`: Turtle export and re-import

pub mod builder;
pub mod error;
pub mod ontology;
pub mod turtle;

pub use builder::{build_graph, ArticleGraph};
pub use error::KgError;
pub use ontology::{ConceptLink, OntologySchema, BIO_NS, RESAI_NS};
pub use turtle::{from_turtle, to_turtle};
