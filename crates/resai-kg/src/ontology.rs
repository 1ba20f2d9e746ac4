//! Ontology declarations for the article graph.
//!
//! Built once per graph build and passed by reference; nothing here is global.

use oxrdf::vocab::rdfs;
use oxrdf::{NamedNode, NamedNodeRef, Triple};
use uuid::Uuid;

use crate::error::KgError;

/// Namespace of the system's own classes and properties.
pub const RESAI_NS: &str = "http://researchassistai.org/ontology/";
/// Namespace of the external bio-ontology used for `rdfs:seeAlso` links.
pub const BIO_NS: &str = "http://bioportal.bioontology.org/ontologies/";

pub const OWL_NS: &str = "http://www.w3.org/2002/07/owl#";
pub const OWL_SAME_AS: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#sameAs");

/// Abstract keyword → bio-ontology concept (local name under `BIO_NS`).
const DEFAULT_CONCEPT_LINKS: &[(&str, &str)] = &[("cancer", "Cancer")];

/// A trigger substring and the external concept it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptLink {
    /// Lower-cased; matched against the lower-cased abstract.
    pub trigger: String,
    pub concept: NamedNode,
}

#[derive(Debug, Clone)]
pub struct OntologySchema {
    namespace: String,
    bio_namespace: String,
    pub article: NamedNode,
    pub research_paper: NamedNode,
    pub publication: NamedNode,
    pub title: NamedNode,
    pub author: NamedNode,
    pub abstract_text: NamedNode,
    pub publication_date: NamedNode,
    pub journal: NamedNode,
    pub doi: NamedNode,
    pub url: NamedNode,
    pub year: NamedNode,
    pub source: NamedNode,
    links: Vec<ConceptLink>,
}

impl OntologySchema {
    /// Declares the schema under the given namespaces, with no concept links.
    pub fn new(namespace: &str, bio_namespace: &str) -> Result<Self, KgError> {
        let namespace = with_separator(namespace);
        let bio_namespace = with_separator(bio_namespace);
        let term = |local: &str| iri(&format!("{namespace}{local}"));

        Ok(Self {
            article: term("Article")?,
            research_paper: term("ResearchPaper")?,
            publication: term("Publication")?,
            title: term("title")?,
            author: term("author")?,
            abstract_text: term("abstract")?,
            publication_date: term("publicationDate")?,
            journal: term("journal")?,
            doi: term("doi")?,
            url: term("url")?,
            year: term("year")?,
            source: term("source")?,
            links: Vec::new(),
            namespace,
            bio_namespace,
        })
    }

    /// Adds a `trigger → concept` heuristic. `concept` is a local name under
    /// the bio namespace, or a full IRI if it contains `://`.
    pub fn with_link(mut self, trigger: &str, concept: &str) -> Result<Self, KgError> {
        let trigger = trigger.trim();
        if trigger.is_empty() {
            return Err(KgError::BlankTrigger { concept: concept.to_string() });
        }
        let concept = if concept.contains("://") {
            iri(concept)?
        } else {
            iri(&format!("{}{concept}", self.bio_namespace))?
        };
        self.links.push(ConceptLink {
            trigger: trigger.to_lowercase(),
            concept,
        });
        Ok(self)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn bio_namespace(&self) -> &str {
        &self.bio_namespace
    }

    pub fn links(&self) -> &[ConceptLink] {
        &self.links
    }

    /// Subject IRI for an article identifier.
    pub fn article_iri(&self, id: Uuid) -> NamedNode {
        // Namespace was validated and a UUID adds no IRI-special characters.
        NamedNode::new_unchecked(format!("{}article/{id}", self.namespace))
    }

    /// Concepts whose trigger occurs in `abstract_text`, case-insensitively.
    pub fn linked_concepts(&self, abstract_text: &str) -> Vec<&NamedNode> {
        let haystack = abstract_text.to_lowercase();
        let mut out: Vec<&NamedNode> = Vec::new();
        for link in &self.links {
            if haystack.contains(&link.trigger) && !out.contains(&&link.concept) {
                out.push(&link.concept);
            }
        }
        out
    }

    /// Class-level axioms appended after all articles.
    pub fn axioms(&self) -> [Triple; 2] {
        [
            Triple::new(
                self.article.clone(),
                OWL_SAME_AS.into_owned(),
                self.research_paper.clone(),
            ),
            Triple::new(
                self.article.clone(),
                rdfs::SUB_CLASS_OF.into_owned(),
                self.publication.clone(),
            ),
        ]
    }

    /// Turtle prefixes, `(name, iri)`.
    pub fn prefixes(&self) -> Vec<(String, String)> {
        vec![
            ("resai".to_string(), self.namespace.clone()),
            ("bio".to_string(), self.bio_namespace.clone()),
            ("rdf".to_string(), "http://www.w3.org/1999/02/22-rdf-syntax-ns#".to_string()),
            ("rdfs".to_string(), "http://www.w3.org/2000/01/rdf-schema#".to_string()),
            ("owl".to_string(), OWL_NS.to_string()),
            ("xsd".to_string(), "http://www.w3.org/2001/XMLSchema#".to_string()),
        ]
    }
}

impl Default for OntologySchema {
    fn default() -> Self {
        let mut schema = Self::new(RESAI_NS, BIO_NS).expect("built-in namespaces are valid IRIs");
        for (trigger, concept) in DEFAULT_CONCEPT_LINKS {
            schema = schema
                .with_link(trigger, concept)
                .expect("built-in concept names are valid IRIs");
        }
        schema
    }
}

fn with_separator(ns: &str) -> String {
    if ns.ends_with('/') || ns.ends_with('#') {
        ns.to_string()
    } else {
        format!("{ns}/")
    }
}

fn iri(value: &str) -> Result<NamedNode, KgError> {
    NamedNode::new(value).map_err(|e| KgError::InvalidIri {
        iri: value.to_string(),
        reason: e.to_string(),
    })
}
