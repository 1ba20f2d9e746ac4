use thiserror::Error;

#[derive(Debug, Error)]
pub enum KgError {
    #[error("Invalid IRI <{iri}>: {reason}")]
    InvalidIri { iri: String, reason: String },

    #[error("Concept link to {concept} has a blank trigger")]
    BlankTrigger { concept: String },

    #[error("Turtle write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("Turtle output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Turtle parse error: {0}")]
    Parse(String),
}
