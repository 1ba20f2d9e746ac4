//! Keyword-driven key-information extraction from abstracts.

use serde::{Deserialize, Serialize};

/// Disease terms recognised in abstracts.
const DISEASE_TERMS: &[&str] = &[
    "cancer",
    "tumor",
    "tumour",
    "alzheimer's disease",
    "parkinson's disease",
    "huntington's disease",
    "dementia",
    "diabetes",
    "obesity",
    "cardiovascular disease",
    "atherosclerosis",
    "hypertension",
    "sarcopenia",
    "osteoporosis",
    "fibrosis",
    "neurodegeneration",
    "progeria",
];

/// Treatment/intervention terms recognised in abstracts.
const TREATMENT_TERMS: &[&str] = &[
    "rapamycin",
    "metformin",
    "resveratrol",
    "spermidine",
    "senolytic",
    "caloric restriction",
    "dietary restriction",
    "intermittent fasting",
    "chemotherapy",
    "radiotherapy",
    "immunotherapy",
    "gene therapy",
    "stem cell therapy",
    "exercise",
];

/// Abbreviations whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &["e.g.", "i.e.", "et al.", "vs.", "fig.", "approx.", "ca."];

fn ends_with_abbreviation(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    ABBREVIATIONS.iter().any(|a| {
        lower.strip_suffix(a).is_some_and(|head| {
            head.chars().last().map_or(true, |c| c.is_whitespace() || c == '(')
        })
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct KeyInformation {
    pub methods: Vec<String>,
    pub results: Vec<String>,
    pub diseases: Vec<String>,
    pub treatments: Vec<String>,
    pub other: Vec<String>,
}

/// Classifies each sentence of `text` and collects lexicon terms.
///
/// A sentence mentioning "method" or "procedure" is a method; otherwise one
/// mentioning "result" or "finding" is a result; anything else is other.
pub fn extract_key_information(text: &str) -> KeyInformation {
    let mut info = KeyInformation::default();

    for sentence in split_sentences(text) {
        let lower = sentence.to_lowercase();
        if lower.contains("method") || lower.contains("procedure") {
            info.methods.push(sentence);
        } else if lower.contains("result") || lower.contains("finding") {
            info.results.push(sentence);
        } else {
            info.other.push(sentence);
        }
    }

    let lower = text.to_lowercase();
    info.diseases = lexicon_hits(&lower, DISEASE_TERMS);
    info.treatments = lexicon_hits(&lower, TREATMENT_TERMS);
    info
}

fn lexicon_hits(lower: &str, terms: &[&str]) -> Vec<String> {
    terms
        .iter()
        .filter(|term| lower.contains(*term))
        .map(|term| term.to_string())
        .collect()
}

/// Splits on `.`, `!` or `?` followed by whitespace, skipping common abbreviations.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(_, next)) = chars.peek() else { break };
        if !next.is_whitespace() {
            continue;
        }
        let end = i + c.len_utf8();
        let candidate = &text[start..end];
        if c == '.' && ends_with_abbreviation(candidate) {
            continue;
        }
        push_trimmed(&mut sentences, candidate);
        start = end;
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if !s.is_empty() {
        out.push(s);
    }
}
