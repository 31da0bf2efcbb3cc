//! Output recovery: turns free-form model text into schema-valid records.
//!
//! Extraction never fails the caller. Every path ends in either
//! `Extracted(record)` or `Fallback(default_record)`, so the pipeline can
//! always produce a response regardless of how malformed the model output is.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A recovered record plus its provenance.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    /// Recovered from the model output.
    Extracted(T),
    /// The documented default substituted for unrecoverable output.
    Fallback(T),
}

impl<T> Extraction<T> {
    pub fn into_inner(self) -> T {
        match self {
            Extraction::Extracted(value) | Extraction::Fallback(value) => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Extraction::Fallback(_))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Line-selection strategy (persona)
// ────────────────────────────────────────────────────────────────────────────

/// Minimum length for a line to count as a plausible persona summary.
const PERSONA_MIN_LEN: usize = 50;

/// Picks the best persona line out of raw model output.
///
/// Prefers the first line that starts with the subject's name and exceeds the
/// length threshold (the model followed the requested format); otherwise the
/// last sufficiently long line containing both `(` and `)`. Returns `None`
/// when nothing qualifies, which triggers the pipeline's fallback persona.
pub fn extract_persona_line(raw: &str, name: &str) -> Option<String> {
    let mut best: Option<String> = None;

    for line in raw.lines() {
        let line = line.trim_matches(|c: char| c.is_whitespace() || c == '"');

        // Empty lines, fence markers, and the prompt echo are never personas.
        if line.is_empty() || line == "```" || line.contains("Persona:") {
            continue;
        }

        if line.starts_with(name) && line.len() > PERSONA_MIN_LEN {
            return Some(line.to_string());
        }

        if line.len() > PERSONA_MIN_LEN && line.contains('(') && line.contains(')') {
            best = Some(line.to_string());
        }
    }

    best
}

/// Deterministic persona synthesized directly from the request fields when
/// extraction comes up empty.
pub fn fallback_persona(name: &str, position: &str, department: &str, language: &str) -> String {
    format!(
        "{name} ({position}, {department}). Preferred language: {language}. \
         Professional tone inferred from writing samples. Direct communication style."
    )
}

// ────────────────────────────────────────────────────────────────────────────
// JSON-recovery strategy (CV / draft reply / classification)
// ────────────────────────────────────────────────────────────────────────────

/// Locates the candidate JSON span: past a ```json fence if present, else
/// from the first `{`, through the last `}`. Strips trailing backticks and
/// whitespace and normalizes U+00A0 to plain spaces.
fn locate_json_span(raw: &str) -> Option<String> {
    let start = match raw.find("```json") {
        Some(fence) => {
            let after = fence + "```json".len();
            after
                + raw[after..]
                    .find(|c: char| !matches!(c, '\n' | '\r' | ' '))
                    .unwrap_or(0)
        }
        None => raw.find('{')?,
    };
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }

    let span = raw[start..=end].trim_end_matches(['`', '\n', '\r', ' ']);
    Some(span.replace('\u{00A0}', " "))
}

/// Parses the located span into `T`; `None` on absent markers or parse
/// failure.
fn recover_json<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let span = locate_json_span(raw)?;
    match serde_json::from_str(&span) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, span = %span, "model output is not valid JSON");
            None
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// CV metadata
// ────────────────────────────────────────────────────────────────────────────

fn unknown() -> String {
    "Unknown".to_string()
}

/// Fixed 5-field CV schema. Fields missing from an otherwise valid object
/// take their defaults individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvMetadata {
    #[serde(default = "unknown")]
    pub name: String,
    #[serde(default = "unknown")]
    pub position: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default = "unknown")]
    pub experience: String,
    #[serde(default = "unknown")]
    pub education: String,
}

impl Default for CvMetadata {
    fn default() -> Self {
        Self {
            name: unknown(),
            position: unknown(),
            skills: Vec::new(),
            experience: unknown(),
            education: unknown(),
        }
    }
}

pub fn parse_cv_metadata(raw: &str) -> Extraction<CvMetadata> {
    match recover_json(raw) {
        Some(metadata) => Extraction::Extracted(metadata),
        None => Extraction::Fallback(CvMetadata::default()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Draft reply
// ────────────────────────────────────────────────────────────────────────────

fn fallback_subject() -> String {
    "Re: [Subject]".to_string()
}

fn fallback_reply() -> String {
    "Unable to generate reply. Please try again.".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftReply {
    #[serde(default = "fallback_subject")]
    pub subject: String,
    #[serde(default = "fallback_reply")]
    pub draft_reply: String,
}

impl Default for DraftReply {
    fn default() -> Self {
        Self {
            subject: fallback_subject(),
            draft_reply: fallback_reply(),
        }
    }
}

pub fn parse_draft_reply(raw: &str) -> Extraction<DraftReply> {
    match recover_json(raw) {
        Some(reply) => Extraction::Extracted(reply),
        None => Extraction::Fallback(DraftReply::default()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Classification
// ────────────────────────────────────────────────────────────────────────────

pub const CATEGORIES: [&str; 4] = [
    "Urgent & Action Required",
    "Normal Follow-up",
    "FYI / Low Priority",
    "Spam",
];

const DEFAULT_CATEGORY: &str = "FYI / Low Priority";
const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub category: String,
    pub confidence: f64,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY.to_string(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    category: Option<String>,
    confidence: Option<f64>,
}

/// Recovers a classification and forces it into schema: category must be one
/// of the four fixed values, confidence is clamped to `[0.0, 1.0]`.
pub fn parse_classification(raw: &str) -> Extraction<Classification> {
    let Some(parsed) = recover_json::<RawClassification>(raw) else {
        return Extraction::Fallback(Classification::default());
    };

    let category = match parsed.category {
        Some(category) if CATEGORIES.contains(&category.as_str()) => category,
        _ => DEFAULT_CATEGORY.to_string(),
    };
    let confidence = parsed
        .confidence
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0);

    Extraction::Extracted(Classification {
        category,
        confidence,
    })
}
