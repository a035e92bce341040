//! Query processing: normalization, intent classification, and entity /
//! time-reference extraction.
//!
//! The processor never fails: unmatched fields come back as empty
//! collections, and any string (including empty input) produces a valid
//! [`ProcessedQuery`]. Extraction heuristics are intentionally simple and
//! live behind the [`EntityExtractor`] trait so a better NLP implementation
//! can be substituted without touching ranking or packing.

use regex::Regex;
use serde::Serialize;

/// Tokens removed during normalization and keyword extraction.
///
/// Interrogatives (who/when/where/what/how) are deliberately absent: they
/// drive intent classification.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "am", "be", "been", "being", "do", "does",
    "did", "i", "my", "me", "mine", "you", "your", "we", "us", "our", "it", "its", "of", "in",
    "on", "at", "to", "for", "with", "and", "or", "not", "this", "that", "these", "those",
    "there", "here", "from", "by", "as", "if", "so", "can", "could", "would", "should", "will",
    "have", "has", "had", "please",
];

/// Fixed typo-correction table for domain terms.
const TYPO_CORRECTIONS: &[(&str, &str)] = &[
    ("calender", "calendar"),
    ("calandar", "calendar"),
    ("meting", "meeting"),
    ("meetting", "meeting"),
    ("shedule", "schedule"),
    ("scheduel", "schedule"),
    ("emial", "email"),
    ("emal", "email"),
    ("contct", "contact"),
    ("tommorow", "tomorrow"),
    ("tomorow", "tomorrow"),
    ("recieved", "received"),
];

/// Classified purpose of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Person,
    Temporal,
    Location,
    Information,
    Procedural,
    Scheduling,
    Communication,
    Crm,
    General,
}

/// Coarse size class of a query, useful to orchestration layers deciding
/// how much context to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

/// Entities pulled out of the raw query text.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractedEntities {
    /// Candidate person names (capitalized two-word sequences).
    pub people: Vec<String>,
    pub emails: Vec<String>,
    /// Absolute date strings as they appeared in the query.
    pub dates: Vec<String>,
}

impl ExtractedEntities {
    pub fn count(&self) -> usize {
        self.people.len() + self.emails.len() + self.dates.len()
    }
}

/// The per-request, ephemeral result of query processing. Recomputed on
/// every call; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedQuery {
    pub original: String,
    /// Lowercased, stop-word-stripped, typo-corrected text.
    pub normalized: String,
    pub intent: Intent,
    pub entities: ExtractedEntities,
    /// Canonicalized time-reference phrases (e.g. `this_week`, `monday`).
    pub time_references: Vec<String>,
    pub complexity: Complexity,
}

/// Pluggable entity/time-reference extraction.
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> ExtractedEntities;
    fn time_references(&self, text: &str) -> Vec<String>;
}

/// Pattern-matching extractor: capitalized pairs for names, regexes for
/// emails and absolute dates, a fixed phrase list for time references.
pub struct HeuristicExtractor {
    email_re: Regex,
    name_re: Regex,
    date_res: Vec<Regex>,
}

const DAY_WORDS: &[&str] = &[
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "today",
    "tomorrow",
    "yesterday",
];

impl HeuristicExtractor {
    pub fn new() -> Self {
        // All patterns are fixed literals; compilation cannot fail at runtime.
        Self {
            email_re: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
                .expect("hardcoded regex"),
            name_re: Regex::new(r"\b[A-Z][a-z]+ [A-Z][a-z]+\b").expect("hardcoded regex"),
            date_res: vec![
                Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("hardcoded regex"),
                Regex::new(r"\b\d{1,2}/\d{1,2}/\d{2,4}\b").expect("hardcoded regex"),
                Regex::new(
                    r"(?i)\b(?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}(?:st|nd|rd|th)?(?:,?\s+\d{4})?\b",
                )
                .expect("hardcoded regex"),
            ],
        }
    }
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor for HeuristicExtractor {
    fn extract(&self, text: &str) -> ExtractedEntities {
        let emails: Vec<String> = self
            .email_re
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();

        let people: Vec<String> = self
            .name_re
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();

        let mut dates: Vec<String> = Vec::new();
        for re in &self.date_res {
            for m in re.find_iter(text) {
                let s = m.as_str().to_string();
                if !dates.contains(&s) {
                    dates.push(s);
                }
            }
        }

        ExtractedEntities {
            people,
            emails,
            dates,
        }
    }

    fn time_references(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut refs = Vec::new();

        for phrase in ["this week", "this month", "this year"] {
            if lower.contains(phrase) {
                refs.push(phrase.replace(' ', "_"));
            }
        }
        if lower.contains("recent") {
            refs.push("recent".to_string());
        }
        for day in DAY_WORDS {
            if lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|tok| tok == *day)
            {
                refs.push((*day).to_string());
            }
        }

        refs
    }
}

/// Turns a raw query string into a [`ProcessedQuery`].
pub struct QueryProcessor {
    extractor: Box<dyn EntityExtractor>,
}

impl QueryProcessor {
    pub fn new() -> Self {
        Self {
            extractor: Box::new(HeuristicExtractor::new()),
        }
    }

    /// Replace the entity extractor (e.g. with a model-backed one).
    pub fn with_extractor(extractor: Box<dyn EntityExtractor>) -> Self {
        Self { extractor }
    }

    pub fn process(&self, raw: &str) -> ProcessedQuery {
        let tokens = normalize_tokens(raw);
        let intent = classify_intent(&tokens);
        let entities = self.extractor.extract(raw);
        let time_references = self.extractor.time_references(raw);
        let word_count = raw.split_whitespace().count();
        let complexity = classify_complexity(word_count, entities.count());

        ProcessedQuery {
            original: raw.to_string(),
            normalized: tokens.join(" "),
            intent,
            entities,
            time_references,
            complexity,
        }
    }
}

impl Default for QueryProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase, strip edge punctuation, drop stop words, apply the typo table.
fn normalize_tokens(raw: &str) -> Vec<String> {
    raw.to_lowercase()
        .split_whitespace()
        .map(|tok| tok.trim_matches(|c: char| !c.is_alphanumeric() && c != '@'))
        .filter(|tok| !tok.is_empty())
        .filter(|tok| !STOP_WORDS.contains(tok))
        .map(|tok| {
            TYPO_CORRECTIONS
                .iter()
                .find(|(wrong, _)| *wrong == tok)
                .map(|(_, right)| (*right).to_string())
                .unwrap_or_else(|| tok.to_string())
        })
        .collect()
}

/// Keyword-driven intent classification, checked in priority order.
/// Interrogatives win over domain keywords, so "when is my meeting"
/// classifies as temporal, not scheduling.
fn classify_intent(tokens: &[String]) -> Intent {
    let has = |word: &str| tokens.iter().any(|t| t == word);

    if has("who") {
        Intent::Person
    } else if has("when") {
        Intent::Temporal
    } else if has("where") {
        Intent::Location
    } else if has("what") {
        Intent::Information
    } else if has("how") {
        Intent::Procedural
    } else if has("schedule") || has("meeting") {
        Intent::Scheduling
    } else if has("email") || has("send") {
        Intent::Communication
    } else if has("contact") || has("crm") {
        Intent::Crm
    } else {
        Intent::General
    }
}

fn classify_complexity(word_count: usize, entity_count: usize) -> Complexity {
    if word_count > 12 || entity_count >= 3 {
        Complexity::Complex
    } else if word_count <= 4 && entity_count == 0 {
        Complexity::Simple
    } else {
        Complexity::Moderate
    }
}
