//! Core data models for the retrieval pipeline.
//!
//! These types represent the fragments, drafts, and ranked results that flow
//! through ingestion and retrieval. Everything here is a plain typed struct;
//! only [`Fragment::metadata`] stays an open string-keyed map, because its
//! contents are genuinely source-specific (subject lines, event times,
//! lifecycle stages) and are used for formatting, never for ranking math.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a fragment came from.
///
/// Closed set of origin systems. Re-ingestion and deletion are keyed on
/// `(owner, source_type, source_id)`, so the tag participates in identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Message,
    CalendarEvent,
    CrmContact,
    CrmNote,
    Document,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Message => "message",
            SourceType::CalendarEvent => "calendar_event",
            SourceType::CrmContact => "crm_contact",
            SourceType::CrmNote => "crm_note",
            SourceType::Document => "document",
        }
    }

    /// True for CRM-family sources (`crm_contact`, `crm_note`).
    pub fn is_crm(&self) -> bool {
        matches!(self, SourceType::CrmContact | SourceType::CrmNote)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored unit of retrieval.
///
/// Fragments are created by an external chunking collaborator as drafts
/// (no embedding), receive their embedding asynchronously, and are
/// immutable afterwards except for re-ingestion upserts or deletion.
#[derive(Debug, Clone, Serialize)]
pub struct Fragment {
    /// Store-assigned stable identifier.
    pub id: String,
    /// Tenant the fragment belongs to. Every operation is owner-scoped.
    pub owner: String,
    pub source_type: SourceType,
    /// Identifier of the original record in its source system.
    pub source_id: String,
    /// Searchable body. Always non-empty; the store rejects empty drafts.
    pub text: String,
    /// Present only after the asynchronous embedding step completes.
    /// Absence degrades retrieval to keyword matching, never crashes it.
    pub embedding: Option<Vec<f32>>,
    /// Denormalized identity of the fragment's primary associated person.
    pub person_email: Option<String>,
    pub person_name: Option<String>,
    /// Source-specific attributes used by formatting and filtering.
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl Fragment {
    /// True if the fragment carries any person identity.
    pub fn has_person(&self) -> bool {
        self.person_email.is_some() || self.person_name.is_some()
    }
}

/// Input to [`FragmentStore::upsert`](crate::store::FragmentStore::upsert).
///
/// Produced by the chunking collaborator. Upserting a draft replaces any
/// prior fragment sharing `(owner, source_type, source_id)`.
#[derive(Debug, Clone)]
pub struct FragmentDraft {
    pub owner: String,
    pub source_type: SourceType,
    pub source_id: String,
    pub text: String,
    pub person_email: Option<String>,
    pub person_name: Option<String>,
    pub metadata: HashMap<String, String>,
    /// Timestamp of the original record, supplied by the producer.
    pub created_at: DateTime<Utc>,
}

impl FragmentDraft {
    pub fn new(
        owner: impl Into<String>,
        source_type: SourceType,
        source_id: impl Into<String>,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            owner: owner.into(),
            source_type,
            source_id: source_id.into(),
            text: text.into(),
            person_email: None,
            person_name: None,
            metadata: HashMap::new(),
            created_at,
        }
    }

    pub fn with_person(
        mut self,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        self.person_name = Some(name.into());
        self.person_email = Some(email.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A fragment plus its request-scoped scoring breakdown.
///
/// Never persisted; rebuilt on every retrieval. The component fields are
/// kept so callers can explain why a fragment ranked where it did.
#[derive(Debug, Clone, Serialize)]
pub struct RankedFragment {
    pub fragment: Fragment,
    /// Raw score from the search channel (cosine similarity, keyword
    /// density, or person-relevance).
    pub similarity_score: f64,
    pub intent_boost: f64,
    pub recency_bonus: f64,
    pub source_bonus: f64,
    pub entity_boost: f64,
    /// Sum of all components. Results are ordered by this, descending.
    pub final_score: f64,
    /// Approximate token footprint used by the context packer.
    pub token_estimate: usize,
}
