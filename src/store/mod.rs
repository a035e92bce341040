//! Storage abstraction for fragments.
//!
//! The [`FragmentStore`] trait defines every storage operation the retrieval
//! pipeline needs, enabling pluggable backends. Implementations must be
//! `Send + Sync`, must enforce owner scoping by predicate (never by
//! serialization), and must never block one owner's reads on another's.
//!
//! The backend is assumed to support approximate nearest-neighbor search by
//! vector and exact filtering by scalar attributes. The single-token
//! substring scan ([`FragmentStore::keyword_scan`]) is a primitive; the
//! conjunctive refinement and scoring on top of it live in
//! [`crate::search`].

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{Fragment, FragmentDraft, SourceType};

/// Scalar predicates applied inside the store.
///
/// All fields are conjunctive; `None` means "no constraint".
#[derive(Debug, Clone, Default)]
pub struct ScalarFilters {
    /// Restrict to fragments whose source type is in this set.
    pub source_types: Option<Vec<SourceType>>,
    /// Exact (case-insensitive) person email match.
    pub person_email: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub created_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub created_before: Option<DateTime<Utc>>,
    /// Restrict to fragments whose id is in this set.
    pub ids: Option<Vec<String>>,
}

impl ScalarFilters {
    /// Evaluate the predicates against a fragment. Owner scoping is the
    /// store's responsibility and is not part of this check.
    pub fn matches(&self, fragment: &Fragment) -> bool {
        if let Some(types) = &self.source_types {
            if !types.contains(&fragment.source_type) {
                return false;
            }
        }
        if let Some(email) = &self.person_email {
            match &fragment.person_email {
                Some(frag_email) if frag_email.eq_ignore_ascii_case(email) => {}
                _ => return false,
            }
        }
        if let Some(after) = self.created_after {
            if fragment.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if fragment.created_at > before {
                return false;
            }
        }
        if let Some(ids) = &self.ids {
            if !ids.iter().any(|id| id == &fragment.id) {
                return false;
            }
        }
        true
    }
}

/// A fragment paired with the backend's similarity score for the query
/// vector (cosine similarity, higher is closer).
#[derive(Debug, Clone)]
pub struct ScoredFragment {
    pub fragment: Fragment,
    pub similarity: f64,
}

/// Abstract fragment storage.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](FragmentStore::upsert) | Idempotent insert/replace keyed on `(owner, source_type, source_id)` |
/// | [`attach_embedding`](FragmentStore::attach_embedding) | Attach the async-computed vector |
/// | [`delete_source`](FragmentStore::delete_source) | Remove fragments for a deleted origin record |
/// | [`vector_search`](FragmentStore::vector_search) | Nearest-neighbor search with scalar filters |
/// | [`keyword_scan`](FragmentStore::keyword_scan) | Single-token substring scan, recency-ordered |
/// | [`person_scan`](FragmentStore::person_scan) | Substring match over person identity or text |
/// | [`fetch`](FragmentStore::fetch) | Plain scalar-filtered scan, recency-ordered |
#[async_trait]
pub trait FragmentStore: Send + Sync {
    /// Insert or replace the fragment for the draft's
    /// `(owner, source_type, source_id)` key. Re-ingesting the same original
    /// record updates rather than duplicates. Returns the stored fragment id.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidDraft`] when the draft text is empty.
    async fn upsert(&self, draft: FragmentDraft) -> Result<String, StoreError>;

    /// Attach an embedding vector to an existing fragment.
    async fn attach_embedding(
        &self,
        owner: &str,
        fragment_id: &str,
        vector: Vec<f32>,
    ) -> Result<(), StoreError>;

    /// Delete all fragments for an origin record. Returns how many were
    /// removed (zero is not an error).
    async fn delete_source(
        &self,
        owner: &str,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<usize, StoreError>;

    /// Nearest-neighbor search over fragments with a non-null embedding,
    /// restricted by `filters`, ordered by descending cosine similarity
    /// (ascending distance), capped at `limit`.
    async fn vector_search(
        &self,
        owner: &str,
        query_vec: &[f32],
        filters: &ScalarFilters,
        limit: usize,
    ) -> Result<Vec<ScoredFragment>, StoreError>;

    /// Case-insensitive substring scan for a single token, restricted by
    /// `filters`, ordered by `created_at` descending.
    async fn keyword_scan(
        &self,
        owner: &str,
        token: &str,
        filters: &ScalarFilters,
        limit: usize,
    ) -> Result<Vec<Fragment>, StoreError>;

    /// Case-insensitive substring match against `person_email`,
    /// `person_name`, or `text`, ordered by `created_at` descending.
    async fn person_scan(
        &self,
        owner: &str,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<Fragment>, StoreError>;

    /// Scalar-filtered scan ordered by `created_at` descending.
    async fn fetch(
        &self,
        owner: &str,
        filters: &ScalarFilters,
        limit: usize,
    ) -> Result<Vec<Fragment>, StoreError>;
}
