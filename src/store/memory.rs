//! In-memory [`FragmentStore`] implementation.
//!
//! Reference backend for tests and for embedding the engine into host
//! applications without external storage. Uses a `Vec` behind
//! `std::sync::RwLock`; vector search is brute-force cosine similarity over
//! all stored embeddings. Reads take the lock only long enough to snapshot
//! matching fragments, so concurrent queries across owners never contend on
//! anything but the map itself.

use std::cmp::Ordering;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::embedding::cosine_similarity;
use crate::error::StoreError;
use crate::models::{Fragment, FragmentDraft, SourceType};

use super::{FragmentStore, ScalarFilters, ScoredFragment};

/// In-memory fragment store.
#[derive(Default)]
pub struct InMemoryStore {
    fragments: RwLock<Vec<Fragment>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total fragment count across all owners (test helper).
    pub fn len(&self) -> usize {
        self.fragments.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Recency ordering used by every scan: newest first, id ascending as a
/// deterministic tie-break.
fn by_recency(a: &Fragment, b: &Fragment) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl FragmentStore for InMemoryStore {
    async fn upsert(&self, draft: FragmentDraft) -> Result<String, StoreError> {
        if draft.text.trim().is_empty() {
            return Err(StoreError::InvalidDraft(format!(
                "empty text for {}/{}",
                draft.source_type, draft.source_id
            )));
        }

        let fragment = Fragment {
            id: Uuid::new_v4().to_string(),
            owner: draft.owner,
            source_type: draft.source_type,
            source_id: draft.source_id,
            text: draft.text,
            embedding: None,
            person_email: draft.person_email,
            person_name: draft.person_name,
            metadata: draft.metadata,
            created_at: draft.created_at,
        };
        let id = fragment.id.clone();

        let mut fragments = self.fragments.write().unwrap();
        fragments.retain(|f| {
            !(f.owner == fragment.owner
                && f.source_type == fragment.source_type
                && f.source_id == fragment.source_id)
        });
        fragments.push(fragment);
        Ok(id)
    }

    async fn attach_embedding(
        &self,
        owner: &str,
        fragment_id: &str,
        vector: Vec<f32>,
    ) -> Result<(), StoreError> {
        let mut fragments = self.fragments.write().unwrap();
        match fragments
            .iter_mut()
            .find(|f| f.owner == owner && f.id == fragment_id)
        {
            Some(fragment) => {
                fragment.embedding = Some(vector);
                Ok(())
            }
            None => Err(StoreError::NotFound(fragment_id.to_string())),
        }
    }

    async fn delete_source(
        &self,
        owner: &str,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<usize, StoreError> {
        let mut fragments = self.fragments.write().unwrap();
        let before = fragments.len();
        fragments.retain(|f| {
            !(f.owner == owner && f.source_type == source_type && f.source_id == source_id)
        });
        Ok(before - fragments.len())
    }

    async fn vector_search(
        &self,
        owner: &str,
        query_vec: &[f32],
        filters: &ScalarFilters,
        limit: usize,
    ) -> Result<Vec<ScoredFragment>, StoreError> {
        let fragments = self.fragments.read().unwrap();
        let mut scored: Vec<ScoredFragment> = fragments
            .iter()
            .filter(|f| f.owner == owner && filters.matches(f))
            .filter_map(|f| {
                f.embedding.as_ref().map(|emb| ScoredFragment {
                    similarity: cosine_similarity(query_vec, emb) as f64,
                    fragment: f.clone(),
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| by_recency(&a.fragment, &b.fragment))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn keyword_scan(
        &self,
        owner: &str,
        token: &str,
        filters: &ScalarFilters,
        limit: usize,
    ) -> Result<Vec<Fragment>, StoreError> {
        let needle = token.to_lowercase();
        let fragments = self.fragments.read().unwrap();
        let mut matched: Vec<Fragment> = fragments
            .iter()
            .filter(|f| {
                f.owner == owner
                    && filters.matches(f)
                    && f.text.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        matched.sort_by(by_recency);
        matched.truncate(limit);
        Ok(matched)
    }

    async fn person_scan(
        &self,
        owner: &str,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<Fragment>, StoreError> {
        let needle = needle.to_lowercase();
        let fragments = self.fragments.read().unwrap();
        let mut matched: Vec<Fragment> = fragments
            .iter()
            .filter(|f| {
                f.owner == owner
                    && (f.person_email
                        .as_deref()
                        .is_some_and(|e| e.to_lowercase().contains(&needle))
                        || f.person_name
                            .as_deref()
                            .is_some_and(|n| n.to_lowercase().contains(&needle))
                        || f.text.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        matched.sort_by(by_recency);
        matched.truncate(limit);
        Ok(matched)
    }

    async fn fetch(
        &self,
        owner: &str,
        filters: &ScalarFilters,
        limit: usize,
    ) -> Result<Vec<Fragment>, StoreError> {
        let fragments = self.fragments.read().unwrap();
        let mut matched: Vec<Fragment> = fragments
            .iter()
            .filter(|f| f.owner == owner && filters.matches(f))
            .cloned()
            .collect();
        matched.sort_by(by_recency);
        matched.truncate(limit);
        Ok(matched)
    }
}
