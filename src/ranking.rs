//! Multi-factor relevance ranking.
//!
//! `final = similarity + intent_boost + recency_bonus + source_bonus +
//! entity_boost`. The individual components are kept on each
//! [`RankedFragment`] so callers can explain an ordering. Ties break by
//! `created_at` descending, then id, making the full order deterministic.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::config::RankingWeights;
use crate::models::{RankedFragment, SourceType};
use crate::query::{Intent, ProcessedQuery};
use crate::store::ScoredFragment;

/// Scores and orders search candidates for one request.
pub struct RelevanceRanker {
    weights: RankingWeights,
}

impl RelevanceRanker {
    pub fn new(weights: RankingWeights) -> Self {
        Self { weights }
    }

    /// Score all candidates against the processed query and sort them.
    pub fn rank(
        &self,
        candidates: Vec<ScoredFragment>,
        query: &ProcessedQuery,
        now: DateTime<Utc>,
    ) -> Vec<RankedFragment> {
        let mut ranked: Vec<RankedFragment> = candidates
            .into_iter()
            .map(|c| self.score(c, query, now))
            .collect();

        ranked.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.fragment.created_at.cmp(&a.fragment.created_at))
                .then_with(|| a.fragment.id.cmp(&b.fragment.id))
        });
        ranked
    }

    fn score(
        &self,
        candidate: ScoredFragment,
        query: &ProcessedQuery,
        now: DateTime<Utc>,
    ) -> RankedFragment {
        let w = &self.weights;
        let fragment = candidate.fragment;

        let intent_boost = match query.intent {
            Intent::Person if fragment.has_person() => w.person_intent_boost,
            Intent::Communication if fragment.source_type == SourceType::Message => {
                w.communication_intent_boost
            }
            Intent::Crm if fragment.source_type.is_crm() => w.crm_intent_boost,
            _ => 0.0,
        };

        // Future-dated fragments count as fully recent.
        let age_days = (now - fragment.created_at).num_days();
        let recency_bonus = if age_days <= 7 {
            w.recency_week
        } else if age_days <= 30 {
            w.recency_month
        } else if age_days <= 90 {
            w.recency_quarter
        } else {
            0.0
        };

        let source_bonus = match fragment.source_type {
            SourceType::Message => w.source_message,
            SourceType::CrmContact | SourceType::CrmNote => w.source_crm,
            SourceType::CalendarEvent => w.source_calendar,
            SourceType::Document => 0.0,
        };

        let name_match = fragment.person_name.as_deref().is_some_and(|name| {
            query
                .entities
                .people
                .iter()
                .any(|entity| mutual_contains(name, entity))
        });
        let email_match = fragment.person_email.as_deref().is_some_and(|email| {
            query
                .entities
                .emails
                .iter()
                .any(|entity| mutual_contains(email, entity))
        });
        let entity_boost = if name_match { w.entity_name_boost } else { 0.0 }
            + if email_match { w.entity_email_boost } else { 0.0 };

        let similarity_score = candidate.similarity;
        let final_score =
            similarity_score + intent_boost + recency_bonus + source_bonus + entity_boost;

        RankedFragment {
            fragment,
            similarity_score,
            intent_boost,
            recency_bonus,
            source_bonus,
            entity_boost,
            final_score,
            token_estimate: 0,
        }
    }
}

/// Case-insensitive substring match in either direction, so "Sara Smith"
/// matches a fragment tagged just "Sara" and vice versa.
fn mutual_contains(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}
