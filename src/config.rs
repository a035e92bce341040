//! Retrieval tuning configuration.
//!
//! All thresholds, boosts, and budgets live here as named fields with
//! documented defaults, passed into the engine at construction. The scoring
//! constants are empirically chosen tuning defaults, not load-bearing
//! correctness; tests assert ordering properties rather than exact values.

use serde::Deserialize;

/// Top-level configuration for a [`RetrievalEngine`](crate::engine::RetrievalEngine).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ranking: RankingWeights,
    #[serde(default)]
    pub packer: PackerConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
}

impl RetrievalConfig {
    /// Parse a configuration from TOML text. Missing sections and fields
    /// fall back to their documented defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Search-channel parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Result limit when the caller does not supply one.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Hard ceiling on any result limit.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Weight of the keyword channel in hybrid combination:
    /// `combined = vector + keyword × keyword_boost`.
    #[serde(default = "default_keyword_boost")]
    pub keyword_boost: f64,
    /// Maximum significant tokens extracted for keyword search.
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
    /// Width of the "recent" named time range, in days.
    #[serde(default = "default_recent_days")]
    pub recent_days: i64,
    /// Bounded timeout applied to the embedding collaborator.
    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            keyword_boost: default_keyword_boost(),
            max_keywords: default_max_keywords(),
            recent_days: default_recent_days(),
            embed_timeout_secs: default_embed_timeout_secs(),
        }
    }
}

fn default_limit() -> usize {
    15
}
fn default_max_limit() -> usize {
    50
}
fn default_keyword_boost() -> f64 {
    0.2
}
fn default_max_keywords() -> usize {
    5
}
fn default_recent_days() -> i64 {
    7
}
fn default_embed_timeout_secs() -> u64 {
    5
}

/// Relevance-ranking weights.
///
/// `final = similarity + intent_boost + recency_bonus + source_bonus +
/// entity_boost`.
#[derive(Debug, Deserialize, Clone)]
pub struct RankingWeights {
    /// Person-intent queries: boost fragments carrying a person identity.
    #[serde(default = "default_person_intent_boost")]
    pub person_intent_boost: f64,
    /// Communication-intent queries: boost `message` fragments.
    #[serde(default = "default_communication_intent_boost")]
    pub communication_intent_boost: f64,
    /// CRM-intent queries: boost `crm_*` fragments.
    #[serde(default = "default_crm_intent_boost")]
    pub crm_intent_boost: f64,
    /// Recency bonus within 7 days.
    #[serde(default = "default_recency_week")]
    pub recency_week: f64,
    /// Recency bonus within 30 days.
    #[serde(default = "default_recency_month")]
    pub recency_month: f64,
    /// Recency bonus within 90 days.
    #[serde(default = "default_recency_quarter")]
    pub recency_quarter: f64,
    /// Per-source prior favoring richer conversational content.
    #[serde(default = "default_source_message")]
    pub source_message: f64,
    #[serde(default = "default_source_crm")]
    pub source_crm: f64,
    #[serde(default = "default_source_calendar")]
    pub source_calendar: f64,
    /// Boost when an extracted person-name entity matches `person_name`.
    #[serde(default = "default_entity_name_boost")]
    pub entity_name_boost: f64,
    /// Boost when an extracted email entity matches `person_email`.
    #[serde(default = "default_entity_email_boost")]
    pub entity_email_boost: f64,
    /// Person-search relevance tiers (email / name / text / none).
    #[serde(default = "default_person_email_score")]
    pub person_email_score: f64,
    #[serde(default = "default_person_name_score")]
    pub person_name_score: f64,
    #[serde(default = "default_person_text_score")]
    pub person_text_score: f64,
    #[serde(default = "default_person_base_score")]
    pub person_base_score: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            person_intent_boost: default_person_intent_boost(),
            communication_intent_boost: default_communication_intent_boost(),
            crm_intent_boost: default_crm_intent_boost(),
            recency_week: default_recency_week(),
            recency_month: default_recency_month(),
            recency_quarter: default_recency_quarter(),
            source_message: default_source_message(),
            source_crm: default_source_crm(),
            source_calendar: default_source_calendar(),
            entity_name_boost: default_entity_name_boost(),
            entity_email_boost: default_entity_email_boost(),
            person_email_score: default_person_email_score(),
            person_name_score: default_person_name_score(),
            person_text_score: default_person_text_score(),
            person_base_score: default_person_base_score(),
        }
    }
}

fn default_person_intent_boost() -> f64 {
    0.2
}
fn default_communication_intent_boost() -> f64 {
    0.15
}
fn default_crm_intent_boost() -> f64 {
    0.15
}
fn default_recency_week() -> f64 {
    0.10
}
fn default_recency_month() -> f64 {
    0.05
}
fn default_recency_quarter() -> f64 {
    0.02
}
fn default_source_message() -> f64 {
    0.05
}
fn default_source_crm() -> f64 {
    0.03
}
fn default_source_calendar() -> f64 {
    0.02
}
fn default_entity_name_boost() -> f64 {
    0.1
}
fn default_entity_email_boost() -> f64 {
    0.15
}
fn default_person_email_score() -> f64 {
    1.0
}
fn default_person_name_score() -> f64 {
    0.9
}
fn default_person_text_score() -> f64 {
    0.7
}
fn default_person_base_score() -> f64 {
    0.3
}

/// Context-window packing parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct PackerConfig {
    /// Token budget for the packed fragment set.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Approximate tokens per whitespace-separated word.
    #[serde(default = "default_tokens_per_word")]
    pub tokens_per_word: f64,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            tokens_per_word: default_tokens_per_word(),
        }
    }
}

fn default_context_window() -> usize {
    4000
}
fn default_tokens_per_word() -> f64 {
    1.3
}

/// Answer-synthesis parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    /// Fragments scoring below this are not narrated or cited.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Per-style caps on how many fragments are narrated.
    #[serde(default = "default_comprehensive_max")]
    pub comprehensive_max: usize,
    #[serde(default = "default_concise_max")]
    pub concise_max: usize,
    #[serde(default = "default_bullet_max")]
    pub bullet_max: usize,
    #[serde(default = "default_conversational_max")]
    pub conversational_max: usize,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            comprehensive_max: default_comprehensive_max(),
            concise_max: default_concise_max(),
            bullet_max: default_bullet_max(),
            conversational_max: default_conversational_max(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.7
}
fn default_comprehensive_max() -> usize {
    10
}
fn default_concise_max() -> usize {
    3
}
fn default_bullet_max() -> usize {
    10
}
fn default_conversational_max() -> usize {
    5
}
