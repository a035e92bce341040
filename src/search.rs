//! Similarity search: vector, keyword fallback, hybrid combination,
//! temporal bounding, and person lookup.
//!
//! Every channel returns a flat list of [`ScoredFragment`]s; strategy choice
//! changes which channels and filters are used, never the downstream
//! ranking, packing, or synthesis logic.
//!
//! # Keyword fallback
//!
//! Used when no query embedding is available (embedding-service failure or
//! no embedder configured). Up to 5 significant tokens are extracted from
//! the query; the store scans for the first token as a case-insensitive
//! substring, and the remaining tokens are required conjunctively, producing
//! a smaller result set. Scoring rewards dense, keyword-rich short-to-medium
//! fragments: `matched / total × min(word_count / 100, 1.0)`. This is a
//! coarse approximation, not an inverted index.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::config::{RankingWeights, SearchConfig};
use crate::error::{RetrievalError, RetrievalResult};
use crate::models::Fragment;
use crate::query::STOP_WORDS;
use crate::store::{FragmentStore, ScalarFilters, ScoredFragment};

/// A resolved, inclusive time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Caller-supplied time-range request, resolved against a reference clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeRangeSpec {
    /// `recent`, `this_week`, `this_month`, `this_year`. Unrecognized names
    /// fall back to `recent`.
    Named(String),
    /// Two `YYYY-MM-DD` date strings, inclusive on both ends.
    Custom { start: String, end: String },
}

fn utc_day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

impl TimeRange {
    /// Resolve a named range against the reference clock `now`.
    ///
    /// `recent` looks back `recent_days`; the `this_*` ranges cover the
    /// calendar period containing `now`. Unrecognized names resolve to
    /// `recent` rather than failing.
    pub fn named(name: &str, now: DateTime<Utc>, recent_days: i64) -> TimeRange {
        let today = now.date_naive();
        match name {
            "this_week" => {
                let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                TimeRange {
                    start: utc_day_start(monday),
                    end: utc_day_start(monday + Duration::days(7)) - Duration::seconds(1),
                }
            }
            "this_month" => {
                let first = today - Duration::days(today.day0() as i64);
                // Adding 32 days always lands in the following month.
                let overshoot = first + Duration::days(32);
                let next_first = overshoot - Duration::days(overshoot.day0() as i64);
                TimeRange {
                    start: utc_day_start(first),
                    end: utc_day_start(next_first) - Duration::seconds(1),
                }
            }
            "this_year" => {
                let jan1 = today - Duration::days(today.ordinal0() as i64);
                let overshoot = jan1 + Duration::days(366);
                let next_jan1 = overshoot - Duration::days(overshoot.ordinal0() as i64);
                TimeRange {
                    start: utc_day_start(jan1),
                    end: utc_day_start(next_jan1) - Duration::seconds(1),
                }
            }
            _ => TimeRange {
                start: now - Duration::days(recent_days),
                end: now,
            },
        }
    }

    /// Resolve a caller-supplied spec. Custom ranges with malformed dates
    /// fail the request, not the process.
    pub fn resolve(
        spec: &TimeRangeSpec,
        now: DateTime<Utc>,
        recent_days: i64,
    ) -> RetrievalResult<TimeRange> {
        match spec {
            TimeRangeSpec::Named(name) => Ok(TimeRange::named(name, now, recent_days)),
            TimeRangeSpec::Custom { start, end } => {
                let start_date = parse_date(start)?;
                let end_date = parse_date(end)?;
                if start_date > end_date {
                    return Err(RetrievalError::InvalidTimeRange(format!(
                        "start {start} is after end {end}"
                    )));
                }
                Ok(TimeRange {
                    start: utc_day_start(start_date),
                    end: utc_day_start(end_date + Duration::days(1)) - Duration::seconds(1),
                })
            }
        }
    }
}

fn parse_date(value: &str) -> RetrievalResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| RetrievalError::InvalidDate {
        value: value.to_string(),
    })
}

/// Extract up to `max` significant tokens: longer than two characters,
/// stop words removed, first occurrence wins.
pub fn significant_tokens(text: &str, max: usize) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for raw in text.to_lowercase().split_whitespace() {
        let tok = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '@');
        if tok.len() <= 2 || STOP_WORDS.contains(&tok) {
            continue;
        }
        if !tokens.iter().any(|t| t == tok) {
            tokens.push(tok.to_string());
        }
        if tokens.len() >= max {
            break;
        }
    }
    tokens
}

/// Keyword relevance: coverage of the extracted tokens, damped for very
/// short fragments.
pub fn keyword_score(text: &str, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let lower = text.to_lowercase();
    let matched = keywords.iter().filter(|k| lower.contains(k.as_str())).count();
    let word_count = text.split_whitespace().count();
    let density = (word_count as f64 / 100.0).min(1.0);
    matched as f64 / keywords.len() as f64 * density
}

/// Order candidates by similarity descending, then recency, then id, so
/// equal-scored results are deterministic.
pub(crate) fn sort_candidates(candidates: &mut [ScoredFragment]) {
    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.fragment.created_at.cmp(&a.fragment.created_at))
            .then_with(|| a.fragment.id.cmp(&b.fragment.id))
    });
}

/// Conjunctive keyword search (the embedding-free fallback channel).
pub async fn keyword_channel<S: FragmentStore>(
    store: &S,
    owner: &str,
    query_text: &str,
    filters: &ScalarFilters,
    limit: usize,
    config: &SearchConfig,
) -> RetrievalResult<Vec<ScoredFragment>> {
    let tokens = significant_tokens(query_text, config.max_keywords);
    let Some(first) = tokens.first() else {
        return Ok(Vec::new());
    };

    // Over-fetch on the first token; the conjunctive pass below narrows.
    let candidates = store
        .keyword_scan(owner, first, filters, config.max_limit)
        .await?;

    let rest = &tokens[1..];
    let mut scored: Vec<ScoredFragment> = candidates
        .into_iter()
        .filter(|f| {
            let lower = f.text.to_lowercase();
            rest.iter().all(|t| lower.contains(t.as_str()))
        })
        .map(|f| ScoredFragment {
            similarity: keyword_score(&f.text, &tokens),
            fragment: f,
        })
        .collect();

    sort_candidates(&mut scored);
    scored.truncate(limit);
    Ok(scored)
}

/// Hybrid search: vector and keyword channels unioned by fragment id,
/// `combined = vector + keyword × keyword_boost`.
///
/// With no query vector this degrades to the keyword channel alone.
pub async fn hybrid_channel<S: FragmentStore>(
    store: &S,
    owner: &str,
    query_text: &str,
    query_vec: Option<&[f32]>,
    filters: &ScalarFilters,
    limit: usize,
    config: &SearchConfig,
) -> RetrievalResult<Vec<ScoredFragment>> {
    let vector_hits = match query_vec {
        Some(qv) => store.vector_search(owner, qv, filters, limit).await?,
        None => Vec::new(),
    };
    let keyword_hits = keyword_channel(store, owner, query_text, filters, limit, config).await?;

    let mut combined: HashMap<String, ScoredFragment> = HashMap::new();
    for hit in vector_hits {
        combined.insert(hit.fragment.id.clone(), hit);
    }
    for hit in keyword_hits {
        let boosted = hit.similarity * config.keyword_boost;
        combined
            .entry(hit.fragment.id.clone())
            .and_modify(|existing| existing.similarity += boosted)
            .or_insert(ScoredFragment {
                similarity: boosted,
                fragment: hit.fragment,
            });
    }

    let mut merged: Vec<ScoredFragment> = combined.into_values().collect();
    sort_candidates(&mut merged);
    merged.truncate(limit);
    Ok(merged)
}

/// Vector search bounded by a `created_at` window, falling back to keyword
/// search inside the same window when no query vector is available.
pub async fn temporal_channel<S: FragmentStore>(
    store: &S,
    owner: &str,
    query_text: &str,
    query_vec: Option<&[f32]>,
    range: TimeRange,
    base_filters: &ScalarFilters,
    limit: usize,
    config: &SearchConfig,
) -> RetrievalResult<Vec<ScoredFragment>> {
    let mut filters = base_filters.clone();
    filters.created_after = Some(range.start);
    filters.created_before = Some(range.end);

    match query_vec {
        Some(qv) => Ok(store.vector_search(owner, qv, &filters, limit).await?),
        None => keyword_channel(store, owner, query_text, &filters, limit, config).await,
    }
}

/// Person lookup: store-side substring scan, then tiered relevance scoring.
///
/// The store returns matches in recency order; the tier score (email match
/// over name match over bare text mention) becomes the candidate's
/// similarity for the ranking stage.
pub async fn person_channel<S: FragmentStore>(
    store: &S,
    owner: &str,
    needle: &str,
    limit: usize,
    weights: &RankingWeights,
) -> RetrievalResult<Vec<ScoredFragment>> {
    let matches = store.person_scan(owner, needle, limit).await?;
    Ok(matches
        .into_iter()
        .map(|f| ScoredFragment {
            similarity: person_relevance(&f, needle, weights),
            fragment: f,
        })
        .collect())
}

fn person_relevance(fragment: &Fragment, needle: &str, weights: &RankingWeights) -> f64 {
    let needle = needle.to_lowercase();
    if fragment
        .person_email
        .as_deref()
        .is_some_and(|e| e.to_lowercase().contains(&needle))
    {
        weights.person_email_score
    } else if fragment
        .person_name
        .as_deref()
        .is_some_and(|n| n.to_lowercase().contains(&needle))
    {
        weights.person_name_score
    } else if fragment.text.to_lowercase().contains(&needle) {
        weights.person_text_score
    } else {
        weights.person_base_score
    }
}
