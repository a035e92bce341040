//! The retrieval pipeline entry point.
//!
//! `query → process → dispatch → search → rank → pack → (synthesize)`.
//!
//! The engine is a pure read path: nothing here mutates the store, and any
//! number of requests may run concurrently for the same or different
//! owners. The embedding collaborator is the only suspension point; it runs
//! under a bounded timeout, and failure or timeout downgrades the request
//! to keyword search instead of failing it. A caller-supplied deadline is
//! checked before every external call.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::answer::{AnswerStyle, AnswerSynthesizer, SynthesizedAnswer};
use crate::config::RetrievalConfig;
use crate::embedding::QueryEmbedder;
use crate::error::{RetrievalError, RetrievalResult};
use crate::models::{RankedFragment, SourceType};
use crate::packer::ContextPacker;
use crate::query::{EntityExtractor, ProcessedQuery, QueryProcessor};
use crate::ranking::RelevanceRanker;
use crate::search::{
    self, hybrid_channel, keyword_channel, person_channel, temporal_channel, TimeRange,
    TimeRangeSpec,
};
use crate::store::{FragmentStore, ScalarFilters, ScoredFragment};
use crate::strategy::{self, Strategy};

/// Per-request knobs. Everything is optional; defaults come from the
/// engine's [`RetrievalConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    /// Result cap, clamped to the configured hard ceiling.
    pub max_results: Option<usize>,
    /// Restrict results to these source types.
    pub source_filter: Option<Vec<SourceType>>,
    /// Restrict results to fragments with this person email.
    pub person_filter: Option<String>,
    /// Time window applied to all strategies; for temporal queries it wins
    /// over ranges derived from the query text.
    pub time_range: Option<TimeRangeSpec>,
    /// Answer rendering style (only used by [`RetrievalEngine::answer`]).
    pub style: AnswerStyle,
    /// Reference clock for recency scoring and named time ranges.
    /// Defaults to the current instant.
    pub reference_time: Option<DateTime<Utc>>,
    /// Cancellation deadline, checked before each external call.
    pub deadline: Option<DateTime<Utc>>,
}

/// Ranked, budget-packed context for callers that do their own narration.
#[derive(Debug, Clone)]
pub struct RankedContext {
    pub fragments: Vec<RankedFragment>,
    pub total_tokens: usize,
    /// True when the request fell back to keyword search because the
    /// embedding collaborator failed or timed out.
    pub degraded: bool,
}

/// Orchestrates the full retrieval pipeline over a [`FragmentStore`].
pub struct RetrievalEngine<S> {
    store: S,
    embedder: Option<Arc<dyn QueryEmbedder>>,
    processor: QueryProcessor,
    ranker: RelevanceRanker,
    packer: ContextPacker,
    synthesizer: AnswerSynthesizer,
    config: RetrievalConfig,
}

impl<S: FragmentStore> RetrievalEngine<S> {
    /// Engine without an embedder: every request uses the keyword channel.
    pub fn new(store: S, config: RetrievalConfig) -> Self {
        Self {
            ranker: RelevanceRanker::new(config.ranking.clone()),
            packer: ContextPacker::new(config.packer.clone()),
            synthesizer: AnswerSynthesizer::new(config.answer.clone()),
            processor: QueryProcessor::new(),
            embedder: None,
            store,
            config,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn QueryEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Swap in a different entity extractor (e.g. a model-backed one).
    pub fn with_extractor(mut self, extractor: Box<dyn EntityExtractor>) -> Self {
        self.processor = QueryProcessor::with_extractor(extractor);
        self
    }

    /// Access the underlying store (ingestion side).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run retrieval and return the ranked, packed context.
    pub async fn retrieve(
        &self,
        owner: &str,
        query: &str,
        options: &RetrieveOptions,
    ) -> RetrievalResult<RankedContext> {
        let (_, context) = self.run(owner, query, options).await?;
        Ok(context)
    }

    /// Run retrieval and synthesize a cited answer.
    pub async fn answer(
        &self,
        owner: &str,
        query: &str,
        options: &RetrieveOptions,
    ) -> RetrievalResult<SynthesizedAnswer> {
        let (processed, context) = self.run(owner, query, options).await?;
        Ok(self.synthesizer.synthesize(
            &processed,
            &context.fragments,
            options.style,
            context.degraded,
        ))
    }

    async fn run(
        &self,
        owner: &str,
        query: &str,
        options: &RetrieveOptions,
    ) -> RetrievalResult<(ProcessedQuery, RankedContext)> {
        let processed = self.processor.process(query);
        let now = options.reference_time.unwrap_or_else(Utc::now);
        debug!(
            intent = ?processed.intent,
            complexity = ?processed.complexity,
            entities = processed.entities.count(),
            "processed query"
        );

        let strategy = strategy::dispatch(
            &processed,
            options.time_range.as_ref(),
            now,
            self.config.search.recent_days,
        )?;
        debug!(?strategy, "dispatched strategy");

        let filters = self.base_filters(options, now)?;
        let limit = options
            .max_results
            .unwrap_or(self.config.search.default_limit)
            .min(self.config.search.max_limit);

        // The embedding collaborator only runs for strategies with a
        // vector channel; person and mention lookups are purely scalar.
        let (query_vec, degraded) = match &strategy {
            Strategy::Person { .. } | Strategy::WhoMentioned { .. } => (None, false),
            _ => self.embed_query(&processed.original, options).await?,
        };

        let candidates = self
            .execute(&strategy, owner, &processed, query_vec.as_deref(), &filters, limit, options)
            .await?;
        info!(candidates = candidates.len(), degraded, "search complete");

        let ranked = self.ranker.rank(candidates, &processed, now);
        let packed = self.packer.pack(ranked);
        info!(
            packed = packed.fragments.len(),
            tokens = packed.total_tokens,
            "retrieval complete"
        );

        Ok((
            processed,
            RankedContext {
                fragments: packed.fragments,
                total_tokens: packed.total_tokens,
                degraded,
            },
        ))
    }

    /// Scalar predicates from the caller's options, applied to every
    /// strategy.
    fn base_filters(
        &self,
        options: &RetrieveOptions,
        now: DateTime<Utc>,
    ) -> RetrievalResult<ScalarFilters> {
        let mut filters = ScalarFilters::default();
        if let Some(sources) = &options.source_filter {
            filters.source_types = Some(sources.clone());
        }
        if let Some(email) = &options.person_filter {
            filters.person_email = Some(email.clone());
        }
        if let Some(spec) = &options.time_range {
            let range = TimeRange::resolve(spec, now, self.config.search.recent_days)?;
            filters.created_after = Some(range.start);
            filters.created_before = Some(range.end);
        }
        Ok(filters)
    }

    /// Embed the query under a bounded timeout. Failure and timeout both
    /// mean "no embedding": the request downgrades to keyword search and
    /// carries a degraded marker.
    async fn embed_query(
        &self,
        text: &str,
        options: &RetrieveOptions,
    ) -> RetrievalResult<(Option<Vec<f32>>, bool)> {
        let Some(embedder) = &self.embedder else {
            return Ok((None, false));
        };
        check_deadline(options)?;

        let budget = Duration::from_secs(self.config.search.embed_timeout_secs);
        match tokio::time::timeout(budget, embedder.embed(text)).await {
            Ok(Ok(vector)) => Ok((Some(vector), false)),
            Ok(Err(err)) => {
                warn!(%err, "embedding unavailable, falling back to keyword search");
                Ok((None, true))
            }
            Err(_) => {
                warn!(timeout = ?budget, "embedding timed out, falling back to keyword search");
                Ok((None, true))
            }
        }
    }

    async fn execute(
        &self,
        strategy: &Strategy,
        owner: &str,
        processed: &ProcessedQuery,
        query_vec: Option<&[f32]>,
        filters: &ScalarFilters,
        limit: usize,
        options: &RetrieveOptions,
    ) -> RetrievalResult<Vec<ScoredFragment>> {
        check_deadline(options)?;
        let search_config = &self.config.search;

        match strategy {
            Strategy::Person { name } => {
                person_channel(&self.store, owner, name, limit, &self.config.ranking).await
            }
            Strategy::WhoMentioned { query } => {
                let mut hits =
                    keyword_channel(&self.store, owner, query, filters, limit, search_config)
                        .await?;
                hits.retain(|c| c.fragment.has_person());
                Ok(hits)
            }
            Strategy::Temporal { range } => {
                temporal_channel(
                    &self.store,
                    owner,
                    &processed.normalized,
                    query_vec,
                    *range,
                    filters,
                    limit,
                    search_config,
                )
                .await
            }
            Strategy::SchedulingContext { people } => {
                let mut event_filters = filters.clone();
                if event_filters.source_types.is_none() {
                    event_filters.source_types = Some(vec![SourceType::CalendarEvent]);
                }
                let mut hits = hybrid_channel(
                    &self.store,
                    owner,
                    &processed.normalized,
                    query_vec,
                    &event_filters,
                    limit,
                    search_config,
                )
                .await?;

                // Fold in fragments tied to the extracted attendees.
                for person in people {
                    check_deadline(options)?;
                    let extra =
                        person_channel(&self.store, owner, person, limit, &self.config.ranking)
                            .await?;
                    for candidate in extra {
                        let relevant_source = matches!(
                            candidate.fragment.source_type,
                            SourceType::CalendarEvent | SourceType::Message
                        );
                        if !relevant_source {
                            continue;
                        }
                        match hits.iter_mut().find(|h| h.fragment.id == candidate.fragment.id)
                        {
                            Some(existing) => {
                                existing.similarity = existing.similarity.max(candidate.similarity)
                            }
                            None => hits.push(candidate),
                        }
                    }
                }

                // Nothing text- or person-matched: recent calendar events
                // are still useful scheduling context, recency-ordered.
                if hits.is_empty() {
                    check_deadline(options)?;
                    hits = self
                        .store
                        .fetch(owner, &event_filters, limit)
                        .await?
                        .into_iter()
                        .map(|fragment| ScoredFragment {
                            fragment,
                            similarity: 0.0,
                        })
                        .collect();
                }

                search::sort_candidates(&mut hits);
                hits.truncate(limit);
                Ok(hits)
            }
            Strategy::SourceFiltered { source, text } => {
                let mut narrowed = filters.clone();
                // An explicit caller filter wins over the strategy's default.
                if narrowed.source_types.is_none() {
                    narrowed.source_types = Some(vec![*source]);
                }
                hybrid_channel(
                    &self.store,
                    owner,
                    text,
                    query_vec,
                    &narrowed,
                    limit,
                    search_config,
                )
                .await
            }
            Strategy::Hybrid { text } => {
                hybrid_channel(
                    &self.store,
                    owner,
                    text,
                    query_vec,
                    filters,
                    limit,
                    search_config,
                )
                .await
            }
        }
    }
}

fn check_deadline(options: &RetrieveOptions) -> RetrievalResult<()> {
    match options.deadline {
        Some(deadline) if Utc::now() > deadline => Err(RetrievalError::Cancelled),
        _ => Ok(()),
    }
}
