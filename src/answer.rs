//! Answer synthesis: turns packed, ranked fragments into a style-specific
//! natural-language answer with citations and a confidence score.
//!
//! Synthesis never fails. Fragments below the confidence threshold are
//! dropped; when none survive, the result is a fixed no-results template
//! with query-specific suggestions rather than an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AnswerConfig;
use crate::models::{Fragment, RankedFragment, SourceType};
use crate::query::{Intent, ProcessedQuery};

/// Rendering style for a synthesized answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStyle {
    #[default]
    Comprehensive,
    Concise,
    BulletPoints,
    Conversational,
}

/// Traceable pointer from an answer back to a fragment's origin record.
#[derive(Debug, Clone, Serialize)]
pub struct Citation {
    /// Human-readable label, e.g. `from Sara Smith - 2026-07-14`.
    pub label: String,
    pub source_type: SourceType,
    pub source_id: String,
    pub date: DateTime<Utc>,
}

/// The complete synthesis result.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesizedAnswer {
    pub answer: String,
    pub style: AnswerStyle,
    pub sources: Vec<Citation>,
    /// Rank-weighted mean of the cited fragments' relevance, in `[0, 1]`.
    pub confidence: f64,
    /// Fragments handed to the synthesizer (post-packing).
    pub fragments_considered: usize,
    /// Fragments actually narrated and cited.
    pub fragments_cited: usize,
    /// Style-dependent section count (themes, bullets, or narrated items).
    pub sections: usize,
    /// True when retrieval ran on the keyword fallback because the
    /// embedding collaborator was unavailable.
    pub degraded: bool,
}

/// Coarse theme buckets used by the comprehensive style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Theme {
    Meetings,
    Work,
    Personal,
    Clients,
    General,
}

const THEME_ORDER: [Theme; 5] = [
    Theme::Meetings,
    Theme::Work,
    Theme::Personal,
    Theme::Clients,
    Theme::General,
];

impl Theme {
    fn classify(text: &str) -> Theme {
        let lower = text.to_lowercase();
        if lower.contains("meeting") || lower.contains("schedule") {
            Theme::Meetings
        } else if lower.contains("project") || lower.contains("work") {
            Theme::Work
        } else if lower.contains("family") || lower.contains("personal") {
            Theme::Personal
        } else if lower.contains("client") || lower.contains("customer") {
            Theme::Clients
        } else {
            Theme::General
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Theme::Meetings => "Meetings",
            Theme::Work => "Work",
            Theme::Personal => "Personal",
            Theme::Clients => "Clients",
            Theme::General => "General",
        }
    }
}

/// Renders answers from packed fragments.
pub struct AnswerSynthesizer {
    config: AnswerConfig,
}

impl AnswerSynthesizer {
    pub fn new(config: AnswerConfig) -> Self {
        Self { config }
    }

    pub fn synthesize(
        &self,
        query: &ProcessedQuery,
        packed: &[RankedFragment],
        style: AnswerStyle,
        degraded: bool,
    ) -> SynthesizedAnswer {
        let survivors: Vec<&RankedFragment> = packed
            .iter()
            .filter(|r| r.final_score >= self.config.confidence_threshold)
            .collect();

        if survivors.is_empty() {
            return self.no_results(query, style, packed.len(), degraded);
        }

        let cap = match style {
            AnswerStyle::Comprehensive => self.config.comprehensive_max,
            AnswerStyle::Concise => self.config.concise_max,
            AnswerStyle::BulletPoints => self.config.bullet_max,
            AnswerStyle::Conversational => self.config.conversational_max,
        };
        // At least one fragment is always narrated, even under a zero cap.
        let cited = &survivors[..survivors.len().min(cap.max(1))];

        let (answer, sections) = match style {
            AnswerStyle::Comprehensive => render_comprehensive(query, cited),
            AnswerStyle::Concise => render_concise(cited),
            AnswerStyle::BulletPoints => render_bullets(cited),
            AnswerStyle::Conversational => render_conversational(query, cited),
        };

        SynthesizedAnswer {
            answer,
            style,
            sources: cited.iter().map(|r| citation(&r.fragment)).collect(),
            confidence: confidence(cited),
            fragments_considered: packed.len(),
            fragments_cited: cited.len(),
            sections,
            degraded,
        }
    }

    fn no_results(
        &self,
        query: &ProcessedQuery,
        style: AnswerStyle,
        considered: usize,
        degraded: bool,
    ) -> SynthesizedAnswer {
        let [s1, s2, s3] = suggestions(query.intent);
        let answer = format!(
            "I couldn't find anything matching \"{}\".\n\n\
             You could try:\n- {}\n- {}\n- {}\n\n\
             Search hints: include a person's full name, name a source \
             (email, calendar, CRM), or add a time frame like \"this week\".",
            query.original, s1, s2, s3
        );

        SynthesizedAnswer {
            answer,
            style,
            sources: Vec::new(),
            confidence: 0.0,
            fragments_considered: considered,
            fragments_cited: 0,
            sections: 0,
            degraded,
        }
    }
}

/// Three query-specific retry suggestions for the no-results template.
fn suggestions(intent: Intent) -> [&'static str; 3] {
    match intent {
        Intent::Person => [
            "search by the person's full name",
            "search by their email address",
            "drop any time frame to search all records",
        ],
        Intent::Temporal | Intent::Scheduling => [
            "widen the time window to \"this_month\" or \"this_year\"",
            "drop the date filter entirely",
            "add a person or topic keyword",
        ],
        Intent::Communication => [
            "search all sources instead of only messages",
            "add the sender's name",
            "use a distinctive phrase from the message",
        ],
        Intent::Crm => [
            "search all sources instead of only CRM records",
            "use the contact's full name",
            "use the company name",
        ],
        _ => [
            "use more specific keywords",
            "add a person's name or email address",
            "add a time frame like \"this week\"",
        ],
    }
}

/// Display excerpt: single line, capped length.
fn snippet(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    let mut out: String = flat.chars().take(200).collect();
    if out.len() < flat.len() {
        out.push('…');
    }
    out
}

fn person_label(fragment: &Fragment) -> &str {
    fragment
        .person_name
        .as_deref()
        .or(fragment.person_email.as_deref())
        .unwrap_or("unknown sender")
}

fn citation(fragment: &Fragment) -> Citation {
    let date = fragment.created_at.format("%Y-%m-%d");
    let label = match fragment.source_type {
        SourceType::Message => format!("from {} - {}", person_label(fragment), date),
        SourceType::CrmContact | SourceType::CrmNote => "CRM record".to_string(),
        SourceType::CalendarEvent => "Calendar Event".to_string(),
        SourceType::Document => format!("Document - {}", date),
    };
    Citation {
        label,
        source_type: fragment.source_type,
        source_id: fragment.source_id.clone(),
        date: fragment.created_at,
    }
}

fn render_comprehensive(query: &ProcessedQuery, cited: &[&RankedFragment]) -> (String, usize) {
    let mut out = format!("Here's what I found for \"{}\":\n", query.original);
    let mut sections = 0;

    for theme in THEME_ORDER {
        let in_theme: Vec<&&RankedFragment> = cited
            .iter()
            .filter(|r| Theme::classify(&r.fragment.text) == theme)
            .collect();
        if in_theme.is_empty() {
            continue;
        }
        sections += 1;
        out.push_str(&format!("\n{}:\n", theme.label()));
        for r in in_theme {
            out.push_str(&format!(
                "- {} ({})\n",
                snippet(&r.fragment.text),
                citation(&r.fragment).label
            ));
        }
    }

    (out, sections)
}

fn render_concise(cited: &[&RankedFragment]) -> (String, usize) {
    // Narrate only the top-ranked fragment; the rest stay as citations.
    let top = cited[0];
    (
        format!(
            "Most relevant: {} ({})",
            snippet(&top.fragment.text),
            citation(&top.fragment).label
        ),
        1,
    )
}

fn render_bullets(cited: &[&RankedFragment]) -> (String, usize) {
    let lines: Vec<String> = cited
        .iter()
        .map(|r| {
            format!(
                "- {} ({})",
                snippet(&r.fragment.text),
                citation(&r.fragment).label
            )
        })
        .collect();
    (lines.join("\n"), cited.len())
}

fn render_conversational(query: &ProcessedQuery, cited: &[&RankedFragment]) -> (String, usize) {
    let answer = match cited.len() {
        1 => format!(
            "I found one thing about \"{}\": {} ({}).",
            query.original,
            snippet(&cited[0].fragment.text),
            citation(&cited[0].fragment).label
        ),
        2 | 3 => {
            let parts: Vec<String> = cited
                .iter()
                .map(|r| {
                    format!(
                        "{} ({})",
                        snippet(&r.fragment.text),
                        citation(&r.fragment).label
                    )
                })
                .collect();
            format!(
                "I found a few things about \"{}\": {}.",
                query.original,
                parts.join("; also ")
            )
        }
        _ => format!(
            "I found several pieces of information about \"{}\". \
             The most relevant: {} ({}).",
            query.original,
            snippet(&cited[0].fragment.text),
            citation(&cited[0].fragment).label
        ),
    };
    (answer, cited.len())
}

/// Rank-weighted mean of cited relevance scores. Top-ranked fragments
/// count more: `weight = max(1.0 - rank × 0.1, 0.1)`. Scores are clamped
/// to `1.0` so confidence stays in `[0, 1]`.
fn confidence(cited: &[&RankedFragment]) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (rank, r) in cited.iter().enumerate() {
        let weight = (1.0 - rank as f64 * 0.1).max(0.1);
        weighted_sum += weight * r.final_score.min(1.0);
        weight_total += weight;
    }
    if weight_total == 0.0 {
        0.0
    } else {
        weighted_sum / weight_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnswerConfig;
    use crate::query::QueryProcessor;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn ranked(
        id: &str,
        text: &str,
        source_type: SourceType,
        final_score: f64,
    ) -> RankedFragment {
        RankedFragment {
            fragment: Fragment {
                id: id.to_string(),
                owner: "u1".to_string(),
                source_type,
                source_id: format!("s-{id}"),
                text: text.to_string(),
                embedding: None,
                person_email: None,
                person_name: None,
                metadata: HashMap::new(),
                created_at: Utc.with_ymd_and_hms(2026, 7, 14, 9, 0, 0).unwrap(),
            },
            similarity_score: final_score,
            intent_boost: 0.0,
            recency_bonus: 0.0,
            source_bonus: 0.0,
            entity_boost: 0.0,
            final_score,
            token_estimate: 10,
        }
    }

    fn synthesizer() -> AnswerSynthesizer {
        AnswerSynthesizer::new(AnswerConfig::default())
    }

    fn query(raw: &str) -> ProcessedQuery {
        QueryProcessor::new().process(raw)
    }

    #[test]
    fn test_threshold_filters_low_confidence() {
        let packed = vec![
            ranked("a", "relevant meeting notes", SourceType::Message, 0.9),
            ranked("b", "barely related", SourceType::Message, 0.2),
        ];
        let out = synthesizer().synthesize(
            &query("meeting notes"),
            &packed,
            AnswerStyle::BulletPoints,
            false,
        );
        assert_eq!(out.fragments_considered, 2);
        assert_eq!(out.fragments_cited, 1);
        assert_eq!(out.sources.len(), 1);
    }

    #[test]
    fn test_no_results_template_shape() {
        let out = synthesizer().synthesize(
            &query("who is the new account manager"),
            &[],
            AnswerStyle::Comprehensive,
            false,
        );
        assert!(out.answer.starts_with("I couldn't find anything matching"));
        assert!(out.answer.contains("who is the new account manager"));
        // Exactly three suggestion bullets.
        let bullets = out.answer.lines().filter(|l| l.starts_with("- ")).count();
        assert_eq!(bullets, 3);
        assert!(out.answer.contains("Search hints:"));
        assert_eq!(out.confidence, 0.0);
        assert!(out.sources.is_empty());
        assert_eq!(out.fragments_cited, 0);
    }

    #[test]
    fn test_no_results_is_deterministic() {
        let q = query("anything at all");
        let a = synthesizer().synthesize(&q, &[], AnswerStyle::Concise, false);
        let b = synthesizer().synthesize(&q, &[], AnswerStyle::Concise, false);
        assert_eq!(a.answer, b.answer);
    }

    #[test]
    fn test_no_results_suggestions_follow_intent() {
        let person = synthesizer().synthesize(
            &query("who emailed the report"),
            &[],
            AnswerStyle::Concise,
            false,
        );
        assert!(person.answer.contains("full name"));

        let temporal = synthesizer().synthesize(
            &query("when did we last talk"),
            &[],
            AnswerStyle::Concise,
            false,
        );
        assert!(temporal.answer.contains("time window"));
    }

    #[test]
    fn test_citation_labels_per_source() {
        let mut message = ranked("m", "hello", SourceType::Message, 0.9);
        message.fragment.person_name = Some("Sara Smith".to_string());

        assert_eq!(
            citation(&message.fragment).label,
            "from Sara Smith - 2026-07-14"
        );
        assert_eq!(
            citation(&ranked("c", "x", SourceType::CrmContact, 0.9).fragment).label,
            "CRM record"
        );
        assert_eq!(
            citation(&ranked("n", "x", SourceType::CrmNote, 0.9).fragment).label,
            "CRM record"
        );
        assert_eq!(
            citation(&ranked("e", "x", SourceType::CalendarEvent, 0.9).fragment).label,
            "Calendar Event"
        );
        assert_eq!(
            citation(&ranked("d", "x", SourceType::Document, 0.9).fragment).label,
            "Document - 2026-07-14"
        );
    }

    #[test]
    fn test_message_citation_falls_back_to_email_then_unknown() {
        let mut with_email = ranked("m", "hi", SourceType::Message, 0.9);
        with_email.fragment.person_email = Some("sara@example.com".to_string());
        assert_eq!(
            citation(&with_email.fragment).label,
            "from sara@example.com - 2026-07-14"
        );

        let bare = ranked("m2", "hi", SourceType::Message, 0.9);
        assert_eq!(
            citation(&bare.fragment).label,
            "from unknown sender - 2026-07-14"
        );
    }

    #[test]
    fn test_comprehensive_groups_by_theme() {
        let packed = vec![
            ranked("a", "Team meeting about roadmap", SourceType::CalendarEvent, 0.9),
            ranked("b", "Client renewal discussion", SourceType::CrmNote, 0.85),
            ranked("c", "Family dinner personal reminder", SourceType::Message, 0.8),
        ];
        let out = synthesizer().synthesize(
            &query("catch me up"),
            &packed,
            AnswerStyle::Comprehensive,
            false,
        );
        assert_eq!(out.sections, 3);
        assert!(out.answer.contains("Meetings:"));
        assert!(out.answer.contains("Personal:"));
        assert!(out.answer.contains("Clients:"));
        assert_eq!(out.sources.len(), 3);
    }

    #[test]
    fn test_concise_narrates_only_top() {
        let packed = vec![
            ranked("a", "top result text", SourceType::Document, 0.95),
            ranked("b", "second result text", SourceType::Document, 0.9),
            ranked("c", "third result text", SourceType::Document, 0.85),
            ranked("d", "fourth result text", SourceType::Document, 0.8),
        ];
        let out =
            synthesizer().synthesize(&query("results"), &packed, AnswerStyle::Concise, false);
        assert!(out.answer.contains("top result text"));
        assert!(!out.answer.contains("second result text"));
        // Citation cap for concise is 3.
        assert_eq!(out.fragments_cited, 3);
        assert_eq!(out.sources.len(), 3);
    }

    #[test]
    fn test_bullets_one_per_fragment() {
        let packed = vec![
            ranked("a", "first", SourceType::Document, 0.9),
            ranked("b", "second", SourceType::Document, 0.85),
        ];
        let out = synthesizer().synthesize(
            &query("list them"),
            &packed,
            AnswerStyle::BulletPoints,
            false,
        );
        assert_eq!(out.answer.lines().count(), 2);
        assert!(out.answer.lines().all(|l| l.starts_with("- ")));
        assert_eq!(out.sections, 2);
    }

    #[test]
    fn test_conversational_phrasing_by_count() {
        let one = vec![ranked("a", "only hit", SourceType::Document, 0.9)];
        let out =
            synthesizer().synthesize(&query("q"), &one, AnswerStyle::Conversational, false);
        assert!(out.answer.starts_with("I found one thing"));

        let three: Vec<RankedFragment> = (0..3)
            .map(|i| ranked(&format!("f{i}"), "hit", SourceType::Document, 0.9))
            .collect();
        let out =
            synthesizer().synthesize(&query("q"), &three, AnswerStyle::Conversational, false);
        assert!(out.answer.starts_with("I found a few things"));

        let many: Vec<RankedFragment> = (0..5)
            .map(|i| ranked(&format!("f{i}"), "hit", SourceType::Document, 0.9))
            .collect();
        let out =
            synthesizer().synthesize(&query("q"), &many, AnswerStyle::Conversational, false);
        assert!(out.answer.starts_with("I found several pieces"));
    }

    #[test]
    fn test_confidence_weights_top_ranks_heavier() {
        let packed = vec![
            ranked("a", "x", SourceType::Document, 1.0),
            ranked("b", "x", SourceType::Document, 0.7),
        ];
        let out =
            synthesizer().synthesize(&query("q"), &packed, AnswerStyle::BulletPoints, false);
        // Plain mean is 0.85; the rank-weighted mean leans toward the top score.
        assert!(out.confidence > 0.85);
        assert!(out.confidence < 1.0);
    }

    #[test]
    fn test_confidence_clamped_to_unit() {
        let packed = vec![ranked("a", "x", SourceType::Document, 1.4)];
        let out =
            synthesizer().synthesize(&query("q"), &packed, AnswerStyle::Concise, false);
        assert!(out.confidence <= 1.0);
    }

    #[test]
    fn test_degraded_flag_passes_through() {
        let out = synthesizer().synthesize(&query("q"), &[], AnswerStyle::Concise, true);
        assert!(out.degraded);
    }

    #[test]
    fn test_snippet_flattens_and_caps() {
        let s = snippet("line one\nline two");
        assert_eq!(s, "line one line two");
        let long = "x".repeat(500);
        assert!(snippet(&long).chars().count() <= 201);
    }
}
