//! Intent → retrieval-strategy dispatch.
//!
//! The mapping is a closed enum matched exhaustively, so adding an intent
//! without deciding its strategy is a compile error. Strategy choice only
//! changes which filters and search channels run; ranking, packing, and
//! synthesis are identical for every strategy.

use chrono::{DateTime, Utc};

use crate::error::RetrievalResult;
use crate::models::SourceType;
use crate::query::{Intent, ProcessedQuery};
use crate::search::{TimeRange, TimeRangeSpec};

/// The retrieval plan for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// Person-intent query with an extracted name: tiered person lookup.
    Person { name: String },
    /// Person-intent query without a usable name: keyword search narrowed
    /// to fragments that carry a person identity.
    WhoMentioned { query: String },
    /// Temporal-intent query: search bounded to a resolved time window.
    Temporal { range: TimeRange },
    /// Scheduling-intent query: calendar-focused context, person-scoped
    /// when attendees were extracted.
    SchedulingContext { people: Vec<String> },
    /// Source-restricted hybrid search (communication → messages,
    /// crm → CRM contacts).
    SourceFiltered { source: SourceType, text: String },
    /// Default: hybrid vector + keyword search over the normalized text.
    Hybrid { text: String },
}

/// Map a processed query to its strategy.
///
/// `time_range_override` is the caller-supplied range from the request
/// options; for temporal queries it wins over ranges derived from the
/// query text. Only custom ranges can fail (malformed dates).
pub fn dispatch(
    query: &ProcessedQuery,
    time_range_override: Option<&TimeRangeSpec>,
    now: DateTime<Utc>,
    recent_days: i64,
) -> RetrievalResult<Strategy> {
    let strategy = match query.intent {
        Intent::Person => match query.entities.people.first() {
            Some(name) => Strategy::Person { name: name.clone() },
            None => Strategy::WhoMentioned {
                query: query.normalized.clone(),
            },
        },
        Intent::Temporal => {
            let range = match time_range_override {
                Some(spec) => TimeRange::resolve(spec, now, recent_days)?,
                None => derive_range(query, now, recent_days),
            };
            Strategy::Temporal { range }
        }
        Intent::Scheduling => Strategy::SchedulingContext {
            people: query.entities.people.clone(),
        },
        Intent::Communication => Strategy::SourceFiltered {
            source: SourceType::Message,
            text: query.normalized.clone(),
        },
        Intent::Crm => Strategy::SourceFiltered {
            source: SourceType::CrmContact,
            text: query.normalized.clone(),
        },
        Intent::Location | Intent::Information | Intent::Procedural | Intent::General => {
            Strategy::Hybrid {
                text: query.normalized.clone(),
            }
        }
    };
    Ok(strategy)
}

/// Resolve the first extracted time reference; no references (or only
/// unrecognized ones) means the recent window.
fn derive_range(query: &ProcessedQuery, now: DateTime<Utc>, recent_days: i64) -> TimeRange {
    match query.time_references.first() {
        Some(phrase) => TimeRange::named(phrase, now, recent_days),
        None => TimeRange::named("recent", now, recent_days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryProcessor;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 15, 12, 0, 0).unwrap()
    }

    fn dispatch_text(raw: &str) -> Strategy {
        let q = QueryProcessor::new().process(raw);
        dispatch(&q, None, now(), 7).unwrap()
    }

    #[test]
    fn test_person_with_name() {
        let strategy = dispatch_text("who is Sara Smith");
        assert_eq!(
            strategy,
            Strategy::Person {
                name: "Sara Smith".to_string()
            }
        );
    }

    #[test]
    fn test_person_without_name_falls_back_to_who_mentioned() {
        let strategy = dispatch_text("who called yesterday");
        assert!(matches!(strategy, Strategy::WhoMentioned { .. }));
    }

    #[test]
    fn test_temporal_uses_extracted_reference() {
        let strategy = dispatch_text("when did we meet this week");
        let expected = TimeRange::named("this_week", now(), 7);
        assert_eq!(strategy, Strategy::Temporal { range: expected });
    }

    #[test]
    fn test_temporal_defaults_to_recent() {
        let strategy = dispatch_text("when is my meeting with Sara");
        let expected = TimeRange::named("recent", now(), 7);
        assert_eq!(strategy, Strategy::Temporal { range: expected });
    }

    #[test]
    fn test_temporal_override_wins() {
        let q = QueryProcessor::new().process("when did we meet this week");
        let spec = TimeRangeSpec::Custom {
            start: "2026-01-01".to_string(),
            end: "2026-01-31".to_string(),
        };
        let strategy = dispatch(&q, Some(&spec), now(), 7).unwrap();
        let expected = TimeRange::resolve(&spec, now(), 7).unwrap();
        assert_eq!(strategy, Strategy::Temporal { range: expected });
    }

    #[test]
    fn test_temporal_override_malformed_fails_request() {
        let q = QueryProcessor::new().process("when did we meet");
        let spec = TimeRangeSpec::Custom {
            start: "not-a-date".to_string(),
            end: "2026-01-31".to_string(),
        };
        assert!(dispatch(&q, Some(&spec), now(), 7).is_err());
    }

    #[test]
    fn test_scheduling_carries_people() {
        let strategy = dispatch_text("schedule lunch with Sara Smith");
        assert_eq!(
            strategy,
            Strategy::SchedulingContext {
                people: vec!["Sara Smith".to_string()]
            }
        );
    }

    #[test]
    fn test_communication_filters_messages() {
        let strategy = dispatch_text("find the email about invoices");
        assert!(matches!(
            strategy,
            Strategy::SourceFiltered {
                source: SourceType::Message,
                ..
            }
        ));
    }

    #[test]
    fn test_crm_filters_contacts() {
        let strategy = dispatch_text("crm history for Acme");
        assert!(matches!(
            strategy,
            Strategy::SourceFiltered {
                source: SourceType::CrmContact,
                ..
            }
        ));
    }

    #[test]
    fn test_everything_else_is_hybrid() {
        assert!(matches!(
            dispatch_text("portfolio performance"),
            Strategy::Hybrid { .. }
        ));
        assert!(matches!(
            dispatch_text("where was the offsite"),
            Strategy::Hybrid { .. }
        ));
        assert!(matches!(
            dispatch_text("how do I export data"),
            Strategy::Hybrid { .. }
        ));
    }
}
