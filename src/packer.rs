//! Token-budget context packing.
//!
//! Greedy prefix selection over the ranked list: accumulate fragments while
//! the running token estimate stays within the context window, and stop at
//! the first fragment that would exceed it. There is no skip-ahead: once a
//! fragment does not fit, every lower-ranked fragment is dropped, so the
//! packed set is always a prefix of the ranked order.
//!
//! The token estimate (`round(word_count × 1.3)`) is an approximation
//! standing in for a real tokenizer.

use crate::config::PackerConfig;
use crate::models::RankedFragment;

/// The budget-bounded subset selected for downstream use.
#[derive(Debug, Clone)]
pub struct PackedContext {
    pub fragments: Vec<RankedFragment>,
    pub total_tokens: usize,
}

/// Selects a prefix of the ranked list that fits the token budget.
pub struct ContextPacker {
    config: PackerConfig,
}

impl ContextPacker {
    pub fn new(config: PackerConfig) -> Self {
        Self { config }
    }

    pub fn pack(&self, ranked: Vec<RankedFragment>) -> PackedContext {
        let mut fragments = Vec::new();
        let mut total_tokens = 0usize;

        for mut item in ranked {
            let tokens = estimate_tokens(&item.fragment.text, self.config.tokens_per_word);
            if total_tokens + tokens > self.config.context_window {
                break;
            }
            item.token_estimate = tokens;
            total_tokens += tokens;
            fragments.push(item);
        }

        PackedContext {
            fragments,
            total_tokens,
        }
    }
}

/// Approximate token count for a text.
pub fn estimate_tokens(text: &str, tokens_per_word: f64) -> usize {
    let words = text.split_whitespace().count();
    (words as f64 * tokens_per_word).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Fragment, SourceType};
    use chrono::Utc;
    use std::collections::HashMap;

    fn ranked(id: &str, words: usize) -> RankedFragment {
        let text = vec!["word"; words].join(" ");
        RankedFragment {
            fragment: Fragment {
                id: id.to_string(),
                owner: "u1".to_string(),
                source_type: SourceType::Document,
                source_id: format!("s-{id}"),
                text,
                embedding: None,
                person_email: None,
                person_name: None,
                metadata: HashMap::new(),
                created_at: Utc::now(),
            },
            similarity_score: 0.5,
            intent_boost: 0.0,
            recency_bonus: 0.0,
            source_bonus: 0.0,
            entity_boost: 0.0,
            final_score: 0.5,
            token_estimate: 0,
        }
    }

    fn packer(window: usize) -> ContextPacker {
        ContextPacker::new(PackerConfig {
            context_window: window,
            tokens_per_word: 1.3,
        })
    }

    #[test]
    fn test_estimate_rounds() {
        // 10 words × 1.3 = 13 tokens.
        assert_eq!(estimate_tokens(&vec!["w"; 10].join(" "), 1.3), 13);
        // 3 words × 1.3 = 3.9 → 4.
        assert_eq!(estimate_tokens("one two three", 1.3), 4);
        assert_eq!(estimate_tokens("", 1.3), 0);
    }

    #[test]
    fn test_budget_never_exceeded() {
        let packed = packer(50).pack(vec![
            ranked("a", 10), // 13 tokens
            ranked("b", 20), // 26 tokens
            ranked("c", 20), // would exceed: 39 + 26 > 50
        ]);
        assert!(packed.total_tokens <= 50);
        assert_eq!(packed.fragments.len(), 2);
        assert_eq!(packed.total_tokens, 39);
    }

    #[test]
    fn test_stops_at_first_overflow_no_skip_ahead() {
        let packed = packer(30).pack(vec![
            ranked("a", 10), // 13 tokens, fits
            ranked("b", 40), // 52 tokens, does not fit
            ranked("c", 5),  // would fit, but must be dropped
        ]);
        let ids: Vec<&str> = packed.fragments.iter().map(|r| r.fragment.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_packed_is_prefix_of_ranked() {
        let input = vec![ranked("a", 10), ranked("b", 10), ranked("c", 10), ranked("d", 10)];
        let order: Vec<String> = input.iter().map(|r| r.fragment.id.clone()).collect();
        let packed = packer(30).pack(input);
        let packed_ids: Vec<String> = packed
            .fragments
            .iter()
            .map(|r| r.fragment.id.clone())
            .collect();
        assert_eq!(packed_ids, order[..packed_ids.len()]);
    }

    #[test]
    fn test_oversized_first_fragment_packs_nothing() {
        let packed = packer(10).pack(vec![ranked("a", 100)]);
        assert!(packed.fragments.is_empty());
        assert_eq!(packed.total_tokens, 0);
    }

    #[test]
    fn test_empty_input() {
        let packed = packer(4000).pack(Vec::new());
        assert!(packed.fragments.is_empty());
    }

    #[test]
    fn test_token_estimates_are_set() {
        let packed = packer(4000).pack(vec![ranked("a", 10)]);
        assert_eq!(packed.fragments[0].token_estimate, 13);
    }
}
