//! # Recall
//!
//! A retrieval-and-ranking engine for heterogeneous personal records
//! (messages, calendar events, CRM contacts and notes) indexed as text
//! fragments with vector embeddings.
//!
//! Recall answers natural-language questions by classifying the query,
//! dispatching it to a retrieval strategy, ranking the candidate fragments,
//! packing them into a token budget, and (optionally) synthesizing a cited
//! answer.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌────────────────┐   ┌───────────────┐
//! │ QueryProcessor│──▶│   Strategy      │──▶│ Similarity     │
//! │ intent+entity │   │   dispatch      │   │ search         │
//! └───────────────┘   └────────────────┘   └──────┬────────┘
//!                                                  │
//!                     ┌────────────────┐   ┌──────▼────────┐
//!                     │ AnswerSynth    │◀──│ Rank + Pack    │
//!                     │ (optional)     │   │                │
//!                     └────────────────┘   └───────────────┘
//! ```
//!
//! The engine is a pure read path: no retrieval step mutates shared state,
//! and arbitrarily many queries may run concurrently. Storage and embedding
//! generation live behind the [`store::FragmentStore`] and
//! [`embedding::QueryEmbedder`] traits; an in-memory reference store is
//! provided for tests and embedding into host applications.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use recall::config::RetrievalConfig;
//! use recall::engine::{RetrievalEngine, RetrieveOptions};
//! use recall::store::memory::InMemoryStore;
//!
//! # async fn demo() -> Result<(), recall::error::RetrievalError> {
//! let engine = RetrievalEngine::new(InMemoryStore::new(), RetrievalConfig::default());
//! let ctx = engine
//!     .retrieve("owner-1", "when is my meeting with Sara", &RetrieveOptions::default())
//!     .await?;
//! for ranked in &ctx.fragments {
//!     println!("{:.2} {}", ranked.final_score, ranked.fragment.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Fragment, draft, and ranked-result types |
//! | [`config`] | Tuning knobs with documented defaults |
//! | [`error`] | Typed error taxonomy |
//! | [`store`] | Storage trait + in-memory reference store |
//! | [`query`] | Query processing: intent, entities, time references |
//! | [`strategy`] | Intent → retrieval strategy dispatch |
//! | [`search`] | Vector, keyword, hybrid, temporal, person search |
//! | [`ranking`] | Multi-factor relevance scoring |
//! | [`packer`] | Token-budget context packing |
//! | [`answer`] | Style-specific answer synthesis with citations |
//! | [`embedding`] | Query-embedding collaborator trait |
//! | [`engine`] | The retrieval pipeline entry point |

pub mod answer;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod models;
pub mod packer;
pub mod query;
pub mod ranking;
pub mod search;
pub mod store;
pub mod strategy;

pub use answer::{AnswerStyle, Citation, SynthesizedAnswer};
pub use config::RetrievalConfig;
pub use engine::{RankedContext, RetrievalEngine, RetrieveOptions};
pub use error::{RetrievalError, RetrievalResult};
pub use models::{Fragment, FragmentDraft, RankedFragment, SourceType};
pub use store::FragmentStore;
