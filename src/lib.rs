//! # Equipment Assist
//!
//! Equipment lookup, name disambiguation and question answering over a CSV
//! equipment catalog.
//!
//! A user names a piece of equipment loosely ("extincteur x45", "pompe").
//! The name resolver finds candidates by exact or approximate matching, the
//! disambiguation flow decides whether the user must pick a name, give an
//! ID, or is done, and the answer generator forwards the equipment's data
//! and intervention history to a language model to answer a question.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌────────────────┐
//! │  Catalog  │──▶│  Resolvers   │──▶│ Disambiguation │
//! │ CSV, Arc  │   │ name / id    │   │ classify, Flow │
//! └─────┬─────┘   └──────────────┘   └───────┬────────┘
//!       │                                    │
//!       │         ┌──────────────┐     ┌─────┴─────┐
//!       └────────▶│    Answer    │◀────│ console / │
//!                 │  + LLM API   │     │   HTTP    │
//!                 └──────────────┘     └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Equipment and intervention records |
//! | [`catalog`] | CSV loading and the in-memory tables |
//! | [`similarity`] | Sequence-matching similarity ratio |
//! | [`resolve`] | Name and ID resolvers |
//! | [`disambiguation`] | Outcome classification and prompt-loop state machine |
//! | [`llm`] | Language-model client |
//! | [`keywords`] | Keyword extraction from questions |
//! | [`answer`] | Question answering about one equipment |
//! | [`console`] | Interactive console |
//! | [`server`] | HTTP API |

pub mod answer;
pub mod catalog;
pub mod config;
pub mod console;
pub mod disambiguation;
pub mod keywords;
pub mod llm;
pub mod models;
pub mod resolve;
pub mod server;
pub mod similarity;
