//! Translation benchmark pipeline: runs registered LLM recipes over
//! `source-target.csv` corpora, scores them against reference translations
//! with embedding similarity, and aggregates the scores into reports.

pub mod client;
pub mod config;
pub mod corpus;
pub mod error;
pub mod harvest;
pub mod language;
pub mod logging;
pub mod menu;
pub mod pipeline;
pub mod recipe;
pub mod report;
pub mod similarity;
pub mod state;
pub mod utils;

pub use config::Config;
pub use corpus::Corpus;
pub use error::{AppError, Result};
pub use language::LanguagePair;
pub use pipeline::{Pipeline, RunSummary};
pub use recipe::{Recipe, RecipeRegistry};
pub use state::{ProcessingState, StateStore};
