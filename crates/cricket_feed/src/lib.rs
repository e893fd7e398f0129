//! Cricket Live — score feed
//!
//! CricAPI client behind the `ScoreProvider` trait, plus the shared
//! short-lived `MatchCache` every reader goes through.

pub mod cache;
pub mod model;
pub mod provider;

pub use cache::MatchCache;
pub use model::{InningsScore, Match, Series};
pub use provider::{CricApiClient, ScoreProvider, CRICAPI_BASE};
