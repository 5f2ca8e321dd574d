//! Search-based code navigation.
//!
//! Editor positions are turned into code-search queries; the hits are
//! filtered, ranked and merged with precise results when those exist.

pub mod backend;
pub mod cache;
pub mod cli;
pub mod docstring;
pub mod error;
pub mod language;
pub mod lookup;
pub mod provider;
pub mod query;
pub mod rank;
pub mod search;
pub mod service;
pub mod settings;
pub mod stream;
pub mod telemetry;
pub mod token;
pub mod types;
