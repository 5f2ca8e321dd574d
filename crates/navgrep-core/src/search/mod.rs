//! Search orchestration: tiers, racing, hover construction and the precise
//! provider seam.

use async_trait::async_trait;

use crate::error::SearchError;
use crate::types::{Document, HoverPayload, Location, Position, SearchResult};

mod engine;
pub mod hover;
pub mod precise;
pub mod race;

pub use engine::SearchEngine;

/// Executes a structured text/symbol query against a code-search index.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(
        &self,
        query: &str,
        include_file_local: bool,
    ) -> Result<Vec<SearchResult>, SearchError>;
}

/// Raw file content at a revision; `None` when the file or revision is unknown.
#[async_trait]
pub trait FileContentSource: Send + Sync {
    async fn file_content(
        &self,
        repo: &str,
        revision: &str,
        path: &str,
    ) -> Result<Option<String>, SearchError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RepoInfo {
    pub is_fork: bool,
    pub is_archived: bool,
}

/// Repository metadata used to decide whether forks/archives must be searched.
#[async_trait]
pub trait RepoResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<Option<RepoInfo>, SearchError>;
}

/// Compiler- or index-derived code intelligence, always preferred over search.
#[async_trait]
pub trait PreciseProvider: Send + Sync {
    async fn definition(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Vec<Location>, SearchError>;

    async fn references(
        &self,
        document: &Document,
        position: Position,
        include_declaration: bool,
    ) -> Result<Vec<Location>, SearchError>;

    async fn hover(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Option<HoverPayload>, SearchError>;
}
