//! Precise code intelligence loaded from a JSON index file, and the merge of
//! precise with search-based locations.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::PreciseProvider;
use crate::error::SearchError;
use crate::types::{Annotated, Document, HoverPayload, Location, Position, Range};

/// One occurrence range in the index and what it resolves to.
#[derive(Clone, Debug, Deserialize)]
pub struct PreciseEntry {
    /// Repository the entry belongs to; entries without one match any repository.
    #[serde(default)]
    pub repo: Option<String>,
    pub path: String,
    pub range: Range,
    #[serde(default)]
    pub definitions: Vec<Location>,
    #[serde(default)]
    pub references: Vec<Location>,
    #[serde(default)]
    pub hover: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PreciseIndex {
    #[serde(default)]
    entries: Vec<PreciseEntry>,
}

impl PreciseIndex {
    pub fn new(entries: Vec<PreciseEntry>) -> Self {
        Self { entries }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read precise index {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid precise index {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let index: PreciseIndex = serde_json::from_str(raw)?;
        tracing::info!(entries = index.entries.len(), "precise index loaded");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, document: &Document, position: Position) -> Option<&PreciseEntry> {
        self.entries.iter().find(|entry| {
            entry.path == document.path
                && entry.repo.as_deref().is_none_or(|repo| repo == document.repo)
                && entry.range.contains(position)
        })
    }
}

#[async_trait]
impl PreciseProvider for PreciseIndex {
    async fn definition(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Vec<Location>, SearchError> {
        Ok(self
            .lookup(document, position)
            .map(|entry| entry.definitions.clone())
            .unwrap_or_default())
    }

    async fn references(
        &self,
        document: &Document,
        position: Position,
        include_declaration: bool,
    ) -> Result<Vec<Location>, SearchError> {
        let Some(entry) = self.lookup(document, position) else {
            return Ok(Vec::new());
        };
        let mut locations = entry.references.clone();
        if include_declaration {
            for definition in &entry.definitions {
                if !locations.contains(definition) {
                    locations.insert(0, definition.clone());
                }
            }
        } else {
            locations.retain(|location| !entry.definitions.contains(location));
        }
        Ok(locations)
    }

    async fn hover(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Option<HoverPayload>, SearchError> {
        Ok(self.lookup(document, position).and_then(|entry| {
            entry.hover.as_ref().map(|contents| HoverPayload {
                contents: contents.clone(),
                range: Some(entry.range),
            })
        }))
    }
}

/// Precise locations first, then imprecise ones from files the precise
/// results do not mention.
pub fn merge_file_disjoint(
    precise: Vec<Location>,
    imprecise: Vec<Location>,
) -> Vec<Annotated<Location>> {
    let covered: HashSet<String> = precise
        .iter()
        .map(|location| location.file_key().to_string())
        .collect();
    precise
        .into_iter()
        .map(Annotated::precise)
        .chain(
            imprecise
                .into_iter()
                .filter(|location| !covered.contains(location.file_key()))
                .map(Annotated::imprecise),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(file: &str, line: usize) -> Location {
        Location {
            uri: format!("git://r?v#{file}"),
            range: Range::new(Position::new(line, 0), Position::new(line, 4)),
        }
    }

    const INDEX: &str = r#"{
        "entries": [
            {
                "path": "src/main.go",
                "range": {"start": {"line": 3, "character": 4}, "end": {"line": 3, "character": 9}},
                "definitions": [{"uri": "git://r?v#src/lib.go", "range": {"start": {"line": 10, "character": 5}, "end": {"line": 10, "character": 10}}}],
                "references": [
                    {"uri": "git://r?v#src/lib.go", "range": {"start": {"line": 10, "character": 5}, "end": {"line": 10, "character": 10}}},
                    {"uri": "git://r?v#src/main.go", "range": {"start": {"line": 3, "character": 4}, "end": {"line": 3, "character": 9}}}
                ],
                "hover": "func Serve()"
            }
        ]
    }"#;

    fn document() -> Document {
        Document::new("r", "v", "src/main.go", "go", "")
    }

    #[tokio::test]
    async fn lookup_matches_position_inside_range() {
        let index = PreciseIndex::from_json(INDEX).unwrap();
        let defs = index.definition(&document(), Position::new(3, 6)).await.unwrap();
        assert_eq!(defs.len(), 1);
        assert!(index.definition(&document(), Position::new(4, 0)).await.unwrap().is_empty());
        let hover = index.hover(&document(), Position::new(3, 9)).await.unwrap().unwrap();
        assert_eq!(hover.contents, "func Serve()");
    }

    #[tokio::test]
    async fn references_honor_include_declaration() {
        let index = PreciseIndex::from_json(INDEX).unwrap();
        let with = index.references(&document(), Position::new(3, 4), true).await.unwrap();
        assert_eq!(with.len(), 2);
        let without = index.references(&document(), Position::new(3, 4), false).await.unwrap();
        assert_eq!(without.len(), 1);
        assert!(without[0].uri.ends_with("src/main.go"));
    }

    #[test]
    fn merge_drops_imprecise_results_in_covered_files() {
        let merged = merge_file_disjoint(
            vec![loc("a.go", 1)],
            vec![loc("a.go", 7), loc("b.go", 2)],
        );
        assert_eq!(merged.len(), 2);
        assert!(!merged[0].imprecise);
        assert_eq!(merged[1].value, loc("b.go", 2));
        assert!(merged[1].imprecise);
    }
}
