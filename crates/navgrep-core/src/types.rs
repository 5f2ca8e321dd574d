
use serde::{Deserialize, Serialize};

/// Zero-based line/character position. Characters count Unicode scalar values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }
}

/// A raw hit returned by a search collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub repository: String,
    pub revision: String,
    pub file: String,
    pub range: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default)]
    pub file_local: bool,
}

impl SearchResult {
    pub fn to_location(&self) -> Location {
        Location {
            uri: git_uri(&self.repository, &self.revision, &self.file),
            range: self.range,
        }
    }
}

/// The unit handed to the hosting runtime.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    pub range: Range,
}

impl Location {
    /// The uri names a whole file; ranges within it share the same key.
    pub fn file_key(&self) -> &str {
        &self.uri
    }
}

/// Compose `git://{repo}?{revision}#{file}`.
pub fn git_uri(repo: &str, revision: &str, file: &str) -> String {
    format!("git://{repo}?{revision}#{file}")
}

/// An open document in the editor, identified by repository, revision and path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub uri: String,
    pub repo: String,
    pub revision: String,
    pub path: String,
    pub language_id: String,
    pub text: String,
}

impl Document {
    pub fn new(
        repo: impl Into<String>,
        revision: impl Into<String>,
        path: impl Into<String>,
        language_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let repo = repo.into();
        let revision = revision.into();
        let path = path.into();
        Self {
            uri: git_uri(&repo, &revision, &path),
            repo,
            revision,
            path,
            language_id: language_id.into(),
            text: text.into(),
        }
    }
}

/// A result tagged with whether it came from heuristic search.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Annotated<T> {
    pub value: T,
    pub imprecise: bool,
}

impl<T> Annotated<T> {
    pub fn precise(value: T) -> Self {
        Self {
            value,
            imprecise: false,
        }
    }

    pub fn imprecise(value: T) -> Self {
        Self {
            value,
            imprecise: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoverPayload {
    pub contents: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

/// Split text into lines, tolerating `\r\n` and lone `\n` endings.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_uri_names_repo_revision_and_file() {
        let result = SearchResult {
            repository: "github.com/foo/bar".to_string(),
            revision: "abc123".to_string(),
            file: "src/lib.rs".to_string(),
            range: Range::default(),
            preview: None,
            symbol_name: None,
            symbol_kind: None,
            container_name: None,
            file_local: false,
        };
        let location = result.to_location();
        assert_eq!(location.uri, "git://github.com/foo/bar?abc123#src/lib.rs");
        assert_eq!(location.file_key(), location.uri);
    }

    #[test]
    fn split_lines_handles_mixed_endings() {
        assert_eq!(split_lines("a\r\nb\nc"), vec!["a", "b", "c"]);
    }
}
