//! Interpretation of search query terms for the local backend.

use regex::Regex;

use crate::error::SearchError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchKind {
    Symbol,
    File,
}

#[derive(Clone, Debug)]
pub struct RepoFilter {
    pub name: Regex,
    pub revision: Option<String>,
}

/// A parsed query. Unknown flags (`patternType:`, `fork:`, `archived:`,
/// `index:`) do not change what a local checkout returns and are skipped.
#[derive(Clone, Debug)]
pub struct LocalQuery {
    pub pattern: String,
    pub kind: MatchKind,
    pub case_sensitive: bool,
    pub file_filters: Vec<Regex>,
    pub repo: Option<RepoFilter>,
    pub excluded_repos: Vec<Regex>,
}

impl LocalQuery {
    pub fn parse(query: &str) -> Result<Self, SearchError> {
        let mut pattern = None;
        let mut kind = MatchKind::File;
        let mut case_sensitive = false;
        let mut file_filters = Vec::new();
        let mut repo = None;
        let mut excluded_repos = Vec::new();

        for term in query.split_whitespace() {
            if let Some(value) = term.strip_prefix("type:") {
                kind = match value {
                    "symbol" => MatchKind::Symbol,
                    "file" => MatchKind::File,
                    other => return Err(SearchError::Parse(format!("unsupported type:{other}"))),
                };
            } else if let Some(value) = term.strip_prefix("case:") {
                case_sensitive = value == "yes";
            } else if let Some(value) = term.strip_prefix("file:") {
                file_filters.push(compile(value)?);
            } else if let Some(value) = term.strip_prefix("-repo:") {
                excluded_repos.push(compile(value)?);
            } else if let Some(value) = term.strip_prefix("repo:") {
                let (name, revision) = match value.split_once("$@") {
                    Some((name, revision)) => (format!("{name}$"), Some(revision.to_string())),
                    None => (value.to_string(), None),
                };
                repo = Some(RepoFilter {
                    name: compile(&name)?,
                    revision,
                });
            } else if is_flag(term) {
                continue;
            } else if pattern.is_none() {
                pattern = Some(term.to_string());
            } else {
                return Err(SearchError::Parse(format!("unexpected query term {term:?}")));
            }
        }

        let pattern = pattern.ok_or_else(|| SearchError::Parse("query has no pattern".to_string()))?;
        Ok(Self {
            pattern,
            kind,
            case_sensitive,
            file_filters,
            repo,
            excluded_repos,
        })
    }

    /// Whether a repository named `name` at `revision` is in scope.
    pub fn includes_repo(&self, name: &str, revision: &str) -> bool {
        if self.excluded_repos.iter().any(|re| re.is_match(name)) {
            return false;
        }
        match &self.repo {
            Some(filter) => {
                filter.name.is_match(name)
                    && filter
                        .revision
                        .as_deref()
                        .is_none_or(|wanted| wanted == revision || wanted == "HEAD")
            }
            None => true,
        }
    }

    pub fn includes_path(&self, path: &str) -> bool {
        self.file_filters.iter().all(|re| re.is_match(path))
    }

    /// For symbol queries, the symbol name pattern without its `^...$` anchors.
    pub fn symbol_body(&self) -> &str {
        let body = self.pattern.strip_prefix('^').unwrap_or(&self.pattern);
        match body.strip_suffix('$') {
            Some(stripped) if !stripped.ends_with('\\') => stripped,
            _ => body,
        }
    }
}

fn is_flag(term: &str) -> bool {
    ["patternType:", "index:", "fork:", "archived:", "count:", "timeout:"]
        .iter()
        .any(|prefix| term.starts_with(prefix))
}

fn compile(pattern: &str) -> Result<Regex, SearchError> {
    Regex::new(pattern).map_err(|err| SearchError::Parse(format!("invalid regex {pattern:?}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_definition_query() {
        let query = LocalQuery::parse(
            r"^serve$ type:symbol patternType:regexp case:yes file:\.(rs)$ repo:^github.com/a/b$@main index:only",
        )
        .unwrap();
        assert_eq!(query.kind, MatchKind::Symbol);
        assert!(query.case_sensitive);
        assert_eq!(query.symbol_body(), "serve");
        assert!(query.includes_path("src/lib.rs"));
        assert!(!query.includes_path("src/lib.go"));
        assert!(query.includes_repo("github.com/a/b", "main"));
        assert!(!query.includes_repo("github.com/a/b", "dev"));
        assert!(!query.includes_repo("github.com/a/bc", "main"));
    }

    #[test]
    fn excluded_repository_is_out_of_scope() {
        let query = LocalQuery::parse(r"\bx\b type:file -repo:^r$").unwrap();
        assert_eq!(query.kind, MatchKind::File);
        assert!(!query.includes_repo("r", "HEAD"));
        assert!(query.includes_repo("other", "HEAD"));
    }

    #[test]
    fn escaped_dollar_is_not_an_anchor() {
        let query = LocalQuery::parse(r"^cost\$ type:symbol").unwrap();
        assert_eq!(query.symbol_body(), r"cost\$");
    }

    #[test]
    fn query_without_pattern_is_rejected() {
        assert!(matches!(
            LocalQuery::parse("type:file case:yes"),
            Err(SearchError::Parse(_))
        ));
    }
}
