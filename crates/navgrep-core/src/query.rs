//! Search query construction.
//!
//! Queries are space-joined terms in a fixed order: token pattern, type
//! filter, pattern type, case flag, file-extension filter, scope, then the
//! optional index/fork/archive flags.

use std::fmt;
use std::path::Path;

use serde::Serialize;

/// Extensions whose definitions commonly live in generated files with a
/// different extension; the extension filter is dropped for them.
const EXTENSION_FILTER_BLACKLIST: &[&str] = &["thrift", "proto", "graphql"];

/// Search breadth, from narrowest to widest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    CurrentFile,
    CurrentRepository,
    OtherRepositories,
    AllRepositories,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::CurrentFile => "current-file",
            Scope::CurrentRepository => "current-repository",
            Scope::OtherRepositories => "other-repositories",
            Scope::AllRepositories => "all-repositories",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryKind {
    Definition,
    References,
}

/// Everything a query needs to know about the lookup.
#[derive(Clone, Debug)]
pub struct QueryInput<'a> {
    pub token: &'a str,
    pub repo: &'a str,
    pub revision: &'a str,
    pub path: &'a str,
    pub file_extensions: &'a [String],
    pub scope: Scope,
    pub index_only: bool,
    pub include_forks: bool,
    pub include_archived: bool,
}

impl<'a> QueryInput<'a> {
    pub fn new(
        token: &'a str,
        repo: &'a str,
        revision: &'a str,
        path: &'a str,
        file_extensions: &'a [String],
    ) -> Self {
        Self {
            token,
            repo,
            revision,
            path,
            file_extensions,
            scope: Scope::AllRepositories,
            index_only: false,
            include_forks: false,
            include_archived: false,
        }
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn index_only(mut self, index_only: bool) -> Self {
        self.index_only = index_only;
        self
    }
}

/// An immutable, ordered list of query terms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Query {
    terms: Vec<String>,
}

impl Query {
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_index_only(&self) -> bool {
        self.terms.iter().any(|term| term == "index:only")
    }

    /// The same query restricted to indexed data.
    pub fn to_index_only(&self) -> Query {
        if self.is_index_only() {
            return self.clone();
        }
        let mut terms = self.terms.clone();
        let at = terms
            .iter()
            .position(|term| term.starts_with("fork:") || term.starts_with("archived:"))
            .unwrap_or(terms.len());
        terms.insert(at, "index:only".to_string());
        Query { terms }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.terms.join(" "))
    }
}

pub fn definition_query(input: &QueryInput<'_>) -> Query {
    build(QueryKind::Definition, input)
}

pub fn references_query(input: &QueryInput<'_>) -> Query {
    build(QueryKind::References, input)
}

pub fn build(kind: QueryKind, input: &QueryInput<'_>) -> Query {
    let token = regex::escape(input.token);
    let mut terms = match kind {
        QueryKind::Definition => vec![format!("^{token}$"), "type:symbol".to_string()],
        QueryKind::References => vec![format!("\\b{token}\\b"), "type:file".to_string()],
    };
    terms.push("patternType:regexp".to_string());
    terms.push("case:yes".to_string());

    if let Some(filter) = extension_filter(input.path, input.file_extensions) {
        terms.push(filter);
    }

    match input.scope {
        Scope::CurrentFile => {
            terms.push(repo_term(input.repo, input.revision));
            terms.push(format!("file:^{}$", regex::escape(input.path)));
        }
        Scope::CurrentRepository => terms.push(repo_term(input.repo, input.revision)),
        Scope::OtherRepositories => terms.push(format!("-repo:^{}$", input.repo)),
        Scope::AllRepositories => {}
    }

    if input.index_only {
        terms.push("index:only".to_string());
    }
    if input.include_forks {
        terms.push("fork:yes".to_string());
    }
    if input.include_archived {
        terms.push("archived:yes".to_string());
    }

    Query { terms }
}

fn repo_term(repo: &str, revision: &str) -> String {
    if revision.is_empty() {
        format!("repo:^{repo}$")
    } else {
        format!("repo:^{repo}$@{revision}")
    }
}

fn extension_filter(path: &str, file_extensions: &[String]) -> Option<String> {
    if file_extensions.is_empty() {
        return None;
    }
    let current = Path::new(path).extension().and_then(|ext| ext.to_str());
    if current.is_some_and(|ext| EXTENSION_FILTER_BLACKLIST.contains(&ext)) {
        return None;
    }
    Some(format!("file:\\.({})$", file_extensions.join("|")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn definition_query_terms_in_order() {
        let extensions = exts(&["cpp"]);
        let input = QueryInput::new("token", "repo", "rev", "src/foo.cpp", &extensions);
        let query = definition_query(&input);
        assert_eq!(
            query.terms(),
            ["^token$", "type:symbol", "patternType:regexp", "case:yes", r"file:\.(cpp)$"]
        );
        let unordered: HashSet<&str> = query.terms().iter().map(String::as_str).collect();
        let expected: HashSet<&str> =
            ["^token$", "type:symbol", "patternType:regexp", "case:yes", r"file:\.(cpp)$"]
                .into_iter()
                .collect();
        assert_eq!(unordered, expected);
    }

    #[test]
    fn repository_scope_matches_wire_format() {
        let extensions = exts(&["cpp"]);
        let input = QueryInput::new("token", "github.com/foo/bar", "rev", "a.cpp", &extensions)
            .scope(Scope::CurrentRepository);
        assert_eq!(
            definition_query(&input).to_string(),
            r"^token$ type:symbol patternType:regexp case:yes file:\.(cpp)$ repo:^github.com/foo/bar$@rev"
        );
    }

    #[test]
    fn references_exclude_current_repository_in_other_scope() {
        let extensions = exts(&["go"]);
        let input = QueryInput::new("Serve", "github.com/a/b", "main", "cmd/main.go", &extensions)
            .scope(Scope::OtherRepositories);
        assert_eq!(
            references_query(&input).to_string(),
            r"\bServe\b type:file patternType:regexp case:yes file:\.(go)$ -repo:^github.com/a/b$"
        );
    }

    #[test]
    fn current_file_scope_escapes_the_path() {
        let extensions = exts(&["ts"]);
        let input = QueryInput::new("x", "r", "v", "src/a.b.ts", &extensions).scope(Scope::CurrentFile);
        let terms = definition_query(&input).terms().to_vec();
        assert_eq!(terms[5], "repo:^r$@v");
        assert_eq!(terms[6], r"file:^src/a\.b\.ts$");
    }

    #[test]
    fn blacklisted_extensions_drop_the_file_filter() {
        let extensions = exts(&["proto"]);
        let input = QueryInput::new("Msg", "r", "v", "api/msg.proto", &extensions);
        assert!(definition_query(&input)
            .terms()
            .iter()
            .all(|term| !term.starts_with("file:")));
    }

    #[test]
    fn multiple_extensions_are_alternated() {
        let extensions = exts(&["ts", "tsx"]);
        let input = QueryInput::new("x", "r", "v", "a.ts", &extensions);
        assert!(definition_query(&input)
            .terms()
            .contains(&r"file:\.(ts|tsx)$".to_string()));
    }

    #[test]
    fn index_only_variant_inserts_before_fork_flags() {
        let extensions = exts(&["rs"]);
        let mut input = QueryInput::new("x", "r", "v", "a.rs", &extensions).scope(Scope::CurrentRepository);
        input.include_forks = true;
        let query = definition_query(&input);
        assert!(!query.is_index_only());
        let indexed = query.to_index_only();
        assert!(indexed.to_string().ends_with("repo:^r$@v index:only fork:yes"));
        assert_eq!(indexed.to_index_only(), indexed);
    }

    #[test]
    fn token_metacharacters_are_escaped() {
        let extensions = exts(&["clj"]);
        let input = QueryInput::new("valid?", "r", "v", "a.clj", &extensions);
        assert_eq!(definition_query(&input).terms()[0], r"^valid\?$");
    }
}
