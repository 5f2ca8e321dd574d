//! A search backend over a single local checkout, driven by ripgrep.

mod ripgrep;
mod terms;

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SearchError;
use crate::search::{FileContentSource, RepoInfo, RepoResolver, SearchBackend};
use crate::types::{Position, Range, SearchResult};

pub use ripgrep::{ChildGuard, RipgrepMatch, RipgrepRequest, RipgrepTool};
pub use terms::{LocalQuery, MatchKind, RepoFilter};

pub const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_MATCHES: usize = 2_000;

/// Keywords and modifiers that introduce a declaration in common languages.
const KEYWORD_FORM: &str = r"^\s*(?:(?:pub(?:\([^)]*\))?|export|default|public|private|protected|internal|static|final|abstract|async|unsafe|extern|inline|virtual|override|open|sealed|data|readonly|local|declare)\s+)*(?:fn|func|function|def|defn|defmacro|class|struct|enum|trait|interface|type|typedef|impl|mod|module|namespace|let|var|val|const|static|object|record|macro_rules!|protocol|extension|union|alias|sub|proc|#define|package)\s+[*&]?";

/// Go methods: `func (r *Recv) Name(`.
const GO_METHOD_FORM: &str = r"^\s*func\s*\([^)]*\)\s*";

/// Assignments such as `name := ...`, `exports.name = function`.
const ASSIGNMENT_FORM: &str = r"^\s*(?:(?:export|const|let|var|local)\s+)?(?:[A-Za-z0-9_$]+\.)*";
const ASSIGNMENT_TAIL: &str = r"\s*(?::=|=\s*(?:function|class|async|lambda|\())";

static C_STATIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*static\s").expect("static regex"));

/// A repository checked out at `root`, known to navigation by `name`.
#[derive(Clone, Debug)]
pub struct LocalRepository {
    name: String,
    revision: String,
    root: PathBuf,
    rg: RipgrepTool,
}

impl LocalRepository {
    pub fn new(name: impl Into<String>, revision: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            revision: revision.into(),
            root: root.into(),
            rg: RipgrepTool::new(
                Duration::from_millis(DEFAULT_SEARCH_TIMEOUT_MS),
                DEFAULT_MAX_MATCHES,
            ),
        }
    }

    pub fn with_ripgrep(mut self, rg: RipgrepTool) -> Self {
        self.rg = rg;
        self
    }

    fn to_results(
        &self,
        query: &LocalQuery,
        matches: Vec<RipgrepMatch>,
        include_file_local: bool,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let declaration = match query.kind {
            MatchKind::Symbol => Some(declaration_patterns(query.symbol_body(), query.case_sensitive)?),
            MatchKind::File => None,
        };

        let mut results = Vec::new();
        for found in matches {
            let file = found.path.to_string_lossy().replace('\\', "/");
            if !query.includes_path(&file) {
                continue;
            }
            match &declaration {
                Some(declaration) => {
                    let Some(name) = declaration
                        .iter()
                        .find_map(|re| re.captures(&found.line).and_then(|caps| caps.name("name")))
                    else {
                        continue;
                    };
                    let file_local = is_c_family(&file) && C_STATIC.is_match(&found.line);
                    if file_local && !include_file_local {
                        continue;
                    }
                    results.push(SearchResult {
                        repository: self.name.clone(),
                        revision: self.revision.clone(),
                        range: char_range(&found.line, found.line_number, name.start(), name.end()),
                        preview: Some(found.line.trim().to_string()),
                        symbol_name: Some(name.as_str().to_string()),
                        symbol_kind: None,
                        container_name: None,
                        file_local,
                        file,
                    });
                }
                None => {
                    for &(start, end) in &found.spans {
                        results.push(SearchResult {
                            repository: self.name.clone(),
                            revision: self.revision.clone(),
                            file: file.clone(),
                            range: char_range(&found.line, found.line_number, start, end),
                            preview: Some(found.line.trim().to_string()),
                            symbol_name: None,
                            symbol_kind: None,
                            container_name: None,
                            file_local: false,
                        });
                    }
                }
            }
        }
        Ok(results)
    }

    fn resolve_path(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        safe.then(|| self.root.join(relative))
    }
}

#[async_trait]
impl SearchBackend for LocalRepository {
    async fn search(
        &self,
        query: &str,
        include_file_local: bool,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let parsed = LocalQuery::parse(query)?;
        if !parsed.includes_repo(&self.name, &self.revision) {
            return Ok(Vec::new());
        }
        let request = RipgrepRequest {
            pattern: match parsed.kind {
                MatchKind::Symbol => parsed.symbol_body().to_string(),
                MatchKind::File => parsed.pattern.clone(),
            },
            case_sensitive: parsed.case_sensitive,
        };
        let matches = self
            .rg
            .search(&self.root, &request)
            .await
            .map_err(|err| {
                if err.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
                    SearchError::Timeout(self.rg.timeout().as_millis() as u64)
                } else {
                    SearchError::Backend(format!("{err:#}"))
                }
            })?;
        self.to_results(&parsed, matches, include_file_local)
    }
}

#[async_trait]
impl FileContentSource for LocalRepository {
    async fn file_content(
        &self,
        repo: &str,
        _revision: &str,
        path: &str,
    ) -> Result<Option<String>, SearchError> {
        if repo != self.name {
            return Ok(None);
        }
        let Some(absolute) = self.resolve_path(path) else {
            tracing::warn!(path, "refusing to read path outside the repository");
            return Ok(None);
        };
        match tokio::fs::read(&absolute).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SearchError::Io(err)),
        }
    }
}

#[async_trait]
impl RepoResolver for LocalRepository {
    async fn resolve(&self, name: &str) -> Result<Option<RepoInfo>, SearchError> {
        Ok((name == self.name).then(RepoInfo::default))
    }
}

/// Line shapes that declare `symbol`; each has a `name` group spanning it.
fn declaration_patterns(symbol: &str, case_sensitive: bool) -> Result<Vec<Regex>, SearchError> {
    let flags = if case_sensitive { "" } else { "(?i)" };
    let boundary = r"(?:[^A-Za-z0-9_$]|$)";
    [
        format!("{flags}{KEYWORD_FORM}(?P<name>{symbol}){boundary}"),
        format!("{flags}{GO_METHOD_FORM}(?P<name>{symbol}){boundary}"),
        format!("{flags}{ASSIGNMENT_FORM}(?P<name>{symbol}){ASSIGNMENT_TAIL}"),
    ]
    .iter()
    .map(|pattern| {
        Regex::new(pattern)
            .map_err(|err| SearchError::Parse(format!("invalid symbol pattern {symbol:?}: {err}")))
    })
    .collect()
}

fn is_c_family(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext, "c" | "h" | "cc" | "cpp" | "cxx" | "hpp" | "m" | "mm" | "cu"))
}

fn char_range(line: &str, line_number: usize, start: usize, end: usize) -> Range {
    let to_chars = |byte: usize| {
        line.get(..byte)
            .map(|prefix| prefix.chars().count())
            .unwrap_or_else(|| line.chars().count())
    };
    Range::new(
        Position::new(line_number, to_chars(start)),
        Position::new(line_number, to_chars(end)),
    )
}
