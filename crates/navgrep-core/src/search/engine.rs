use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::hover::build_hover;
use super::race::{RaceWinner, favor_primary};
use super::{FileContentSource, RepoResolver, SearchBackend};
use crate::cache::{ContentCache, ContentKey};
use crate::error::{SearchError, application_error};
use crate::language::{FilterContext, LanguageProfile, LanguageRegistry};
use crate::query::{Query, QueryInput, Scope, definition_query, references_query};
use crate::rank::sort_by_proximity;
use crate::settings::NavSettings;
use crate::telemetry;
use crate::token::{SearchToken, find_search_token};
use crate::types::{Document, HoverPayload, Position, SearchResult};

/// Search-based definition, references and hover for one hosting runtime.
pub struct SearchEngine {
    registry: Arc<LanguageRegistry>,
    backend: Arc<dyn SearchBackend>,
    content: Arc<dyn FileContentSource>,
    resolver: Option<Arc<dyn RepoResolver>>,
    cache: ContentCache,
    settings: NavSettings,
}

impl SearchEngine {
    pub fn new(
        registry: Arc<LanguageRegistry>,
        backend: Arc<dyn SearchBackend>,
        content: Arc<dyn FileContentSource>,
        settings: NavSettings,
    ) -> Self {
        Self {
            registry,
            backend,
            content,
            resolver: None,
            cache: ContentCache::default(),
            settings,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn RepoResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub async fn definition(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let Some((profile, token)) = self.token_at(document, position) else {
            return Ok(Vec::new());
        };
        if token.is_comment {
            debug!(token = %token.token, "token is inside a comment; skipping definition search");
            return Ok(Vec::new());
        }
        self.find_definitions(document, profile, &token.token).await
    }

    pub async fn references(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let Some((profile, token)) = self.token_at(document, position) else {
            return Ok(Vec::new());
        };
        let (include_forks, include_archived) = self.repo_flags(&document.repo).await;

        let mut scopes = vec![Scope::CurrentRepository];
        if !self.settings.public_instance {
            scopes.push(Scope::OtherRepositories);
        }

        let tiers = scopes.iter().map(|&scope| {
            let mut input = QueryInput::new(
                &token.token,
                &document.repo,
                &document.revision,
                &document.path,
                &profile.file_extensions,
            )
            .scope(scope);
            input.include_forks = include_forks;
            input.include_archived = include_archived;
            let query = references_query(&input);
            async move { (scope, self.run_tier(&query, scope, false).await) }
        });

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        let mut failures = Vec::new();
        for (scope, outcome) in join_all(tiers).await {
            match outcome {
                Ok(tier_results) => results.extend(
                    tier_results
                        .into_iter()
                        .filter(|r| seen.insert((r.repository.clone(), r.file.clone(), r.range))),
                ),
                Err(err) => {
                    warn!(scope = scope.as_str(), error = %err, "reference search tier failed");
                    failures.push(err);
                }
            }
        }

        if failures.len() == scopes.len() {
            if failures.len() == 1 {
                return Err(failures.remove(0));
            }
            let messages = failures.iter().map(ToString::to_string);
            return Err(application_error(messages)
                .unwrap_or_else(|| SearchError::Backend("every reference tier failed".to_string())));
        }
        Ok(results)
    }

    /// Hover for the first definition of the token under `position`.
    ///
    /// Content and rendering problems degrade to `None`; only search failures
    /// are returned as errors.
    pub async fn hover(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Option<HoverPayload>, SearchError> {
        let Some((profile, token)) = self.token_at(document, position) else {
            return Ok(None);
        };
        if token.is_comment {
            return Ok(None);
        }
        let definitions = self.find_definitions(document, profile, &token.token).await?;
        let Some(definition) = definitions.into_iter().next() else {
            return Ok(None);
        };

        let content: Arc<str> =
            if definition.repository == document.repo && definition.file == document.path {
                Arc::from(document.text.as_str())
            } else {
                match self
                    .fetch_content(&definition.repository, &definition.revision, &definition.file)
                    .await
                {
                    Ok(Some(content)) => content,
                    Ok(None) => {
                        debug!(file = %definition.file, "definition file content unavailable");
                        return Ok(None);
                    }
                    Err(err) => {
                        warn!(file = %definition.file, error = %err, "failed to fetch definition file");
                        return Ok(None);
                    }
                }
            };

        let hover_profile = self.registry.for_path(&definition.file).unwrap_or(profile);
        Ok(build_hover(&content, &definition, hover_profile))
    }

    fn token_at(
        &self,
        document: &Document,
        position: Position,
    ) -> Option<(&LanguageProfile, SearchToken)> {
        let Some(profile) = self
            .registry
            .resolve(Some(&document.language_id), &document.path)
        else {
            debug!(language = %document.language_id, path = %document.path, "no language profile");
            return None;
        };
        let comments = profile.line_comment_patterns();
        let token = find_search_token(&document.text, position, &comments, &profile.identifier_char)?;
        Some((profile, token))
    }

    async fn find_definitions(
        &self,
        document: &Document,
        profile: &LanguageProfile,
        token: &str,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let (include_forks, include_archived) = self.repo_flags(&document.repo).await;

        let mut scopes = vec![Scope::CurrentRepository];
        if !self.settings.public_instance {
            scopes.push(Scope::AllRepositories);
        }

        for scope in scopes {
            let mut input = QueryInput::new(
                token,
                &document.repo,
                &document.revision,
                &document.path,
                &profile.file_extensions,
            )
            .scope(scope);
            input.include_forks = include_forks;
            input.include_archived = include_archived;
            let query = definition_query(&input);

            let results = self.run_tier(&query, scope, true).await?;
            if !results.is_empty() {
                return Ok(refine_definitions(results, document, profile));
            }
        }
        Ok(Vec::new())
    }

    async fn run_tier(
        &self,
        query: &Query,
        scope: Scope,
        include_file_local: bool,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let indexed = query.to_index_only();
        if self.settings.indexed_only || query.is_index_only() {
            return self.search(&indexed, scope, include_file_local).await;
        }

        let raced = favor_primary(
            self.search(query, scope, include_file_local),
            self.settings.unindexed_timeout(),
            || self.search(&indexed, scope, include_file_local),
        )
        .await?;
        if raced.winner == RaceWinner::Fallback {
            telemetry::record_fallback(scope.as_str());
        }
        Ok(raced.results)
    }

    async fn search(
        &self,
        query: &Query,
        scope: Scope,
        include_file_local: bool,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let rendered = query.to_string();
        if self.settings.trace_search {
            info!(scope = scope.as_str(), query = %rendered, "search");
        } else {
            debug!(scope = scope.as_str(), query = %rendered, "search");
        }
        telemetry::record_search_call(scope.as_str());

        let started = Instant::now();
        match self.backend.search(&rendered, include_file_local).await {
            Ok(results) => {
                telemetry::record_search_results(scope.as_str(), results.len());
                debug!(
                    scope = scope.as_str(),
                    results = results.len(),
                    elapsed_ms = elapsed_ms(started),
                    "search finished"
                );
                Ok(results)
            }
            Err(err) => {
                telemetry::record_search_failure(scope.as_str());
                Err(err)
            }
        }
    }

    async fn fetch_content(
        &self,
        repo: &str,
        revision: &str,
        path: &str,
    ) -> Result<Option<Arc<str>>, SearchError> {
        let key = ContentKey::new(repo, revision, path);
        if let Some(content) = self.cache.get(&key) {
            telemetry::record_cache_hit("content");
            return Ok(Some(content));
        }
        let Some(content) = self.content.file_content(repo, revision, path).await? else {
            return Ok(None);
        };
        let content: Arc<str> = Arc::from(content);
        self.cache.insert(key, content.clone());
        Ok(Some(content))
    }

    /// Whether queries must opt into forks and archived repositories.
    async fn repo_flags(&self, repo: &str) -> (bool, bool) {
        if self.settings.include_forks {
            return (true, true);
        }
        let Some(resolver) = &self.resolver else {
            return (false, false);
        };
        match resolver.resolve(repo).await {
            Ok(Some(info)) => (info.is_fork, info.is_archived),
            Ok(None) => (false, false),
            Err(err) => {
                warn!(repo, error = %err, "repository lookup failed");
                (false, false)
            }
        }
    }
}

/// Narrow raw definition hits: drop file-local symbols from other files,
/// apply the language filter, rank by path proximity and prefer hits in the
/// querying file.
fn refine_definitions(
    results: Vec<SearchResult>,
    document: &Document,
    profile: &LanguageProfile,
) -> Vec<SearchResult> {
    let in_document =
        |r: &SearchResult| r.repository == document.repo && r.file == document.path;

    let visible: Vec<SearchResult> = results
        .iter()
        .filter(|r| !r.file_local || in_document(r))
        .cloned()
        .collect();
    let results = if visible.is_empty() { results } else { visible };

    let context = FilterContext {
        repo: &document.repo,
        file_path: &document.path,
        file_content: &document.text,
    };
    let mut results = profile.filter_definitions(results, &context);
    sort_by_proximity(&mut results, &document.path);

    if results.iter().any(in_document) {
        results.retain(in_document);
    }
    results
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Range;

    fn hit(repo: &str, file: &str, file_local: bool) -> SearchResult {
        SearchResult {
            repository: repo.to_string(),
            revision: "v".to_string(),
            file: file.to_string(),
            range: Range::default(),
            preview: None,
            symbol_name: None,
            symbol_kind: None,
            container_name: None,
            file_local,
        }
    }

    fn rust_profile(registry: &LanguageRegistry) -> &LanguageProfile {
        registry.get("rust").unwrap()
    }

    #[test]
    fn file_local_hits_from_other_files_are_dropped() {
        let registry = LanguageRegistry::builtin().unwrap();
        let document = Document::new("r", "v", "src/a.rs", "rust", "");
        let refined = refine_definitions(
            vec![hit("r", "src/b.rs", true), hit("r", "src/c.rs", false)],
            &document,
            rust_profile(&registry),
        );
        assert_eq!(refined, vec![hit("r", "src/c.rs", false)]);
    }

    #[test]
    fn only_file_local_hits_elsewhere_are_kept_as_is() {
        let registry = LanguageRegistry::builtin().unwrap();
        let document = Document::new("r", "v", "src/a.rs", "rust", "");
        let refined = refine_definitions(
            vec![hit("r", "src/b.rs", true)],
            &document,
            rust_profile(&registry),
        );
        assert_eq!(refined.len(), 1);
    }

    #[test]
    fn hits_in_the_querying_file_win() {
        let registry = LanguageRegistry::builtin().unwrap();
        let document = Document::new("r", "v", "src/a.rs", "rust", "");
        let refined = refine_definitions(
            vec![
                hit("r", "src/b.rs", false),
                hit("r", "src/a.rs", true),
                hit("other", "src/a.rs", false),
            ],
            &document,
            rust_profile(&registry),
        );
        assert_eq!(refined, vec![hit("r", "src/a.rs", true)]);
    }

    #[test]
    fn results_are_ranked_by_path_proximity() {
        let registry = LanguageRegistry::builtin().unwrap();
        let document = Document::new("r", "v", "a/b/c.rs", "rust", "");
        let refined = refine_definitions(
            vec![hit("r", "x/y/z.rs", false), hit("r", "a/b/d.rs", false)],
            &document,
            rust_profile(&registry),
        );
        assert_eq!(refined[0].file, "a/b/d.rs");
    }
}
