use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::backend::{LocalRepository, RipgrepTool};
use crate::cli::{LookupArgs, RepoArgs};
use crate::language::LanguageRegistry;
use crate::provider::NavigationProvider;
use crate::search::precise::PreciseIndex;
use crate::search::SearchEngine;
use crate::settings::NavSettings;
use crate::telemetry;
use crate::types::{Annotated, Document, HoverPayload, Location, Position};

/// Run one CLI lookup against the repository described by `args`.
pub async fn execute(operation: Operation, args: LookupArgs) -> Result<LookupSummary> {
    telemetry::init_logging();
    let config = WorkspaceConfig::try_from_args(args.repo)?;
    let workspace = Workspace::open(config).await?;
    let path = workspace.relative_path(&args.file)?;
    let request = LookupRequest {
        operation,
        path,
        text: None,
        language: args.language,
        position: Position::new(args.line, args.character),
        include_declaration: !args.exclude_declaration,
    };
    let provider = workspace.provider();
    workspace.run(&provider, request).await
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Definition,
    References,
    Hover,
}

/// A checkout plus the settings used to navigate it.
#[derive(Clone, Debug)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
    pub repo: String,
    pub revision: String,
    pub search_timeout: Duration,
    pub max_matches: usize,
    pub precise_index: Option<PathBuf>,
    pub settings: NavSettings,
}

impl WorkspaceConfig {
    pub fn try_from_args(args: RepoArgs) -> Result<Self> {
        let root = args
            .root
            .unwrap_or(std::env::current_dir().context("failed to resolve current directory")?);
        let root = root.canonicalize().with_context(|| {
            format!(
                "failed to canonicalize repository root path: {}",
                root.display()
            )
        })?;

        let repo = match args.repo {
            Some(repo) if !repo.trim().is_empty() => repo,
            _ => root
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
                .context("cannot derive a repository name from the root; pass --repo")?,
        };

        let precise_index = args.precise_index.map(|path| {
            if path.is_absolute() {
                path
            } else {
                root.join(path)
            }
        });

        Ok(Self {
            root,
            repo,
            revision: args.revision,
            search_timeout: Duration::from_secs(u64::max(1, args.search_timeout_secs)),
            max_matches: usize::max(1, args.max_matches),
            precise_index,
            settings: NavSettings {
                indexed_only: args.indexed_only,
                unindexed_timeout_ms: args.timeout_ms,
                trace_search: args.trace,
                include_forks: args.include_forks,
                public_instance: args.public_instance,
            },
        })
    }
}

/// Everything needed to answer lookups for one repository.
pub struct Workspace {
    config: WorkspaceConfig,
    registry: Arc<LanguageRegistry>,
    engine: Arc<SearchEngine>,
    precise: Option<Arc<PreciseIndex>>,
}

impl Workspace {
    pub async fn open(config: WorkspaceConfig) -> Result<Self> {
        let registry = Arc::new(
            LanguageRegistry::builtin().context("failed to compile built-in language profiles")?,
        );
        let repository = Arc::new(
            LocalRepository::new(&config.repo, &config.revision, &config.root)
                .with_ripgrep(RipgrepTool::new(config.search_timeout, config.max_matches)),
        );
        let engine = SearchEngine::new(
            registry.clone(),
            repository.clone(),
            repository.clone(),
            config.settings.clone(),
        )
        .with_resolver(repository);

        let precise = match &config.precise_index {
            Some(path) => Some(Arc::new(PreciseIndex::load(path).await?)),
            None => None,
        };

        tracing::info!(
            repo = %config.repo,
            revision = %config.revision,
            root = %config.root.display(),
            precise = precise.is_some(),
            "workspace ready"
        );

        Ok(Self {
            config,
            registry,
            engine: Arc::new(engine),
            precise,
        })
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<LanguageRegistry> {
        &self.registry
    }

    /// A provider with its own memo table over the shared engine.
    pub fn provider(&self) -> NavigationProvider {
        let provider = NavigationProvider::new(self.engine.clone());
        match &self.precise {
            Some(precise) => provider.with_precise(precise.clone()),
            None => provider,
        }
    }

    /// `file` relative to the repository root, with `/` separators.
    pub fn relative_path(&self, file: &Path) -> Result<String> {
        let relative = if file.is_absolute() {
            file.strip_prefix(&self.config.root)
                .with_context(|| format!("{} is outside {}", file.display(), self.config.root.display()))?
                .to_path_buf()
        } else {
            file.to_path_buf()
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        let relative = relative.trim_start_matches("./").to_string();
        if relative.is_empty() || relative.split('/').any(|segment| segment == "..") {
            bail!("invalid file path {}", file.display());
        }
        Ok(relative)
    }

    /// Open `path` as a document, reading it from disk unless `text` is given.
    pub async fn document(
        &self,
        path: &str,
        text: Option<String>,
        language: Option<&str>,
    ) -> Result<Document> {
        let text = match text {
            Some(text) => text,
            None => {
                let absolute = self.config.root.join(path);
                tokio::fs::read_to_string(&absolute)
                    .await
                    .with_context(|| format!("failed to read {}", absolute.display()))?
            }
        };
        let language_id = match self.registry.resolve(language, path) {
            Some(profile) => profile.language_id.clone(),
            None => bail!("no language profile for {path}"),
        };
        Ok(Document::new(
            &self.config.repo,
            &self.config.revision,
            path,
            language_id,
            text,
        ))
    }

    /// Answer `request` through `provider`. Repeating a request on the same
    /// provider joins its memoized lookup.
    pub async fn run(
        &self,
        provider: &NavigationProvider,
        request: LookupRequest,
    ) -> Result<LookupSummary> {
        let started = Instant::now();
        let document = self
            .document(&request.path, request.text, request.language.as_deref())
            .await?;
        let position = request.position;

        let mut summary = LookupSummary {
            operation: request.operation,
            repo: document.repo.clone(),
            revision: document.revision.clone(),
            path: document.path.clone(),
            language: document.language_id.clone(),
            position,
            locations: Vec::new(),
            hover: None,
            elapsed_ms: 0,
        };
        match request.operation {
            Operation::Definition => {
                summary.locations = provider
                    .definition(&document, position)
                    .last()
                    .await
                    .unwrap_or_default();
            }
            Operation::References => {
                summary.locations = provider
                    .references(&document, position, request.include_declaration)
                    .last()
                    .await
                    .unwrap_or_default();
            }
            Operation::Hover => {
                summary.hover = provider.hover(&document, position).last().await;
            }
        }
        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(summary)
    }
}

#[derive(Clone, Debug)]
pub struct LookupRequest {
    pub operation: Operation,
    pub path: String,
    pub text: Option<String>,
    pub language: Option<String>,
    pub position: Position,
    pub include_declaration: bool,
}

#[derive(Debug, Serialize)]
pub struct LookupSummary {
    pub operation: Operation,
    pub repo: String,
    pub revision: String,
    pub path: String,
    pub language: String,
    pub position: Position,
    pub locations: Vec<Annotated<Location>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover: Option<Annotated<HoverPayload>>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct LanguageSummary {
    pub id: String,
    pub name: String,
    pub extensions: Vec<String>,
}

/// Built-in language profiles, for `navgrep languages`.
pub fn languages() -> Result<Vec<LanguageSummary>> {
    let registry = LanguageRegistry::builtin().context("failed to compile built-in language profiles")?;
    Ok(registry
        .iter()
        .map(|profile| LanguageSummary {
            id: profile.language_id.clone(),
            name: profile.display_name.clone(),
            extensions: profile.file_extensions.clone(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(root: &Path) -> RepoArgs {
        RepoArgs {
            root: Some(root.to_path_buf()),
            repo: None,
            revision: "main".to_string(),
            timeout_ms: 250,
            search_timeout_secs: 0,
            max_matches: 0,
            indexed_only: true,
            trace: false,
            include_forks: false,
            public_instance: true,
            precise_index: Some(PathBuf::from("index.json")),
        }
    }

    #[test]
    fn config_derives_repo_name_and_clamps_limits() {
        let dir = tempfile::tempdir().unwrap();
        let checkout = dir.path().join("widgets");
        std::fs::create_dir(&checkout).unwrap();
        let config = WorkspaceConfig::try_from_args(args(&checkout)).unwrap();
        assert_eq!(config.repo, "widgets");
        assert_eq!(config.max_matches, 1);
        assert_eq!(config.search_timeout, Duration::from_secs(1));
        assert_eq!(config.settings.unindexed_timeout(), Duration::from_millis(250));
        assert!(config.settings.indexed_only);
        assert!(config.settings.public_instance);
        assert_eq!(config.precise_index, Some(config.root.join("index.json")));
    }

    #[tokio::test]
    async fn relative_paths_stay_inside_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo_args = args(dir.path());
        repo_args.precise_index = None;
        let workspace = Workspace::open(WorkspaceConfig::try_from_args(repo_args).unwrap())
            .await
            .unwrap();
        let root = workspace.config().root.clone();
        assert_eq!(workspace.relative_path(&root.join("src/a.rs")).unwrap(), "src/a.rs");
        assert_eq!(workspace.relative_path(Path::new("./src/a.rs")).unwrap(), "src/a.rs");
        assert!(workspace.relative_path(Path::new("../a.rs")).is_err());
        assert!(workspace.relative_path(Path::new("/elsewhere/a.rs")).is_err());
    }

    #[test]
    fn languages_lists_builtin_profiles() {
        let languages = languages().unwrap();
        assert!(languages.iter().any(|l| l.id == "go" && l.extensions.contains(&"go".to_string())));
    }
}
