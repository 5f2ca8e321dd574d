use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::{Result, bail};
use lru::LruCache;
use parking_lot::Mutex;

use crate::cli::ServeArgs;
use crate::lookup::{LookupRequest, LookupSummary, Operation, Workspace, WorkspaceConfig};
use crate::provider::NavigationProvider;
use crate::types::Position;

use super::http;

/// Configuration applied when launching the navigation service.
#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub workspace: WorkspaceConfig,
    pub http_addr: SocketAddr,
}

impl ServeConfig {
    /// Build a runtime configuration from the CLI arguments.
    pub fn try_from_args(args: ServeArgs) -> Result<Self> {
        Ok(Self {
            workspace: WorkspaceConfig::try_from_args(args.repo)?,
            http_addr: args.http_addr,
        })
    }
}

pub struct NavigationServer {
    config: ServeConfig,
}

impl NavigationServer {
    pub fn new(config: ServeConfig) -> Self {
        Self { config }
    }

    /// Serve HTTP until a shutdown signal is received.
    pub async fn run(self) -> Result<()> {
        let workspace = Workspace::open(self.config.workspace).await?;
        let executor = Arc::new(LookupExecutor::new(workspace));
        http::serve(self.config.http_addr, executor).await
    }
}

/// Providers kept for identified clients before the least recent is dropped.
pub const DEFAULT_CLIENT_PROVIDERS: usize = 64;

/// Converts protocol-level requests into workspace lookups.
///
/// Requests naming a client share that client's provider, so a repeated
/// lookup joins the memoized one and a moved cursor cancels it. Clients never
/// see each other's lookups. Anonymous requests get a fresh provider.
pub struct LookupExecutor {
    workspace: Workspace,
    clients: Mutex<LruCache<String, Arc<NavigationProvider>>>,
}

impl LookupExecutor {
    pub fn new(workspace: Workspace) -> Self {
        Self::with_capacity(workspace, DEFAULT_CLIENT_PROVIDERS)
    }

    pub fn with_capacity(workspace: Workspace, clients: usize) -> Self {
        let capacity = NonZeroUsize::new(clients).unwrap_or(NonZeroUsize::MIN);
        Self {
            workspace,
            clients: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn provider_for(&self, client: Option<&str>) -> Arc<NavigationProvider> {
        let Some(client) = client.map(str::trim).filter(|client| !client.is_empty()) else {
            return Arc::new(self.workspace.provider());
        };
        let mut clients = self.clients.lock();
        if let Some(provider) = clients.get(client) {
            return provider.clone();
        }
        let provider = Arc::new(self.workspace.provider());
        clients.put(client.to_string(), provider.clone());
        provider
    }

    pub async fn execute(&self, operation: Operation, input: LookupInput) -> Result<LookupSummary> {
        let LookupInput {
            path,
            line,
            character,
            text,
            language,
            include_declaration,
            client,
        } = input;

        if path.trim().is_empty() {
            bail!("path is required");
        }
        let path = self.workspace.relative_path(std::path::Path::new(&path))?;
        let provider = self.provider_for(client.as_deref());

        self.workspace
            .run(
                &provider,
                LookupRequest {
                    operation,
                    path,
                    text,
                    language,
                    position: Position::new(line, character),
                    include_declaration: include_declaration.unwrap_or(true),
                },
            )
            .await
    }
}

/// Request fields shared by every lookup endpoint.
#[derive(Debug, Default)]
pub struct LookupInput {
    pub path: String,
    pub line: usize,
    pub character: usize,
    pub text: Option<String>,
    pub language: Option<String>,
    pub include_declaration: Option<bool>,
    pub client: Option<String>,
}
