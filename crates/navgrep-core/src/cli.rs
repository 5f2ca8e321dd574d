use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::settings::DEFAULT_UNINDEXED_TIMEOUT_MS;

/// Top-level CLI definition for navgrep.
#[derive(Parser, Debug)]
#[command(name = "navgrep")]
#[command(about = "Search-based code navigation: definitions, references and hover", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find the definition of the symbol at a position.
    Definition(LookupArgs),
    /// Find references to the symbol at a position.
    References(LookupArgs),
    /// Show hover documentation for the symbol at a position.
    Hover(LookupArgs),
    /// Run the HTTP navigation service.
    Serve(ServeArgs),
    /// List the built-in language profiles.
    Languages,
}

/// Repository and search behaviour shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct RepoArgs {
    /// Root directory of the repository; defaults to the current working directory.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Repository name used in queries and result URIs; defaults to the root directory name.
    #[arg(long)]
    pub repo: Option<String>,

    /// Revision used in queries and result URIs.
    #[arg(long, default_value = "HEAD")]
    pub revision: String,

    /// Delay before the index-only fallback query is issued (milliseconds).
    #[arg(long, default_value_t = DEFAULT_UNINDEXED_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Timeout applied to each ripgrep invocation (seconds).
    #[arg(long, default_value_t = 10)]
    pub search_timeout_secs: u64,

    /// Maximum number of ripgrep matches collected per query.
    #[arg(long, default_value_t = 2_000)]
    pub max_matches: usize,

    /// Only issue index-backed queries.
    #[arg(long, default_value_t = false)]
    pub indexed_only: bool,

    /// Log every search query at info level.
    #[arg(long, default_value_t = false)]
    pub trace: bool,

    /// Include forked and archived repositories in every query.
    #[arg(long, default_value_t = false)]
    pub include_forks: bool,

    /// Skip cross-repository tiers, as on a shared multi-tenant deployment.
    #[arg(long, default_value_t = false)]
    pub public_instance: bool,

    /// JSON file with precise definitions, references and hovers.
    #[arg(long)]
    pub precise_index: Option<PathBuf>,
}

/// Arguments for the `definition`, `references` and `hover` subcommands.
#[derive(clap::Args, Debug, Clone)]
pub struct LookupArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// File containing the symbol, absolute or relative to the root.
    #[arg(long)]
    pub file: PathBuf,

    /// Zero-based line of the symbol.
    #[arg(long)]
    pub line: usize,

    /// Zero-based character offset of the symbol within the line.
    #[arg(long)]
    pub character: usize,

    /// Language id override (e.g. go, python, typescript).
    #[arg(long)]
    pub language: Option<String>,

    /// Leave the declaration out of reference results.
    #[arg(long, default_value_t = false)]
    pub exclude_declaration: bool,
}

/// Arguments for the `serve` subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Address for the HTTP server.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub http_addr: SocketAddr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lookup_arguments() {
        let cli = Cli::parse_from([
            "navgrep",
            "references",
            "--file",
            "src/lib.rs",
            "--line",
            "3",
            "--character",
            "7",
            "--indexed-only",
            "--exclude-declaration",
        ]);
        let Commands::References(args) = cli.command else {
            panic!("expected references");
        };
        assert_eq!(args.line, 3);
        assert_eq!(args.character, 7);
        assert!(args.repo.indexed_only);
        assert!(args.exclude_declaration);
        assert_eq!(args.repo.revision, "HEAD");
        assert_eq!(args.repo.timeout_ms, DEFAULT_UNINDEXED_TIMEOUT_MS);
    }

    #[test]
    fn serve_defaults_to_loopback() {
        let cli = Cli::parse_from(["navgrep", "serve"]);
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.http_addr, "127.0.0.1:8080".parse().unwrap());
    }
}
