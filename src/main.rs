//! A service that mirrors AI/ML library metadata from four package
//! ecosystems and GitHub into a browsable catalog.
//!
//! # Overview
//!
//! `genai-pulse` periodically sweeps PyPI, npm, NuGet, and Maven Central for
//! AI/ML-related packages, normalizes what it finds into a common schema,
//! reconciles it into a SQLite catalog (preserving version history), and
//! serves the result through a JSON API and a small browsing UI. A separate
//! periodic job refreshes GitHub star counts and recomputes each library's
//! popularity score.
//!
//! # Quick Start
//!
//! Run the service with the embedded default configuration:
//!
//! ```bash
//! genai-pulse serve
//! ```
//!
//! This seeds an empty database with sample data, starts the periodic
//! collection jobs, and serves the catalog on `127.0.0.1:8080`.
//!
//! # Commands
//!
//! **Run one collection sweep immediately:**
//! ```bash
//! genai-pulse collect --ecosystem python
//! ```
//!
//! **Refresh GitHub stars for the stored catalog:**
//! ```bash
//! genai-pulse refresh-repos
//! ```
//!
//! **Inspect one package's registry detail:**
//! ```bash
//! genai-pulse inspect --ecosystem javascript --name brain.js
//! genai-pulse inspect --ecosystem java --name org.deeplearning4j:deeplearning4j-core
//! ```
//!
//! **Search GitHub for AI/ML repositories:**
//! ```bash
//! genai-pulse search-repos --query "llm agents"
//! genai-pulse search-repos --trending
//! ```
//!
//! # Configuration
//!
//! All settings ship as embedded defaults; pass `--config <file>` with a
//! YAML file of the same shape to override them. Registry base URLs, the
//! database URL, and the bind address can also be overridden through the
//! environment (`PYPI_API_URL`, `NPM_API_URL`, `NUGET_API_URL`,
//! `MAVEN_API_URL`, `DATABASE_URL`, `BIND_ADDR`).
//!
//! # GitHub Integration
//!
//! Star counts and repository activity come from the GitHub API. Without a
//! token the unauthenticated rate limit (60 requests/hour) applies; supply
//! one via `GITHUB_TOKEN` or `--github-token` to raise it to 5000.

use clap::{Parser, Subcommand, ValueEnum};
use genai_pulse::Result;
use genai_pulse::config::Config;
use genai_pulse::ingest::{Collector, scheduler};
use genai_pulse::server;
use genai_pulse::sources::{Ecosystem, github, maven, npm, nuget, pypi};
use genai_pulse::store::{self, Catalog};
use ohno::{IntoAppError, app_err};
use std::path::PathBuf;
use std::sync::Arc;

/// Result-count cap for repository searches from the CLI.
const SEARCH_REPOS_COUNT: usize = 20;

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    /// No logging output
    None,
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Info, warning, and error messages
    Info,
    /// Debug and above messages
    Debug,
    /// All messages including trace
    Trace,
}

#[derive(Parser, Debug)]
#[command(name = "genai-pulse", version, about)]
struct Cli {
    /// Path to configuration file
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", global = true)]
    github_token: Option<String>,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service and the periodic collection jobs
    Serve,
    /// Run one collection sweep for an ecosystem immediately
    Collect {
        /// Ecosystem to sweep
        #[arg(long, value_enum)]
        ecosystem: Ecosystem,
    },
    /// Refresh repository stars and popularity scores for the stored catalog
    RefreshRepos,
    /// Load sample data into an empty store
    Seed,
    /// Show registry detail for one package
    Inspect {
        /// Ecosystem the package belongs to
        #[arg(long, value_enum)]
        ecosystem: Ecosystem,

        /// Package name; Maven packages are addressed as 'group:artifact'
        #[arg(long)]
        name: String,
    },
    /// Search the repository host for AI/ML repositories
    SearchRepos {
        /// Free-text search query
        #[arg(long, value_name = "QUERY")]
        query: Option<String>,

        /// List repositories created within the last month instead
        #[arg(long)]
        trending: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(token) = cli.github_token {
        config.github.token = Some(token);
    }

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Collect { ecosystem } => build_collector(&config).await?.collect(ecosystem).await,
        Command::RefreshRepos => build_collector(&config).await?.refresh_repositories().await,
        Command::Seed => {
            let pool = store::connect(&config.database_url).await?;
            store::seed_sample_data(&pool).await
        }
        Command::Inspect { ecosystem, name } => inspect(&config, ecosystem, &name).await,
        Command::SearchRepos { query, trending } => search_repos(&config, query.as_deref(), trending).await,
    }
}

/// Initialize logger based on log level
fn init_logging(log_level: LogLevel) {
    if log_level == LogLevel::None {
        return;
    }

    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    env_logger::Builder::from_env(env)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug) || matches!(log_level, LogLevel::Trace))
        .init();
}

async fn serve(config: Config) -> Result<()> {
    let pool = store::connect(&config.database_url).await?;
    store::seed_sample_data(&pool).await?;

    let collector = Arc::new(Collector::new(&config, pool.clone())?);
    let _jobs = scheduler::spawn(&collector, &config);

    server::serve(&config.bind_addr, Catalog::new(pool)).await
}

async fn build_collector(config: &Config) -> Result<Collector> {
    let pool = store::connect(&config.database_url).await?;
    Collector::new(config, pool)
}

async fn inspect(config: &Config, ecosystem: Ecosystem, name: &str) -> Result<()> {
    let details = match ecosystem {
        Ecosystem::Python => pypi::Provider::new(&config.pypi)?.package_details(name).await,
        Ecosystem::JavaScript => npm::Provider::new(&config.npm)?.package_details(name).await,
        Ecosystem::DotNet => nuget::Provider::new(&config.nuget)?.package_details(name).await,
        Ecosystem::Java => {
            let (group, artifact) = name
                .split_once(':')
                .ok_or_else(|| app_err!("Maven packages are addressed as 'group:artifact'"))?;
            maven::Provider::new(&config.maven)?.package_details(group, artifact).await
        }
    };

    match details {
        Some(details) => {
            println!("{}", serde_json::to_string_pretty(&details).into_app_err("unable to render package details")?);
        }
        None => println!("No details available for '{name}'"),
    }

    Ok(())
}

async fn search_repos(config: &Config, query: Option<&str>, trending: bool) -> Result<()> {
    let github = github::Provider::new(config.github.token.as_deref())?;

    let repos = if trending {
        github.trending_repositories().await?
    } else {
        let query = query.ok_or_else(|| app_err!("--query is required unless --trending is set"))?;
        github.search_repositories(query, SEARCH_REPOS_COUNT).await?
    };

    println!("{}", serde_json::to_string_pretty(&repos).into_app_err("unable to render search results")?);

    Ok(())
}
