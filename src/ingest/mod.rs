//! The periodic ingestion pipeline: adapters feeding the reconciler under
//! the control of the collection scheduler.

mod reconciler;
pub mod scheduler;

pub use reconciler::Reconciler;

use crate::Result;
use crate::config::Config;
use crate::sources::{Candidate, Ecosystem, github, maven, npm, nuget, pypi};
use sqlx::SqlitePool;

const LOG_TARGET: &str = " collector";

/// Holds one adapter per source plus the reconciler, and runs one full
/// keyword sweep per ecosystem.
#[derive(Debug)]
pub struct Collector {
    pypi: pypi::Provider,
    npm: npm::Provider,
    nuget: nuget::Provider,
    maven: maven::Provider,
    github: github::Provider,
    reconciler: Reconciler,
    pypi_keywords: Vec<String>,
    npm_keywords: Vec<String>,
    nuget_keywords: Vec<String>,
    maven_keywords: Vec<String>,
    max_results: usize,
}

impl Collector {
    pub fn new(config: &Config, pool: SqlitePool) -> Result<Self> {
        Ok(Self {
            pypi: pypi::Provider::new(&config.pypi)?,
            npm: npm::Provider::new(&config.npm)?,
            nuget: nuget::Provider::new(&config.nuget)?,
            maven: maven::Provider::new(&config.maven)?,
            github: github::Provider::new(config.github.token.as_deref())?,
            reconciler: Reconciler::new(pool),
            pypi_keywords: config.pypi.keywords.clone(),
            npm_keywords: config.npm.keywords.clone(),
            nuget_keywords: config.nuget.keywords.clone(),
            maven_keywords: config.maven.keywords.clone(),
            max_results: config.max_results,
        })
    }

    /// Run one sweep for an ecosystem: every configured keyword against its
    /// adapter, the concatenated batch handed to the reconciler in one call.
    /// Duplicates across keywords are resolved by the upsert key, not here.
    pub async fn collect(&self, ecosystem: Ecosystem) -> Result<()> {
        let keywords = self.keywords(ecosystem);

        let mut batch: Vec<Candidate> = Vec::new();
        for keyword in keywords {
            log::info!(target: LOG_TARGET, "Sweeping {ecosystem} for '{keyword}'");

            let candidates = match ecosystem {
                Ecosystem::Python => self.pypi.search(keyword, self.max_results).await,
                Ecosystem::JavaScript => self.npm.search(keyword, self.max_results).await,
                Ecosystem::DotNet => self.nuget.search(keyword, self.max_results).await,
                Ecosystem::Java => self.maven.search(keyword, self.max_results).await,
            };

            batch.extend(candidates);
        }

        log::info!(target: LOG_TARGET, "Collected {} candidates for {ecosystem}", batch.len());

        self.reconciler.upsert(&batch, ecosystem).await
    }

    /// Run one repository-refresh pass over the stored catalog.
    pub async fn refresh_repositories(&self) -> Result<()> {
        self.reconciler.refresh_repositories(&self.github).await
    }

    #[must_use]
    pub const fn github(&self) -> &github::Provider {
        &self.github
    }

    #[must_use]
    pub const fn pypi(&self) -> &pypi::Provider {
        &self.pypi
    }

    #[must_use]
    pub const fn npm(&self) -> &npm::Provider {
        &self.npm
    }

    #[must_use]
    pub const fn nuget(&self) -> &nuget::Provider {
        &self.nuget
    }

    #[must_use]
    pub const fn maven(&self) -> &maven::Provider {
        &self.maven
    }

    fn keywords(&self, ecosystem: Ecosystem) -> &[String] {
        match ecosystem {
            Ecosystem::Python => &self.pypi_keywords,
            Ecosystem::JavaScript => &self.npm_keywords,
            Ecosystem::DotNet => &self.nuget_keywords,
            Ecosystem::Java => &self.maven_keywords,
        }
    }
}
