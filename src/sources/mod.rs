//! Source adapters for the mirrored package ecosystems and the repository host.
//!
//! Each adapter turns a free-text keyword into normalized [`Candidate`]
//! records and offers a per-package detail lookup. Adapters never propagate
//! individual fetch failures: a poisoned keyword or package is logged and
//! skipped so a sweep always returns whatever it managed to normalize.

use crate::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use core::fmt::{Display, Formatter};
use core::time::Duration;
use ohno::app_err;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;

pub mod classifier;
pub mod github;
pub mod maven;
pub mod npm;
pub mod nuget;
pub mod pypi;
pub mod repo_url;

/// Minimum pause between per-package detail fetches against one registry.
pub(crate) const POLITE_DELAY: Duration = Duration::from_millis(250);

/// Outbound request timeout; a wedged registry must not wedge a sweep.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "genai-pulse";

/// One package-hosting platform being mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, ValueEnum)]
pub enum Ecosystem {
    #[strum(serialize = "Python")]
    #[value(name = "python")]
    Python,

    #[strum(serialize = "JavaScript")]
    #[value(name = "javascript")]
    JavaScript,

    #[strum(serialize = ".NET")]
    #[value(name = "dotnet")]
    DotNet,

    #[strum(serialize = "Java")]
    #[value(name = "java")]
    Java,
}

/// A normalized, not-yet-persisted library record produced by an adapter.
///
/// `None` fields mean the registry offered nothing; the upsert engine leaves
/// the stored value untouched for those. `categories` is never empty thanks to
/// the classifier's ecosystem-default fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub last_update: DateTime<Utc>,
    pub repository_url: Option<String>,
    pub documentation_url: Option<String>,
    pub package_url: Option<String>,
    pub downloads: i64,
    pub release_notes: Option<String>,
    pub categories: BTreeSet<String>,
}

/// Detailed information about a single package, as returned by an adapter's
/// detail lookup. Registries differ in what they expose; absent fields are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct PackageDetails {
    pub name: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
    pub releases: Vec<ReleaseEntry>,
}

/// One entry in a package's release history.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseEntry {
    pub version: String,
    pub released_at: Option<DateTime<Utc>>,
}

/// Why a registry fetch produced no payload.
#[derive(Debug)]
pub(crate) enum FetchFailure {
    /// The remote signaled rate limiting; the caller stops issuing further
    /// detail fetches for the current call.
    RateLimited,

    /// Anything else: transport error, non-success status, malformed payload.
    Failed(ohno::AppError),
}

impl Display for FetchFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limited by remote"),
            Self::Failed(e) => write!(f, "{e}"),
        }
    }
}

/// Build the HTTP client shared by a registry adapter.
pub(crate) fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| app_err!("unable to construct HTTP client: {e}"))
}

/// GET a JSON payload, classifying rate-limit responses separately so callers
/// can short-circuit the rest of a sweep's detail fetches.
pub(crate) async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> core::result::Result<T, FetchFailure> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchFailure::Failed(app_err!("request to '{url}' failed: {e}")))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchFailure::RateLimited);
    }

    if status == StatusCode::FORBIDDEN {
        let body = response.text().await.unwrap_or_default();
        if body.to_lowercase().contains("rate limit") {
            return Err(FetchFailure::RateLimited);
        }

        return Err(FetchFailure::Failed(app_err!("request to '{url}' was forbidden")));
    }

    if !status.is_success() {
        return Err(FetchFailure::Failed(app_err!("request to '{url}' returned status {status}")));
    }

    response
        .json()
        .await
        .map_err(|e| FetchFailure::Failed(app_err!("malformed payload from '{url}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecosystem_display_matches_stored_labels() {
        assert_eq!(Ecosystem::Python.to_string(), "Python");
        assert_eq!(Ecosystem::JavaScript.to_string(), "JavaScript");
        assert_eq!(Ecosystem::DotNet.to_string(), ".NET");
        assert_eq!(Ecosystem::Java.to_string(), "Java");
    }
}
