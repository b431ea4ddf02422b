use crate::Result;
use crate::config::{PypiConfig, PypiSeeds};
use crate::sources::{Candidate, FetchFailure, POLITE_DELAY, PackageDetails, ReleaseEntry, classifier, get_json, http_client, repo_url};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

const LOG_TARGET: &str = "      pypi";

/// Project-URL keys probed for a repository link, in order of preference.
const REPOSITORY_URL_KEYS: [&str; 3] = ["Source", "Homepage", "Repository"];

/// Project-URL keys probed for a documentation link, in order of preference.
const DOCUMENTATION_URL_KEYS: [&str; 3] = ["Documentation", "Docs", "Homepage"];

/// Adapter for the Python package index.
///
/// PyPI has no JSON search endpoint, so a sweep resolves the configured seed
/// names for the keyword's class through the per-package JSON API instead of
/// querying live search results.
#[derive(Debug, Clone)]
pub struct Provider {
    client: Client,
    base_url: String,
    seeds: PypiSeeds,
}

#[derive(Debug, Deserialize)]
struct Package {
    info: Info,

    #[serde(default)]
    urls: Vec<Artifact>,

    #[serde(default)]
    releases: HashMap<String, Vec<Artifact>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Info {
    name: Option<String>,
    summary: Option<String>,
    version: Option<String>,
    author: Option<String>,
    home_page: Option<String>,
    license: Option<String>,
    keywords: Option<String>,
    package_url: Option<String>,
    project_urls: Option<HashMap<String, Option<String>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Artifact {
    upload_time_iso_8601: Option<DateTime<Utc>>,
}

impl Provider {
    pub fn new(config: &PypiConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            seeds: config.seeds.clone(),
        })
    }

    /// Resolve a keyword into normalized candidates.
    pub async fn search(&self, keyword: &str, max_results: usize) -> Vec<Candidate> {
        let names = self.seed_bucket(keyword);

        let mut libraries = Vec::new();
        for name in names.iter().take(max_results) {
            tokio::time::sleep(POLITE_DELAY).await;

            match self.fetch_package(name).await {
                Ok(package) => {
                    libraries.push(candidate_from_package(name, &package));
                    log::info!(target: LOG_TARGET, "Collected data for Python package '{name}'");
                }
                Err(FetchFailure::RateLimited) => {
                    log::warn!(target: LOG_TARGET, "Rate limited while fetching '{name}', stopping this sweep early");
                    break;
                }
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Skipping package '{name}': {e}");
                }
            }
        }

        libraries
    }

    /// Detailed information about one package, including its release history.
    pub async fn package_details(&self, name: &str) -> Option<PackageDetails> {
        match self.fetch_package(name).await {
            Ok(package) => Some(details_from_package(name, package)),
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Unable to fetch details for package '{name}': {e}");
                None
            }
        }
    }

    async fn fetch_package(&self, name: &str) -> core::result::Result<Package, FetchFailure> {
        let url = format!("{}/{name}/json", self.base_url);
        get_json(&self.client, &url).await
    }

    /// Pick the curated name list matching the keyword's class.
    fn seed_bucket(&self, keyword: &str) -> &[String] {
        let keyword = keyword.to_lowercase();

        if keyword.contains("ai") || keyword.contains("machine learning") {
            &self.seeds.ai
        } else if keyword.contains("nlp") {
            &self.seeds.nlp
        } else if keyword.contains("computer vision") {
            &self.seeds.vision
        } else {
            &self.seeds.general
        }
    }
}

fn candidate_from_package(requested_name: &str, package: &Package) -> Candidate {
    let info = &package.info;
    let name = info.name.clone().unwrap_or_else(|| requested_name.to_string());

    let project_urls = info.project_urls.as_ref();

    let repository_url = project_urls
        .and_then(|urls| {
            REPOSITORY_URL_KEYS
                .iter()
                .filter_map(|key| urls.get(*key).and_then(Option::as_deref))
                .find(|value| value.contains("github.com"))
        })
        .map(repo_url::normalize);

    let documentation_url = project_urls.and_then(|urls| {
        DOCUMENTATION_URL_KEYS
            .iter()
            .filter_map(|key| urls.get(*key).and_then(Option::as_deref))
            .find(|value| !value.is_empty())
            .map(ToString::to_string)
    });

    let last_update = package
        .urls
        .first()
        .and_then(|artifact| artifact.upload_time_iso_8601)
        .unwrap_or_else(Utc::now);

    let categories = classifier::PYPI.classify(&name, info.keywords.as_deref().unwrap_or_default());

    Candidate {
        package_url: Some(
            info.package_url
                .clone()
                .unwrap_or_else(|| format!("https://pypi.org/project/{requested_name}/")),
        ),
        name,
        description: info.summary.clone(),
        version: info.version.clone(),
        last_update,
        repository_url,
        documentation_url,
        downloads: 0,
        release_notes: None,
        categories,
    }
}

fn details_from_package(requested_name: &str, package: Package) -> PackageDetails {
    let mut releases: Vec<ReleaseEntry> = package
        .releases
        .into_iter()
        .filter(|(_, artifacts)| !artifacts.is_empty())
        .map(|(version, artifacts)| ReleaseEntry {
            version,
            released_at: artifacts.first().and_then(|a| a.upload_time_iso_8601),
        })
        .collect();
    releases.sort_by(|a, b| b.released_at.cmp(&a.released_at));

    let info = package.info;
    PackageDetails {
        name: info.name.unwrap_or_else(|| requested_name.to_string()),
        description: info.summary,
        author: info.author,
        version: info.version,
        homepage: info.home_page,
        license: info.license,
        releases,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Package {
        serde_json::from_str(
            r#"{
                "info": {
                    "name": "transformers",
                    "summary": "State-of-the-art Machine Learning",
                    "version": "4.24.0",
                    "author": "The Hugging Face team",
                    "home_page": "https://github.com/huggingface/transformers",
                    "license": "Apache 2.0",
                    "keywords": "nlp, deep learning, transformer",
                    "package_url": "https://pypi.org/project/transformers/",
                    "project_urls": {
                        "Documentation": "https://huggingface.co/docs/transformers",
                        "Source": "https://github.com/huggingface/transformers.git",
                        "Funding": null
                    }
                },
                "urls": [{"upload_time_iso_8601": "2022-11-01T14:30:00.000000Z"}],
                "releases": {
                    "4.24.0": [{"upload_time_iso_8601": "2022-11-01T14:30:00.000000Z"}],
                    "4.23.0": [{"upload_time_iso_8601": "2022-10-10T09:00:00.000000Z"}],
                    "0.1.0": []
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_candidate_from_package() {
        let candidate = candidate_from_package("transformers", &fixture());

        assert_eq!(candidate.name, "transformers");
        assert_eq!(candidate.version.as_deref(), Some("4.24.0"));
        assert_eq!(candidate.repository_url.as_deref(), Some("https://github.com/huggingface/transformers"));
        assert_eq!(candidate.documentation_url.as_deref(), Some("https://huggingface.co/docs/transformers"));
        assert_eq!(candidate.package_url.as_deref(), Some("https://pypi.org/project/transformers/"));
        assert_eq!(candidate.downloads, 0);
        assert_eq!(candidate.last_update.to_rfc3339(), "2022-11-01T14:30:00+00:00");
        assert!(candidate.categories.contains("Natural Language Processing"));
        assert!(candidate.categories.contains("Deep Learning"));
    }

    #[test]
    fn test_candidate_falls_back_when_fields_missing() {
        let package: Package = serde_json::from_str(r#"{"info": {}}"#).unwrap();
        let candidate = candidate_from_package("mystery", &package);

        assert_eq!(candidate.name, "mystery");
        assert!(candidate.description.is_none());
        assert!(candidate.repository_url.is_none());
        assert_eq!(candidate.package_url.as_deref(), Some("https://pypi.org/project/mystery/"));
        assert!(!candidate.categories.is_empty());
    }

    #[test]
    fn test_details_release_history_is_newest_first() {
        let details = details_from_package("transformers", fixture());

        assert_eq!(details.releases.len(), 2);
        assert_eq!(details.releases[0].version, "4.24.0");
        assert_eq!(details.releases[1].version, "4.23.0");
        assert_eq!(details.license.as_deref(), Some("Apache 2.0"));
    }
}
