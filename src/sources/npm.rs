use crate::Result;
use crate::config::NpmConfig;
use crate::sources::{Candidate, FetchFailure, POLITE_DELAY, PackageDetails, ReleaseEntry, classifier, get_json, http_client, repo_url};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

const LOG_TARGET: &str = "       npm";

/// Adapter for the npm registry.
#[derive(Debug, Clone)]
pub struct Provider {
    client: Client,
    base_url: String,
    seeds: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    objects: Vec<SearchObject>,
}

#[derive(Debug, Deserialize)]
struct SearchObject {
    package: SearchPackage,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SearchPackage {
    name: String,
    description: Option<String>,
    links: Links,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Links {
    npm: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PackageDocument {
    #[serde(rename = "dist-tags")]
    dist_tags: HashMap<String, String>,

    time: HashMap<String, String>,

    versions: HashMap<String, VersionManifest>,

    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VersionManifest {
    description: Option<String>,
    homepage: Option<String>,
    keywords: Vec<String>,
    repository: Option<Repository>,
    author: Option<Author>,
    license: Option<License>,
}

/// npm manifests report the repository either as a bare URL string or as an
/// object with a `url` member.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Repository {
    Url(String),
    Object {
        #[serde(default)]
        url: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Author {
    Text(String),
    Object {
        #[serde(default)]
        name: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum License {
    Text(String),
    Object {
        #[serde(default, rename = "type")]
        kind: Option<String>,
    },
}

impl Provider {
    pub fn new(config: &NpmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            seeds: config.seeds.clone(),
        })
    }

    /// Search the registry for a keyword, returning normalized candidates.
    pub async fn search(&self, keyword: &str, max_results: usize) -> Vec<Candidate> {
        let mut packages: Vec<SearchPackage> = match self.run_search(keyword, max_results).await {
            Ok(response) => response.objects.into_iter().map(|o| o.package).collect(),
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Search for '{keyword}' failed: {e}");
                return Vec::new();
            }
        };

        // Labeled seed blend: known-good packages the live search tends to
        // miss, appended only for the AI/ML keyword classes.
        if is_ai_keyword(keyword) {
            for seed in &self.seeds {
                if packages.len() >= max_results {
                    break;
                }

                if !packages.iter().any(|p| &p.name == seed) {
                    packages.push(SearchPackage {
                        name: seed.clone(),
                        ..SearchPackage::default()
                    });
                }
            }
        }

        packages.truncate(max_results);

        let mut libraries = Vec::new();
        for package in &packages {
            if package.name.is_empty() {
                continue;
            }

            tokio::time::sleep(POLITE_DELAY).await;

            match self.fetch_document(&package.name).await {
                Ok(document) => {
                    libraries.push(candidate_from_document(package, &document));
                    log::info!(target: LOG_TARGET, "Collected data for npm package '{}'", package.name);
                }
                Err(FetchFailure::RateLimited) => {
                    log::warn!(target: LOG_TARGET, "Rate limited while fetching '{}', stopping this sweep early", package.name);
                    break;
                }
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Skipping package '{}': {e}", package.name);
                }
            }
        }

        libraries
    }

    /// Detailed information about one package, including its release history.
    pub async fn package_details(&self, name: &str) -> Option<PackageDetails> {
        match self.fetch_document(name).await {
            Ok(document) => Some(details_from_document(name, document)),
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Unable to fetch details for package '{name}': {e}");
                None
            }
        }
    }

    async fn run_search(&self, keyword: &str, max_results: usize) -> core::result::Result<SearchResponse, FetchFailure> {
        let mut url = Url::parse(&format!("{}/-/v1/search", self.base_url))
            .map_err(|e| FetchFailure::Failed(ohno::app_err!("invalid npm base URL: {e}")))?;
        let _ = url
            .query_pairs_mut()
            .append_pair("text", keyword)
            .append_pair("size", &max_results.to_string());

        get_json(&self.client, url.as_str()).await
    }

    async fn fetch_document(&self, name: &str) -> core::result::Result<PackageDocument, FetchFailure> {
        let url = format!("{}/{name}", self.base_url);
        get_json(&self.client, &url).await
    }
}

fn is_ai_keyword(keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    keyword.contains("ai") || keyword.contains("machine-learning")
}

fn candidate_from_document(package: &SearchPackage, document: &PackageDocument) -> Candidate {
    let name = &package.name;
    let latest = document.dist_tags.get("latest");
    let manifest = latest.and_then(|version| document.versions.get(version));

    let last_update = latest
        .and_then(|version| document.time.get(version))
        .and_then(|raw| parse_timestamp(raw))
        .unwrap_or_else(Utc::now);

    let repository_url = manifest
        .and_then(|m| m.repository.as_ref())
        .and_then(|repository| match repository {
            Repository::Url(url) => Some(url.as_str()),
            Repository::Object { url } => url.as_deref(),
        })
        .map(repo_url::normalize);

    let description = package
        .description
        .clone()
        .or_else(|| manifest.and_then(|m| m.description.clone()))
        .or_else(|| document.description.clone());

    let keywords = manifest.map(|m| m.keywords.join(" ")).unwrap_or_default();

    Candidate {
        name: name.clone(),
        description,
        version: latest.cloned(),
        last_update,
        repository_url,
        documentation_url: manifest.and_then(|m| m.homepage.clone()),
        package_url: Some(
            package
                .links
                .npm
                .clone()
                .unwrap_or_else(|| format!("https://www.npmjs.com/package/{name}")),
        ),
        downloads: 0,
        release_notes: None,
        categories: classifier::NPM.classify(name, &keywords),
    }
}

fn details_from_document(name: &str, document: PackageDocument) -> PackageDetails {
    let latest = document.dist_tags.get("latest").cloned();
    let manifest = latest.as_ref().and_then(|version| document.versions.get(version));

    let mut releases: Vec<ReleaseEntry> = document
        .time
        .iter()
        .filter(|(version, _)| *version != "created" && *version != "modified")
        .map(|(version, raw)| ReleaseEntry {
            version: version.clone(),
            released_at: parse_timestamp(raw),
        })
        .collect();
    releases.sort_by(|a, b| b.released_at.cmp(&a.released_at));

    PackageDetails {
        name: name.to_string(),
        description: manifest.and_then(|m| m.description.clone()).or_else(|| document.description.clone()),
        author: manifest.and_then(|m| match &m.author {
            Some(Author::Text(text)) => Some(text.clone()),
            Some(Author::Object { name }) => name.clone(),
            None => None,
        }),
        homepage: manifest.and_then(|m| m.homepage.clone()),
        license: manifest.and_then(|m| match &m.license {
            Some(License::Text(text)) => Some(text.clone()),
            Some(License::Object { kind }) => kind.clone(),
            None => None,
        }),
        version: latest,
        releases,
    }
}

/// The registry reports times as RFC 3339, with or without fractional seconds.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|t| t.with_timezone(&Utc))
}
