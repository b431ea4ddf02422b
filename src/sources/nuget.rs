use crate::Result;
use crate::config::{NugetConfig, NugetSeed};
use crate::sources::{Candidate, FetchFailure, PackageDetails, ReleaseEntry, classifier, get_json, http_client, repo_url};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const LOG_TARGET: &str = "     nuget";

/// Adapter for the NuGet gallery.
///
/// The search service returns enough metadata (including download counts)
/// that no per-package detail fetch is needed during a sweep.
#[derive(Debug, Clone)]
pub struct Provider {
    client: Client,
    base_url: String,
    seeds: Vec<NugetSeed>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    data: Vec<SearchEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchEntry {
    id: String,
    description: Option<String>,
    version: Option<String>,

    #[serde(rename = "projectUrl")]
    project_url: Option<String>,

    #[serde(rename = "totalDownloads")]
    total_downloads: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RegistrationIndex {
    items: Vec<RegistrationPage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RegistrationPage {
    items: Vec<RegistrationLeaf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RegistrationLeaf {
    #[serde(rename = "catalogEntry")]
    catalog_entry: CatalogEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogEntry {
    id: Option<String>,
    description: Option<String>,
    authors: Option<String>,
    version: Option<String>,

    #[serde(rename = "projectUrl")]
    project_url: Option<String>,

    #[serde(rename = "licenseExpression")]
    license_expression: Option<String>,

    published: Option<DateTime<Utc>>,
}

impl Provider {
    pub fn new(config: &NugetConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            seeds: config.seeds.clone(),
        })
    }

    /// Search the gallery for a keyword, returning normalized candidates.
    pub async fn search(&self, keyword: &str, max_results: usize) -> Vec<Candidate> {
        let mut entries = match self.run_search(keyword, max_results).await {
            Ok(response) => response.data,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Search for '{keyword}' failed: {e}");
                return Vec::new();
            }
        };

        // Labeled seed blend for the AI/ML keyword classes.
        if is_ai_keyword(keyword) {
            for seed in &self.seeds {
                if entries.len() >= max_results {
                    break;
                }

                if !entries.iter().any(|entry| entry.id == seed.id) {
                    entries.push(SearchEntry {
                        id: seed.id.clone(),
                        description: Some(seed.description.clone()),
                        version: Some(seed.version.clone()),
                        ..SearchEntry::default()
                    });
                }
            }
        }

        entries.truncate(max_results);

        let mut libraries = Vec::new();
        for entry in &entries {
            if entry.id.is_empty() {
                continue;
            }

            libraries.push(candidate_from_entry(entry));
            log::info!(target: LOG_TARGET, "Collected data for NuGet package '{}'", entry.id);
        }

        libraries
    }

    /// Detailed information about one package from its registration index.
    pub async fn package_details(&self, id: &str) -> Option<PackageDetails> {
        let url = format!("{}/registration/{}/index.json", self.base_url, id.to_lowercase());

        let index: RegistrationIndex = match get_json(&self.client, &url).await {
            Ok(index) => index,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Unable to fetch details for package '{id}': {e}");
                return None;
            }
        };

        let latest = index.items.last().and_then(|page| page.items.last())?;
        let entry = &latest.catalog_entry;

        let mut releases: Vec<ReleaseEntry> = index
            .items
            .iter()
            .flat_map(|page| &page.items)
            .filter_map(|leaf| {
                leaf.catalog_entry.version.as_ref().map(|version| ReleaseEntry {
                    version: version.clone(),
                    released_at: leaf.catalog_entry.published,
                })
            })
            .collect();
        releases.sort_by(|a, b| b.released_at.cmp(&a.released_at));

        Some(PackageDetails {
            name: entry.id.clone().unwrap_or_else(|| id.to_string()),
            description: entry.description.clone(),
            author: entry.authors.clone(),
            version: entry.version.clone(),
            homepage: entry.project_url.clone(),
            license: entry.license_expression.clone(),
            releases,
        })
    }

    async fn run_search(&self, keyword: &str, max_results: usize) -> core::result::Result<SearchResponse, FetchFailure> {
        let mut url = Url::parse(&format!("{}/query", self.base_url))
            .map_err(|e| FetchFailure::Failed(ohno::app_err!("invalid NuGet base URL: {e}")))?;
        let _ = url
            .query_pairs_mut()
            .append_pair("q", keyword)
            .append_pair("take", &max_results.to_string());

        get_json(&self.client, url.as_str()).await
    }
}

fn is_ai_keyword(keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    keyword.contains("ai") || keyword.contains("machine learning")
}

fn candidate_from_entry(entry: &SearchEntry) -> Candidate {
    let description = entry.description.as_deref().unwrap_or_default();

    Candidate {
        name: entry.id.clone(),
        description: entry.description.clone(),
        version: entry.version.clone(),
        last_update: Utc::now(),
        repository_url: entry.project_url.as_deref().map(repo_url::normalize),
        documentation_url: entry.project_url.clone(),
        package_url: Some(format!("https://www.nuget.org/packages/{}", entry.id)),
        downloads: entry.total_downloads.unwrap_or(0),
        release_notes: None,
        categories: classifier::NUGET.classify(&entry.id, description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_from_entry() {
        let entry: SearchEntry = serde_json::from_str(
            r#"{
                "id": "Microsoft.ML",
                "description": "ML.NET is a cross-platform machine learning framework for .NET.",
                "version": "1.7.1",
                "projectUrl": "https://github.com/dotnet/machinelearning",
                "totalDownloads": 12345678
            }"#,
        )
        .unwrap();

        let candidate = candidate_from_entry(&entry);

        assert_eq!(candidate.name, "Microsoft.ML");
        assert_eq!(candidate.version.as_deref(), Some("1.7.1"));
        assert_eq!(candidate.downloads, 12_345_678);
        assert_eq!(candidate.package_url.as_deref(), Some("https://www.nuget.org/packages/Microsoft.ML"));
        assert_eq!(candidate.repository_url.as_deref(), Some("https://github.com/dotnet/machinelearning"));
        assert!(candidate.categories.contains("Machine Learning"));
    }

    #[test]
    fn test_candidate_with_missing_statistics() {
        let entry: SearchEntry = serde_json::from_str(r#"{"id": "Some.Package"}"#).unwrap();
        let candidate = candidate_from_entry(&entry);

        assert_eq!(candidate.downloads, 0);
        assert!(candidate.repository_url.is_none());
        assert!(!candidate.categories.is_empty());
    }

    #[test]
    fn test_registration_index_parses() {
        let index: RegistrationIndex = serde_json::from_str(
            r#"{
                "items": [{
                    "items": [
                        {"catalogEntry": {"id": "Microsoft.ML", "version": "1.6.0", "published": "2021-03-01T00:00:00Z"}},
                        {"catalogEntry": {"id": "Microsoft.ML", "version": "1.7.1", "published": "2022-01-01T00:00:00Z"}}
                    ]
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(index.items[0].items.len(), 2);
        assert_eq!(index.items[0].items[1].catalog_entry.version.as_deref(), Some("1.7.1"));
    }
}
