use crate::Result;
use crate::config::{MavenConfig, MavenSeed};
use crate::sources::{Candidate, FetchFailure, PackageDetails, ReleaseEntry, classifier, get_json, http_client};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const LOG_TARGET: &str = "     maven";

/// Adapter for Maven Central's solr search API.
///
/// Package identity is the `group:artifact` coordinate pair. Central exposes
/// no download statistics and no per-document timestamps on the plain search
/// core, so those fall back to zero and "now" respectively.
#[derive(Debug, Clone)]
pub struct Provider {
    client: Client,
    base_url: String,
    seeds: Vec<MavenSeed>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SolrResponse {
    response: SolrBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SolrBody {
    docs: Vec<Doc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Doc {
    g: String,
    a: String,

    #[serde(rename = "latestVersion")]
    latest_version: Option<String>,

    /// Version field on the `gav` core.
    v: Option<String>,

    /// Milliseconds since the epoch on the `gav` core.
    timestamp: Option<i64>,

    /// Not reported by the live API; carried by configured seed entries.
    description: Option<String>,
}

impl Provider {
    pub fn new(config: &MavenConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: config.base_url.to_string(),
            seeds: config.seeds.clone(),
        })
    }

    /// Search Maven Central for a keyword, returning normalized candidates.
    pub async fn search(&self, keyword: &str, max_results: usize) -> Vec<Candidate> {
        let mut docs = match self.run_query(&[("q", keyword), ("rows", &max_results.to_string())]).await {
            Ok(response) => response.response.docs,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Search for '{keyword}' failed: {e}");
                return Vec::new();
            }
        };

        // Labeled seed blend for the AI/ML keyword classes.
        if is_ai_keyword(keyword) {
            for seed in &self.seeds {
                if docs.len() >= max_results {
                    break;
                }

                if !docs.iter().any(|doc| doc.g == seed.group && doc.a == seed.artifact) {
                    docs.push(Doc {
                        g: seed.group.clone(),
                        a: seed.artifact.clone(),
                        latest_version: Some(seed.version.clone()),
                        description: Some(seed.description.clone()),
                        ..Doc::default()
                    });
                }
            }
        }

        docs.truncate(max_results);

        let mut libraries = Vec::new();
        for doc in &docs {
            if doc.g.is_empty() || doc.a.is_empty() {
                continue;
            }

            libraries.push(candidate_from_doc(doc));
            log::info!(target: LOG_TARGET, "Collected data for Maven package '{}:{}'", doc.g, doc.a);
        }

        libraries
    }

    /// Detailed information about one `group:artifact` coordinate, listing
    /// every released version from the `gav` core.
    pub async fn package_details(&self, group: &str, artifact: &str) -> Option<PackageDetails> {
        let query = format!("g:{group} AND a:{artifact}");

        let response = match self.run_query(&[("q", &query), ("core", "gav"), ("rows", "100")]).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Unable to fetch details for '{group}:{artifact}': {e}");
                return None;
            }
        };

        let mut releases: Vec<ReleaseEntry> = response
            .response
            .docs
            .into_iter()
            .filter_map(|doc| {
                doc.v.map(|version| ReleaseEntry {
                    version,
                    released_at: doc.timestamp.and_then(DateTime::from_timestamp_millis),
                })
            })
            .collect();
        releases.sort_by(|a, b| b.released_at.cmp(&a.released_at));

        let latest = releases.first().map(|release| release.version.clone());

        Some(PackageDetails {
            name: format!("{group}:{artifact}"),
            description: None,
            author: None,
            version: latest,
            homepage: Some(format!("https://search.maven.org/artifact/{group}/{artifact}")),
            license: None,
            releases,
        })
    }

    async fn run_query(&self, params: &[(&str, &str)]) -> core::result::Result<SolrResponse, FetchFailure> {
        let mut url = Url::parse(&self.base_url).map_err(|e| FetchFailure::Failed(ohno::app_err!("invalid Maven base URL: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                let _ = pairs.append_pair(key, value);
            }
            let _ = pairs.append_pair("wt", "json");
        }

        get_json(&self.client, url.as_str()).await
    }
}

fn is_ai_keyword(keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    keyword.contains("ai") || keyword.contains("machine learning")
}

fn candidate_from_doc(doc: &Doc) -> Candidate {
    let package_id = format!("{}:{}", doc.g, doc.a);
    let latest_version = doc.latest_version.as_deref().unwrap_or_default();
    let description = doc.description.as_deref().unwrap_or_default();

    Candidate {
        description: doc.description.clone(),
        version: doc.latest_version.clone(),
        last_update: Utc::now(),
        // Central reports no repository link; a code search is the best lead
        // and is ignored by the repository-refresh path.
        repository_url: Some(format!("https://github.com/search?q={package_id}")),
        documentation_url: Some(format!("https://search.maven.org/artifact/{}/{}", doc.g, doc.a)),
        package_url: Some(format!("https://search.maven.org/artifact/{}/{}/{latest_version}/jar", doc.g, doc.a)),
        downloads: 0,
        release_notes: None,
        categories: classifier::MAVEN.classify(&package_id, description),
        name: package_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_from_doc() {
        let doc: Doc = serde_json::from_str(
            r#"{"g": "org.deeplearning4j", "a": "deeplearning4j-core", "latestVersion": "1.0.0-M2.1"}"#,
        )
        .unwrap();

        let candidate = candidate_from_doc(&doc);

        assert_eq!(candidate.name, "org.deeplearning4j:deeplearning4j-core");
        assert_eq!(candidate.version.as_deref(), Some("1.0.0-M2.1"));
        assert_eq!(
            candidate.package_url.as_deref(),
            Some("https://search.maven.org/artifact/org.deeplearning4j/deeplearning4j-core/1.0.0-M2.1/jar")
        );
        assert_eq!(candidate.downloads, 0);
        assert!(candidate.categories.contains("Deep Learning"));
    }

    #[test]
    fn test_gav_docs_sort_newest_first() {
        let mut releases = [
            ReleaseEntry {
                version: "1.0".to_string(),
                released_at: DateTime::from_timestamp_millis(1_000),
            },
            ReleaseEntry {
                version: "2.0".to_string(),
                released_at: DateTime::from_timestamp_millis(2_000),
            },
        ];
        releases.sort_by(|a, b| b.released_at.cmp(&a.released_at));

        assert_eq!(releases[0].version, "2.0");
    }

    #[test]
    fn test_solr_response_parses() {
        let response: SolrResponse = serde_json::from_str(
            r#"{"response": {"numFound": 2, "docs": [
                {"g": "ai.djl", "a": "api", "latestVersion": "0.18.0"},
                {"g": "weka", "a": "weka", "latestVersion": "3.9.5"}
            ]}}"#,
        )
        .unwrap();

        assert_eq!(response.response.docs.len(), 2);
        assert_eq!(response.response.docs[0].g, "ai.djl");
    }
}
