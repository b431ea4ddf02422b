use crate::Result;
use crate::sources::{FetchFailure, get_json};
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use ohno::app_err;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

const LOG_TARGET: &str = "    github";

/// Window inspected for recent commit activity.
const COMMIT_LOOKBACK_DAYS: i64 = 30;

/// Most recent commit younger than this many days counts as high activity.
const HIGH_ACTIVITY_DAYS: i64 = 7;

/// Most recent commit younger than this many days counts as medium activity.
const MEDIUM_ACTIVITY_DAYS: i64 = 30;

/// Number of releases fetched when probing for the latest release date.
const RELEASE_PROBE_COUNT: u8 = 5;

/// Window used when looking for recently created repositories.
const TRENDING_LOOKBACK_DAYS: i64 = 30;

const TRENDING_PAGE_SIZE: u8 = 20;

const API_ROOT: &str = "https://api.github.com";

/// Topic filter applied to repository searches.
const TOPIC_FILTER: &str = "topic:ai OR topic:machine-learning OR topic:deep-learning";

/// Derived recency classification of a repository's commit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    High,
    Medium,
    Low,
    Unknown,
}

/// Repository facts gathered by [`Provider::repository_detail`].
#[derive(Debug, Clone, Serialize)]
pub struct RepoDetail {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub stars: i64,
    pub forks: i64,
    pub open_issues: i64,
    pub watchers: i64,
    pub latest_release_at: Option<DateTime<Utc>>,
    pub last_commit_at: Option<DateTime<Utc>>,
    pub activity: ActivityLevel,
}

/// One hit from a repository search.
#[derive(Debug, Clone, Serialize)]
pub struct RepoSummary {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub stars: i64,
    pub forks: i64,
    pub url: Option<String>,
    pub language: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Client for the repository host.
///
/// Typed lookups go through octocrab; the releases and commits probes use a
/// plain HTTP client because only one field of one entry is ever needed.
#[derive(Debug, Clone)]
pub struct Provider {
    octocrab: Octocrab,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct Release {
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CommitEntry {
    commit: CommitDetail,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommitDetail {
    committer: Option<Signature>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Signature {
    date: Option<DateTime<Utc>>,
}

impl Provider {
    /// Create a new repository-host client. A token is optional but raises
    /// the API rate limit substantially.
    pub fn new(token: Option<&str>) -> Result<Self> {
        let mut builder = Octocrab::builder();
        let mut client_builder = Client::builder().user_agent("genai-pulse");

        if let Some(t) = token {
            let mut auth_val =
                reqwest::header::HeaderValue::from_str(&format!("token {t}")).map_err(|e| app_err!("invalid GitHub token: {e}"))?;
            auth_val.set_sensitive(true);

            let mut headers = reqwest::header::HeaderMap::new();
            let _ = headers.insert(reqwest::header::AUTHORIZATION, auth_val);

            client_builder = client_builder.default_headers(headers);
            builder = builder.personal_token(t);
        }

        Ok(Self {
            octocrab: builder.build().map_err(|e| app_err!("unable to construct GitHub client: {e}"))?,
            client: client_builder.build().map_err(|e| app_err!("unable to construct HTTP client: {e}"))?,
        })
    }

    /// Fetch repository facts for one owner/repo pair.
    ///
    /// Returns `Ok(None)` when the repository does not exist or the repo-info
    /// call itself was rate limited; callers skip the record and retain
    /// whatever they already have stored. A failing commits probe degrades
    /// the activity level to `unknown` instead of failing the lookup.
    pub async fn repository_detail(&self, owner: &str, repo: &str) -> Result<Option<RepoDetail>> {
        let repo_data = match self.octocrab.repos(owner, repo).get().await {
            Ok(data) => data,
            Err(e) => {
                if is_not_found(&e) {
                    log::info!(target: LOG_TARGET, "Repository '{owner}/{repo}' not found (404)");
                    return Ok(None);
                }

                if is_rate_limited(&e) {
                    log::warn!(target: LOG_TARGET, "Rate limited while fetching repository '{owner}/{repo}'");
                    return Ok(None);
                }

                return Err(app_err!("could not fetch repository info for '{owner}/{repo}': {e}"));
            }
        };

        let latest_release_at = self.latest_release_date(owner, repo).await;

        let (last_commit_at, activity) = match self.last_commit_date(owner, repo).await {
            Ok(Some(date)) => (Some(date), activity_level(Utc::now(), date)),
            Ok(None) => (None, ActivityLevel::Unknown),
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Commit probe for '{owner}/{repo}' failed, activity unknown: {e}");
                (None, ActivityLevel::Unknown)
            }
        };

        Ok(Some(RepoDetail {
            name: repo_data.name.clone(),
            full_name: repo_data.full_name.clone().unwrap_or_else(|| format!("{owner}/{repo}")),
            description: repo_data.description.clone(),
            stars: i64::from(repo_data.stargazers_count.unwrap_or(0)),
            forks: i64::from(repo_data.forks_count.unwrap_or(0)),
            open_issues: i64::from(repo_data.open_issues_count.unwrap_or(0)),
            watchers: i64::from(repo_data.watchers_count.unwrap_or(0)),
            latest_release_at,
            last_commit_at,
            activity,
        }))
    }

    /// Search for AI/ML repositories matching a free-text query, most starred
    /// first.
    pub async fn search_repositories(&self, query: &str, max_results: usize) -> Result<Vec<RepoSummary>> {
        let full_query = format!("{query} {TOPIC_FILTER}");
        self.run_repo_search(&full_query, clamp_page_size(max_results)).await
    }

    /// Repositories created within the last month, most starred first.
    pub async fn trending_repositories(&self) -> Result<Vec<RepoSummary>> {
        let cutoff = (Utc::now() - chrono::Duration::days(TRENDING_LOOKBACK_DAYS)).format("%Y-%m-%d");
        let full_query = format!("{TOPIC_FILTER} created:>{cutoff}");
        self.run_repo_search(&full_query, TRENDING_PAGE_SIZE).await
    }

    async fn run_repo_search(&self, query: &str, page_size: u8) -> Result<Vec<RepoSummary>> {
        let page = match self
            .octocrab
            .search()
            .repositories(query)
            .sort("stars")
            .order("desc")
            .per_page(page_size)
            .send()
            .await
        {
            Ok(page) => page,
            Err(e) => {
                if is_rate_limited(&e) {
                    log::warn!(target: LOG_TARGET, "Rate limited while searching repositories for '{query}'");
                    return Ok(Vec::new());
                }

                return Err(app_err!("repository search for '{query}' failed: {e}"));
            }
        };

        Ok(page
            .items
            .into_iter()
            .map(|repo| RepoSummary {
                full_name: repo.full_name.clone().unwrap_or_else(|| repo.name.clone()),
                name: repo.name,
                description: repo.description,
                stars: i64::from(repo.stargazers_count.unwrap_or(0)),
                forks: i64::from(repo.forks_count.unwrap_or(0)),
                url: repo.html_url.map(|u| u.to_string()),
                language: repo.language.as_ref().and_then(|v| v.as_str().map(ToString::to_string)),
                created_at: repo.created_at,
            })
            .collect())
    }

    async fn latest_release_date(&self, owner: &str, repo: &str) -> Option<DateTime<Utc>> {
        let url = format!("{API_ROOT}/repos/{owner}/{repo}/releases?per_page={RELEASE_PROBE_COUNT}");

        match get_json::<Vec<Release>>(&self.client, &url).await {
            Ok(releases) => releases.first().and_then(|release| release.published_at),
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Release probe for '{owner}/{repo}' failed: {e}");
                None
            }
        }
    }

    async fn last_commit_date(&self, owner: &str, repo: &str) -> core::result::Result<Option<DateTime<Utc>>, FetchFailure> {
        let since = Utc::now() - chrono::Duration::days(COMMIT_LOOKBACK_DAYS);

        let mut url = Url::parse(&format!("{API_ROOT}/repos/{owner}/{repo}/commits"))
            .map_err(|e| FetchFailure::Failed(app_err!("invalid commits URL: {e}")))?;
        let _ = url
            .query_pairs_mut()
            .append_pair("since", &since.to_rfc3339())
            .append_pair("per_page", "1");

        let commits: Vec<CommitEntry> = get_json(&self.client, url.as_str()).await?;

        Ok(commits
            .first()
            .and_then(|entry| entry.commit.committer.as_ref())
            .and_then(|signature| signature.date))
    }
}

/// Classify commit recency into an activity level.
fn activity_level(now: DateTime<Utc>, last_commit: DateTime<Utc>) -> ActivityLevel {
    let days = (now - last_commit).num_days();

    if days < HIGH_ACTIVITY_DAYS {
        ActivityLevel::High
    } else if days < MEDIUM_ACTIVITY_DAYS {
        ActivityLevel::Medium
    } else {
        ActivityLevel::Low
    }
}

fn clamp_page_size(max_results: usize) -> u8 {
    u8::try_from(max_results.min(100)).unwrap_or(100)
}

fn is_not_found(error: &octocrab::Error) -> bool {
    if let octocrab::Error::GitHub { source, .. } = error {
        return source.status_code.as_u16() == 404;
    }

    false
}

fn is_rate_limited(error: &octocrab::Error) -> bool {
    let message = format!("{error:#}");
    message.contains("rate limit") || message.contains("API rate limit exceeded")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_level_thresholds() {
        let now = Utc::now();

        assert_eq!(activity_level(now, now - chrono::Duration::days(1)), ActivityLevel::High);
        assert_eq!(activity_level(now, now - chrono::Duration::days(6)), ActivityLevel::High);
        assert_eq!(activity_level(now, now - chrono::Duration::days(7)), ActivityLevel::Medium);
        assert_eq!(activity_level(now, now - chrono::Duration::days(29)), ActivityLevel::Medium);
        assert_eq!(activity_level(now, now - chrono::Duration::days(30)), ActivityLevel::Low);
        assert_eq!(activity_level(now, now - chrono::Duration::days(400)), ActivityLevel::Low);
    }

    #[test]
    fn test_activity_level_display() {
        assert_eq!(ActivityLevel::High.to_string(), "high");
        assert_eq!(ActivityLevel::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_commit_payload_parses() {
        let commits: Vec<CommitEntry> = serde_json::from_str(
            r#"[{"sha": "abc", "commit": {"committer": {"name": "dev", "date": "2024-05-01T10:00:00Z"}}}]"#,
        )
        .unwrap();

        let date = commits
            .first()
            .and_then(|entry| entry.commit.committer.as_ref())
            .and_then(|signature| signature.date);

        assert_eq!(date.map(|d| d.to_rfc3339()), Some("2024-05-01T10:00:00+00:00".to_string()));
    }

    #[test]
    fn test_empty_commit_history_has_no_date() {
        let commits: Vec<CommitEntry> = serde_json::from_str("[]").unwrap();
        assert!(commits.first().is_none());
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(clamp_page_size(20), 20);
        assert_eq!(clamp_page_size(5_000), 100);
    }
}
