use crate::Result;
use core::fmt::{Display, Formatter};
use ohno::{IntoAppError, bail};
use url::Url;

/// Clean up a registry-reported repository URL.
///
/// Registries decorate VCS URLs in assorted ways; the catalog stores the
/// plain browsable form: `git+` prefixes are stripped, `git:` schemes are
/// rewritten to `https:`, and trailing `.git` suffixes are dropped.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let mut cleaned = raw.trim().to_string();

    if let Some(rest) = cleaned.strip_prefix("git+") {
        cleaned = rest.to_string();
    }

    if let Some(rest) = cleaned.strip_prefix("git:") {
        cleaned = format!("https:{rest}");
    }

    if let Some(rest) = cleaned.strip_suffix(".git") {
        cleaned = rest.to_string();
    }

    cleaned
}

/// An owner/repo pair extracted from a stored repository URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSpec {
    owner: Box<str>,
    repo: Box<str>,
}

impl RepoSpec {
    /// Parse a repository URL into its owner and repo components.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL is unparseable, is not hosted on
    /// github.com, or lacks an `owner/repo` path.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).into_app_err_with(|| format!("invalid repository URL: {raw}"))?;

        if url.host_str() != Some("github.com") {
            bail!("not a GitHub URL: {raw}");
        }

        let path_segments: Vec<_> = url.path_segments().map(Iterator::collect).unwrap_or_default();

        if path_segments.len() < 2 {
            bail!("invalid repository URL format: {raw}");
        }

        if path_segments[0].is_empty() || path_segments[1].is_empty() {
            bail!("invalid repository URL: empty owner or repo name: {raw}");
        }

        Ok(Self {
            owner: Box::from(path_segments[0]),
            repo: Box::from(path_segments[1].trim_end_matches(".git")),
        })
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl Display for RepoSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
