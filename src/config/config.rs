use crate::Result;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// The default configuration YAML content, embedded from `default_config.yml`
pub const DEFAULT_CONFIG_YAML: &str = include_str!("../../default_config.yml");

/// Top-level service configuration.
///
/// Adapters and the store receive their section of this struct explicitly at
/// construction time; nothing reads configuration from global state.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub database_url: String,

    pub bind_addr: String,

    /// Upper bound on results requested from each registry search.
    pub max_results: usize,

    pub collect_interval_hours: u64,

    pub refresh_interval_hours: u64,

    pub github: GithubConfig,

    pub pypi: PypiConfig,

    pub npm: NpmConfig,

    pub nuget: NugetConfig,

    pub maven: MavenConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GithubConfig {
    /// Optional personal access token for the repository host.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PypiConfig {
    pub base_url: String,
    pub keywords: Vec<String>,
    pub seeds: PypiSeeds,
}

/// Curated package names per keyword class. PyPI exposes no JSON search
/// endpoint, so sweeps resolve these names through the per-package JSON API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PypiSeeds {
    pub ai: Vec<String>,
    pub nlp: Vec<String>,
    pub vision: Vec<String>,
    pub general: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NpmConfig {
    pub base_url: String,
    pub keywords: Vec<String>,
    pub seeds: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NugetConfig {
    pub base_url: String,
    pub keywords: Vec<String>,
    pub seeds: Vec<NugetSeed>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NugetSeed {
    pub id: String,
    pub version: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MavenConfig {
    pub base_url: String,
    pub keywords: Vec<String>,
    pub seeds: Vec<MavenSeed>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MavenSeed {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub description: String,
}

impl Config {
    /// Load the configuration, starting from the embedded defaults or the
    /// given YAML file, then applying environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config: Self = match path {
            Some(path) => {
                let contents = fs::read_to_string(path).into_app_err_with(|| format!("unable to read config file '{}'", path.display()))?;
                serde_yaml::from_str(&contents).into_app_err_with(|| format!("unable to parse config file '{}'", path.display()))?
            }
            None => serde_yaml::from_str(DEFAULT_CONFIG_YAML).into_app_err("embedded default configuration is invalid")?,
        };

        config.apply_env();
        Ok(config)
    }

    /// Environment overrides for the settings deployments most often need to
    /// change without shipping a config file.
    fn apply_env(&mut self) {
        if let Ok(value) = env::var("DATABASE_URL") {
            self.database_url = value;
        }

        if let Ok(value) = env::var("BIND_ADDR") {
            self.bind_addr = value;
        }

        if let Ok(value) = env::var("PYPI_API_URL") {
            self.pypi.base_url = value;
        }

        if let Ok(value) = env::var("NPM_API_URL") {
            self.npm.base_url = value;
        }

        if let Ok(value) = env::var("NUGET_API_URL") {
            self.nuget.base_url = value;
        }

        if let Ok(value) = env::var("MAVEN_API_URL") {
            self.maven.base_url = value;
        }
    }
}
