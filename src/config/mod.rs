mod config;

pub use config::{Config, DEFAULT_CONFIG_YAML, GithubConfig, MavenConfig, MavenSeed, NpmConfig, NugetConfig, NugetSeed, PypiConfig, PypiSeeds};
