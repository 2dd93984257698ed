use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".pr-archiver.toml";
pub const DEFAULT_REPOSITORY: &str = "bitcoin/bitcoin";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_FAILURE_LOG: &str = "failed-prs.txt";
pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("GITHUB_TOKEN is not set and no token was found in the config file")]
    MissingToken,

    #[error("Repository must look like owner/name, got {0:?}")]
    InvalidRepository(String),
}

/// Contents of `.pr-archiver.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub github: GitHubSection,

    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubSection {
    pub token: Option<String>,
    pub repository: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputSection {
    pub dir: Option<PathBuf>,
    pub failure_log: Option<PathBuf>,
}

impl FileConfig {
    /// Load the file at `path`, or the empty configuration if it does not exist.
    pub fn load_optional(path: &Path) -> Result<FileConfig, ConfigError> {
        if !path.exists() {
            return Ok(FileConfig::default());
        }
        Self::load_from(path)
    }

    pub fn load_from(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}

/// Values given on the command line. They win over every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub pr_arg: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub failure_log: Option<PathBuf>,
}

/// Resolved run configuration, built once in `main` and passed down.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub repository: String,
    pub pr_filter: Option<u64>,
    pub output_dir: PathBuf,
    pub failure_log: PathBuf,
    pub api_base_url: String,
}

impl Config {
    /// Merge command-line overrides, the environment and the config file.
    ///
    /// `env` is consulted for `GITHUB_TOKEN`, `GITHUB_REPO` and `GITHUB_API_URL`.
    pub fn resolve<F>(file: FileConfig, env: F, overrides: Overrides) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = env("GITHUB_TOKEN")
            .or(file.github.token)
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let repository = env("GITHUB_REPO")
            .or(file.github.repository)
            .unwrap_or_else(|| DEFAULT_REPOSITORY.to_string());
        validate_repository(&repository)?;

        let api_base_url = env("GITHUB_API_URL")
            .or(file.github.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let pr_filter = overrides.pr_arg.as_deref().and_then(parse_pr_filter);

        Ok(Config {
            token,
            repository,
            pr_filter,
            output_dir: overrides
                .output_dir
                .or(file.output.dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            failure_log: overrides
                .failure_log
                .or(file.output.failure_log)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FAILURE_LOG)),
            api_base_url,
        })
    }

    /// Load from the process environment and the given (or default) config file.
    pub fn load(config_path: Option<&Path>, overrides: Overrides) -> Result<Config, ConfigError> {
        let file = match config_path {
            Some(path) => FileConfig::load_from(path)?,
            None => FileConfig::load_optional(Path::new(DEFAULT_CONFIG_FILE))?,
        };
        Self::resolve(file, |key| std::env::var(key).ok(), overrides)
    }
}

/// A PR argument that is not an unsigned integer means "all pull requests".
fn parse_pr_filter(arg: &str) -> Option<u64> {
    match arg.trim().parse::<u64>() {
        Ok(number) => Some(number),
        Err(_) => {
            tracing::warn!(arg = %arg, "argument is not a pull request number, processing all pull requests");
            None
        }
    }
}

fn validate_repository(repository: &str) -> Result<(), ConfigError> {
    let mut parts = repository.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(()),
        _ => Err(ConfigError::InvalidRepository(repository.to_string())),
    }
}
