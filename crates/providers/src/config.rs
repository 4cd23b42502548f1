use directories::BaseDirs;
use serde::Deserialize;
use std::{env, fs, path::PathBuf, time::Duration};
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub github_api: Option<String>,
    pub github_timeout_ms: Option<u64>,
}

impl FileConfig {
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text).unwrap_or_else(|e| {
                warn!(target: "providers::config", "ignoring {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                warn!(target: "providers::config", "cannot read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

pub fn config_path() -> Option<PathBuf> {
    let base = BaseDirs::new()?;
    let p = if cfg!(target_os = "windows") {
        base.home_dir().join(".dscoder").join("config.toml")
    } else {
        base.config_dir().join("dscoder").join("config.toml")
    };
    Some(p)
}

fn proxy_from_env() -> Option<String> {
    env::var("HTTPS_PROXY")
        .ok()
        .or_else(|| env::var("HTTP_PROXY").ok())
}

#[derive(Clone, Debug)]
pub struct CompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub proxy: Option<String>,
}

impl CompletionConfig {
    // `api_key` comes from the saved settings; the endpoint from
    // `DSCODER_BASE_URL`, then the config file.
    pub fn from_env_and_file(api_key: &str) -> anyhow::Result<Self> {
        if api_key.trim().is_empty() {
            anyhow::bail!("api key is not set");
        }
        Ok(Self::resolve(api_key, &FileConfig::load()))
    }

    pub fn resolve(api_key: &str, file: &FileConfig) -> Self {
        let base_url = env::var("DSCODER_BASE_URL")
            .ok()
            .or_else(|| file.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        CompletionConfig {
            api_key: api_key.trim().to_string(),
            base_url,
            timeout: Duration::from_millis(file.timeout_ms.unwrap_or(120_000)),
            proxy: proxy_from_env(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GitHubConfig {
    pub api_base: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub proxy: Option<String>,
}

impl GitHubConfig {
    pub fn from_env_and_file() -> Self {
        Self::resolve(&FileConfig::load())
    }

    pub fn resolve(file: &FileConfig) -> Self {
        GitHubConfig {
            api_base: file
                .github_api
                .clone()
                .unwrap_or_else(|| DEFAULT_GITHUB_API.to_string()),
            token: env::var("GITHUB_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            timeout: Duration::from_millis(file.github_timeout_ms.unwrap_or(30_000)),
            proxy: proxy_from_env(),
        }
    }
}
