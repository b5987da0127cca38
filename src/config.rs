use std::env;
use std::path::PathBuf;

use thiserror::Error;

pub const ORG_VAR: &str = "HIPCHAT_ORG";
pub const TOKEN_VAR: &str = "HIPCHAT_TOKEN";

const DEFAULT_HOST: &str = "hipchat.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub org: String,
    pub token: String,
    pub api_base_url: String,
    pub cache_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let org = require_var(ORG_VAR)?;
        let token = require_var(TOKEN_VAR)?;

        let host = optional_var("HIPCHAT_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let api_base_url = optional_var("HIPCHAT_API_BASE_URL")
            .unwrap_or_else(|| format!("https://{org}.{host}/v2"));
        let api_base_url = format!("{}/", api_base_url.trim_end_matches('/'));

        let cache_path = optional_var("HIPCHAT_CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_cache_path);

        Ok(Self {
            org,
            token,
            api_base_url,
            cache_path,
        })
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    optional_var(name).ok_or(ConfigError::Missing(name))
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

// The cache lives next to the installed binary.
fn default_cache_path() -> PathBuf {
    let install_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    install_dir.join("cache").join("directory.json")
}
