// src/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::providers::syndication::DEFAULT_FEED_URL;
use crate::notify::webhook::DEFAULT_TIMEOUT_SECS;
use crate::store::DEFAULT_SEEN_STORE_PATH;

pub const ENV_CONFIG_PATH: &str = "CVE_NOTIFIER_CONFIG";

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}
fn default_seen_store() -> PathBuf {
    PathBuf::from(DEFAULT_SEEN_STORE_PATH)
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_user_agent() -> String {
    concat!("cve-notifier/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Case-insensitive title substrings.
    pub keywords: Vec<String>,
    /// Webhook URLs; may be empty.
    #[serde(default)]
    pub http_push: Vec<String>,
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    #[serde(default = "default_seen_store")]
    pub seen_store: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Trim lists, drop blanks, clamp the timeout and reject an empty keyword set.
    fn sanitize(mut self) -> Result<Self> {
        self.keywords = clean_list(self.keywords);
        self.http_push = clean_list(self.http_push);
        if self.keywords.is_empty() {
            bail!("config has no keywords; nothing could ever match");
        }
        if self.feed_url.trim().is_empty() {
            self.feed_url = default_feed_url();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = 1;
        }
        Ok(self)
    }
}

/// Working-directory fallbacks, in lookup order.
pub const DEFAULT_CONFIG_FILES: [&str; 4] =
    ["config.toml", "config.json", "config.yaml", "config.yml"];

/// Load config from an explicit path. Supports TOML, JSON or YAML formats.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("loading config {}", path.display()))
}

/// Load config using env var + fallbacks:
/// 1) $CVE_NOTIFIER_CONFIG
/// 2) config.toml
/// 3) config.json
/// 4) config.yaml, then config.yml
pub fn load_config_default() -> Result<Config> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    for name in DEFAULT_CONFIG_FILES {
        let p = PathBuf::from(name);
        if p.exists() {
            return load_config_from(&p);
        }
    }
    Err(anyhow!(
        "no config found; pass --config, set {ENV_CONFIG_PATH}, or create config.toml"
    ))
}

fn parse_config(s: &str, hint_ext: &str) -> Result<Config> {
    let cfg = match hint_ext {
        "toml" => parse_toml(s)?,
        "json" => parse_json(s)?,
        "yaml" | "yml" => parse_yaml(s)?,
        _ => parse_toml(s)
            .or_else(|_| parse_json(s))
            .or_else(|_| parse_yaml(s))
            .map_err(|_| anyhow!("unsupported config format (expected TOML, JSON or YAML)"))?,
    };
    cfg.sanitize()
}

fn parse_toml(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
}

fn parse_json(s: &str) -> Result<Config> {
    Ok(serde_json::from_str(s)?)
}

fn parse_yaml(s: &str) -> Result<Config> {
    Ok(serde_yaml::from_str(s)?)
}

/// Trim entries and drop blanks, keeping order and duplicates.
fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|it| it.trim().to_string())
        .filter(|it| !it.is_empty())
        .collect()
}
