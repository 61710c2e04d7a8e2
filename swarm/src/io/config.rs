//! Swarm configuration stored under `.swarm/config.toml`, plus credentials
//! read from the environment or a `.env` file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::limits::RunLimits;
use crate::io::image::ImageDimensions;
use crate::io::publish::DEV_TO_API_KEY;
use crate::io::upload::IMGBB_API_KEY;

/// Environment variable holding the generation backend key.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Swarm configuration (TOML).
///
/// Missing fields default to the values the article pipeline was tuned with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SwarmConfig {
    pub limits: LimitsConfig,
    pub content: ContentConfig,
    pub image: ImageConfig,
    pub upload: UploadConfig,
    pub publish: PublishConfig,
    pub run_log: RunLogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_handoffs: u32,
    pub max_iterations: u32,
    /// Wall-clock budget for the whole run.
    pub execution_timeout_secs: u64,
    /// Budget for each worker invocation.
    pub node_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContentConfig {
    /// OpenAI-compatible chat completions URL.
    pub endpoint: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub min_words: u32,
    pub max_words: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImageConfig {
    /// OpenAI-compatible image generation URL.
    pub endpoint: String,
    pub model: String,
    pub width: u32,
    pub height: u32,
    /// Generated images are written here before upload.
    pub cache_dir: PathBuf,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UploadConfig {
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PublishConfig {
    pub endpoint: String,
    /// Base URL used to build edit links.
    pub site_url: String,
    /// Save articles as drafts.
    pub draft: bool,
    /// Used when the generated draft carries no tags.
    pub default_tags: Vec<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunLogConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let limits = RunLimits::default();
        Self {
            max_handoffs: limits.max_handoffs,
            max_iterations: limits.max_iterations,
            execution_timeout_secs: limits.execution_timeout.as_secs(),
            node_timeout_secs: limits.node_timeout.as_secs(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o".to_string(),
            temperature: None,
            min_words: 800,
            max_words: 1500,
            request_timeout_secs: 240,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        let dims = ImageDimensions::default();
        Self {
            endpoint: "https://api.openai.com/v1/images/generations".to_string(),
            model: "dall-e-3".to_string(),
            width: dims.width,
            height: dims.height,
            cache_dir: PathBuf::from(".swarm/images"),
            request_timeout_secs: 120,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.imgbb.com/1/upload".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://dev.to/api/articles".to_string(),
            site_url: "https://dev.to".to_string(),
            draft: true,
            default_tags: vec!["programming".to_string(), "tutorial".to_string()],
            request_timeout_secs: 30,
        }
    }
}

impl Default for RunLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(".swarm/runs"),
        }
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            limits: LimitsConfig::default(),
            content: ContentConfig::default(),
            image: ImageConfig::default(),
            upload: UploadConfig::default(),
            publish: PublishConfig::default(),
            run_log: RunLogConfig::default(),
        }
    }
}

impl SwarmConfig {
    pub fn validate(&self) -> Result<()> {
        self.run_limits().validate()?;
        if self.content.endpoint.trim().is_empty() || self.content.model.trim().is_empty() {
            return Err(anyhow!("content.endpoint and content.model must be set"));
        }
        if self.content.min_words > self.content.max_words {
            return Err(anyhow!("content.min_words must be <= content.max_words"));
        }
        if self.image.endpoint.trim().is_empty() || self.image.model.trim().is_empty() {
            return Err(anyhow!("image.endpoint and image.model must be set"));
        }
        if self.image.width == 0 || self.image.height == 0 {
            return Err(anyhow!("image.width and image.height must be > 0"));
        }
        if self.publish.endpoint.trim().is_empty() {
            return Err(anyhow!("publish.endpoint must be set"));
        }
        let timeouts = [
            self.content.request_timeout_secs,
            self.image.request_timeout_secs,
            self.upload.request_timeout_secs,
            self.publish.request_timeout_secs,
        ];
        if timeouts.contains(&0) {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        Ok(())
    }

    pub fn run_limits(&self) -> RunLimits {
        RunLimits {
            max_handoffs: self.limits.max_handoffs,
            max_iterations: self.limits.max_iterations,
            execution_timeout: Duration::from_secs(self.limits.execution_timeout_secs),
            node_timeout: Duration::from_secs(self.limits.node_timeout_secs),
        }
    }

    pub fn image_dimensions(&self) -> ImageDimensions {
        ImageDimensions {
            width: self.image.width,
            height: self.image.height,
        }
    }
}

/// API keys, read once at startup.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Generation backend key (required).
    pub openai_api_key: Option<String>,
    /// Publishing key (required).
    pub devto_api_key: Option<String>,
    /// Image hosting key (optional; without it images stay local).
    pub imgbb_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |value: &Option<String>| if value.is_some() { "set" } else { "unset" };
        f.debug_struct("Credentials")
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("devto_api_key", &mask(&self.devto_api_key))
            .field("imgbb_api_key", &mask(&self.imgbb_api_key))
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment, falling back to the
    /// dotenv file at `dotenv_path` when it exists.
    pub fn load(dotenv_path: &Path) -> Result<Self> {
        Self::from_layers(|key| std::env::var(key).ok(), dotenv_path)
    }

    /// Values from `env` win; the dotenv file only fills unset or blank keys.
    pub fn from_layers(
        env: impl Fn(&str) -> Option<String>,
        dotenv_path: &Path,
    ) -> Result<Self> {
        let file = read_dotenv(dotenv_path)?;
        Ok(Self::from_lookup(|key| {
            env(key)
                .filter(|value| !value.trim().is_empty())
                .or_else(|| file.get(key).cloned())
        }))
    }

    /// Build credentials from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            openai_api_key: read(OPENAI_API_KEY),
            devto_api_key: read(DEV_TO_API_KEY),
            imgbb_api_key: read(IMGBB_API_KEY),
        }
    }

    /// Names of required variables that are missing.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.openai_api_key.is_none() {
            missing.push(OPENAI_API_KEY);
        }
        if self.devto_api_key.is_none() {
            missing.push(DEV_TO_API_KEY);
        }
        missing
    }
}

fn read_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    dotenvy::from_path_iter(path)
        .with_context(|| format!("read {}", path.display()))?
        .map(|item| item.with_context(|| format!("parse {}", path.display())))
        .collect()
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SwarmConfig::default()`.
pub fn load_config(path: &Path) -> Result<SwarmConfig> {
    if !path.exists() {
        let cfg = SwarmConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SwarmConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SwarmConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, SwarmConfig::default());
        assert_eq!(cfg.run_limits(), RunLimits::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".swarm/config.toml");
        let mut cfg = SwarmConfig::default();
        cfg.limits.max_handoffs = 3;
        cfg.publish.draft = false;
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[limits]\nmax_iterations = 4\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.limits.max_iterations, 4);
        assert_eq!(cfg.limits.max_handoffs, 10);
        assert_eq!(cfg.image, ImageConfig::default());
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[limits]\nmax_iterations = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("max_iterations"));
    }

    #[test]
    fn credentials_treat_blank_as_unset() {
        let creds = Credentials::from_lookup(|key| match key {
            OPENAI_API_KEY => Some("sk-1".to_string()),
            DEV_TO_API_KEY => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(creds.openai_api_key.as_deref(), Some("sk-1"));
        assert!(creds.devto_api_key.is_none());
        assert!(creds.imgbb_api_key.is_none());
        assert_eq!(creds.missing_required(), vec![DEV_TO_API_KEY]);
    }

    #[test]
    fn dotenv_fills_keys_missing_from_environment() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".env");
        fs::write(
            &path,
            "# keys\nOPENAI_API_KEY=sk-file\nDEV_TO_API_KEY=devto-file\n\
             IMGBB_API_KEY=\"imgbb-file\"\n",
        )
        .expect("write");

        let creds = Credentials::from_layers(
            |key| match key {
                DEV_TO_API_KEY => Some("devto-env".to_string()),
                IMGBB_API_KEY => Some(" ".to_string()),
                _ => None,
            },
            &path,
        )
        .expect("load");

        assert_eq!(creds.openai_api_key.as_deref(), Some("sk-file"));
        assert_eq!(creds.devto_api_key.as_deref(), Some("devto-env"));
        assert_eq!(creds.imgbb_api_key.as_deref(), Some("imgbb-file"));
        assert!(creds.missing_required().is_empty());
    }

    #[test]
    fn missing_dotenv_uses_environment_only() {
        let temp = tempfile::tempdir().expect("tempdir");
        let creds = Credentials::from_layers(
            |key| (key == OPENAI_API_KEY).then(|| "sk-env".to_string()),
            &temp.path().join(".env"),
        )
        .expect("load");
        assert_eq!(creds.openai_api_key.as_deref(), Some("sk-env"));
        assert_eq!(creds.missing_required(), vec![DEV_TO_API_KEY]);
    }

    #[test]
    fn malformed_dotenv_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".env");
        fs::write(&path, "OPENAI_API_KEY=sk\nthis is not an assignment\n").expect("write");
        let err = Credentials::from_layers(|_| None, &path).unwrap_err();
        assert!(format!("{err:#}").contains("parse"));
    }

    #[test]
    fn credentials_debug_masks_values() {
        let creds = Credentials {
            openai_api_key: Some("sk-secret".to_string()),
            devto_api_key: None,
            imgbb_api_key: None,
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("set"));
    }
}
