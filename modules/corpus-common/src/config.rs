use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use site_client::{ClientConfig, RetryPolicy, DEFAULT_USER_AGENT};
use tracing::info;

use crate::error::{CorpusError, Result};

/// TOML-backed pipeline configuration. Every field has a default, so a missing
/// file or an empty section is valid.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub site: SiteConfig,
    pub client: ClientSection,
    pub retry: RetrySection,
    pub workers: WorkerConfig,
    pub paths: PathConfig,
    pub synth: SynthConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Page listing every seasonal directory.
    pub archive_url: String,
    /// Prefix shared by all seasonal directory urls.
    pub season_root: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            archive_url: "https://myanimelist.net/anime/season/archive".to_string(),
            season_root: "https://myanimelist.net/anime/season".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSection {
    pub user_agent: String,
    pub proxy: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 2_000,
            backoff_factor: 2.0,
        }
    }
}

/// Per-stage concurrency caps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    pub links: usize,
    pub galleries: usize,
    pub downloads: usize,
    pub synth: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            links: 20,
            galleries: 200,
            downloads: 100,
            synth: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathConfig {
    pub index: PathBuf,
    pub links: PathBuf,
    pub galleries: PathBuf,
    pub image_store: PathBuf,
    pub generated_images: PathBuf,
    pub generated_labels: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            index: PathBuf::from("checkpoints/season_index.json"),
            links: PathBuf::from("checkpoints/item_links.json"),
            galleries: PathBuf::from("checkpoints/galleries.json"),
            image_store: PathBuf::from("images"),
            generated_images: PathBuf::from("images_gen"),
            generated_labels: PathBuf::from("labels_gen"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthConfig {
    pub target_width: u32,
    pub font_path: PathBuf,
    pub primary_font_px: f32,
    pub secondary_font_px: f32,
    pub radius_min: u32,
    pub radius_max: u32,
    pub sample_count: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            target_width: 500,
            font_path: PathBuf::from("Minecraftia-Regular.ttf"),
            primary_font_px: 10.0,
            secondary_font_px: 8.0,
            radius_min: 15,
            radius_max: 50,
            sample_count: 30_000,
        }
    }
}

impl PipelineConfig {
    /// Load from `path` if given, falling back to defaults when no file is
    /// supplied. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CorpusError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&content)
            .map_err(|e| CorpusError::Config(format!("{}: {e}", path.display())))?;
        info!(config = %path.display(), "Loaded pipeline config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CorpusError::Config(e.to_string()))
    }

    /// `CORPUS_PROXY` and `CORPUS_USER_AGENT` win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(proxy) = env::var("CORPUS_PROXY") {
            self.client.proxy = if proxy.is_empty() { None } else { Some(proxy) };
        }
        if let Ok(ua) = env::var("CORPUS_USER_AGENT") {
            if !ua.is_empty() {
                self.client.user_agent = ua;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.workers;
        if w.links == 0 || w.galleries == 0 || w.downloads == 0 || w.synth == 0 {
            return Err(CorpusError::Config("worker counts must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(CorpusError::Config("retry.max_attempts must be at least 1".into()));
        }
        let factor = self.retry.backoff_factor;
        if !(factor.is_finite() && factor >= 1.0) {
            return Err(CorpusError::Config(format!(
                "retry.backoff_factor must be a finite number >= 1.0, got {factor}"
            )));
        }
        let s = &self.synth;
        if s.target_width == 0 {
            return Err(CorpusError::Config("synth.target_width must be positive".into()));
        }
        if s.radius_min == 0 || s.radius_min > s.radius_max {
            return Err(CorpusError::Config(format!(
                "synth radius range {}..={} is empty",
                s.radius_min, s.radius_max
            )));
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            user_agent: self.client.user_agent.clone(),
            proxy: self.client.proxy.clone(),
            timeout: Duration::from_secs(self.client.timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.initial_delay_ms),
            self.retry.backoff_factor,
        )
    }
}
