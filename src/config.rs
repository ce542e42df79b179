use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub thumbnails: ThumbnailConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/catalog.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThumbnailConfig {
    /// Upper bound on thumbnail jobs in the `Processing` state.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Bounding box (pixels) of generated thumbnails; aspect ratio is kept.
    #[serde(default = "default_thumb_size")]
    pub size: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            size: default_thumb_size(),
        }
    }
}

fn default_max_concurrent() -> usize {
    20
}
fn default_thumb_size() -> u32 {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Name of the metadata workspace created beneath the source directory.
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: String,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            workspace_dir: default_workspace_dir(),
            include_globs: default_include_globs(),
        }
    }
}

fn default_workspace_dir() -> String {
    ".catalog".to_string()
}

fn default_include_globs() -> Vec<String> {
    vec!["*".to_string()]
}

impl Config {
    /// All defaults; used when no config file is present and in tests.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Same defaults, with the database stored at `path`.
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.db.path = path.into();
        config
    }
}

impl CatalogConfig {
    pub fn include_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.include_globs {
            builder.add(
                Glob::new(pattern)
                    .with_context(|| format!("invalid include glob: '{}'", pattern))?,
            );
        }
        Ok(builder.build()?)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.thumbnails.max_concurrent == 0 {
        anyhow::bail!("thumbnails.max_concurrent must be > 0");
    }

    if config.thumbnails.size == 0 {
        anyhow::bail!("thumbnails.size must be > 0");
    }

    let workspace = &config.catalog.workspace_dir;
    if workspace.is_empty()
        || workspace == "."
        || workspace == ".."
        || workspace.contains(['/', '\\'])
    {
        anyhow::bail!(
            "catalog.workspace_dir must be a plain directory name, got '{}'",
            workspace
        );
    }

    config.catalog.include_set()?;

    Ok(())
}
