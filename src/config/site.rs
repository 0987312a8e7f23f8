//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    /// IANA name used when showing dates, e.g. `Asia/Seoul`; empty means UTC
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,

    // Date format (Moment.js style)
    pub date_format: String,

    // Pagination
    pub per_page: usize,

    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub generate: GenerateConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Quill".to_string(),
            description: String::new(),
            author: "John Doe".to_string(),
            language: "en".to_string(),
            timezone: String::new(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),

            date_format: "YYYY-MM-DD".to_string(),

            per_page: 10,

            backend: BackendConfig::default(),
            toolchain: ToolchainConfig::default(),
            server: ServerConfig::default(),
            generate: GenerateConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    /// Load `_config.yml` from a site directory (defaults when absent), then
    /// apply environment overrides
    pub fn load_dir<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config_path = base_dir.as_ref().join("_config.yml");
        let mut config = if config_path.exists() {
            Self::load(&config_path)?
        } else {
            tracing::debug!("No _config.yml in {:?}, using defaults", base_dir.as_ref());
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override backend credentials from the environment.
    ///
    /// `lookup` maps a variable name to its value; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("SUPABASE_URL") {
            self.backend.url = Some(url);
        }
        if let Some(key) = get("SUPABASE_ANON_KEY") {
            self.backend.anon_key = Some(key);
        }
        if let Some(key) = get("SUPABASE_SERVICE_ROLE_KEY") {
            self.backend.service_role_key = Some(key);
        }
    }
}

/// Which data source serves the posts table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted Postgres behind a PostgREST endpoint
    Postgrest,
    /// JSON/YAML files under `data_dir`
    Files,
}

/// Data backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    #[serde(rename = "type")]
    pub kind: BackendKind,
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub service_role_key: Option<String>,
    pub data_dir: String,
    pub posts_table: String,
    /// Per-request timeout in seconds
    pub timeout: u64,
    /// Minimum seconds between slug index rebuilds triggered by unknown slugs
    pub slug_refresh_interval: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Files,
            url: None,
            anon_key: None,
            service_role_key: None,
            data_dir: "data".to_string(),
            posts_table: "posts".to_string(),
            timeout: 10,
            slug_refresh_interval: 30,
        }
    }
}

impl BackendConfig {
    /// Key sent to the backend; the service-role key wins over the anon key
    pub fn api_key(&self) -> Option<&str> {
        self.service_role_key
            .as_deref()
            .or(self.anon_key.as_deref())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn slug_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.slug_refresh_interval)
    }
}

/// Content compiler toolchain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Directory of `<Name>.html` component templates
    pub components_dir: String,
    /// Extra `.sublime-syntax` definitions
    pub syntaxes_dir: Option<String>,
    /// Bundled theme name or path to a `.tmTheme` file
    pub highlight_theme: String,
    pub minify: bool,
}

impl ToolchainConfig {
    pub const DEFAULT_THEME: &'static str = "base16-ocean.dark";
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            components_dir: "components".to_string(),
            syntaxes_dir: None,
            highlight_theme: Self::DEFAULT_THEME.to_string(),
            minify: true,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
    /// Deadline for a single conversion, in seconds
    pub conversion_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".to_string(),
            port: 3000,
            conversion_timeout: 30,
        }
    }
}

impl ServerConfig {
    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout)
    }
}

/// Static generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Number of latest posts pre-rendered
    pub limit: usize,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self { limit: 20 }
    }
}
