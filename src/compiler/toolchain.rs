//! Process-wide compiler toolchain
//!
//! Syntax definitions, the highlight theme and the component registry are
//! loaded once at startup and shared read-only by every conversion.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;

use super::components::ComponentRegistry;
use crate::config::ToolchainConfig;

static INSTALLED: OnceLock<Arc<Toolchain>> = OnceLock::new();

/// Read-only resources used by the content compiler
pub struct Toolchain {
    syntax_set: SyntaxSet,
    theme: Theme,
    components: ComponentRegistry,
    minify: bool,
}

impl Toolchain {
    /// Toolchain with bundled syntaxes, the default theme and built-in components only
    pub fn builtin() -> Self {
        let theme_set = ThemeSet::load_defaults();
        let theme = theme_set
            .themes
            .get(ToolchainConfig::DEFAULT_THEME)
            .or_else(|| theme_set.themes.values().next())
            .cloned()
            .unwrap_or_default();

        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
            components: ComponentRegistry::builtin(),
            minify: true,
        }
    }

    /// Load the toolchain described by the site configuration.
    ///
    /// Relative directories are resolved against `base_dir`.
    pub fn load(config: &ToolchainConfig, base_dir: &Path) -> Result<Self> {
        let syntax_set = match &config.syntaxes_dir {
            Some(dir) => {
                let dir = base_dir.join(dir);
                let mut builder = SyntaxSet::load_defaults_newlines().into_builder();
                builder
                    .add_from_folder(&dir, true)
                    .with_context(|| format!("Failed to load syntaxes from {:?}", dir))?;
                tracing::debug!("Loaded extra syntaxes from {:?}", dir);
                builder.build()
            }
            None => SyntaxSet::load_defaults_newlines(),
        };

        let theme = load_theme(&config.highlight_theme, base_dir)?;

        let components_dir = base_dir.join(&config.components_dir);
        let components = if components_dir.is_dir() {
            ComponentRegistry::discover(&components_dir)?
        } else {
            tracing::debug!(
                "Components directory {:?} not found, using built-in components",
                components_dir
            );
            ComponentRegistry::builtin()
        };

        Ok(Self {
            syntax_set,
            theme,
            components,
            minify: config.minify,
        })
    }

    /// Make this toolchain the process-wide one. Only the first call succeeds.
    pub fn install(self) -> Result<Arc<Toolchain>> {
        let toolchain = Arc::new(self);
        INSTALLED
            .set(Arc::clone(&toolchain))
            .map_err(|_| anyhow!("Toolchain is already configured for this process"))?;
        Ok(toolchain)
    }

    /// The toolchain installed at startup, if any
    pub fn installed() -> Option<Arc<Toolchain>> {
        INSTALLED.get().cloned()
    }

    /// Disable output minification (useful when debugging compiled markup)
    pub fn without_minify(mut self) -> Self {
        self.minify = false;
        self
    }

    pub fn syntax_set(&self) -> &SyntaxSet {
        &self.syntax_set
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn minify(&self) -> bool {
        self.minify
    }
}

/// Resolve a theme by bundled name, or from a `.tmTheme` file
fn load_theme(name: &str, base_dir: &Path) -> Result<Theme> {
    let theme_set = ThemeSet::load_defaults();
    if let Some(theme) = theme_set.themes.get(name) {
        return Ok(theme.clone());
    }

    let path = base_dir.join(name);
    if path.extension().map(|ext| ext == "tmTheme").unwrap_or(false) && path.exists() {
        return ThemeSet::get_theme(&path)
            .with_context(|| format!("Failed to load highlight theme {:?}", path));
    }

    let mut available: Vec<_> = theme_set.themes.keys().cloned().collect();
    available.sort();
    Err(anyhow!(
        "Unknown highlight theme: {}. Available: {}",
        name,
        available.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_toolchain() {
        let toolchain = Toolchain::builtin();
        assert!(toolchain.minify());
        assert!(toolchain.syntax_set().find_syntax_by_token("rust").is_some());
        assert!(toolchain.components().resolve("Image").is_some());
    }

    #[test]
    fn test_load_rejects_unknown_theme() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolchainConfig {
            highlight_theme: "no-such-theme".to_string(),
            ..Default::default()
        };
        let err = Toolchain::load(&config, dir.path()).err().unwrap();
        assert!(err.to_string().contains("no-such-theme"));
    }

    #[test]
    fn test_load_discovers_components() {
        let dir = tempfile::tempdir().unwrap();
        let components = dir.path().join("components");
        std::fs::create_dir_all(&components).unwrap();
        std::fs::write(components.join("Callout.html"), "<aside>{{ children }}</aside>").unwrap();

        let toolchain = Toolchain::load(&ToolchainConfig::default(), dir.path()).unwrap();
        assert!(toolchain.components().resolve("Callout").is_some());
        assert!(toolchain.components().resolve("Missing").is_none());
    }
}
