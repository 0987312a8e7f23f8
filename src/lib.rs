//! quill-rs: a server-rendered blog front-end for stored Markdown posts
//!
//! Posts live in a tabular backend (PostgREST or local files). They are
//! compiled on demand into documents with component placeholders, then
//! rendered to HTML with Tera or returned as JSON.

pub mod commands;
pub mod compiler;
pub mod config;
pub mod content;
pub mod error;
pub mod helpers;
pub mod render;
pub mod repository;
pub mod server;
pub mod source;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use compiler::Toolchain;
use content::Converter;
use render::Renderer;
use repository::PostRepository;

/// The blog application
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    pub repository: PostRepository,
    pub converter: Converter,
    pub renderer: Renderer,
}

impl Blog {
    /// Open the site in `base_dir`, configuring the process-wide toolchain on first use
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let config = config::SiteConfig::load_dir(base_dir)?;

        let toolchain = match Toolchain::installed() {
            Some(toolchain) => toolchain,
            None => Toolchain::load(&config.toolchain, base_dir)?.install()?,
        };

        Self::with_toolchain(base_dir, config, toolchain)
    }

    /// Open a site with an explicit configuration and toolchain
    pub fn with_toolchain<P: AsRef<Path>>(
        base_dir: P,
        config: config::SiteConfig,
        toolchain: Arc<Toolchain>,
    ) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);

        let source = source::open(&config.backend, &base_dir)?;
        let repository = PostRepository::new(source, &config.backend.posts_table)
            .with_refresh_interval(config.backend.slug_refresh_interval());
        let renderer = Renderer::new(&config, toolchain.components())?;
        let converter = Converter::new(toolchain);

        Ok(Self {
            config,
            base_dir,
            public_dir,
            repository,
            converter,
            renderer,
        })
    }

    /// Pre-render the latest posts into the public directory
    pub fn generate(&self, limit: usize) -> Result<commands::generate::Summary> {
        commands::generate::run(self, limit)
    }
}
