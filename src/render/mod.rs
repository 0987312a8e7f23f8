//! Server-side rendering of converted documents and site pages
//!
//! All page templates are embedded in the binary. Component templates from
//! the toolchain's components directory are registered next to them.

mod components;
mod layout;

pub use layout::{Layout, UnknownLayout};

use serde::Serialize;
use std::str::FromStr;
use tera::{Context, Tera};
use thiserror::Error;

use crate::compiler::components::replace_placeholders;
use crate::compiler::{ComponentBinding, ComponentRegistry, TocEntry};
use crate::config::SiteConfig;
use crate::content::{generate_slug, parse_date_string, ConvertedPost, StoredPost};
use crate::helpers::{display_date, encode_segment, full_url_for, post_url, DisplayDate};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error(transparent)]
    Layout(#[from] UnknownLayout),

    /// A placeholder pointing outside the bindings it may use
    #[error("no component bound to placeholder {id}")]
    MissingComponent { id: usize },
}

type Result<T> = std::result::Result<T, RenderError>;

/// Site fields shared by every page
#[derive(Debug, Serialize)]
struct SiteView<'a> {
    title: &'a str,
    description: &'a str,
    author: &'a str,
    language: &'a str,
    root: &'a str,
}

#[derive(Debug, Serialize)]
struct PostView<'a> {
    title: &'a str,
    date_iso: String,
    date_display: String,
    reading_time: &'a str,
    platform: Option<&'a str>,
    link: Option<&'a str>,
    tags: &'a [String],
    body: String,
    /// Absolute url, when the site url is configured
    canonical: Option<String>,
}

#[derive(Debug, Serialize)]
struct IndexEntry<'a> {
    href: String,
    title: &'a str,
    date_iso: String,
    date_display: String,
    reading_time: &'a str,
    platform: Option<&'a str>,
    tags: &'a [String],
    summary: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ListEntry<'a> {
    href: Option<String>,
    title: &'a str,
    date_iso: Option<String>,
    date_display: String,
    summary: Option<&'a str>,
}

/// Renders documents and pages with Tera
pub struct Renderer {
    tera: Tera,
    config: SiteConfig,
}

impl Renderer {
    /// Load the embedded templates plus the custom component templates of `registry`
    pub fn new(config: &SiteConfig, registry: &ComponentRegistry) -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("base.html", include_str!("templates/base.html")),
            ("post.html", include_str!("templates/post.html")),
            ("mdx_index.html", include_str!("templates/mdx_index.html")),
            ("posts.html", include_str!("templates/posts.html")),
            ("not_found.html", include_str!("templates/not_found.html")),
            // Layouts
            (
                "layouts/post_layout.html",
                include_str!("templates/layouts/post_layout.html"),
            ),
            (
                "layouts/post_simple.html",
                include_str!("templates/layouts/post_simple.html"),
            ),
            (
                "layouts/page_layout.html",
                include_str!("templates/layouts/page_layout.html"),
            ),
            // Components
            (
                "components/image.html",
                include_str!("templates/components/image.html"),
            ),
            (
                "components/link.html",
                include_str!("templates/components/link.html"),
            ),
            (
                "components/pre.html",
                include_str!("templates/components/pre.html"),
            ),
            (
                "components/toc_inline.html",
                include_str!("templates/components/toc_inline.html"),
            ),
            (
                "components/page_title.html",
                include_str!("templates/components/page_title.html"),
            ),
            (
                "components/newsletter_form.html",
                include_str!("templates/components/newsletter_form.html"),
            ),
        ])?;

        for (name, path) in registry.custom_templates() {
            tracing::debug!("Registering component {} from {:?}", name, path);
            let template = components::custom_template_name(name);
            tera.add_template_file(path, Some(template.as_str()))?;
        }

        Ok(Self {
            tera,
            config: config.clone(),
        })
    }

    /// Render a converted document to markup.
    ///
    /// The document is wrapped in the layout named by its front-matter, or in
    /// a plain `<div>` when none is named.
    pub fn render_document(&self, post: &ConvertedPost) -> Result<String> {
        let document = &post.compiled_document;
        let content = self.fill(&document.code, post, document.components.len())?;

        let Some(name) = post.frontmatter.layout_name() else {
            return Ok(format!("<div>{}</div>", content));
        };
        let layout = Layout::from_str(name)?;

        let mut ctx = Context::new();
        ctx.insert("content", &content);
        ctx.insert("toc", &post.toc);
        ctx.insert("frontmatter", &post.frontmatter);
        Ok(self.tera.render(layout.template(), &ctx)?)
    }

    /// Replace the placeholders of `html` with rendered components.
    ///
    /// Only ids below `limit` may be used; children of a binding are limited
    /// to the bindings created before it, so nesting always terminates.
    fn fill(&self, html: &str, post: &ConvertedPost, limit: usize) -> Result<String> {
        let bindings = &post.compiled_document.components;
        replace_placeholders(html, |id| {
            let binding = bindings
                .get(id)
                .filter(|_| id < limit)
                .ok_or(RenderError::MissingComponent { id })?;
            let children = match &binding.children {
                Some(children) => self.fill(children, post, id)?,
                None => String::new(),
            };
            self.render_component(binding, &children, &post.toc)
        })
    }

    fn render_component(
        &self,
        binding: &ComponentBinding,
        children: &str,
        toc: &[TocEntry],
    ) -> Result<String> {
        let (template, ctx) = components::template_context(binding, children, toc);
        let rendered = self.tera.render(&template, &ctx)?;
        Ok(rendered.trim().to_string())
    }

    /// Full page for one converted post
    pub fn render_post_page(&self, post: &ConvertedPost) -> Result<String> {
        let frontmatter = &post.frontmatter;
        let title = frontmatter.title.as_deref().unwrap_or("Untitled");
        let date = self.date(frontmatter.date_time());
        let canonical = (!self.config.url.is_empty()).then(|| {
            let slug = frontmatter
                .slug
                .clone()
                .unwrap_or_else(|| generate_slug(title));
            full_url_for(&self.config, &format!("mdx-posts/{}", encode_segment(&slug)))
        });
        let view = PostView {
            title,
            date_iso: date.iso,
            date_display: date.display,
            reading_time: &frontmatter.reading_time.text,
            platform: frontmatter.platform.as_deref(),
            link: frontmatter.link.as_deref(),
            tags: &frontmatter.tags,
            body: self.render_document(post)?,
            canonical,
        };

        let mut ctx = self.base_context();
        ctx.insert("post", &view);
        Ok(self.tera.render("post.html", &ctx)?)
    }

    /// Index of converted posts
    pub fn render_mdx_index(&self, posts: &[ConvertedPost]) -> Result<String> {
        let entries: Vec<IndexEntry> = posts
            .iter()
            .map(|post| {
                let frontmatter = &post.frontmatter;
                let title = frontmatter.title.as_deref().unwrap_or("Untitled");
                let slug = frontmatter
                    .slug
                    .clone()
                    .unwrap_or_else(|| generate_slug(title));
                let date = self.date(frontmatter.date_time());
                IndexEntry {
                    href: post_url(&self.config, &slug),
                    title,
                    date_iso: date.iso,
                    date_display: date.display,
                    reading_time: &frontmatter.reading_time.text,
                    platform: frontmatter.platform.as_deref(),
                    tags: &frontmatter.tags,
                    summary: frontmatter.summary.as_deref(),
                }
            })
            .collect();

        let mut ctx = self.base_context();
        ctx.insert("posts", &entries);
        Ok(self.tera.render("mdx_index.html", &ctx)?)
    }

    /// Plain list of stored posts
    pub fn render_posts(&self, posts: &[StoredPost]) -> Result<String> {
        let entries: Vec<ListEntry> = posts
            .iter()
            .map(|post| {
                let slug = generate_slug(&post.title);
                let date = post
                    .published_on
                    .as_deref()
                    .and_then(parse_date_string)
                    .map(|d| display_date(d, &self.config.timezone, &self.config.date_format));
                ListEntry {
                    href: (!slug.is_empty()).then(|| post_url(&self.config, &slug)),
                    title: &post.title,
                    date_iso: date.as_ref().map(|d| d.iso.clone()),
                    date_display: date.map(|d| d.display).unwrap_or_default(),
                    summary: post.summary.as_deref(),
                }
            })
            .collect();

        let mut ctx = self.base_context();
        ctx.insert("posts", &entries);
        Ok(self.tera.render("posts.html", &ctx)?)
    }

    pub fn render_not_found(&self) -> Result<String> {
        Ok(self.tera.render("not_found.html", &self.base_context())?)
    }

    fn date(&self, date: Option<chrono::DateTime<chrono::Utc>>) -> DisplayDate {
        display_date(
            date.unwrap_or_else(chrono::Utc::now),
            &self.config.timezone,
            &self.config.date_format,
        )
    }

    fn base_context(&self) -> Context {
        let config = &self.config;
        let mut ctx = Context::new();
        ctx.insert(
            "site",
            &SiteView {
                title: &config.title,
                description: &config.description,
                author: &config.author,
                language: &config.language,
                root: &config.root,
            },
        );
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Toolchain;
    use crate::content::{Converter, Metadata, PostId};
    use std::sync::Arc;

    fn converter() -> Converter {
        Converter::new(Arc::new(Toolchain::builtin()))
    }

    fn renderer() -> Renderer {
        Renderer::new(&SiteConfig::default(), &ComponentRegistry::builtin()).unwrap()
    }

    fn convert(content: &str, metadata: Metadata) -> ConvertedPost {
        converter().convert_raw(content, metadata).unwrap()
    }

    #[test]
    fn test_document_without_layout() {
        let post = convert("Hello **world**", Metadata::default());
        let html = renderer().render_document(&post).unwrap();
        assert!(html.starts_with("<div>"));
        assert!(html.contains("<strong>world</strong>"));
        assert!(!html.contains("mdx-component"));
    }

    #[test]
    fn test_components_rendered() {
        let source = "# Intro\n\n## Usage\n\nSee [docs](/docs) and [site](https://a.example).\n\n![Diagram](/d.png)\n\n```rust\nfn main() {}\n```\n\n<TOCInline fromHeading={2} />\n\n<BlogNewsletterForm />\n";
        let post = convert(source, Metadata::default());
        let html = renderer().render_document(&post).unwrap();

        assert!(html.contains(r#"<a href="/docs">docs</a>"#));
        assert!(html.contains(r#"target="_blank""#));
        assert!(html.contains(r#"src="/d.png""#));
        assert!(html.contains(r#"loading="lazy""#));
        assert!(html.contains("code-block"));
        assert!(html.contains(r##"<a href="#usage">Usage</a>"##));
        assert!(!html.contains(r##"<a href="#intro">Intro</a>"##));
        assert!(html.contains("Subscribe to the newsletter"));
        assert!(!html.contains("mdx-component"));
    }

    #[test]
    fn test_custom_component() {
        let dir = tempfile::tempdir().unwrap();
        let components = dir.path().join("components");
        std::fs::create_dir_all(&components).unwrap();
        std::fs::write(
            components.join("Callout.html"),
            "<aside class=\"{{ kind }}\">{{ children }}</aside>\n",
        )
        .unwrap();

        let toolchain = Arc::new(
            Toolchain::load(&crate::config::ToolchainConfig::default(), dir.path()).unwrap(),
        );
        let renderer = Renderer::new(&SiteConfig::default(), toolchain.components()).unwrap();
        let post = Converter::new(toolchain)
            .convert_raw(
                "<Callout kind=\"warn\">\n\nCareful *now*\n\n</Callout>\n",
                Metadata::default(),
            )
            .unwrap();
        let html = renderer.render_document(&post).unwrap();
        assert!(html.contains(r#"<aside class="warn">"#));
        assert!(html.contains("<em>now</em>"));
    }

    #[test]
    fn test_layout_from_frontmatter() {
        let mut metadata = Metadata {
            title: Some("About".to_string()),
            ..Default::default()
        };
        metadata
            .extra
            .insert("layout".to_string(), serde_json::json!("PageLayout"));
        let post = convert("Some text", metadata);
        let html = renderer().render_document(&post).unwrap();
        assert!(html.contains("layout-page"));
        assert!(html.contains("About"));
    }

    #[test]
    fn test_unknown_layout_fails() {
        let mut metadata = Metadata::default();
        metadata
            .extra
            .insert("layout".to_string(), serde_json::json!("Gallery"));
        let post = convert("Some text", metadata);
        let err = renderer().render_document(&post).unwrap_err();
        assert!(matches!(err, RenderError::Layout(_)));
    }

    #[test]
    fn test_self_referencing_placeholder_rejected() {
        let mut post = convert("[a](/a)", Metadata::default());
        post.compiled_document.components[0].children =
            Some(crate::compiler::components::placeholder(0));
        let err = renderer().render_document(&post).unwrap_err();
        assert!(matches!(err, RenderError::MissingComponent { id: 0 }));
    }

    #[test]
    fn test_post_page() {
        let metadata = Metadata {
            title: Some("Hello <World>".to_string()),
            date: Some("2024-01-15T00:00:00Z".to_string()),
            tags: vec!["rust".to_string()],
            platform: Some("velog".to_string()),
            ..Default::default()
        };
        let post = convert("Body text", metadata);
        let html = renderer().render_post_page(&post).unwrap();
        assert!(html.contains("Hello &lt;World&gt;"));
        assert!(html.contains("2024-01-15"));
        assert!(html.contains("Platform: velog"));
        assert!(html.contains("<p>Body text</p>"));
        assert!(html.contains(r#"href="http://example.com/mdx-posts/hello-world""#));

        let config = SiteConfig {
            url: "https://blog.example.com".to_string(),
            ..Default::default()
        };
        let renderer = Renderer::new(&config, &ComponentRegistry::builtin()).unwrap();
        let html = renderer.render_post_page(&post).unwrap();
        assert!(html.contains(r#"href="https://blog.example.com/mdx-posts/hello-world""#));
    }

    #[test]
    fn test_index_and_lists() {
        let metadata = Metadata {
            title: Some("러스트 입문".to_string()),
            slug: Some("러스트-입문".to_string()),
            ..Default::default()
        };
        let html = renderer()
            .render_mdx_index(&[convert("x", metadata)])
            .unwrap();
        assert!(html.contains("/mdx-posts/%EB%9F%AC"));

        let mut stored = StoredPost::new(PostId::Number(1), "First Post", "");
        stored.published_on = Some("2024-02-01".to_string());
        let untitled = StoredPost::new(PostId::Number(2), "!!!", "");
        let html = renderer().render_posts(&[stored, untitled]).unwrap();
        assert!(html.contains(r#"href="/mdx-posts/first-post""#));
        assert!(html.contains("2024-02-01"));

        assert!(renderer().render_posts(&[]).unwrap().contains("No posts."));
        assert!(renderer().render_not_found().unwrap().contains("404"));
    }
}
