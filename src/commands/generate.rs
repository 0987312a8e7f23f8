//! Pre-render the latest posts to static files

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::content::{generate_slug, ConvertedPost};
use crate::Blog;

/// Outcome of one generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub written: usize,
    pub skipped: usize,
}

/// Render the latest `limit` published posts into `public_dir/mdx-posts/<slug>/index.html`,
/// plus the index pages. Posts that fail to convert or render are skipped, as
/// are older posts whose slug a newer post already took.
pub fn run(blog: &Blog, limit: usize) -> Result<Summary> {
    let start = std::time::Instant::now();

    let posts = blog.repository.list_published(Some(limit))?;
    tracing::info!("Loaded {} posts", posts.len());

    let out_dir = blog.public_dir.join("mdx-posts");
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {:?}", out_dir))?;

    let mut summary = Summary::default();
    let mut converted: Vec<ConvertedPost> = Vec::with_capacity(posts.len());
    let mut taken: HashSet<String> = HashSet::new();

    for (post, outcome) in posts.iter().zip(blog.converter.convert_batch(&posts)) {
        let slug = generate_slug(&post.title);
        if slug.is_empty() {
            tracing::warn!("Skipping post {}: title {:?} has no slug", post.id, post.title);
            summary.skipped += 1;
            continue;
        }
        // Same rule as the server's slug index: the newest post owns the slug
        if !taken.insert(slug.clone()) {
            tracing::warn!(
                "Skipping post {}: slug {:?} already used by a newer post",
                post.id,
                slug
            );
            summary.skipped += 1;
            continue;
        }

        let Ok(doc) = outcome else {
            // convert_batch already logged the failure
            summary.skipped += 1;
            continue;
        };

        let html = match blog.renderer.render_post_page(&doc) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Skipping post {}: {}", post.id, e);
                summary.skipped += 1;
                continue;
            }
        };

        write_page(&out_dir.join(&slug), &html)?;
        tracing::debug!("Generated: mdx-posts/{}/index.html", slug);
        summary.written += 1;
        converted.push(doc);
    }

    write_page(&out_dir, &blog.renderer.render_mdx_index(&converted)?)?;

    let stored = blog.repository.list_created(limit)?;
    write_page(&blog.public_dir.join("posts"), &blog.renderer.render_posts(&stored)?)?;

    fs::write(
        blog.public_dir.join("404.html"),
        blog.renderer.render_not_found()?,
    )?;

    tracing::info!(
        "Generated {} posts ({} skipped) in {:.2}s",
        summary.written,
        summary.skipped,
        start.elapsed().as_secs_f64()
    );

    Ok(summary)
}

fn write_page(dir: &Path, html: &str) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let path = dir.join("index.html");
    fs::write(&path, html).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::test_support::{blog_with_posts, sample_posts};

    #[test]
    fn test_generate_skips_failures() {
        let (dir, blog) = blog_with_posts(sample_posts());
        let summary = blog.generate(20).unwrap();
        assert_eq!(summary.written, 2);
        assert_eq!(summary.skipped, 1);

        let public = dir.path().join("public");
        let page =
            std::fs::read_to_string(public.join("mdx-posts/my-first-post/index.html")).unwrap();
        assert!(page.contains("My First Post"));
        assert!(public.join("mdx-posts/러스트-입문/index.html").exists());
        assert!(!public.join("mdx-posts/broken").exists());

        let index = std::fs::read_to_string(public.join("mdx-posts/index.html")).unwrap();
        assert!(index.contains("/mdx-posts/my-first-post"));
        assert!(!index.contains("Broken"));
        assert!(public.join("posts/index.html").exists());
        assert!(public.join("404.html").exists());
    }

    #[test]
    fn test_generate_newest_post_keeps_shared_slug() {
        let (dir, blog) = blog_with_posts(serde_json::json!([
            {"id": 1, "title": "Hello World", "content": "older body", "published_on": "2024-01-01"},
            {"id": 2, "title": "Hello, World!", "content": "newer body", "published_on": "2024-02-01"}
        ]));
        let summary = blog.generate(20).unwrap();
        assert_eq!(summary.written, 1);
        assert_eq!(summary.skipped, 1);

        let page = std::fs::read_to_string(
            dir.path().join("public/mdx-posts/hello-world/index.html"),
        )
        .unwrap();
        assert!(page.contains("newer body"));
        assert!(!page.contains("older body"));
    }

    #[test]
    fn test_generate_respects_limit() {
        let (_dir, blog) = blog_with_posts(sample_posts());
        let summary = blog.generate(1).unwrap();
        assert_eq!(summary.written + summary.skipped, 1);
    }
}
