//! List stored content

use anyhow::Result;
use std::collections::HashMap;

use crate::content::{flatten_tags, generate_slug};
use crate::Blog;

/// List site content by type
pub fn run(blog: &Blog, content_type: &str) -> Result<()> {
    match content_type {
        "post" | "posts" => {
            let posts = blog.repository.list_published(None)?;
            println!("Posts ({}):", posts.len());
            for post in posts {
                println!(
                    "  {} - {} [{}] (id {})",
                    post.published_on.as_deref().unwrap_or("unpublished"),
                    post.title,
                    generate_slug(&post.title),
                    post.id
                );
            }
        }
        "tag" | "tags" => {
            let posts = blog.repository.list_published(None)?;
            let tags = count_tags(&posts);
            println!("Tags ({}):", tags.len());
            for (tag, count) in tags {
                println!("  {} ({})", tag, count);
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: posts, tags", content_type);
        }
    }

    Ok(())
}

/// Tag usage counts, most used first
fn count_tags(posts: &[crate::content::StoredPost]) -> Vec<(String, usize)> {
    let mut tags: HashMap<String, usize> = HashMap::new();
    for post in posts {
        for tag in flatten_tags(post.hierarchical_tags.as_ref()) {
            *tags.entry(tag).or_insert(0) += 1;
        }
    }
    let mut tags: Vec<_> = tags.into_iter().collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::StoredPost;

    #[test]
    fn test_count_tags() {
        let posts: Vec<StoredPost> = serde_json::from_value(serde_json::json!([
            {"id": 1, "title": "a", "hierarchical_tags": {"top": ["tech"], "sub": ["rust"]}},
            {"id": 2, "title": "b", "hierarchical_tags": {"top": ["tech"], "middle": ["web"]}},
            {"id": 3, "title": "c"}
        ]))
        .unwrap();
        assert_eq!(
            count_tags(&posts),
            vec![
                ("tech".to_string(), 2),
                ("rust".to_string(), 1),
                ("web".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_unknown_type() {
        let (_dir, blog) =
            crate::test_support::blog_with_posts(crate::test_support::sample_posts());
        assert!(run(&blog, "categories").is_err());
        assert!(run(&blog, "posts").is_ok());
    }
}
