//! Conversion of stored posts into renderable documents

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{assemble_frontmatter, flatten_tags, generate_slug, Frontmatter, Metadata, StoredPost};
use crate::compiler::{CompiledDocument, Compiler, TocEntry, Toolchain};
use crate::error::Result;

/// A converted post, ready for rendering or API serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedPost {
    pub compiled_document: CompiledDocument,
    pub toc: Vec<TocEntry>,
    pub frontmatter: Frontmatter,
}

/// Metadata derived from a stored post's columns
pub fn post_metadata(post: &StoredPost) -> Metadata {
    Metadata {
        title: Some(post.title.clone()),
        date: post.published_on.clone(),
        summary: post.summary.clone(),
        tags: flatten_tags(post.hierarchical_tags.as_ref()),
        platform: post.platform.clone(),
        link: post.link.clone(),
        slug: Some(generate_slug(&post.title)),
        ..Default::default()
    }
}

/// Runs the compile and metadata steps for one document at a time
pub struct Converter {
    compiler: Compiler,
}

impl Converter {
    pub fn new(toolchain: Arc<Toolchain>) -> Self {
        Self {
            compiler: Compiler::new(toolchain),
        }
    }

    /// Convert a stored post
    pub fn convert_post(&self, post: &StoredPost) -> Result<ConvertedPost> {
        tracing::debug!("Converting post {} ({})", post.id, post.title);
        self.convert_raw(&post.content, post_metadata(post))
    }

    /// Convert raw content with caller-supplied metadata used as is
    pub fn convert_raw(&self, content: &str, metadata: Metadata) -> Result<ConvertedPost> {
        let compiled = self.compiler.compile(content)?;
        let frontmatter = assemble_frontmatter(&compiled.document.code, metadata)?;

        Ok(ConvertedPost {
            compiled_document: compiled.document,
            toc: compiled.toc,
            frontmatter,
        })
    }

    /// Convert every post independently; one outcome per input, in order
    pub fn convert_batch(&self, posts: &[StoredPost]) -> Vec<Result<ConvertedPost>> {
        posts
            .iter()
            .map(|post| {
                let outcome = self.convert_post(post);
                if let Err(e) = &outcome {
                    tracing::warn!("Failed to convert post {}: {}", post.id, e);
                }
                outcome
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{HierarchicalTags, PostId};
    use crate::error::Error;

    fn converter() -> Converter {
        Converter::new(Arc::new(Toolchain::builtin()))
    }

    fn first_post() -> StoredPost {
        let mut post = StoredPost::new(PostId::Number(1), "My First Post", "# Hi");
        post.hierarchical_tags = Some(HierarchicalTags {
            top: vec!["tech".to_string()],
            ..Default::default()
        });
        post
    }

    #[test]
    fn test_convert_post() {
        let converted = converter().convert_post(&first_post()).unwrap();
        assert_eq!(converted.frontmatter.slug.as_deref(), Some("my-first-post"));
        assert_eq!(converted.frontmatter.tags, vec!["tech"]);
        assert_eq!(converted.frontmatter.title.as_deref(), Some("My First Post"));
        assert_eq!(converted.toc.len(), 1);
        assert_eq!(converted.toc[0].value, "Hi");
        assert_eq!(converted.frontmatter.reading_time.words, 1);
    }

    #[test]
    fn test_published_on_becomes_iso_date() {
        let mut post = first_post();
        post.published_on = Some("2024-03-01 09:00:00+09".to_string());
        let converted = converter().convert_post(&post).unwrap();
        assert_eq!(converted.frontmatter.date, "2024-03-01T00:00:00.000Z");
    }

    #[test]
    fn test_invalid_date_is_a_conversion_error() {
        let mut post = first_post();
        post.published_on = Some("yesterday".to_string());
        let err = converter().convert_post(&post).unwrap_err();
        assert!(matches!(err, Error::Date(_)));
        assert!(err.is_conversion());
        assert!(err.to_string().starts_with("MDX conversion failed"));
    }

    #[test]
    fn test_convert_raw_keeps_caller_metadata() {
        let metadata = Metadata {
            title: Some("Anything".to_string()),
            slug: Some("custom-slug".to_string()),
            ..Default::default()
        };
        let converted = converter().convert_raw("text", metadata).unwrap();
        assert_eq!(converted.frontmatter.slug.as_deref(), Some("custom-slug"));
        assert!(converted.toc.is_empty());
    }

    #[test]
    fn test_batch_isolates_failures() {
        let mut broken = first_post();
        broken.id = PostId::Number(2);
        broken.content = "<Missing />\n".to_string();
        let posts = vec![first_post(), broken, first_post()];

        let outcomes = converter().convert_batch(&posts);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1], Err(Error::Conversion(_))));
        assert!(outcomes[2].is_ok());
    }

    #[test]
    fn test_serialized_shape() {
        let converted = converter().convert_post(&first_post()).unwrap();
        let value = serde_json::to_value(&converted).unwrap();
        assert!(value["compiledDocument"]["code"].is_string());
        assert_eq!(value["toc"][0]["depth"], 1);
        assert_eq!(value["frontmatter"]["readingTime"]["text"], "1 min read");
    }
}
