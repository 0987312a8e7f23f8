//! Stored post records as read from the data backend

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Deserialize a tag tier that may be missing, null, a single string or a list
fn tag_tier<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};

    struct TagTier;

    impl<'de> Visitor<'de> for TagTier {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("null, a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value])
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut tier = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                tier.push(item);
            }
            Ok(tier)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(TagTier)
}

/// Deserialize a text column where `null` means empty
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Tags grouped in three tiers, from broad to specific
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalTags {
    #[serde(default, deserialize_with = "tag_tier")]
    pub top: Vec<String>,
    #[serde(default, deserialize_with = "tag_tier")]
    pub middle: Vec<String>,
    #[serde(default, deserialize_with = "tag_tier")]
    pub sub: Vec<String>,
}

/// Primary key of a post row; backends use either integers or text/uuid keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostId {
    Number(i64),
    Text(String),
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostId::Number(n) => write!(f, "{}", n),
            PostId::Text(s) => f.write_str(s),
        }
    }
}

/// A post row owned by the data backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPost {
    pub id: PostId,

    pub title: String,

    /// Raw Markdown/MDX body; missing or `null` reads as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_on: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchical_tags: Option<HierarchicalTags>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Remaining columns, echoed back untouched by the list API
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl StoredPost {
    /// Create a post with only the required columns
    pub fn new(id: PostId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
            published_on: None,
            created_at: None,
            summary: None,
            hierarchical_tags: None,
            platform: None,
            link: None,
            extra: IndexMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_row() {
        let row = serde_json::json!({
            "id": 7,
            "title": "Hello",
            "content": "# Hi",
            "published_on": "2024-03-01T09:00:00+00:00",
            "summary": "greeting",
            "hierarchical_tags": {"top": ["tech"], "middle": null},
            "platform": "velog",
            "views": 42
        });

        let post: StoredPost = serde_json::from_value(row).unwrap();
        assert_eq!(post.id, PostId::Number(7));
        assert_eq!(post.title, "Hello");
        let tags = post.hierarchical_tags.unwrap();
        assert_eq!(tags.top, vec!["tech"]);
        assert!(tags.middle.is_empty());
        assert_eq!(post.extra.get("views"), Some(&serde_json::json!(42)));
        assert_eq!(post.link, None);
    }

    #[test]
    fn test_text_ids_and_single_string_tier() {
        let row = serde_json::json!({
            "id": "0b6f6f1e-4b8e-4b43-9d53-3f2a4f6e9c10",
            "title": "Uuid keyed",
            "hierarchical_tags": {"top": "solo"}
        });

        let post: StoredPost = serde_json::from_value(row).unwrap();
        assert_eq!(
            post.id.to_string(),
            "0b6f6f1e-4b8e-4b43-9d53-3f2a4f6e9c10"
        );
        assert_eq!(post.hierarchical_tags.unwrap().top, vec!["solo"]);
        assert!(post.content.is_empty());
    }

    #[test]
    fn test_null_content_reads_as_empty() {
        let row = serde_json::json!({"id": 2, "title": "Draft", "content": null});
        let post: StoredPost = serde_json::from_value(row).unwrap();
        assert_eq!(post.content, "");
    }

    #[test]
    fn test_serialize_keeps_extra_columns() {
        let mut post = StoredPost::new(PostId::Number(1), "T", "body");
        post.extra
            .insert("status".to_string(), serde_json::json!("draft"));
        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value["status"], "draft");
        assert!(value.get("summary").is_none());
    }
}
