//! Front-matter assembly for converted documents

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use super::ReadingTime;
use crate::error::DateParseFailure;

/// Custom deserializer that handles both a single string and a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                vec.push(item);
            }
            Ok(vec)
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

    deserializer.deserialize_any(StringOrVec)
}

/// Caller-supplied metadata for a conversion.
///
/// Known fields are typed; anything else lands in `extra` and is carried
/// into the front-matter unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Metadata {
    pub title: Option<String>,
    pub date: Option<String>,
    pub summary: Option<String>,
    #[serde(deserialize_with = "string_or_vec")]
    pub tags: Vec<String>,
    pub platform: Option<String>,
    pub link: Option<String>,
    pub slug: Option<String>,
    /// Overrides the computed estimate when present
    pub reading_time: Option<ReadingTime>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl Metadata {
    /// Split a Markdown document into its YAML front-matter and body.
    ///
    /// Documents without a `---` block yield default metadata and the whole input.
    pub fn parse_document(content: &str) -> Result<(Self, &str)> {
        let trimmed = content.trim_start();
        let Some(rest) = trimmed.strip_prefix("---") else {
            return Ok((Metadata::default(), content));
        };
        let rest = rest.trim_start_matches(['\n', '\r']);

        let Some(end_pos) = rest.find("\n---") else {
            return Ok((Metadata::default(), content));
        };

        let yaml_content = &rest[..end_pos];
        let body = rest[end_pos + 4..].trim_start_matches(['\n', '\r']);

        if yaml_content.trim().is_empty() {
            return Ok((Metadata::default(), body));
        }

        let metadata = serde_yaml::from_str::<Metadata>(yaml_content)
            .map_err(|e| anyhow!("Failed to parse YAML front-matter: {}", e))?;
        Ok((metadata, body))
    }
}

/// Front-matter attached to a converted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frontmatter {
    pub reading_time: ReadingTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// ISO-8601, UTC, millisecond precision
    pub date: String,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl Frontmatter {
    /// Parsed form of `date`
    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        parse_date_string(&self.date)
    }

    /// Layout requested by the document, if any
    pub fn layout_name(&self) -> Option<&str> {
        self.extra.get("layout").and_then(|v| v.as_str())
    }
}

/// Assemble the front-matter of a compiled document.
///
/// Precedence from lowest to highest: the reading time computed from
/// `compiled`, the caller's metadata, then the normalized `date`.
pub fn assemble_frontmatter(
    compiled: &str,
    metadata: Metadata,
) -> Result<Frontmatter, DateParseFailure> {
    let Metadata {
        title,
        date,
        summary,
        tags,
        platform,
        link,
        slug,
        reading_time,
        extra,
    } = metadata;

    let reading_time = reading_time.unwrap_or_else(|| ReadingTime::of_markup(compiled));

    let date = match date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => normalize_date(raw)?,
        _ => to_iso(Utc::now()),
    };

    Ok(Frontmatter {
        reading_time,
        title,
        summary,
        tags,
        platform,
        link,
        slug,
        date,
        extra,
    })
}

/// Convert a date string into ISO-8601 UTC
pub fn normalize_date(raw: &str) -> Result<String, DateParseFailure> {
    parse_date_string(raw)
        .map(to_iso)
        .ok_or_else(|| DateParseFailure {
            value: raw.to_string(),
        })
}

fn to_iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a date string in the formats backends and authors commonly emit.
///
/// Values without an offset are read as UTC.
pub(crate) fn parse_date_string(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    // RFC 3339 / ISO 8601
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // Postgres style offsets such as "+09" or "+0900"
    let offset_formats = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
    for fmt in offset_formats {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata_with_date(date: Option<&str>) -> Metadata {
        Metadata {
            title: Some("Title".to_string()),
            date: date.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_common_formats() {
        assert_eq!(
            normalize_date("2024-01-15T10:30:00+09:00").unwrap(),
            "2024-01-15T01:30:00.000Z"
        );
        assert_eq!(
            normalize_date("2024-01-15 10:30:00.123456+00").unwrap(),
            "2024-01-15T10:30:00.123Z"
        );
        assert_eq!(
            normalize_date("2024-01-15 10:30:00").unwrap(),
            "2024-01-15T10:30:00.000Z"
        );
        assert_eq!(
            normalize_date("2024/01/15").unwrap(),
            "2024-01-15T00:00:00.000Z"
        );
    }

    #[test]
    fn test_invalid_date_fails() {
        let err = normalize_date("next tuesday").unwrap_err();
        assert_eq!(err.value, "next tuesday");

        let err = assemble_frontmatter("", metadata_with_date(Some("2024-13-45"))).unwrap_err();
        assert_eq!(err.value, "2024-13-45");
    }

    #[test]
    fn test_date_always_iso() {
        for date in [None, Some(""), Some("2023-06-01")] {
            let fm = assemble_frontmatter("<p>x</p>", metadata_with_date(date)).unwrap();
            assert!(
                DateTime::parse_from_rfc3339(&fm.date).is_ok(),
                "not ISO-8601: {}",
                fm.date
            );
            assert!(fm.date.ends_with('Z'));
        }
    }

    #[test]
    fn test_reading_time_from_compiled_text() {
        let fm = assemble_frontmatter("<p>one two three</p>", Metadata::default()).unwrap();
        assert_eq!(fm.reading_time.words, 3);
    }

    #[test]
    fn test_caller_reading_time_wins() {
        let metadata = Metadata {
            reading_time: Some(ReadingTime::from_words(1000)),
            ..Default::default()
        };
        let fm = assemble_frontmatter("<p>short</p>", metadata).unwrap();
        assert_eq!(fm.reading_time.words, 1000);
        assert_eq!(fm.reading_time.text, "5 min read");
    }

    #[test]
    fn test_extra_fields_are_carried() {
        let metadata: Metadata = serde_json::from_value(serde_json::json!({
            "title": "T",
            "tags": "single",
            "layout": "PostSimple",
            "draft": true
        }))
        .unwrap();
        let fm = assemble_frontmatter("", metadata).unwrap();
        assert_eq!(fm.tags, vec!["single"]);
        assert_eq!(fm.layout_name(), Some("PostSimple"));

        let value = serde_json::to_value(&fm).unwrap();
        assert_eq!(value["draft"], true);
        assert_eq!(value["readingTime"]["text"], "0 min read");
        assert!(value.get("platform").is_none());
    }

    #[test]
    fn test_parse_document_with_front_matter() {
        let content = r#"---
title: Hello World
date: 2024-01-15 10:30:00
tags:
  - rust
  - blog
---

# Heading
"#;
        let (metadata, body) = Metadata::parse_document(content).unwrap();
        assert_eq!(metadata.title.as_deref(), Some("Hello World"));
        assert_eq!(metadata.date.as_deref(), Some("2024-01-15 10:30:00"));
        assert_eq!(metadata.tags, vec!["rust", "blog"]);
        assert!(body.starts_with("# Heading"));
    }

    #[test]
    fn test_parse_document_without_front_matter() {
        let (metadata, body) = Metadata::parse_document("# Just content").unwrap();
        assert!(metadata.title.is_none());
        assert_eq!(body, "# Just content");
    }
}
