//! Table of contents extraction

use pulldown_cmark::{Event, Tag};
use serde::{Deserialize, Serialize};

use super::headings::{heading_id, heading_text, Slugger};
use crate::compiler::pipeline::{Stage, StageContext};

/// One heading of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading text
    pub value: String,
    /// Fragment link to the heading, `#` + id
    pub url: String,
    /// 1 for `#`, 2 for `##`...
    pub depth: u8,
}

/// Record every heading into the table of contents; the tree is left as is
pub struct TocExtraction;

impl Stage for TocExtraction {
    fn name(&self) -> &'static str {
        "toc"
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        ctx: &mut StageContext,
    ) -> anyhow::Result<Vec<Event<'a>>> {
        // Same slugging as the heading-id stage so urls match the final ids
        let mut slugger = Slugger::default();

        for (index, event) in events.iter().enumerate() {
            if let Event::Start(Tag::Heading { level, .. }) = event {
                let (value, _) = heading_text(&events, index);
                let id = heading_id(&events, index, &mut slugger);
                ctx.toc.push(TocEntry {
                    value,
                    url: format!("#{}", id),
                    depth: *level as u8,
                });
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::stages::test_support::render;

    #[test]
    fn test_depths_in_document_order() {
        let (_, ctx) = render("# A\n\ntext\n\n## B\n", &[&TocExtraction]);
        assert_eq!(
            ctx.toc,
            vec![
                TocEntry {
                    value: "A".to_string(),
                    url: "#a".to_string(),
                    depth: 1
                },
                TocEntry {
                    value: "B".to_string(),
                    url: "#b".to_string(),
                    depth: 2
                },
            ]
        );
    }

    #[test]
    fn test_no_headings_no_entries() {
        let (html, ctx) = render("just a paragraph\n", &[&TocExtraction]);
        assert!(ctx.toc.is_empty());
        assert_eq!(html, "<p>just a paragraph</p>\n");
    }

    #[test]
    fn test_setext_and_inline_markup() {
        let (_, ctx) = render("Title with *emphasis*\n===\n\n### `fn main`\n", &[&TocExtraction]);
        assert_eq!(ctx.toc[0].value, "Title with emphasis");
        assert_eq!(ctx.toc[0].url, "#title-with-emphasis");
        assert_eq!(ctx.toc[1].value, "fn main");
        assert_eq!(ctx.toc[1].depth, 3);
    }
}
