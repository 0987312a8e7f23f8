//! Heading identifiers and anchor links

use pulldown_cmark::{CowStr, Event, Tag, TagEnd};
use std::collections::HashMap;

use super::footnotes::strip_inline_notes;
use crate::compiler::pipeline::{Stage, StageContext};

/// GitHub-style heading slugs, deduplicated within one document
#[derive(Debug, Default)]
pub struct Slugger {
    occurrences: HashMap<String, usize>,
}

impl Slugger {
    /// Slug for `text`; repeated slugs get `-1`, `-2`... suffixes
    pub fn slug(&mut self, text: &str) -> String {
        let base = github_slug(text);
        let mut result = base.clone();
        while self.occurrences.contains_key(&result) {
            let count = self.occurrences.entry(base.clone()).or_insert(0);
            *count += 1;
            result = format!("{}-{}", base, count);
        }
        self.occurrences.insert(result.clone(), 0);
        result
    }

    /// Mark an explicit identifier as taken
    pub fn reserve(&mut self, id: &str) {
        self.occurrences.entry(id.to_string()).or_insert(0);
    }
}

fn github_slug(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ' '))
        .map(|c| if c == ' ' { '-' } else { c })
        .collect()
}

/// Plain text of the heading starting at `start`, and the index of its end event.
///
/// Image descriptions and raw HTML do not count.
pub(super) fn heading_text(events: &[Event<'_>], start: usize) -> (String, usize) {
    let mut text = String::new();
    let mut image_depth = 0usize;
    let mut index = start + 1;

    while index < events.len() {
        match &events[index] {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Start(Tag::Image { .. }) => image_depth += 1,
            Event::End(TagEnd::Image) => image_depth = image_depth.saturating_sub(1),
            Event::Text(t) | Event::Code(t) | Event::InlineMath(t) | Event::DisplayMath(t)
                if image_depth == 0 =>
            {
                text.push_str(t)
            }
            _ => {}
        }
        index += 1;
    }

    (strip_inline_notes(&text).trim().to_string(), index)
}

/// Identifier of the heading at `start`, explicit or slugged
pub(super) fn heading_id(events: &[Event<'_>], start: usize, slugger: &mut Slugger) -> String {
    match &events[start] {
        Event::Start(Tag::Heading { id: Some(id), .. }) => {
            slugger.reserve(id);
            id.to_string()
        }
        _ => slugger.slug(&heading_text(events, start).0),
    }
}

/// Give every heading an `id`
pub struct HeadingIds;

impl Stage for HeadingIds {
    fn name(&self) -> &'static str {
        "heading-ids"
    }

    fn transform<'a>(
        &self,
        mut events: Vec<Event<'a>>,
        _ctx: &mut StageContext,
    ) -> anyhow::Result<Vec<Event<'a>>> {
        let mut slugger = Slugger::default();

        for index in 0..events.len() {
            if !matches!(events[index], Event::Start(Tag::Heading { .. })) {
                continue;
            }
            let slug = heading_id(&events, index, &mut slugger);
            if let Event::Start(Tag::Heading { id, .. }) = &mut events[index] {
                *id = Some(CowStr::from(slug));
            }
        }

        Ok(events)
    }
}

/// Prepend a self-link to every heading that has an id
pub struct AutolinkHeadings;

impl Stage for AutolinkHeadings {
    fn name(&self) -> &'static str {
        "autolink-headings"
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        _ctx: &mut StageContext,
    ) -> anyhow::Result<Vec<Event<'a>>> {
        let mut out = Vec::with_capacity(events.len());

        for event in events {
            let anchor = match &event {
                Event::Start(Tag::Heading { id: Some(id), .. }) => Some(format!(
                    r##"<a aria-hidden="true" tabindex="-1" href="#{}"><span class="icon icon-link"></span></a>"##,
                    id
                )),
                _ => None,
            };
            out.push(event);
            if let Some(anchor) = anchor {
                out.push(Event::InlineHtml(CowStr::from(anchor)));
            }
        }

        Ok(out)
    }
}
