//! GitHub-flavored Markdown extensions

use lazy_static::lazy_static;
use pulldown_cmark::{CowStr, Event, LinkType, Options, Tag, TagEnd};
use regex::Regex;

use crate::compiler::pipeline::{Stage, StageContext};

lazy_static! {
    /// Bare `http(s)://` or `www.` URL; trailing punctuation is not part of it
    static ref BARE_URL: Regex =
        Regex::new(r#"(?:https?://|www\.)[^\s<>]*[^\s<>.,:;"'()\[\]!?*_~]"#).unwrap();
}

/// Tables, strikethrough, task lists and autolinked bare URLs
pub struct GfmExtensions;

impl GfmExtensions {
    fn link_events<'a>(out: &mut Vec<Event<'a>>, url: &str) {
        let dest = if url.starts_with("www.") {
            format!("http://{}", url)
        } else {
            url.to_string()
        };
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(dest),
            title: CowStr::from(""),
            id: CowStr::from(""),
        }));
        out.push(Event::Text(CowStr::from(url.to_string())));
        out.push(Event::End(TagEnd::Link));
    }
}

impl Stage for GfmExtensions {
    fn name(&self) -> &'static str {
        "gfm"
    }

    fn parser_options(&self) -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_GFM
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        _ctx: &mut StageContext,
    ) -> anyhow::Result<Vec<Event<'a>>> {
        let mut out = Vec::with_capacity(events.len());
        // Links, images and code blocks keep their text as is
        let mut opaque = 0usize;

        for event in events {
            match event {
                Event::Start(Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_)) => {
                    opaque += 1;
                    out.push(event);
                }
                Event::End(TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock) => {
                    opaque = opaque.saturating_sub(1);
                    out.push(event);
                }
                Event::Text(text) if opaque == 0 && BARE_URL.is_match(&text) => {
                    let mut last = 0;
                    for m in BARE_URL.find_iter(&text) {
                        if m.start() > last {
                            out.push(Event::Text(CowStr::from(text[last..m.start()].to_string())));
                        }
                        Self::link_events(&mut out, m.as_str());
                        last = m.end();
                    }
                    if last < text.len() {
                        out.push(Event::Text(CowStr::from(text[last..].to_string())));
                    }
                }
                other => out.push(other),
            }
        }

        Ok(out)
    }
}
