//! Component bindings and the bundling step
//!
//! After the tree stages, JSX-style component tags and links are resolved
//! against the registry and replaced by placeholders. The compiled document
//! carries one binding per placeholder; the renderer fills them in.

use anyhow::{bail, Result};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use pulldown_cmark::{html, CowStr, Event, Tag, TagEnd};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::pipeline::StageContext;

lazy_static! {
    /// Where a component tag may start: `<` or `</` before an upper-case letter
    static ref TAG_OPENING: Regex = Regex::new(r"</?[A-Z]").unwrap();
    static ref PLACEHOLDER: Regex =
        Regex::new(r#"<mdx-component data-id="?(\d+)"?\s*>\s*</mdx-component>"#).unwrap();
}

/// Markup standing in for a bound component
pub(crate) fn placeholder(id: usize) -> String {
    format!(r#"<mdx-component data-id="{}"></mdx-component>"#, id)
}

/// Replace every placeholder in `html` using `render`
pub(crate) fn replace_placeholders<F, E>(html: &str, mut render: F) -> std::result::Result<String, E>
where
    F: FnMut(usize) -> std::result::Result<String, E>,
{
    let mut output = String::with_capacity(html.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(html) {
        let (Some(whole), Ok(id)) = (caps.get(0), caps[1].parse::<usize>()) else {
            continue;
        };
        output.push_str(&html[last..whole.start()]);
        output.push_str(&render(id)?);
        last = whole.end();
    }
    output.push_str(&html[last..]);
    Ok(output)
}

/// The components a compiled document can bind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComponentKind {
    /// Rewritten Markdown image
    Image,
    /// Every link in the document
    Link,
    /// Highlighted code block
    CodeBlock,
    TocInline,
    PageTitle,
    NewsletterForm,
    /// A template discovered in the components directory
    Custom(String),
}

impl ComponentKind {
    /// Name used in documents and in serialized bindings
    pub fn name(&self) -> &str {
        match self {
            ComponentKind::Image => "Image",
            ComponentKind::Link => "a",
            ComponentKind::CodeBlock => "pre",
            ComponentKind::TocInline => "TOCInline",
            ComponentKind::PageTitle => "PageTitle",
            ComponentKind::NewsletterForm => "BlogNewsletterForm",
            ComponentKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for ComponentKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Image" => ComponentKind::Image,
            "a" => ComponentKind::Link,
            "pre" => ComponentKind::CodeBlock,
            "TOCInline" => ComponentKind::TocInline,
            "PageTitle" => ComponentKind::PageTitle,
            "BlogNewsletterForm" => ComponentKind::NewsletterForm,
            _ => ComponentKind::Custom(name),
        }
    }
}

impl From<ComponentKind> for String {
    fn from(kind: ComponentKind) -> Self {
        kind.name().to_string()
    }
}

/// A component occurrence resolved at compile time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentBinding {
    pub kind: ComponentKind,
    #[serde(default)]
    pub props: IndexMap<String, String>,
    /// Compiled markup between the opening and closing tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<String>,
}

impl ComponentBinding {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            props: IndexMap::new(),
            children: None,
        }
    }

    pub fn prop(mut self, key: &str, value: impl Into<String>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }
}

/// Components that documents may reference by tag name
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    custom: IndexMap<String, PathBuf>,
}

impl ComponentRegistry {
    /// Names usable as tags without any components directory
    const BUILTIN_TAGS: [&'static str; 4] = ["Image", "TOCInline", "PageTitle", "BlogNewsletterForm"];

    pub fn builtin() -> Self {
        Self::default()
    }

    fn is_builtin(name: &str) -> bool {
        Self::BUILTIN_TAGS.iter().any(|tag| *tag == name)
    }

    /// Register every `<Name>.html` template found in `dir`
    pub fn discover(dir: &Path) -> Result<Self> {
        let mut custom = IndexMap::new();

        for entry in WalkDir::new(dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || path.extension().map(|e| e != "html").unwrap_or(true) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
                tracing::warn!("Ignoring component template {:?}: names start upper-case", path);
                continue;
            }
            if Self::is_builtin(name) {
                tracing::warn!("Ignoring component template {:?}: name is reserved", path);
                continue;
            }
            custom.insert(name.to_string(), path.to_path_buf());
        }

        tracing::debug!("Discovered {} custom components in {:?}", custom.len(), dir);
        Ok(Self { custom })
    }

    /// Resolve a tag name used in a document
    pub fn resolve(&self, name: &str) -> Option<ComponentKind> {
        if Self::is_builtin(name) {
            return Some(ComponentKind::from(name.to_string()));
        }
        self.custom
            .contains_key(name)
            .then(|| ComponentKind::Custom(name.to_string()))
    }

    /// Template files of the custom components
    pub fn custom_templates(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.custom.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }
}

/// A component tag parsed out of markup or text
#[derive(Debug)]
struct ComponentTag {
    name: String,
    closing: bool,
    self_closing: bool,
    /// `{expr}` values keep the inner expression, bare attributes become `"true"`
    props: IndexMap<String, String>,
    /// Bytes consumed, including `<` and `>`
    len: usize,
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':'
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

/// Byte cursor over tag source. Every delimiter is ASCII, so slicing at the
/// positions it stops on stays on char boundaries.
struct Cursor<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Cursor<'s> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, f: impl Fn(u8) -> bool) -> &'s str {
        let start = self.pos;
        while self.peek().map(&f).unwrap_or(false) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(|b| b.is_ascii_whitespace());
    }

    /// Consume a quoted string starting at the opening quote
    fn quoted(&mut self) -> Option<&'s str> {
        let quote = self.peek()?;
        self.pos += 1;
        let start = self.pos;
        let end = start + self.src[start..].find(quote as char)?;
        self.pos = end + 1;
        Some(&self.src[start..end])
    }

    /// Consume a `{…}` expression with balanced braces; string literals may
    /// contain braces
    fn expression(&mut self) -> Option<&'s str> {
        let start = self.pos + 1;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'"' | b'\'' | b'`' => {
                    self.quoted()?;
                    continue;
                }
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return Some(&self.src[start..self.pos - 1]);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        None
    }
}

/// Parse the component tag at the start of `src`, which begins with `<`
fn parse_tag(src: &str) -> Result<ComponentTag> {
    let mut cur = Cursor { src, pos: 1 };
    let closing = cur.eat(b'/');
    let name = cur.take_while(|b| b.is_ascii_alphanumeric()).to_string();
    let mut props = IndexMap::new();

    loop {
        cur.skip_whitespace();
        match cur.peek() {
            Some(b'>') => {
                cur.pos += 1;
                break;
            }
            Some(b'/') if !closing => {
                cur.pos += 1;
                if !cur.eat(b'>') {
                    bail!("Malformed component tag <{}>", name);
                }
                return Ok(ComponentTag {
                    name,
                    closing,
                    self_closing: true,
                    props,
                    len: cur.pos,
                });
            }
            Some(b'{') => bail!("Spread props are not supported in <{}>", name),
            Some(b) if is_name_start(b) && !closing => {
                let key = cur.take_while(is_name_char).to_string();
                cur.skip_whitespace();
                let value = if cur.eat(b'=') {
                    cur.skip_whitespace();
                    let value = match cur.peek() {
                        Some(b'"' | b'\'') => cur.quoted().map(str::to_string),
                        Some(b'{') => cur.expression().map(|e| e.trim().to_string()),
                        _ => None,
                    };
                    match value {
                        Some(value) => value,
                        None => bail!("Malformed value of {:?} in <{}>", key, name),
                    }
                } else {
                    "true".to_string()
                };
                props.insert(key, value);
            }
            _ => bail!("Malformed component tag <{}{}>", if closing { "/" } else { "" }, name),
        }
    }

    Ok(ComponentTag {
        name,
        closing,
        self_closing: false,
        props,
        len: cur.pos,
    })
}

/// How markup around component tags is passed on
#[derive(Debug, Clone, Copy)]
enum Segment {
    Block,
    Inline,
    Text,
}

/// An opened component waiting for its closing tag
struct Frame<'a> {
    tag: String,
    binding: ComponentBinding,
    events: Vec<Event<'a>>,
}

struct Bundler<'r, 'c, 'a> {
    registry: &'r ComponentRegistry,
    ctx: &'c mut StageContext,
    out: Vec<Event<'a>>,
    stack: Vec<Frame<'a>>,
}

impl<'r, 'c, 'a> Bundler<'r, 'c, 'a> {
    fn push(&mut self, event: Event<'a>) {
        match self.stack.last_mut() {
            Some(frame) => frame.events.push(event),
            None => self.out.push(event),
        }
    }

    fn push_raw(&mut self, raw: &str, inline: bool) {
        if raw.is_empty() {
            return;
        }
        let raw = CowStr::from(raw.to_string());
        self.push(if inline {
            Event::InlineHtml(raw)
        } else {
            Event::Html(raw)
        });
    }

    fn bind(&mut self, binding: ComponentBinding) {
        let placeholder = self.ctx.bind(binding);
        self.push(Event::InlineHtml(CowStr::from(placeholder)));
    }

    fn open(&mut self, tag: &str, binding: ComponentBinding) {
        self.stack.push(Frame {
            tag: tag.to_string(),
            binding,
            events: Vec::new(),
        });
    }

    fn close(&mut self, tag: &str) -> Result<()> {
        let Some(frame) = self.stack.pop() else {
            bail!("Unexpected closing tag </{}>", tag);
        };
        if frame.tag != tag {
            bail!(
                "Mismatched closing tag </{}>, expected </{}>",
                tag,
                frame.tag
            );
        }

        let mut children = String::new();
        html::push_html(&mut children, frame.events.into_iter());
        let mut binding = frame.binding;
        binding.children = Some(children);
        self.bind(binding);
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.push(Event::Text(CowStr::from(text.to_string())));
        }
    }

    fn push_segment(&mut self, segment: &str, kind: Segment) {
        match kind {
            Segment::Block => self.push_raw(segment, false),
            Segment::Inline => self.push_raw(segment, true),
            Segment::Text => self.push_text(segment),
        }
    }

    /// Bind every component tag in `source`; the rest passes through as `kind`
    fn scan(&mut self, source: &str, kind: Segment) -> Result<()> {
        let mut last = 0;
        while let Some(opening) = TAG_OPENING.find_at(source, last) {
            self.push_segment(&source[last..opening.start()], kind);
            let tag = parse_tag(&source[opening.start()..])?;
            last = opening.start() + tag.len;

            if tag.closing {
                self.close(&tag.name)?;
                continue;
            }

            let Some(component) = self.registry.resolve(&tag.name) else {
                bail!("Unresolved custom component <{}>", tag.name);
            };
            let mut binding = ComponentBinding::new(component);
            binding.props = tag.props;

            if tag.self_closing {
                self.bind(binding);
            } else {
                self.open(&tag.name, binding);
            }
        }
        self.push_segment(&source[last..], kind);
        Ok(())
    }

    fn finish(self) -> Result<Vec<Event<'a>>> {
        if let Some(frame) = self.stack.last() {
            bail!("Unclosed component <{}>", frame.tag);
        }
        Ok(self.out)
    }
}

/// Join consecutive raw HTML events, and text runs broken by soft breaks, so
/// tags split across events are seen whole
fn merge_events(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut merged: Vec<Event> = Vec::with_capacity(events.len());
    for event in events {
        let joined = match (merged.last_mut(), &event) {
            (Some(Event::Html(prev)), Event::Html(next))
            | (Some(Event::InlineHtml(prev)), Event::InlineHtml(next))
            | (Some(Event::Text(prev)), Event::Text(next)) => {
                *prev = CowStr::from(format!("{}{}", prev, next));
                true
            }
            (Some(Event::Text(prev)), Event::SoftBreak) => {
                *prev = CowStr::from(format!("{}\n", prev));
                true
            }
            _ => false,
        };
        if !joined {
            merged.push(event);
        }
    }
    merged
}

/// Resolve component tags and links into bindings.
///
/// Tags are picked up from raw HTML and from text, since tags with nested
/// braces are not HTML to the Markdown parser. Fails on unknown component
/// names, on tags that do not parse and on unbalanced tags.
pub fn bundle<'a>(
    events: Vec<Event<'a>>,
    registry: &ComponentRegistry,
    ctx: &mut StageContext,
) -> Result<Vec<Event<'a>>> {
    let mut bundler = Bundler {
        registry,
        ctx,
        out: Vec::with_capacity(events.len()),
        stack: Vec::new(),
    };

    let mut in_code = false;
    for event in merge_events(events) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => {
                in_code = true;
                bundler.push(event);
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code = false;
                bundler.push(event);
            }
            Event::Text(text) if !in_code => bundler.scan(&text, Segment::Text)?,
            Event::Html(source) => bundler.scan(&source, Segment::Block)?,
            Event::InlineHtml(source) => bundler.scan(&source, Segment::Inline)?,
            Event::Start(Tag::Link {
                dest_url, title, ..
            }) => {
                let mut binding = ComponentBinding::new(ComponentKind::Link).prop("href", dest_url.as_ref());
                if !title.is_empty() {
                    binding = binding.prop("title", title.as_ref());
                }
                bundler.open("a", binding);
            }
            Event::End(TagEnd::Link) => bundler.close("a")?,
            other => bundler.push(other),
        }
    }

    bundler.finish()
}
