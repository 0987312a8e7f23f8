//! Footnotes, including inline `^[note]` footnotes

use lazy_static::lazy_static;
use pulldown_cmark::{CowStr, Event, Options, Tag, TagEnd};
use regex::Regex;
use std::collections::HashSet;

use crate::compiler::pipeline::{Stage, StageContext};

lazy_static! {
    static ref INLINE_NOTE: Regex = Regex::new(r"\^\[([^\]]+)\]").unwrap();
}

/// Remove inline notes from plain text
pub(super) fn strip_inline_notes(text: &str) -> String {
    INLINE_NOTE.replace_all(text, "").into_owned()
}

fn is_inline_tag(tag: &Tag) -> bool {
    matches!(
        tag,
        Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. }
    )
}

fn is_inline_end(tag: &TagEnd) -> bool {
    matches!(
        tag,
        TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link | TagEnd::Image
    )
}

fn push_text<'a>(events: &mut Vec<Event<'a>>, text: &str) {
    if !text.is_empty() {
        events.push(Event::Text(CowStr::from(text.to_string())));
    }
}

/// An inline note from `^[` up to its matching `]`
struct OpenNote<'a> {
    events: Vec<Event<'a>>,
    /// Unmatched `[` in the note, counting the opening one
    brackets: usize,
    /// Inline tags opened in the note and not closed yet
    tags: usize,
}

/// Collects inline notes across the inline events of a block
struct InlineNotes<'a> {
    out: Vec<Event<'a>>,
    open: Option<OpenNote<'a>>,
    notes: Vec<(String, Vec<Event<'a>>)>,
    /// Labels already used by reference footnotes
    taken: HashSet<String>,
    next: usize,
}

impl<'a> InlineNotes<'a> {
    fn new(taken: HashSet<String>, capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
            open: None,
            notes: Vec::new(),
            taken,
            next: 1,
        }
    }

    fn text(&mut self, text: &str) {
        let mut rest = text;
        loop {
            match &mut self.open {
                None => {
                    let Some(start) = rest.find("^[") else {
                        push_text(&mut self.out, rest);
                        return;
                    };
                    push_text(&mut self.out, &rest[..start]);
                    self.open = Some(OpenNote {
                        events: Vec::new(),
                        brackets: 1,
                        tags: 0,
                    });
                    rest = &rest[start + 2..];
                }
                Some(note) => {
                    let mut close = None;
                    for (i, c) in rest.char_indices() {
                        match c {
                            '[' => note.brackets += 1,
                            ']' => {
                                note.brackets -= 1;
                                if note.brackets == 0 {
                                    close = Some(i);
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                    let Some(i) = close else {
                        push_text(&mut note.events, rest);
                        return;
                    };
                    push_text(&mut note.events, &rest[..i]);
                    rest = &rest[i + 1..];
                    self.close();
                }
            }
        }
    }

    /// Any non-text event
    fn event(&mut self, event: Event<'a>) {
        let Some(note) = self.open.as_mut() else {
            self.out.push(event);
            return;
        };
        let inline = match &event {
            Event::Start(tag) if is_inline_tag(tag) => {
                note.tags += 1;
                true
            }
            Event::End(tag) if is_inline_end(tag) && note.tags > 0 => {
                note.tags -= 1;
                true
            }
            Event::Code(_)
            | Event::InlineMath(_)
            | Event::InlineHtml(_)
            | Event::SoftBreak
            | Event::HardBreak
            | Event::FootnoteReference(_) => true,
            _ => false,
        };
        if inline {
            note.events.push(event);
        } else {
            self.abandon();
            self.out.push(event);
        }
    }

    /// Turn the open note into a reference and a pending definition
    fn close(&mut self) {
        let Some(note) = self.open.take() else { return };
        if note.tags > 0 {
            // The closing bracket sits inside formatting opened in the note
            self.out.push(Event::Text(CowStr::from("^[")));
            self.out.extend(note.events);
            self.out.push(Event::Text(CowStr::from("]")));
            return;
        }

        let label = self.next_label();
        self.out
            .push(Event::FootnoteReference(CowStr::from(label.clone())));
        self.notes.push((label, trim_edges(note.events)));
    }

    /// Give back an unterminated note as the text it came from
    fn abandon(&mut self) {
        if let Some(note) = self.open.take() {
            self.out.push(Event::Text(CowStr::from("^[")));
            self.out.extend(note.events);
        }
    }

    fn next_label(&mut self) -> String {
        loop {
            let label = format!("inline-{}", self.next);
            self.next += 1;
            if !self.taken.contains(&label) {
                return label;
            }
        }
    }

    /// Output events followed by one definition per note
    fn finish(mut self) -> Vec<Event<'a>> {
        self.abandon();
        let mut out = self.out;
        for (label, events) in self.notes {
            out.push(Event::Start(Tag::FootnoteDefinition(CowStr::from(label))));
            out.push(Event::Start(Tag::Paragraph));
            out.extend(events);
            out.push(Event::End(TagEnd::Paragraph));
            out.push(Event::End(TagEnd::FootnoteDefinition));
        }
        out
    }
}

/// Trim whitespace at the start of the first and the end of the last text event
fn trim_edges(mut events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    if let Some(Event::Text(text)) = events.first_mut() {
        *text = CowStr::from(text.trim_start().to_string());
    }
    if let Some(Event::Text(text)) = events.last_mut() {
        *text = CowStr::from(text.trim_end().to_string());
    }
    events.retain(|e| !matches!(e, Event::Text(t) if t.is_empty()));
    events
}

/// Reference footnotes plus inline notes turned into numbered definitions
/// appended to the document. Inline notes may contain formatting, code and
/// math; their labels never reuse a label of a reference footnote.
pub struct Footnotes;

impl Stage for Footnotes {
    fn name(&self) -> &'static str {
        "footnotes"
    }

    fn parser_options(&self) -> Options {
        Options::ENABLE_FOOTNOTES
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        _ctx: &mut StageContext,
    ) -> anyhow::Result<Vec<Event<'a>>> {
        let taken: HashSet<String> = events
            .iter()
            .filter_map(|event| match event {
                Event::FootnoteReference(label)
                | Event::Start(Tag::FootnoteDefinition(label)) => Some(label.to_string()),
                _ => None,
            })
            .collect();

        let mut notes = InlineNotes::new(taken, events.len());
        let mut in_code = false;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(_)) => {
                    in_code = true;
                    notes.event(event);
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code = false;
                    notes.event(event);
                }
                Event::Text(text) if !in_code => notes.text(&text),
                other => notes.event(other),
            }
        }

        Ok(notes.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::stages::test_support::render;
    use crate::compiler::stages::MathSyntax;

    #[test]
    fn test_reference_footnotes() {
        let (html, _) = render("Claim.[^1]\n\n[^1]: Source.\n", &[&Footnotes]);
        assert!(html.contains("footnote-reference"));
        assert!(html.contains("footnote-definition"));
    }

    #[test]
    fn test_inline_notes_become_definitions() {
        let (html, _) = render("Rust^[a systems language] is fast.\n", &[&Footnotes]);
        assert!(!html.contains("^["));
        assert!(html.contains("href=\"#inline-1\""));
        assert!(html.contains("id=\"inline-1\""));
        assert!(html.contains("a systems language"));
    }

    #[test]
    fn test_inline_notes_in_code_untouched() {
        let (html, _) = render("```\nx^[y]\n```\n", &[&Footnotes]);
        assert!(html.contains("x^[y]"));
        assert!(!html.contains("footnote"));
    }

    #[test]
    fn test_inline_notes_with_formatting_and_math() {
        let (html, _) = render(
            "Rust^[a *memory safe* language] and maths^[see $x$ here].\n",
            &[&Footnotes, &MathSyntax],
        );
        assert!(!html.contains("^["));
        assert!(html.contains("id=\"inline-1\""));
        assert!(html.contains("id=\"inline-2\""));
        assert!(html.contains("<em>memory safe</em>"));
        assert!(html.contains(r#"<span class="math math-inline">x</span>"#));
    }

    #[test]
    fn test_inline_labels_skip_author_labels() {
        let (html, _) = render(
            "Own note.[^inline-1] Generated^[inline note].\n\n[^inline-1]: Mine.\n",
            &[&Footnotes],
        );
        assert!(html.contains("href=\"#inline-2\""));
        assert!(html.contains("id=\"inline-2\""));
        assert!(html.contains("inline note"));
    }

    #[test]
    fn test_unterminated_inline_note_kept_as_text() {
        let (html, _) = render("Open ^[never *closed* here\n\nNext.\n", &[&Footnotes]);
        assert!(html.contains("^[never <em>closed</em> here"));
        assert!(!html.contains("footnote-definition"));
    }

    #[test]
    fn test_nested_brackets_in_inline_note() {
        let (html, _) = render("Text^[see [1] above] end.\n", &[&Footnotes]);
        assert!(html.contains("see [1] above"));
        assert!(html.contains(" end."));
        assert!(!html.contains("^["));
    }

    #[test]
    fn test_strip_inline_notes() {
        assert_eq!(strip_inline_notes("Title^[note] here"), "Title here");
    }
}
