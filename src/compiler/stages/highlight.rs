//! Syntax highlighting of code blocks

use anyhow::Context;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Tag, TagEnd};
use std::sync::Arc;
use syntect::html::highlighted_html_for_string;

use crate::compiler::components::{ComponentBinding, ComponentKind};
use crate::compiler::pipeline::{Stage, StageContext};
use crate::compiler::toolchain::Toolchain;

/// Highlight code blocks with the toolchain's syntaxes and theme.
///
/// Each block becomes a `pre` component whose children are the highlighted markup.
pub struct Highlight {
    toolchain: Arc<Toolchain>,
}

impl Highlight {
    pub fn new(toolchain: Arc<Toolchain>) -> Self {
        Self { toolchain }
    }

    fn highlight_code(&self, code: &str, lang: Option<&str>) -> anyhow::Result<String> {
        let syntax_set = self.toolchain.syntax_set();
        let syntax = lang
            .and_then(|lang| {
                syntax_set
                    .find_syntax_by_token(lang)
                    .or_else(|| syntax_set.find_syntax_by_extension(lang))
            })
            .unwrap_or_else(|| {
                if let Some(lang) = lang {
                    tracing::debug!("No syntax for language {:?}, using plain text", lang);
                }
                syntax_set.find_syntax_plain_text()
            });

        highlighted_html_for_string(code, syntax_set, syntax, self.toolchain.theme())
            .with_context(|| format!("Failed to highlight {} code", lang.unwrap_or("plain")))
    }
}

impl Stage for Highlight {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        ctx: &mut StageContext,
    ) -> anyhow::Result<Vec<Event<'a>>> {
        let mut out = Vec::with_capacity(events.len());
        // Language and source of the block being collected
        let mut block: Option<(Option<String>, String)> = None;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(kind)) if block.is_none() => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => {
                            info.split_whitespace().next().map(str::to_string)
                        }
                        CodeBlockKind::Indented => None,
                    };
                    block = Some((lang, String::new()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    let Some((lang, code)) = block.take() else { continue };
                    let mut binding = ComponentBinding::new(ComponentKind::CodeBlock);
                    if let Some(lang) = &lang {
                        binding = binding
                            .prop("language", lang.as_str())
                            .prop("className", format!("language-{}", lang));
                    }
                    binding.children = Some(self.highlight_code(&code, lang.as_deref())?);
                    let placeholder = ctx.bind(binding);
                    out.push(Event::Html(CowStr::from(format!("{}\n", placeholder))));
                }
                Event::Text(text) if block.is_some() => {
                    if let Some((_, code)) = block.as_mut() {
                        code.push_str(&text);
                    }
                }
                other => out.push(other),
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::components::placeholder;
    use crate::compiler::stages::test_support::render;

    fn stage() -> Highlight {
        Highlight::new(Arc::new(Toolchain::builtin()))
    }

    #[test]
    fn test_code_block_becomes_binding() {
        let (html, ctx) = render("```rust\nfn main() {}\n```\n", &[&stage()]);
        assert_eq!(html.trim(), placeholder(0));
        let binding = &ctx.components[0];
        assert_eq!(binding.kind, ComponentKind::CodeBlock);
        assert_eq!(binding.props["language"], "rust");
        assert_eq!(binding.props["className"], "language-rust");
        let children = binding.children.as_deref().unwrap();
        assert!(children.starts_with("<pre style="));
        assert!(children.contains("main"));
    }

    #[test]
    fn test_unknown_language_falls_back_to_plain_text() {
        let (_, ctx) = render("```nosuchlang\nplain <text>\n```\n", &[&stage()]);
        let children = ctx.components[0].children.as_deref().unwrap();
        assert!(children.contains("plain &lt;text&gt;"));
        assert_eq!(ctx.components[0].props["language"], "nosuchlang");
    }

    #[test]
    fn test_indented_block_has_no_language() {
        let (_, ctx) = render("    indented code\n", &[&stage()]);
        assert!(ctx.components[0].props.is_empty());
    }
}
