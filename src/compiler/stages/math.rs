//! Math syntax and KaTeX rendering

use anyhow::{anyhow, Result};
use katex::{OptsBuilder, OutputType};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Tag, TagEnd};

use crate::compiler::pipeline::{Stage, StageContext};

/// `$inline$`, `$$display$$` and ```` ```math ```` fences
pub struct MathSyntax;

impl Stage for MathSyntax {
    fn name(&self) -> &'static str {
        "math-syntax"
    }

    fn parser_options(&self) -> Options {
        Options::ENABLE_MATH
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        _ctx: &mut StageContext,
    ) -> anyhow::Result<Vec<Event<'a>>> {
        let mut out = Vec::with_capacity(events.len());
        let mut fence: Option<String> = None;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info)))
                    if info.split_whitespace().next() == Some("math") =>
                {
                    fence = Some(String::new());
                }
                Event::End(TagEnd::CodeBlock) if fence.is_some() => {
                    if let Some(source) = fence.take() {
                        out.push(Event::DisplayMath(CowStr::from(source.trim_end().to_string())));
                    }
                }
                Event::Text(text) if fence.is_some() => {
                    if let Some(source) = fence.as_mut() {
                        source.push_str(&text);
                    }
                }
                other => out.push(other),
            }
        }

        Ok(out)
    }
}

fn render_math(source: &str, display_mode: bool) -> Result<String> {
    let mut builder = OptsBuilder::default();
    builder.display_mode(display_mode);
    builder.output_type(OutputType::Html);
    let opts = builder
        .build()
        .map_err(|e| anyhow!("failed to build KaTeX options: {}", e))?;

    katex::render_with_opts(source, &opts).map_err(|e| anyhow!("KaTeX rendering failed for `{}`: {}", source, e))
}

/// Render math nodes to KaTeX markup; invalid expressions fail the conversion
pub struct MathRender;

impl Stage for MathRender {
    fn name(&self) -> &'static str {
        "math-render"
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        _ctx: &mut StageContext,
    ) -> anyhow::Result<Vec<Event<'a>>> {
        events
            .into_iter()
            .map(|event| match event {
                Event::InlineMath(source) => {
                    Ok(Event::InlineHtml(CowStr::from(render_math(&source, false)?)))
                }
                Event::DisplayMath(source) => {
                    Ok(Event::InlineHtml(CowStr::from(render_math(&source, true)?)))
                }
                other => Ok(other),
            })
            .collect()
    }
}
