//! Code block titles written as ```` ```lang:title ````

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Tag};

use crate::compiler::html_escape;
use crate::compiler::pipeline::{Stage, StageContext};

/// Split `lang:title` fence info and emit the title above the block
pub struct CodeTitles;

/// Language and title of a fence info string
fn split_info(info: &str) -> (&str, Option<&str>) {
    let token = info.split_whitespace().next().unwrap_or("");
    match token.split_once(':') {
        Some((lang, title)) if !title.is_empty() => (lang, Some(title)),
        _ => (info, None),
    }
}

impl Stage for CodeTitles {
    fn name(&self) -> &'static str {
        "code-titles"
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        _ctx: &mut StageContext,
    ) -> anyhow::Result<Vec<Event<'a>>> {
        let mut out = Vec::with_capacity(events.len());

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                    let (lang, title) = split_info(&info);
                    let Some(title) = title else {
                        out.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))));
                        continue;
                    };
                    out.push(Event::Html(CowStr::from(format!(
                        "<div class=\"code-title\">{}</div>\n",
                        html_escape(title)
                    ))));
                    out.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(
                        CowStr::from(lang.to_string()),
                    ))));
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
    use crate::compiler::stages::test_support::render;

    #[test]
    fn test_split_info() {
        assert_eq!(split_info("rust:src/main.rs"), ("rust", Some("src/main.rs")));
        assert_eq!(split_info("rust"), ("rust", None));
        assert_eq!(split_info("rust:"), ("rust:", None));
        assert_eq!(split_info(""), ("", None));
    }

    #[test]
    fn test_title_emitted_before_block() {
        let (html, _) = render("```js:app.js\nlet a = 1;\n```\n", &[&CodeTitles]);
        assert!(html.starts_with("<div class=\"code-title\">app.js</div>"));
        assert!(html.contains(r#"<code class="language-js">"#));
    }

    #[test]
    fn test_title_is_escaped() {
        let (html, _) = render("```html:<b>.html\nx\n```\n", &[&CodeTitles]);
        assert!(html.contains("&lt;b&gt;.html"));
    }
}
