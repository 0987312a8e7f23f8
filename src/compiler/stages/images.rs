//! Markdown images as `Image` components

use pulldown_cmark::{CowStr, Event, Tag, TagEnd};

use crate::compiler::components::{ComponentBinding, ComponentKind};
use crate::compiler::pipeline::{Stage, StageContext};

pub struct ImageComponents;

impl Stage for ImageComponents {
    fn name(&self) -> &'static str {
        "image-components"
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        ctx: &mut StageContext,
    ) -> anyhow::Result<Vec<Event<'a>>> {
        let mut out = Vec::with_capacity(events.len());
        // Image being collected: binding and alt text so far
        let mut current: Option<(ComponentBinding, String)> = None;

        for event in events {
            match event {
                Event::Start(Tag::Image { dest_url, title, .. }) if current.is_none() => {
                    let mut binding =
                        ComponentBinding::new(ComponentKind::Image).prop("src", dest_url.as_ref());
                    if !title.is_empty() {
                        binding = binding.prop("title", title.as_ref());
                    }
                    current = Some((binding, String::new()));
                }
                Event::End(TagEnd::Image) => {
                    if let Some((binding, alt)) = current.take() {
                        let placeholder = ctx.bind(binding.prop("alt", alt));
                        out.push(Event::InlineHtml(CowStr::from(placeholder)));
                    }
                }
                Event::Text(text) | Event::Code(text) if current.is_some() => {
                    if let Some((_, alt)) = current.as_mut() {
                        alt.push_str(&text);
                    }
                }
                _ if current.is_some() => {}
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

    #[test]
    fn test_image_binding() {
        let (html, ctx) = render("![A *cat*](/cat.png \"Cat\")\n", &[&ImageComponents]);
        assert_eq!(html, format!("<p>{}</p>\n", placeholder(0)));
        let binding = &ctx.components[0];
        assert_eq!(binding.kind, ComponentKind::Image);
        assert_eq!(binding.props["src"], "/cat.png");
        assert_eq!(binding.props["alt"], "A cat");
        assert_eq!(binding.props["title"], "Cat");
    }

    #[test]
    fn test_image_without_title() {
        let (_, ctx) = render("![](a.png) and ![b](b.png)\n", &[&ImageComponents]);
        assert_eq!(ctx.components.len(), 2);
        assert!(!ctx.components[0].props.contains_key("title"));
        assert_eq!(ctx.components[0].props["alt"], "");
        assert_eq!(ctx.components[1].props["src"], "b.png");
    }
}
