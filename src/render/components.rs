//! Rendering of component bindings

use indexmap::IndexMap;
use serde::Serialize;
use tera::Context;

use crate::compiler::{ComponentBinding, ComponentKind, TocEntry};

/// Props the original image component drops before rendering
const DROPPED_IMAGE_PROPS: [&str; 1] = ["fetchPriority"];

/// One line of an inline table of contents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(super) struct TocItem {
    pub value: String,
    pub url: String,
    /// Depth relative to `fromHeading`
    pub indent: u8,
}

fn numeric_prop(props: &IndexMap<String, String>, key: &str, default: u8) -> u8 {
    props
        .get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// `exclude` is a heading label or a list of labels
fn exclude_prop(props: &IndexMap<String, String>) -> Vec<String> {
    let Some(raw) = props.get("exclude") else {
        return Vec::new();
    };
    if let Ok(list) = serde_json::from_str::<Vec<String>>(raw) {
        return list;
    }
    vec![raw.trim().trim_matches(|c| c == '"' || c == '\'').to_string()]
}

/// Headings selected by `fromHeading`, `toHeading` and `exclude`
pub(super) fn select_toc(toc: &[TocEntry], props: &IndexMap<String, String>) -> Vec<TocItem> {
    let from = numeric_prop(props, "fromHeading", 1);
    let to = numeric_prop(props, "toHeading", 6);
    let exclude = exclude_prop(props);

    toc.iter()
        .filter(|entry| entry.depth >= from && entry.depth <= to)
        .filter(|entry| !exclude.iter().any(|e| e.eq_ignore_ascii_case(&entry.value)))
        .map(|entry| TocItem {
            value: entry.value.clone(),
            url: entry.url.clone(),
            indent: entry.depth - from,
        })
        .collect()
}

/// Template and context for a binding whose children are already rendered
pub(super) fn template_context(
    binding: &ComponentBinding,
    children: &str,
    toc: &[TocEntry],
) -> (String, Context) {
    let props = &binding.props;
    let mut ctx = Context::new();
    ctx.insert("children", children);

    let template = match &binding.kind {
        ComponentKind::Image => {
            let mut attributes = props.clone();
            attributes.retain(|name, _| !DROPPED_IMAGE_PROPS.contains(&name.as_str()));
            attributes.entry("alt".to_string()).or_default();
            ctx.insert("props", &attributes);
            "components/image.html"
        }
        ComponentKind::Link => {
            let href = props.get("href").map(String::as_str).unwrap_or("");
            ctx.insert("href", href);
            ctx.insert("title", &props.get("title"));
            ctx.insert("internal", &(href.starts_with('/') || href.starts_with('#')));
            "components/link.html"
        }
        ComponentKind::CodeBlock => {
            ctx.insert("language", &props.get("language"));
            "components/pre.html"
        }
        ComponentKind::TocInline => {
            ctx.insert("entries", &select_toc(toc, props));
            ctx.insert(
                "as_disclosure",
                &props.get("asDisclosure").map(|v| v == "true").unwrap_or(false),
            );
            "components/toc_inline.html"
        }
        ComponentKind::PageTitle => "components/page_title.html",
        ComponentKind::NewsletterForm => {
            let title = props
                .get("title")
                .map(String::as_str)
                .unwrap_or("Subscribe to the newsletter");
            ctx.insert("title", title);
            "components/newsletter_form.html"
        }
        ComponentKind::Custom(name) => {
            for (key, value) in props.iter().filter(|(key, _)| key.as_str() != "children") {
                ctx.insert(key.as_str(), value);
            }
            ctx.insert("props", props);
            return (custom_template_name(name), ctx);
        }
    };

    (template.to_string(), ctx)
}

/// Custom templates are registered without an extension so Tera does not
/// autoescape `children`
pub(super) fn custom_template_name(name: &str) -> String {
    format!("custom/{}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toc() -> Vec<TocEntry> {
        [(1, "Title"), (2, "Overview"), (2, "Usage"), (3, "Flags"), (4, "Deep")]
            .iter()
            .map(|(depth, value)| TocEntry {
                value: value.to_string(),
                url: format!("#{}", value.to_lowercase()),
                depth: *depth,
            })
            .collect()
    }

    fn props(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_select_all_by_default() {
        assert_eq!(select_toc(&toc(), &IndexMap::new()).len(), 5);
    }

    #[test]
    fn test_select_range() {
        let items = select_toc(&toc(), &props(&[("fromHeading", "2"), ("toHeading", "3")]));
        let values: Vec<_> = items.iter().map(|i| i.value.as_str()).collect();
        assert_eq!(values, vec!["Overview", "Usage", "Flags"]);
        assert_eq!(items[2].indent, 1);
    }

    #[test]
    fn test_exclude_single_and_list() {
        let items = select_toc(&toc(), &props(&[("exclude", "overview")]));
        assert!(items.iter().all(|i| i.value != "Overview"));

        let items = select_toc(&toc(), &props(&[("exclude", r#"["Usage", "Flags"]"#)]));
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_image_drops_fetch_priority() {
        let binding = ComponentBinding::new(ComponentKind::Image)
            .prop("src", "/a.png")
            .prop("fetchPriority", "high");
        let (template, ctx) = template_context(&binding, "", &[]);
        assert_eq!(template, "components/image.html");
        let value = ctx.into_json();
        assert!(value["props"].get("fetchPriority").is_none());
        assert_eq!(value["props"]["alt"], "");
    }

    #[test]
    fn test_link_internal_detection() {
        let internal = ComponentBinding::new(ComponentKind::Link).prop("href", "#intro");
        let (_, ctx) = template_context(&internal, "x", &[]);
        assert_eq!(ctx.into_json()["internal"], true);

        let external = ComponentBinding::new(ComponentKind::Link).prop("href", "https://a.example");
        let (_, ctx) = template_context(&external, "x", &[]);
        assert_eq!(ctx.into_json()["internal"], false);
    }
}
