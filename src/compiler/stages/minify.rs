//! HTML minification of compiled markup

use anyhow::Context;

use crate::compiler::pipeline::OutputStage;

/// Minify compiled markup with `minify_html`
pub struct Minify;

impl Minify {
    fn cfg() -> minify_html::Cfg {
        let mut cfg = minify_html::Cfg::new();
        cfg.keep_closing_tags = true;
        cfg.keep_html_and_head_opening_tags = true;
        cfg.keep_comments = false;
        cfg.minify_css = true;
        cfg.minify_js = true;
        cfg.remove_bangs = true;
        cfg.remove_processing_instructions = true;
        cfg
    }
}

impl OutputStage for Minify {
    fn name(&self) -> &'static str {
        "minify"
    }

    fn finish(&self, html: String) -> anyhow::Result<String> {
        let minified = minify_html::minify(html.as_bytes(), &Self::cfg());
        String::from_utf8(minified).context("Minified markup is not valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_removed() {
        let html = "<div>\n  <p>Hello   world</p>\n</div>\n".to_string();
        let out = Minify.finish(html).unwrap();
        assert!(!out.contains('\n'));
        assert!(out.contains("Hello world"));
        assert!(out.contains("</p>"));
    }

    #[test]
    fn test_comments_dropped() {
        let out = Minify.finish("<p>a<!-- hidden --></p>".to_string()).unwrap();
        assert!(!out.contains("hidden"));
    }

    #[test]
    fn test_placeholders_survive() {
        let html = r#"<p><mdx-component data-id="3"></mdx-component></p>"#.to_string();
        let out = Minify.finish(html).unwrap();
        assert!(out.contains("mdx-component"));
        assert!(out.contains("3"));
    }
}
