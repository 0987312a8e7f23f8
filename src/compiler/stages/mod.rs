//! Stages of the standard pipeline, in pipeline order

mod code_title;
mod footnotes;
mod gfm;
mod headings;
mod highlight;
mod images;
mod math;
mod minify;
mod toc;

pub use code_title::CodeTitles;
pub use footnotes::Footnotes;
pub use gfm::GfmExtensions;
pub use headings::{AutolinkHeadings, HeadingIds, Slugger};
pub use highlight::Highlight;
pub use images::ImageComponents;
pub use math::{MathRender, MathSyntax};
pub use minify::Minify;
pub use toc::{TocEntry, TocExtraction};

#[cfg(test)]
pub(crate) mod test_support {
    use pulldown_cmark::{html, Event, Options, Parser, TextMergeStream};

    use crate::compiler::pipeline::{Stage, StageContext};

    /// Parse `markdown`, run `stages` in order and emit HTML
    pub fn render(markdown: &str, stages: &[&dyn Stage]) -> (String, StageContext) {
        let options = stages
            .iter()
            .fold(Options::empty(), |o, s| o | s.parser_options());
        let mut ctx = StageContext::default();
        let mut events: Vec<Event> = TextMergeStream::new(Parser::new_ext(markdown, options)).collect();
        for stage in stages {
            events = stage.transform(events, &mut ctx).unwrap();
        }
        let mut out = String::new();
        html::push_html(&mut out, events.into_iter());
        (out, ctx)
    }
}
