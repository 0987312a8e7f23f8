//! The ordered stage pipeline applied by the compiler

use pulldown_cmark::{Event, Options};
use std::sync::Arc;

use super::components::{placeholder, ComponentBinding};
use super::stages::{
    AutolinkHeadings, CodeTitles, Footnotes, GfmExtensions, HeadingIds, Highlight, ImageComponents,
    MathRender, MathSyntax, Minify, TocEntry, TocExtraction,
};
use super::toolchain::Toolchain;
use crate::error::ConversionFailure;

/// Side channels filled while a single document is compiled
#[derive(Debug, Default)]
pub struct StageContext {
    pub toc: Vec<TocEntry>,
    pub components: Vec<ComponentBinding>,
}

impl StageContext {
    /// Register a component and get the markup that stands in for it
    pub fn bind(&mut self, binding: ComponentBinding) -> String {
        self.components.push(binding);
        placeholder(self.components.len() - 1)
    }
}

/// A transform over the parsed document tree
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Parser extensions this stage relies on
    fn parser_options(&self) -> Options {
        Options::empty()
    }

    fn transform<'a>(
        &self,
        events: Vec<Event<'a>>,
        ctx: &mut StageContext,
    ) -> anyhow::Result<Vec<Event<'a>>>;
}

/// A transform over emitted markup
pub trait OutputStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn finish(&self, html: String) -> anyhow::Result<String>;
}

/// Fixed, ordered list of stages
pub struct Pipeline {
    tree: Vec<Box<dyn Stage>>,
    output: Vec<Box<dyn OutputStage>>,
}

impl Pipeline {
    /// The standard document pipeline. Order matters: each stage sees the
    /// tree as left by the previous ones.
    pub fn standard(toolchain: Arc<Toolchain>) -> Self {
        let minify = toolchain.minify();
        let tree: Vec<Box<dyn Stage>> = vec![
            Box::new(TocExtraction),
            Box::new(GfmExtensions),
            Box::new(CodeTitles),
            Box::new(Footnotes),
            Box::new(MathSyntax),
            Box::new(ImageComponents),
            Box::new(HeadingIds),
            Box::new(AutolinkHeadings),
            Box::new(MathRender),
            Box::new(Highlight::new(toolchain)),
        ];
        let output: Vec<Box<dyn OutputStage>> = if minify {
            vec![Box::new(Minify)]
        } else {
            Vec::new()
        };

        Self { tree, output }
    }

    /// Union of the parser extensions of every stage
    pub fn parser_options(&self) -> Options {
        self.tree
            .iter()
            .fold(Options::empty(), |options, stage| options | stage.parser_options())
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.tree
            .iter()
            .map(|s| s.name())
            .chain(self.output.iter().map(|s| s.name()))
            .collect()
    }

    pub fn run_tree<'a>(
        &self,
        events: Vec<Event<'a>>,
        ctx: &mut StageContext,
    ) -> Result<Vec<Event<'a>>, ConversionFailure> {
        self.tree.iter().try_fold(events, |events, stage| {
            tracing::trace!("Running stage {}", stage.name());
            stage
                .transform(events, ctx)
                .map_err(|e| ConversionFailure::new(stage.name(), format!("{:#}", e)))
        })
    }

    pub fn run_output(&self, html: String) -> Result<String, ConversionFailure> {
        self.output.iter().try_fold(html, |html, stage| {
            stage
                .finish(html)
                .map_err(|e| ConversionFailure::new(stage.name(), format!("{:#}", e)))
        })
    }
}
