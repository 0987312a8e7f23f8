//! Content compiler
//!
//! Turns Markdown/MDX text into a [`CompiledDocument`]: markup with component
//! placeholders plus the bindings that fill them, and the table of contents
//! collected on the way.

pub mod components;
pub mod pipeline;
pub mod stages;
pub mod toolchain;

use pulldown_cmark::{html, Event, Parser, TextMergeStream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use components::{ComponentBinding, ComponentKind, ComponentRegistry};
pub use pipeline::{OutputStage, Pipeline, Stage, StageContext};
pub use stages::TocEntry;
pub use toolchain::Toolchain;

use crate::error::ConversionFailure;

/// Renderable form of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledDocument {
    /// Markup with `<mdx-component>` placeholders
    pub code: String,
    /// Bindings indexed by placeholder id
    pub components: Vec<ComponentBinding>,
}

/// Result of one compile
#[derive(Debug, Clone)]
pub struct Compiled {
    pub document: CompiledDocument,
    pub toc: Vec<TocEntry>,
}

/// Compiles documents through a fixed pipeline
pub struct Compiler {
    toolchain: Arc<Toolchain>,
    pipeline: Pipeline,
}

impl Compiler {
    /// Compiler running the standard pipeline
    pub fn new(toolchain: Arc<Toolchain>) -> Self {
        let pipeline = Pipeline::standard(Arc::clone(&toolchain));
        Self::with_pipeline(toolchain, pipeline)
    }

    pub fn with_pipeline(toolchain: Arc<Toolchain>, pipeline: Pipeline) -> Self {
        tracing::debug!("Pipeline stages: {}", pipeline.stage_names().join(", "));
        Self {
            toolchain,
            pipeline,
        }
    }

    /// Compile `content`. Any failure aborts the whole document.
    pub fn compile(&self, content: &str) -> Result<Compiled, ConversionFailure> {
        let parser = Parser::new_ext(content, self.pipeline.parser_options());
        let events: Vec<Event> = TextMergeStream::new(parser).collect();

        let mut ctx = StageContext::default();
        let events = self.pipeline.run_tree(events, &mut ctx)?;
        let events = components::bundle(events, self.toolchain.components(), &mut ctx)
            .map_err(|e| ConversionFailure::new("bundle", format!("{:#}", e)))?;

        let mut markup = String::with_capacity(content.len() * 3 / 2);
        html::push_html(&mut markup, events.into_iter());
        let code = self.pipeline.run_output(markup)?;

        let StageContext { toc, components } = ctx;
        let components = components
            .into_iter()
            .map(|mut binding| {
                if let Some(children) = binding.children.take() {
                    binding.children = Some(self.pipeline.run_output(children)?);
                }
                Ok(binding)
            })
            .collect::<Result<Vec<_>, ConversionFailure>>()?;

        tracing::debug!(
            "Compiled document: {} bytes, {} components, {} headings",
            code.len(),
            components.len(),
            toc.len()
        );

        Ok(Compiled {
            document: CompiledDocument { code, components },
            toc,
        })
    }
}

/// Simple HTML escaping
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
