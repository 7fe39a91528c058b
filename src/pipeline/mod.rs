//! Bundling pipeline.
//!
//! Turns an analyzed [`Document`] into one self-contained page by walking a
//! fixed sequence of stages. Each stage mutates the document through its
//! resync entry point and drains the dependency list it consumes.
//!
//! # Stages
//!
//! ```text
//! Shake -> MinifyHtml -> InlineImages -> MergeCss -> MergeJs -> FinalMinify
//! ```
//!
//! Any stage error aborts the run; there is no partial output.

mod css;
mod html;
mod image;
mod js;
mod shake;


use std::fmt;

use crate::document::Document;
use crate::error::Result;

pub use css::merge_css;
pub use html::minify_html;
pub use image::inline_images;
pub use js::merge_js;
pub use shake::shake;

/// Knobs shared by every stage.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Run the HTML/CSS/JS minifiers. Structural stages run either way.
    pub minify: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { minify: true }
    }
}

/// One step of the bundling state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Shake,
    MinifyHtml,
    InlineImages,
    MergeCss,
    MergeJs,
    FinalMinify,
}

impl Stage {
    pub const ALL: [Self; 6] = [
        Self::Shake,
        Self::MinifyHtml,
        Self::InlineImages,
        Self::MergeCss,
        Self::MergeJs,
        Self::FinalMinify,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Shake => "shake",
            Self::MinifyHtml => "minify-html",
            Self::InlineImages => "inline-images",
            Self::MergeCss => "merge-css",
            Self::MergeJs => "merge-js",
            Self::FinalMinify => "final-minify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs every stage in order against one document.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub const fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn run(&self, doc: &mut Document) -> Result<()> {
        for stage in Stage::ALL {
            crate::debug!("pipeline"; "{}", stage);
            self.apply(stage, doc)?;
        }
        Ok(())
    }

    /// Run a single stage.
    pub fn apply(&self, stage: Stage, doc: &mut Document) -> Result<()> {
        match stage {
            Stage::Shake => shake(doc),
            Stage::MinifyHtml | Stage::FinalMinify => minify_html(doc, &self.options),
            Stage::InlineImages => inline_images(doc)?,
            Stage::MergeCss => merge_css(doc, &self.options)?,
            Stage::MergeJs => merge_js(doc, &self.options)?,
        }
        Ok(())
    }
}
