//! Convert a local Markdown file

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::content::{ConvertedPost, Metadata};
use crate::Blog;

/// Convert `file` (Markdown with optional YAML front-matter)
pub fn convert_file(blog: &Blog, file: &Path) -> Result<ConvertedPost> {
    let content =
        fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;
    let (metadata, body) = Metadata::parse_document(&content)?;
    let converted = blog
        .converter
        .convert_raw(body, metadata)
        .with_context(|| format!("Failed to convert {:?}", file))?;
    Ok(converted)
}

/// Convert `file` and print the result as JSON
pub fn run(blog: &Blog, file: &Path) -> Result<()> {
    let converted = convert_file(blog, file)?;
    println!("{}", serde_json::to_string_pretty(&converted)?);
    Ok(())
}
