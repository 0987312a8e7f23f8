//! Helper functions for page templates
//!
//! URL generation and date display shared by the renderer and the static
//! generator.

mod date;
mod url;

pub use date::*;
pub use url::*;
