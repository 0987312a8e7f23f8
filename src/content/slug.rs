//! URL slugs derived from post titles

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Everything outside Hangul syllables, lower-case ASCII letters/digits,
    /// whitespace and hyphens
    static ref DISALLOWED: Regex = Regex::new(r"[^가-힣a-z0-9\s-]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref HYPHENS: Regex = Regex::new(r"-+").unwrap();
}

/// Generate a slug from a post title.
///
/// Hyphens never lead or trail the result. The result depends on the title
/// alone and is not unique across posts.
/// An empty result means the title has no sluggable characters and must be
/// treated as an invalid slug by callers.
///
/// # Examples
/// ```
/// use quill_rs::content::generate_slug;
/// assert_eq!(generate_slug("Hello, World! 123"), "hello-world-123");
/// ```
pub fn generate_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let kept = DISALLOWED.replace_all(&lowered, "");
    let hyphenated = WHITESPACE.replace_all(&kept, "-");
    HYPHENS
        .replace_all(&hyphenated, "-")
        .trim_matches('-')
        .to_string()
}
