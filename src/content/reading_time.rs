//! Reading time estimation

use serde::{Deserialize, Serialize};

/// Average reading speed used for the estimate
const WORDS_PER_MINUTE: f64 = 200.0;

/// Estimated reading time of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingTime {
    /// Human readable estimate, e.g. "3 min read"
    pub text: String,
    /// Exact minutes, unrounded
    pub minutes: f64,
    /// Milliseconds
    pub time: u64,
    pub words: usize,
}

impl ReadingTime {
    /// Estimate the reading time of compiled markup.
    ///
    /// Tags are stripped before counting so only rendered text contributes.
    pub fn of_markup(html: &str) -> Self {
        Self::from_words(count_words(&strip_html(html)))
    }

    pub fn from_words(words: usize) -> Self {
        let minutes = words as f64 / WORDS_PER_MINUTE;
        let time = (minutes * 60.0 * 1000.0).round() as u64;
        // Round to two decimals first so 1.001 minutes still reads "1 min"
        let displayed = ((minutes * 100.0).round() / 100.0).ceil() as u64;

        Self {
            text: format!("{} min read", displayed),
            minutes,
            time,
            words,
        }
    }
}

/// Ideographic and kana characters are read one per word
fn is_cjk_ideograph(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{309F}'   // Hiragana
        | '\u{30A0}'..='\u{30FF}' // Katakana
        | '\u{3400}'..='\u{4DBF}' // CJK extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        | '\u{F900}'..='\u{FAFF}' // CJK compatibility ideographs
    )
}

/// Count words; alphanumeric runs count once (Latin, Hangul, digits),
/// ideographs count individually
fn count_words(text: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;

    for c in text.chars() {
        if is_cjk_ideograph(c) {
            count += 1;
            in_word = false;
        } else if c.is_alphanumeric() || (in_word && (c == '\'' || c == '_')) {
            if !in_word {
                in_word = true;
                count += 1;
            }
        } else {
            in_word = false;
        }
    }

    count
}

/// Strip HTML tags from content
fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                // Tags separate words
                result.push(' ');
            }
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document() {
        let rt = ReadingTime::of_markup("");
        assert_eq!(rt.words, 0);
        assert_eq!(rt.text, "0 min read");
        assert_eq!(rt.time, 0);
    }

    #[test]
    fn test_counts_text_not_tags() {
        let rt = ReadingTime::of_markup(r#"<p class="lead">Hello <em>brave</em> new world</p>"#);
        assert_eq!(rt.words, 4);
        assert_eq!(rt.text, "1 min read");
    }

    #[test]
    fn test_adjacent_tags_split_words() {
        assert_eq!(ReadingTime::of_markup("<td>a</td><td>b</td>").words, 2);
    }

    #[test]
    fn test_hangul_and_ideographs() {
        assert_eq!(count_words("러스트 소유권 규칙"), 3);
        assert_eq!(count_words("中文字"), 3);
        assert_eq!(count_words("it's rust_lang 2024"), 3);
    }

    #[test]
    fn test_minutes_and_rounding() {
        let rt = ReadingTime::from_words(400);
        assert_eq!(rt.minutes, 2.0);
        assert_eq!(rt.time, 120_000);
        assert_eq!(rt.text, "2 min read");

        let rt = ReadingTime::from_words(250);
        assert_eq!(rt.text, "2 min read");
    }

    #[test]
    fn test_serializes_flat_fields() {
        let value = serde_json::to_value(ReadingTime::from_words(200)).unwrap();
        assert_eq!(value["text"], "1 min read");
        assert_eq!(value["words"], 200);
        assert_eq!(value["time"], 60000);
    }
}
