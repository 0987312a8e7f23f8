//! Page layouts a document may request

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A layout name outside the known set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown layout `{name}` (expected PostLayout, PostSimple or PageLayout)")]
pub struct UnknownLayout {
    pub name: String,
}

/// Layouts that can wrap a rendered document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    PostLayout,
    PostSimple,
    PageLayout,
}

impl Layout {
    pub const ALL: [Layout; 3] = [Layout::PostLayout, Layout::PostSimple, Layout::PageLayout];

    pub fn name(&self) -> &'static str {
        match self {
            Layout::PostLayout => "PostLayout",
            Layout::PostSimple => "PostSimple",
            Layout::PageLayout => "PageLayout",
        }
    }

    /// Template rendering this layout
    pub(crate) fn template(&self) -> &'static str {
        match self {
            Layout::PostLayout => "layouts/post_layout.html",
            Layout::PostSimple => "layouts/post_simple.html",
            Layout::PageLayout => "layouts/page_layout.html",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Layout {
    type Err = UnknownLayout;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layout::ALL
            .into_iter()
            .find(|layout| layout.name() == s)
            .ok_or_else(|| UnknownLayout {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_layouts() {
        for layout in Layout::ALL {
            assert_eq!(layout.name().parse::<Layout>().unwrap(), layout);
        }
    }

    #[test]
    fn test_unknown_layout_rejected() {
        let err = "postlayout".parse::<Layout>().unwrap_err();
        assert_eq!(err.name, "postlayout");
        assert!(err.to_string().contains("unknown layout `postlayout`"));
        assert!("../layouts/Evil".parse::<Layout>().is_err());
    }
}
