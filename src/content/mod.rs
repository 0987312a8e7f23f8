//! Content module - stored posts, metadata and the conversion pipeline

mod convert;
mod frontmatter;
mod post;
mod reading_time;
mod slug;
mod tags;

pub use convert::{post_metadata, ConvertedPost, Converter};
pub use frontmatter::{assemble_frontmatter, normalize_date, Frontmatter, Metadata};
pub(crate) use frontmatter::parse_date_string;
pub use post::{HierarchicalTags, PostId, StoredPost};
pub use reading_time::ReadingTime;
pub use slug::generate_slug;
pub use tags::flatten_tags;
