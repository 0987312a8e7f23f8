//! Flattening of tiered post tags

use indexmap::IndexSet;

use super::HierarchicalTags;

/// Flatten hierarchical tags into a single list.
///
/// Tiers are read top, middle, sub; duplicates keep their first position.
pub fn flatten_tags(tags: Option<&HierarchicalTags>) -> Vec<String> {
    let Some(tags) = tags else {
        return Vec::new();
    };

    let unique: IndexSet<&String> = tags
        .top
        .iter()
        .chain(tags.middle.iter())
        .chain(tags.sub.iter())
        .collect();

    unique.into_iter().cloned().collect()
}
