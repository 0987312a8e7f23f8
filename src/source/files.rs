//! File-backed data source
//!
//! A table is `<root>/<table>.json`, `<root>/<table>.yaml` (an array of
//! records) or a `<root>/<table>/` directory whose files each hold one
//! record or an array of records.

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{DataSource, Filter, FilterOp, Query, Record};
use crate::error::QueryFailure;

pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn is_data_file(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e, "json" | "yaml" | "yml"))
            .unwrap_or(false)
    }

    /// Parse one file into rows
    fn read_file(path: &Path) -> Result<Vec<Record>, QueryFailure> {
        let content = fs::read_to_string(path)?;
        let value: Value = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };

        let rows = match value {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };

        rows.into_iter()
            .map(|row| match row {
                Value::Object(record) => Ok(record),
                other => Err(QueryFailure::Record(format!(
                    "{:?}: expected an object, got {}",
                    path, other
                ))),
            })
            .collect()
    }

    fn load_table(&self, table: &str) -> Result<Vec<Record>, QueryFailure> {
        for ext in ["json", "yaml", "yml"] {
            let path = self.root.join(format!("{}.{}", table, ext));
            if path.is_file() {
                tracing::debug!("Reading table {} from {:?}", table, path);
                return Self::read_file(&path);
            }
        }

        let dir = self.root.join(table);
        if !dir.is_dir() {
            return Err(QueryFailure::UnknownTable(table.to_string()));
        }

        let mut records = Vec::new();
        for entry in WalkDir::new(&dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && Self::is_data_file(e.path()))
        {
            records.extend(Self::read_file(entry.path())?);
        }
        tracing::debug!("Read {} records for table {} from {:?}", records.len(), table, dir);
        Ok(records)
    }
}

impl DataSource for FileSource {
    fn name(&self) -> &'static str {
        "files"
    }

    fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>, QueryFailure> {
        let records = self.load_table(table)?;
        apply(records, query)
    }
}

/// Evaluate a query over rows held in memory
fn apply(records: Vec<Record>, query: &Query) -> Result<Vec<Record>, QueryFailure> {
    let matchers = query
        .filters
        .iter()
        .map(Matcher::new)
        .collect::<Result<Vec<_>, _>>()?;

    let mut records: Vec<Record> = records
        .into_iter()
        .filter(|record| matchers.iter().all(|m| m.matches(record)))
        .collect();

    if let Some(order) = &query.order_by {
        records.sort_by(|a, b| {
            let ordering = compare_nullable(a.get(&order.column), b.get(&order.column));
            if order.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
    }

    if let Some(limit) = query.limit {
        records.truncate(limit);
    }

    Ok(records)
}

/// Nulls sort after every value (so they come first when descending)
fn compare_nullable(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => value_text(a).cmp(&value_text(b)),
    }
}

/// Text form of a column value, as a query string would carry it
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

struct Matcher<'q> {
    filter: &'q Filter,
    pattern: Option<Regex>,
}

impl<'q> Matcher<'q> {
    fn new(filter: &'q Filter) -> Result<Self, QueryFailure> {
        let pattern = match filter.op {
            FilterOp::Like | FilterOp::Ilike => Some(like_pattern(
                &filter.value,
                filter.op == FilterOp::Ilike,
            )?),
            _ => None,
        };
        Ok(Self { filter, pattern })
    }

    fn matches(&self, record: &Record) -> bool {
        let value = record.get(&self.filter.column).unwrap_or(&Value::Null);

        // Null never satisfies a comparison
        if value.is_null() {
            return false;
        }
        if let Some(pattern) = &self.pattern {
            return pattern.is_match(&value_text(value));
        }

        let ordering = match value.as_f64().zip(self.filter.value.parse::<f64>().ok()) {
            Some((x, y)) => x.partial_cmp(&y),
            None => Some(value_text(value).cmp(&self.filter.value)),
        };

        match (self.filter.op, ordering) {
            (FilterOp::Eq, Some(o)) => o == Ordering::Equal,
            (FilterOp::Neq, Some(o)) => o != Ordering::Equal,
            (FilterOp::Gt, Some(o)) => o == Ordering::Greater,
            (FilterOp::Gte, Some(o)) => o != Ordering::Less,
            (FilterOp::Lt, Some(o)) => o == Ordering::Less,
            (FilterOp::Lte, Some(o)) => o != Ordering::Greater,
            _ => false,
        }
    }
}

/// Translate a SQL LIKE pattern into an anchored regex
fn like_pattern(pattern: &str, case_insensitive: bool) -> Result<Regex, QueryFailure> {
    let mut source = String::from(if case_insensitive { "(?is)^" } else { "(?s)^" });
    let mut literal = String::new();

    for c in pattern.chars() {
        match c {
            '%' | '_' => {
                source.push_str(&regex::escape(&literal));
                literal.clear();
                source.push_str(if c == '%' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    source.push_str(&regex::escape(&literal));
    source.push('$');

    Regex::new(&source).map_err(|e| QueryFailure::Record(format!("bad pattern {:?}: {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source_with_posts() -> (tempfile::TempDir, FileSource) {
        let dir = tempfile::tempdir().unwrap();
        let posts = json!([
            {"id": 1, "title": "Rust Ownership", "created_at": "2024-01-01T00:00:00Z", "platform": "velog"},
            {"id": 2, "title": "Async rust", "created_at": "2024-03-01T00:00:00Z", "platform": null},
            {"id": 3, "title": "Go channels", "created_at": null, "platform": "tistory"},
            {"id": 10, "title": "Later", "created_at": "2024-02-01T00:00:00Z"}
        ]);
        fs::write(dir.path().join("posts.json"), posts.to_string()).unwrap();
        let source = FileSource::new(dir.path());
        (dir, source)
    }

    fn ids(records: &[Record]) -> Vec<i64> {
        records.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_order_desc_puts_nulls_first() {
        let (_dir, source) = source_with_posts();
        let records = source
            .query("posts", &Query::new().order_by("created_at", false))
            .unwrap();
        assert_eq!(ids(&records), vec![3, 2, 10, 1]);
    }

    #[test]
    fn test_order_asc_puts_nulls_last_and_limit() {
        let (_dir, source) = source_with_posts();
        let records = source
            .query("posts", &Query::new().order_by("created_at", true).limit(2))
            .unwrap();
        assert_eq!(ids(&records), vec![1, 10]);
    }

    #[test]
    fn test_numeric_comparison() {
        let (_dir, source) = source_with_posts();
        let records = source
            .query("posts", &Query::new().filter("id", FilterOp::Gt, "2").order_by("id", true))
            .unwrap();
        assert_eq!(ids(&records), vec![3, 10]);

        let records = source
            .query("posts", &Query::new().filter("id", FilterOp::Eq, "10"))
            .unwrap();
        assert_eq!(ids(&records), vec![10]);
    }

    #[test]
    fn test_like_and_ilike() {
        let (_dir, source) = source_with_posts();
        let like = source
            .query("posts", &Query::new().filter("title", FilterOp::Like, "%rust%"))
            .unwrap();
        assert_eq!(ids(&like), vec![2]);

        let ilike = source
            .query("posts", &Query::new().filter("title", FilterOp::Ilike, "%RUST%"))
            .unwrap();
        assert_eq!(ids(&ilike), vec![1, 2]);
    }

    #[test]
    fn test_neq_and_null_columns() {
        let (_dir, source) = source_with_posts();
        let records = source
            .query("posts", &Query::new().filter("platform", FilterOp::Neq, "velog"))
            .unwrap();
        assert_eq!(ids(&records), vec![3]);

        let records = source
            .query("posts", &Query::new().filter("created_at", FilterOp::Lt, "2024-02-15"))
            .unwrap();
        assert_eq!(ids(&records), vec![1, 10]);
    }

    #[test]
    fn test_directory_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("posts");
        fs::create_dir_all(&table).unwrap();
        fs::write(table.join("a.yaml"), "id: 1\ntitle: One\n").unwrap();
        fs::write(table.join("b.json"), r#"[{"id": 2, "title": "Two"}]"#).unwrap();
        fs::write(table.join("notes.txt"), "ignored").unwrap();

        let records = FileSource::new(dir.path()).query("posts", &Query::new()).unwrap();
        assert_eq!(ids(&records), vec![1, 2]);
    }

    #[test]
    fn test_unknown_table() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSource::new(dir.path()).query("missing", &Query::new()).unwrap_err();
        assert!(matches!(err, QueryFailure::UnknownTable(name) if name == "missing"));
    }

    #[test]
    fn test_non_object_rows_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("posts.json"), "[1, 2]").unwrap();
        let err = FileSource::new(dir.path()).query("posts", &Query::new()).unwrap_err();
        assert!(matches!(err, QueryFailure::Record(_)));
    }

    #[test]
    fn test_like_pattern_escapes_regex() {
        let pattern = like_pattern("a.b%", false).unwrap();
        assert!(pattern.is_match("a.bcd"));
        assert!(!pattern.is_match("axbcd"));
        assert!(like_pattern("h_llo", false).unwrap().is_match("hello"));
    }
}
