//! Tabular data sources
//!
//! Posts live in a table owned by an external backend. A [`DataSource`]
//! answers simple select queries: one optional ordering, any number of
//! filters and an optional limit.

mod files;
mod postgrest;

pub use files::FileSource;
pub use postgrest::PostgrestSource;

use serde::de::DeserializeOwned;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{BackendConfig, BackendKind};
use crate::error::QueryFailure;

/// One row, column name to value, in backend order
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Comparison applied by a [`Filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// SQL `LIKE` with `%` and `_` wildcards
    Like,
    /// Case-insensitive `LIKE`
    Ilike,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Like => "like",
            FilterOp::Ilike => "ilike",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(FilterOp::Eq),
            "neq" => Ok(FilterOp::Neq),
            "gt" => Ok(FilterOp::Gt),
            "gte" => Ok(FilterOp::Gte),
            "lt" => Ok(FilterOp::Lt),
            "lte" => Ok(FilterOp::Lte),
            "like" => Ok(FilterOp::Like),
            "ilike" => Ok(FilterOp::Ilike),
            other => Err(format!("unknown filter operator: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// A select over one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub order_by: Option<OrderBy>,
    pub filters: Vec<Filter>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order_by = Some(OrderBy {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn filter(mut self, column: &str, op: FilterOp, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A backend answering queries over named tables
pub trait DataSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>, QueryFailure>;
}

/// Decode raw rows into typed records, skipping and logging rows that do not
/// decode so one bad row never hides the rest of the table
pub fn decode_records<T: DeserializeOwned>(records: Vec<Record>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.get("id").cloned().unwrap_or_default();
            match serde_json::from_value(serde_json::Value::Object(record)) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    tracing::warn!("Skipping malformed record {}: {}", id, e);
                    None
                }
            }
        })
        .collect()
}

/// Open the data source described by the configuration.
///
/// Relative paths are resolved against `base_dir`.
pub fn open(config: &BackendConfig, base_dir: &Path) -> anyhow::Result<Arc<dyn DataSource>> {
    match config.kind {
        BackendKind::Postgrest => {
            let source = PostgrestSource::from_config(config)?;
            tracing::info!("Using PostgREST backend at {}", source.base_url());
            Ok(Arc::new(source))
        }
        BackendKind::Files => {
            let root = base_dir.join(&config.data_dir);
            tracing::info!("Using file backend in {:?}", root);
            Ok(Arc::new(FileSource::new(root)))
        }
    }
}
