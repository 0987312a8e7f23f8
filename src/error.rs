//! Error taxonomy shared by the conversion pipeline and its collaborators

use thiserror::Error;

use crate::render::RenderError;

/// A failure anywhere inside the content compiler.
///
/// Every stage error, unresolved component or toolchain problem is folded into
/// this single type, keeping the stage name and the original message.
#[derive(Debug, Clone, Error)]
#[error("[{stage}] {message}")]
pub struct ConversionFailure {
    pub stage: &'static str,
    pub message: String,
}

impl ConversionFailure {
    pub fn new(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// A `date` metadata value that could not be read as a timestamp.
#[derive(Debug, Clone, Error)]
#[error("invalid date value `{value}`")]
pub struct DateParseFailure {
    pub value: String,
}

/// The tabular backend could not answer a query.
#[derive(Debug, Error)]
pub enum QueryFailure {
    /// Transport failure (DNS, TLS, timeout...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    /// The backend answered with an error status
    #[error("backend returned {status}: {body}")]
    Response { status: u16, body: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown table `{0}`")]
    UnknownTable(String),

    /// A row did not have the shape of the requested record type
    #[error("malformed record: {0}")]
    Record(String),
}

/// Umbrella error surfaced to the HTTP and page boundaries.
#[derive(Debug, Error)]
pub enum Error {
    #[error("query failed: {0}")]
    Query(#[from] QueryFailure),

    #[error("MDX conversion failed: {0}")]
    Conversion(#[from] ConversionFailure),

    #[error("MDX conversion failed: {0}")]
    Date(#[from] DateParseFailure),

    #[error("post not found")]
    NotFound,

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    /// A conversion task was cancelled or exceeded its deadline
    #[error("conversion task aborted: {0}")]
    Aborted(String),
}

impl Error {
    /// Whether the error came out of the conversion pipeline itself
    pub fn is_conversion(&self) -> bool {
        matches!(self, Error::Conversion(_) | Error::Date(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
