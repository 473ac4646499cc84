//! Catalog errors.

use thiserror::Error;

use fenix_inject_config::ConfigError;

/// Errors from fetching, assembling, or gating the manifest.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The shared page-fetch budget ran out mid-pagination.
    #[error("Fetch budget exceeded after {limit} page requests")]
    FetchBudgetExceeded { limit: i64 },

    /// A catalog request failed at the HTTP layer.
    #[error("Network error: {0}")]
    Network(String),

    /// A catalog page or local record file did not decode.
    #[error("Parse error: {0}")]
    Parse(String),

    /// `sort_combined_list` names a field the assembler does not know.
    #[error("Unknown sort field: {0}")]
    UnknownSortField(String),

    /// A `move_to_top` guid matched no assembled record.
    #[error("No record matches pinned identifier: {0}")]
    MissingPinnedIdentifier(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source resolution failures (unknown name, unknown type, ...).
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        CatalogError::Network(e.to_string())
    }
}
