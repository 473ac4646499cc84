//! # fenix-inject Catalog
//!
//! Everything between the configured sources and the finished manifest:
//! - fetching addon records from AMO (paginated), local files, or
//!   hand-built URL entries;
//! - assembling one ordered, de-duplicated manifest document;
//! - deciding whether a previously assembled manifest is still fresh.

mod assemble;
mod cache;
mod error;
mod model;
mod source;

pub use assemble::assemble;
pub use cache::is_expired;
pub use error::CatalogError;
pub use model::{
    ExtensionRecord, ManifestDocument, ManifestEntry, PackageFile, PackageVersion,
    FIXUP_SUMMARY_SENTINEL, UNKNOWN_PERMISSIONS_SENTINEL,
};
pub use source::{CatalogClient, FetchBudget, PAGE_SIZE};
