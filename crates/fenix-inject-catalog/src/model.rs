//! Collection manifest data model.
//!
//! The record shape mirrors what AMO serves: only fields the pipeline
//! touches are typed, everything else rides along untouched so the injected
//! manifest round-trips the catalog's own JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Summary marking a synthesized record for on-device fixup.
pub const FIXUP_SUMMARY_SENTINEL: &str = "fenix-inject: pending local fixup";

/// Permission marker for packages whose permissions are not known yet.
pub const UNKNOWN_PERMISSIONS_SENTINEL: &str = "<unknown permissions>";

/// Icon for synthesized records until fixup replaces it.
pub(crate) const GENERIC_ICON_URL: &str =
    "https://addons.mozilla.org/static-server/assets/img/addon-icons/default-64.png";

/// One catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionRecord {
    /// Stable identifier, unique within a manifest.
    pub guid: String,

    /// Flat string, or a locale map depending on the endpoint.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub name: Value,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub summary: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_downloads: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<PackageVersion>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub files: Vec<PackageFile>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageFile {
    pub url: String,

    #[serde(default)]
    pub permissions: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtensionRecord {
    /// The display name, when the record carries a flat one.
    pub fn flat_name(&self) -> Option<&str> {
        self.name.as_str()
    }

    /// Whether the on-device fixup pass should fill this record in.
    pub fn needs_fixup(&self) -> bool {
        self.summary.as_str() == Some(FIXUP_SUMMARY_SENTINEL)
    }

    /// Sort key for `name`: case-folded flat name, guid fallback.
    pub(crate) fn name_key(&self) -> String {
        self.flat_name().unwrap_or(&self.guid).to_lowercase()
    }

    /// Sort key for `added`, in epoch milliseconds.
    pub(crate) fn created_key(&self) -> i64 {
        self.created
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp_millis())
            .unwrap_or(0)
    }

    /// Sort key for `popularity`.
    pub(crate) fn popularity_key(&self) -> i64 {
        self.weekly_downloads.unwrap_or(0)
    }

    /// A placeholder record pointing straight at a package URL.
    ///
    /// Everything but the guid, name, and URL is synthesized; the sentinel
    /// summary asks the on-device fixup pass to fill in the truth.
    pub fn synthetic(guid: &str, name: &str, url: &str) -> Self {
        Self {
            guid: guid.to_string(),
            name: Value::String(name.to_string()),
            summary: Value::String(FIXUP_SUMMARY_SENTINEL.to_string()),
            created: Some("1970-01-01T00:00:00Z".to_string()),
            weekly_downloads: Some(0),
            icon_url: Some(GENERIC_ICON_URL.to_string()),
            current_version: Some(PackageVersion {
                version: Some("0.0".to_string()),
                files: vec![PackageFile {
                    url: url.to_string(),
                    permissions: vec![UNKNOWN_PERMISSIONS_SENTINEL.to_string()],
                    extra: Map::new(),
                }],
                extra: Map::new(),
            }),
            extra: Map::new(),
        }
    }
}

/// `{addon, notes}` pair inside the manifest results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub addon: ExtensionRecord,

    #[serde(default)]
    pub notes: Value,
}

/// The collection-shaped payload the browser reads from its cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestDocument {
    pub page_size: usize,
    pub page_count: usize,
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<ManifestEntry>,
}

impl ManifestDocument {
    /// Wrap an ordered record sequence into a single-page document.
    ///
    /// Invariant: `count == page_size == results.len()`.
    pub fn from_records(records: Vec<ExtensionRecord>) -> Self {
        let results: Vec<ManifestEntry> = records
            .into_iter()
            .map(|addon| ManifestEntry {
                addon,
                notes: Value::Null,
            })
            .collect();
        Self {
            page_size: results.len(),
            page_count: 1,
            count: results.len(),
            next: None,
            previous: None,
            results,
        }
    }

    /// Record guids in manifest order.
    pub fn guids(&self) -> Vec<&str> {
        self.results.iter().map(|e| e.addon.guid.as_str()).collect()
    }
}
