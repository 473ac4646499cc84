//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Reserved source name merged under every named source.
pub const DEFAULT_SOURCE: &str = "_default";

/// Fallback catalog language when neither `_default` nor the source sets one.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Fallback User-Agent for catalog requests.
pub const DEFAULT_USER_AGENT: &str = "Firefox/109.0";

/// Fallback server-side sort for collection sources.
pub const DEFAULT_SORT: &str = "-popularity";

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target package id.
    #[serde(default = "default_app")]
    pub app: String,

    /// Source names to assemble, in order.
    #[serde(default)]
    pub use_sources: Vec<String>,

    /// Page-fetch ceiling shared across all sources; negative disables it.
    #[serde(default = "default_max_fetches")]
    pub max_fetches: i64,

    /// Global sort over the combined list: `false`, or a field name
    /// (`name`, `added`, `popularity`) with an optional leading `-`.
    #[serde(default)]
    pub sort_combined_list: SortSetting,

    /// Guids or source names moved to the head of the final list.
    #[serde(default)]
    pub move_to_top: Vec<String>,

    /// adb fwmark workaround: `true`, `false`, or `"auto"` to probe.
    #[serde(default)]
    pub no_fwmark: FwmarkMode,

    /// Android device serial (`adb -s`).
    #[serde(default)]
    pub device: Option<String>,

    /// Where the assembled manifest is cached.
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    /// Manifest cache max age in seconds; zero or negative forces rebuild.
    #[serde(default = "default_max_age")]
    pub max_age: i64,

    /// Enrich synthesized records with metadata known to the target app.
    #[serde(default)]
    pub fixup_addon_data: bool,

    /// Named source tables; `_default` is reserved for shared fallbacks.
    #[serde(default)]
    pub sources: HashMap<String, SourceTable>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: default_app(),
            use_sources: Vec::new(),
            max_fetches: default_max_fetches(),
            sort_combined_list: SortSetting::default(),
            move_to_top: Vec::new(),
            no_fwmark: FwmarkMode::default(),
            device: None,
            output_path: None,
            max_age: default_max_age(),
            fixup_addon_data: false,
            sources: HashMap::new(),
        }
    }
}

fn default_app() -> String {
    "org.mozilla.firefox".to_string()
}

fn default_max_fetches() -> i64 {
    50
}

fn default_max_age() -> i64 {
    86_400
}

impl Config {
    /// Resolve a named source against the `_default` entry.
    ///
    /// Fields set on the named table win over `_default` ones.
    pub fn resolve_source(&self, name: &str) -> Result<SourceDescriptor, ConfigError> {
        let table = self
            .sources
            .get(name)
            .ok_or_else(|| ConfigError::UnknownSource(name.to_string()))?;
        let merged = match self.sources.get(DEFAULT_SOURCE) {
            Some(base) => table.merged_over(base),
            None => table.clone(),
        };
        merged.into_descriptor(name)
    }

    /// Cache location for the assembled manifest.
    pub fn resolved_output_path(&self) -> PathBuf {
        self.output_path.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("fenix-inject")
                .join("collection.json")
        })
    }
}

/// `sort_combined_list` accepts `false` or a field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortSetting {
    Toggle(bool),
    Field(String),
}

impl Default for SortSetting {
    fn default() -> Self {
        SortSetting::Toggle(false)
    }
}

impl SortSetting {
    /// The sort field, when sorting is enabled.
    pub fn field(&self) -> Option<&str> {
        match self {
            SortSetting::Field(f) => Some(f.as_str()),
            SortSetting::Toggle(_) => None,
        }
    }
}

/// `no_fwmark` accepts `true`, `false`, or `"auto"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FwmarkMode {
    Fixed(bool),
    Probe(ProbeKeyword),
}

/// The only accepted probe keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeKeyword {
    #[serde(rename = "auto")]
    Auto,
}

impl Default for FwmarkMode {
    fn default() -> Self {
        FwmarkMode::Fixed(false)
    }
}

impl FwmarkMode {
    /// The configured value, or `None` when the platform should be probed.
    pub fn resolved(&self) -> Option<bool> {
        match self {
            FwmarkMode::Fixed(value) => Some(*value),
            FwmarkMode::Probe(_) => None,
        }
    }
}

/// One raw `[sources.<name>]` table, before `_default` merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceTable {
    /// Source kind: `collection`, `guid-search`, `file`, or `url`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// ISO language code; an empty string omits the `lang` parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Server-side sort for collection pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guids: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<PathBuf>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<DirectEntry>>,
}

impl SourceTable {
    /// This table with `base` filling in the gaps.
    fn merged_over(&self, base: &SourceTable) -> SourceTable {
        SourceTable {
            kind: self.kind.clone().or_else(|| base.kind.clone()),
            owner: self.owner.clone().or_else(|| base.owner.clone()),
            collection: self.collection.clone().or_else(|| base.collection.clone()),
            language: self.language.clone().or_else(|| base.language.clone()),
            user_agent: self.user_agent.clone().or_else(|| base.user_agent.clone()),
            sort: self.sort.clone().or_else(|| base.sort.clone()),
            guids: self.guids.clone().or_else(|| base.guids.clone()),
            paths: self.paths.clone().or_else(|| base.paths.clone()),
            entries: self.entries.clone().or_else(|| base.entries.clone()),
        }
    }

    fn into_descriptor(self, name: &str) -> Result<SourceDescriptor, ConfigError> {
        let kind = self
            .kind
            .clone()
            .ok_or_else(|| ConfigError::MissingField(format!("sources.{name}.type")))?;

        match kind.as_str() {
            "collection" => Ok(SourceDescriptor::Collection {
                owner: require(self.owner, name, "owner")?,
                collection: require(self.collection, name, "collection")?,
                language: self.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
                user_agent: self
                    .user_agent
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
                sort: self.sort.unwrap_or_else(|| DEFAULT_SORT.to_string()),
            }),
            "guid-search" => Ok(SourceDescriptor::GuidSearch {
                guids: require(self.guids, name, "guids")?,
                language: self.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
                user_agent: self
                    .user_agent
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            }),
            "file" => Ok(SourceDescriptor::LocalFiles {
                paths: require(self.paths, name, "paths")?,
            }),
            "url" => Ok(SourceDescriptor::DirectUrls {
                entries: require(self.entries, name, "entries")?,
            }),
            other => Err(ConfigError::UnknownSourceType {
                name: name.to_string(),
                kind: other.to_string(),
            }),
        }
    }
}

fn require<T>(field: Option<T>, name: &str, key: &str) -> Result<T, ConfigError> {
    field.ok_or_else(|| ConfigError::MissingField(format!("sources.{name}.{key}")))
}

/// One hand-built `[sources.<name>.entries]` item for `url` sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectEntry {
    pub guid: String,
    pub name: String,
    pub url: String,
}

/// A source table resolved against `_default`, ready to fetch from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    Collection {
        owner: String,
        collection: String,
        language: String,
        user_agent: String,
        sort: String,
    },
    GuidSearch {
        guids: Vec<String>,
        language: String,
        user_agent: String,
    },
    LocalFiles {
        paths: Vec<PathBuf>,
    },
    DirectUrls {
        entries: Vec<DirectEntry>,
    },
}

impl SourceDescriptor {
    /// The guids this source declares up front, for kinds that carry them.
    ///
    /// Collection and file sources only learn their guids by fetching, so
    /// they return `None`.
    pub fn declared_guids(&self) -> Option<Vec<String>> {
        match self {
            SourceDescriptor::GuidSearch { guids, .. } => Some(guids.clone()),
            SourceDescriptor::DirectUrls { entries } => {
                Some(entries.iter().map(|e| e.guid.clone()).collect())
            }
            SourceDescriptor::Collection { .. } | SourceDescriptor::LocalFiles { .. } => None,
        }
    }
}
