//! Manifest assembly: fetch, merge, sort, pin.

use std::cmp::Reverse;
use std::collections::HashSet;

use tracing::{debug, info};

use fenix_inject_config::Config;

use crate::error::CatalogError;
use crate::model::{ExtensionRecord, ManifestDocument};
use crate::source::{CatalogClient, FetchBudget};

/// Assemble the configured sources into one manifest document.
pub async fn assemble(
    config: &Config,
    client: &CatalogClient,
) -> Result<ManifestDocument, CatalogError> {
    let mut budget = FetchBudget::new(config.max_fetches);
    let mut records: Vec<ExtensionRecord> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for name in &config.use_sources {
        let descriptor = config.resolve_source(name)?;
        let fetched = client.fetch_records(&descriptor, &mut budget).await?;
        debug!(source = %name, records = fetched.len(), "fetched source");
        for record in fetched {
            // first occurrence wins across sources
            if seen.insert(record.guid.clone()) {
                records.push(record);
            }
        }
    }

    if let Some(field) = config.sort_combined_list.field() {
        sort_records(&mut records, field)?;
    }

    if !config.move_to_top.is_empty() {
        let pins = expand_pin_list(config)?;
        records = pin_to_front(records, &pins)?;
    }

    info!(count = records.len(), "assembled manifest");
    Ok(ManifestDocument::from_records(records))
}

/// Stable sort; a leading `-` on the field flips direction.
fn sort_records(records: &mut [ExtensionRecord], order: &str) -> Result<(), CatalogError> {
    let (descending, field) = match order.strip_prefix('-') {
        Some(field) => (true, field),
        None => (false, order),
    };

    match (field, descending) {
        ("name", false) => records.sort_by_cached_key(|r| r.name_key()),
        ("name", true) => records.sort_by_cached_key(|r| Reverse(r.name_key())),
        ("added", false) => records.sort_by_cached_key(|r| r.created_key()),
        ("added", true) => records.sort_by_cached_key(|r| Reverse(r.created_key())),
        ("popularity", false) => records.sort_by_cached_key(|r| r.popularity_key()),
        ("popularity", true) => records.sort_by_cached_key(|r| Reverse(r.popularity_key())),
        _ => return Err(CatalogError::UnknownSortField(order.to_string())),
    }
    Ok(())
}

/// Expand `move_to_top` entries into a flat guid list.
///
/// An entry naming a configured source with a declared guid set expands to
/// that set; everything else is taken as a literal guid. Duplicate guids
/// collapse to their last occurrence.
fn expand_pin_list(config: &Config) -> Result<Vec<String>, CatalogError> {
    let mut expanded: Vec<String> = Vec::new();
    for entry in &config.move_to_top {
        let from_source = config
            .sources
            .contains_key(entry)
            .then(|| config.resolve_source(entry))
            .transpose()?
            .and_then(|descriptor| descriptor.declared_guids());
        match from_source {
            Some(guids) => expanded.extend(guids),
            None => expanded.push(entry.clone()),
        }
    }

    // last occurrence wins its position
    let mut deduped: Vec<String> = Vec::new();
    for (i, guid) in expanded.iter().enumerate() {
        if expanded.iter().rposition(|g| g == guid) == Some(i) {
            deduped.push(guid.clone());
        }
    }
    Ok(deduped)
}

/// Move pinned records, in pin order, ahead of the rest.
fn pin_to_front(
    records: Vec<ExtensionRecord>,
    pins: &[String],
) -> Result<Vec<ExtensionRecord>, CatalogError> {
    let mut rest = records;
    let mut front = Vec::with_capacity(pins.len());
    for guid in pins {
        match rest.iter().position(|r| &r.guid == guid) {
            Some(index) => front.push(rest.remove(index)),
            None => return Err(CatalogError::MissingPinnedIdentifier(guid.clone())),
        }
    }
    front.extend(rest);
    Ok(front)
}

#[cfg(test)]
#[path = "assemble_tests.rs"]
mod tests;
