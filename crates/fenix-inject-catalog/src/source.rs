//! Record sources: AMO pagination, local files, hand-built URL entries.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::header::USER_AGENT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use fenix_inject_config::SourceDescriptor;

use crate::error::CatalogError;
use crate::model::ExtensionRecord;

/// Fixed page size for AMO requests.
pub const PAGE_SIZE: usize = 50;

const AMO_API_BASE: &str = "https://services.addons.mozilla.org/api/v4/";

/// Remaining page-fetch allowance, shared across one assembly.
#[derive(Debug)]
pub struct FetchBudget {
    limit: i64,
    remaining: i64,
    unlimited: bool,
}

impl FetchBudget {
    /// A negative `max_fetches` disables the check entirely.
    pub fn new(max_fetches: i64) -> Self {
        Self {
            limit: max_fetches,
            remaining: max_fetches.max(0),
            unlimited: max_fetches < 0,
        }
    }

    /// Spend one page request, failing once the allowance is gone.
    pub fn take(&mut self) -> Result<(), CatalogError> {
        if self.unlimited {
            return Ok(());
        }
        if self.remaining == 0 {
            return Err(CatalogError::FetchBudgetExceeded { limit: self.limit });
        }
        self.remaining -= 1;
        Ok(())
    }
}

/// One paginated AMO response page.
#[derive(Debug, Deserialize)]
struct Page<T> {
    results: Vec<T>,
    next: Option<String>,
}

/// Collection pages wrap each addon with curator notes.
#[derive(Debug, Deserialize)]
struct CollectionItem {
    addon: ExtensionRecord,
}

/// Catalog access with a fixed API base (overridable for tests).
pub struct CatalogClient {
    http: reqwest::Client,
    api_base: Url,
}

impl CatalogClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            http,
            api_base: Url::parse(AMO_API_BASE).expect("API base URL is valid"),
        }
    }

    /// Point the client at a different API root.
    pub fn with_api_base(mut self, base: Url) -> Self {
        self.api_base = base;
        self
    }

    /// Produce this source's records, spending the shared budget per page.
    pub async fn fetch_records(
        &self,
        descriptor: &SourceDescriptor,
        budget: &mut FetchBudget,
    ) -> Result<Vec<ExtensionRecord>, CatalogError> {
        match descriptor {
            SourceDescriptor::Collection {
                owner,
                collection,
                language,
                user_agent,
                sort,
            } => {
                let first = self.collection_url(owner, collection, sort, language);
                let items: Vec<CollectionItem> =
                    self.fetch_paged(first, user_agent, budget).await?;
                Ok(items.into_iter().map(|item| item.addon).collect())
            }
            SourceDescriptor::GuidSearch {
                guids,
                language,
                user_agent,
            } => {
                let first = self.search_url(guids, language);
                self.fetch_paged(first, user_agent, budget).await
            }
            SourceDescriptor::LocalFiles { paths } => {
                paths.iter().map(|p| read_record_file(p)).collect()
            }
            SourceDescriptor::DirectUrls { entries } => Ok(entries
                .iter()
                .map(|e| ExtensionRecord::synthetic(&e.guid, &e.name, &e.url))
                .collect()),
        }
    }

    fn collection_url(&self, owner: &str, collection: &str, sort: &str, language: &str) -> Url {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .expect("API base is not a valid base URL")
            .pop_if_empty()
            .extend([
                "accounts",
                "account",
                owner,
                "collections",
                collection,
                "addons",
                "",
            ]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page_size", &PAGE_SIZE.to_string());
            query.append_pair("sort", sort);
            if !language.is_empty() {
                query.append_pair("lang", language);
            }
        }
        url
    }

    fn search_url(&self, guids: &[String], language: &str) -> Url {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .expect("API base is not a valid base URL")
            .pop_if_empty()
            .extend(["addons", "search", ""]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("guid", &guids.join(","));
            query.append_pair("page_size", &PAGE_SIZE.to_string());
            if !language.is_empty() {
                query.append_pair("lang", language);
            }
        }
        url
    }

    /// Follow the `next` chain until the server ends it.
    ///
    /// Every page spends one budget unit first, so a paginator that never
    /// returns a null `next` fails fast instead of looping.
    async fn fetch_paged<T: DeserializeOwned>(
        &self,
        first: Url,
        user_agent: &str,
        budget: &mut FetchBudget,
    ) -> Result<Vec<T>, CatalogError> {
        let mut out = Vec::new();
        let mut next = Some(first.to_string());
        while let Some(url) = next {
            budget.take()?;
            debug!(%url, "fetching catalog page");
            let response = self
                .http
                .get(&url)
                .header(USER_AGENT, user_agent)
                .send()
                .await?
                .error_for_status()?;
            let body = response.text().await?;
            let page: Page<T> = serde_json::from_str(&body)
                .map_err(|e| CatalogError::Parse(format!("{url}: {e}")))?;
            out.extend(page.results);
            next = page.next;
        }
        Ok(out)
    }
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

/// One pre-built record per file.
fn read_record_file(path: &Path) -> Result<ExtensionRecord, CatalogError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| CatalogError::Parse(format!("{}: {e}", path.display())))
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
