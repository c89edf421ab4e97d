//! Map link resolution: directory search, exact match, then page scrape.

use anyhow::Context as _;
use fancy_regex::Regex;
use tracing::{debug, info};

use crate::common::error::{LookupError, LookupResult};
use crate::common::text::{truncate_chars, DIAGNOSTIC_BODY_LIMIT};
use crate::common::types::format_address;
use crate::config::types::LookupConfig;
use crate::lookup::directory::{Listing, SearchResponse};
use crate::lookup::scrape::find_map_link;

/// Game filter used for directory searches.
const DIRECTORY_GAME: &str = "rust";

/// Listings requested per search.
const SEARCH_PAGE_SIZE: &str = "10";

/// Terminal outcome of a map lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapLinkResult {
    /// A map link, either from the listing itself or scraped from its page.
    Resolved(String),
    /// The listing page exists but carries no map link.
    PageFoundNoLink(String),
    /// The directory returned no listings at all.
    NoListingFound,
    /// Listings came back but none had exactly this IP and port.
    NoExactMatch,
}

/// Resolves registered servers to map links through the server directory.
pub struct LookupResolver {
    client: reqwest::Client,
    api_base_url: String,
    site_base_url: String,
    api_token: Option<String>,
    map_link_pattern: Regex,
}

impl LookupResolver {
    /// Build a resolver from config. Fails on an invalid pattern or TLS setup.
    pub fn new(config: &LookupConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .user_agent(concat!("rustlink/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let map_link_pattern = Regex::new(&config.map_link_pattern)
            .with_context(|| format!("Invalid map link pattern '{}'", config.map_link_pattern))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            site_base_url: config.site_base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
            map_link_pattern,
        })
    }

    /// Listing page URL for a directory id.
    pub fn listing_page_url(&self, id: &str) -> String {
        format!("{}/servers/{}/{}", self.site_base_url, DIRECTORY_GAME, id)
    }

    /// Run the full chain for `host:port`.
    pub async fn resolve(&self, host: &str, port: u16) -> LookupResult<MapLinkResult> {
        let listings = self.search(host, port).await?;
        if listings.is_empty() {
            debug!("No directory listings for {}", format_address(host, port));
            return Ok(MapLinkResult::NoListingFound);
        }

        let Some(listing) = listings.iter().find(|l| l.matches(host, port)) else {
            debug!(
                "{} listing(s) for {}, none matching exactly",
                listings.len(),
                format_address(host, port)
            );
            return Ok(MapLinkResult::NoExactMatch);
        };

        if let Some(url) = listing.map_url() {
            info!("Map link for {} from listing {}", format_address(host, port), listing.id);
            return Ok(MapLinkResult::Resolved(url.to_string()));
        }

        let page_url = self.listing_page_url(&listing.id);
        match self.scrape_page(&page_url).await? {
            Some(url) => {
                info!("Map link for {} scraped from {}", format_address(host, port), page_url);
                Ok(MapLinkResult::Resolved(url))
            }
            None => Ok(MapLinkResult::PageFoundNoLink(page_url)),
        }
    }

    /// Search the directory for `host:port`.
    async fn search(&self, host: &str, port: u16) -> LookupResult<Vec<Listing>> {
        let url = format!("{}/servers", self.api_base_url);
        let search = format!("\"{}:{}\"", host, port);
        debug!("Directory search {} {}", url, search);

        let mut request = self.client.get(&url).query(&[
            ("filter[game]", DIRECTORY_GAME),
            ("filter[search]", search.as_str()),
            ("page[size]", SEARCH_PAGE_SIZE),
        ]);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| LookupError::Fetch {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::DirectoryUnavailable {
                status: status.as_u16(),
                body: truncate_chars(body.trim(), DIAGNOSTIC_BODY_LIMIT),
            });
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| LookupError::Parse {
            url,
            message: e.to_string(),
        })?;
        Ok(parsed.data)
    }

    /// Fetch a listing page and look for a map link in its anchors.
    async fn scrape_page(&self, page_url: &str) -> LookupResult<Option<String>> {
        debug!("Fetching listing page {}", page_url);

        let fetch_error = |message: String| LookupError::Fetch {
            url: page_url.to_string(),
            message,
        };

        let response = self
            .client
            .get(page_url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status.as_u16())));
        }

        let html = response
            .text()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        find_map_link(&html, &self.map_link_pattern).map_err(|message| LookupError::Parse {
            url: page_url.to_string(),
            message,
        })
    }
}
