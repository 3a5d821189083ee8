//! Listing page retrieval

use crate::config::SiteConfig;
use crate::crawler::transport::Transport;
use url::Url;

/// Builds listing URLs and fetches their bodies
#[derive(Debug, Clone)]
pub struct ListingFetcher {
    listing_url: Url,
    page_param: String,
}

impl ListingFetcher {
    pub fn new(site: &SiteConfig) -> Result<Self, url::ParseError> {
        let base = Url::parse(&site.base_url)?;
        let listing_url = base.join(&site.listing_path)?;

        Ok(Self {
            listing_url,
            page_param: site.page_param.clone(),
        })
    }

    /// `{base}{listing-path}?{page-param}={page}`
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.listing_url.clone();
        url.query_pairs_mut()
            .append_pair(&self.page_param, &page.to_string());
        url
    }

    /// Fetches the raw body of listing page `page`
    ///
    /// Any transport failure yields `None`: a missing page counts as a page
    /// with no links and never stops the run.
    pub async fn fetch(&self, transport: &Transport, page: u32) -> Option<String> {
        let url = self.page_url(page);

        match transport.fetch(url.as_str()).await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!("Listing page {} unavailable: {}", page, e);
                None
            }
        }
    }
}
