//! Listing page parser for extracting document links
//!
//! Turns a raw listing body into an ordered, deduplicated sequence of
//! [`DocumentRef`]s. Pure: no network, no disk.

use crate::config::SiteConfig;
use crate::storage::is_valid_id;
use crate::HarvestError;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// One document link found on a listing page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    /// Absolute document URL
    pub url: String,

    /// Stable identifier taken from the URL path; the storage key
    pub id: String,
}

/// Extracts document links matching `/{document-path}/{id}`
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    base_url: Url,
    document_path: String,
    marker: String,
    id_pattern: Regex,
}

impl LinkExtractor {
    pub fn new(site: &SiteConfig) -> Result<Self, HarvestError> {
        let base_url = Url::parse(&site.base_url)?;
        let document_path = site.document_path.trim_matches('/').to_string();
        let marker = format!("/{}/", document_path);
        let id_pattern = Regex::new(&format!(
            "/{}/([A-Za-z0-9_]+)",
            regex::escape(&document_path)
        ))?;

        Ok(Self {
            base_url,
            document_path,
            marker,
            id_pattern,
        })
    }

    /// Extracts document links in first-seen order
    ///
    /// # Extraction Rules
    ///
    /// - Only `<a href="...">` targets containing `/{document-path}/` are considered
    /// - The identifier is the `[A-Za-z0-9_]+` run right after that marker
    /// - Relative targets are resolved against the site base URL
    /// - A repeated identifier is dropped; the first occurrence wins
    ///
    /// An empty result is a valid outcome (e.g. a page past the end of the catalog).
    ///
    /// # Example
    ///
    /// ```
    /// use judgment_harvest::config::SiteConfig;
    /// use judgment_harvest::crawler::LinkExtractor;
    ///
    /// let site = SiteConfig {
    ///     base_url: "https://www.elitigation.sg".to_string(),
    ///     listing_path: "/gd/Home/Index".to_string(),
    ///     document_path: "gd/s".to_string(),
    ///     page_param: "CurrentPage".to_string(),
    /// };
    /// let extractor = LinkExtractor::new(&site).unwrap();
    /// let refs = extractor.extract(r#"<a href="/gd/s/2024_SGHC_1">Case</a>"#);
    /// assert_eq!(refs[0].id, "2024_SGHC_1");
    /// assert_eq!(refs[0].url, "https://www.elitigation.sg/gd/s/2024_SGHC_1");
    /// ```
    pub fn extract(&self, html: &str) -> Vec<DocumentRef> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut refs = Vec::new();

        let Ok(a_selector) = Selector::parse("a[href]") else {
            return refs;
        };

        for element in document.select(&a_selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };

            if let Some(doc) = self.match_link(href) {
                if seen.insert(doc.id.clone()) {
                    refs.push(doc);
                }
            }
        }

        refs
    }

    /// Builds the canonical reference for a known identifier
    ///
    /// Used to re-run a list of previously failed identifiers.
    pub fn document_ref_for_id(&self, id: &str) -> Option<DocumentRef> {
        if !is_valid_id(id) {
            return None;
        }

        let url = self
            .base_url
            .join(&format!("/{}/{}", self.document_path, id))
            .ok()?;

        Some(DocumentRef {
            url: url.to_string(),
            id: id.to_string(),
        })
    }

    fn match_link(&self, href: &str) -> Option<DocumentRef> {
        let href = href.trim();
        if !href.contains(&self.marker) {
            return None;
        }

        let id = self.id_pattern.captures(href)?.get(1)?.as_str().to_string();
        let url = resolve_link(href, &self.base_url)?;

        Some(DocumentRef { url, id })
    }
}

/// Resolves a link href to an absolute http(s) URL
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    match base_url.join(href) {
        Ok(absolute_url) if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}
