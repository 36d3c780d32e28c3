//! Listing-page fetching
//!
//! This module owns the HTTP collaborator seam and the fixed api.php URL
//! templates. Paginated fetches surface the service's "no more pages"
//! marker as a distinct value so callers never mistake it for content.

use thiserror::Error;

/// Body returned by the service when a page index is past the last page
const END_OF_PAGES_MARKER: &str = "DONE";

/// Errors that can occur while fetching a page body
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request could not be completed
    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    /// The service answered with a non-success status
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Minimal synchronous HTTP capability: fetch a URL, return its body
///
/// The scraper depends on this trait rather than on a concrete client so
/// tests can substitute canned page bodies.
pub trait HttpGet {
    /// Fetches the given URL and returns the response body as text
    fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// Production [`HttpGet`] implementation backed by a blocking reqwest client
pub struct ReqwestHttp {
    client: reqwest::blocking::Client,
}

impl ReqwestHttp {
    /// Creates a new HTTP client with default settings
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for ReqwestHttp {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpGet for ReqwestHttp {
    fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.text().map_err(|e| FetchError::Request {
            url: url.to_string(),
            source: e,
        })
    }
}

/// The two listing kinds exposed by the api.php endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowType {
    /// Standalone single-episode releases
    Show,
    /// Batch releases covering ranges of episodes
    Batch,
}

impl ShowType {
    fn as_str(self) -> &'static str {
        match self {
            ShowType::Show => "show",
            ShowType::Batch => "batch",
        }
    }
}

/// Builds the unpaginated listing URL for a show
fn listing_url(show_id: u32, show_type: ShowType) -> String {
    format!(
        "https://horriblesubs.info/api.php?method=getshows&type={}&showid={}",
        show_type.as_str(),
        show_id
    )
}

/// Builds the URL for one page of a listing
fn page_url(show_id: u32, show_type: ShowType, page: usize) -> String {
    format!("{}&nextid={}&_", listing_url(show_id, show_type), page)
}

/// Body of one paginated listing fetch
#[derive(Debug)]
pub enum PageBody {
    /// A page of release listings
    Html(String),
    /// The service's marker that no further pages exist
    NoMorePages,
}

/// Fetches listing pages for one show
///
/// Builds the api.php URLs and delegates transport to the HTTP
/// collaborator; transport failures surface as-is, with no retries.
pub struct PageFetcher<'a> {
    http: &'a dyn HttpGet,
    show_id: u32,
}

impl<'a> PageFetcher<'a> {
    /// Creates a fetcher for the given show id
    pub fn new(http: &'a dyn HttpGet, show_id: u32) -> Self {
        Self { http, show_id }
    }

    /// Fetches the unpaginated listing of the given kind
    ///
    /// Used for the most-recent-episode lookup (`ShowType::Show`) and the
    /// one-off batch fetch (`ShowType::Batch`).
    pub fn fetch_listing(&self, show_type: ShowType) -> Result<String, FetchError> {
        self.http.get(&listing_url(self.show_id, show_type))
    }

    /// Fetches one page of the single-episode listing
    ///
    /// A body equal to the end-of-pages marker is reported as
    /// [`PageBody::NoMorePages`]; this is a normal terminal condition for
    /// pagination, not an error.
    pub fn fetch_page(&self, page: usize) -> Result<PageBody, FetchError> {
        let body = self.http.get(&page_url(self.show_id, ShowType::Show, page))?;

        if body == END_OF_PAGES_MARKER {
            Ok(PageBody::NoMorePages)
        } else {
            Ok(PageBody::Html(body))
        }
    }
}
