//! Repository index retrieval.
//!
//! Provides a trait-based abstraction over the two HTTP operations artifact
//! resolution needs: fetching a mirror's directory listing and probing that
//! a resolved URL exists. Tests inject mocks so that no network access is
//! required.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

/// Network timeout applied to every index fetch and probe.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on an index page body. Debian's `pool/main/l/linux/` listing
/// is several megabytes.
const MAX_INDEX_BYTES: u64 = 64 * 1024 * 1024;

/// Trait for talking to package mirrors.
///
/// # Examples
///
/// ```
/// use driverforge::fetch::HttpFetcher;
///
/// let fetcher = HttpFetcher;
/// // Use fetcher.fetch_index("https://mirrors.edge.kernel.org/debian/pool/main/l/linux/") in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait IndexFetcher {
    /// Fetch the body of a directory index page.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, or a non-success
    /// status.
    fn fetch_index(&self, url: &str) -> Result<String, FetchError>;

    /// Check that `url` exists, following redirects.
    ///
    /// # Errors
    ///
    /// Returns an error when the resource cannot be reached or answers with a
    /// non-success status.
    fn probe(&self, url: &str) -> Result<(), FetchError>;
}

/// Errors arising from mirror requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("request failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested resource was not found (HTTP 404).
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },
}

/// HTTP-based fetcher using `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl IndexFetcher for HttpFetcher {
    fn fetch_index(&self, url: &str) -> Result<String, FetchError> {
        let response = http_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        response
            .into_body()
            .with_config()
            .limit(MAX_INDEX_BYTES)
            .read_to_string()
            .map_err(|e| FetchError::HttpError {
                url: url.to_owned(),
                reason: e.to_string(),
            })
    }

    fn probe(&self, url: &str) -> Result<(), FetchError> {
        http_agent()
            .head(url)
            .call()
            .map(|_| ())
            .map_err(|e| map_ureq_error(url, &e))
    }
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(FETCH_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`FetchError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(404) => FetchError::NotFound {
            url: url.to_owned(),
        },
        other => FetchError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

/// Per-resolution memo of index pages.
///
/// Roles that search the same mirror share one request, and a mirror that
/// failed once is not asked again. Probes are passed through untouched.
/// The memo lives only as long as the resolution call that created it.
pub struct CachedFetcher<'a> {
    inner: &'a dyn IndexFetcher,
    pages: RefCell<HashMap<String, Result<String, FetchError>>>,
}

impl<'a> CachedFetcher<'a> {
    /// Wrap `inner` with an empty memo.
    #[must_use]
    pub fn new(inner: &'a dyn IndexFetcher) -> Self {
        Self {
            inner,
            pages: RefCell::new(HashMap::new()),
        }
    }
}

impl IndexFetcher for CachedFetcher<'_> {
    fn fetch_index(&self, url: &str) -> Result<String, FetchError> {
        if let Some(page) = self.pages.borrow().get(url) {
            return page.clone();
        }
        let page = self.inner.fetch_index(url);
        self.pages.borrow_mut().insert(url.to_owned(), page.clone());
        page
    }

    fn probe(&self, url: &str) -> Result<(), FetchError> {
        self.inner.probe(url)
    }
}
