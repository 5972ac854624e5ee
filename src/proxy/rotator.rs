use crate::CrawlError;
use reqwest::{ClientBuilder, Proxy};
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Round-robin selection of an egress proxy
///
/// The cursor is a single atomic counter, so concurrent callers never observe
/// the same ticket. The index is always taken modulo the list length and can
/// never go out of range.
#[derive(Debug)]
pub struct ProxyRotator {
    proxies: Vec<(Url, Proxy)>,
    cursor: AtomicUsize,
}

impl ProxyRotator {
    /// Creates a rotator over the given proxy endpoints
    ///
    /// # Returns
    ///
    /// * `Ok(ProxyRotator)` - Every endpoint was accepted by the HTTP client
    /// * `Err(CrawlError::Proxy)` - An endpoint could not be turned into a proxy
    pub fn new(endpoints: Vec<Url>) -> Result<Self, CrawlError> {
        let proxies = endpoints
            .into_iter()
            .map(|url| {
                let proxy = Proxy::all(url.clone())
                    .map_err(|e| CrawlError::Proxy(format!("{}: {}", url, e)))?;
                Ok((url, proxy))
            })
            .collect::<Result<Vec<_>, CrawlError>>()?;

        Ok(Self {
            proxies,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Creates a rotator that never assigns a proxy
    pub fn direct() -> Self {
        Self {
            proxies: Vec::new(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Parses proxy endpoints from strings
    pub fn from_strs<S: AsRef<str>>(endpoints: &[S]) -> Result<Self, CrawlError> {
        let urls = endpoints
            .iter()
            .map(|s| {
                Url::parse(s.as_ref())
                    .map_err(|e| CrawlError::Proxy(format!("{}: {}", s.as_ref(), e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(urls)
    }

    /// Configures `builder` to route through the next proxy in rotation
    ///
    /// The builder is returned untouched when no proxies are configured.
    pub fn assign(&self, builder: ClientBuilder) -> ClientBuilder {
        match self.next_proxy() {
            Some((url, proxy)) => {
                tracing::debug!(proxy = %url, "Assigned proxy");
                builder.proxy(proxy.clone())
            }
            None => builder,
        }
    }

    /// Advances the rotation and returns the endpoint it lands on
    pub fn next_endpoint(&self) -> Option<&Url> {
        self.next_proxy().map(|(url, _)| url)
    }

    fn next_proxy(&self) -> Option<&(Url, Proxy)> {
        if self.proxies.is_empty() {
            return None;
        }

        let ticket = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.proxies.get(ticket % self.proxies.len())
    }

    /// Returns the configured endpoints in rotation order
    pub fn endpoints(&self) -> impl Iterator<Item = &Url> {
        self.proxies.iter().map(|(url, _)| url)
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}
