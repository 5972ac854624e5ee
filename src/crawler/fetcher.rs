//! HTTP client construction for discovery and retrieval jobs

use crate::config::UserAgentConfig;
use crate::proxy::ProxyRotator;
use reqwest::Client;
use std::time::Duration;

/// Timeout applied to every outbound request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds an HTTP client for one job
///
/// The client identifies itself with the configured user agent, gives each
/// request [`REQUEST_TIMEOUT`], and routes through the next proxy from
/// `rotator` (or directly when the rotator is empty).
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    rotator: &ProxyRotator,
) -> Result<Client, reqwest::Error> {
    let builder = Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    rotator.assign(builder).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_user_agent_format() {
        assert_eq!(
            create_test_config().header_value(),
            "TestCrawler/1.0 (+https://example.com/about; admin@example.com)"
        );
    }

    #[test]
    fn test_build_direct_client() {
        let client = build_http_client(&create_test_config(), &ProxyRotator::direct());
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_proxied_client_advances_rotation() {
        let rotator = ProxyRotator::from_strs(&["http://10.0.0.1:1", "http://10.0.0.2:2"]).unwrap();

        build_http_client(&create_test_config(), &rotator).unwrap();
        assert_eq!(
            rotator.next_endpoint().unwrap().as_str(),
            "http://10.0.0.2:2/"
        );
    }
}
