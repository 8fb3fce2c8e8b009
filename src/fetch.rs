//! HTTP retrieval of single collection items

use std::path::Path;

use crate::config::{FetchConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::fetch_with_retry;
use crate::storage;

/// Build the shared HTTP client with the configured per-request timeout
///
/// One client is shared across both fetch stages so connection pooling works
/// across the whole run.
pub fn build_client(fetch: &FetchConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(fetch.request_timeout)
        .build()?;
    Ok(client)
}

/// URL for a single item: `<base>/<file_name>`
///
/// A trailing slash on the base is tolerated so configs can write the base
/// URL either way.
#[must_use]
pub fn item_url(base_url: &str, file_name: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), file_name)
}

/// GET one URL and return the full response body
///
/// Non-2xx responses are an error; the body is only read on success.
async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.bytes().await?.to_vec())
}

/// Fetch one item and durably write it to `path`, as a single unit
///
/// The whole fetch-and-write is retried per the retry policy; a retried item
/// simply overwrites whatever an earlier attempt left behind. Returns the
/// number of bytes written.
pub async fn fetch_and_store(
    client: &reqwest::Client,
    retry: &RetryConfig,
    url: &str,
    path: &Path,
) -> Result<u64> {
    fetch_with_retry(retry, || async {
        let body = fetch_bytes(client, url).await?;
        storage::write_item(path, &body).await
    })
    .await
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn no_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn item_url_tolerates_trailing_slash() {
        assert_eq!(
            item_url("https://bucket.example.com/json/", "5.json"),
            "https://bucket.example.com/json/5.json"
        );
        assert_eq!(
            item_url("https://bucket.example.com/json", "5.json"),
            "https://bucket.example.com/json/5.json"
        );
    }

    #[tokio::test]
    async fn fetch_and_store_writes_served_bytes_verbatim() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/3.json"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"{\"id\": 3}".to_vec()))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("3.json");
        let client = reqwest::Client::new();
        let url = format!("{}/json/3.json", mock_server.uri());

        let bytes = fetch_and_store(&client, &no_retry(), &url, &out)
            .await
            .unwrap();

        assert_eq!(bytes, 9);
        assert_eq!(std::fs::read(&out).unwrap(), b"{\"id\": 3}");
    }

    #[tokio::test]
    async fn non_2xx_response_is_an_error_and_writes_nothing() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/500.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("500.json");
        let client = reqwest::Client::new();
        let url = format!("{}/json/500.json", mock_server.uri());

        let err = fetch_and_store(&client, &no_retry(), &url, &out)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
        assert!(!out.exists(), "failed fetch must not leave a file behind");
    }

    #[tokio::test]
    async fn transient_5xx_succeeds_within_retry_budget() {
        let mock_server = MockServer::start().await;
        // First two requests 500, then the durable mock answers 200
        Mock::given(method("GET"))
            .and(path("/json/9.json"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/9.json"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"{\"id\": 9}".to_vec()))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("9.json");
        let client = reqwest::Client::new();
        let url = format!("{}/json/9.json", mock_server.uri());
        let retry = RetryConfig {
            max_attempts: 3,
            initial_delay: std::time::Duration::from_millis(1),
            jitter: false,
            ..RetryConfig::default()
        };

        fetch_and_store(&client, &retry, &url, &out).await.unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"{\"id\": 9}");
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
    }
}
