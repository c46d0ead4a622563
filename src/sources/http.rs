use super::{DataSource, LoadedData};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Loads data with an HTTP GET.
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn load(&self) -> Result<LoadedData> {
        let started = Instant::now();
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", self.url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} returned {}: {}", self.url, status, body.trim());
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", self.url))?;
        Ok(LoadedData::new(self.url.clone(), body, started.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response on a loopback port.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/status")
    }

    fn source(url: String) -> HttpSource {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpSource { url, client }
    }

    #[tokio::test]
    async fn test_http_source_returns_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;

        let data = source(url.clone()).load().await.unwrap();
        assert_eq!(data.body, "hello");
        assert_eq!(data.bytes, 5);
        assert_eq!(data.source, url);
    }

    #[tokio::test]
    async fn test_http_source_non_success_status_is_error() {
        let url = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\nboom",
        )
        .await;

        let err = source(url).load().await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("500"));
        assert!(message.contains("boom"));
    }

    #[tokio::test]
    async fn test_http_source_connection_refused_is_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/status", listener.local_addr().unwrap());
        drop(listener);

        let err = source(url.clone()).load().await.unwrap_err();
        assert!(format!("{err:#}").contains(&url));
    }
}
