// src/ingest/http.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::ingest::error::TransientFetchError;

/// Query parameters whose values never reach the logs.
const REDACTED_PARAMS: &[&str] = &["apiKey", "api-key", "api_key"];

#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// `key=value` pairs with credentials masked, for log lines.
    pub fn redacted_query(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| {
                if REDACTED_PARAMS.iter().any(|r| r.eq_ignore_ascii_case(k)) {
                    format!("{k}=***")
                } else {
                    format!("{k}={v}")
                }
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// One GET, one answer. Any non-2xx status is an error.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get_text(&self, req: &HttpRequest) -> Result<String, TransientFetchError>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransientFetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("etl-connector/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_text(&self, req: &HttpRequest) -> Result<String, TransientFetchError> {
        let mut builder = self.client.get(&req.url).query(&req.query);
        for (k, v) in &req.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransientFetchError::Status(status.as_u16()));
        }
        resp.text()
            .await
            .map_err(|e| TransientFetchError::Body(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    /// Serves one canned response on 127.0.0.1 and returns the base URL.
    fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn non_success_status_is_a_transient_error() {
        let base = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let err = transport
            .get_text(&HttpRequest::get(format!("{base}/topips.txt")))
            .await
            .unwrap_err();
        assert!(matches!(err, TransientFetchError::Status(503)), "got {err:?}");
    }

    #[tokio::test]
    async fn success_returns_the_body() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 6\r\nConnection: close\r\n\r\nfeed\n\n",
        );
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let body = transport
            .get_text(&HttpRequest::get(base).header("Accept", "text/plain"))
            .await
            .unwrap();
        assert_eq!(body, "feed\n\n");
    }

    #[test]
    fn redacts_api_key_but_keeps_other_params() {
        let req = HttpRequest::get("https://example.test/top-headlines")
            .query("country", "us")
            .query("apiKey", "s3cret");
        let q = req.redacted_query();
        assert_eq!(q, "country=us&apiKey=***");
        assert!(!q.contains("s3cret"));
    }
}
