//! HTTP client for the shared store

use std::time::Duration;

use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;

use super::{RemoteError, RemoteResult, RemoteStore};
use crate::models::TombstoneDocument;
use crate::util::{compact_text, is_http_url, join_url, unix_timestamp_millis_now};

/// Fully qualified URLs of the four shared-store endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoints {
    pub records_url: String,
    pub tombstones_url: String,
    pub save_records_url: String,
    pub save_tombstones_url: String,
}

impl RemoteEndpoints {
    /// Endpoints under `base_url` using the standard file names
    pub fn from_base(base_url: &str) -> RemoteResult<Self> {
        Self::with_paths(
            base_url,
            "data.json",
            "deleted_records.json",
            "save_data",
            "save_deleted_records",
        )
    }

    pub fn with_paths(
        base_url: &str,
        records_path: &str,
        tombstones_path: &str,
        save_records_path: &str,
        save_tombstones_path: &str,
    ) -> RemoteResult<Self> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(RemoteError::NotConfigured);
        }
        if !is_http_url(base_url) {
            return Err(RemoteError::Payload(format!(
                "remote URL must include http:// or https://: {base_url}"
            )));
        }

        Ok(Self {
            records_url: join_url(base_url, records_path),
            tombstones_url: join_url(base_url, tombstones_path),
            save_records_url: join_url(base_url, save_records_path),
            save_tombstones_url: join_url(base_url, save_tombstones_path),
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    endpoints: RemoteEndpoints,
    client: reqwest::Client,
    pull_timeout: Duration,
    push_timeout: Duration,
}

impl HttpRemoteStore {
    pub fn new(
        endpoints: RemoteEndpoints,
        pull_timeout: Duration,
        push_timeout: Duration,
    ) -> RemoteResult<Self> {
        Ok(Self {
            endpoints,
            client: reqwest::Client::builder().build()?,
            pull_timeout,
            push_timeout,
        })
    }

    #[must_use]
    pub const fn endpoints(&self) -> &RemoteEndpoints {
        &self.endpoints
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .query(&[("t", unix_timestamp_millis_now())])
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .header("Accept", "application/json")
            .timeout(self.pull_timeout)
    }

    async fn send(&self, request: RequestBuilder, timeout: Duration) -> RemoteResult<Response> {
        request.send().await.map_err(|error| {
            if error.is_timeout() {
                RemoteError::Timeout(timeout)
            } else {
                RemoteError::Http(error)
            }
        })
    }

    async fn read_body(response: Response, timeout: Duration) -> RemoteResult<String> {
        response.text().await.map_err(|error| {
            if error.is_timeout() {
                RemoteError::Timeout(timeout)
            } else {
                RemoteError::Http(error)
            }
        })
    }

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        payload: &T,
    ) -> RemoteResult<()> {
        let request = self
            .client
            .post(url)
            .json(payload)
            .timeout(self.push_timeout);
        let response = self.send(request, self.push_timeout).await?;
        ensure_success(response, self.push_timeout).await?;
        Ok(())
    }
}

impl RemoteStore for HttpRemoteStore {
    async fn fetch_records(&self) -> RemoteResult<Vec<Value>> {
        let url = &self.endpoints.records_url;
        let response = self.send(self.get(url), self.pull_timeout).await?;
        let response = ensure_success(response, self.pull_timeout).await?;
        let body = Self::read_body(response, self.pull_timeout).await?;
        serde_json::from_str::<Vec<Value>>(&body)
            .map_err(|error| RemoteError::Payload(format!("record array: {error}")))
    }

    async fn fetch_tombstones(&self) -> RemoteResult<TombstoneDocument> {
        let url = &self.endpoints.tombstones_url;
        let response = self.send(self.get(url), self.pull_timeout).await?;
        // The tombstone file only exists after the first delete
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(TombstoneDocument::default());
        }
        let response = ensure_success(response, self.pull_timeout).await?;
        let body = Self::read_body(response, self.pull_timeout).await?;
        serde_json::from_str::<TombstoneDocument>(&body)
            .map_err(|error| RemoteError::Payload(format!("tombstone document: {error}")))
    }

    async fn push_records(&self, payload: &[Value]) -> RemoteResult<()> {
        tracing::debug!(count = payload.len(), "Pushing records");
        self.post_json(&self.endpoints.save_records_url, payload)
            .await
    }

    async fn push_tombstones(&self, document: &TombstoneDocument) -> RemoteResult<()> {
        tracing::debug!(count = document.deleted_records.len(), "Pushing tombstones");
        self.post_json(&self.endpoints.save_tombstones_url, document)
            .await
    }
}

async fn ensure_success(response: Response, timeout: Duration) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = HttpRemoteStore::read_body(response, timeout)
        .await
        .unwrap_or_default();
    let body = compact_text(&body);
    Err(RemoteError::Status {
        status: status.as_u16(),
        body: if body.is_empty() {
            status.canonical_reason().unwrap_or_default().to_string()
        } else {
            body
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LeaveRecord;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0_u8; 1024];
        loop {
            let read = stream.read(&mut chunk).await.unwrap();
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);

            let text = String::from_utf8_lossy(&buffer).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buffer.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buffer).to_string()
    }

    /// Serve one canned response and hand back the raw request
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            request
        });

        (base_url, handle)
    }

    fn store_for(base_url: &str, timeout: Duration) -> HttpRemoteStore {
        HttpRemoteStore::new(RemoteEndpoints::from_base(base_url).unwrap(), timeout, timeout)
            .unwrap()
    }

    #[test]
    fn test_endpoints_join_paths_and_require_scheme() {
        let endpoints = RemoteEndpoints::from_base("https://leave.example.com/team/").unwrap();
        assert_eq!(endpoints.records_url, "https://leave.example.com/team/data.json");
        assert_eq!(
            endpoints.save_tombstones_url,
            "https://leave.example.com/team/save_deleted_records"
        );

        assert!(matches!(
            RemoteEndpoints::from_base("  "),
            Err(RemoteError::NotConfigured)
        ));
        assert!(matches!(
            RemoteEndpoints::from_base("leave.example.com"),
            Err(RemoteError::Payload(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_records_sends_cache_busting_request() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"[{"id":1,"name":"Tang","type":"leave","startDate":"2025-08-10","endDate":"2025-08-14","submitDate":"2025-08-01"}]"#,
        )
        .await;
        let remote = store_for(&base_url, Duration::from_secs(5));

        let records = remote.fetch_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], "Tang");

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /data.json?t="));
        assert!(request.contains("cache-control: no-cache"));
        assert!(request.contains("pragma: no-cache"));
    }

    #[tokio::test]
    async fn test_fetch_records_rejects_non_array_payload() {
        let (base_url, _server) = serve_once("200 OK", r#"{"records":[]}"#).await;
        let remote = store_for(&base_url, Duration::from_secs(5));

        assert!(matches!(
            remote.fetch_records().await,
            Err(RemoteError::Payload(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_tombstone_file_is_empty_document() {
        let (base_url, _server) = serve_once("404 Not Found", "").await;
        let remote = store_for(&base_url, Duration::from_secs(5));

        let document = remote.fetch_tombstones().await.unwrap();
        assert_eq!(document, TombstoneDocument::default());
    }

    #[tokio::test]
    async fn test_push_records_posts_wire_format() {
        let (base_url, server) = serve_once("200 OK", r#"{"success":true}"#).await;
        let remote = store_for(&base_url, Duration::from_secs(5));
        let record = LeaveRecord::new(
            crate::models::RecordId::new(1_754_800_000_000),
            "Tang",
            NaiveDate::from_ymd_opt(2025, 8, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, 14).unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
        );
        let payload = vec![serde_json::to_value(&record).unwrap()];

        remote.push_records(&payload).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /save_data "));
        assert!(request.contains(r#""startDate":"2025-08-10""#));
        assert!(request.contains(r#""submitDate":"2025-08-01""#));
    }

    #[tokio::test]
    async fn test_rejected_push_reports_status_and_body() {
        let (base_url, _server) =
            serve_once("400 Bad Request", r#"{"error":"invalid record"}"#).await;
        let remote = store_for(&base_url, Duration::from_secs(5));

        let error = remote
            .push_tombstones(&TombstoneDocument::default())
            .await
            .unwrap_err();
        match error {
            RemoteError::Status { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid record"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unresponsive_remote_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let _server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });
        let remote = store_for(&base_url, Duration::from_millis(200));

        assert!(matches!(
            remote.fetch_records().await,
            Err(RemoteError::Timeout(_))
        ));
    }
}
