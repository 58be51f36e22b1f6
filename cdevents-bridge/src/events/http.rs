//! HTTP event sink speaking the CloudEvents HTTP binding.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::EventSink;
use crate::config::HttpMode;
use crate::core::CdEvent;
use crate::errors::SinkError;
use crate::utils::format_rfc3339;

/// Content type of a structured-mode CloudEvents request.
pub const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";

/// Sink that POSTs each event to a fixed URL.
///
/// `publish` spawns the request on the tokio runtime captured at
/// construction (or the caller's, if none was captured) and returns at once.
/// Failures of spawned requests are logged; nothing is retried.
#[derive(Debug, Clone)]
pub struct HttpEventSink {
    client: reqwest::Client,
    url: reqwest::Url,
    mode: HttpMode,
    headers: HeaderMap,
    runtime: Option<tokio::runtime::Handle>,
}

impl HttpEventSink {
    /// Creates a sink for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Unavailable`] if the URL does not parse or the
    /// HTTP client cannot be built.
    pub fn new(url: &str, mode: HttpMode, timeout: Duration) -> Result<Self, SinkError> {
        let url = reqwest::Url::parse(url)
            .map_err(|e| SinkError::Unavailable(format!("invalid sink URL {url:?}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            mode,
            headers: HeaderMap::new(),
            runtime: tokio::runtime::Handle::try_current().ok(),
        })
    }

    /// Adds static headers sent with every request (e.g. authorization).
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Unavailable`] for header names or values that
    /// are not valid HTTP.
    pub fn with_headers(mut self, headers: &HashMap<String, String>) -> Result<Self, SinkError> {
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SinkError::Unavailable(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| SinkError::Unavailable(format!("invalid header value for {name}: {e}")))?;
            self.headers.insert(name, value);
        }
        Ok(self)
    }

    /// Pins the runtime used by `publish` to spawn requests.
    #[must_use]
    pub fn with_runtime(mut self, runtime: tokio::runtime::Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// The target URL.
    #[must_use]
    pub fn url(&self) -> &reqwest::Url {
        &self.url
    }

    /// The request layout.
    #[must_use]
    pub fn mode(&self) -> HttpMode {
        self.mode
    }

    fn request(&self, event: &CdEvent) -> Result<reqwest::RequestBuilder, SinkError> {
        let encode = |e: serde_json::Error| SinkError::Encode(e.to_string());
        let builder = self.client.post(self.url.clone()).headers(self.headers.clone());

        let builder = match self.mode {
            HttpMode::Structured => builder
                .header(CONTENT_TYPE, STRUCTURED_CONTENT_TYPE)
                .body(event.to_json_bytes().map_err(encode)?),
            HttpMode::Binary => builder
                .header("ce-specversion", event.specversion())
                .header("ce-id", event.id())
                .header("ce-source", event.source())
                .header("ce-type", event.event_type())
                .header("ce-time", format_rfc3339(&event.time()))
                .header(CONTENT_TYPE, event.datacontenttype())
                .body(event.data_bytes().map_err(encode)?),
        };
        Ok(builder)
    }

    async fn send(&self, event: &CdEvent) -> Result<(), SinkError> {
        execute(self.request(event)?, event.id()).await
    }
}

async fn execute(request: reqwest::RequestBuilder, event_id: &str) -> Result<(), SinkError> {
    let response = request
        .send()
        .await
        .map_err(|e| SinkError::Transport(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        debug!(event_id = %event_id, status = %status.as_u16(), "CDEvent delivered");
        Ok(())
    } else {
        Err(SinkError::Rejected {
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    fn publish(&self, event: &CdEvent) -> Result<(), SinkError> {
        let runtime = match &self.runtime {
            Some(handle) => handle.clone(),
            None => tokio::runtime::Handle::try_current()
                .map_err(|e| SinkError::Unavailable(format!("no tokio runtime: {e}")))?,
        };

        // Encode on the caller's thread so malformed events fail here.
        let request = self.request(event)?;

        let url = self.url.clone();
        let event_type = event.event_type().to_string();
        let event_id = event.id().to_string();
        runtime.spawn(async move {
            if let Err(err) = execute(request, &event_id).await {
                warn!(
                    event_type = %event_type,
                    event_id = %event_id,
                    url = %url,
                    error = %err,
                    "CDEvent HTTP delivery failed"
                );
            }
        });
        Ok(())
    }

    async fn deliver(&self, event: &CdEvent) -> Result<(), SinkError> {
        self.send(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityKind, NormalizedEventPayload, TransitionKind};
    use chrono::{TimeZone, Utc};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn event() -> CdEvent {
        let payload = NormalizedEventPayload::new("TestJob1", "1");
        CdEvent::from_payload(
            "evt-1",
            "jenkins",
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            EntityKind::PipelineRun,
            TransitionKind::Started,
            &payload,
        )
        .unwrap()
    }

    /// Accepts one request, answers with `status`, and hands back the raw
    /// request text.
    async fn one_shot_server(status: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&buf).to_string());
        });

        (format!("http://{addr}/events"), rx)
    }

    #[test]
    fn test_invalid_url() {
        let err = HttpEventSink::new("not a url", HttpMode::Structured, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, SinkError::Unavailable(_)));
    }

    #[test]
    fn test_invalid_header() {
        let sink = HttpEventSink::new("http://localhost/", HttpMode::Binary, Duration::from_secs(1)).unwrap();
        let headers = HashMap::from([("bad header".to_string(), "x".to_string())]);
        assert!(sink.with_headers(&headers).is_err());
    }

    #[test]
    fn test_publish_without_runtime_fails() {
        let sink = HttpEventSink::new("http://localhost/", HttpMode::Structured, Duration::from_secs(1)).unwrap();
        assert!(matches!(sink.publish(&event()), Err(SinkError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_structured_delivery() {
        let (url, request) = one_shot_server("202 Accepted").await;
        let headers = HashMap::from([("authorization".to_string(), "Bearer t0k".to_string())]);
        let sink = HttpEventSink::new(&url, HttpMode::Structured, Duration::from_secs(5))
            .unwrap()
            .with_headers(&headers)
            .unwrap();

        sink.deliver(&event()).await.unwrap();

        let raw = request.await.unwrap();
        let lower = raw.to_ascii_lowercase();
        assert!(raw.starts_with("POST /events"));
        assert!(lower.contains("content-type: application/cloudevents+json"));
        assert!(lower.contains("authorization: bearer t0k"));
        assert!(raw.contains("\"type\":\"dev.cdevents.pipelinerun.started.0.1.0\""));
        assert!(raw.contains("\"specversion\":\"1.0\""));
    }

    #[tokio::test]
    async fn test_binary_delivery() {
        let (url, request) = one_shot_server("200 OK").await;
        let sink = HttpEventSink::new(&url, HttpMode::Binary, Duration::from_secs(5)).unwrap();

        sink.deliver(&event()).await.unwrap();

        let lower = request.await.unwrap().to_ascii_lowercase();
        assert!(lower.contains("ce-id: evt-1"));
        assert!(lower.contains("ce-type: dev.cdevents.pipelinerun.started.0.1.0"));
        assert!(lower.contains("ce-time: 2024-03-01t10:00:00.000z"));
        assert!(lower.contains("content-type: application/json"));
        assert!(lower.contains("\"pipelinename\":\"testjob1\""));
        assert!(!lower.contains("\"specversion\""));
    }

    #[tokio::test]
    async fn test_rejected_status() {
        let (url, _request) = one_shot_server("503 Service Unavailable").await;
        let sink = HttpEventSink::new(&url, HttpMode::Structured, Duration::from_secs(5)).unwrap();

        let err = sink.deliver(&event()).await.unwrap_err();
        assert_eq!(err, SinkError::Rejected { status: 503 });
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = HttpEventSink::new(&format!("http://{addr}/"), HttpMode::Structured, Duration::from_secs(2))
            .unwrap();
        let err = sink.deliver(&event()).await.unwrap_err();
        assert!(matches!(err, SinkError::Transport(_)));
    }

    #[tokio::test]
    async fn test_publish_spawns_delivery() {
        let (url, request) = one_shot_server("204 No Content").await;
        let sink = HttpEventSink::new(&url, HttpMode::Structured, Duration::from_secs(5)).unwrap();

        sink.publish(&event()).unwrap();

        let raw = request.await.unwrap();
        assert!(raw.contains("\"id\":\"evt-1\""));
    }
}
