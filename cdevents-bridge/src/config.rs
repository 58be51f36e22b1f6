//! Configuration for the bridge and its sink.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{BridgeError, SinkError};
use crate::events::{BackpressureAwareEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Prefix of every environment variable read by [`BridgeConfig::from_env`].
pub const ENV_PREFIX: &str = "CDEVENTS_";

/// Which sink receives emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Log each event through `tracing`.
    #[default]
    Log,
    /// POST each event to an HTTP endpoint.
    Http,
    /// Discard events.
    None,
}

impl std::str::FromStr for SinkKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "http" => Ok(Self::Http),
            "none" => Ok(Self::None),
            other => Err(BridgeError::config(format!("unknown sink kind {other:?}"))),
        }
    }
}

/// How events are laid out in HTTP requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpMode {
    /// The whole envelope is the JSON body.
    #[default]
    Structured,
    /// Attributes travel as `ce-*` headers; the body is `data` alone.
    Binary,
}

impl std::str::FromStr for HttpMode {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" => Ok(Self::Structured),
            "binary" => Ok(Self::Binary),
            other => Err(BridgeError::config(format!("unknown HTTP mode {other:?}"))),
        }
    }
}

/// Configuration for the HTTP sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSinkConfig {
    /// Endpoint receiving the events.
    #[serde(default)]
    pub url: Option<String>,
    /// Request layout.
    #[serde(default)]
    pub mode: HttpMode,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_timeout() -> f64 {
    10.0
}

impl Default for HttpSinkConfig {
    fn default() -> Self {
        Self {
            url: None,
            mode: HttpMode::default(),
            timeout_seconds: default_timeout(),
            headers: HashMap::new(),
        }
    }
}

impl HttpSinkConfig {
    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds.max(0.0))
    }
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// CloudEvents `source` identifying this CI instance.
    #[serde(default = "default_source")]
    pub source: String,
    /// Sink selection.
    #[serde(default)]
    pub sink: SinkKind,
    /// HTTP sink settings, used when `sink` is `http`.
    #[serde(default)]
    pub http: HttpSinkConfig,
    /// Bounded queue in front of the sink; 0 publishes directly.
    #[serde(default)]
    pub queue_size: usize,
    /// Default log filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json_logs: bool,
}

fn default_source() -> String {
    "cdevents-bridge".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            sink: SinkKind::default(),
            http: HttpSinkConfig::default(),
            queue_size: 0,
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

impl BridgeConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the event source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Selects the HTTP sink with the given URL.
    #[must_use]
    pub fn with_http_sink(mut self, url: impl Into<String>) -> Self {
        self.sink = SinkKind::Http;
        self.http.url = Some(url.into());
        self
    }

    /// Sets the queue size.
    #[must_use]
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size;
        self
    }

    /// Parses a JSON document; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON or an invalid configuration.
    pub fn from_json_str(json: &str) -> Result<Self, BridgeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Builds a configuration from `CDEVENTS_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error for unparsable values or an invalid configuration.
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup, using the same
    /// keys as [`from_env`](Self::from_env).
    ///
    /// Recognized keys: `CDEVENTS_SOURCE`, `CDEVENTS_SINK`,
    /// `CDEVENTS_HTTP_URL`, `CDEVENTS_HTTP_MODE`,
    /// `CDEVENTS_HTTP_TIMEOUT_SECONDS`, `CDEVENTS_QUEUE_SIZE`,
    /// `CDEVENTS_LOG_LEVEL`, `CDEVENTS_JSON_LOGS`.
    ///
    /// # Errors
    ///
    /// Returns an error for unparsable values or an invalid configuration.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(source) = get("SOURCE") {
            config.source = source;
        }
        if let Some(sink) = get("SINK") {
            config.sink = sink.parse()?;
        }
        if let Some(url) = get("HTTP_URL") {
            config.http.url = Some(url);
        }
        if let Some(mode) = get("HTTP_MODE") {
            config.http.mode = mode.parse()?;
        }
        if let Some(timeout) = get("HTTP_TIMEOUT_SECONDS") {
            config.http.timeout_seconds = timeout
                .trim()
                .parse()
                .map_err(|_| BridgeError::config(format!("invalid HTTP timeout {timeout:?}")))?;
        }
        if let Some(size) = get("QUEUE_SIZE") {
            config.queue_size = size
                .trim()
                .parse()
                .map_err(|_| BridgeError::config(format!("invalid queue size {size:?}")))?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(json) = get("JSON_LOGS") {
            config.json_logs = matches!(json.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for missing or malformed values.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.source.trim().is_empty() {
            return Err(BridgeError::config("event source must not be empty"));
        }
        if self.http.timeout_seconds <= 0.0 || !self.http.timeout_seconds.is_finite() {
            return Err(BridgeError::config("HTTP timeout must be a positive number of seconds"));
        }
        if self.sink == SinkKind::Http {
            let url = self
                .http
                .url
                .as_deref()
                .ok_or_else(|| BridgeError::config("http sink requires http.url"))?;
            validate_url(url)?;
        }
        Ok(())
    }

    /// Builds the configured sink on the current tokio runtime, if any.
    ///
    /// See [`build_sink_on`](Self::build_sink_on).
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid configuration, or when the sink needs
    /// a runtime and the caller is not inside one.
    pub fn build_sink(&self) -> Result<Arc<dyn EventSink>, BridgeError> {
        self.build_sink_on(tokio::runtime::Handle::try_current().ok())
    }

    /// Builds the configured sink, wrapped in a started backpressure queue
    /// when `queue_size` is non-zero.
    ///
    /// The HTTP sink and the queue worker run on `runtime`, so host threads
    /// outside any runtime can publish through the returned sink.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid configuration, an HTTP sink that
    /// cannot be built, or an HTTP sink or queue requested without a runtime.
    pub fn build_sink_on(
        &self,
        runtime: Option<tokio::runtime::Handle>,
    ) -> Result<Arc<dyn EventSink>, BridgeError> {
        self.validate()?;

        let sink: Arc<dyn EventSink> = match self.sink {
            SinkKind::Log => Arc::new(LoggingEventSink::default()),
            SinkKind::None => Arc::new(NoOpEventSink),
            SinkKind::Http => self.build_http_sink(runtime.as_ref())?,
        };

        if self.queue_size == 0 {
            return Ok(sink);
        }

        let runtime = runtime.ok_or_else(|| no_runtime("delivery queue"))?;
        let queued = BackpressureAwareEventSink::new(sink, self.queue_size);
        queued.start_on(&runtime);
        Ok(queued as Arc<dyn EventSink>)
    }

    #[cfg(feature = "http")]
    fn build_http_sink(
        &self,
        runtime: Option<&tokio::runtime::Handle>,
    ) -> Result<Arc<dyn EventSink>, BridgeError> {
        let url = self
            .http
            .url
            .as_deref()
            .ok_or_else(|| BridgeError::config("http sink requires http.url"))?;
        let runtime = runtime.ok_or_else(|| no_runtime("http sink"))?;
        let sink = crate::events::HttpEventSink::new(url, self.http.mode, self.http.timeout())?
            .with_headers(&self.http.headers)?
            .with_runtime(runtime.clone());
        Ok(Arc::new(sink))
    }

    #[cfg(not(feature = "http"))]
    fn build_http_sink(
        &self,
        _runtime: Option<&tokio::runtime::Handle>,
    ) -> Result<Arc<dyn EventSink>, BridgeError> {
        Err(BridgeError::config("built without the `http` feature"))
    }
}

fn no_runtime(what: &str) -> BridgeError {
    BridgeError::Sink(SinkError::Unavailable(format!(
        "{what} needs a tokio runtime; call build_sink_on with a runtime handle"
    )))
}

#[cfg(feature = "http")]
fn validate_url(url: &str) -> Result<(), BridgeError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| BridgeError::config(format!("invalid http.url {url:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(BridgeError::config(format!("unsupported URL scheme {other:?}"))),
    }
}

#[cfg(not(feature = "http"))]
fn validate_url(url: &str) -> Result<(), BridgeError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(BridgeError::config(format!("invalid http.url {url:?}")))
    }
}
