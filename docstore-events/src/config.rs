use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for change-event delivery.
///
/// A sink is enabled by the presence of its setting: `stream_dir` enables
/// the JSON-lines streaming sink and `invocation_endpoint` enables the HTTP
/// invocation sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Name of the originating service, stamped on every record.
    pub service_name: String,
    /// Stream name passed to the streaming sink.
    pub stream_name: String,
    /// Directory for the JSON-lines streaming sink.
    pub stream_dir: Option<PathBuf>,
    /// Endpoint the invocation sink POSTs records to.
    pub invocation_endpoint: Option<String>,
    /// Request timeout for the invocation sink (ms).
    pub invocation_timeout_ms: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            service_name: "docstore".to_string(),
            stream_name: "repository-changes".to_string(),
            stream_dir: None,
            invocation_endpoint: None,
            invocation_timeout_ms: 5_000,
        }
    }
}
