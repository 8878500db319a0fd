//! HTTP invocation sink.

use crate::error::{EventError, EventResult};
use crate::sink::InvocationSink;
use async_trait::async_trait;
use docstore_types::ChangeRecord;
use std::time::Duration;
use tracing::debug;

/// POSTs each record as JSON to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct HttpInvocationSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpInvocationSink {
    /// Creates a sink for `endpoint` with the given request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> EventResult<Self> {
        let endpoint = endpoint.into();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(EventError::Config(format!(
                "invocation endpoint must be an http(s) URL: {endpoint}"
            )));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    /// Returns the target endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InvocationSink for HttpInvocationSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn invoke(&self, record: ChangeRecord) -> EventResult<()> {
        let response = self.client.post(&self.endpoint).json(&record).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EventError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            endpoint = %self.endpoint,
            status = status.as_u16(),
            entity_type = %record.entity_type,
            "change record invoked"
        );
        Ok(())
    }
}
