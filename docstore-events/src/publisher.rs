//! Change publisher: builds a record per mutation and fans it out.

use crate::config::EventsConfig;
use crate::error::{EventError, EventResult};
use crate::http::HttpInvocationSink;
use crate::jsonl::JsonLinesSink;
use crate::sink::{InvocationSink, StreamingSink};
use docstore_types::{ChangeRecord, Entity, OperationType};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// An invocation sink bound to the runtime its deliveries are spawned on.
struct InvocationPump {
    sink: Arc<dyn InvocationSink>,
    runtime: Handle,
}

/// Fans change records out to the configured sinks.
///
/// Which sinks are present is fixed when the publisher is built; `publish`
/// never re-reads configuration.
pub struct ChangePublisher {
    service_name: String,
    stream_name: String,
    streaming: Option<Arc<dyn StreamingSink>>,
    invocation: Option<InvocationPump>,
}

impl ChangePublisher {
    /// Creates a publisher with no sinks attached.
    pub fn new(service_name: impl Into<String>, stream_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            stream_name: stream_name.into(),
            streaming: None,
            invocation: None,
        }
    }

    /// Creates a publisher that drops every record.
    pub fn disabled() -> Self {
        let config = EventsConfig::default();
        Self::new(config.service_name, config.stream_name)
    }

    /// Builds a publisher from configuration.
    ///
    /// `runtime` is required only when an invocation endpoint is configured;
    /// when absent the ambient runtime is used if there is one.
    pub fn from_config(config: &EventsConfig, runtime: Option<Handle>) -> EventResult<Self> {
        let mut publisher = Self::new(&config.service_name, &config.stream_name);

        if let Some(dir) = &config.stream_dir {
            publisher = publisher.with_streaming_sink(Arc::new(JsonLinesSink::open(dir)?));
        }

        if let Some(endpoint) = &config.invocation_endpoint {
            let runtime = match runtime {
                Some(handle) => handle,
                None => Handle::try_current().map_err(|_| EventError::NoRuntime)?,
            };
            let sink = HttpInvocationSink::new(
                endpoint,
                Duration::from_millis(config.invocation_timeout_ms),
            )?;
            publisher = publisher.with_invocation_sink(Arc::new(sink), runtime);
        }

        Ok(publisher)
    }

    /// Attaches the synchronous streaming sink.
    pub fn with_streaming_sink(mut self, sink: Arc<dyn StreamingSink>) -> Self {
        self.streaming = Some(sink);
        self
    }

    /// Attaches the detached invocation sink, spawning deliveries on `runtime`.
    pub fn with_invocation_sink(mut self, sink: Arc<dyn InvocationSink>, runtime: Handle) -> Self {
        self.invocation = Some(InvocationPump { sink, runtime });
        self
    }

    /// Returns the originating service name.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Returns the stream name handed to the streaming sink.
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Whether a streaming sink is attached.
    pub fn has_streaming_sink(&self) -> bool {
        self.streaming.is_some()
    }

    /// Whether an invocation sink is attached.
    pub fn has_invocation_sink(&self) -> bool {
        self.invocation.is_some()
    }

    /// Whether any sink is attached.
    pub fn is_enabled(&self) -> bool {
        self.has_streaming_sink() || self.has_invocation_sink()
    }

    /// Publishes a change for `entity`. Never fails.
    pub fn publish<T: Entity>(&self, operation: OperationType, entity: &T) {
        if !self.is_enabled() {
            return;
        }

        let record = match ChangeRecord::from_entity(&self.service_name, operation, entity) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    operation = %operation,
                    entity_type = T::ENTITY_TYPE,
                    entity_id = %entity.id(),
                    error = %e,
                    "failed to build change record"
                );
                return;
            }
        };

        self.deliver(record);
    }

    /// Delivers an already-built record to every attached sink. Never fails.
    pub fn deliver(&self, record: ChangeRecord) {
        if let Some(sink) = &self.streaming {
            self.deliver_streaming(sink.as_ref(), &record);
        }

        if let Some(pump) = &self.invocation {
            let sink = Arc::clone(&pump.sink);
            // Detached: the join handle is dropped and the outcome only logged.
            drop(pump.runtime.spawn(async move {
                let operation = record.operation_type;
                let entity_type = record.entity_type.clone();
                if let Err(e) = sink.invoke(record).await {
                    warn!(
                        sink = sink.name(),
                        operation = %operation,
                        entity_type = %entity_type,
                        error = %e,
                        "failed to deliver change record to invocation sink"
                    );
                }
            }));
        }
    }

    fn deliver_streaming(&self, sink: &dyn StreamingSink, record: &ChangeRecord) {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            sink.put_record(&self.stream_name, record)
        }));

        match outcome {
            Ok(Ok(())) => {
                debug!(
                    sink = sink.name(),
                    stream = %self.stream_name,
                    operation = %record.operation_type,
                    entity_type = %record.entity_type,
                    "change record delivered"
                );
            }
            Ok(Err(e)) => {
                warn!(
                    sink = sink.name(),
                    stream = %self.stream_name,
                    operation = %record.operation_type,
                    entity_type = %record.entity_type,
                    entity = %record.entity,
                    error = %e,
                    "failed to deliver change record to streaming sink"
                );
            }
            Err(_) => {
                warn!(
                    sink = sink.name(),
                    stream = %self.stream_name,
                    operation = %record.operation_type,
                    entity_type = %record.entity_type,
                    "streaming sink panicked while delivering change record"
                );
            }
        }
    }
}

impl std::fmt::Debug for ChangePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangePublisher")
            .field("service_name", &self.service_name)
            .field("stream_name", &self.stream_name)
            .field("streaming", &self.streaming.as_ref().map(|s| s.name().to_string()))
            .field("invocation", &self.invocation.as_ref().map(|p| p.sink.name().to_string()))
            .finish()
    }
}
