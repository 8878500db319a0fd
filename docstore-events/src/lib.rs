//! Change-event fan-out for docstore.
//!
//! Every successful mutation in the repository produces one
//! [`ChangeRecord`](docstore_types::ChangeRecord) that is handed to
//! [`ChangePublisher::publish`]. The publisher delivers it to at most two
//! sinks:
//!
//! - a **streaming sink**, called synchronously on the caller's thread
//! - an **invocation sink**, dispatched onto a Tokio runtime and never awaited
//!
//! Delivery is best-effort and at-most-once. Sink failures are logged and
//! swallowed here; they never reach the code that performed the mutation.
//!
//! # Example
//!
//! ```
//! use docstore_events::{ChangePublisher, mock::RecordingStreamingSink};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(RecordingStreamingSink::new());
//! let publisher = ChangePublisher::new("orders-service", "repository-changes")
//!     .with_streaming_sink(sink.clone());
//! assert!(publisher.has_streaming_sink());
//! ```

mod config;
mod error;
mod http;
mod jsonl;
mod publisher;
mod sink;

pub use config::EventsConfig;
pub use error::{EventError, EventResult};
pub use http::HttpInvocationSink;
pub use jsonl::JsonLinesSink;
pub use publisher::ChangePublisher;
pub use sink::{InvocationSink, StreamingSink, mock};
