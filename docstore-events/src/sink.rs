//! Sink abstractions.
//!
//! Defines the two delivery seams the publisher fans out to, allowing it
//! to work with any analytics backend.

use crate::error::EventResult;
use async_trait::async_trait;
use docstore_types::ChangeRecord;

/// A sink that accepts records synchronously on the caller's thread.
pub trait StreamingSink: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Delivers one record to the named stream, blocking until accepted.
    fn put_record(&self, stream: &str, record: &ChangeRecord) -> EventResult<()>;
}

/// A sink whose delivery runs detached from the caller.
#[async_trait]
pub trait InvocationSink: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Delivers one record.
    async fn invoke(&self, record: ChangeRecord) -> EventResult<()>;
}

/// Recording sinks for testing.
pub mod mock {
    use super::*;
    use crate::error::EventError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// A streaming sink that keeps every record it is given.
    #[derive(Debug, Default)]
    pub struct RecordingStreamingSink {
        records: Mutex<Vec<(String, ChangeRecord)>>,
        attempts: AtomicUsize,
        fail: bool,
        panic: bool,
    }

    impl RecordingStreamingSink {
        /// Creates a sink that accepts everything.
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a sink that rejects every record.
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        /// Creates a sink that panics on every record.
        pub fn panicking() -> Self {
            Self {
                panic: true,
                ..Self::default()
            }
        }

        /// Records accepted so far.
        pub fn records(&self) -> Vec<ChangeRecord> {
            self.records.lock().iter().map(|(_, r)| r.clone()).collect()
        }

        /// Stream names records were delivered to, in order.
        pub fn streams(&self) -> Vec<String> {
            self.records.lock().iter().map(|(s, _)| s.clone()).collect()
        }

        /// Number of delivery attempts, including rejected ones.
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl StreamingSink for RecordingStreamingSink {
        fn name(&self) -> &str {
            "recording-stream"
        }

        fn put_record(&self, stream: &str, record: &ChangeRecord) -> EventResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.panic {
                panic!("recording sink configured to panic");
            }
            if self.fail {
                return Err(EventError::Unavailable("recording sink configured to fail".into()));
            }
            self.records.lock().push((stream.to_string(), record.clone()));
            Ok(())
        }
    }

    /// An invocation sink that keeps every record and wakes waiters.
    #[derive(Debug, Default)]
    pub struct RecordingInvocationSink {
        records: Mutex<Vec<ChangeRecord>>,
        attempts: AtomicUsize,
        notify: Notify,
        fail: bool,
    }

    impl RecordingInvocationSink {
        /// Creates a sink that accepts everything.
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a sink that rejects every record.
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        /// Records accepted so far.
        pub fn records(&self) -> Vec<ChangeRecord> {
            self.records.lock().clone()
        }

        /// Number of delivery attempts, including rejected ones.
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        /// Waits until at least `count` delivery attempts have completed.
        pub async fn wait_for_attempts(&self, count: usize) {
            while self.attempts() < count {
                self.notify.notified().await;
            }
        }
    }

    #[async_trait]
    impl InvocationSink for RecordingInvocationSink {
        fn name(&self) -> &str {
            "recording-invocation"
        }

        async fn invoke(&self, record: ChangeRecord) -> EventResult<()> {
            let result = if self.fail {
                Err(EventError::Unavailable("recording sink configured to fail".into()))
            } else {
                self.records.lock().push(record);
                Ok(())
            };
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.notify.notify_one();
            result
        }
    }
}
