//! Per-call timing and outcome logging.

use crate::error::StorageError;
use std::fmt::Display;
use std::time::Instant;
use tracing::{debug, error};

pub(crate) struct OpTimer {
    operation: &'static str,
    entity_type: &'static str,
    started: Instant,
}

impl OpTimer {
    pub(crate) fn start(operation: &'static str, entity_type: &'static str) -> Self {
        Self {
            operation,
            entity_type,
            started: Instant::now(),
        }
    }

    pub(crate) fn succeeded(&self, target: &dyn Display) {
        debug!(
            operation = self.operation,
            entity_type = self.entity_type,
            target = %target,
            duration_ms = self.started.elapsed().as_millis() as u64,
            "operation succeeded"
        );
    }

    /// Logs the failure and wraps it with the call's context.
    pub(crate) fn failed(&self, target: &dyn Display, err: StorageError) -> StorageError {
        let elapsed = self.started.elapsed();
        error!(
            operation = self.operation,
            entity_type = self.entity_type,
            target = %target,
            duration_ms = elapsed.as_millis() as u64,
            error = %err,
            "operation failed"
        );
        StorageError::Operation {
            operation: self.operation,
            entity_type: self.entity_type,
            target: target.to_string(),
            elapsed,
            source: Box::new(err),
        }
    }
}
