//! Operation reporting for storage mutations
//!
//! Every mutation of the database handle produces an [`OperationEvent`] that is
//! handed to the injected [`OperationRecorder`]. The default recorder emits a
//! structured `tracing` event and, with the `observability` feature, Prometheus
//! style metrics through the `metrics` facade.

use std::fmt::Debug;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Counter of finished operations (labels: operation, success)
pub const OPERATIONS_TOTAL: &str = "tasktree_operations_total";
/// Counter of rows affected by mutations (labels: operation)
pub const AFFECTED_ROWS_TOTAL: &str = "tasktree_affected_rows_total";
/// Histogram of operation latency in seconds (labels: operation)
pub const OPERATION_DURATION_SECONDS: &str = "tasktree_operation_duration_seconds";

/// A finished storage operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationEvent {
    /// Operation name, e.g. `create_task` or `batch_complete`
    pub operation: String,
    pub success: bool,
    pub affected_count: u64,
    pub duration: Duration,
    /// `TaskTreeError::kind()` of the failure, if any
    pub error_kind: Option<&'static str>,
}

impl OperationEvent {
    #[must_use]
    pub fn success(operation: impl Into<String>, affected_count: u64, duration: Duration) -> Self {
        Self {
            operation: operation.into(),
            success: true,
            affected_count,
            duration,
            error_kind: None,
        }
    }

    #[must_use]
    pub fn failure(operation: impl Into<String>, error_kind: &'static str, duration: Duration) -> Self {
        Self {
            operation: operation.into(),
            success: false,
            affected_count: 0,
            duration,
            error_kind: Some(error_kind),
        }
    }
}

/// Sink for operation events
pub trait OperationRecorder: Send + Sync + Debug {
    fn record(&self, event: &OperationEvent);
}

/// Default recorder: structured logs plus optional metrics
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl OperationRecorder for TracingRecorder {
    fn record(&self, event: &OperationEvent) {
        let duration_ms = u64::try_from(event.duration.as_millis()).unwrap_or(u64::MAX);
        if event.success {
            info!(
                operation = %event.operation,
                affected_count = event.affected_count,
                duration_ms,
                "Operation completed"
            );
        } else {
            warn!(
                operation = %event.operation,
                error_kind = event.error_kind.unwrap_or("unknown"),
                duration_ms,
                "Operation failed"
            );
        }

        #[cfg(feature = "observability")]
        {
            metrics::counter!(
                OPERATIONS_TOTAL,
                "operation" => event.operation.clone(),
                "success" => if event.success { "true" } else { "false" }
            )
            .increment(1);
            metrics::counter!(AFFECTED_ROWS_TOTAL, "operation" => event.operation.clone())
                .increment(event.affected_count);
            metrics::histogram!(OPERATION_DURATION_SECONDS, "operation" => event.operation.clone())
                .record(event.duration.as_secs_f64());
        }
    }
}

/// Measures an operation and reports it when finished
pub(crate) struct OperationTimer<'a> {
    recorder: &'a dyn OperationRecorder,
    operation: String,
    started: Instant,
}

impl<'a> OperationTimer<'a> {
    pub(crate) fn start(recorder: &'a dyn OperationRecorder, operation: impl Into<String>) -> Self {
        Self {
            recorder,
            operation: operation.into(),
            started: Instant::now(),
        }
    }

    /// Report the outcome of the operation and pass the result through
    pub(crate) fn finish<T>(
        self,
        result: crate::Result<T>,
        affected: impl FnOnce(&T) -> u64,
    ) -> crate::Result<T> {
        let duration = self.started.elapsed();
        let event = match &result {
            Ok(value) => OperationEvent::success(self.operation, affected(value), duration),
            Err(e) => OperationEvent::failure(self.operation, e.kind(), duration),
        };
        self.recorder.record(&event);
        result
    }
}
