//! Metrics instrumentation for asg-dns-sd.
//!
//! All metrics are prefixed with `asg_dns_sd.`

use metrics::{counter, histogram};
use std::time::Instant;

use crate::error::ReactorError;
use crate::store::ChangeAction;

/// Record the outcome of one reconciliation.
pub fn record_reconcile(result: Result<(), &ReactorError>, duration: std::time::Duration) {
    let (result_str, kind) = match result {
        Ok(()) => ("completed", "none"),
        Err(e) => ("failed", e.kind()),
    };

    counter!("asg_dns_sd.reconcile.count", "result" => result_str, "error" => kind).increment(1);
    histogram!("asg_dns_sd.reconcile.duration.seconds", "result" => result_str)
        .record(duration.as_secs_f64());
}

/// Record a planned change and the number of records it carries.
pub fn record_planned_change(action: ChangeAction, records: usize) {
    counter!("asg_dns_sd.change.count", "action" => action.as_str()).increment(1);
    histogram!("asg_dns_sd.change.records", "action" => action.as_str()).record(records as f64);
}

/// Record a lookup of the records on file, needed to delete a service.
pub fn record_existing_lookup() {
    counter!("asg_dns_sd.existing_lookup.count").increment(1);
}

/// Record instances seen in the membership snapshot, by whether they contributed.
pub fn record_membership(included: usize, excluded: usize) {
    histogram!("asg_dns_sd.membership.included").record(included as f64);
    histogram!("asg_dns_sd.membership.excluded").record(excluded as f64);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
