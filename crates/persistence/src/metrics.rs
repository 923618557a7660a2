//! Backend request metrics.

use metrics::{counter, histogram};
use std::time::Instant;

/// Record the duration of a backend request.
pub fn record_request_duration(operation: &str, duration_secs: f64) {
    histogram!(
        "backend_request_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

/// Count a stored record whose geometry could not be decoded.
pub fn record_decode_failure() {
    counter!("geometry_decode_failures_total").increment(1);
}

/// A helper to time backend requests and record metrics.
///
/// Usage:
/// ```ignore
/// let timer = RequestTimer::new("list_geofences");
/// let result = client.get(url).send().await;
/// timer.record();
/// ```
pub struct RequestTimer {
    operation: String,
    start: Instant,
}

impl RequestTimer {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration to metrics.
    pub fn record(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_request_duration(&self.operation, duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_timer_creation() {
        let timer = RequestTimer::new("create_geofence");
        assert_eq!(timer.operation, "create_geofence");
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        RequestTimer::new("list_geofences").record();
        record_decode_failure();
    }
}
