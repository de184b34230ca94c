//! Prometheus counters for gateway activity, gated behind the `prometheus`
//! feature the same way the teacher crate gates its FTP-session metrics.
//!
//! When the feature is disabled every function here is a no-op, so call
//! sites never need `#[cfg(feature = "prometheus")]` of their own.

#[cfg(feature = "prometheus")]
mod enabled {
    use lazy_static::lazy_static;
    use prometheus::{
        opts, register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec,
    };

    lazy_static! {
        static ref REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
            "filegate_requests_total",
            "Total number of provider operations performed, by verb.",
            &["verb"]
        )
        .unwrap();
        static ref REQUEST_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
            "filegate_request_errors_total",
            "Total number of provider operations that failed, by verb and HTTP status.",
            &["verb", "code"]
        )
        .unwrap();
        static ref BYTES_UPLOADED_TOTAL: IntCounter =
            register_int_counter!(opts!("filegate_bytes_uploaded_total", "Total bytes sent to backends.")).unwrap();
        static ref BYTES_DOWNLOADED_TOTAL: IntCounter =
            register_int_counter!(opts!("filegate_bytes_downloaded_total", "Total bytes received from backends.")).unwrap();
        static ref THROTTLE_WAITS_TOTAL: IntCounter = register_int_counter!(opts!(
            "filegate_throttle_waits_total",
            "Total number of requests that had to wait for the throttle gate."
        ))
        .unwrap();
        static ref RETRIES_TOTAL: IntCounterVec = register_int_counter_vec!(
            "filegate_retries_total",
            "Total number of request-envelope retries, by reason.",
            &["reason"]
        )
        .unwrap();
        static ref CHUNKED_UPLOAD_ABORTS_TOTAL: IntCounterVec = register_int_counter_vec!(
            "filegate_chunked_upload_aborts_total",
            "Total number of chunked uploads that entered the ABORTING state, by outcome.",
            &["outcome"]
        )
        .unwrap();
    }

    pub fn record_request(verb: &str) {
        REQUESTS_TOTAL.with_label_values(&[verb]).inc();
    }

    pub fn record_request_error(verb: &str, code: u16) {
        let code = code.to_string();
        REQUEST_ERRORS_TOTAL.with_label_values(&[verb, &code]).inc();
    }

    pub fn record_bytes_uploaded(bytes: u64) {
        BYTES_UPLOADED_TOTAL.inc_by(bytes);
    }

    pub fn record_bytes_downloaded(bytes: u64) {
        BYTES_DOWNLOADED_TOTAL.inc_by(bytes);
    }

    pub fn record_throttle_wait() {
        THROTTLE_WAITS_TOTAL.inc();
    }

    pub fn record_retry(reason: &str) {
        RETRIES_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn record_chunked_upload_abort(outcome: &str) {
        CHUNKED_UPLOAD_ABORTS_TOTAL.with_label_values(&[outcome]).inc();
    }
}

#[cfg(not(feature = "prometheus"))]
mod enabled {
    pub fn record_request(_verb: &str) {}
    pub fn record_request_error(_verb: &str, _code: u16) {}
    pub fn record_bytes_uploaded(_bytes: u64) {}
    pub fn record_bytes_downloaded(_bytes: u64) {}
    pub fn record_throttle_wait() {}
    pub fn record_retry(_reason: &str) {}
    pub fn record_chunked_upload_abort(_outcome: &str) {}
}

/// Increments the per-verb request counter (`"metadata"`, `"upload"`, ...).
pub fn record_request(verb: &str) {
    enabled::record_request(verb);
}

/// Increments the per-verb, per-status error counter.
pub fn record_request_error(verb: &str, code: u16) {
    enabled::record_request_error(verb, code);
}

/// Adds to the total bytes sent to backends.
pub fn record_bytes_uploaded(bytes: u64) {
    enabled::record_bytes_uploaded(bytes);
}

/// Adds to the total bytes received from backends.
pub fn record_bytes_downloaded(bytes: u64) {
    enabled::record_bytes_downloaded(bytes);
}

/// Increments the throttle-wait counter.
pub fn record_throttle_wait() {
    enabled::record_throttle_wait();
}

/// Increments the per-reason retry counter (`"503"`, `"timeout"`, ...).
pub fn record_retry(reason: &str) {
    enabled::record_retry(reason);
}

/// Increments the per-outcome chunked-upload-abort counter (`"clean"`,
/// `"dirty"`).
pub fn record_chunked_upload_abort(outcome: &str) {
    enabled::record_chunked_upload_abort(outcome);
}
