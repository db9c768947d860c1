//! Observability and Metrics
//!
//! This module provides metrics collection and observability features
//! for monitoring codec throughput and synchronization health.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Global metrics collector for protocol operations
#[derive(Debug)]
pub struct Metrics {
    /// Payloads encoded through a type registry
    pub payloads_encoded: AtomicU64,
    /// Payloads decoded through a type registry
    pub payloads_decoded: AtomicU64,
    /// Unknown payloads consumed by the discard fallback
    pub payloads_discarded: AtomicU64,
    /// Bytes produced by payload encoding
    pub payload_bytes_encoded: AtomicU64,
    /// Registries packed for synchronization
    pub registries_packed: AtomicU64,
    /// Entries packed with bodies or elided ids
    pub entries_packed: AtomicU64,
    /// Entries whose bodies were elided via known packs
    pub entries_elided: AtomicU64,
    /// Synchronization tasks started
    pub sync_tasks_started: AtomicU64,
    /// Synchronization tasks completed
    pub sync_tasks_completed: AtomicU64,
    /// Total bytes sent over transports
    pub bytes_sent: AtomicU64,
    /// Total bytes received over transports
    pub bytes_received: AtomicU64,
    /// Protocol errors observed
    pub protocol_errors: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            payloads_encoded: AtomicU64::new(0),
            payloads_decoded: AtomicU64::new(0),
            payloads_discarded: AtomicU64::new(0),
            payload_bytes_encoded: AtomicU64::new(0),
            registries_packed: AtomicU64::new(0),
            entries_packed: AtomicU64::new(0),
            entries_elided: AtomicU64::new(0),
            sync_tasks_started: AtomicU64::new(0),
            sync_tasks_completed: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a payload encoded through a registry
    pub fn payload_encoded(&self, byte_count: u64) {
        self.payloads_encoded.fetch_add(1, Ordering::Relaxed);
        self.payload_bytes_encoded
            .fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a payload decoded through a registry
    pub fn payload_decoded(&self) {
        self.payloads_decoded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an unknown payload consumed by the fallback
    pub fn payload_discarded(&self) {
        self.payloads_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a registry packed with the given entry count
    pub fn registry_packed(&self, entries: u64) {
        self.registries_packed.fetch_add(1, Ordering::Relaxed);
        self.entries_packed.fetch_add(entries, Ordering::Relaxed);
    }

    /// Record an entry whose body was elided
    pub fn entry_elided(&self) {
        self.entries_elided.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sync task started
    pub fn sync_task_started(&self) {
        self.sync_tasks_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sync task completed
    pub fn sync_task_completed(&self) {
        self.sync_tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record bytes sent over a transport
    pub fn message_sent(&self, byte_count: u64) {
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record bytes received over a transport
    pub fn message_received(&self, byte_count: u64) {
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a protocol error
    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            payloads_encoded: self.payloads_encoded.load(Ordering::Relaxed),
            payloads_decoded: self.payloads_decoded.load(Ordering::Relaxed),
            payloads_discarded: self.payloads_discarded.load(Ordering::Relaxed),
            payload_bytes_encoded: self.payload_bytes_encoded.load(Ordering::Relaxed),
            registries_packed: self.registries_packed.load(Ordering::Relaxed),
            entries_packed: self.entries_packed.load(Ordering::Relaxed),
            entries_elided: self.entries_elided.load(Ordering::Relaxed),
            sync_tasks_started: self.sync_tasks_started.load(Ordering::Relaxed),
            sync_tasks_completed: self.sync_tasks_completed.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            payloads_encoded = snapshot.payloads_encoded,
            payloads_decoded = snapshot.payloads_decoded,
            payloads_discarded = snapshot.payloads_discarded,
            payload_bytes_encoded = snapshot.payload_bytes_encoded,
            registries_packed = snapshot.registries_packed,
            entries_packed = snapshot.entries_packed,
            entries_elided = snapshot.entries_elided,
            sync_tasks_started = snapshot.sync_tasks_started,
            sync_tasks_completed = snapshot.sync_tasks_completed,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            protocol_errors = snapshot.protocol_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Protocol metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub payloads_encoded: u64,
    pub payloads_decoded: u64,
    pub payloads_discarded: u64,
    pub payload_bytes_encoded: u64,
    pub registries_packed: u64,
    pub entries_packed: u64,
    pub entries_elided: u64,
    pub sync_tasks_started: u64,
    pub sync_tasks_completed: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub protocol_errors: u64,
    pub uptime_seconds: u64,
}

/// Global metrics instance (lazy static for simplicity)
static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}
