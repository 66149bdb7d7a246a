//! Health signals published for Prometheus.
//!
//! The poller is the only writer. The HTTP server reads the same handles when
//! answering scrapes, so `HealthState` is cheap to clone and every metric is
//! atomic underneath.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use prometheus::{opts, Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    registry: Registry,
    oncall: IntGauge,
    polls: IntCounter,
    active: IntCounter,
    refresh_failures: IntCounter,
    last_success: IntGauge,
    /// Set once the first cycle has finished.
    ready: Arc<AtomicBool>,
}

/// Point-in-time view of every signal, served on `/debug/vars`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub squadcast_oncall: i64,
    pub squadcast_polls: u64,
    pub squadcast_active: u64,
    pub squadcast_token_refresh_failures: u64,
    pub squadcast_last_success_timestamp_seconds: i64,
}

impl HealthState {
    /// Create the metrics in a dedicated registry.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let oncall = IntGauge::with_opts(opts!(
            "squadcast_oncall",
            "1 if every schedule has someone on call now and within the future window"
        ))?;
        // Historical expvar names, no `_total` suffix.
        let polls = IntCounter::with_opts(opts!("squadcast_polls", "Poll cycles attempted"))?;
        let active = IntCounter::with_opts(opts!(
            "squadcast_active",
            "Poll cycles that found every schedule covered"
        ))?;
        let refresh_failures = IntCounter::with_opts(opts!(
            "squadcast_token_refresh_failures_total",
            "Failed access token refreshes"
        ))?;
        let last_success = IntGauge::with_opts(opts!(
            "squadcast_last_success_timestamp_seconds",
            "Unix time of the last healthy poll cycle"
        ))?;

        registry.register(Box::new(oncall.clone()))?;
        registry.register(Box::new(polls.clone()))?;
        registry.register(Box::new(active.clone()))?;
        registry.register(Box::new(refresh_failures.clone()))?;
        registry.register(Box::new(last_success.clone()))?;

        Ok(Self {
            registry,
            oncall,
            polls,
            active,
            refresh_failures,
            last_success,
            ready: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn record_attempt(&self) {
        self.polls.inc();
    }

    pub fn record_success(&self) {
        self.active.inc();
        self.oncall.set(1);
        self.last_success.set(chrono::Utc::now().timestamp());
        self.ready.store(true, Ordering::Release);
    }

    pub fn record_failure(&self) {
        self.oncall.set(0);
        self.ready.store(true, Ordering::Release);
    }

    pub fn record_refresh_failure(&self) {
        self.refresh_failures.inc();
    }

    pub fn is_healthy(&self) -> bool {
        self.oncall.get() == 1
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn polls(&self) -> u64 {
        self.polls.get()
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            squadcast_oncall: self.oncall.get(),
            squadcast_polls: self.polls.get(),
            squadcast_active: self.active.get(),
            squadcast_token_refresh_failures: self.refresh_failures.get(),
            squadcast_last_success_timestamp_seconds: self.last_success.get(),
        }
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

// ── Tests ─────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unhealthy_with_zero_counters() {
        let health = HealthState::new().unwrap();
        let snap = health.snapshot();
        assert_eq!(snap.squadcast_oncall, 0);
        assert_eq!(snap.squadcast_polls, 0);
        assert_eq!(snap.squadcast_active, 0);
        assert!(!health.is_healthy());
        assert!(!health.is_ready());
    }

    #[test]
    fn test_success_then_failure_flips_gauge_only() {
        let health = HealthState::new().unwrap();
        health.record_attempt();
        health.record_success();
        assert!(health.is_healthy());
        assert!(health.snapshot().squadcast_last_success_timestamp_seconds > 0);

        health.record_attempt();
        health.record_failure();
        assert!(health.is_ready());
        let snap = health.snapshot();
        assert_eq!(snap.squadcast_oncall, 0);
        assert_eq!(snap.squadcast_polls, 2);
        assert_eq!(snap.squadcast_active, 1);
    }

    #[test]
    fn test_clones_share_state() {
        let writer = HealthState::new().unwrap();
        let reader = writer.clone();
        writer.record_attempt();
        writer.record_success();
        assert!(reader.is_healthy());
        assert_eq!(reader.polls(), 1);
    }

    #[test]
    fn test_encode_contains_metric_names() {
        let health = HealthState::new().unwrap();
        health.record_attempt();
        let output = health.encode();
        assert!(output.contains("squadcast_oncall 0"));
        assert!(output.contains("squadcast_polls 1"));
        assert!(output.contains("# TYPE squadcast_active counter"));
    }

    #[test]
    fn test_poll_counters_keep_unsuffixed_names() {
        let health = HealthState::new().unwrap();
        health.record_attempt();
        health.record_success();
        let output = health.encode();
        assert!(output.contains("squadcast_polls 1\n"));
        assert!(output.contains("squadcast_active 1\n"));
        assert!(!output.contains("squadcast_polls_total"));
        assert!(!output.contains("squadcast_active_total"));
    }
}
