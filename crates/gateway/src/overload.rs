//! Overload and liveness accounting.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use cx_domain::trace::TraceEvent;

/// Counts penalties recorded against the HSS for overload control.
/// Exactly one penalty is recorded per request whose Cx round-trip
/// timed out or was answered too-busy.
#[derive(Default)]
pub struct PenaltyCounter {
    penalties: AtomicU64,
}

impl PenaltyCounter {
    pub fn record(&self) {
        self.penalties.fetch_add(1, Ordering::Relaxed);
        TraceEvent::PenaltyRecorded {}.emit();
    }

    pub fn count(&self) -> u64 {
        self.penalties.load(Ordering::Relaxed)
    }
}

/// Tracks successful registration-status responses: a 200 OK on that
/// endpoint is the process's health-check criterion.
pub struct HealthChecker {
    passes: AtomicU64,
    started_at: DateTime<Utc>,
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self {
            passes: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }
}

impl HealthChecker {
    pub fn health_check_passed(&self) {
        self.passes.fetch_add(1, Ordering::Relaxed);
        TraceEvent::HealthCheckPassed {}.emit();
    }

    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
