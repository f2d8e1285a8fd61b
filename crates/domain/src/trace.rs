use serde::Serialize;

/// Structured trace events emitted across all Cx gateway crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    CacheOp {
        op: String,
        key: String,
        outcome: String,
        duration_ms: u64,
    },
    CxCall {
        request: String,
        result: String,
        duration_ms: u64,
    },
    RouterDereg {
        status: u16,
        registrations: usize,
        duration_ms: u64,
    },
    NotificationHandled {
        kind: String,
        result_code: u32,
    },
    WildcardUpdated {
        previous: String,
        current: String,
    },
    HealthCheckPassed {},
    PenaltyRecorded {},
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "cx_event");
    }
}
