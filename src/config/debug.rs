//! Debugging feature flags.

#[allow(dead_code)]
pub struct LogFlags {
    /// Log every cache hit / miss decision
    pub log_cache_hits: bool,

    /// Log which entries the eviction routines remove (per-dataset cap, expiry, quota)
    pub log_evictions: bool,

    /// Trace each request through idle -> checking-cache -> ... -> done
    pub log_request_phases: bool,

    /// Log every record the normalizer drops (can be noisy on bad upstream days)
    pub log_dropped_records: bool,

    /// Activate trace_time macro (for scope-level timing)
    pub log_performance: bool,
}

pub const DF: LogFlags = LogFlags {
    log_cache_hits: true,
    log_evictions: true,

    log_request_phases: false,
    log_dropped_records: false,
    log_performance: false,
};
