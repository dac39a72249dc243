use serde::{Deserialize, Serialize};

/// What is actually written to the store: `{ data, timestamp, version }`.
/// `timestamp` is the write time in epoch milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEnvelope<T> {
    pub data: T,
    pub timestamp: i64,
    pub version: String,
}

/// The envelope without its payload. Used by eviction scans, which only need age and
/// version and should not pay for validating every stored series.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct EnvelopeHeader {
    pub timestamp: i64,
    pub version: String,
}
