// Normalization pipeline: raw upstream payloads in, canonical series out
mod normalizer;
mod payload;
mod raw;
mod synthesizer;

pub use {
    normalizer::{
        DropReason, DroppedRecord, NormalizeReport, Normalized, canonicalize, normalize,
        normalize_candles, normalize_points,
    },
    payload::{RawPayload, normalize_payload},
    synthesizer::{OhlcComponents, synthesize},
};
