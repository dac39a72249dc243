// Domain types and value objects
mod candle;
mod dataset;
mod point;
mod series;

// Re-export commonly used types to the world
pub use {
    candle::Candle,
    dataset::{DatasetError, DatasetType, ParamBag, ParamValue},
    point::Point,
    series::{CanonicalSeries, Series, SeriesError, SeriesKind, Timestamped},
};
