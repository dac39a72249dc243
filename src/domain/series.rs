use {
    crate::domain::{Candle, Point},
    serde::{Deserialize, Deserializer, Serialize, Serializer},
    std::collections::BTreeMap,
    strum_macros::{Display, EnumIter, EnumString},
    thiserror::Error,
};

/// Anything that lives on the time axis of a chart.
pub trait Timestamped {
    fn time(&self) -> i64;
    fn is_finite(&self) -> bool;
}

/// Which record shape a bare array of raw records holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SeriesKind {
    Point,
    Candle,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeriesError {
    #[error("entry {index} at time {time} does not follow previous time {previous}")]
    OutOfOrder { index: usize, previous: i64, time: i64 },
    #[error("entry {index} at time {time} holds a non-finite value")]
    NonFinite { index: usize, time: i64 },
}

/// A canonical series: strictly ascending `time`, no duplicate timestamps, every value finite.
/// Empty is valid and means "no data".
#[derive(Debug, Clone, PartialEq)]
pub struct Series<T>(Vec<T>);

impl<T> Series<T> {
    pub fn empty() -> Self {
        Series(Vec::new())
    }

    /// Caller guarantees the canonical invariants (the normalizer is the only producer).
    pub(crate) fn from_canonical(items: Vec<T>) -> Self {
        Series(items)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&T> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.0.last()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
}

impl<T: Timestamped> Series<T> {
    /// Checks the canonical invariants on an arbitrary slice.
    pub fn validate(items: &[T]) -> Result<(), SeriesError> {
        let mut previous: Option<i64> = None;
        for (index, item) in items.iter().enumerate() {
            let time = item.time();
            if !item.is_finite() {
                return Err(SeriesError::NonFinite { index, time });
            }
            if let Some(previous) = previous {
                if time <= previous {
                    return Err(SeriesError::OutOfOrder {
                        index,
                        previous,
                        time,
                    });
                }
            }
            previous = Some(time);
        }
        Ok(())
    }

    pub fn times(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().map(Timestamped::time)
    }

    /// First and last timestamp, if any.
    pub fn time_range(&self) -> Option<(i64, i64)> {
        Some((self.first()?.time(), self.last()?.time()))
    }
}

impl<T> Default for Series<T> {
    fn default() -> Self {
        Series::empty()
    }
}

impl<T: Timestamped> TryFrom<Vec<T>> for Series<T> {
    type Error = SeriesError;

    fn try_from(items: Vec<T>) -> Result<Self, Self::Error> {
        Series::validate(&items)?;
        Ok(Series(items))
    }
}

impl<'a, T> IntoIterator for &'a Series<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// --- SERDE ---
// Serialized as a plain array. Deserializing re-validates so a tampered cache entry
// fails to decode instead of leaking a broken series to the chart.
impl<T: Serialize> Serialize for Series<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Series<T>
where
    T: Deserialize<'de> + Timestamped,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Series::try_from(items).map_err(serde::de::Error::custom)
    }
}

/// What the cache stores and the chart layer receives.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", content = "series", rename_all = "snake_case")]
pub enum CanonicalSeries {
    Points(Series<Point>),
    Candles(Series<Candle>),
    /// Several named series that share one request, e.g. buy and sell price of a bar
    Bundle(BTreeMap<String, CanonicalSeries>),
}

impl CanonicalSeries {
    /// Total number of records, bundles summed over their members.
    pub fn len(&self) -> usize {
        match self {
            CanonicalSeries::Points(series) => series.len(),
            CanonicalSeries::Candles(series) => series.len(),
            CanonicalSeries::Bundle(members) => members.values().map(CanonicalSeries::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_points(&self) -> Option<&Series<Point>> {
        match self {
            CanonicalSeries::Points(series) => Some(series),
            _ => None,
        }
    }

    pub fn as_candles(&self) -> Option<&Series<Candle>> {
        match self {
            CanonicalSeries::Candles(series) => Some(series),
            _ => None,
        }
    }

    /// Named member of a bundle.
    pub fn member(&self, name: &str) -> Option<&CanonicalSeries> {
        match self {
            CanonicalSeries::Bundle(members) => members.get(name),
            _ => None,
        }
    }
}
