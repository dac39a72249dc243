//! Series Normalizer.
//!
//! Turns raw, possibly malformed records into a canonical series: numeric, finite,
//! strictly ascending by `time`, one record per timestamp. Never fails; the worst case is
//! an empty series. Everything that was thrown away is listed in a [`NormalizeReport`]
//! so the caller decides what (if anything) to log.

use {
    crate::{
        data::raw::{self, FieldError},
        domain::{Candle, CanonicalSeries, Point, Series, SeriesKind, Timestamped},
    },
    serde_json::Value,
    std::{collections::BTreeMap, fmt},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NotARecord,
    MissingTime,
    InvalidTime,
    MissingField(&'static str),
    InvalidField(&'static str),
    NonFinite,
    OutOfOrder,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DropReason::NotARecord => write!(f, "not a record"),
            DropReason::MissingTime => write!(f, "missing time"),
            DropReason::InvalidTime => write!(f, "invalid time"),
            DropReason::MissingField(name) => write!(f, "missing {}", name),
            DropReason::InvalidField(name) => write!(f, "non-numeric or non-finite {}", name),
            DropReason::NonFinite => write!(f, "non-finite value"),
            DropReason::OutOfOrder => write!(f, "out of order"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRecord {
    /// Bundle member or OHLC component the record came from, when not top-level
    pub series: Option<String>,
    /// Position in the input array. For synthesized candles, the position of the
    /// timestamp group in ascending time order.
    pub index: usize,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    pub dropped: Vec<DroppedRecord>,
    /// Records replaced by a later record with the same timestamp
    pub superseded: usize,
    /// Candles whose inverted high/low were swapped
    pub repaired: usize,
    /// OHLC timestamps missing at least one of the four components
    pub incomplete: usize,
}

impl NormalizeReport {
    /// Nothing dropped, superseded, repaired or left incomplete.
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.superseded == 0 && self.repaired == 0 && self.incomplete == 0
    }

    pub(crate) fn drop_record(&mut self, index: usize, reason: DropReason) {
        self.dropped.push(DroppedRecord {
            series: None,
            index,
            reason,
        });
    }

    /// Folds `other` in, labelling its unlabelled drops with `label`.
    pub fn merge(&mut self, other: NormalizeReport, label: Option<&str>) {
        self.dropped
            .extend(other.dropped.into_iter().map(|mut record| {
                if record.series.is_none() {
                    record.series = label.map(str::to_string);
                }
                record
            }));
        self.superseded += other.superseded;
        self.repaired += other.repaired;
        self.incomplete += other.incomplete;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<S> {
    pub series: S,
    pub report: NormalizeReport,
}

/// Normalizes a raw record array of the given kind.
pub fn normalize(raw: &[Value], kind: SeriesKind) -> Normalized<CanonicalSeries> {
    match kind {
        SeriesKind::Point => {
            let Normalized { series, report } = normalize_points(raw);
            Normalized {
                series: CanonicalSeries::Points(series),
                report,
            }
        }
        SeriesKind::Candle => {
            let Normalized { series, report } = normalize_candles(raw);
            Normalized {
                series: CanonicalSeries::Candles(series),
                report,
            }
        }
    }
}

pub fn normalize_points(raw: &[Value]) -> Normalized<Series<Point>> {
    let mut report = NormalizeReport::default();
    let mut points = Vec::with_capacity(raw.len());

    for (index, record) in raw.iter().enumerate() {
        match parse_point(record) {
            Ok(point) => points.push((index, point)),
            Err(reason) => report.drop_record(index, reason),
        }
    }

    let series = canonicalize(points, &mut report);
    Normalized { series, report }
}

pub fn normalize_candles(raw: &[Value]) -> Normalized<Series<Candle>> {
    let mut report = NormalizeReport::default();
    let mut candles = Vec::with_capacity(raw.len());

    for (index, record) in raw.iter().enumerate() {
        match parse_candle(record) {
            Ok(mut candle) => {
                if candle.repair_inverted_range() {
                    report.repaired += 1;
                }
                candles.push((index, candle));
            }
            Err(reason) => report.drop_record(index, reason),
        }
    }

    let series = canonicalize(candles, &mut report);
    Normalized { series, report }
}

/// Sort + dedup core shared by every path.
///
/// Records arrive paired with their source index, which is what drops are reported under.
/// One forward pass into a map keyed by timestamp, overwriting on collision, so the record
/// that came LAST in input order wins. Values then come out in key order. The final
/// strict-order check cannot fire for map output but keeps the invariant local.
pub fn canonicalize<T: Timestamped>(
    records: impl IntoIterator<Item = (usize, T)>,
    report: &mut NormalizeReport,
) -> Series<T> {
    let mut by_time: BTreeMap<i64, (usize, T)> = BTreeMap::new();
    for (index, record) in records {
        if by_time.insert(record.time(), (index, record)).is_some() {
            report.superseded += 1;
        }
    }

    let mut canonical = Vec::with_capacity(by_time.len());
    let mut previous: Option<i64> = None;
    for (index, record) in by_time.into_values() {
        if !record.is_finite() {
            report.drop_record(index, DropReason::NonFinite);
            continue;
        }
        if previous.is_some_and(|previous| record.time() <= previous) {
            report.drop_record(index, DropReason::OutOfOrder);
            continue;
        }
        previous = Some(record.time());
        canonical.push(record);
    }

    Series::from_canonical(canonical)
}

pub(crate) fn parse_point(record: &Value) -> Result<Point, DropReason> {
    let record = record.as_object().ok_or(DropReason::NotARecord)?;
    let time = raw::read_time(record).map_err(time_reason)?;
    let value = raw::read_number(record, raw::VALUE_KEYS).map_err(field_reason("value"))?;
    Ok(Point::new(time, value))
}

/// Parses a candle without repairing it.
pub(crate) fn parse_candle(record: &Value) -> Result<Candle, DropReason> {
    let record = record.as_object().ok_or(DropReason::NotARecord)?;
    let time = raw::read_time(record).map_err(time_reason)?;
    let open = raw::read_number(record, raw::OPEN_KEYS).map_err(field_reason("open"))?;
    let high = raw::read_number(record, raw::HIGH_KEYS).map_err(field_reason("high"))?;
    let low = raw::read_number(record, raw::LOW_KEYS).map_err(field_reason("low"))?;
    let close = raw::read_number(record, raw::CLOSE_KEYS).map_err(field_reason("close"))?;
    Ok(Candle::new(time, open, high, low, close))
}

fn time_reason(error: FieldError) -> DropReason {
    match error {
        FieldError::Missing => DropReason::MissingTime,
        FieldError::Invalid => DropReason::InvalidTime,
    }
}

fn field_reason(name: &'static str) -> impl Fn(FieldError) -> DropReason {
    move |error| match error {
        FieldError::Missing => DropReason::MissingField(name),
        FieldError::Invalid => DropReason::InvalidField(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_raw<T: serde::Serialize>(series: &Series<T>) -> Vec<Value> {
        series
            .iter()
            .map(|item| serde_json::to_value(item).unwrap())
            .collect()
    }

    #[test]
    fn test_point_example_scenario() {
        let raw = vec![
            json!({"time": 3, "value": 10}),
            json!({"time": 1, "value": 5}),
            json!({"time": 3, "value": 12}),
        ];
        let normalized = normalize_points(&raw);
        assert_eq!(
            normalized.series.as_slice(),
            &[Point::new(1, 5.0), Point::new(3, 12.0)]
        );
        assert_eq!(normalized.report.superseded, 1);
        assert!(normalized.report.dropped.is_empty());
    }

    #[test]
    fn test_malformed_points_are_dropped() {
        struct TestCase {
            input: Value,
            expected: DropReason,
        }

        let tests = vec![
            TestCase {
                // TC0: not an object
                input: json!(42),
                expected: DropReason::NotARecord,
            },
            TestCase {
                // TC1: no timestamp
                input: json!({"value": 1.0}),
                expected: DropReason::MissingTime,
            },
            TestCase {
                // TC2: fractional timestamp
                input: json!({"time": 1.5, "value": 1.0}),
                expected: DropReason::InvalidTime,
            },
            TestCase {
                // TC3: no value
                input: json!({"time": 1}),
                expected: DropReason::MissingField("value"),
            },
            TestCase {
                // TC4: null value counts as missing
                input: json!({"time": 1, "value": null}),
                expected: DropReason::MissingField("value"),
            },
            TestCase {
                // TC5: non-numeric value
                input: json!({"time": 1, "value": "n/a"}),
                expected: DropReason::InvalidField("value"),
            },
            TestCase {
                // TC6: non-finite value
                input: json!({"time": 1, "value": "Infinity"}),
                expected: DropReason::InvalidField("value"),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let normalized = normalize_points(std::slice::from_ref(&test.input));
            assert!(normalized.series.is_empty(), "TC{} failed", index);
            assert_eq!(
                normalized.report.dropped,
                vec![DroppedRecord {
                    series: None,
                    index: 0,
                    reason: test.expected,
                }],
                "TC{} failed",
                index
            );
        }
    }

    #[test]
    fn test_output_is_strictly_ascending() {
        let raw: Vec<Value> = [9, 2, 7, 2, 5, 9, 1, 7]
            .iter()
            .enumerate()
            .map(|(i, t)| json!({"time": t, "value": i}))
            .collect();
        let normalized = normalize_points(&raw);
        let times: Vec<i64> = normalized.series.times().collect();
        assert_eq!(times, vec![1, 2, 5, 7, 9]);
        assert!(times.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(normalized.report.superseded, 3);
    }

    #[test]
    fn test_duplicate_keeps_later_record() {
        let raw = vec![
            json!({"time": 4, "value": 1.0}),
            json!({"time": 2, "value": 7.0}),
            json!({"time": 4, "value": 2.0}),
            json!({"time": 4, "value": 3.0}),
        ];
        let normalized = normalize_points(&raw);
        assert_eq!(
            normalized.series.as_slice(),
            &[Point::new(2, 7.0), Point::new(4, 3.0)]
        );
    }

    #[test]
    fn test_dropped_duplicate_does_not_shadow_valid_one() {
        // A malformed later record must not win over an earlier valid one.
        let raw = vec![
            json!({"time": 4, "value": 1.0}),
            json!({"time": 4, "value": "bad"}),
        ];
        let normalized = normalize_points(&raw);
        assert_eq!(normalized.series.as_slice(), &[Point::new(4, 1.0)]);
        assert_eq!(normalized.report.dropped.len(), 1);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = vec![
            json!({"t": "8", "v": "1.5"}),
            json!({"time": 3, "value": 10}),
            json!(null),
            json!({"time": 1, "value": 5}),
            json!({"time": 3, "value": 12}),
            json!({"time": 6}),
        ];
        let once = normalize_points(&raw);
        let twice = normalize_points(&as_raw(&once.series));
        assert_eq!(twice.series, once.series);
        assert!(twice.report.is_clean());

        let raw = vec![
            json!({"time": 2, "open": 1, "high": 0.5, "low": 2, "close": 1.5}),
            json!({"time": 1, "o": 1, "h": 2, "l": 0.5, "c": 1.5}),
            json!({"time": 2, "open": 1, "high": 3, "low": 0.5, "close": 2}),
        ];
        let once = normalize_candles(&raw);
        let twice = normalize_candles(&as_raw(&once.series));
        assert_eq!(twice.series, once.series);
    }

    #[test]
    fn test_candle_repair_example_scenario() {
        let raw = vec![json!({"time": 1, "open": 10, "high": 8, "low": 12, "close": 9})];
        let normalized = normalize_candles(&raw);
        assert_eq!(
            normalized.series.as_slice(),
            &[Candle::new(1, 10.0, 12.0, 8.0, 9.0)]
        );
        assert_eq!(normalized.report.repaired, 1);
    }

    #[test]
    fn test_candle_with_missing_component_is_dropped() {
        let raw = vec![
            json!({"time": 1, "open": 10, "high": 12, "low": 9}),
            json!({"time": 2, "open": 10, "high": 12, "low": 9, "close": "x"}),
            json!({"time": 3, "open": 10, "high": 12, "low": 9, "close": 11}),
        ];
        let normalized = normalize_candles(&raw);
        assert_eq!(normalized.series.len(), 1);
        let reasons: Vec<DropReason> = normalized
            .report
            .dropped
            .iter()
            .map(|record| record.reason)
            .collect();
        assert_eq!(
            reasons,
            vec![
                DropReason::MissingField("close"),
                DropReason::InvalidField("close")
            ]
        );
    }

    #[test]
    fn test_empty_and_garbage_inputs_give_empty_series() {
        assert!(normalize(&[], SeriesKind::Point).series.is_empty());
        let garbage = vec![json!("x"), json!([1, 2]), json!({})];
        let normalized = normalize(&garbage, SeriesKind::Candle);
        assert!(normalized.series.is_empty());
        assert_eq!(normalized.report.dropped.len(), 3);
    }

    #[test]
    fn test_report_merge_labels_members() {
        let mut total = NormalizeReport::default();
        let mut member = NormalizeReport::default();
        member.drop_record(2, DropReason::MissingTime);
        member.superseded = 1;
        total.merge(member, Some("buy"));
        assert_eq!(total.dropped[0].series.as_deref(), Some("buy"));
        assert_eq!(total.superseded, 1);
        assert_eq!(DropReason::MissingField("close").to_string(), "missing close");
    }

    #[test]
    fn test_canonicalize_reports_source_index() {
        let mut report = NormalizeReport::default();
        let records = vec![
            (0, Point::new(5, 1.0)),
            (1, Point::new(1, f64::NAN)),
            (2, Point::new(3, 2.0)),
            (3, Point::new(3, 2.5)),
        ];
        let series = canonicalize(records, &mut report);
        assert_eq!(series.as_slice(), &[Point::new(3, 2.5), Point::new(5, 1.0)]);
        assert_eq!(
            report.dropped,
            vec![DroppedRecord {
                series: None,
                index: 1,
                reason: DropReason::NonFinite,
            }]
        );
        assert_eq!(report.superseded, 1);
    }
}
