use {
    crate::{
        data::{
            normalizer::{self, NormalizeReport, Normalized},
            raw,
            synthesizer::{self, OhlcComponents},
        },
        domain::{CanonicalSeries, SeriesKind},
    },
    serde_json::{Map, Value},
    std::collections::BTreeMap,
};

/// What a fetch collaborator hands back, before any validation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Points(Vec<Value>),
    /// Combined OHLC array
    Candles(Vec<Value>),
    Ohlc {
        combined: Option<Vec<Value>>,
        components: OhlcComponents,
    },
    Bundle(BTreeMap<String, RawPayload>),
}

impl RawPayload {
    /// Detects the payload shape of a JSON response body.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Array(records) => {
                if looks_like_candles(&records) {
                    RawPayload::Candles(records)
                } else {
                    RawPayload::Points(records)
                }
            }
            Value::Object(object) => Self::from_object(object),
            _ => RawPayload::Points(Vec::new()),
        }
    }

    /// Like `from_json`, but a bare array is read as records of `kind`.
    pub fn from_json_as(value: Value, kind: SeriesKind) -> Self {
        match (value, kind) {
            (Value::Array(records), SeriesKind::Point) => RawPayload::Points(records),
            (Value::Array(records), SeriesKind::Candle) => RawPayload::Candles(records),
            (value, _) => Self::from_json(value),
        }
    }

    /// OHLC arrays become one `Ohlc` payload. Any other array or object members turn the
    /// whole body into a bundle, with the OHLC part as one of its members.
    fn from_object(object: Map<String, Value>) -> Self {
        let (ohlc, rest): (Map<String, Value>, Map<String, Value>) = object
            .into_iter()
            .partition(|(name, member)| is_ohlc_member(name, member));

        let mut members: BTreeMap<String, RawPayload> = rest
            .into_iter()
            .filter(|(_, member)| member.is_array() || member.is_object())
            .map(|(name, member)| (name, RawPayload::from_json(member)))
            .collect();

        if ohlc.is_empty() {
            return RawPayload::Bundle(members);
        }

        let name = raw::COMBINED_OHLC_KEYS
            .iter()
            .find(|key| ohlc.contains_key(**key))
            .map_or(OHLC_MEMBER, |key| *key)
            .to_string();
        let payload = Self::ohlc_from(&ohlc);
        if members.is_empty() {
            return payload;
        }
        members.insert(name, payload);
        RawPayload::Bundle(members)
    }

    fn ohlc_from(object: &Map<String, Value>) -> Self {
        let component = |keys: &[&str]| raw::array_field(object, keys).unwrap_or_default();
        RawPayload::Ohlc {
            combined: raw::array_field(object, raw::COMBINED_OHLC_KEYS),
            components: OhlcComponents {
                open: component(raw::OPEN_KEYS),
                high: component(raw::HIGH_KEYS),
                low: component(raw::LOW_KEYS),
                close: component(raw::CLOSE_KEYS),
            },
        }
    }
}

/// Bundle member name for OHLC arrays that arrive without a combined key.
const OHLC_MEMBER: &str = "ohlc";

const OHLC_KEY_GROUPS: [&[&str]; 5] = [
    raw::COMBINED_OHLC_KEYS,
    raw::OPEN_KEYS,
    raw::HIGH_KEYS,
    raw::LOW_KEYS,
    raw::CLOSE_KEYS,
];

fn is_ohlc_member(name: &str, member: &Value) -> bool {
    member.is_array() && OHLC_KEY_GROUPS.iter().any(|keys| keys.contains(&name))
}

/// Decided by the first record that names an open or a value, so malformed leading
/// records do not reclassify the whole array.
fn looks_like_candles(records: &[Value]) -> bool {
    records
        .iter()
        .filter_map(Value::as_object)
        .find_map(|record| {
            if raw::field(record, raw::OPEN_KEYS).is_some() {
                Some(true)
            } else if raw::field(record, raw::VALUE_KEYS).is_some() {
                Some(false)
            } else {
                None
            }
        })
        .unwrap_or(false)
}

/// Runs a raw payload through the normalizer (and synthesizer where needed).
pub fn normalize_payload(payload: RawPayload) -> Normalized<CanonicalSeries> {
    match payload {
        RawPayload::Points(records) => normalizer::normalize(&records, SeriesKind::Point),
        RawPayload::Candles(records) => normalizer::normalize(&records, SeriesKind::Candle),
        RawPayload::Ohlc {
            combined,
            components,
        } => match synthesizer::combined_source(combined.as_deref()) {
            Some(records) => normalizer::normalize(records, SeriesKind::Candle),
            None => {
                let Normalized { series, report } = synthesizer::synthesize(&components);
                Normalized {
                    series: CanonicalSeries::Candles(series),
                    report,
                }
            }
        },
        RawPayload::Bundle(members) => {
            let mut report = NormalizeReport::default();
            let mut series = BTreeMap::new();
            for (name, member) in members {
                let normalized = normalize_payload(member);
                report.merge(normalized.report, Some(&name));
                series.insert(name, normalized.series);
            }
            Normalized {
                series: CanonicalSeries::Bundle(series),
                report,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candle, Point};
    use serde_json::json;

    #[test]
    fn test_shape_detection() {
        struct TestCase {
            input: Value,
            expected: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0: flat point array
                input: json!([{"time": 1, "value": 2}]),
                expected: "points",
            },
            TestCase {
                // TC1: combined candle array
                input: json!([{"time": 1, "o": 1, "h": 2, "l": 0, "c": 1}]),
                expected: "candles",
            },
            TestCase {
                // TC2: parallel component arrays
                input: json!({"open": [], "high": [], "low": [], "close": []}),
                expected: "ohlc",
            },
            TestCase {
                // TC3: combined array under an object key
                input: json!({"candles": []}),
                expected: "ohlc",
            },
            TestCase {
                // TC4: named members
                input: json!({"buy": [], "sell": [], "meta": "ignored"}),
                expected: "bundle",
            },
            TestCase {
                // TC5: scalar body
                input: json!("nothing"),
                expected: "points",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = match RawPayload::from_json(test.input) {
                RawPayload::Points(_) => "points",
                RawPayload::Candles(_) => "candles",
                RawPayload::Ohlc { .. } => "ohlc",
                RawPayload::Bundle(_) => "bundle",
            };
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_bundle_skips_scalar_members() {
        let payload = RawPayload::from_json(json!({"buy": [], "sell": [], "meta": "ignored"}));
        let RawPayload::Bundle(members) = payload else {
            panic!("expected a bundle");
        };
        assert_eq!(members.keys().collect::<Vec<_>>(), vec!["buy", "sell"]);
    }

    #[test]
    fn test_combined_array_is_authoritative() {
        let payload = RawPayload::from_json(json!({
            "ohlc": [{"time": 1, "open": 10, "high": 12, "low": 9, "close": 11}],
            "open": [{"time": 1, "value": 99}],
            "high": [{"time": 1, "value": 99}],
            "low": [{"time": 1, "value": 99}],
            "close": [{"time": 1, "value": 99}],
        }));
        let normalized = normalize_payload(payload);
        assert_eq!(
            normalized.series.as_candles().unwrap().as_slice(),
            &[Candle::new(1, 10.0, 12.0, 9.0, 11.0)]
        );
    }

    #[test]
    fn test_missing_combined_array_uses_synthesizer() {
        let payload = RawPayload::from_json(json!({
            "ohlc": [],
            "open": [{"t": 1, "v": 10}],
            "high": [{"t": 1, "v": 12}],
            "low": [{"t": 1, "v": 9}],
            "close": [{"t": 1, "v": 11}],
        }));
        let normalized = normalize_payload(payload);
        assert_eq!(
            normalized.series.as_candles().unwrap().as_slice(),
            &[Candle::new(1, 10.0, 12.0, 9.0, 11.0)]
        );
    }

    #[test]
    fn test_bundle_members_are_normalized_and_labelled() {
        let payload = RawPayload::from_json(json!({
            "buy": [{"time": 2, "value": 1.5}, {"time": 1, "value": "x"}],
            "sell": [{"time": 1, "value": 1.25}],
        }));
        let normalized = normalize_payload(payload);
        assert_eq!(
            normalized.series.member("buy").and_then(CanonicalSeries::as_points).unwrap().as_slice(),
            &[Point::new(2, 1.5)]
        );
        assert_eq!(normalized.series.len(), 2);
        assert_eq!(normalized.report.dropped.len(), 1);
        assert_eq!(normalized.report.dropped[0].series.as_deref(), Some("buy"));
    }

    #[test]
    fn test_malformed_leading_candle_keeps_the_rest() {
        struct TestCase {
            first: Value,
        }

        let tests = vec![
            TestCase {
                // TC0: null open
                first: json!({"time": 1, "open": null, "high": 2, "low": 0.5, "close": 1.5}),
            },
            TestCase {
                // TC1: not an object
                first: json!(null),
            },
            TestCase {
                // TC2: object without any price field
                first: json!({"time": 1}),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let body = json!([
                test.first,
                {"time": 2, "open": 1, "high": 2, "low": 0.5, "close": 1.5},
                {"time": 3, "open": 1.5, "high": 2.5, "low": 1, "close": 2},
            ]);
            let normalized = normalize_payload(RawPayload::from_json(body));
            let candles = normalized.series.as_candles();
            assert_eq!(
                candles.map(|candles| candles.times().collect::<Vec<_>>()),
                Some(vec![2, 3]),
                "TC{} failed",
                index
            );
            assert_eq!(normalized.report.dropped.len(), 1, "TC{} failed", index);
            assert_eq!(normalized.report.dropped[0].index, 0, "TC{} failed", index);
        }
    }

    #[test]
    fn test_ohlc_next_to_other_members_becomes_bundle() {
        let payload = RawPayload::from_json(json!({
            "candles": [{"time": 1, "open": 10, "high": 12, "low": 9, "close": 11}],
            "prediction": [{"time": 2, "value": 3}, {"time": 3}],
        }));
        let RawPayload::Bundle(members) = &payload else {
            panic!("expected a bundle");
        };
        assert_eq!(members.keys().collect::<Vec<_>>(), vec!["candles", "prediction"]);

        let normalized = normalize_payload(payload);
        assert_eq!(
            normalized.series.member("candles").and_then(CanonicalSeries::as_candles).unwrap().as_slice(),
            &[Candle::new(1, 10.0, 12.0, 9.0, 11.0)]
        );
        assert_eq!(
            normalized.series.member("prediction").and_then(CanonicalSeries::as_points).unwrap().as_slice(),
            &[Point::new(2, 3.0)]
        );
        assert_eq!(normalized.report.dropped[0].series.as_deref(), Some("prediction"));
    }

    #[test]
    fn test_component_arrays_next_to_other_members() {
        let payload = RawPayload::from_json(json!({
            "open": [{"t": 1, "v": 10}],
            "high": [{"t": 1, "v": 12}],
            "low": [{"t": 1, "v": 9}],
            "close": [{"t": 1, "v": 11}],
            "volume": [{"t": 1, "v": 500}],
        }));
        let normalized = normalize_payload(payload);
        assert_eq!(
            normalized.series.member("ohlc").and_then(CanonicalSeries::as_candles).unwrap().as_slice(),
            &[Candle::new(1, 10.0, 12.0, 9.0, 11.0)]
        );
        assert_eq!(
            normalized.series.member("volume").and_then(CanonicalSeries::as_points).unwrap().as_slice(),
            &[Point::new(1, 500.0)]
        );
    }

    #[test]
    fn test_from_json_as_forces_record_kind() {
        let body = json!([{"time": 1, "open": 1, "high": 2, "low": 0.5, "close": 1}]);
        assert!(matches!(
            RawPayload::from_json_as(body.clone(), SeriesKind::Point),
            RawPayload::Points(_)
        ));
        assert!(matches!(
            RawPayload::from_json_as(body, SeriesKind::Candle),
            RawPayload::Candles(_)
        ));
    }
}
