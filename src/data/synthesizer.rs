//! OHLC Synthesizer: builds candles out of four independent point arrays.
//!
//! Only used when the payload carries no combined candle array of its own.

use {
    crate::{
        data::normalizer::{self, DropReason, DroppedRecord, NormalizeReport, Normalized},
        domain::{Candle, Series},
    },
    serde::{Deserialize, Serialize},
    serde_json::Value,
    std::collections::BTreeMap,
};

/// The four parallel component arrays, each a list of `{time, value}` records.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct OhlcComponents {
    pub open: Vec<Value>,
    pub high: Vec<Value>,
    pub low: Vec<Value>,
    pub close: Vec<Value>,
}

impl OhlcComponents {
    pub fn is_empty(&self) -> bool {
        self.open.is_empty() && self.high.is_empty() && self.low.is_empty() && self.close.is_empty()
    }
}

const COMPONENTS: [&str; 4] = ["open", "high", "low", "close"];

/// open, high, low, close slots for one timestamp.
#[derive(Default)]
struct PartialCandle([Option<f64>; 4]);

impl PartialCandle {
    fn complete(&self, time: i64) -> Option<Candle> {
        let [open, high, low, close] = self.0;
        Some(Candle::new(time, open?, high?, low?, close?))
    }
}

pub fn synthesize(components: &OhlcComponents) -> Normalized<Series<Candle>> {
    let mut report = NormalizeReport::default();
    let mut groups: BTreeMap<i64, PartialCandle> = BTreeMap::new();

    let columns = [
        &components.open,
        &components.high,
        &components.low,
        &components.close,
    ];

    for (slot, (name, records)) in COMPONENTS.into_iter().zip(columns).enumerate() {
        for (index, record) in records.iter().enumerate() {
            match normalizer::parse_point(record) {
                // A later record for the same time replaces the earlier one.
                Ok(point) => groups.entry(point.time).or_default().0[slot] = Some(point.value),
                Err(reason) => report.dropped.push(DroppedRecord {
                    series: Some(name.to_string()),
                    index,
                    reason: component_reason(reason, name),
                }),
            }
        }
    }

    let mut candles = Vec::with_capacity(groups.len());
    for (position, (time, group)) in groups.iter().enumerate() {
        match group.complete(*time) {
            Some(mut candle) => {
                if candle.repair_inverted_range() {
                    report.repaired += 1;
                }
                candles.push((position, candle));
            }
            None => report.incomplete += 1,
        }
    }

    let series = normalizer::canonicalize(candles, &mut report);
    Normalized { series, report }
}

// Component records carry their number under `value`; report the component name instead.
fn component_reason(reason: DropReason, name: &'static str) -> DropReason {
    match reason {
        DropReason::MissingField(_) => DropReason::MissingField(name),
        DropReason::InvalidField(_) => DropReason::InvalidField(name),
        other => other,
    }
}

/// The combined array wins whenever it holds anything.
pub(crate) fn combined_source(combined: Option<&[Value]>) -> Option<&[Value]> {
    combined.filter(|records| !records.is_empty())
}
