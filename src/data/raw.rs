// Field extraction for loosely-typed upstream records.
// Upstream payload shapes drift, so each field is looked up under a few aliases and
// numbers are accepted either as JSON numbers or as numeric strings.

use serde_json::{Map, Value};

pub(crate) const TIME_KEYS: &[&str] = &["time", "t", "timestamp"];
pub(crate) const VALUE_KEYS: &[&str] = &["value", "v"];
pub(crate) const OPEN_KEYS: &[&str] = &["open", "o"];
pub(crate) const HIGH_KEYS: &[&str] = &["high", "h"];
pub(crate) const LOW_KEYS: &[&str] = &["low", "l"];
pub(crate) const CLOSE_KEYS: &[&str] = &["close", "c"];

/// Keys under which some payloads ship an already-combined OHLC array.
pub(crate) const COMBINED_OHLC_KEYS: &[&str] = &["ohlc", "candles"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldError {
    Missing,
    Invalid,
}

/// First present, non-null value among `keys`.
pub(crate) fn field<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

/// Finite number, from a JSON number or a numeric string.
pub(crate) fn as_finite_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Integral timestamp. Fractional or out-of-range values are rejected.
pub(crate) fn as_timestamp(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    if let Value::String(s) = value {
        if let Ok(i) = s.trim().parse::<i64>() {
            return Some(i);
        }
    }
    let number = as_finite_number(value)?;
    let in_range = number >= i64::MIN as f64 && number < i64::MAX as f64;
    (number.fract() == 0.0 && in_range).then_some(number as i64)
}

pub(crate) fn read_time(record: &Map<String, Value>) -> Result<i64, FieldError> {
    let value = field(record, TIME_KEYS).ok_or(FieldError::Missing)?;
    as_timestamp(value).ok_or(FieldError::Invalid)
}

pub(crate) fn read_number(record: &Map<String, Value>, keys: &[&str]) -> Result<f64, FieldError> {
    let value = field(record, keys).ok_or(FieldError::Missing)?;
    as_finite_number(value).ok_or(FieldError::Invalid)
}

/// Array stored under the first of `keys` that holds one.
pub(crate) fn array_field(record: &Map<String, Value>, keys: &[&str]) -> Option<Vec<Value>> {
    keys.iter()
        .find_map(|key| record.get(*key).and_then(Value::as_array))
        .cloned()
}
