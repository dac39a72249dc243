use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Number, Value, json},
    std::{collections::BTreeMap, fmt, str::FromStr},
    thiserror::Error,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DatasetError {
    #[error("dataset type must not be empty")]
    Empty,
    #[error("dataset type {0:?} contains the reserved key separator ':'")]
    ReservedSeparator(String),
}

/// Names one kind of dataset ("spot_price", "bar_ohlc", "prediction", ...).
/// Each dataset type owns a distinct key prefix in the shared store.
#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetType(String);

impl DatasetType {
    pub const SEPARATOR: char = ':';

    pub fn new(name: impl Into<String>) -> Result<Self, DatasetError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DatasetError::Empty);
        }
        if name.contains(Self::SEPARATOR) {
            return Err(DatasetError::ReservedSeparator(name));
        }
        Ok(DatasetType(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DatasetType {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasetType::new(s)
    }
}

impl TryFrom<String> for DatasetType {
    type Error = DatasetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DatasetType::new(value)
    }
}

impl From<DatasetType> for String {
    fn from(value: DatasetType) -> Self {
        value.0
    }
}

/// A primitive request parameter (model id, category, ...).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Typed JSON form used by the canonical key encoding.
    /// `Int(5)`, `Float(5.0)` and `Text("5")` all encode differently.
    fn to_key_json(&self) -> Value {
        match self {
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Int(i) => Value::from(*i),
            // Non-finite floats have no JSON number form; tag them so they cannot collide with text.
            ParamValue::Float(f) => match Number::from_f64(*f) {
                Some(number) => Value::Number(number),
                None => json!({ "f": f.to_string() }),
            },
            ParamValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

/// The small parameter map a dataset request is made with.
/// Ordered, so equal bags always encode to the same key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct ParamBag(BTreeMap<String, ParamValue>);

impl ParamBag {
    pub fn new() -> Self {
        ParamBag(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Deterministic, injective text form: a JSON object with sorted keys and typed values.
    pub fn canonical(&self) -> String {
        let object: Map<String, Value> = self
            .0
            .iter()
            .map(|(name, value)| (name.clone(), value.to_key_json()))
            .collect();
        Value::Object(object).to_string()
    }
}

impl<K, V> FromIterator<(K, V)> for ParamBag
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ParamBag(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_type_validation() {
        assert_eq!(DatasetType::new("spot_price").unwrap().as_str(), "spot_price");
        assert_eq!(DatasetType::new(""), Err(DatasetError::Empty));
        assert_eq!(
            "bar:ohlc".parse::<DatasetType>(),
            Err(DatasetError::ReservedSeparator("bar:ohlc".to_string()))
        );
        assert!(serde_json::from_str::<DatasetType>(r#""a:b""#).is_err());
    }

    #[test]
    fn test_canonical_ignores_insertion_order() {
        let a = ParamBag::new().with("model", 3).with("category", "gold");
        let b = ParamBag::new().with("category", "gold").with("model", 3);
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), r#"{"category":"gold","model":3}"#);
    }

    #[test]
    fn test_canonical_distinguishes_value_types() {
        let encodings = [
            ParamBag::new().with("model", 5).canonical(),
            ParamBag::new().with("model", 5.0).canonical(),
            ParamBag::new().with("model", "5").canonical(),
            ParamBag::new().with("model", true).canonical(),
        ];
        for (i, a) in encodings.iter().enumerate() {
            for b in encodings.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_canonical_survives_non_finite_floats() {
        let bag = ParamBag::new().with("scale", f64::NAN);
        assert_eq!(bag.canonical(), r#"{"scale":{"f":"NaN"}}"#);
        assert_eq!(ParamBag::new().canonical(), "{}");
    }

    #[test]
    fn test_non_finite_float_does_not_collide_with_text() {
        struct TestCase {
            float: f64,
            text: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0
                float: f64::NAN,
                text: "NaN",
            },
            TestCase {
                // TC1
                float: f64::INFINITY,
                text: "inf",
            },
            TestCase {
                // TC2
                float: f64::NEG_INFINITY,
                text: "-inf",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let float = ParamBag::new().with("scale", test.float).canonical();
            let text = ParamBag::new().with("scale", test.text).canonical();
            assert_ne!(float, text, "TC{} failed", index);
        }
    }

    #[test]
    fn test_param_bag_from_iterator() {
        let bag: ParamBag = [("model", "lstm"), ("category", "gold")].into_iter().collect();
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get("model"), Some(&ParamValue::Text("lstm".to_string())));
    }
}
