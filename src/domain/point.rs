use serde::{Deserialize, Serialize};

use crate::domain::Timestamped;

/// One sample of a line series (spot price, prediction, change).
/// `time` is in epoch seconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub time: i64,
    pub value: f64,
}

impl Point {
    pub fn new(time: i64, value: f64) -> Self {
        Point { time, value }
    }
}

impl Timestamped for Point {
    fn time(&self) -> i64 {
        self.time
    }

    fn is_finite(&self) -> bool {
        self.value.is_finite()
    }
}
