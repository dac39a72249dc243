use serde::{Deserialize, Serialize};

use crate::domain::Timestamped;

// Define the Candle struct with all its properties
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub time: i64,

    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

// Implement methods for the Candle struct
impl Candle {
    // A constructor for convenience
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Candle {
            time,
            open,
            high,
            low,
            close,
        }
    }

    /// True when upstream delivered `high` below `low`.
    pub fn is_inverted(&self) -> bool {
        self.high < self.low
    }

    /// Best-effort repair: swaps `high` and `low` when they arrive inverted.
    /// `open` and `close` are never touched. Returns whether a swap happened.
    pub fn repair_inverted_range(&mut self) -> bool {
        if self.is_inverted() {
            std::mem::swap(&mut self.high, &mut self.low);
            true
        } else {
            false
        }
    }
}

impl Timestamped for Candle {
    fn time(&self) -> i64 {
        self.time
    }

    fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite())
    }
}
