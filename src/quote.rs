use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    Gold,
    Silver,
}

impl Instrument {
    pub const ALL: [Instrument; 2] = [Instrument::Gold, Instrument::Silver];

    /// Quote pair requested from the upstream API.
    pub fn symbol(self) -> &'static str {
        match self {
            Instrument::Gold => "XAU/USD",
            Instrument::Silver => "XAG/USD",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Instrument::Gold => "gold",
            Instrument::Silver => "silver",
        };
        f.write_str(label)
    }
}

/// One validated upstream quote. Bid and ask are never absent here; when the
/// API omits them the last-trade price stands in, so downstream consumers see
/// a possibly-stale value rather than a hole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuoteReading {
    pub instrument: Instrument,
    pub price: f64,
    pub bid: f64,
    pub ask: f64,
}

impl QuoteReading {
    pub fn from_parts(instrument: Instrument, price: f64, bid: Option<f64>, ask: Option<f64>) -> Self {
        Self {
            instrument,
            price,
            bid: bid.unwrap_or(price),
            ask: ask.unwrap_or(price),
        }
    }
}
