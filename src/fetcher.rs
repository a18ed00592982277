use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::config::IngestConfig;
use crate::logging;
use crate::pipeline::RunFailure;
use crate::quote::{Instrument, QuoteReading};

/// Per-request timeout; the whole run carries its own tighter budget on top.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the upstream quote API. Built once at startup; the inner
/// reqwest client pools connections for the lifetime of the process.
pub struct RateFetcher {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RateFetcher {
    pub fn new(config: &IngestConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Fetch both tracked instruments concurrently. Fails fast on the first
    /// rejected quote; there is no partial-success path.
    pub async fn fetch_pair(&self) -> Result<(QuoteReading, QuoteReading), RunFailure> {
        tokio::try_join!(
            self.fetch_quote(Instrument::Gold),
            self.fetch_quote(Instrument::Silver),
        )
    }

    pub async fn fetch_quote(&self, instrument: Instrument) -> Result<QuoteReading, RunFailure> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("symbol", instrument.symbol()), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| RunFailure::Network { instrument, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RunFailure::Transport {
                instrument,
                status: status.as_u16(),
            });
        }

        let body: QuoteBody = response
            .json()
            .await
            .map_err(|source| RunFailure::Network { instrument, source })?;

        if body.is_error() {
            return Err(RunFailure::Api {
                instrument,
                message: body.error_message(),
            });
        }

        let price = match body.price {
            Some(price) if price.is_finite() && price > 0.0 => price,
            _ => return Err(RunFailure::ZeroPrice { instrument }),
        };

        logging::info(
            "fetch.quote",
            "quote accepted",
            json!({
                "instrument": instrument.to_string(),
                "symbol": instrument.symbol(),
                "price": price,
            }),
        );

        Ok(QuoteReading::from_parts(
            instrument,
            price,
            sanitize_side(body.bid),
            sanitize_side(body.ask),
        ))
    }
}

/// A bid or ask that does not parse to a positive finite number is treated as
/// absent, which routes it through the last-trade substitution.
fn sanitize_side(side: Option<f64>) -> Option<f64> {
    side.filter(|value| value.is_finite() && *value > 0.0)
}

/// Upstream response body. The API is untrusted: numeric fields arrive as
/// strings or numbers, and an error can hide behind a 200 status via the
/// `status`/`message` pair.
#[derive(Debug, Default, Deserialize)]
struct QuoteBody {
    #[serde(default, deserialize_with = "lenient_price")]
    price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_price")]
    bid: Option<f64>,
    #[serde(default, deserialize_with = "lenient_price")]
    ask: Option<f64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl QuoteBody {
    fn is_error(&self) -> bool {
        matches!(self.status.as_deref(), Some(status) if status.eq_ignore_ascii_case("error"))
    }

    fn error_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "quote api reported an error without a message".to_string())
    }
}

fn lenient_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> QuoteBody {
        serde_json::from_str(raw).expect("quote body")
    }

    #[test]
    fn accepts_string_and_numeric_prices() {
        let body = parse(r#"{"price": "2000.50", "bid": 2000.0, "ask": "2001.00"}"#);
        assert_eq!(body.price, Some(2000.5));
        assert_eq!(body.bid, Some(2000.0));
        assert_eq!(body.ask, Some(2001.0));
    }

    #[test]
    fn unparsable_fields_become_absent() {
        let body = parse(r#"{"price": "n/a", "bid": null, "ask": true}"#);
        assert_eq!(body.price, None);
        assert_eq!(body.bid, None);
        assert_eq!(body.ask, None);
    }

    #[test]
    fn missing_fields_become_absent() {
        let body = parse(r#"{"price": "25.00"}"#);
        assert_eq!(body.price, Some(25.0));
        assert_eq!(body.bid, None);
        assert_eq!(body.ask, None);
    }

    #[test]
    fn error_status_is_detected_case_insensitively() {
        let body = parse(r#"{"status": "Error", "message": "symbol unavailable"}"#);
        assert!(body.is_error());
        assert_eq!(body.error_message(), "symbol unavailable");
    }

    #[test]
    fn ok_status_is_not_an_error() {
        let body = parse(r#"{"status": "ok", "price": "25.00"}"#);
        assert!(!body.is_error());
    }

    #[test]
    fn error_without_message_gets_a_placeholder() {
        let body = parse(r#"{"status": "error"}"#);
        assert!(body.is_error());
        assert!(!body.error_message().is_empty());
    }

    #[test]
    fn negative_or_nonfinite_sides_are_dropped() {
        assert_eq!(sanitize_side(Some(-1.0)), None);
        assert_eq!(sanitize_side(Some(f64::NAN)), None);
        assert_eq!(sanitize_side(Some(0.0)), None);
        assert_eq!(sanitize_side(Some(25.0)), Some(25.0));
    }
}
