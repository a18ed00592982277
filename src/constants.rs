pub const QUOTE_API_BASE_URL: &str = "https://api.twelvedata.com/price";
pub const STORE_PATH: &str = "live_rates.json";
pub const RATES_DOC_ID: &str = "live_rates";
pub const RATES_SOURCE: &str = "twelvedata";
pub const CADENCE_SECS: u64 = 300;
pub const RUN_TIMEOUT_SECS: u64 = 60;
