use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::constants::RATES_DOC_ID;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io failure: {0}")]
    Io(#[from] io::Error),

    #[error("store document is not valid json: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("store document has an unexpected shape: {0}")]
    Shape(&'static str),
}

/// The singleton latest-rates snapshot. Every successful run overwrites the
/// fields below by merge; fields written by other tools survive untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRatesRecord {
    pub gold_price: f64,
    pub gold_bid: f64,
    pub gold_ask: f64,
    pub silver_price: f64,
    pub silver_bid: f64,
    pub silver_ask: f64,
    /// Assigned by the store at write time.
    pub updated_at_ms: u64,
    /// Computed by the writer when the quotes were fetched, ISO-8601.
    pub fetched_at: String,
    pub source: String,
}

/// The client-computed portion of a write. The store adds `updated_at_ms`.
#[derive(Debug, Clone, Serialize)]
pub struct RatesPatch {
    pub gold_price: f64,
    pub gold_bid: f64,
    pub gold_ask: f64,
    pub silver_price: f64,
    pub silver_bid: f64,
    pub silver_ask: f64,
    pub fetched_at: String,
    pub source: String,
}

#[async_trait]
pub trait RateStore: Send + Sync {
    /// Merge-upsert: create the record if absent, otherwise overwrite only
    /// the supplied fields. Returns the record as persisted.
    async fn merge_latest(&self, patch: RatesPatch) -> Result<MarketRatesRecord, StoreError>;

    async fn load_latest(&self) -> Result<Option<MarketRatesRecord>, StoreError>;
}

/// Document store backed by a single JSON file: one top-level object mapping
/// document ids to documents, with `live_rates` the only id this component
/// touches. Writes go through a temp file and rename so a crashed run never
/// leaves a half-written document behind.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn read_collection(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice::<Value>(&raw)? {
            Value::Object(collection) => Ok(collection),
            _ => Err(StoreError::Shape("top-level collection is not an object")),
        }
    }

    async fn write_collection(&self, collection: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let payload = serde_json::to_vec_pretty(&Value::Object(collection.clone()))?;
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, payload).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl RateStore for JsonFileStore {
    async fn merge_latest(&self, patch: RatesPatch) -> Result<MarketRatesRecord, StoreError> {
        let mut collection = self.read_collection().await?;

        let mut document = match collection.remove(RATES_DOC_ID) {
            Some(Value::Object(document)) => document,
            Some(_) => return Err(StoreError::Shape("rates document is not an object")),
            None => Map::new(),
        };

        let Value::Object(fields) = serde_json::to_value(&patch)? else {
            return Err(StoreError::Shape("rates patch did not serialize to an object"));
        };
        for (key, value) in fields {
            document.insert(key, value);
        }
        document.insert("updated_at_ms".to_string(), Value::from(current_timestamp_ms()));

        let record: MarketRatesRecord = serde_json::from_value(Value::Object(document.clone()))?;

        collection.insert(RATES_DOC_ID.to_string(), Value::Object(document));
        self.write_collection(&collection).await?;

        Ok(record)
    }

    async fn load_latest(&self) -> Result<Option<MarketRatesRecord>, StoreError> {
        let collection = self.read_collection().await?;
        match collection.get(RATES_DOC_ID) {
            Some(document) => Ok(Some(serde_json::from_value(document.clone())?)),
            None => Ok(None),
        }
    }
}

fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as u64
}
