//! External-fetch data source backed by an HTTP quote endpoint

use crate::quote::{self, QuoteResponse};
use async_trait::async_trait;
use chrono::Utc;
use edgetwin_core::{DataBatch, DataSource, Device, MethodRegistry, ProductField, TwinError, TwinResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Public realtime quote endpoint
pub const DEFAULT_ENDPOINT: &str = "https://stock.xueqiu.com/v5/stock/realtime/quotec.json";

/// Device property overriding the symbol (defaults to the device id)
pub const SYMBOL_PROP: &str = "symbol";

/// Quote feed client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockConfig {
    /// Quote endpoint; the symbol is passed as the `symbol` query parameter
    pub endpoint: String,

    /// Upper bound on one fetch, so a stuck feed only stalls its own poll
    pub fetch_timeout: Duration,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

/// Reads quotes for the device's symbol on every sample
#[derive(Debug, Clone)]
pub struct StockSource {
    client: reqwest::Client,
    config: StockConfig,
    methods: MethodRegistry,
}

impl StockSource {
    pub fn new(config: StockConfig) -> TwinResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|err| {
                TwinError::device_twin("failed to create HTTP client").caused_by(err)
            })?;
        Ok(Self {
            client,
            config,
            methods: MethodRegistry::new(),
        })
    }

    pub fn config(&self) -> &StockConfig {
        &self.config
    }

    /// Fetch and decode the current quote of `device`
    pub async fn get_quote(&self, device: &Device) -> TwinResult<DataBatch> {
        let symbol = device
            .props
            .get(SYMBOL_PROP)
            .map_or(device.id.as_str(), String::as_str);
        let failed = || format!("failed to read the quote of the stock[{symbol}]");

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| TwinError::internal(failed(), err))?;
        let body = response
            .bytes()
            .await
            .map_err(|err| TwinError::internal(failed(), err))?;
        let ts = Utc::now();

        let quote = QuoteResponse::from_slice(&body)?.into_batch(ts)?;
        debug!(%symbol, fields = quote.len(), "fetched quote");
        Ok(quote)
    }
}

#[async_trait]
impl DataSource for StockSource {
    async fn sample(&self, device: &Device, fields: &[ProductField]) -> TwinResult<DataBatch> {
        let quote = self.get_quote(device).await?;
        quote::project(quote, fields)
    }

    fn methods(&self) -> &MethodRegistry {
        &self.methods
    }
}
