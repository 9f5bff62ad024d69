//! Poll a live stock quote: `cargo run --example stock_quote -- SH600000`
//!
//! The public feed may require a session cookie; point `QUOTE_ENDPOINT` at
//! another compatible feed when it refuses anonymous requests.

use anyhow::Result;
use edgetwin_core::{
    CancellationToken, Device, DeviceTwin, Product, ProductEvent, ProductField, ProductProperty,
    TwinConfig, ValueType, MULTI_PROPS_ID,
};
use edgetwin_stock::{stock_twin, StockConfig, PROTOCOL_ID};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let symbol = std::env::args().nth(1).unwrap_or_else(|| "SH600000".to_string());
    let mut stock = StockConfig::default();
    if let Ok(endpoint) = std::env::var("QUOTE_ENDPOINT") {
        stock.endpoint = endpoint;
    }

    let product = Product::new("stock", PROTOCOL_ID)
        .with_property(ProductProperty::new("current", ValueType::Float))
        .with_property(ProductProperty::new("percent", ValueType::Float))
        .with_event(ProductEvent::new(
            "tick",
            vec![ProductField::new("current", ValueType::Float)],
        ));
    let twin = stock_twin(
        Arc::new(product),
        Arc::new(Device::new(symbol.as_str(), "stock")),
        TwinConfig::default().with_subscribe_interval(Duration::from_secs(5)),
        stock,
    )?;

    twin.initialize()?;
    let root = CancellationToken::new();
    twin.start(&root)?;

    for data in twin.read(MULTI_PROPS_ID).await?.values() {
        println!("{symbol} {data}");
    }

    let (tx, mut rx) = mpsc::channel(8);
    twin.subscribe("tick", tx)?;
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(16)).await;
        root.cancel();
    });
    while let Some(batch) = rx.recv().await {
        for data in batch.properties.values() {
            println!("{symbol} tick {data}");
        }
    }
    twin.stop(false)?;

    Ok(())
}
