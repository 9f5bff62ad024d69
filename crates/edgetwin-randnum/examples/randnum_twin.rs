//! Drive a random number twin through its whole lifecycle
//!
//! Run with `RUST_LOG=debug` to see every emitted batch.

use anyhow::Result;
use edgetwin_core::{
    CancellationToken, DataBatch, Device, DeviceData, DeviceTwin, Product, ValueType,
    MULTI_PROPS_ID,
};
use edgetwin_randnum::{METHOD_INPUT_NAME_N, METHOD_NAME_INTN};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const CATALOG: &str = r#"{
    "id": "dice",
    "protocol": "randnum",
    "properties": [
        {"id": "d100", "field_type": "int"},
        {"id": "ratio", "field_type": "float"}
    ],
    "events": [
        {"id": "roll", "outs": [{"id": "d100", "field_type": "int"}]}
    ],
    "methods": [
        {"id": "Intn", "ins": [{"id": "n", "field_type": "int"}], "outs": [{"id": "v", "field_type": "int"}]}
    ]
}"#;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== edgetwin random number example ===\n");

    let product: Product = serde_json::from_str(CATALOG)?;
    let device = Device::new("dice-1", &product.id);
    let config = edgetwin_randnum::default_config().with_subscribe_interval(Duration::from_secs(1));
    let twin = edgetwin_randnum::random_number_twin(Arc::new(product), Arc::new(device), config);

    twin.initialize()?;
    let root = CancellationToken::new();
    // Start fails now and then on purpose; retry like a host supervisor would
    while let Err(err) = twin.start(&root) {
        println!("start failed ({err}), retrying");
    }

    println!("Health: {}", twin.health_check()?.state);

    println!("\nReading all properties:");
    for data in twin.read(MULTI_PROPS_ID).await?.values() {
        println!("  {data}");
    }

    let ins = DataBatch::from([(
        METHOD_INPUT_NAME_N.to_string(),
        DeviceData::new(METHOD_INPUT_NAME_N, ValueType::Int, 6)?,
    )]);
    let outs = twin.call(METHOD_NAME_INTN, &ins)?;
    println!("\nIntn(6) -> {:?}", outs.values().map(ToString::to_string).collect::<Vec<_>>());

    println!("\nSubscribing to 'roll' for 3 seconds...");
    let (tx, mut rx) = mpsc::channel(16);
    twin.subscribe("roll", tx)?;
    tokio::time::sleep(Duration::from_millis(3500)).await;
    twin.stop(false)?;

    while let Some(batch) = rx.recv().await {
        for data in batch.properties.values() {
            println!("  {} {}", batch.func_id, data);
        }
    }
    println!("\nTwin state: {}", twin.state());

    Ok(())
}
