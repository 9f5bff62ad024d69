//! Lifecycle, read/write and subscription tests against a fixed data source

use async_trait::async_trait;
use edgetwin_core::{
    CancellationToken, DataBatch, DataSource, Device, DeviceData, DeviceState, DeviceTwin,
    ErrorKind, FaultInjector, LifecycleState, MethodRegistry, Product, ProductEvent,
    ProductField, ProductMethod, ProductProperty, SharedRng, Twin, TwinConfig, TwinResult,
    ValueType, WriteReport, MULTI_PROPS_ID,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Always reports 1 for every field; optionally accepts writes
struct FixedSource {
    writable: bool,
    written: Mutex<Vec<String>>,
    methods: MethodRegistry,
}

impl FixedSource {
    fn new(writable: bool) -> Self {
        let methods = MethodRegistry::new().with("Ping", |_: &DataBatch| -> TwinResult<DataBatch> {
            Ok(DataBatch::new())
        });
        Self {
            writable,
            written: Mutex::new(Vec::new()),
            methods,
        }
    }
}

#[async_trait]
impl DataSource for FixedSource {
    async fn sample(&self, _device: &Device, fields: &[ProductField]) -> TwinResult<DataBatch> {
        fields
            .iter()
            .map(|f| DeviceData::new(&f.id, f.field_type, 1).map(|dd| (f.id.clone(), dd)))
            .collect()
    }

    fn methods(&self) -> &MethodRegistry {
        &self.methods
    }

    fn writable(&self) -> bool {
        self.writable
    }

    async fn write(&self, _device: &Device, values: &DataBatch) -> TwinResult<WriteReport> {
        let mut written = self.written.lock().unwrap();
        Ok(values
            .keys()
            .map(|id| {
                written.push(id.clone());
                (id.clone(), Ok(()))
            })
            .collect())
    }
}

fn product() -> Product {
    let mut setpoint = ProductProperty::new("setpoint", ValueType::Float);
    setpoint.writeable = true;
    Product::new("thermo", "fixed")
        .with_property(ProductProperty::new("temperature", ValueType::Float))
        .with_property(ProductProperty::new("count", ValueType::Int))
        .with_property(setpoint)
        .with_event(ProductEvent::new(
            "tick",
            vec![ProductField::new("count", ValueType::Int)],
        ))
        .with_event(ProductEvent::new(
            "tock",
            vec![ProductField::new("temperature", ValueType::Float)],
        ))
        .with_method(ProductMethod::new("Ping", vec![], vec![]))
}

fn twin_with(source: FixedSource, faults: FaultInjector) -> Twin<FixedSource> {
    Twin::with_faults(
        Arc::new(product()),
        Arc::new(Device::new("thermo-1", "thermo")),
        source,
        TwinConfig::default().with_subscribe_interval(Duration::from_secs(15)),
        faults,
    )
}

fn twin() -> Twin<FixedSource> {
    twin_with(FixedSource::new(false), FaultInjector::disabled())
}

fn value(id: &str, ty: ValueType, v: f64) -> (String, DeviceData) {
    (id.to_string(), DeviceData::new(id, ty, v).unwrap())
}

#[test]
fn test_lifecycle_transitions() {
    let twin = twin();
    let root = CancellationToken::new();
    assert_eq!(twin.state(), LifecycleState::Created);

    let err = twin.start(&root).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceTwin);

    twin.initialize().unwrap();
    assert_eq!(twin.state(), LifecycleState::Initialized);
    assert_eq!(twin.initialize().unwrap_err().kind(), ErrorKind::DeviceTwin);

    twin.start(&root).unwrap();
    assert_eq!(twin.state(), LifecycleState::Running);
    assert_eq!(twin.start(&root).unwrap_err().kind(), ErrorKind::DeviceTwin);

    twin.stop(false).unwrap();
    assert_eq!(twin.state(), LifecycleState::Stopped);
    twin.stop(false).unwrap();

    // Restart gets a fresh scope
    twin.start(&root).unwrap();
    assert_eq!(twin.state(), LifecycleState::Running);
    twin.stop(true).unwrap();
}

#[test]
fn test_initialize_rejects_unsupported_method() {
    let product = product().with_method(ProductMethod::new("Reboot", vec![], vec![]));
    let twin = Twin::new(
        Arc::new(product),
        Arc::new(Device::new("thermo-1", "thermo")),
        FixedSource::new(false),
        TwinConfig::default(),
    );
    let err = twin.initialize().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceTwin);
    assert!(err.to_string().contains("unsupported method: Reboot"));
    assert!(!err.is_retryable());
    assert_eq!(twin.state(), LifecycleState::Created);
}

#[test]
fn test_start_fault_keeps_state() {
    let twin = twin_with(
        FixedSource::new(false),
        FaultInjector::new(1.0, 0.0, SharedRng::with_seed(3)),
    );
    twin.initialize().unwrap();
    let err = twin.start(&CancellationToken::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceTwin);
    assert!(err.is_retryable());
    assert_eq!(twin.state(), LifecycleState::Initialized);
}

#[test]
fn test_health_check() {
    let flaky = twin_with(
        FixedSource::new(false),
        FaultInjector::new(0.0, 1.0, SharedRng::with_seed(3)),
    );
    flaky.initialize().unwrap();
    assert_eq!(
        flaky.health_check().unwrap().state,
        DeviceState::Disconnected
    );
    flaky.start(&CancellationToken::new()).unwrap();
    let status = flaky.health_check().unwrap();
    assert_eq!(status.state, DeviceState::Exception);
    assert_eq!(status.device.id, "thermo-1");
    assert_eq!(flaky.state(), LifecycleState::Running);

    let steady = twin();
    steady.initialize().unwrap();
    steady.start(&CancellationToken::new()).unwrap();
    for _ in 0..20 {
        assert_eq!(steady.health_check().unwrap().state, DeviceState::Connected);
    }
}

#[tokio::test]
async fn test_read_single_and_all() {
    let twin = twin();
    twin.initialize().unwrap();

    let one = twin.read("temperature").await.unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one["temperature"].value_type(), ValueType::Float);

    let all = twin.read(MULTI_PROPS_ID).await.unwrap();
    let keys: Vec<_> = all.keys().cloned().collect();
    assert_eq!(keys, vec!["count", "setpoint", "temperature"]);

    let err = twin.read("humidity").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_read_before_initialize() {
    let err = twin().read("temperature").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceTwin);
}

#[tokio::test]
async fn test_write_read_only_twin() {
    let twin = twin();
    twin.initialize().unwrap();
    let values = DataBatch::from([value("setpoint", ValueType::Float, 21.5)]);
    let err = twin.write("setpoint", values).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MethodNotAllowed);

    let err = twin.write("nope", DataBatch::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MethodNotAllowed);
}

#[tokio::test]
async fn test_write_reports_per_property() {
    let twin = twin_with(FixedSource::new(true), FaultInjector::disabled());
    twin.initialize().unwrap();

    let values = DataBatch::from([
        value("setpoint", ValueType::Float, 21.5),
        value("temperature", ValueType::Float, 30.0),
        value("humidity", ValueType::Float, 0.4),
    ]);
    let report = twin.write(MULTI_PROPS_ID, values).await.unwrap();

    assert!(report["setpoint"].is_ok());
    assert_eq!(
        report["temperature"].as_ref().unwrap_err().kind(),
        ErrorKind::MethodNotAllowed
    );
    assert_eq!(
        report["humidity"].as_ref().unwrap_err().kind(),
        ErrorKind::BadRequest
    );
    assert_eq!(*twin.source().written.lock().unwrap(), vec!["setpoint"]);

    let err = twin.write("humidity", DataBatch::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[test]
fn test_call_dispatch() {
    let twin = twin();
    twin.initialize().unwrap();
    assert!(twin.call("Ping", &DataBatch::new()).unwrap().is_empty());
    let err = twin.call("Reboot", &DataBatch::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_emits_until_stopped() {
    let twin = twin();
    twin.initialize().unwrap();
    twin.start(&CancellationToken::new()).unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    twin.subscribe("tick", tx).unwrap();

    tokio::time::sleep(Duration::from_secs(31)).await;
    twin.stop(false).unwrap();

    let mut batches = Vec::new();
    while let Some(batch) = rx.recv().await {
        batches.push(batch);
    }
    assert_eq!(batches.len(), 2);
    assert!(
        batches[0].properties["count"].timestamp() <= batches[1].properties["count"].timestamp()
    );
    assert_eq!(batches[0].func_id, "tick");
    assert_eq!(batches[0].device_id, "thermo-1");
    assert_eq!(twin.active_subscriptions(), 0);
}

#[tokio::test]
async fn test_subscribe_unknown_event() {
    let twin = twin();
    twin.initialize().unwrap();
    twin.start(&CancellationToken::new()).unwrap();

    let (tx, mut rx) = mpsc::channel(1);
    let err = twin.subscribe("boom", tx).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(twin.active_subscriptions(), 0);
    // The sender was dropped with the rejected call
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_subscribe_requires_running() {
    let twin = twin();
    twin.initialize().unwrap();
    let (tx, _rx) = mpsc::channel(1);
    let err = twin.subscribe("tick", tx).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceTwin);
}

#[tokio::test(start_paused = true)]
async fn test_parent_cancellation_stops_loops() {
    let twin = twin();
    twin.initialize().unwrap();
    let root = CancellationToken::new();
    twin.start(&root).unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    twin.subscribe("tick", tx.clone()).unwrap();
    twin.subscribe("tock", tx).unwrap();
    assert_eq!(twin.active_subscriptions(), 2);

    root.cancel();
    assert!(rx.recv().await.is_none());
    tokio::task::yield_now().await;
    assert_eq!(twin.active_subscriptions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_force_stop_aborts_loops() {
    let twin = twin();
    twin.initialize().unwrap();
    twin.start(&CancellationToken::new()).unwrap();

    // Nobody drains this channel, so loops end up parked on send
    let (tx, _rx) = mpsc::channel(1);
    twin.subscribe("tick", tx.clone()).unwrap();
    twin.subscribe("tock", tx).unwrap();
    tokio::time::sleep(Duration::from_secs(46)).await;

    twin.stop(true).unwrap();
    tokio::task::yield_now().await;
    assert_eq!(twin.active_subscriptions(), 0);
}
