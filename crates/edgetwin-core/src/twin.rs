//! Device twin capability interface and its lifecycle controller
//!
//! [`DeviceTwin`] is the surface a host drives. [`Twin`] implements it once
//! for every [`DataSource`]: each driver only supplies where values come
//! from, the lifecycle skeleton is shared.
//!
//! Lifecycle decisions:
//! - `initialize` builds the lookup tables exactly once; a second call fails.
//! - `start` on a running twin fails; `start` after `stop` re-arms a fresh
//!   cancellation scope.
//! - `stop` on a twin that is not running is a no-op.
//! - `stop(true)` additionally aborts every subscription task instead of
//!   waiting for it to observe cancellation at its next suspension point.

use crate::catalog::{Device, EventId, MethodId, Product, ProductEvent, ProductField, PropertyId};
use crate::catalog::{ProductMethod, ProductProperty};
use crate::config::TwinConfig;
use crate::data::{DataBatch, DeviceDataWrapper, DeviceState, DeviceStatus, MULTI_PROPS_ID};
use crate::error::{TwinError, TwinResult};
use crate::rng::{FaultInjector, SharedRng};
use crate::source::{DataSource, WriteReport};
use crate::subscription::{Subscription, SubscriptionEnd};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Uniform surface every device twin exposes to its host
#[async_trait]
pub trait DeviceTwin: Send + Sync {
    /// Validate the catalog and build lookup tables
    fn initialize(&self) -> TwinResult<()>;

    /// Enter the running state under a child of `parent`
    fn start(&self, parent: &CancellationToken) -> TwinResult<()>;

    /// Cancel all subscriptions; returns before they have drained
    fn stop(&self, force: bool) -> TwinResult<()>;

    /// Current device status; never mutates the twin
    fn health_check(&self) -> TwinResult<DeviceStatus>;

    /// Read one property, or every property for [`MULTI_PROPS_ID`]
    async fn read(&self, property_id: &str) -> TwinResult<DataBatch>;

    /// Write property values
    async fn write(&self, property_id: &str, values: DataBatch) -> TwinResult<WriteReport>;

    /// Start polling `event_id`, emitting batches on `bus`.
    ///
    /// Each poll waits for room on `bus`; a bounded channel whose consumer
    /// falls behind slows that subscription down and nothing else.
    fn subscribe(&self, event_id: &str, bus: mpsc::Sender<DeviceDataWrapper>) -> TwinResult<()>;

    /// Invoke a remote method synchronously
    fn call(&self, method_id: &str, ins: &DataBatch) -> TwinResult<DataBatch>;
}

/// Lifecycle state of a twin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Constructed; lookups not built yet
    Created,
    /// Lookups built; not polling
    Initialized,
    /// Holding a live cancellation scope
    Running,
    /// Scope cancelled; may be started again
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Initialized => write!(f, "initialized"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Read-only lookup tables derived from the product at initialize time
#[derive(Debug)]
struct Lookups {
    properties: HashMap<PropertyId, ProductProperty>,
    events: HashMap<EventId, ProductEvent>,
    methods: HashMap<MethodId, ProductMethod>,
}

#[derive(Debug)]
struct Lifecycle {
    state: LifecycleState,
    scope: Option<CancellationToken>,
}

/// Lifecycle controller shared by every twin variant
pub struct Twin<S> {
    product: Arc<Product>,
    device: Arc<Device>,
    source: Arc<S>,
    config: TwinConfig,
    faults: FaultInjector,
    lookups: OnceLock<Lookups>,
    lifecycle: Mutex<Lifecycle>,
    subscriptions: DashMap<Uuid, JoinHandle<SubscriptionEnd>>,
}

impl<S: DataSource> Twin<S> {
    /// Create a twin; fault probabilities come from `config`
    pub fn new(product: Arc<Product>, device: Arc<Device>, source: S, config: TwinConfig) -> Self {
        let config = config.sanitized();
        let faults = FaultInjector::new(
            config.start_failure_probability,
            config.health_exception_probability,
            SharedRng::new(),
        );
        Self::with_faults(product, device, source, config, faults)
    }

    /// Create a twin with an explicit fault injector (deterministic tests)
    pub fn with_faults(
        product: Arc<Product>,
        device: Arc<Device>,
        source: S,
        config: TwinConfig,
        faults: FaultInjector,
    ) -> Self {
        Self {
            product,
            device,
            source: Arc::new(source),
            config: config.sanitized(),
            faults,
            lookups: OnceLock::new(),
            lifecycle: Mutex::new(Lifecycle {
                state: LifecycleState::Created,
                scope: None,
            }),
            subscriptions: DashMap::new(),
        }
    }

    /// Catalog entry this twin serves
    pub fn product(&self) -> &Arc<Product> {
        &self.product
    }

    /// Device this twin stands in for
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Data source backing reads, writes and polls
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Sanitized configuration
    pub fn config(&self) -> &TwinConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.lifecycle().state
    }

    /// Number of polling loops that have not exited yet
    pub fn active_subscriptions(&self) -> usize {
        self.prune_subscriptions();
        self.subscriptions.len()
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        // Critical sections only assign plain fields
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookups(&self) -> TwinResult<&Lookups> {
        self.lookups.get().ok_or_else(|| {
            TwinError::device_twin(format!("the twin of device[{}] is not initialized", self.device.id))
        })
    }

    fn prune_subscriptions(&self) {
        self.subscriptions.retain(|_, handle| !handle.is_finished());
    }

    fn build_lookups(&self) -> TwinResult<Lookups> {
        let properties = self
            .product
            .properties
            .iter()
            .map(|p| (p.id.clone(), p.clone()))
            .collect();
        let events = self
            .product
            .events
            .iter()
            .map(|e| (e.id.clone(), e.clone()))
            .collect();

        let registry = self.source.methods();
        let mut methods = HashMap::new();
        for method in &self.product.methods {
            if !registry.contains(&method.id) {
                return Err(TwinError::device_twin(format!(
                    "unsupported method: {}",
                    method.id
                )));
            }
            methods.insert(method.id.clone(), method.clone());
        }

        Ok(Lookups {
            properties,
            events,
            methods,
        })
    }
}

#[async_trait]
impl<S: DataSource> DeviceTwin for Twin<S> {
    fn initialize(&self) -> TwinResult<()> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.state != LifecycleState::Created {
            return Err(TwinError::device_twin(format!(
                "the twin of device[{}] is already initialized",
                self.device.id
            )));
        }

        let lookups = self.build_lookups()?;
        if self.lookups.set(lookups).is_err() {
            return Err(TwinError::device_twin("lookup tables already built"));
        }
        lifecycle.state = LifecycleState::Initialized;
        drop(lifecycle);

        info!(product = %self.product.id, device = %self.device.id, "twin initialized");
        Ok(())
    }

    fn start(&self, parent: &CancellationToken) -> TwinResult<()> {
        let mut lifecycle = self.lifecycle();
        match lifecycle.state {
            LifecycleState::Created => {
                return Err(TwinError::device_twin(format!(
                    "the twin of device[{}] must be initialized before start",
                    self.device.id
                )))
            }
            LifecycleState::Running => {
                return Err(TwinError::device_twin(format!(
                    "the twin of device[{}] is already running",
                    self.device.id
                )))
            }
            LifecycleState::Initialized | LifecycleState::Stopped => {}
        }

        let scope = parent.child_token();
        if let Err(err) = self.faults.start_probe() {
            warn!(device = %self.device.id, error = %err, "twin failed to start");
            return Err(err);
        }
        lifecycle.scope = Some(scope);
        lifecycle.state = LifecycleState::Running;
        drop(lifecycle);

        info!(product = %self.product.id, device = %self.device.id, "twin started");
        Ok(())
    }

    fn stop(&self, force: bool) -> TwinResult<()> {
        let mut lifecycle = self.lifecycle();
        let Some(scope) = lifecycle.scope.take() else {
            debug!(device = %self.device.id, state = %lifecycle.state, "stop on idle twin ignored");
            return Ok(());
        };
        scope.cancel();
        lifecycle.state = LifecycleState::Stopped;
        drop(lifecycle);

        if force {
            for entry in self.subscriptions.iter() {
                entry.value().abort();
            }
        }
        self.prune_subscriptions();

        info!(product = %self.product.id, device = %self.device.id, force, "twin stopped");
        Ok(())
    }

    fn health_check(&self) -> TwinResult<DeviceStatus> {
        let running = self.state() == LifecycleState::Running;
        let state = if !running {
            DeviceState::Disconnected
        } else if self.faults.health_exception() {
            DeviceState::Exception
        } else {
            DeviceState::Connected
        };
        Ok(DeviceStatus {
            device: Arc::clone(&self.device),
            state,
        })
    }

    async fn read(&self, property_id: &str) -> TwinResult<DataBatch> {
        let lookups = self.lookups()?;
        let fields: Vec<ProductField> = if property_id == MULTI_PROPS_ID {
            // Catalog order keeps the request stable across reads
            self.product
                .properties
                .iter()
                .map(ProductProperty::as_field)
                .collect()
        } else {
            let property = lookups.properties.get(property_id).ok_or_else(|| {
                TwinError::bad_request(format!("undefined property: {property_id}"))
            })?;
            vec![property.as_field()]
        };
        self.source.sample(&self.device, &fields).await
    }

    async fn write(&self, property_id: &str, values: DataBatch) -> TwinResult<WriteReport> {
        if !self.source.writable() {
            return Err(TwinError::method_not_allowed(format!(
                "the product[{}] doesn't support Write",
                self.product.id
            )));
        }
        let lookups = self.lookups()?;
        if property_id != MULTI_PROPS_ID && !lookups.properties.contains_key(property_id) {
            return Err(TwinError::bad_request(format!(
                "undefined property: {property_id}"
            )));
        }

        let mut report = WriteReport::new();
        let mut accepted = DataBatch::new();
        for (id, data) in values {
            match lookups.properties.get(&id) {
                Some(property) if property.writeable => {
                    accepted.insert(id, data);
                }
                Some(_) => {
                    report.insert(
                        id.clone(),
                        Err(TwinError::method_not_allowed(format!("property {id} is read-only"))),
                    );
                }
                None => {
                    report.insert(
                        id.clone(),
                        Err(TwinError::bad_request(format!("undefined property: {id}"))),
                    );
                }
            }
        }
        if !accepted.is_empty() {
            report.extend(self.source.write(&self.device, &accepted).await?);
        }
        Ok(report)
    }

    fn subscribe(&self, event_id: &str, bus: mpsc::Sender<DeviceDataWrapper>) -> TwinResult<()> {
        let event = self
            .lookups()?
            .events
            .get(event_id)
            .cloned()
            .ok_or_else(|| TwinError::bad_request(format!("undefined event: {event_id}")))?;

        let runtime = tokio::runtime::Handle::try_current().map_err(|err| {
            TwinError::device_twin("subscribe must be called within a Tokio runtime").caused_by(err)
        })?;

        let token = {
            let lifecycle = self.lifecycle();
            match (&lifecycle.state, &lifecycle.scope) {
                (LifecycleState::Running, Some(scope)) => scope.clone(),
                (state, _) => {
                    return Err(TwinError::device_twin(format!(
                        "cannot subscribe while the twin is {state}"
                    )))
                }
            }
        };

        let id = Uuid::new_v4();
        let span = info_span!(
            "subscription",
            product = %self.product.id,
            device = %self.device.id,
            event = %event.id,
            %id
        );
        let subscription = Subscription {
            source: Arc::clone(&self.source),
            device: Arc::clone(&self.device),
            product_id: self.product.id.clone(),
            event,
            interval: self.config.subscribe_interval,
            token,
            bus,
        };
        let handle = runtime.spawn(
            async move {
                let end = subscription.run().await;
                debug!(%end, "subscription ended");
                end
            }
            .instrument(span),
        );

        self.prune_subscriptions();
        self.subscriptions.insert(id, handle);
        debug!(device = %self.device.id, event = event_id, "subscribed");
        Ok(())
    }

    fn call(&self, method_id: &str, ins: &DataBatch) -> TwinResult<DataBatch> {
        if !self.lookups()?.methods.contains_key(method_id) {
            return Err(TwinError::bad_request(format!("undefined method: {method_id}")));
        }
        self.source.methods().call(method_id, ins)
    }
}

impl<S> Drop for Twin<S> {
    fn drop(&mut self) {
        // Loops hold their own handles to the source, so cancel them here
        if let Some(scope) = self
            .lifecycle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .scope
            .take()
        {
            scope.cancel();
        }
    }
}

impl<S> fmt::Debug for Twin<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Twin")
            .field("product", &self.product.id)
            .field("device", &self.device.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
