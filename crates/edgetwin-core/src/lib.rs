//! edgetwin core
//!
//! Device twins expose a uniform read / write / subscribe / call surface over
//! devices whose data comes from very different places. This crate provides:
//! - the catalog and device data model
//! - the [`DeviceTwin`] interface and the shared lifecycle controller [`Twin`]
//! - the polling subscription engine with cooperative cancellation
//! - the method registry and the [`DataSource`] strategy seam

pub mod catalog;
pub mod config;
pub mod data;
pub mod error;
pub mod method;
pub mod protocol;
pub mod rng;
pub mod source;
pub mod subscription;
pub mod twin;
pub mod value;

pub use catalog::{Device, Product, ProductEvent, ProductField, ProductMethod, ProductProperty};
pub use config::TwinConfig;
pub use data::{DataBatch, DeviceData, DeviceDataWrapper, DeviceState, DeviceStatus, MULTI_PROPS_ID};
pub use error::{ErrorKind, TwinError, TwinResult};
pub use method::{Method, MethodRegistry};
pub use protocol::{Protocol, TwinFactory};
pub use rng::{FaultInjector, SharedRng};
pub use source::{DataSource, WriteReport};
pub use subscription::SubscriptionEnd;
pub use twin::{DeviceTwin, LifecycleState, Twin};
pub use value::{Value, ValueType};

// Re-exported so hosts and drivers share one cancellation type
pub use tokio_util::sync::CancellationToken;
