//! Data source strategy: where a twin's values come from

use crate::catalog::{Device, ProductField};
use crate::data::DataBatch;
use crate::error::{TwinError, TwinResult};
use crate::method::MethodRegistry;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Per-property outcome of a write
pub type WriteReport = BTreeMap<String, TwinResult<()>>;

/// Produces device data for reads, subscription polls and method calls.
///
/// `sample` may take arbitrarily long (network I/O); twins never call it
/// while holding a lock.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// Produce one value per requested field, keyed by field id
    async fn sample(&self, device: &Device, fields: &[ProductField]) -> TwinResult<DataBatch>;

    /// Methods this source implements
    fn methods(&self) -> &MethodRegistry;

    /// Whether [`DataSource::write`] pushes values to a real actuator
    fn writable(&self) -> bool {
        false
    }

    /// Push values to the device; read-only sources reject every write
    async fn write(&self, device: &Device, values: &DataBatch) -> TwinResult<WriteReport> {
        let _ = values;
        Err(TwinError::method_not_allowed(format!(
            "the device[{}] doesn't support Write",
            device.id
        )))
    }
}
