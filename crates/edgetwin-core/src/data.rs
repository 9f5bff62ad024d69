//! Data produced by twins: device data, event wrappers and device status

use crate::catalog::{Device, DeviceId, ProductId};
use crate::error::{TwinError, TwinResult};
use crate::value::{Value, ValueType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Reserved property id meaning "every declared property"
pub const MULTI_PROPS_ID: &str = "*";

/// A batch of device data keyed by property/field id
pub type DataBatch = BTreeMap<String, DeviceData>;

/// One timestamped, typed, named value
///
/// Fields are private so a constructed value always agrees with its type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceData {
    name: String,
    #[serde(rename = "type")]
    value_type: ValueType,
    value: Value,
    ts: DateTime<Utc>,
}

impl DeviceData {
    /// Build device data timestamped now, coercing `value` into `value_type`
    pub fn new(
        name: impl Into<String>,
        value_type: ValueType,
        value: impl Into<Value>,
    ) -> TwinResult<Self> {
        Self::with_timestamp(name, value_type, value, Utc::now())
    }

    pub fn with_timestamp(
        name: impl Into<String>,
        value_type: ValueType,
        value: impl Into<Value>,
        ts: DateTime<Utc>,
    ) -> TwinResult<Self> {
        let name = name.into();
        let value = value.into();
        let found = value.value_type();
        let value = value.coerce(value_type).ok_or_else(|| {
            TwinError::device_twin(format!(
                "value of {name} is {found}, which does not fit declared type {value_type}"
            ))
        })?;
        Ok(Self {
            name,
            value_type,
            value,
            ts,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.ts
    }

    pub fn int_value(&self) -> TwinResult<i64> {
        self.value.as_i64().ok_or_else(|| self.type_mismatch(ValueType::Int))
    }

    pub fn uint_value(&self) -> TwinResult<u64> {
        self.value.as_u64().ok_or_else(|| self.type_mismatch(ValueType::Uint))
    }

    pub fn float_value(&self) -> TwinResult<f64> {
        self.value
            .as_f64()
            .ok_or_else(|| self.type_mismatch(ValueType::Float))
    }

    pub fn bool_value(&self) -> TwinResult<bool> {
        self.value
            .as_bool()
            .ok_or_else(|| self.type_mismatch(ValueType::Bool))
    }

    pub fn string_value(&self) -> TwinResult<&str> {
        self.value
            .as_str()
            .ok_or_else(|| self.type_mismatch(ValueType::String))
    }

    fn type_mismatch(&self, wanted: ValueType) -> TwinError {
        TwinError::bad_request(format!(
            "{} holds a {} value, not {wanted}",
            self.name, self.value_type
        ))
    }
}

impl fmt::Display for DeviceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.ts, self.name, self.value, self.value_type
        )
    }
}

/// Batch of device data emitted for one event occurrence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceDataWrapper {
    pub product_id: ProductId,
    pub device_id: DeviceId,
    /// The event id this batch was produced for
    pub func_id: String,
    pub properties: DataBatch,
}

/// Connection state reported by a health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceState {
    Connected,
    Exception,
    Disconnected,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Exception => write!(f, "exception"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Result of a health check; produced fresh every time
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatus {
    pub device: Arc<Device>,
    pub state: DeviceState,
}
