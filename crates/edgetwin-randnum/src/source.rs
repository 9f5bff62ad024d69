//! Synthetic data source: uniform random values, no I/O

use crate::method;
use async_trait::async_trait;
use edgetwin_core::{
    DataBatch, DataSource, Device, DeviceData, MethodRegistry, ProductField, SharedRng, TwinResult,
    Value, ValueType,
};

/// Exclusive upper bound of generated integers
pub const INT_UPPER_BOUND: i64 = 100;

/// Simulates reading a device by drawing random numbers
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: SharedRng,
    methods: MethodRegistry,
}

impl RandomSource {
    /// Source drawing from `rng`; the same generator backs the methods
    pub fn new(rng: SharedRng) -> Self {
        let methods = method::registry(rng.clone());
        Self { rng, methods }
    }

    pub fn rng(&self) -> &SharedRng {
        &self.rng
    }

    /// One random value for a field.
    ///
    /// Floats are uniform in [0, 1), integers uniform in [0, 100). A string
    /// declaration gets such an integer as text, a bool a fair coin flip.
    pub fn randnum(&self, field: &ProductField) -> TwinResult<DeviceData> {
        let value = match field.field_type {
            ValueType::Float => Value::from(self.rng.f64()),
            // Non-negative by construction
            ValueType::Uint => Value::from(self.rng.below(INT_UPPER_BOUND).unsigned_abs()),
            ValueType::Int => Value::from(self.rng.below(INT_UPPER_BOUND)),
            ValueType::Bool => Value::from(self.rng.chance(0.5)),
            ValueType::String => Value::from(self.rng.below(INT_UPPER_BOUND).to_string()),
        };
        DeviceData::new(&field.id, field.field_type, value)
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new(SharedRng::new())
    }
}

#[async_trait]
impl DataSource for RandomSource {
    async fn sample(&self, _device: &Device, fields: &[ProductField]) -> TwinResult<DataBatch> {
        fields
            .iter()
            .map(|field| self.randnum(field).map(|data| (field.id.clone(), data)))
            .collect()
    }

    fn methods(&self) -> &MethodRegistry {
        &self.methods
    }
}
