//! Remote method registry and dispatch
//!
//! Methods are registered by id when a data source is built. A twin checks at
//! initialize time that every method its product declares is registered, so
//! dispatch never has to handle a declared-but-missing method.

use crate::catalog::MethodId;
use crate::data::{DataBatch, DeviceData};
use crate::error::{TwinError, TwinResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A remote procedure implementation.
///
/// Implementations validate their own inputs and return `BadRequest` for a
/// missing or mistyped input.
pub trait Method: Send + Sync {
    fn call(&self, ins: &DataBatch) -> TwinResult<DataBatch>;
}

impl<F> Method for F
where
    F: Fn(&DataBatch) -> TwinResult<DataBatch> + Send + Sync,
{
    fn call(&self, ins: &DataBatch) -> TwinResult<DataBatch> {
        self(ins)
    }
}

/// Methods a data source supports, keyed by method id
#[derive(Clone, Default)]
pub struct MethodRegistry {
    methods: HashMap<MethodId, Arc<dyn Method>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `method` under `id`, replacing any previous registration
    #[must_use]
    pub fn with(mut self, id: impl Into<MethodId>, method: impl Method + 'static) -> Self {
        self.methods.insert(id.into(), Arc::new(method));
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.methods.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Invoke `id` synchronously, propagating the implementation's error
    pub fn call(&self, id: &str, ins: &DataBatch) -> TwinResult<DataBatch> {
        let method = self
            .methods
            .get(id)
            .ok_or_else(|| TwinError::bad_request(format!("undefined method: {id}")))?;
        method.call(ins)
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.ids().collect();
        ids.sort_unstable();
        f.debug_struct("MethodRegistry").field("methods", &ids).finish()
    }
}

/// Fetch a required method input
pub fn required_input<'a>(ins: &'a DataBatch, name: &str) -> TwinResult<&'a DeviceData> {
    ins.get(name)
        .ok_or_else(|| TwinError::bad_request(format!("the input {name} is required")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::ValueType;

    fn echo(ins: &DataBatch) -> TwinResult<DataBatch> {
        let x = required_input(ins, "x")?;
        Ok(DataBatch::from([("y".to_string(), x.clone())]))
    }

    #[test]
    fn test_dispatch_registered_method() {
        let registry = MethodRegistry::new().with("Echo", echo);
        assert!(registry.contains("Echo"));

        let ins = DataBatch::from([(
            "x".to_string(),
            DeviceData::new("x", ValueType::Int, 5).unwrap(),
        )]);
        let outs = registry.call("Echo", &ins).unwrap();
        assert_eq!(outs["y"].int_value().unwrap(), 5);
    }

    #[test]
    fn test_errors_propagate_unchanged() {
        let registry = MethodRegistry::new().with("Echo", echo);
        let err = registry.call("Echo", &DataBatch::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.to_string(), "bad request: the input x is required");
    }

    #[test]
    fn test_unknown_method() {
        let err = MethodRegistry::new()
            .call("Nope", &DataBatch::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }
}
