//! Driver descriptors handed to the host at startup

use crate::catalog::{Device, Product};
use crate::error::TwinResult;
use crate::twin::DeviceTwin;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Capability names a driver can advertise
pub const FUNC_PROPERTY: &str = "property";
pub const FUNC_EVENT: &str = "event";
pub const FUNC_METHOD: &str = "method";

/// Describes a driver (one kind of twin) to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub category: String,
    pub language: String,
    pub support_funcs: Vec<String>,
}

impl Protocol {
    pub fn supports(&self, func: &str) -> bool {
        self.support_funcs.iter().any(|f| f == func)
    }
}

/// Builds a twin for one device of a product
pub type TwinFactory = fn(Arc<Product>, Arc<Device>) -> TwinResult<Box<dyn DeviceTwin>>;
