//! Read-only catalog metadata a twin is built from
//!
//! A [`Product`] describes what a kind of device can do; a [`Device`] is one
//! concrete instance of that product. Both are supplied by the host and never
//! change for the lifetime of a twin.

use crate::value::ValueType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a [`Product`], unique per host
pub type ProductId = String;
/// Identifier of a [`Device`], unique per host
pub type DeviceId = String;
/// Property identifier, unique within its product
pub type PropertyId = String;
/// Event identifier, unique within its product
pub type EventId = String;
/// Method identifier, unique within its product
pub type MethodId = String;

/// A typed field: an event output or a method argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductField {
    pub id: String,
    /// Display name; defaults to the id
    #[serde(default)]
    pub name: String,
    /// Declared type every value of this field must carry
    #[serde(default)]
    pub field_type: ValueType,
}

impl ProductField {
    /// Field named after its id
    pub fn new(id: impl Into<String>, field_type: ValueType) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            field_type,
        }
    }
}

/// A readable (and optionally writable) value of the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductProperty {
    pub id: PropertyId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub field_type: ValueType,
    /// Whether hosts may write this property
    #[serde(default)]
    pub writeable: bool,
}

impl ProductProperty {
    /// Read-only property named after its id
    pub fn new(id: impl Into<String>, field_type: ValueType) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            field_type,
            writeable: false,
        }
    }

    /// The property viewed as a plain typed field
    pub fn as_field(&self) -> ProductField {
        ProductField {
            id: self.id.clone(),
            name: self.name.clone(),
            field_type: self.field_type,
        }
    }
}

/// A periodic emission of typed output fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEvent {
    pub id: EventId,
    #[serde(default)]
    pub name: String,
    /// Fields sampled on every emission
    #[serde(default)]
    pub outs: Vec<ProductField>,
}

impl ProductEvent {
    /// Event named after its id
    pub fn new(id: impl Into<String>, outs: Vec<ProductField>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            outs,
        }
    }
}

/// A remote call with named inputs and outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMethod {
    pub id: MethodId,
    #[serde(default)]
    pub name: String,
    /// Declared inputs
    #[serde(default)]
    pub ins: Vec<ProductField>,
    /// Declared outputs
    #[serde(default)]
    pub outs: Vec<ProductField>,
}

impl ProductMethod {
    /// Method named after its id
    pub fn new(
        id: impl Into<String>,
        ins: Vec<ProductField>,
        outs: Vec<ProductField>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            ins,
            outs,
        }
    }
}

/// Catalog entry for a kind of device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    /// Protocol (driver) id this product is served by
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub properties: Vec<ProductProperty>,
    #[serde(default)]
    pub events: Vec<ProductEvent>,
    #[serde(default)]
    pub methods: Vec<ProductMethod>,
}

impl Product {
    /// Empty product served by `protocol`
    pub fn new(id: impl Into<String>, protocol: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            protocol: protocol.into(),
            properties: Vec::new(),
            events: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Append a property
    #[must_use]
    pub fn with_property(mut self, property: ProductProperty) -> Self {
        self.properties.push(property);
        self
    }

    /// Append an event
    #[must_use]
    pub fn with_event(mut self, event: ProductEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Append a method
    #[must_use]
    pub fn with_method(mut self, method: ProductMethod) -> Self {
        self.methods.push(method);
        self
    }
}

/// Identity of one concrete device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    #[serde(default)]
    pub name: String,
    pub product_id: ProductId,
    /// Driver-specific connection settings
    #[serde(default)]
    pub props: BTreeMap<String, String>,
}

impl Device {
    /// Device named after its id, with no props
    pub fn new(id: impl Into<String>, product_id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            product_id: product_id.into(),
            props: BTreeMap::new(),
        }
    }
}
