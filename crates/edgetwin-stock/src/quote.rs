//! Quote feed wire format and its mapping onto device data

use chrono::{DateTime, Utc};
use edgetwin_core::{DataBatch, DeviceData, ProductField, TwinError, TwinResult, Value, ValueType};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

/// Body returned by the quote endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteResponse {
    #[serde(default)]
    pub data: Option<Vec<Map<String, JsonValue>>>,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_description: String,
}

impl QuoteResponse {
    pub fn from_slice(body: &[u8]) -> TwinResult<Self> {
        serde_json::from_slice(body)
            .map_err(|err| TwinError::internal("failed to decode the quote", err))
    }

    /// Every field of the first quote, typed as observed and stamped `ts`.
    ///
    /// `null` fields are dropped; nested arrays and objects are kept as their
    /// JSON text.
    pub fn into_batch(self, ts: DateTime<Utc>) -> TwinResult<DataBatch> {
        let Some(quote) = self.data.and_then(|data| data.into_iter().next()) else {
            if self.error_code != 0 {
                return Err(TwinError::internal_msg(format!(
                    "quote feed error {}: {}",
                    self.error_code, self.error_description
                )));
            }
            return Ok(DataBatch::new());
        };

        let mut batch = DataBatch::new();
        for (name, raw) in quote {
            let Some((value_type, value)) = observe(raw) else {
                continue;
            };
            let data = DeviceData::with_timestamp(&name, value_type, value, ts)?;
            batch.insert(name, data);
        }
        Ok(batch)
    }
}

/// Runtime type and value of one JSON field
fn observe(raw: JsonValue) -> Option<(ValueType, Value)> {
    match raw {
        JsonValue::Null => None,
        JsonValue::Bool(b) => Some((ValueType::Bool, Value::from(b))),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some((ValueType::Int, Value::from(i)))
            } else if let Some(u) = n.as_u64() {
                Some((ValueType::Uint, Value::from(u)))
            } else {
                n.as_f64().map(|f| (ValueType::Float, Value::from(f)))
            }
        }
        JsonValue::String(s) => Some((ValueType::String, Value::from(s))),
        nested @ (JsonValue::Array(_) | JsonValue::Object(_)) => {
            Some((ValueType::String, Value::from(nested.to_string())))
        }
    }
}

/// Select the requested fields from a quote, retyped to their declarations.
///
/// An empty `fields` slice selects the whole quote as observed. A requested
/// field the quote does not carry is an `Internal` error, so every returned
/// batch has exactly the requested keys.
pub fn project(quote: DataBatch, fields: &[ProductField]) -> TwinResult<DataBatch> {
    if fields.is_empty() {
        return Ok(quote);
    }

    let mut quote = quote;
    let mut batch = DataBatch::new();
    for field in fields {
        let observed = quote.remove(&field.id).ok_or_else(|| {
            TwinError::internal_msg(format!("quote does not carry field {}", field.id))
        })?;
        let data = DeviceData::with_timestamp(
            &field.id,
            field.field_type,
            observed.value().clone(),
            observed.timestamp(),
        )
        .map_err(|err| {
            TwinError::internal(
                format!("quote field {} does not match its declaration", field.id),
                err,
            )
        })?;
        batch.insert(field.id.clone(), data);
    }
    Ok(batch)
}
