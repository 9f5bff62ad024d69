//! Stock quote twin
//!
//! Each device is one stock symbol. Properties and events are read from a
//! realtime quote feed over HTTP; the twin supports no writes and no methods.

pub mod quote;
pub mod source;

pub use quote::QuoteResponse;
pub use source::{StockConfig, StockSource, DEFAULT_ENDPOINT, SYMBOL_PROP};

use edgetwin_core::protocol::{FUNC_EVENT, FUNC_METHOD, FUNC_PROPERTY};
use edgetwin_core::{Device, DeviceTwin, Product, Protocol, Twin, TwinConfig, TwinError, TwinResult};
use std::sync::Arc;

pub const PROTOCOL_ID: &str = "stock";

pub type StockTwin = Twin<StockSource>;

/// Descriptor the host registers this driver under
pub fn protocol() -> Protocol {
    Protocol {
        id: PROTOCOL_ID.to_string(),
        name: PROTOCOL_ID.to_string(),
        desc: "Stock Price From Xueqiu".to_string(),
        category: "tick".to_string(),
        language: "ch".to_string(),
        support_funcs: vec![
            FUNC_PROPERTY.to_string(),
            FUNC_EVENT.to_string(),
            FUNC_METHOD.to_string(),
        ],
    }
}

/// Build a stock twin; the product and device must carry ids
pub fn stock_twin(
    product: Arc<Product>,
    device: Arc<Device>,
    config: TwinConfig,
    stock: StockConfig,
) -> TwinResult<StockTwin> {
    if product.id.is_empty() {
        return Err(TwinError::device_twin("the product id cannot be empty"));
    }
    if device.id.is_empty() {
        return Err(TwinError::device_twin("the device id cannot be empty"));
    }
    Ok(Twin::new(product, device, StockSource::new(stock)?, config))
}

/// Factory matching [`edgetwin_core::TwinFactory`]; no simulated faults
pub fn new_twin(product: Arc<Product>, device: Arc<Device>) -> TwinResult<Box<dyn DeviceTwin>> {
    let twin = stock_twin(product, device, TwinConfig::default(), StockConfig::default())?;
    Ok(Box::new(twin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgetwin_core::{ErrorKind, TwinFactory};

    #[test]
    fn test_factory_rejects_missing_ids() {
        let factory: TwinFactory = new_twin;
        let err = factory(
            Arc::new(Product::new("stock", PROTOCOL_ID)),
            Arc::new(Device::new("", "stock")),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::DeviceTwin);

        let err = factory(
            Arc::new(Product::new("", PROTOCOL_ID)),
            Arc::new(Device::new("SH600000", "stock")),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::DeviceTwin);
    }

    #[test]
    fn test_protocol_descriptor() {
        let protocol = protocol();
        assert_eq!(protocol.desc, "Stock Price From Xueqiu");
        assert!(protocol.supports(FUNC_EVENT));
    }
}
