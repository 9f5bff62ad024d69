//! Random number simulator twin
//!
//! A device twin whose properties and events are uniform random numbers and
//! which implements a single remote method, `Intn`. Start fails about 1% of
//! the time and health checks report `Exception` about 10% of the time, to
//! exercise host supervision and retry paths.

pub mod method;
pub mod source;

pub use method::{METHOD_INPUT_NAME_N, METHOD_NAME_INTN, METHOD_OUTPUT_NAME_V};
pub use source::RandomSource;

use edgetwin_core::protocol::{FUNC_EVENT, FUNC_METHOD, FUNC_PROPERTY};
use edgetwin_core::{Device, DeviceTwin, Product, Protocol, Twin, TwinConfig, TwinResult};
use std::sync::Arc;

pub const PROTOCOL_ID: &str = "randnum";

/// Probability that `start` fails with a simulated fault
pub const START_FAILURE_PROBABILITY: f64 = 0.01;

/// Probability that a health check reports `Exception`
pub const HEALTH_EXCEPTION_PROBABILITY: f64 = 0.10;

pub type RandomNumberTwin = Twin<RandomSource>;

/// Descriptor the host registers this driver under
pub fn protocol() -> Protocol {
    Protocol {
        id: PROTOCOL_ID.to_string(),
        name: PROTOCOL_ID.to_string(),
        desc: "Random Number Simulator".to_string(),
        category: "tick".to_string(),
        language: "ch".to_string(),
        support_funcs: vec![
            FUNC_PROPERTY.to_string(),
            FUNC_EVENT.to_string(),
            FUNC_METHOD.to_string(),
        ],
    }
}

/// Default twin configuration: 15s polling and the simulated fault rates
pub fn default_config() -> TwinConfig {
    TwinConfig::default()
        .with_start_failure_probability(START_FAILURE_PROBABILITY)
        .with_health_exception_probability(HEALTH_EXCEPTION_PROBABILITY)
}

/// Build a random number twin with an explicit configuration
pub fn random_number_twin(
    product: Arc<Product>,
    device: Arc<Device>,
    config: TwinConfig,
) -> RandomNumberTwin {
    Twin::new(product, device, RandomSource::default(), config)
}

/// Factory matching [`edgetwin_core::TwinFactory`]
pub fn new_twin(product: Arc<Product>, device: Arc<Device>) -> TwinResult<Box<dyn DeviceTwin>> {
    Ok(Box::new(random_number_twin(product, device, default_config())))
}
