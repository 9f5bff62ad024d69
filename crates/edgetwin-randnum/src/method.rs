//! Methods the random number simulator implements

use edgetwin_core::method::required_input;
use edgetwin_core::{DataBatch, DeviceData, MethodRegistry, SharedRng, TwinError, TwinResult, ValueType};

pub const METHOD_NAME_INTN: &str = "Intn";
pub const METHOD_INPUT_NAME_N: &str = "n";
pub const METHOD_OUTPUT_NAME_V: &str = "v";

/// Registry of every supported method, drawing from `rng`
pub fn registry(rng: SharedRng) -> MethodRegistry {
    MethodRegistry::new().with(METHOD_NAME_INTN, move |ins: &DataBatch| intn(&rng, ins))
}

/// `Intn(n) -> v`: a uniform integer in [0, n)
pub fn intn(rng: &SharedRng, ins: &DataBatch) -> TwinResult<DataBatch> {
    let n = required_input(ins, METHOD_INPUT_NAME_N)?
        .int_value()
        .map_err(|err| {
            TwinError::bad_request(format!("the input {METHOD_INPUT_NAME_N} must be an integer"))
                .caused_by(err)
        })?;
    if n <= 0 {
        return Err(TwinError::bad_request(format!(
            "the input {METHOD_INPUT_NAME_N} must be positive, got {n}"
        )));
    }

    let data = DeviceData::new(METHOD_OUTPUT_NAME_V, ValueType::Int, rng.below(n)).map_err(|err| {
        TwinError::device_twin("fail to construct the device data").caused_by(err)
    })?;
    Ok(DataBatch::from([(METHOD_OUTPUT_NAME_V.to_string(), data)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgetwin_core::ErrorKind;

    fn input(value: impl Into<edgetwin_core::Value>, ty: ValueType) -> DataBatch {
        DataBatch::from([(
            METHOD_INPUT_NAME_N.to_string(),
            DeviceData::new(METHOD_INPUT_NAME_N, ty, value).unwrap(),
        )])
    }

    #[test]
    fn test_intn_in_range() {
        let rng = SharedRng::with_seed(9);
        for _ in 0..100 {
            let outs = intn(&rng, &input(10, ValueType::Int)).unwrap();
            assert_eq!(outs.len(), 1);
            let v = outs[METHOD_OUTPUT_NAME_V].int_value().unwrap();
            assert!((0..10).contains(&v));
        }
    }

    #[test]
    fn test_intn_input_validation() {
        let rng = SharedRng::with_seed(9);
        let missing = intn(&rng, &DataBatch::new()).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::BadRequest);
        assert_eq!(missing.to_string(), "bad request: the input n is required");

        let wrong_type = intn(&rng, &input("ten", ValueType::String)).unwrap_err();
        assert_eq!(wrong_type.kind(), ErrorKind::BadRequest);

        let zero = intn(&rng, &input(0, ValueType::Int)).unwrap_err();
        assert_eq!(zero.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_uint_input_accepted() {
        let rng = SharedRng::with_seed(9);
        let outs = intn(&rng, &input(5u64, ValueType::Uint)).unwrap();
        assert!(outs[METHOD_OUTPUT_NAME_V].int_value().unwrap() < 5);
    }
}
