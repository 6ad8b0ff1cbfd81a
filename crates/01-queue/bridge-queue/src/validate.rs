//! Development-time check that outbound parameters can cross the boundary.

use crate::error::{BridgeError, BridgeResult};
use crate::value::Value;

/// Rejects parameter lists the host side cannot convert.
///
/// Primitives and finite numbers pass; arrays pass when every element does;
/// objects pass when every property does or is a function. Functions anywhere
/// else and non-finite numbers fail.
pub fn validate_params(params: &[Value]) -> BridgeResult<()> {
    if params.iter().all(is_valid_argument) {
        return Ok(());
    }
    Err(BridgeError::InvalidArgument {
        rendered: Value::Array(params.to_vec()).render(),
    })
}

pub fn is_valid_argument(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null | Value::Bool(_) | Value::String(_) => true,
        Value::Number(n) => n.is_finite(),
        Value::Function(_) => false,
        Value::Array(items) => items.iter().all(is_valid_argument),
        Value::Object(props) => props
            .values()
            .all(|v| matches!(v, Value::Function(_)) || is_valid_argument(v)),
    }
}
