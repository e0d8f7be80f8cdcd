//! Helpers for extracting values from KDL nodes.

use kdl::KdlNode;

use crate::{ConfigError, ConfigResult};

pub(crate) fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

pub(crate) fn get_first_bool_arg(node: &KdlNode) -> Option<bool> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_bool())
}

pub(crate) fn get_first_integer_arg(node: &KdlNode) -> Option<i128> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_integer())
}

/// A child flag such as `trigger-on-create #true`. A bare node counts as true.
pub(crate) fn parse_flag(node: &KdlNode) -> ConfigResult<bool> {
    if node.entries().is_empty() {
        return Ok(true);
    }
    get_first_bool_arg(node).ok_or_else(|| ConfigError::InvalidValue {
        field: node.name().value().to_string(),
        message: "expected #true or #false".to_string(),
    })
}

/// A non-negative integer child such as `debounce-delay 30`.
pub(crate) fn parse_non_negative(node: &KdlNode) -> ConfigResult<u64> {
    let field = node.name().value().to_string();
    let value = get_first_integer_arg(node).ok_or_else(|| ConfigError::InvalidValue {
        field: field.clone(),
        message: "expected an integer".to_string(),
    })?;
    u64::try_from(value).map_err(|_| ConfigError::InvalidValue {
        field,
        message: format!("must be a non-negative integer, got {}", value),
    })
}

pub(crate) fn parse_string(node: &KdlNode) -> ConfigResult<String> {
    get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField(format!("value for {}", node.name().value())))
}
