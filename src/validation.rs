//! Validators applied to untyped manifest parameters before anything is rendered.
use std::net::IpAddr;

use regex::Regex;
use serde_json::Value;

use crate::error::ValidationError;

lazy_static::lazy_static! {
    /// local-part@host, where host has at least two non-empty labels
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").unwrap();
}

/// Name of a value's type as it appears in error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Undef",
        Value::Bool(_) => "Boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "Integer",
        Value::Number(_) => "Float",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Hash",
    }
}

fn not_an_array(value: &Value) -> ValidationError {
    ValidationError::type_error(format!(
        "{value} is not an Array.  It looks to be a {}",
        type_name(value)
    ))
}

pub fn validate_boolean(value: &Value) -> Result<bool, ValidationError> {
    value
        .as_bool()
        .ok_or_else(|| ValidationError::type_error(format!("{value} is not a boolean")))
}

pub fn validate_string(value: &Value) -> Result<&str, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| ValidationError::type_error(format!("{value} is not a string.")))
}

/// Accepts any integer, including zero and negatives.
pub fn validate_integer(value: &Value, label: &str) -> Result<i64, ValidationError> {
    value.as_i64().ok_or_else(|| {
        ValidationError::type_error(format!(
            "{label} must be an integer. Expected first argument to be an Integer, got {}",
            type_name(value)
        ))
    })
}

/// Integer type check first, then `> 0`.
pub fn validate_positive_integer(value: &Value, label: &str) -> Result<u64, ValidationError> {
    if let Some(n) = value.as_u64() {
        if n == 0 {
            return Err(ValidationError::value_error(format!(
                "{label} must be positive."
            )));
        }
        return Ok(n);
    }
    // only negatives get past the type check here
    validate_integer(value, label)?;
    Err(ValidationError::value_error(format!(
        "{label} must be positive."
    )))
}

/// Validates every element of every supplied array as an IPv4 or IPv6 address.
pub fn validate_ip_address_array(arrays: &[&Value]) -> Result<Vec<IpAddr>, ValidationError> {
    if arrays.is_empty() {
        return Err(ValidationError::value_error(
            "validate_ip_address_array: wrong number of arguments (0; must be > 0)",
        ));
    }

    let mut addrs = Vec::new();
    for arg in arrays {
        let items = arg.as_array().ok_or_else(|| not_an_array(arg))?;
        for item in items {
            let s = validate_string(item)?;
            let addr = s.parse::<IpAddr>().map_err(|_| {
                ValidationError::type_error(format!("{item} is not a valid IP address."))
            })?;
            addrs.push(addr);
        }
    }
    Ok(addrs)
}

/// Only checks that exactly one array was supplied. Elements are not inspected.
pub fn validate_nameserver_array(args: &[&Value]) -> Result<(), ValidationError> {
    if args.len() != 1 {
        return Err(ValidationError::value_error(format!(
            "validate_nameserver: wrong number of arguments ({}; must be = 1)",
            args.len()
        )));
    }
    if !args[0].is_array() {
        return Err(not_an_array(args[0]));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.ends_with('.') {
        return Err(ValidationError::value_error(
            "The admin email address shouldn't end in a full stop.",
        ));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::value_error("Admin email address is invalid."));
    }
    Ok(())
}
