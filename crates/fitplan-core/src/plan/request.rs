//! Plan request validation.
//!
//! Turns an untyped JSON body into a [`PlanRequest`]:
//! - All three required keys must be present (the first missing one is named).
//! - Weights coerce from JSON numbers or numeric strings and must be positive.
//! - `target_months` coerces from integral numbers, truncated reals or integer
//!   strings, and must be one of [`VALID_TARGET_MONTHS`].

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::PlanError;

/// Plan durations, in months, the service accepts.
pub const VALID_TARGET_MONTHS: [i32; 7] = [2, 4, 6, 8, 12, 16, 24];

/// Keys every request body must carry, in reporting order.
pub const REQUIRED_FIELDS: [&str; 3] = ["present_weight", "expected_weight", "target_months"];

/// A validated plan request. Never persisted on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanRequest {
    /// Current body weight in kilograms.
    pub present_weight: f64,
    /// Goal body weight in kilograms.
    pub expected_weight: f64,
    /// Plan duration; always a member of [`VALID_TARGET_MONTHS`].
    pub target_months: i32,
}

impl PlanRequest {
    /// Validate and convert an untyped request body.
    pub fn from_json(input: &Value) -> Result<Self, PlanError> {
        let fields = match input {
            Value::Object(map) if !map.is_empty() => map,
            _ => return Err(PlanError::invalid_input("No JSON data provided")),
        };

        for field in REQUIRED_FIELDS {
            if !fields.contains_key(field) {
                return Err(PlanError::invalid_input(format!(
                    "Missing required field: {field}"
                )));
            }
        }

        let present_weight = positive_weight(fields, "present_weight")?;
        let expected_weight = positive_weight(fields, "expected_weight")?;
        let target_months = coerce_integer("target_months", &fields["target_months"])?;

        let target_months = i32::try_from(target_months)
            .ok()
            .filter(|m| VALID_TARGET_MONTHS.contains(m))
            .ok_or_else(|| {
                PlanError::invalid_input(format!(
                    "Target months must be one of: {VALID_TARGET_MONTHS:?}"
                ))
            })?;

        Ok(Self {
            present_weight,
            expected_weight,
            target_months,
        })
    }
}

fn positive_weight(fields: &Map<String, Value>, field: &'static str) -> Result<f64, PlanError> {
    let weight = coerce_real(field, &fields[field])?;
    if !weight.is_finite() || weight <= 0.0 {
        return Err(PlanError::invalid_input(format!(
            "{field} must be a positive number of kilograms, got {weight}"
        )));
    }
    Ok(weight)
}

fn coerce_real(field: &'static str, value: &Value) -> Result<f64, PlanError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| conversion(field, "a number", value)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| conversion(field, "a number", value)),
        _ => Err(conversion(field, "a number", value)),
    }
}

fn coerce_integer(field: &'static str, value: &Value) -> Result<i64, PlanError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(f.trunc() as i64),
                _ => Err(conversion(field, "an integer", value)),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| conversion(field, "an integer", value)),
        _ => Err(conversion(field, "an integer", value)),
    }
}

fn conversion(field: &'static str, expected: &str, got: &Value) -> PlanError {
    PlanError::TypeConversion {
        field,
        reason: format!("expected {expected}, got {got}"),
    }
}
