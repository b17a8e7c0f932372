use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Features required for a single machine-failure prediction.
///
/// Field order matches the column order of the training data. Flags also
/// accept `0`/`1` and counts accept whole-number floats such as `1500.0`.
/// The range rules only run when strict validation is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct InferenceFeatures {
    /// Air temperature in Kelvin
    #[validate(range(exclusive_min = 0.0))]
    pub airtemperature_k: f64,

    /// Process temperature in Kelvin
    #[validate(range(exclusive_min = 0.0))]
    pub process_temperature_k: f64,

    /// Rotational speed in RPM
    #[validate(range(min = 0))]
    #[serde(deserialize_with = "whole_number")]
    pub rotational_speed_rpm: i64,

    /// Torque in Nm
    #[validate(range(min = 0.0))]
    pub torque_nm: f64,

    /// Tool wear in minutes
    #[validate(range(min = 0))]
    #[serde(deserialize_with = "whole_number")]
    pub tool_wear_min: i64,

    /// Machine is a type L
    #[serde(deserialize_with = "flag")]
    pub type_l: bool,

    /// Machine is a type M
    #[serde(deserialize_with = "flag")]
    pub type_m: bool,
}

impl InferenceFeatures {
    pub const NAMES: [&'static str; 7] = [
        "airtemperature_k",
        "process_temperature_k",
        "rotational_speed_rpm",
        "torque_nm",
        "tool_wear_min",
        "type_l",
        "type_m",
    ];

    /// Value of a named feature as the model sees it (booleans become 0/1).
    pub fn value_of(&self, name: &str) -> Option<f64> {
        let value = match name {
            "airtemperature_k" => self.airtemperature_k,
            "process_temperature_k" => self.process_temperature_k,
            "rotational_speed_rpm" => self.rotational_speed_rpm as f64,
            "torque_nm" => self.torque_nm,
            "tool_wear_min" => self.tool_wear_min as f64,
            "type_l" => bool_to_f64(self.type_l),
            "type_m" => bool_to_f64(self.type_m),
            _ => return None,
        };
        Some(value)
    }
}

fn bool_to_f64(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LaxNumber {
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// `true`/`false`, or the numbers 0 and 1.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match LaxNumber::deserialize(deserializer)? {
        LaxNumber::Bool(value) => Ok(value),
        LaxNumber::Int(0) => Ok(false),
        LaxNumber::Int(1) => Ok(true),
        LaxNumber::Float(value) if value == 0.0 => Ok(false),
        LaxNumber::Float(value) if value == 1.0 => Ok(true),
        LaxNumber::Int(value) => Err(D::Error::custom(format!(
            "expected a boolean or 0/1, got {}",
            value
        ))),
        LaxNumber::Float(value) => Err(D::Error::custom(format!(
            "expected a boolean or 0/1, got {}",
            value
        ))),
    }
}

/// Integers, or floats without a fractional part.
fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match LaxNumber::deserialize(deserializer)? {
        LaxNumber::Int(value) => Ok(value),
        LaxNumber::Float(value)
            if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 =>
        {
            Ok(value as i64)
        }
        LaxNumber::Float(value) => Err(D::Error::custom(format!(
            "expected a whole number, got {}",
            value
        ))),
        LaxNumber::Bool(value) => Err(D::Error::custom(format!(
            "expected a whole number, got {}",
            value
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct InferenceRequest {
    /// Unique identifier for the request
    pub request_id: i64,

    #[validate(nested)]
    pub features: InferenceFeatures,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// Echo of the request identifier
    pub response_id: i64,

    /// Predicted failure label
    pub label: bool,
}
