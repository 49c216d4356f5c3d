// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sensor reading decoder.
//!
//! Turns a raw transport payload into a validated [`SensorReading`].
//!
//! Expected payload:
//! ```text
//! {
//!   "device": "<string>",
//!   "acceleration": {"x": <number>, "y": <number>, "z": <number>},
//!   "gyro": {"yaw": <number>, "pitch": <number>, "roll": <number>}
//! }
//! ```
//!
//! Unknown keys are ignored. The total magnitude is always computed here
//! from the acceleration components; a `g` key in the payload has no effect.

use crate::metric::magnitude;
use crate::point::FieldValue;
use serde_json::Value;
use thiserror::Error;

/// Payload decoding errors.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    /// Payload is not a JSON object.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A required field is absent (dotted path, e.g. `gyro.yaw`).
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A required field is present with the wrong type.
    #[error("invalid field: {path} (expected {expected})")]
    InvalidField {
        path: &'static str,
        expected: &'static str,
    },

    /// The device identifier is an empty string.
    #[error("invalid field: device (empty identifier)")]
    EmptyDevice,
}

/// A decoded motion-sensor reading.
///
/// Immutable once built; only [`decode`] constructs one.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    device: String,
    accel_x: f64,
    accel_y: f64,
    accel_z: f64,
    total_g: f64,
    gyro_yaw: FieldValue,
    gyro_pitch: FieldValue,
    gyro_roll: FieldValue,
}

impl SensorReading {
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn accel_x(&self) -> f64 {
        self.accel_x
    }

    pub fn accel_y(&self) -> f64 {
        self.accel_y
    }

    pub fn accel_z(&self) -> f64 {
        self.accel_z
    }

    /// Euclidean norm of the acceleration vector.
    pub fn total_g(&self) -> f64 {
        self.total_g
    }

    pub fn gyro_yaw(&self) -> FieldValue {
        self.gyro_yaw
    }

    pub fn gyro_pitch(&self) -> FieldValue {
        self.gyro_pitch
    }

    pub fn gyro_roll(&self) -> FieldValue {
        self.gyro_roll
    }
}

/// Decode a payload received on `topic`.
///
/// The topic is accepted as-is; it is only used by callers for logging.
pub fn decode(_topic: &str, payload: &[u8]) -> Result<SensorReading, DecodeError> {
    let root: Value =
        serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    if !root.is_object() {
        return Err(DecodeError::Malformed("expected a JSON object".into()));
    }

    let device = match require(&root, "device")? {
        Value::String(s) if s.is_empty() => return Err(DecodeError::EmptyDevice),
        Value::String(s) if !is_tag_safe(s) => {
            return Err(DecodeError::InvalidField {
                path: "device",
                expected: "identifier without control characters or trailing backslash",
            })
        }
        Value::String(s) => s.clone(),
        _ => {
            return Err(DecodeError::InvalidField {
                path: "device",
                expected: "string",
            })
        }
    };

    let accel_x = float_at(&root, "acceleration.x")?;
    let accel_y = float_at(&root, "acceleration.y")?;
    let accel_z = float_at(&root, "acceleration.z")?;

    let gyro_yaw = number_at(&root, "gyro.yaw")?;
    let gyro_pitch = number_at(&root, "gyro.pitch")?;
    let gyro_roll = number_at(&root, "gyro.roll")?;

    Ok(SensorReading {
        device,
        accel_x,
        accel_y,
        accel_z,
        total_g: magnitude(accel_x, accel_y, accel_z),
        gyro_yaw,
        gyro_pitch,
        gyro_roll,
    })
}

/// The device becomes a Line Protocol tag value: a line break would start a
/// new point and a trailing backslash would escape the tag/field separator.
fn is_tag_safe(device: &str) -> bool {
    !device.chars().any(char::is_control) && !device.ends_with('\\')
}

/// Resolve a dot-separated path, failing with the full path when absent.
///
/// A `null` value counts as absent.
fn require<'a>(json: &'a Value, path: &'static str) -> Result<&'a Value, DecodeError> {
    let mut current = json;
    for part in path.split('.') {
        current = current
            .get(part)
            .filter(|v| !v.is_null())
            .ok_or(DecodeError::MissingField(path))?;
    }
    Ok(current)
}

fn float_at(json: &Value, path: &'static str) -> Result<f64, DecodeError> {
    require(json, path)?
        .as_f64()
        .ok_or(DecodeError::InvalidField {
            path,
            expected: "number",
        })
}

/// Keeps the payload's numeric width: integers stay integers.
fn number_at(json: &Value, path: &'static str) -> Result<FieldValue, DecodeError> {
    let invalid = DecodeError::InvalidField {
        path,
        expected: "number",
    };
    match require(json, path)? {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(FieldValue::Integer(i))
            } else {
                n.as_f64().map(FieldValue::Float).ok_or(invalid)
            }
        }
        _ => Err(invalid),
    }
}
