// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Time-series points and their InfluxDB Line Protocol encoding.
//!
//! Line Protocol format:
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 [timestamp]
//! ```
//!
//! See: <https://docs.influxdata.com/influxdb/v1/write_protocols/line_protocol_reference/>

use crate::reading::SensorReading;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Measurement holding the acceleration vector and its magnitude.
pub const MEASUREMENT_ACCELERATION: &str = "acceleration";

/// Measurement holding the gyroscope angles.
pub const MEASUREMENT_GYRO: &str = "gyro";

/// Tag key carrying the originating device identifier.
pub const TAG_DEVICE: &str = "device";

/// A numeric value stored in a point field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// 64-bit floating point.
    Float(f64),
    /// 64-bit signed integer.
    Integer(i64),
}

impl FieldValue {
    /// Format this value for Line Protocol.
    ///
    /// - Float: shortest round-trip form (e.g., `3.14`, `5`)
    /// - Integer: suffixed with `i` (e.g., `42i`)
    pub fn to_line_protocol(&self) -> String {
        match self {
            FieldValue::Float(v) => format!("{}", v),
            FieldValue::Integer(v) => format!("{}i", v),
        }
    }

    /// Value as `f64`, regardless of the stored width.
    pub fn as_f64(&self) -> f64 {
        match *self {
            FieldValue::Float(v) => v,
            FieldValue::Integer(v) => v as f64,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_line_protocol())
    }
}

/// One time-series point: measurement, tag set and field set.
///
/// No timestamp is carried; the store stamps points on arrival.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub measurement: &'static str,
    pub tags: BTreeMap<String, String>,
    #[serde(serialize_with = "serialize_fields")]
    pub fields: Vec<(&'static str, FieldValue)>,
}

fn serialize_fields<S>(
    fields: &[(&'static str, FieldValue)],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_map(fields.iter().map(|(k, v)| (k, v)))
}

impl Point {
    fn for_device(measurement: &'static str, device: &str) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(TAG_DEVICE.to_string(), device.to_string());
        Self {
            measurement,
            tags,
            fields: Vec::new(),
        }
    }

    fn field(mut self, key: &'static str, value: FieldValue) -> Self {
        self.fields.push((key, value));
        self
    }

    /// Look up a field by key.
    pub fn field_value(&self, key: &str) -> Option<FieldValue> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    /// Encode this point as a single Line Protocol line.
    ///
    /// Tags are emitted sorted by key; fields keep their insertion order.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape_measurement(self.measurement);

        for (key, value) in &self.tags {
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }

        line.push(' ');

        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&value.to_line_protocol());
        }

        line
    }
}

/// Encode a batch of points as a newline-separated Line Protocol body.
pub fn encode_batch(points: &[Point]) -> String {
    points
        .iter()
        .map(Point::to_line_protocol)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the two points written for every reading: acceleration, then gyro.
pub fn build_points(reading: &SensorReading) -> [Point; 2] {
    let acceleration = Point::for_device(MEASUREMENT_ACCELERATION, reading.device())
        .field("x", FieldValue::Float(reading.accel_x()))
        .field("y", FieldValue::Float(reading.accel_y()))
        .field("z", FieldValue::Float(reading.accel_z()))
        .field("g", FieldValue::Float(reading.total_g()));

    let gyro = Point::for_device(MEASUREMENT_GYRO, reading.device())
        .field("yaw", reading.gyro_yaw())
        .field("pitch", reading.gyro_pitch())
        .field("roll", reading.gyro_roll());

    [acceleration, gyro]
}

/// Measurement names escape commas and spaces.
fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

/// Tag keys, tag values and field keys escape commas, equals signs and spaces.
fn escape_key(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}
