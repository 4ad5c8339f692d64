//! Wire schema for avatar state snapshots
//!
//! Every broadcast is a complete snapshot, so any single message fully
//! describes a peer and duplicates or reordering cannot corrupt state.
//! Validation happens here, at the boundary: a malformed payload is
//! rejected with a `ProtocolError` and never reaches the peer store.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::replication::MAX_WIRE_STRING;
use crate::error::ProtocolError;

/// Full avatar state, the only message on the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Yaw in radians, wrapped into [-pi, pi)
    pub ry: f32,
    #[serde(rename = "char")]
    pub character: String,
    pub anim: String,
    pub name: String,
}

/// Decode-side mirror with every field optional, so absence is
/// distinguished from a JSON syntax error.
#[derive(Deserialize)]
struct RawSnapshot {
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    ry: Option<f64>,
    #[serde(rename = "char")]
    character: Option<String>,
    anim: Option<String>,
    name: Option<String>,
}

impl PlayerSnapshot {
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Serialize for broadcast. Non-finite floats are refused here
    /// because the JSON writer would silently emit null for them.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        for (v, name) in [(self.x, "x"), (self.y, "y"), (self.z, "z"), (self.ry, "ry")] {
            if !v.is_finite() {
                return Err(ProtocolError::NonFinite(name));
            }
        }
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse and validate an inbound payload. Required fields must be
    /// present and finite; yaw is wrapped; strings are capped.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let raw: RawSnapshot = serde_json::from_slice(payload)?;

        let x = require_finite(raw.x, "x")?;
        let y = require_finite(raw.y, "y")?;
        let z = require_finite(raw.z, "z")?;
        let ry = require_finite(raw.ry, "ry")?;

        Ok(PlayerSnapshot {
            x,
            y,
            z,
            ry: wrap_angle(ry),
            character: cap_string(raw.character.ok_or(ProtocolError::MissingField("char"))?),
            anim: cap_string(raw.anim.ok_or(ProtocolError::MissingField("anim"))?),
            name: cap_string(raw.name.ok_or(ProtocolError::MissingField("name"))?),
        })
    }
}

fn require_finite(field: Option<f64>, name: &'static str) -> Result<f32, ProtocolError> {
    let v = field.ok_or(ProtocolError::MissingField(name))?;
    if !v.is_finite() {
        return Err(ProtocolError::NonFinite(name));
    }
    let v = v as f32;
    // An f64 in range for JSON can still overflow f32.
    if !v.is_finite() {
        return Err(ProtocolError::NonFinite(name));
    }
    Ok(v)
}

fn cap_string(mut s: String) -> String {
    if s.len() > MAX_WIRE_STRING {
        let mut end = MAX_WIRE_STRING;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}

/// Wrap an angle into [-pi, pi). Angles already in range pass through
/// untouched, so an in-range yaw survives decode bit-exactly. Shared by
/// snapshot validation and the shortest-path yaw interpolators.
pub fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if (-PI..PI).contains(&angle) {
        return angle;
    }
    (angle + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PlayerSnapshot {
        PlayerSnapshot {
            x: 10.0,
            y: 0.0,
            z: 5.0,
            ry: 1.57,
            character: "a".into(),
            anim: "walk".into(),
            name: "Bob".into(),
        }
    }

    #[test]
    fn test_decode_valid_snapshot() {
        let payload = br#"{"x":10,"y":0,"z":5,"ry":1.57,"char":"a","anim":"walk","name":"Bob"}"#;
        let snap = PlayerSnapshot::decode(payload).unwrap();
        assert_eq!(snap, sample());
    }

    #[test]
    fn test_encode_decode_preserves_fields() {
        let bytes = sample().encode().unwrap();
        assert_eq!(PlayerSnapshot::decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_missing_field_rejected() {
        let payload = br#"{"x":10,"y":0,"z":5,"char":"a","anim":"walk","name":"Bob"}"#;
        match PlayerSnapshot::decode(payload) {
            Err(ProtocolError::MissingField("ry")) => {}
            other => panic!("expected missing ry, got {other:?}"),
        }
    }

    #[test]
    fn test_null_field_rejected() {
        let payload = br#"{"x":null,"y":0,"z":5,"ry":0,"char":"a","anim":"w","name":"n"}"#;
        assert!(matches!(
            PlayerSnapshot::decode(payload),
            Err(ProtocolError::MissingField("x"))
        ));
    }

    #[test]
    fn test_f32_overflow_rejected() {
        // Finite as f64, infinite once narrowed to f32.
        let payload = br#"{"x":1e200,"y":0,"z":5,"ry":0,"char":"a","anim":"w","name":"n"}"#;
        assert!(matches!(
            PlayerSnapshot::decode(payload),
            Err(ProtocolError::NonFinite("x"))
        ));
    }

    #[test]
    fn test_encode_refuses_non_finite() {
        let mut snap = sample();
        snap.ry = f32::INFINITY;
        assert!(matches!(snap.encode(), Err(ProtocolError::NonFinite("ry"))));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            PlayerSnapshot::decode(b"not json"),
            Err(ProtocolError::Syntax(_))
        ));
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let payload =
            br#"{"x":1,"y":2,"z":3,"ry":0,"char":"a","anim":"w","name":"n","extra":true}"#;
        assert!(PlayerSnapshot::decode(payload).is_ok());
    }

    #[test]
    fn test_overlong_strings_capped() {
        let long = "x".repeat(300);
        let payload = format!(
            r#"{{"x":1,"y":2,"z":3,"ry":0,"char":"a","anim":"w","name":"{long}"}}"#
        );
        let snap = PlayerSnapshot::decode(payload.as_bytes()).unwrap();
        assert_eq!(snap.name.len(), MAX_WIRE_STRING);
    }

    #[test]
    fn test_yaw_wraps_into_range() {
        let payload = br#"{"x":1,"y":2,"z":3,"ry":10.0,"char":"a","anim":"w","name":"n"}"#;
        let snap = PlayerSnapshot::decode(payload).unwrap();
        assert!(snap.ry >= -std::f32::consts::PI && snap.ry < std::f32::consts::PI);
        assert!((snap.ry - (10.0 - 2.0 * std::f32::consts::TAU)).abs() < 1e-4);
    }

    #[test]
    fn test_wrap_angle() {
        use std::f32::consts::PI;
        assert!((wrap_angle(0.0)).abs() < 1e-6);
        assert!((wrap_angle(PI + 0.1) - (-PI + 0.1)).abs() < 1e-5);
        assert!((wrap_angle(-PI - 0.1) - (PI - 0.1)).abs() < 1e-5);
    }

    #[test]
    fn test_in_range_yaw_passes_through_bit_exact() {
        use std::f32::consts::PI;
        // The wrap's add-reduce-subtract would perturb values like 1.57
        // by an ulp; in-range angles must not be touched at all.
        for ry in [1.57f32, -3.14, 0.0, -PI, PI - 1e-6] {
            assert_eq!(wrap_angle(ry).to_bits(), ry.to_bits());
        }
    }
}
