//! Cycling Power Vector (0x2A64): per-revolution force/torque vectors at a
//! starting crank angle.
//!
//! Wire layout: Flags(1) + Crank Revolution Data(2) + Last Crank Event
//! Time(2, 1/1024 s units) + First Crank Measurement Angle(2, 1/180 degree
//! units) + \[Instantaneous Force Magnitude Array\] +
//! \[Instantaneous Torque Magnitude Array\], each array element a signed
//! 16-bit magnitude.
//!
//! When both the force (bit 0) and torque (bit 1) flags are set, the force
//! array is never read — the torque flag suppresses it and the remaining
//! bytes are read as torque values instead.

use crate::characteristic::class_registry::ClassRegistry;
use crate::characteristic::{Characteristic, CharacteristicDescriptor, LengthSpec, ParseOutcome};
use crate::codec::primitives::{read_i16, read_u16, read_u8, test_bit};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{CharacteristicContext, ParsedValue, ValueType};

const FORCE_MAGNITUDE_ARRAY_PRESENT_BIT: u32 = 0;
const TORQUE_MAGNITUDE_ARRAY_PRESENT_BIT: u32 = 1;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CyclingPowerVector {
    pub flags: u8,
    pub crank_revolutions: u16,
    pub last_crank_event_time_seconds: f64,
    pub first_crank_measurement_angle_degrees: f64,
    pub instantaneous_force_magnitudes_newtons: Vec<i16>,
    pub instantaneous_torque_magnitudes_newton_meters: Vec<f64>,
}

impl Characteristic for CyclingPowerVector {
    const INFO: CharacteristicDescriptor =
        CharacteristicDescriptor { name: "Cycling Power Vector", uuid: "2A64", value_type: ValueType::Bitfield };

    fn length_spec() -> LengthSpec {
        LengthSpec::Variable { min: 7 }
    }

    fn decode_value(bytes: &[u8], _ctx: Option<&CharacteristicContext>) -> Result<ParseOutcome<Self>> {
        let (flags, offset) = read_u8(bytes, 0)?;
        let flags_bits = flags as u32;
        let (crank_revolutions, offset) = read_u16(bytes, offset)?;
        let (event_time_raw, offset) = read_u16(bytes, offset)?;
        let (angle_raw, mut offset) = read_u16(bytes, offset)?;

        let mut instantaneous_force_magnitudes_newtons = Vec::new();
        if test_bit(flags_bits, FORCE_MAGNITUDE_ARRAY_PRESENT_BIT) && bytes.len() > offset {
            while offset + 1 < bytes.len() && !test_bit(flags_bits, TORQUE_MAGNITUDE_ARRAY_PRESENT_BIT) {
                if offset + 2 > bytes.len() {
                    break;
                }
                let (force, new_offset) = read_i16(bytes, offset)?;
                instantaneous_force_magnitudes_newtons.push(force);
                offset = new_offset;
            }
        }

        let mut instantaneous_torque_magnitudes_newton_meters = Vec::new();
        if test_bit(flags_bits, TORQUE_MAGNITUDE_ARRAY_PRESENT_BIT) && bytes.len() > offset {
            while offset + 1 < bytes.len() {
                if offset + 2 > bytes.len() {
                    break;
                }
                let (torque, new_offset) = read_i16(bytes, offset)?;
                instantaneous_torque_magnitudes_newton_meters.push(torque as f64 / 32.0);
                offset = new_offset;
            }
        }

        Ok(ParseOutcome::Value(CyclingPowerVector {
            flags,
            crank_revolutions,
            last_crank_event_time_seconds: event_time_raw as f64 / 1024.0,
            first_crank_measurement_angle_degrees: angle_raw as f64 / 180.0,
            instantaneous_force_magnitudes_newtons,
            instantaneous_torque_magnitudes_newton_meters,
        }))
    }

    fn encode_value(&self) -> Result<Vec<u8>> {
        let mut flags = 0u8;
        if !self.instantaneous_force_magnitudes_newtons.is_empty() {
            flags |= 1 << FORCE_MAGNITUDE_ARRAY_PRESENT_BIT;
        }
        if !self.instantaneous_torque_magnitudes_newton_meters.is_empty() {
            flags |= 1 << TORQUE_MAGNITUDE_ARRAY_PRESENT_BIT;
        }

        let event_time_raw = (self.last_crank_event_time_seconds * 1024.0).round();
        let angle_raw = (self.first_crank_measurement_angle_degrees * 180.0).round();
        if !(0.0..=u16::MAX as f64).contains(&event_time_raw) || !(0.0..=u16::MAX as f64).contains(&angle_raw) {
            return Err(Error::with_message(
                ErrorKind::Encode(Self::INFO.name.into(), "event time or angle".into()),
                "event time or angle exceeds uint16 range",
            ));
        }

        let mut out = vec![flags];
        out.extend_from_slice(&self.crank_revolutions.to_le_bytes());
        out.extend_from_slice(&(event_time_raw as u16).to_le_bytes());
        out.extend_from_slice(&(angle_raw as u16).to_le_bytes());
        for force in &self.instantaneous_force_magnitudes_newtons {
            out.extend_from_slice(&force.to_le_bytes());
        }
        for torque in &self.instantaneous_torque_magnitudes_newton_meters {
            let raw = (torque * 32.0).round() as i16;
            out.extend_from_slice(&raw.to_le_bytes());
        }
        Ok(out)
    }

    fn to_parsed_value(&self) -> ParsedValue {
        ParsedValue::Int(self.crank_revolutions as i64)
    }

    fn from_parsed_value(value: &ParsedValue) -> Result<Self> {
        match *value {
            ParsedValue::Int(crank_revolutions) if (0..=u16::MAX as i64).contains(&crank_revolutions) => {
                Ok(CyclingPowerVector { crank_revolutions: crank_revolutions as u16, ..Default::default() })
            }
            _ => Err(Error::with_message(
                ErrorKind::Encode(Self::INFO.name.into(), "expected a uint16 crank revolution count".into()),
                "unsupported ParsedValue variant",
            )),
        }
    }
}

pub(crate) fn register(registry: &mut ClassRegistry) {
    registry.insert_builtin::<CyclingPowerVector>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_mandatory_fields_without_arrays() {
        let bytes = vec![0x00, 0x0A, 0x00, 0x00, 0x04, 0x5A, 0x00];
        let ParseOutcome::Value(v) = CyclingPowerVector::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(v.crank_revolutions, 10);
        assert!(v.instantaneous_force_magnitudes_newtons.is_empty());
    }

    #[test]
    fn force_array_is_suppressed_when_torque_flag_also_set() {
        let flags = (1u8 << FORCE_MAGNITUDE_ARRAY_PRESENT_BIT) | (1u8 << TORQUE_MAGNITUDE_ARRAY_PRESENT_BIT);
        let mut bytes = vec![flags, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&32i16.to_le_bytes()); // read as torque, not force
        let ParseOutcome::Value(v) = CyclingPowerVector::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert!(v.instantaneous_force_magnitudes_newtons.is_empty());
        assert_eq!(v.instantaneous_torque_magnitudes_newton_meters, vec![1.0]);
    }

    #[test]
    fn force_only_array_round_trips() {
        let mut v = CyclingPowerVector { crank_revolutions: 1, ..Default::default() };
        v.instantaneous_force_magnitudes_newtons = vec![100, -50];
        let bytes = v.encode_value().unwrap();
        let ParseOutcome::Value(decoded) = CyclingPowerVector::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(decoded.instantaneous_force_magnitudes_newtons, vec![100, -50]);
    }
}
