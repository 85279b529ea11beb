//! Heart Rate Measurement (0x2A37): a Flags byte driving the size of the
//! heart rate value (`uint8` or `uint16`) and the presence of optional
//! sensor contact status, energy expended, and one or more RR-Interval
//! fields (each `uint16` in 1/1024-second units).

use crate::characteristic::class_registry::ClassRegistry;
use crate::characteristic::{Characteristic, CharacteristicDescriptor, LengthSpec, ParseOutcome};
use crate::codec::primitives::{extract_bit_field, read_u16, read_u8, test_bit};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{CharacteristicContext, ParsedValue, ValueType};

const VALUE_FORMAT_BIT: u32 = 0;
const SENSOR_CONTACT_SUPPORTED_BIT: u32 = 1;
const SENSOR_CONTACT_DETECTED_BIT: u32 = 2;
const ENERGY_EXPENDED_PRESENT_BIT: u32 = 3;
const RR_INTERVAL_PRESENT_BIT: u32 = 4;

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SensorContactStatus {
    NotSupported,
    SupportedNotDetected,
    SupportedAndDetected,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeartRateMeasurement {
    pub heart_rate_bpm: u16,
    pub sensor_contact: SensorContactStatus,
    pub energy_expended_kj: Option<u16>,
    /// RR-Intervals in seconds, each originally a `uint16` in 1/1024 s units.
    pub rr_intervals: Vec<f64>,
}

impl Characteristic for HeartRateMeasurement {
    const INFO: CharacteristicDescriptor =
        CharacteristicDescriptor { name: "Heart Rate Measurement", uuid: "2A37", value_type: ValueType::Bitfield };

    fn length_spec() -> LengthSpec {
        LengthSpec::Variable { min: 2 }
    }

    fn decode_value(bytes: &[u8], _ctx: Option<&CharacteristicContext>) -> Result<ParseOutcome<Self>> {
        let (flags, mut offset) = read_u8(bytes, 0)?;
        let flags = flags as u32;

        let heart_rate_bpm = if test_bit(flags, VALUE_FORMAT_BIT) {
            let (v, new_offset) = read_u16(bytes, offset)?;
            offset = new_offset;
            v
        } else {
            let (v, new_offset) = read_u8(bytes, offset)?;
            offset = new_offset;
            v as u16
        };

        let sensor_contact = if !test_bit(flags, SENSOR_CONTACT_SUPPORTED_BIT) {
            SensorContactStatus::NotSupported
        } else if test_bit(flags, SENSOR_CONTACT_DETECTED_BIT) {
            SensorContactStatus::SupportedAndDetected
        } else {
            SensorContactStatus::SupportedNotDetected
        };

        let energy_expended_kj = if test_bit(flags, ENERGY_EXPENDED_PRESENT_BIT) {
            let (v, new_offset) = read_u16(bytes, offset)?;
            offset = new_offset;
            Some(v)
        } else {
            None
        };

        let mut rr_intervals = Vec::new();
        if test_bit(flags, RR_INTERVAL_PRESENT_BIT) {
            while offset + 2 <= bytes.len() {
                let (raw, new_offset) = read_u16(bytes, offset)?;
                offset = new_offset;
                rr_intervals.push(raw as f64 / 1024.0);
            }
        }
        let _ = extract_bit_field(flags, 5, 3); // reserved bits, intentionally unused

        Ok(ParseOutcome::Value(HeartRateMeasurement { heart_rate_bpm, sensor_contact, energy_expended_kj, rr_intervals }))
    }

    fn encode_value(&self) -> Result<Vec<u8>> {
        if self.rr_intervals.is_empty() && self.energy_expended_kj.is_none() && self.heart_rate_bpm <= u8::MAX as u16 {
            return Ok(vec![0x00, self.heart_rate_bpm as u8]);
        }
        let mut flags = 0u8;
        let wide_value = self.heart_rate_bpm > u8::MAX as u16;
        if wide_value {
            flags |= 1 << VALUE_FORMAT_BIT;
        }
        match self.sensor_contact {
            SensorContactStatus::NotSupported => {}
            SensorContactStatus::SupportedNotDetected => flags |= 1 << SENSOR_CONTACT_SUPPORTED_BIT,
            SensorContactStatus::SupportedAndDetected => {
                flags |= (1 << SENSOR_CONTACT_SUPPORTED_BIT) | (1 << SENSOR_CONTACT_DETECTED_BIT)
            }
        }
        if self.energy_expended_kj.is_some() {
            flags |= 1 << ENERGY_EXPENDED_PRESENT_BIT;
        }
        if !self.rr_intervals.is_empty() {
            flags |= 1 << RR_INTERVAL_PRESENT_BIT;
        }

        let mut out = vec![flags];
        if wide_value {
            out.extend_from_slice(&self.heart_rate_bpm.to_le_bytes());
        } else {
            out.push(self.heart_rate_bpm as u8);
        }
        if let Some(energy) = self.energy_expended_kj {
            out.extend_from_slice(&energy.to_le_bytes());
        }
        for rr in &self.rr_intervals {
            let raw = (rr * 1024.0).round();
            if !(0.0..=u16::MAX as f64).contains(&raw) {
                return Err(Error::with_message(
                    ErrorKind::Encode(Self::INFO.name.into(), rr.to_string()),
                    "RR-interval out of uint16 range",
                ));
            }
            out.extend_from_slice(&(raw as u16).to_le_bytes());
        }
        Ok(out)
    }

    fn numeric_value(&self) -> Option<f64> {
        Some(self.heart_rate_bpm as f64)
    }

    fn to_parsed_value(&self) -> ParsedValue {
        ParsedValue::Int(self.heart_rate_bpm as i64)
    }

    fn from_parsed_value(value: &ParsedValue) -> Result<Self> {
        match *value {
            ParsedValue::Int(bpm) if bpm >= 0 => Ok(HeartRateMeasurement {
                heart_rate_bpm: bpm as u16,
                sensor_contact: SensorContactStatus::NotSupported,
                energy_expended_kj: None,
                rr_intervals: Vec::new(),
            }),
            _ => Err(Error::with_message(
                ErrorKind::Encode(Self::INFO.name.into(), "expected a non-negative Int bpm".into()),
                "unsupported ParsedValue variant",
            )),
        }
    }
}

pub(crate) fn register(registry: &mut ClassRegistry) {
    registry.insert_builtin::<HeartRateMeasurement>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_uint8_form_without_optional_fields() {
        let ParseOutcome::Value(hr) = HeartRateMeasurement::decode_value(&[0x00, 72], None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(hr.heart_rate_bpm, 72);
        assert_eq!(hr.sensor_contact, SensorContactStatus::NotSupported);
        assert!(hr.rr_intervals.is_empty());
    }

    #[test]
    fn decodes_rr_intervals_and_energy() {
        let flags = (1 << ENERGY_EXPENDED_PRESENT_BIT) | (1 << RR_INTERVAL_PRESENT_BIT);
        let mut bytes = vec![flags as u8, 80];
        bytes.extend_from_slice(&300u16.to_le_bytes());
        bytes.extend_from_slice(&1024u16.to_le_bytes());
        let ParseOutcome::Value(hr) = HeartRateMeasurement::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(hr.energy_expended_kj, Some(300));
        assert_eq!(hr.rr_intervals, vec![1.0]);
    }
}
