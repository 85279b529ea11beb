//! Body Composition Measurement (0x2A9C): Flags-driven optional body
//! metrics, with several fields whose unit (metric/imperial) and
//! resolution are chosen by the Measurement Units flag bit.
//!
//! Wire layout: Flags(2) + Body Fat Percentage(2, 0.1% resolution) +
//! \[Timestamp(7)\] + \[User ID(1)\] + \[Basal Metabolism(2)\] +
//! \[Muscle Mass(2)\] + \[Muscle Percentage(2)\] + \[Fat Free Mass(2)\] +
//! \[Soft Lean Mass(2)\] + \[Body Water Mass(2)\] + \[Impedance(2)\] +
//! \[Weight(2)\] + \[Height(2)\], each mass field in 0.005 kg (metric) or
//! 0.01 lb (imperial) steps, height in 0.001 m (metric) or 0.1 in
//! (imperial) steps.

use crate::characteristic::builtin::glucose_measurement::Ieee11073Timestamp;
use crate::characteristic::class_registry::ClassRegistry;
use crate::characteristic::{Characteristic, CharacteristicDescriptor, LengthSpec, ParseOutcome};
use crate::codec::primitives::{read_u16, test_bit};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{CharacteristicContext, ParsedValue, ValueType};

const IMPERIAL_UNITS_BIT: u32 = 0;
const TIMESTAMP_PRESENT_BIT: u32 = 1;
const USER_ID_PRESENT_BIT: u32 = 2;
const BASAL_METABOLISM_PRESENT_BIT: u32 = 3;
const MUSCLE_MASS_PRESENT_BIT: u32 = 4;
const MUSCLE_PERCENTAGE_PRESENT_BIT: u32 = 5;
const FAT_FREE_MASS_PRESENT_BIT: u32 = 6;
const SOFT_LEAN_MASS_PRESENT_BIT: u32 = 7;
const BODY_WATER_MASS_PRESENT_BIT: u32 = 8;
const IMPEDANCE_PRESENT_BIT: u32 = 9;
const WEIGHT_PRESENT_BIT: u32 = 10;
const HEIGHT_PRESENT_BIT: u32 = 11;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MeasurementUnits {
    Metric,
    Imperial,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BodyCompositionMeasurement {
    pub flags: u16,
    pub body_fat_percentage: f64,
    pub timestamp: Option<Ieee11073Timestamp>,
    pub user_id: Option<u8>,
    pub basal_metabolism_kj: Option<u16>,
    pub muscle_mass: Option<f64>,
    pub muscle_percentage: Option<f64>,
    pub fat_free_mass: Option<f64>,
    pub soft_lean_mass: Option<f64>,
    pub body_water_mass: Option<f64>,
    pub impedance_ohm: Option<f64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
}

impl Default for MeasurementUnits {
    fn default() -> Self {
        MeasurementUnits::Metric
    }
}

impl BodyCompositionMeasurement {
    pub fn measurement_units(&self) -> MeasurementUnits {
        if test_bit(self.flags as u32, IMPERIAL_UNITS_BIT) { MeasurementUnits::Imperial } else { MeasurementUnits::Metric }
    }

    fn mass_resolution(imperial: bool) -> f64 {
        if imperial { 0.01 } else { 0.005 }
    }

    fn height_resolution(imperial: bool) -> f64 {
        if imperial { 0.1 } else { 0.001 }
    }
}

impl Characteristic for BodyCompositionMeasurement {
    const INFO: CharacteristicDescriptor = CharacteristicDescriptor {
        name: "Body Composition Measurement",
        uuid: "2A9C",
        value_type: ValueType::Bitfield,
    };

    fn length_spec() -> LengthSpec {
        LengthSpec::Variable { min: 4 }
    }

    fn decode_value(bytes: &[u8], _ctx: Option<&CharacteristicContext>) -> Result<ParseOutcome<Self>> {
        let (flags, offset) = read_u16(bytes, 0)?;
        let flags_bits = flags as u32;
        let imperial = test_bit(flags_bits, IMPERIAL_UNITS_BIT);
        let mass_resolution = Self::mass_resolution(imperial);
        let height_resolution = Self::height_resolution(imperial);

        let (body_fat_raw, mut offset) = read_u16(bytes, offset)?;
        let body_fat_percentage = body_fat_raw as f64 * 0.1;

        let mut timestamp = None;
        if test_bit(flags_bits, TIMESTAMP_PRESENT_BIT) && bytes.len() >= offset + 7 {
            let (ts, new_offset) = Ieee11073Timestamp::decode(bytes, offset)?;
            timestamp = Some(ts);
            offset = new_offset;
        }

        let mut user_id = None;
        if test_bit(flags_bits, USER_ID_PRESENT_BIT) && bytes.len() >= offset + 1 {
            user_id = Some(bytes[offset]);
            offset += 1;
        }

        let mut basal_metabolism_kj = None;
        if test_bit(flags_bits, BASAL_METABOLISM_PRESENT_BIT) && bytes.len() >= offset + 2 {
            let (v, new_offset) = read_u16(bytes, offset)?;
            basal_metabolism_kj = Some(v);
            offset = new_offset;
        }

        let mut read_mass = |present_bit: u32, offset: &mut usize| -> Result<Option<f64>> {
            if test_bit(flags_bits, present_bit) && bytes.len() >= *offset + 2 {
                let (raw, new_offset) = read_u16(bytes, *offset)?;
                *offset = new_offset;
                Ok(Some(raw as f64 * mass_resolution))
            } else {
                Ok(None)
            }
        };

        let muscle_mass = read_mass(MUSCLE_MASS_PRESENT_BIT, &mut offset)?;

        let mut muscle_percentage = None;
        if test_bit(flags_bits, MUSCLE_PERCENTAGE_PRESENT_BIT) && bytes.len() >= offset + 2 {
            let (raw, new_offset) = read_u16(bytes, offset)?;
            muscle_percentage = Some(raw as f64 * 0.1);
            offset = new_offset;
        }

        let fat_free_mass = read_mass(FAT_FREE_MASS_PRESENT_BIT, &mut offset)?;
        let soft_lean_mass = read_mass(SOFT_LEAN_MASS_PRESENT_BIT, &mut offset)?;
        let body_water_mass = read_mass(BODY_WATER_MASS_PRESENT_BIT, &mut offset)?;

        let mut impedance_ohm = None;
        if test_bit(flags_bits, IMPEDANCE_PRESENT_BIT) && bytes.len() >= offset + 2 {
            let (raw, new_offset) = read_u16(bytes, offset)?;
            impedance_ohm = Some(raw as f64 * 0.1);
            offset = new_offset;
        }

        let weight = read_mass(WEIGHT_PRESENT_BIT, &mut offset)?;

        let mut height = None;
        if test_bit(flags_bits, HEIGHT_PRESENT_BIT) && bytes.len() >= offset + 2 {
            let (raw, _) = read_u16(bytes, offset)?;
            height = Some(raw as f64 * height_resolution);
        }

        Ok(ParseOutcome::Value(BodyCompositionMeasurement {
            flags,
            body_fat_percentage,
            timestamp,
            user_id,
            basal_metabolism_kj,
            muscle_mass,
            muscle_percentage,
            fat_free_mass,
            soft_lean_mass,
            body_water_mass,
            impedance_ohm,
            weight,
            height,
        }))
    }

    fn encode_value(&self) -> Result<Vec<u8>> {
        let imperial = self.measurement_units() == MeasurementUnits::Imperial;
        let mass_resolution = Self::mass_resolution(imperial);
        let height_resolution = Self::height_resolution(imperial);

        let mut flags = 0u16;
        if imperial {
            flags |= 1 << IMPERIAL_UNITS_BIT;
        }
        if self.timestamp.is_some() {
            flags |= 1 << TIMESTAMP_PRESENT_BIT;
        }
        if self.user_id.is_some() {
            flags |= 1 << USER_ID_PRESENT_BIT;
        }
        if self.basal_metabolism_kj.is_some() {
            flags |= 1 << BASAL_METABOLISM_PRESENT_BIT;
        }
        if self.muscle_mass.is_some() {
            flags |= 1 << MUSCLE_MASS_PRESENT_BIT;
        }
        if self.muscle_percentage.is_some() {
            flags |= 1 << MUSCLE_PERCENTAGE_PRESENT_BIT;
        }
        if self.fat_free_mass.is_some() {
            flags |= 1 << FAT_FREE_MASS_PRESENT_BIT;
        }
        if self.soft_lean_mass.is_some() {
            flags |= 1 << SOFT_LEAN_MASS_PRESENT_BIT;
        }
        if self.body_water_mass.is_some() {
            flags |= 1 << BODY_WATER_MASS_PRESENT_BIT;
        }
        if self.impedance_ohm.is_some() {
            flags |= 1 << IMPEDANCE_PRESENT_BIT;
        }
        if self.weight.is_some() {
            flags |= 1 << WEIGHT_PRESENT_BIT;
        }
        if self.height.is_some() {
            flags |= 1 << HEIGHT_PRESENT_BIT;
        }

        let mut out = flags.to_le_bytes().to_vec();
        out.extend_from_slice(&((self.body_fat_percentage / 0.1).round() as u16).to_le_bytes());
        if let Some(ts) = self.timestamp {
            out.extend_from_slice(&ts.encode());
        }
        if let Some(id) = self.user_id {
            out.push(id);
        }
        if let Some(basal) = self.basal_metabolism_kj {
            out.extend_from_slice(&basal.to_le_bytes());
        }
        let mut push_mass = |mass: Option<f64>, out: &mut Vec<u8>| -> Result<()> {
            if let Some(mass) = mass {
                let raw = (mass / mass_resolution).round();
                if !(0.0..=u16::MAX as f64).contains(&raw) {
                    return Err(Error::with_message(
                        ErrorKind::Encode(Self::INFO.name.into(), mass.to_string()),
                        "mass field out of uint16 range",
                    ));
                }
                out.extend_from_slice(&(raw as u16).to_le_bytes());
            }
            Ok(())
        };
        push_mass(self.muscle_mass, &mut out)?;
        if let Some(percentage) = self.muscle_percentage {
            out.extend_from_slice(&((percentage / 0.1).round() as u16).to_le_bytes());
        }
        push_mass(self.fat_free_mass, &mut out)?;
        push_mass(self.soft_lean_mass, &mut out)?;
        push_mass(self.body_water_mass, &mut out)?;
        if let Some(impedance) = self.impedance_ohm {
            out.extend_from_slice(&((impedance / 0.1).round() as u16).to_le_bytes());
        }
        push_mass(self.weight, &mut out)?;
        if let Some(height) = self.height {
            out.extend_from_slice(&((height / height_resolution).round() as u16).to_le_bytes());
        }
        Ok(out)
    }

    fn numeric_value(&self) -> Option<f64> {
        Some(self.body_fat_percentage)
    }

    fn to_parsed_value(&self) -> ParsedValue {
        ParsedValue::Structured(serde_json::json!({
            "body_fat_percentage": self.body_fat_percentage,
            "timestamp": self.timestamp.map(|ts| serde_json::json!({
                "year": ts.year,
                "month": ts.month,
                "day": ts.day,
                "hour": ts.hour,
                "minute": ts.minute,
                "second": ts.second,
            })),
            "user_id": self.user_id,
            "basal_metabolism_kj": self.basal_metabolism_kj,
            "muscle_mass": self.muscle_mass,
            "muscle_percentage": self.muscle_percentage,
            "fat_free_mass": self.fat_free_mass,
            "soft_lean_mass": self.soft_lean_mass,
            "body_water_mass": self.body_water_mass,
            "impedance_ohm": self.impedance_ohm,
            "weight": self.weight,
            "height": self.height,
        }))
    }

    fn from_parsed_value(value: &ParsedValue) -> Result<Self> {
        let ParsedValue::Structured(json) = value else {
            return Err(Error::with_message(
                ErrorKind::Encode(Self::INFO.name.into(), "expected a structured measurement payload".into()),
                "unsupported ParsedValue variant",
            ));
        };
        let body_fat_percentage = json.get("body_fat_percentage").and_then(|v| v.as_f64()).ok_or_else(|| {
            Error::with_message(
                ErrorKind::Encode(Self::INFO.name.into(), "malformed structured payload".into()),
                "body_fat_percentage is missing or not a number",
            )
        })?;
        let timestamp = match json.get("timestamp") {
            Some(ts) if !ts.is_null() => {
                let field = |name: &str| -> Option<u64> { ts.get(name)?.as_u64() };
                let missing = || {
                    Error::with_message(
                        ErrorKind::Encode(Self::INFO.name.into(), "malformed timestamp payload".into()),
                        "timestamp JSON is missing a required field",
                    )
                };
                Some(Ieee11073Timestamp {
                    year: field("year").ok_or_else(missing)? as u16,
                    month: field("month").ok_or_else(missing)? as u8,
                    day: field("day").ok_or_else(missing)? as u8,
                    hour: field("hour").ok_or_else(missing)? as u8,
                    minute: field("minute").ok_or_else(missing)? as u8,
                    second: field("second").ok_or_else(missing)? as u8,
                })
            }
            _ => None,
        };
        Ok(BodyCompositionMeasurement {
            flags: 0,
            body_fat_percentage,
            timestamp,
            user_id: json.get("user_id").and_then(|v| v.as_u64()).map(|v| v as u8),
            basal_metabolism_kj: json.get("basal_metabolism_kj").and_then(|v| v.as_u64()).map(|v| v as u16),
            muscle_mass: json.get("muscle_mass").and_then(|v| v.as_f64()),
            muscle_percentage: json.get("muscle_percentage").and_then(|v| v.as_f64()),
            fat_free_mass: json.get("fat_free_mass").and_then(|v| v.as_f64()),
            soft_lean_mass: json.get("soft_lean_mass").and_then(|v| v.as_f64()),
            body_water_mass: json.get("body_water_mass").and_then(|v| v.as_f64()),
            impedance_ohm: json.get("impedance_ohm").and_then(|v| v.as_f64()),
            weight: json.get("weight").and_then(|v| v.as_f64()),
            height: json.get("height").and_then(|v| v.as_f64()),
        })
    }
}

pub(crate) fn register(registry: &mut ClassRegistry) {
    registry.insert_builtin::<BodyCompositionMeasurement>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_minimal_metric_measurement() {
        let bytes = vec![0x00, 0x00, 150, 0x00]; // body fat 15.0%
        let ParseOutcome::Value(m) = BodyCompositionMeasurement::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert!((m.body_fat_percentage - 15.0).abs() < 1e-9);
        assert_eq!(m.measurement_units(), MeasurementUnits::Metric);
    }

    #[test]
    fn weight_and_height_round_trip_metric() {
        let mut m = BodyCompositionMeasurement { body_fat_percentage: 20.0, ..Default::default() };
        m.weight = Some(70.5);
        m.height = Some(1.75);
        let bytes = m.encode_value().unwrap();
        let ParseOutcome::Value(decoded) = BodyCompositionMeasurement::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert!((decoded.weight.unwrap() - 70.5).abs() < 1e-6);
        assert!((decoded.height.unwrap() - 1.75).abs() < 1e-6);
    }

    #[test]
    fn structured_value_preserves_every_optional_field() {
        let m = BodyCompositionMeasurement {
            body_fat_percentage: 22.5,
            timestamp: Some(Ieee11073Timestamp { year: 2026, month: 7, day: 27, hour: 9, minute: 15, second: 0 }),
            user_id: Some(3),
            basal_metabolism_kj: Some(6800),
            muscle_mass: Some(55.0),
            muscle_percentage: Some(40.0),
            fat_free_mass: Some(60.0),
            soft_lean_mass: Some(58.0),
            body_water_mass: Some(45.0),
            impedance_ohm: Some(500.0),
            weight: Some(70.5),
            height: Some(1.75),
            ..Default::default()
        };

        let structured = m.to_parsed_value();
        let rebuilt = BodyCompositionMeasurement::from_parsed_value(&structured).unwrap();
        assert_eq!(rebuilt.body_fat_percentage, m.body_fat_percentage);
        assert_eq!(rebuilt.timestamp, m.timestamp);
        assert_eq!(rebuilt.user_id, m.user_id);
        assert_eq!(rebuilt.basal_metabolism_kj, m.basal_metabolism_kj);
        assert_eq!(rebuilt.muscle_mass, m.muscle_mass);
        assert_eq!(rebuilt.muscle_percentage, m.muscle_percentage);
        assert_eq!(rebuilt.fat_free_mass, m.fat_free_mass);
        assert_eq!(rebuilt.soft_lean_mass, m.soft_lean_mass);
        assert_eq!(rebuilt.body_water_mass, m.body_water_mass);
        assert_eq!(rebuilt.impedance_ohm, m.impedance_ohm);
        assert_eq!(rebuilt.weight, m.weight);
        assert_eq!(rebuilt.height, m.height);
    }
}
