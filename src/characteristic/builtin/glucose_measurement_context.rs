//! Glucose Measurement Context (0x2A34): Flags-driven optional context
//! fields for a glucose reading — carbohydrate intake, meal, tester/health,
//! exercise, medication, and HbA1c.
//!
//! Wire layout: Flags(1) + Sequence Number(2) + \[Extended Flags(1)\] +
//! \[Carbohydrate ID(1) + Carbohydrate(2)\] + \[Meal(1)\] +
//! \[Tester/Health(1)\] + \[Exercise Duration(2) + Exercise Intensity(1)\] +
//! \[Medication ID(1) + Medication(2)\] + \[HbA1c(2)\].

use crate::characteristic::class_registry::ClassRegistry;
use crate::characteristic::{Characteristic, CharacteristicDescriptor, LengthSpec, ParseOutcome};
use crate::codec::primitives::{decode_medfloat16, read_u16, read_u8, test_bit, Medfloat};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{CharacteristicContext, ParsedValue, ValueType};

const EXTENDED_FLAGS_PRESENT_BIT: u32 = 0;
const CARBOHYDRATE_PRESENT_BIT: u32 = 1;
const MEAL_PRESENT_BIT: u32 = 2;
const TESTER_HEALTH_PRESENT_BIT: u32 = 3;
const EXERCISE_PRESENT_BIT: u32 = 4;
const MEDICATION_PRESENT_BIT: u32 = 5;
const HBA1C_PRESENT_BIT: u32 = 6;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlucoseMeasurementContext {
    pub sequence_number: u16,
    pub flags: u8,
    pub extended_flags: Option<u8>,
    pub carbohydrate_id: Option<u8>,
    pub carbohydrate_kg: Option<Medfloat>,
    pub meal: Option<u8>,
    pub tester: Option<u8>,
    pub health: Option<u8>,
    pub exercise_duration_seconds: Option<u16>,
    pub exercise_intensity_percent: Option<u8>,
    pub medication_id: Option<u8>,
    pub medication_kg: Option<Medfloat>,
    pub hba1c_percent: Option<Medfloat>,
}

impl Characteristic for GlucoseMeasurementContext {
    const INFO: CharacteristicDescriptor = CharacteristicDescriptor {
        name: "Glucose Measurement Context",
        uuid: "2A34",
        value_type: ValueType::Bitfield,
    };

    fn length_spec() -> LengthSpec {
        LengthSpec::Variable { min: 3 }
    }

    fn decode_value(bytes: &[u8], _ctx: Option<&CharacteristicContext>) -> Result<ParseOutcome<Self>> {
        let (flags, offset) = read_u8(bytes, 0)?;
        let (sequence_number, mut offset) = read_u16(bytes, offset)?;
        let flags_bits = flags as u32;

        let mut extended_flags = None;
        if test_bit(flags_bits, EXTENDED_FLAGS_PRESENT_BIT) && bytes.len() >= offset + 1 {
            let (v, new_offset) = read_u8(bytes, offset)?;
            extended_flags = Some(v);
            offset = new_offset;
        }

        let mut carbohydrate_id = None;
        let mut carbohydrate_kg = None;
        if test_bit(flags_bits, CARBOHYDRATE_PRESENT_BIT) && bytes.len() >= offset + 3 {
            let (id, next) = read_u8(bytes, offset)?;
            let (raw, next) = read_u16(bytes, next)?;
            carbohydrate_id = Some(id);
            carbohydrate_kg = Some(decode_medfloat16(raw));
            offset = next;
        }

        let mut meal = None;
        if test_bit(flags_bits, MEAL_PRESENT_BIT) && bytes.len() >= offset + 1 {
            let (v, new_offset) = read_u8(bytes, offset)?;
            meal = Some(v);
            offset = new_offset;
        }

        let mut tester = None;
        let mut health = None;
        if test_bit(flags_bits, TESTER_HEALTH_PRESENT_BIT) && bytes.len() >= offset + 1 {
            let (tester_health, new_offset) = read_u8(bytes, offset)?;
            tester = Some((tester_health >> 4) & 0x0F);
            health = Some(tester_health & 0x0F);
            offset = new_offset;
        }

        let mut exercise_duration_seconds = None;
        let mut exercise_intensity_percent = None;
        if test_bit(flags_bits, EXERCISE_PRESENT_BIT) && bytes.len() >= offset + 3 {
            let (duration, next) = read_u16(bytes, offset)?;
            let (intensity, next) = read_u8(bytes, next)?;
            exercise_duration_seconds = Some(duration);
            exercise_intensity_percent = Some(intensity);
            offset = next;
        }

        let mut medication_id = None;
        let mut medication_kg = None;
        if test_bit(flags_bits, MEDICATION_PRESENT_BIT) && bytes.len() >= offset + 3 {
            let (id, next) = read_u8(bytes, offset)?;
            let (raw, next) = read_u16(bytes, next)?;
            medication_id = Some(id);
            medication_kg = Some(decode_medfloat16(raw));
            offset = next;
        }

        let mut hba1c_percent = None;
        if test_bit(flags_bits, HBA1C_PRESENT_BIT) && bytes.len() >= offset + 2 {
            let (raw, _) = read_u16(bytes, offset)?;
            hba1c_percent = Some(decode_medfloat16(raw));
        }

        Ok(ParseOutcome::Value(GlucoseMeasurementContext {
            sequence_number,
            flags,
            extended_flags,
            carbohydrate_id,
            carbohydrate_kg,
            meal,
            tester,
            health,
            exercise_duration_seconds,
            exercise_intensity_percent,
            medication_id,
            medication_kg,
            hba1c_percent,
        }))
    }

    /// Encodes only the mandatory Flags + Sequence Number prefix, matching
    /// the simplified encode path this context type has always had — the
    /// optional fields are read-only here.
    fn encode_value(&self) -> Result<Vec<u8>> {
        let mut out = vec![self.flags];
        out.extend_from_slice(&self.sequence_number.to_le_bytes());
        Ok(out)
    }

    fn to_parsed_value(&self) -> ParsedValue {
        ParsedValue::Int(self.sequence_number as i64)
    }

    fn from_parsed_value(value: &ParsedValue) -> Result<Self> {
        match *value {
            ParsedValue::Int(sequence_number) if (0..=u16::MAX as i64).contains(&sequence_number) => {
                Ok(GlucoseMeasurementContext { sequence_number: sequence_number as u16, ..Default::default() })
            }
            _ => Err(Error::with_message(
                ErrorKind::Encode(Self::INFO.name.into(), "expected a uint16 sequence number".into()),
                "unsupported ParsedValue variant",
            )),
        }
    }
}

pub(crate) fn register(registry: &mut ClassRegistry) {
    registry.insert_builtin::<GlucoseMeasurementContext>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_carbohydrate_and_meal_fields() {
        let flags = (1 << CARBOHYDRATE_PRESENT_BIT) | (1 << MEAL_PRESENT_BIT);
        let mut bytes = vec![flags as u8];
        bytes.extend_from_slice(&42u16.to_le_bytes());
        bytes.push(1); // carbohydrate id: breakfast
        bytes.extend_from_slice(&crate::codec::primitives::pack_medfloat16(Medfloat::Value(45.0)));
        bytes.push(2); // meal: postprandial

        let ParseOutcome::Value(ctx) = GlucoseMeasurementContext::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(ctx.carbohydrate_id, Some(1));
        assert_eq!(ctx.carbohydrate_kg, Some(Medfloat::Value(45.0)));
        assert_eq!(ctx.meal, Some(2));
    }

    #[test]
    fn decodes_without_optional_fields() {
        let bytes = vec![0x00, 0x05, 0x00];
        let ParseOutcome::Value(ctx) = GlucoseMeasurementContext::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(ctx.sequence_number, 5);
        assert!(ctx.carbohydrate_kg.is_none());
    }
}
