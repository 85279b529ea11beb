//! Body Composition Feature (0x2A9B): a 32-bit bitmask describing which
//! optional body-composition measurements a device supports, plus two
//! multi-bit resolution sub-fields.

use crate::characteristic::class_registry::ClassRegistry;
use crate::characteristic::{Characteristic, CharacteristicDescriptor, LengthSpec, ParseOutcome};
use crate::codec::primitives::{extract_bit_field, pack_u32, read_u32, test_bit};
use crate::error::Result;
use crate::types::{CharacteristicContext, ParsedValue, ValueType};

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MassResolution {
    NotSpecified,
    Kg05OrLb1,
    Kg02OrLb05,
    Kg01OrLb02,
    Kg005OrLb01,
    Kg002OrLb005,
    Kg001OrLb002,
    Kg0005OrLb001,
    Reserved,
}

impl MassResolution {
    fn from_bits(bits: u32) -> Self {
        match bits {
            0 => Self::NotSpecified,
            1 => Self::Kg05OrLb1,
            2 => Self::Kg02OrLb05,
            3 => Self::Kg01OrLb02,
            4 => Self::Kg005OrLb01,
            5 => Self::Kg002OrLb005,
            6 => Self::Kg001OrLb002,
            7 => Self::Kg0005OrLb001,
            _ => Self::Reserved,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum HeightResolution {
    NotSpecified,
    M001OrInch1,
    M0005OrInch05,
    M0001OrInch01,
    Reserved,
}

impl HeightResolution {
    fn from_bits(bits: u32) -> Self {
        match bits {
            0 => Self::NotSpecified,
            1 => Self::M001OrInch1,
            2 => Self::M0005OrInch05,
            3 => Self::M0001OrInch01,
            _ => Self::Reserved,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyCompositionFeature {
    pub raw_value: u32,
    pub timestamp_supported: bool,
    pub multiple_users_supported: bool,
    pub basal_metabolism_supported: bool,
    pub muscle_mass_supported: bool,
    pub muscle_percentage_supported: bool,
    pub fat_free_mass_supported: bool,
    pub soft_lean_mass_supported: bool,
    pub body_water_mass_supported: bool,
    pub impedance_supported: bool,
    pub weight_supported: bool,
    pub height_supported: bool,
    pub mass_measurement_resolution: MassResolution,
    pub height_measurement_resolution: HeightResolution,
}

impl Characteristic for BodyCompositionFeature {
    const INFO: CharacteristicDescriptor =
        CharacteristicDescriptor { name: "Body Composition Feature", uuid: "2A9B", value_type: ValueType::Bitfield };

    fn length_spec() -> LengthSpec {
        LengthSpec::Exact(4)
    }

    fn decode_value(bytes: &[u8], _ctx: Option<&CharacteristicContext>) -> Result<ParseOutcome<Self>> {
        let (raw_value, _) = read_u32(bytes, 0)?;
        Ok(ParseOutcome::Value(BodyCompositionFeature {
            raw_value,
            timestamp_supported: test_bit(raw_value, 0),
            multiple_users_supported: test_bit(raw_value, 1),
            basal_metabolism_supported: test_bit(raw_value, 2),
            muscle_mass_supported: test_bit(raw_value, 3),
            muscle_percentage_supported: test_bit(raw_value, 4),
            fat_free_mass_supported: test_bit(raw_value, 5),
            soft_lean_mass_supported: test_bit(raw_value, 6),
            body_water_mass_supported: test_bit(raw_value, 7),
            impedance_supported: test_bit(raw_value, 8),
            weight_supported: test_bit(raw_value, 9),
            height_supported: test_bit(raw_value, 10),
            mass_measurement_resolution: MassResolution::from_bits(extract_bit_field(raw_value, 11, 4)),
            height_measurement_resolution: HeightResolution::from_bits(extract_bit_field(raw_value, 15, 3)),
        }))
    }

    fn encode_value(&self) -> Result<Vec<u8>> {
        Ok(pack_u32(self.raw_value))
    }

    fn to_parsed_value(&self) -> ParsedValue {
        ParsedValue::Int(self.raw_value as i64)
    }

    fn from_parsed_value(value: &ParsedValue) -> Result<Self> {
        match *value {
            ParsedValue::Int(raw) if (0..=u32::MAX as i64).contains(&raw) => {
                let ParseOutcome::Value(feature) = Self::decode_value(&pack_u32(raw as u32), None)? else {
                    unreachable!("decode_value of a fixed-length buffer never returns Special")
                };
                Ok(feature)
            }
            _ => Err(crate::error::Error::with_message(
                crate::error::ErrorKind::Encode(Self::INFO.name.into(), "expected a uint32 feature mask".into()),
                "unsupported ParsedValue variant",
            )),
        }
    }
}

pub(crate) fn register(registry: &mut ClassRegistry) {
    registry.insert_builtin::<BodyCompositionFeature>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_resolution_subfields() {
        let raw = (1 << 0) | (3 << 11) | (2 << 15);
        let ParseOutcome::Value(feature) = BodyCompositionFeature::decode_value(&pack_u32(raw), None).unwrap() else {
            panic!("expected a value")
        };
        assert!(feature.timestamp_supported);
        assert_eq!(feature.mass_measurement_resolution, MassResolution::Kg01OrLb02);
        assert_eq!(feature.height_measurement_resolution, HeightResolution::M0005OrInch05);
    }
}
