//! VOC Concentration (0x2BE7): a `uint16` in parts-per-billion, with two
//! reserved sentinel raw values — `0xFFFE` meaning "65534 or greater" and
//! `0xFFFF` meaning "value not known". Both are signalling values, not
//! ordinary readings: neither carries a usable ppb quantity, so both
//! surface as `ParseOutcome::Special` rather than a flagged `Value`.

use crate::characteristic::class_registry::ClassRegistry;
use crate::characteristic::{Characteristic, CharacteristicDescriptor, LengthSpec, ParseOutcome};
use crate::codec::primitives::{pack_u16, read_u16};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{CharacteristicContext, ParsedValue, SpecialValueResult, ValueType};

const VALUE_65534_OR_GREATER: u16 = 0xFFFE;
const VALUE_NOT_KNOWN: u16 = 0xFFFF;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VocConcentration {
    pub ppb: u16,
}

impl Characteristic for VocConcentration {
    const INFO: CharacteristicDescriptor =
        CharacteristicDescriptor { name: "VOC Concentration", uuid: "2BE7", value_type: ValueType::Int };

    fn length_spec() -> LengthSpec {
        LengthSpec::Exact(2)
    }

    fn decode_value(bytes: &[u8], _ctx: Option<&CharacteristicContext>) -> Result<ParseOutcome<Self>> {
        let (raw, _) = read_u16(bytes, 0)?;
        if raw == VALUE_NOT_KNOWN {
            return Ok(ParseOutcome::Special(SpecialValueResult {
                raw_value: raw as i64,
                meaning: "value not known".to_string(),
                value_type: ValueType::Int,
            }));
        }
        if raw == VALUE_65534_OR_GREATER {
            return Ok(ParseOutcome::Special(SpecialValueResult {
                raw_value: raw as i64,
                meaning: "65534 or greater".to_string(),
                value_type: ValueType::Int,
            }));
        }
        Ok(ParseOutcome::Value(VocConcentration { ppb: raw }))
    }

    fn encode_value(&self) -> Result<Vec<u8>> {
        if self.ppb >= VALUE_65534_OR_GREATER {
            return Err(Error::with_message(
                ErrorKind::Encode(Self::INFO.name.into(), self.ppb.to_string()),
                format!("value out of range [0, {}]", VALUE_65534_OR_GREATER - 1),
            ));
        }
        Ok(pack_u16(self.ppb))
    }

    fn numeric_value(&self) -> Option<f64> {
        Some(self.ppb as f64)
    }

    fn expected_range() -> Option<(f64, f64)> {
        Some((0.0, (VALUE_65534_OR_GREATER - 1) as f64))
    }

    fn to_parsed_value(&self) -> ParsedValue {
        ParsedValue::Int(self.ppb as i64)
    }

    fn from_parsed_value(value: &ParsedValue) -> Result<Self> {
        match *value {
            ParsedValue::Int(ppb) if (0..VALUE_65534_OR_GREATER as i64).contains(&ppb) => {
                Ok(VocConcentration { ppb: ppb as u16 })
            }
            _ => Err(Error::with_message(
                ErrorKind::Encode(Self::INFO.name.into(), "expected a uint16 ppb reading".into()),
                "unsupported ParsedValue variant",
            )),
        }
    }
}

pub(crate) fn register(registry: &mut ClassRegistry) {
    registry.insert_builtin::<VocConcentration>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_known_sentinel_is_special() {
        let outcome = VocConcentration::decode_value(&pack_u16(VALUE_NOT_KNOWN), None).unwrap();
        let ParseOutcome::Special(special) = outcome else { panic!("expected a special value") };
        assert_eq!(special.raw_value, VALUE_NOT_KNOWN as i64);
        assert_eq!(special.meaning, "value not known");
    }

    #[test]
    fn ceiling_sentinel_is_also_special() {
        let outcome = VocConcentration::decode_value(&pack_u16(VALUE_65534_OR_GREATER), None).unwrap();
        let ParseOutcome::Special(special) = outcome else { panic!("expected a special value") };
        assert_eq!(special.meaning, "65534 or greater");
    }

    #[test]
    fn ordinary_value_round_trips() {
        let v = VocConcentration { ppb: 10000 };
        let bytes = v.encode_value().unwrap();
        let ParseOutcome::Value(decoded) = VocConcentration::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(decoded, v);
    }

    #[test]
    fn scenario_from_worked_examples() {
        assert_eq!(VocConcentration::decode_value(&[0x10, 0x27], None).unwrap().into_value().unwrap().ppb, 10000);
    }
}
