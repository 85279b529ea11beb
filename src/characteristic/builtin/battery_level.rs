//! Battery Level (0x2A19): a single `uint8` percentage, `[0, 100]`.

use crate::characteristic::class_registry::ClassRegistry;
use crate::characteristic::{Characteristic, CharacteristicDescriptor, LengthSpec, ParseOutcome};
use crate::codec::primitives;
use crate::error::{Error, ErrorKind, Result};
use crate::types::{CharacteristicContext, ParsedValue, ValueType};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatteryLevel {
    pub percent: u8,
}

impl Characteristic for BatteryLevel {
    const INFO: CharacteristicDescriptor =
        CharacteristicDescriptor { name: "Battery Level", uuid: "2A19", value_type: ValueType::Int };

    fn length_spec() -> LengthSpec {
        LengthSpec::Exact(1)
    }

    fn decode_value(bytes: &[u8], _ctx: Option<&CharacteristicContext>) -> Result<ParseOutcome<Self>> {
        let (percent, _) = primitives::read_u8(bytes, 0)?;
        Ok(ParseOutcome::Value(BatteryLevel { percent }))
    }

    fn encode_value(&self) -> Result<Vec<u8>> {
        Ok(primitives::pack_u8(self.percent))
    }

    fn numeric_value(&self) -> Option<f64> {
        Some(self.percent as f64)
    }

    fn expected_range() -> Option<(f64, f64)> {
        Some((0.0, 100.0))
    }

    fn to_parsed_value(&self) -> ParsedValue {
        ParsedValue::Int(self.percent as i64)
    }

    fn from_parsed_value(value: &ParsedValue) -> Result<Self> {
        match *value {
            ParsedValue::Int(v) if (0..=255).contains(&v) => Ok(BatteryLevel { percent: v as u8 }),
            ParsedValue::Float(v) if (0.0..=255.0).contains(&v) => Ok(BatteryLevel { percent: v.round() as u8 }),
            _ => Err(Error::with_message(
                ErrorKind::Encode(Self::INFO.name.into(), "expected an Int/Float percentage".into()),
                "unsupported ParsedValue variant",
            )),
        }
    }
}

pub(crate) fn register(registry: &mut ClassRegistry) {
    registry.insert_builtin::<BatteryLevel>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_percentage() {
        let ParseOutcome::Value(level) = BatteryLevel::decode_value(&[73], None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(level.percent, 73);
    }

    #[test]
    fn round_trips_through_parsed_value() {
        let level = BatteryLevel { percent: 50 };
        let parsed = level.to_parsed_value();
        let restored = BatteryLevel::from_parsed_value(&parsed).unwrap();
        assert_eq!(restored, level);
    }
}
