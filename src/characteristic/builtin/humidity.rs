//! Humidity (0x2A6F): a `uint16` percentage in 0.01% steps, `[0, 100]`.

use crate::characteristic::class_registry::ClassRegistry;
use crate::characteristic::{Characteristic, CharacteristicDescriptor, LengthSpec, ParseOutcome};
use crate::codec::templates::PERCENTAGE;
use crate::error::Result;
use crate::types::{CharacteristicContext, ParsedValue, ValueType};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Humidity {
    pub percent: f64,
}

impl Characteristic for Humidity {
    const INFO: CharacteristicDescriptor =
        CharacteristicDescriptor { name: "Humidity", uuid: "2A6F", value_type: ValueType::Float };

    fn length_spec() -> LengthSpec {
        LengthSpec::Exact(2)
    }

    fn decode_value(bytes: &[u8], _ctx: Option<&CharacteristicContext>) -> Result<ParseOutcome<Self>> {
        let (percent, _) = PERCENTAGE.decode(bytes, 0)?;
        Ok(ParseOutcome::Value(Humidity { percent }))
    }

    fn encode_value(&self) -> Result<Vec<u8>> {
        PERCENTAGE.encode(self.percent)
    }

    fn numeric_value(&self) -> Option<f64> {
        Some(self.percent)
    }

    fn expected_range() -> Option<(f64, f64)> {
        Some((0.0, 100.0))
    }

    fn to_parsed_value(&self) -> ParsedValue {
        ParsedValue::Float(self.percent)
    }

    fn from_parsed_value(value: &ParsedValue) -> Result<Self> {
        match *value {
            ParsedValue::Float(percent) => Ok(Humidity { percent }),
            ParsedValue::Int(percent) => Ok(Humidity { percent: percent as f64 }),
            _ => Err(crate::error::Error::with_message(
                crate::error::ErrorKind::Encode(Self::INFO.name.into(), "expected a Float/Int percentage".into()),
                "unsupported ParsedValue variant",
            )),
        }
    }
}

pub(crate) fn register(registry: &mut ClassRegistry) {
    registry.insert_builtin::<Humidity>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_percentage() {
        let humidity = Humidity { percent: 55.25 };
        let bytes = humidity.encode_value().unwrap();
        let ParseOutcome::Value(decoded) = Humidity::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert!((decoded.percent - 55.25).abs() < 1e-9);
    }
}
