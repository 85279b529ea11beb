//! Temperature (0x2A6E): a `sint16` in 0.01-degree-Celsius steps.

use crate::characteristic::class_registry::ClassRegistry;
use crate::characteristic::{Characteristic, CharacteristicDescriptor, LengthSpec, ParseOutcome};
use crate::codec::templates::TEMPERATURE;
use crate::error::Result;
use crate::types::{CharacteristicContext, ParsedValue, ValueType};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Temperature {
    pub celsius: f64,
}

impl Characteristic for Temperature {
    const INFO: CharacteristicDescriptor =
        CharacteristicDescriptor { name: "Temperature", uuid: "2A6E", value_type: ValueType::Float };

    fn length_spec() -> LengthSpec {
        LengthSpec::Exact(2)
    }

    fn decode_value(bytes: &[u8], _ctx: Option<&CharacteristicContext>) -> Result<ParseOutcome<Self>> {
        let (celsius, _) = TEMPERATURE.decode(bytes, 0)?;
        Ok(ParseOutcome::Value(Temperature { celsius }))
    }

    fn encode_value(&self) -> Result<Vec<u8>> {
        Ok(TEMPERATURE.encode(self.celsius))
    }

    fn numeric_value(&self) -> Option<f64> {
        Some(self.celsius)
    }

    fn to_parsed_value(&self) -> ParsedValue {
        ParsedValue::Float(self.celsius)
    }

    fn from_parsed_value(value: &ParsedValue) -> Result<Self> {
        match *value {
            ParsedValue::Float(celsius) => Ok(Temperature { celsius }),
            ParsedValue::Int(celsius) => Ok(Temperature { celsius: celsius as f64 }),
            _ => Err(crate::error::Error::with_message(
                crate::error::ErrorKind::Encode(Self::INFO.name.into(), "expected a Float/Int reading".into()),
                "unsupported ParsedValue variant",
            )),
        }
    }
}

pub(crate) fn register(registry: &mut ClassRegistry) {
    registry.insert_builtin::<Temperature>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_negative_temperature() {
        let bytes = TEMPERATURE.encode(-5.5);
        let ParseOutcome::Value(temp) = Temperature::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert!((temp.celsius + 5.5).abs() < 1e-9);
    }
}
