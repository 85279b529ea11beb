//! Cycling Power Feature (0x2A65): a 32-bit supported-capability bitmask.

use crate::characteristic::class_registry::ClassRegistry;
use crate::characteristic::{Characteristic, CharacteristicDescriptor, LengthSpec, ParseOutcome};
use crate::codec::primitives::{pack_u32, read_u32};
use crate::error::Result;
use crate::types::{CharacteristicContext, ParsedValue, ValueType};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CyclingPowerFeature {
    pub feature_mask: u32,
}

impl Characteristic for CyclingPowerFeature {
    const INFO: CharacteristicDescriptor =
        CharacteristicDescriptor { name: "Cycling Power Feature", uuid: "2A65", value_type: ValueType::Bitfield };

    fn length_spec() -> LengthSpec {
        LengthSpec::Exact(4)
    }

    fn decode_value(bytes: &[u8], _ctx: Option<&CharacteristicContext>) -> Result<ParseOutcome<Self>> {
        let (feature_mask, _) = read_u32(bytes, 0)?;
        Ok(ParseOutcome::Value(CyclingPowerFeature { feature_mask }))
    }

    fn encode_value(&self) -> Result<Vec<u8>> {
        Ok(pack_u32(self.feature_mask))
    }

    fn to_parsed_value(&self) -> ParsedValue {
        ParsedValue::Int(self.feature_mask as i64)
    }

    fn from_parsed_value(value: &ParsedValue) -> Result<Self> {
        match *value {
            ParsedValue::Int(v) if (0..=u32::MAX as i64).contains(&v) => Ok(CyclingPowerFeature { feature_mask: v as u32 }),
            _ => Err(crate::error::Error::with_message(
                crate::error::ErrorKind::Encode(Self::INFO.name.into(), "expected a uint32 feature mask".into()),
                "unsupported ParsedValue variant",
            )),
        }
    }
}

pub(crate) fn register(registry: &mut ClassRegistry) {
    registry.insert_builtin::<CyclingPowerFeature>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_bitmask() {
        let feature = CyclingPowerFeature { feature_mask: 0x0000_0101 };
        let bytes = feature.encode_value().unwrap();
        let ParseOutcome::Value(decoded) = CyclingPowerFeature::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(decoded, feature);
    }
}
