//! Generic fallback for characteristics with no registered class: raw bytes
//! carried through untouched, with no fixed UUID of its own.
//!
//! Unlike every other built-in, this type is never inserted into a
//! [`crate::characteristic::class_registry::ClassRegistry`] — it has no
//! single UUID to register under. Callers reach for it directly when a
//! lookup against the registry misses.

use crate::types::{CharacteristicInfo, ParsedValue, ValueType};
use crate::uuid::Uuid;

/// Raw, unparsed characteristic value for a UUID the registry has no class
/// for.
#[derive(Clone, Debug, PartialEq)]
pub struct UnknownCharacteristic {
    pub info: CharacteristicInfo,
    pub raw: Vec<u8>,
}

impl UnknownCharacteristic {
    /// Wraps `info` (filling in a generated name if it came in blank) and
    /// the already-read raw bytes. Decoding an unknown characteristic never
    /// fails — the bytes are the value.
    pub fn new(mut info: CharacteristicInfo, raw: Vec<u8>) -> Self {
        if info.name.trim().is_empty() {
            info.name = format!("Unknown Characteristic ({})", info.uuid);
        }
        info.value_type = ValueType::Bytes;
        Self { info, raw }
    }

    /// A minimal [`CharacteristicInfo`] for a bare UUID, with no name/unit
    /// metadata available.
    pub fn describe(uuid: Uuid) -> CharacteristicInfo {
        CharacteristicInfo {
            uuid,
            name: String::new(),
            id: None,
            summary: String::new(),
            value_type: ValueType::Bytes,
            unit: String::new(),
        }
    }

    pub fn decode_value(&self) -> &[u8] {
        &self.raw
    }

    pub fn encode_value(&self) -> Vec<u8> {
        self.raw.clone()
    }

    pub fn to_parsed_value(&self) -> ParsedValue {
        ParsedValue::Bytes(self.raw.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_is_generated_from_uuid() {
        let uuid = Uuid::from_u16(0xABCD);
        let value = UnknownCharacteristic::new(UnknownCharacteristic::describe(uuid.clone()), vec![1, 2, 3]);
        assert_eq!(value.info.name, format!("Unknown Characteristic ({})", uuid));
        assert_eq!(value.decode_value(), &[1, 2, 3]);
    }

    #[test]
    fn round_trips_raw_bytes() {
        let value = UnknownCharacteristic::new(
            UnknownCharacteristic::describe(Uuid::from_u16(0x1234)),
            vec![0xDE, 0xAD, 0xBE, 0xEF],
        );
        assert_eq!(value.encode_value(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }
}
