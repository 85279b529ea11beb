//! Core data model shared across the registry, pipeline and façade:
//! value-type tags, GATT property flags, info records, and parse contexts.

use std::collections::HashMap;

use crate::uuid::Uuid;

/// Coarse value-shape tag attached to every characteristic/service info
/// record, used by consumers that want to branch on shape without knowing
/// the concrete characteristic.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "lowercase")]
pub enum ValueType {
    String,
    Int,
    Float,
    Bytes,
    Bitfield,
    Bool,
    Datetime,
    Uuid,
    Dict,
    Various,
    #[strum(default)]
    Unknown,
}

impl Default for ValueType {
    fn default() -> Self {
        ValueType::Unknown
    }
}

/// GATT characteristic properties, matching the Bluetooth Core Specification
/// bit assignments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GattProperty(u16);

impl GattProperty {
    pub const BROADCAST: Self = Self(0x0001);
    pub const READ: Self = Self(0x0002);
    pub const WRITE_WITHOUT_RESPONSE: Self = Self(0x0004);
    pub const WRITE: Self = Self(0x0008);
    pub const NOTIFY: Self = Self(0x0010);
    pub const INDICATE: Self = Self(0x0020);
    pub const AUTHENTICATED_SIGNED_WRITES: Self = Self(0x0040);
    pub const EXTENDED_PROPERTIES: Self = Self(0x0080);
    pub const RELIABLE_WRITE: Self = Self(0x0100);
    pub const WRITABLE_AUXILIARIES: Self = Self(0x0200);
    pub const ENCRYPT_READ: Self = Self(0x0400);
    pub const ENCRYPT_WRITE: Self = Self(0x0800);
    pub const ENCRYPT_NOTIFY: Self = Self(0x1000);
    pub const AUTH_READ: Self = Self(0x2000);
    pub const AUTH_WRITE: Self = Self(0x4000);
    pub const AUTH_NOTIFY: Self = Self(0x8000);

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for GattProperty {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for GattProperty {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Inferred purpose of a GATT characteristic, derived from SIG spec
/// metadata rather than maintained per type.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "lowercase")]
pub enum CharacteristicRole {
    Measurement,
    Status,
    Feature,
    Control,
    Info,
    Unknown,
}

/// Bluetooth SIG wire-level data types, as they appear in GSS field
/// definitions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    #[strum(serialize = "boolean")]
    Boolean,
    #[strum(serialize = "uint8")]
    Uint8,
    #[strum(serialize = "uint16")]
    Uint16,
    #[strum(serialize = "uint24")]
    Uint24,
    #[strum(serialize = "uint32")]
    Uint32,
    #[strum(serialize = "uint64")]
    Uint64,
    #[strum(serialize = "sint8")]
    Sint8,
    #[strum(serialize = "sint16")]
    Sint16,
    #[strum(serialize = "sint24")]
    Sint24,
    #[strum(serialize = "sint32")]
    Sint32,
    #[strum(serialize = "sint64")]
    Sint64,
    #[strum(serialize = "float32")]
    Float32,
    #[strum(serialize = "float64")]
    Float64,
    #[strum(serialize = "utf8s")]
    Utf8s,
    #[strum(serialize = "utf16s")]
    Utf16s,
    #[strum(serialize = "struct")]
    Struct,
    #[strum(serialize = "medfloat16")]
    Medfloat16,
    #[strum(serialize = "medfloat32")]
    Medfloat32,
    #[strum(serialize = "various")]
    Various,
    #[strum(serialize = "unknown")]
    Unknown,
}

impl DataType {
    /// Parses a GSS type string, honouring the known aliases
    /// (`sfloat`→medfloat16, `float`→float32, `variable`→struct) and
    /// falling back to `Unknown` rather than failing — GSS loading is
    /// tolerant of unrecognised shapes.
    pub fn from_str_lenient(type_str: Option<&str>) -> Self {
        let Some(raw) = type_str else {
            return DataType::Unknown;
        };
        let lower = raw.to_lowercase();
        match lower.as_str() {
            "utf16s" => return DataType::Utf16s,
            "sfloat" => return DataType::Medfloat16,
            "float" => return DataType::Float32,
            "variable" => return DataType::Struct,
            _ => {}
        }
        lower.parse().unwrap_or(DataType::Unknown)
    }

    pub fn to_value_type(self) -> ValueType {
        use DataType::*;
        match self {
            Sint8 | Uint8 | Sint16 | Uint16 | Sint24 | Uint24 | Sint32 | Uint32 | Uint64 | Sint64 => ValueType::Int,
            Float32 | Float64 | Medfloat16 | Medfloat32 => ValueType::Float,
            Utf8s | Utf16s => ValueType::String,
            Boolean => ValueType::Bool,
            Struct => ValueType::Bytes,
            Various => ValueType::Various,
            Unknown => ValueType::Unknown,
        }
    }
}

/// Static metadata about a registered characteristic, as seen by consumers.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharacteristicInfo {
    pub uuid: Uuid,
    pub name: String,
    pub id: Option<String>,
    pub summary: String,
    pub value_type: ValueType,
    pub unit: String,
}

/// Static metadata about a registered service.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceInfo {
    pub uuid: Uuid,
    pub name: String,
    pub id: Option<String>,
    pub summary: String,
    pub characteristics: Vec<CharacteristicInfo>,
}

/// Result of `validate_characteristic_data`.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationResult {
    pub is_valid: bool,
    pub expected_length: Option<usize>,
    pub actual_length: Option<usize>,
    pub error_message: String,
}

/// Unified metadata submitted when registering a custom characteristic UUID.
#[derive(Clone, Debug)]
pub struct CharacteristicRegistration {
    pub uuid: Uuid,
    pub name: String,
    pub id: Option<String>,
    pub summary: String,
    pub unit: String,
    pub value_type: ValueType,
}

/// Unified metadata submitted when registering a custom service UUID.
#[derive(Clone, Debug)]
pub struct ServiceRegistration {
    pub uuid: Uuid,
    pub name: String,
    pub id: Option<String>,
    pub summary: String,
}

/// Parsed device-level context available to characteristic codecs:
/// advertised identity and manufacturer/service data already demultiplexed.
#[derive(Clone, Debug, Default)]
pub struct DeviceInfo {
    pub address: Option<String>,
    pub local_name: Option<String>,
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
    pub service_uuids: Vec<Uuid>,
}

/// Everything a characteristic codec may consult beyond its own raw bytes:
/// companion characteristics already parsed in this batch, descriptor
/// overrides (notably Valid Range), and whether validation should run at
/// all.
#[derive(Clone, Debug, Default)]
pub struct CharacteristicContext {
    pub device_info: Option<DeviceInfo>,
    pub advertisement: Option<Vec<u8>>,
    pub other_characteristics: HashMap<String, ParsedValue>,
    pub descriptors: HashMap<String, ParsedValue>,
    pub raw_service: Option<Vec<u8>>,
    pub validate: bool,
}

impl CharacteristicContext {
    pub fn new() -> Self {
        Self { validate: true, ..Default::default() }
    }

    /// Returns a Valid Range descriptor override for `uuid`, if present,
    /// as `(min, max)`. Valid Range descriptors are conventionally stored
    /// as a two-element numeric array.
    pub fn valid_range(&self, descriptor_uuid: &str) -> Option<(f64, f64)> {
        match self.descriptors.get(descriptor_uuid)? {
            ParsedValue::Range(min, max) => Some((*min, *max)),
            _ => None,
        }
    }
}

/// A dynamically-typed parsed value, used where characteristics need to be
/// stored in a homogeneous map (`other_characteristics`, batch results).
#[derive(Clone, Debug)]
pub enum ParsedValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
    Range(f64, f64),
    Special(SpecialValueResult),
    /// Structured payload for multi-field characteristics with no single
    /// scalar shape; carried as already-serialised data so the map stays
    /// homogeneous while every field a caller set still round-trips.
    Structured(serde_json::Value),
}

/// Describes a sentinel/special raw encoding detected in place of an
/// ordinary value (e.g. uint16 `0xFFFF` meaning "unknown").
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpecialValueResult {
    pub raw_value: i64,
    pub meaning: String,
    pub value_type: ValueType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gatt_property_combines() {
        let props = GattProperty::READ | GattProperty::NOTIFY;
        assert!(props.contains(GattProperty::READ));
        assert!(props.contains(GattProperty::NOTIFY));
        assert!(!props.contains(GattProperty::WRITE));
    }

    #[test]
    fn data_type_aliases_resolve() {
        assert_eq!(DataType::from_str_lenient(Some("SFLOAT")), DataType::Medfloat16);
        assert_eq!(DataType::from_str_lenient(Some("variable")), DataType::Struct);
        assert_eq!(DataType::from_str_lenient(None), DataType::Unknown);
    }

    #[test]
    fn data_type_to_value_type() {
        assert_eq!(DataType::Uint16.to_value_type(), ValueType::Int);
        assert_eq!(DataType::Medfloat16.to_value_type(), ValueType::Float);
    }
}
