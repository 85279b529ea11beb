//! Battery Level Status (0x2BED): battery presence, external power sources,
//! charge state/level and optional extended charging info, encoded across
//! three wire variants of increasing size.
//!
//! - 1 byte: basic state only.
//! - 2 bytes: basic state plus a second byte splitting charging type
//!   (bits 0-2) and a fault bitmap (bits 3-7).
//! - 3+ bytes: the full SIG form — a Flags byte followed by a 16-bit Power
//!   State bitfield, with Flags indicating optional trailing fields whose
//!   presence is validated but whose values this codec does not surface.
//!
//! The basic 1-byte form's charge-level field uses a different bit-to-enum
//! mapping than [`BatteryChargeLevel`]'s own ordering (raw 0→Unknown,
//! 1→CriticallyLow, 2→Low, 3→Good) — encode always emits the basic form, so
//! this remapping is inverted there too.

use crate::characteristic::class_registry::ClassRegistry;
use crate::characteristic::{Characteristic, CharacteristicDescriptor, LengthSpec, ParseOutcome};
use crate::codec::primitives::{extract_bit_field, merge_bit_fields, test_bit};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{CharacteristicContext, ParsedValue, ValueType};

const IDENTIFIER_PRESENT_BIT: u32 = 0;
const BATTERY_LEVEL_PRESENT_BIT: u32 = 1;
const ADDITIONAL_INFO_PRESENT_BIT: u32 = 2;

const BATTERY_PRESENT_START_BIT: u32 = 0;
const BATTERY_PRESENT_NUM_BITS: u32 = 2;
const WIRED_POWER_CONNECTED_BIT: u32 = 2;
const WIRELESS_POWER_CONNECTED_BIT: u32 = 3;
const CHARGE_STATE_START_BIT: u32 = 4;
const CHARGE_STATE_NUM_BITS: u32 = 2;
const CHARGE_LEVEL_START_BIT: u32 = 6;
const CHARGE_LEVEL_NUM_BITS: u32 = 2;

const BATTERY_PRESENT_EXT_BIT: u32 = 0;
const WIRED_POWER_EXT_START_BIT: u32 = 1;
const WIRED_POWER_EXT_NUM_BITS: u32 = 2;
const WIRELESS_POWER_EXT_START_BIT: u32 = 3;
const WIRELESS_POWER_EXT_NUM_BITS: u32 = 2;
const CHARGE_STATE_EXT_START_BIT: u32 = 5;
const CHARGE_STATE_EXT_NUM_BITS: u32 = 2;
const CHARGE_LEVEL_EXT_START_BIT: u32 = 7;
const CHARGE_LEVEL_EXT_NUM_BITS: u32 = 2;
const CHARGING_TYPE_START_BIT: u32 = 9;
const CHARGING_TYPE_NUM_BITS: u32 = 3;
const FAULT_BITS_START_BIT: u32 = 12;
const FAULT_BITS_NUM_BITS: u32 = 3;

const BATTERY_FAULT_BIT: u32 = 0;
const EXTERNAL_POWER_FAULT_BIT: u32 = 1;
const OTHER_FAULT_BIT: u32 = 2;

const CHARGING_TYPE_BYTE_START_BIT: u32 = 0;
const CHARGING_TYPE_BYTE_NUM_BITS: u32 = 3;
const FAULT_BYTE_START_BIT: u32 = 3;
const FAULT_BYTE_NUM_BITS: u32 = 5;

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum BatteryPresentState {
    Unknown = 0,
    NotPresent = 1,
    Present = 2,
    Reserved = 3,
}

impl BatteryPresentState {
    fn from_byte(raw: u32) -> Self {
        match raw {
            0 => Self::Unknown,
            1 => Self::NotPresent,
            2 => Self::Present,
            3 => Self::Reserved,
            _ => Self::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum BatteryChargeState {
    Unknown = 0,
    Charging = 1,
    Discharging = 2,
    NotCharging = 3,
}

impl BatteryChargeState {
    fn from_byte(raw: u32) -> Self {
        match raw {
            0 => Self::Unknown,
            1 => Self::Charging,
            2 => Self::Discharging,
            3 => Self::NotCharging,
            _ => Self::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum BatteryChargeLevel {
    Unknown = 0,
    Good = 1,
    Low = 2,
    CriticallyLow = 3,
}

impl BatteryChargeLevel {
    fn from_byte(raw: u32) -> Self {
        match raw {
            0 => Self::Unknown,
            1 => Self::Good,
            2 => Self::Low,
            3 => Self::CriticallyLow,
            _ => Self::Unknown,
        }
    }

    /// The basic 1-byte format's bit-to-enum mapping differs from this
    /// enum's own ordering.
    fn from_basic_bits(raw: u32) -> Self {
        match raw {
            0 => Self::Unknown,
            1 => Self::CriticallyLow,
            2 => Self::Low,
            3 => Self::Good,
            _ => Self::Unknown,
        }
    }

    /// Inverse of [`Self::from_basic_bits`], for encoding the basic form.
    fn to_basic_bits(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::CriticallyLow => 1,
            Self::Low => 2,
            Self::Good => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum BatteryChargingType {
    Unknown = 0,
    ConstantCurrent = 1,
    ConstantVoltage = 2,
    Trickle = 3,
    Float = 4,
    ConstantPower = 5,
}

impl BatteryChargingType {
    fn from_byte(raw: u32) -> Self {
        match raw {
            0 => Self::Unknown,
            1 => Self::ConstantCurrent,
            2 => Self::ConstantVoltage,
            3 => Self::Trickle,
            4 => Self::Float,
            5 => Self::ConstantPower,
            _ => Self::Unknown,
        }
    }
}

fn fault_reasons(fault_bits: u32) -> Vec<&'static str> {
    let mut reasons = Vec::new();
    if test_bit(fault_bits, BATTERY_FAULT_BIT) {
        reasons.push("battery_fault");
    }
    if test_bit(fault_bits, EXTERNAL_POWER_FAULT_BIT) {
        reasons.push("external_power_fault");
    }
    if test_bit(fault_bits, OTHER_FAULT_BIT) {
        reasons.push("other_fault");
    }
    reasons
}

#[derive(Clone, Debug, PartialEq)]
pub struct BatteryLevelStatus {
    pub raw_value: u8,
    pub battery_present: BatteryPresentState,
    pub wired_external_power_connected: bool,
    pub wireless_external_power_connected: bool,
    pub battery_charge_state: BatteryChargeState,
    pub battery_charge_level: BatteryChargeLevel,
    pub battery_charging_type: BatteryChargingType,
    pub charging_fault_reasons: Vec<String>,
}

struct BasicState {
    battery_present: BatteryPresentState,
    wired_external_power_connected: bool,
    wireless_external_power_connected: bool,
    battery_charge_state: BatteryChargeState,
    battery_charge_level: BatteryChargeLevel,
}

fn parse_basic_state(state_raw: u32) -> BasicState {
    let battery_present =
        BatteryPresentState::from_byte(extract_bit_field(state_raw, BATTERY_PRESENT_START_BIT, BATTERY_PRESENT_NUM_BITS));
    let wired_external_power_connected = test_bit(state_raw, WIRED_POWER_CONNECTED_BIT);
    let wireless_external_power_connected = test_bit(state_raw, WIRELESS_POWER_CONNECTED_BIT);
    let battery_charge_state =
        BatteryChargeState::from_byte(extract_bit_field(state_raw, CHARGE_STATE_START_BIT, CHARGE_STATE_NUM_BITS));
    let battery_charge_level =
        BatteryChargeLevel::from_basic_bits(extract_bit_field(state_raw, CHARGE_LEVEL_START_BIT, CHARGE_LEVEL_NUM_BITS));
    BasicState {
        battery_present,
        wired_external_power_connected,
        wireless_external_power_connected,
        battery_charge_state,
        battery_charge_level,
    }
}

struct PowerState16 {
    battery_present: BatteryPresentState,
    wired_external_power_connected: bool,
    wireless_external_power_connected: bool,
    battery_charge_state: BatteryChargeState,
    battery_charge_level: BatteryChargeLevel,
    battery_charging_type: BatteryChargingType,
    charging_fault_reasons: Vec<&'static str>,
}

fn parse_power_state_16(power_state_raw: u32) -> PowerState16 {
    let battery_present = if test_bit(power_state_raw, BATTERY_PRESENT_EXT_BIT) {
        BatteryPresentState::Present
    } else {
        BatteryPresentState::NotPresent
    };
    let wired_external_power_connected =
        extract_bit_field(power_state_raw, WIRED_POWER_EXT_START_BIT, WIRED_POWER_EXT_NUM_BITS) == 1;
    let wireless_external_power_connected =
        extract_bit_field(power_state_raw, WIRELESS_POWER_EXT_START_BIT, WIRELESS_POWER_EXT_NUM_BITS) == 1;
    let battery_charge_state = BatteryChargeState::from_byte(extract_bit_field(
        power_state_raw,
        CHARGE_STATE_EXT_START_BIT,
        CHARGE_STATE_EXT_NUM_BITS,
    ));
    let battery_charge_level = BatteryChargeLevel::from_byte(extract_bit_field(
        power_state_raw,
        CHARGE_LEVEL_EXT_START_BIT,
        CHARGE_LEVEL_EXT_NUM_BITS,
    ));
    let battery_charging_type = BatteryChargingType::from_byte(extract_bit_field(
        power_state_raw,
        CHARGING_TYPE_START_BIT,
        CHARGING_TYPE_NUM_BITS,
    ));
    let charging_fault_reasons =
        fault_reasons(extract_bit_field(power_state_raw, FAULT_BITS_START_BIT, FAULT_BITS_NUM_BITS));
    PowerState16 {
        battery_present,
        wired_external_power_connected,
        wireless_external_power_connected,
        battery_charge_state,
        battery_charge_level,
        battery_charging_type,
        charging_fault_reasons,
    }
}

impl Characteristic for BatteryLevelStatus {
    const INFO: CharacteristicDescriptor =
        CharacteristicDescriptor { name: "Battery Level Status", uuid: "2BED", value_type: ValueType::Bitfield };

    fn length_spec() -> LengthSpec {
        LengthSpec::Variable { min: 1 }
    }

    fn decode_value(bytes: &[u8], _ctx: Option<&CharacteristicContext>) -> Result<ParseOutcome<Self>> {
        let state_raw = bytes[0] as u32;

        if bytes.len() >= 3 {
            let flags = bytes[0] as u32;
            let power_state_raw = u16::from_le_bytes([bytes[1], bytes[2]]) as u32;
            let parsed = parse_power_state_16(power_state_raw);

            let mut offset = 3usize;
            if test_bit(flags, IDENTIFIER_PRESENT_BIT) {
                if bytes.len() < offset + 2 {
                    return Err(Error::with_message(
                        ErrorKind::ParseField("identifier".into(), "missing from payload".into()),
                        "Identifier indicated by Flags but missing from payload",
                    ));
                }
                offset += 2;
            }
            let mut remaining_needed = offset;
            if test_bit(flags, BATTERY_LEVEL_PRESENT_BIT) {
                remaining_needed += 1;
            }
            if test_bit(flags, ADDITIONAL_INFO_PRESENT_BIT) {
                remaining_needed += 1;
            }
            if bytes.len() < remaining_needed {
                return Err(Error::with_message(
                    ErrorKind::ParseField("additional_fields".into(), "missing from payload".into()),
                    "Flags indicate additional fields are missing from payload",
                ));
            }

            return Ok(ParseOutcome::Value(BatteryLevelStatus {
                raw_value: bytes[0],
                battery_present: parsed.battery_present,
                wired_external_power_connected: parsed.wired_external_power_connected,
                wireless_external_power_connected: parsed.wireless_external_power_connected,
                battery_charge_state: parsed.battery_charge_state,
                battery_charge_level: parsed.battery_charge_level,
                battery_charging_type: parsed.battery_charging_type,
                charging_fault_reasons: parsed.charging_fault_reasons.into_iter().map(String::from).collect(),
            }));
        }

        if bytes.len() >= 2 {
            let basic = parse_basic_state(state_raw);
            let second = bytes[1] as u32;
            let fault_raw = extract_bit_field(second, FAULT_BYTE_START_BIT, FAULT_BYTE_NUM_BITS);
            let charging_fault_reasons = fault_reasons(fault_raw).into_iter().map(String::from).collect();
            let battery_charging_type = BatteryChargingType::from_byte(extract_bit_field(
                second,
                CHARGING_TYPE_BYTE_START_BIT,
                CHARGING_TYPE_BYTE_NUM_BITS,
            ));
            return Ok(ParseOutcome::Value(BatteryLevelStatus {
                raw_value: bytes[0],
                battery_present: basic.battery_present,
                wired_external_power_connected: basic.wired_external_power_connected,
                wireless_external_power_connected: basic.wireless_external_power_connected,
                battery_charge_state: basic.battery_charge_state,
                battery_charge_level: basic.battery_charge_level,
                battery_charging_type,
                charging_fault_reasons,
            }));
        }

        let basic = parse_basic_state(state_raw);
        Ok(ParseOutcome::Value(BatteryLevelStatus {
            raw_value: bytes[0],
            battery_present: basic.battery_present,
            wired_external_power_connected: basic.wired_external_power_connected,
            wireless_external_power_connected: basic.wireless_external_power_connected,
            battery_charge_state: basic.battery_charge_state,
            battery_charge_level: basic.battery_charge_level,
            battery_charging_type: BatteryChargingType::Unknown,
            charging_fault_reasons: Vec::new(),
        }))
    }

    /// Always encodes the basic single-byte form; the extended and full SIG
    /// forms are read-only here.
    fn encode_value(&self) -> Result<Vec<u8>> {
        let encoded_byte = merge_bit_fields(&[
            (self.battery_present as u32, BATTERY_PRESENT_START_BIT, BATTERY_PRESENT_NUM_BITS),
            (self.wired_external_power_connected as u32, WIRED_POWER_CONNECTED_BIT, 1),
            (self.wireless_external_power_connected as u32, WIRELESS_POWER_CONNECTED_BIT, 1),
            (self.battery_charge_state as u32, CHARGE_STATE_START_BIT, CHARGE_STATE_NUM_BITS),
            (self.battery_charge_level.to_basic_bits(), CHARGE_LEVEL_START_BIT, CHARGE_LEVEL_NUM_BITS),
        ]);
        Ok(vec![encoded_byte as u8])
    }

    fn to_parsed_value(&self) -> ParsedValue {
        ParsedValue::Structured(serde_json::json!({
            "raw_value": self.raw_value,
            "battery_present": self.battery_present.to_string(),
            "wired_external_power_connected": self.wired_external_power_connected,
            "wireless_external_power_connected": self.wireless_external_power_connected,
            "battery_charge_state": self.battery_charge_state.to_string(),
            "battery_charge_level": self.battery_charge_level.to_string(),
            "battery_charging_type": self.battery_charging_type.to_string(),
            "charging_fault_reasons": self.charging_fault_reasons,
        }))
    }

    fn from_parsed_value(value: &ParsedValue) -> Result<Self> {
        let ParsedValue::Structured(json) = value else {
            return Err(Error::with_message(
                ErrorKind::Encode(Self::INFO.name.into(), "expected a structured status payload".into()),
                "unsupported ParsedValue variant",
            ));
        };
        fn invalid() -> Error {
            Error::with_message(
                ErrorKind::Encode("Battery Level Status".into(), "malformed structured payload".into()),
                "battery level status JSON is missing or has the wrong shape for a required field",
            )
        }
        fn parse_enum_field<T: std::str::FromStr>(json: &serde_json::Value, field: &str) -> Result<T> {
            json.get(field).and_then(|v| v.as_str()).ok_or_else(invalid)?.parse().map_err(|_| invalid())
        }
        Ok(BatteryLevelStatus {
            raw_value: json.get("raw_value").and_then(|v| v.as_u64()).ok_or_else(invalid)? as u8,
            battery_present: parse_enum_field(json, "battery_present")?,
            wired_external_power_connected: json
                .get("wired_external_power_connected")
                .and_then(|v| v.as_bool())
                .ok_or_else(invalid)?,
            wireless_external_power_connected: json
                .get("wireless_external_power_connected")
                .and_then(|v| v.as_bool())
                .ok_or_else(invalid)?,
            battery_charge_state: parse_enum_field(json, "battery_charge_state")?,
            battery_charge_level: parse_enum_field(json, "battery_charge_level")?,
            battery_charging_type: parse_enum_field(json, "battery_charging_type")?,
            charging_fault_reasons: json
                .get("charging_fault_reasons")
                .and_then(|v| v.as_array())
                .ok_or_else(invalid)?
                .iter()
                .map(|v| v.as_str().map(String::from).ok_or_else(invalid))
                .collect::<std::result::Result<Vec<_>, _>>()?,
        })
    }
}

pub(crate) fn register(registry: &mut ClassRegistry) {
    registry.insert_builtin::<BatteryLevelStatus>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_format_remaps_charge_level_bits() {
        // charge_level bits = 0b01 -> basic mapping is CriticallyLow, not Good.
        let byte = 0b01_00_0_0_00u8;
        let ParseOutcome::Value(status) = BatteryLevelStatus::decode_value(&[byte], None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(status.battery_charge_level, BatteryChargeLevel::CriticallyLow);
    }

    #[test]
    fn two_byte_form_reads_charging_type_and_faults() {
        let second = merge_bit_fields(&[(2, CHARGING_TYPE_BYTE_START_BIT, CHARGING_TYPE_BYTE_NUM_BITS), (0b101, FAULT_BYTE_START_BIT, FAULT_BYTE_NUM_BITS)]);
        let ParseOutcome::Value(status) = BatteryLevelStatus::decode_value(&[0x00, second as u8], None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(status.battery_charging_type, BatteryChargingType::ConstantVoltage);
        assert_eq!(status.charging_fault_reasons, vec!["battery_fault", "other_fault"]);
    }

    #[test]
    fn full_form_rejects_missing_identifier() {
        let flags = 0b001u8;
        let err = BatteryLevelStatus::decode_value(&[flags, 0x00, 0x00], None).unwrap_err();
        assert!(err.to_string().contains("Identifier"));
    }

    #[test]
    fn encode_round_trips_basic_form() {
        let ParseOutcome::Value(status) = BatteryLevelStatus::decode_value(&[0b11_01_1_1_10], None).unwrap() else {
            panic!("expected a value")
        };
        let bytes = status.encode_value().unwrap();
        let ParseOutcome::Value(roundtripped) = BatteryLevelStatus::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(roundtripped.battery_charge_level, status.battery_charge_level);
    }

    #[test]
    fn structured_value_round_trips_the_full_status() {
        let second = merge_bit_fields(&[(2, CHARGING_TYPE_BYTE_START_BIT, CHARGING_TYPE_BYTE_NUM_BITS), (0b101, FAULT_BYTE_START_BIT, FAULT_BYTE_NUM_BITS)]);
        let ParseOutcome::Value(status) = BatteryLevelStatus::decode_value(&[0x00, second as u8], None).unwrap() else {
            panic!("expected a value")
        };
        let structured = status.to_parsed_value();
        let rebuilt = BatteryLevelStatus::from_parsed_value(&structured).unwrap();
        assert_eq!(rebuilt, status);
    }
}
