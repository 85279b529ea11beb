//! Cycling Power Measurement (0x2A63): Flags-driven optional fields around
//! a mandatory instantaneous power reading.
//!
//! Wire layout: Flags(2) + Instantaneous Power(2, signed) +
//! \[Pedal Power Balance(1)\] + \[Accumulated Energy(2)\] +
//! \[Cumulative Wheel Revolutions(4) + Last Wheel Event Time(2)\] +
//! \[Cumulative Crank Revolutions(2) + Last Crank Event Time(2)\].
//!
//! Wheel/crank event times are raw `1/2048`- and `1/1024`-second tick
//! counts; this codec converts them to seconds on decode and back to raw
//! ticks on encode (the 16-bit field only ever carries the raw count).
//!
//! Declares Cycling Power Feature (0x2A65) as an optional dependency: when a
//! batch parse supplies it, the feature mask rides along on
//! `supported_features` so a caller can tell which of the Flags-gated fields
//! the device can ever populate without a second lookup.

use crate::characteristic::class_registry::ClassRegistry;
use crate::characteristic::{Characteristic, CharacteristicDescriptor, LengthSpec, ParseOutcome};
use crate::codec::primitives::{read_i16, read_u16, read_u32, read_u8};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{CharacteristicContext, ParsedValue, ValueType};

const CYCLING_POWER_FEATURE_UUID: &str = "2A65";

const PEDAL_POWER_BALANCE_PRESENT_BIT: u32 = 0;
const ACCUMULATED_ENERGY_PRESENT_BIT: u32 = 3;
const WHEEL_REVOLUTION_DATA_PRESENT_BIT: u32 = 4;
const CRANK_REVOLUTION_DATA_PRESENT_BIT: u32 = 5;

const PEDAL_POWER_BALANCE_UNKNOWN: u8 = 0xFF;
const WHEEL_EVENT_TIME_RESOLUTION: f64 = 1.0 / 2048.0;
const CRANK_EVENT_TIME_RESOLUTION: f64 = 1.0 / 1024.0;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CyclingPowerMeasurement {
    pub flags: u16,
    pub instantaneous_power_watts: i16,
    pub pedal_power_balance_percent: Option<f64>,
    pub accumulated_energy_kj: Option<u16>,
    pub cumulative_wheel_revolutions: Option<u32>,
    pub last_wheel_event_time_seconds: Option<f64>,
    pub cumulative_crank_revolutions: Option<u16>,
    pub last_crank_event_time_seconds: Option<f64>,
    /// Companion Cycling Power Feature mask, if it was present in the same
    /// batch parse — not part of this characteristic's own wire format.
    pub supported_features: Option<u32>,
}

impl Characteristic for CyclingPowerMeasurement {
    const INFO: CharacteristicDescriptor =
        CharacteristicDescriptor { name: "Cycling Power Measurement", uuid: "2A63", value_type: ValueType::Bitfield };

    fn length_spec() -> LengthSpec {
        LengthSpec::Variable { min: 4 }
    }

    fn optional_dependencies() -> &'static [&'static str] {
        &[CYCLING_POWER_FEATURE_UUID]
    }

    fn decode_value(bytes: &[u8], ctx: Option<&CharacteristicContext>) -> Result<ParseOutcome<Self>> {
        use crate::codec::primitives::extract_bit_field as bits;
        use crate::types::ParsedValue as PV;

        let supported_features = ctx.and_then(|c| c.other_characteristics.get(CYCLING_POWER_FEATURE_UUID)).and_then(
            |v| match v {
                PV::Int(mask) => Some(*mask as u32),
                _ => None,
            },
        );

        let (flags, offset) = read_u16(bytes, 0)?;
        let (instantaneous_power_watts, mut offset) = read_i16(bytes, offset)?;
        let flags_bits = flags as u32;

        let mut pedal_power_balance_percent = None;
        if bits(flags_bits, PEDAL_POWER_BALANCE_PRESENT_BIT, 1) == 1 && bytes.len() >= offset + 1 {
            let (raw, new_offset) = read_u8(bytes, offset)?;
            if raw != PEDAL_POWER_BALANCE_UNKNOWN {
                pedal_power_balance_percent = Some(raw as f64 / 2.0);
            }
            offset = new_offset;
        }

        let mut accumulated_energy_kj = None;
        if bits(flags_bits, ACCUMULATED_ENERGY_PRESENT_BIT, 1) == 1 && bytes.len() >= offset + 2 {
            let (v, new_offset) = read_u16(bytes, offset)?;
            accumulated_energy_kj = Some(v);
            offset = new_offset;
        }

        let mut cumulative_wheel_revolutions = None;
        let mut last_wheel_event_time_seconds = None;
        if bits(flags_bits, WHEEL_REVOLUTION_DATA_PRESENT_BIT, 1) == 1 && bytes.len() >= offset + 6 {
            let (revolutions, next) = read_u32(bytes, offset)?;
            let (event_time_raw, next) = read_u16(bytes, next)?;
            cumulative_wheel_revolutions = Some(revolutions);
            last_wheel_event_time_seconds = Some(event_time_raw as f64 * WHEEL_EVENT_TIME_RESOLUTION);
            offset = next;
        }

        let mut cumulative_crank_revolutions = None;
        let mut last_crank_event_time_seconds = None;
        if bits(flags_bits, CRANK_REVOLUTION_DATA_PRESENT_BIT, 1) == 1 && bytes.len() >= offset + 4 {
            let (revolutions, next) = read_u16(bytes, offset)?;
            let (event_time_raw, _) = read_u16(bytes, next)?;
            cumulative_crank_revolutions = Some(revolutions);
            last_crank_event_time_seconds = Some(event_time_raw as f64 * CRANK_EVENT_TIME_RESOLUTION);
        }

        Ok(ParseOutcome::Value(CyclingPowerMeasurement {
            flags,
            instantaneous_power_watts,
            pedal_power_balance_percent,
            accumulated_energy_kj,
            cumulative_wheel_revolutions,
            last_wheel_event_time_seconds,
            supported_features,
            cumulative_crank_revolutions,
            last_crank_event_time_seconds,
        }))
    }

    fn encode_value(&self) -> Result<Vec<u8>> {
        let mut flags = 0u16;
        if self.pedal_power_balance_percent.is_some() {
            flags |= 1 << PEDAL_POWER_BALANCE_PRESENT_BIT;
        }
        if self.accumulated_energy_kj.is_some() {
            flags |= 1 << ACCUMULATED_ENERGY_PRESENT_BIT;
        }
        if self.cumulative_wheel_revolutions.is_some() && self.last_wheel_event_time_seconds.is_some() {
            flags |= 1 << WHEEL_REVOLUTION_DATA_PRESENT_BIT;
        }
        if self.cumulative_crank_revolutions.is_some() && self.last_crank_event_time_seconds.is_some() {
            flags |= 1 << CRANK_REVOLUTION_DATA_PRESENT_BIT;
        }

        let mut out = flags.to_le_bytes().to_vec();
        out.extend_from_slice(&self.instantaneous_power_watts.to_le_bytes());

        if let Some(balance) = self.pedal_power_balance_percent {
            let raw = (balance * 2.0).round();
            if !(0.0..=254.0).contains(&raw) {
                return Err(Error::with_message(
                    ErrorKind::Encode(Self::INFO.name.into(), balance.to_string()),
                    "pedal power balance out of range",
                ));
            }
            out.push(raw as u8);
        }
        if let Some(energy) = self.accumulated_energy_kj {
            out.extend_from_slice(&energy.to_le_bytes());
        }
        if let (Some(revolutions), Some(seconds)) =
            (self.cumulative_wheel_revolutions, self.last_wheel_event_time_seconds)
        {
            out.extend_from_slice(&revolutions.to_le_bytes());
            let raw_ticks = (seconds / WHEEL_EVENT_TIME_RESOLUTION).round();
            out.extend_from_slice(&(raw_ticks as u16).to_le_bytes());
        }
        if let (Some(revolutions), Some(seconds)) =
            (self.cumulative_crank_revolutions, self.last_crank_event_time_seconds)
        {
            out.extend_from_slice(&revolutions.to_le_bytes());
            let raw_ticks = (seconds / CRANK_EVENT_TIME_RESOLUTION).round();
            out.extend_from_slice(&(raw_ticks as u16).to_le_bytes());
        }
        Ok(out)
    }

    fn numeric_value(&self) -> Option<f64> {
        Some(self.instantaneous_power_watts as f64)
    }

    fn to_parsed_value(&self) -> ParsedValue {
        ParsedValue::Structured(serde_json::json!({
            "instantaneous_power_watts": self.instantaneous_power_watts,
            "pedal_power_balance_percent": self.pedal_power_balance_percent,
            "accumulated_energy_kj": self.accumulated_energy_kj,
            "cumulative_wheel_revolutions": self.cumulative_wheel_revolutions,
            "last_wheel_event_time_seconds": self.last_wheel_event_time_seconds,
            "cumulative_crank_revolutions": self.cumulative_crank_revolutions,
            "last_crank_event_time_seconds": self.last_crank_event_time_seconds,
            "supported_features": self.supported_features,
        }))
    }

    fn from_parsed_value(value: &ParsedValue) -> Result<Self> {
        let ParsedValue::Structured(json) = value else {
            return Err(Error::with_message(
                ErrorKind::Encode(Self::INFO.name.into(), "expected a structured measurement payload".into()),
                "unsupported ParsedValue variant",
            ));
        };
        let power = json
            .get("instantaneous_power_watts")
            .and_then(|v| v.as_i64())
            .filter(|p| (i16::MIN as i64..=i16::MAX as i64).contains(p))
            .ok_or_else(|| {
                Error::with_message(
                    ErrorKind::Encode(Self::INFO.name.into(), "malformed structured payload".into()),
                    "instantaneous_power_watts is missing or out of sint16 range",
                )
            })?;
        Ok(CyclingPowerMeasurement {
            flags: 0,
            instantaneous_power_watts: power as i16,
            pedal_power_balance_percent: json.get("pedal_power_balance_percent").and_then(|v| v.as_f64()),
            accumulated_energy_kj: json.get("accumulated_energy_kj").and_then(|v| v.as_u64()).map(|v| v as u16),
            cumulative_wheel_revolutions: json.get("cumulative_wheel_revolutions").and_then(|v| v.as_u64()).map(|v| v as u32),
            last_wheel_event_time_seconds: json.get("last_wheel_event_time_seconds").and_then(|v| v.as_f64()),
            cumulative_crank_revolutions: json.get("cumulative_crank_revolutions").and_then(|v| v.as_u64()).map(|v| v as u16),
            last_crank_event_time_seconds: json.get("last_crank_event_time_seconds").and_then(|v| v.as_f64()),
            supported_features: json.get("supported_features").and_then(|v| v.as_u64()).map(|v| v as u32),
        })
    }
}

pub(crate) fn register(registry: &mut ClassRegistry) {
    registry.insert_builtin::<CyclingPowerMeasurement>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_minimal_measurement() {
        let bytes = vec![0x00, 0x00, 0xC8, 0x00]; // flags=0, power=200W
        let ParseOutcome::Value(m) = CyclingPowerMeasurement::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(m.instantaneous_power_watts, 200);
        assert!(m.pedal_power_balance_percent.is_none());
    }

    #[test]
    fn pedal_balance_unknown_sentinel_is_omitted() {
        let flags = 1u16 << PEDAL_POWER_BALANCE_PRESENT_BIT;
        let bytes = vec![flags as u8, 0x00, 0xC8, 0x00, 0xFF];
        let ParseOutcome::Value(m) = CyclingPowerMeasurement::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert!(m.pedal_power_balance_percent.is_none());
    }

    #[test]
    fn optional_feature_dependency_is_consulted_from_context() {
        let mut ctx = CharacteristicContext::new();
        ctx.other_characteristics.insert(CYCLING_POWER_FEATURE_UUID.to_string(), ParsedValue::Int(0x0000_0101));
        let bytes = vec![0x00, 0x00, 0xC8, 0x00];
        let ParseOutcome::Value(m) = CyclingPowerMeasurement::decode_value(&bytes, Some(&ctx)).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(m.supported_features, Some(0x0000_0101));
    }

    #[test]
    fn wheel_and_crank_round_trip() {
        let mut m = CyclingPowerMeasurement { instantaneous_power_watts: 150, ..Default::default() };
        m.cumulative_wheel_revolutions = Some(1000);
        m.last_wheel_event_time_seconds = Some(2.0);
        m.cumulative_crank_revolutions = Some(50);
        m.last_crank_event_time_seconds = Some(1.0);
        let bytes = m.encode_value().unwrap();
        let ParseOutcome::Value(decoded) = CyclingPowerMeasurement::decode_value(&bytes, None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(decoded.cumulative_wheel_revolutions, Some(1000));
        assert!((decoded.last_wheel_event_time_seconds.unwrap() - 2.0).abs() < 1e-6);
        assert_eq!(decoded.cumulative_crank_revolutions, Some(50));
    }

    #[test]
    fn structured_value_preserves_every_optional_field() {
        let mut m = CyclingPowerMeasurement { instantaneous_power_watts: 150, ..Default::default() };
        m.pedal_power_balance_percent = Some(48.5);
        m.accumulated_energy_kj = Some(12);
        m.cumulative_wheel_revolutions = Some(1000);
        m.last_wheel_event_time_seconds = Some(2.0);
        m.cumulative_crank_revolutions = Some(50);
        m.last_crank_event_time_seconds = Some(1.0);
        m.supported_features = Some(0x0000_0101);

        let structured = m.to_parsed_value();
        let rebuilt = CyclingPowerMeasurement::from_parsed_value(&structured).unwrap();
        assert_eq!(rebuilt.instantaneous_power_watts, m.instantaneous_power_watts);
        assert_eq!(rebuilt.pedal_power_balance_percent, m.pedal_power_balance_percent);
        assert_eq!(rebuilt.accumulated_energy_kj, m.accumulated_energy_kj);
        assert_eq!(rebuilt.cumulative_wheel_revolutions, m.cumulative_wheel_revolutions);
        assert_eq!(rebuilt.last_wheel_event_time_seconds, m.last_wheel_event_time_seconds);
        assert_eq!(rebuilt.cumulative_crank_revolutions, m.cumulative_crank_revolutions);
        assert_eq!(rebuilt.last_crank_event_time_seconds, m.last_crank_event_time_seconds);
        assert_eq!(rebuilt.supported_features, m.supported_features);
    }
}
