//! Reusable parameterised codecs (C4): scaled integers, percentages,
//! temperatures, concentrations and the wind-speed/direction pair, each
//! built on the [`crate::codec::primitives`] extractors.

use crate::codec::primitives::{
    self, decode_medfloat16, pack_medfloat16, Medfloat,
};
use crate::error::{Error, ErrorKind, Result};

/// A `uint16` scaled by a fixed resolution, e.g. Battery Level's companions
/// that report in 0.01-unit steps.
#[derive(Clone, Copy, Debug)]
pub struct ScaledUint16 {
    pub resolution: f64,
    pub max_value: f64,
}

impl ScaledUint16 {
    pub fn decode(&self, bytes: &[u8], offset: usize) -> Result<(f64, usize)> {
        let (raw, new_offset) = primitives::read_u16(bytes, offset)?;
        Ok((raw as f64 * self.resolution, new_offset))
    }

    pub fn encode(&self, value: f64) -> Result<Vec<u8>> {
        let raw = (value / self.resolution).round();
        if !(0.0..=self.max_value).contains(&value) {
            return Err(Error::with_message(
                ErrorKind::Encode("ScaledUint16".into(), value.to_string()),
                format!("value out of range [0, {}]", self.max_value),
            ));
        }
        Ok(primitives::pack_u16(raw as u16))
    }
}

/// A `sint16` scaled by a fixed resolution, e.g. Temperature-like signed
/// quantities.
#[derive(Clone, Copy, Debug)]
pub struct ScaledSint16 {
    pub resolution: f64,
}

impl ScaledSint16 {
    pub fn decode(&self, bytes: &[u8], offset: usize) -> Result<(f64, usize)> {
        let (raw, new_offset) = primitives::read_i16(bytes, offset)?;
        Ok((raw as f64 * self.resolution, new_offset))
    }

    pub fn encode(&self, value: f64) -> Vec<u8> {
        let raw = (value / self.resolution).round() as i16;
        primitives::pack_i16(raw)
    }
}

/// A `uint24` scaled by a fixed resolution.
#[derive(Clone, Copy, Debug)]
pub struct ScaledUint24 {
    pub resolution: f64,
}

impl ScaledUint24 {
    pub fn decode(&self, bytes: &[u8], offset: usize) -> Result<(f64, usize)> {
        let (raw, new_offset) = primitives::read_u24(bytes, offset)?;
        Ok((raw as f64 * self.resolution, new_offset))
    }

    pub fn encode(&self, value: f64) -> Vec<u8> {
        let raw = (value / self.resolution).round() as u32;
        primitives::pack_u24(raw)
    }
}

/// A `sint24` scaled by a fixed resolution.
#[derive(Clone, Copy, Debug)]
pub struct ScaledSint24 {
    pub resolution: f64,
}

impl ScaledSint24 {
    pub fn decode(&self, bytes: &[u8], offset: usize) -> Result<(f64, usize)> {
        let (raw, new_offset) = primitives::read_i24(bytes, offset)?;
        Ok((raw as f64 * self.resolution, new_offset))
    }

    pub fn encode(&self, value: f64) -> Vec<u8> {
        let raw = (value / self.resolution).round() as i32;
        primitives::pack_i24(raw)
    }
}

/// A `uint16` percentage in 0.01% steps, bounded `[0, 100.0]`.
pub const PERCENTAGE: ScaledUint16 = ScaledUint16 { resolution: 0.01, max_value: 100.0 };

/// A `sint16` temperature in 0.01-degree steps.
pub const TEMPERATURE: ScaledSint16 = ScaledSint16 { resolution: 0.01 };

/// Plain, unscaled `uint8`/`sint8` values, kept as templates so
/// characteristics can bind a `_template` uniformly regardless of width.
pub fn decode_simple_uint8(bytes: &[u8], offset: usize) -> Result<(u8, usize)> {
    primitives::read_u8(bytes, offset)
}

pub fn decode_simple_sint8(bytes: &[u8], offset: usize) -> Result<(i8, usize)> {
    primitives::read_i8(bytes, offset)
}

/// A `uint8` temperature-like quantity (whole-degree resolution).
pub fn decode_temperature_like_uint8(bytes: &[u8], offset: usize) -> Result<(f64, usize)> {
    let (raw, new_offset) = primitives::read_u8(bytes, offset)?;
    Ok((raw as f64, new_offset))
}

/// A `sint8` temperature-like quantity (whole-degree resolution).
pub fn decode_temperature_like_sint8(bytes: &[u8], offset: usize) -> Result<(f64, usize)> {
    let (raw, new_offset) = primitives::read_i8(bytes, offset)?;
    Ok((raw as f64, new_offset))
}

/// Decodes a `uint8` and maps it through `f`, falling back to `unknown`
/// rather than erroring when the raw value has no enum mapping — matching
/// the SIG convention that reserved/undefined enumerants are tolerated,
/// not rejected.
pub fn decode_enum_u8<T>(bytes: &[u8], offset: usize, f: impl Fn(u8) -> Option<T>, unknown: T) -> Result<(T, usize)> {
    let (raw, new_offset) = primitives::read_u8(bytes, offset)?;
    Ok((f(raw).unwrap_or(unknown), new_offset))
}

/// An IEEE-11073 medfloat16 reading over a named unit, used directly by
/// characteristics with a single scalar measurement (e.g. gas
/// concentrations).
#[derive(Clone, Copy, Debug)]
pub struct ConcentrationTemplate;

impl ConcentrationTemplate {
    pub fn decode(&self, bytes: &[u8], offset: usize) -> Result<(Medfloat, usize)> {
        primitives::read_medfloat16(bytes, offset)
    }

    pub fn encode(&self, value: Medfloat) -> Vec<u8> {
        pack_medfloat16(value)
    }
}

/// Alias kept distinct from [`ConcentrationTemplate`] for characteristics
/// whose unit isn't a concentration (e.g. generic medfloat16 measurements)
/// even though the wire shape is identical.
pub type Ieee11073FloatTemplate = ConcentrationTemplate;

/// Wind speed: `uint16` in 0.01 m/s steps.
pub const WIND_SPEED: ScaledUint16 = ScaledUint16 { resolution: 0.01, max_value: 655.34 };

/// Wind direction: `uint16` in 0.01-degree steps, wrapping at 360°.
#[derive(Clone, Copy, Debug)]
pub struct WindDirection;

impl WindDirection {
    pub fn decode(&self, bytes: &[u8], offset: usize) -> Result<(f64, usize)> {
        let (raw, new_offset) = primitives::read_u16(bytes, offset)?;
        Ok(((raw as f64 * 0.01) % 360.0, new_offset))
    }

    pub fn encode(&self, value: f64) -> Vec<u8> {
        let normalised = value.rem_euclid(360.0);
        primitives::pack_u16((normalised / 0.01).round() as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_round_trips() {
        let bytes = PERCENTAGE.encode(42.5).unwrap();
        let (value, _) = PERCENTAGE.decode(&bytes, 0).unwrap();
        assert!((value - 42.5).abs() < 1e-9);
    }

    #[test]
    fn percentage_rejects_out_of_range() {
        assert!(PERCENTAGE.encode(150.0).is_err());
    }

    #[test]
    fn temperature_handles_negative_values() {
        let bytes = TEMPERATURE.encode(-12.34);
        let (value, _) = TEMPERATURE.decode(&bytes, 0).unwrap();
        assert!((value + 12.34).abs() < 1e-9);
    }

    #[test]
    fn wind_direction_wraps_at_360() {
        let bytes = WindDirection.encode(370.0);
        let (value, _) = WindDirection.decode(&bytes, 0).unwrap();
        assert!((value - 10.0).abs() < 1e-6);
    }

    #[test]
    fn enum_decode_falls_back_to_unknown() {
        #[derive(Debug, PartialEq)]
        enum Tri {
            A,
            B,
            Unknown,
        }
        let (v, _) = decode_enum_u8(&[9], 0, |raw| match raw {
            0 => Some(Tri::A),
            1 => Some(Tri::B),
            _ => None,
        }, Tri::Unknown)
        .unwrap();
        assert_eq!(v, Tri::Unknown);
    }
}
