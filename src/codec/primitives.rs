//! Scalar extractors and packers for every Bluetooth SIG wire type, all
//! little-endian per Core Specification convention.

use crate::error::{Error, ErrorKind, Result};

fn need(bytes: &[u8], offset: usize, width: usize, what: &str) -> Result<()> {
    if offset + width > bytes.len() {
        return Err(Error::with_message(
            ErrorKind::ParseField(
                what.to_string(),
                format!("need {width} bytes at offset {offset}, have {}", bytes.len()),
            ),
            "buffer too short",
        ));
    }
    Ok(())
}

macro_rules! unsigned_extractor {
    ($name:ident, $pack:ident, $ty:ty, $width:expr) => {
        /// Reads a little-endian unsigned integer, returning the value and
        /// the offset just past it.
        pub fn $name(bytes: &[u8], offset: usize) -> Result<($ty, usize)> {
            need(bytes, offset, $width, stringify!($name))?;
            let mut buf = [0u8; $width];
            buf.copy_from_slice(&bytes[offset..offset + $width]);
            let mut padded = [0u8; std::mem::size_of::<$ty>()];
            padded[..$width].copy_from_slice(&buf);
            Ok((<$ty>::from_le_bytes(padded), offset + $width))
        }

        /// Packs a value as a little-endian unsigned integer of this width.
        pub fn $pack(value: $ty) -> Vec<u8> {
            value.to_le_bytes()[..$width].to_vec()
        }
    };
}

unsigned_extractor!(read_u8, pack_u8, u8, 1);
unsigned_extractor!(read_u16, pack_u16, u16, 2);
unsigned_extractor!(read_u32, pack_u32, u32, 4);
unsigned_extractor!(read_u64, pack_u64, u64, 8);

/// Reads a little-endian 24-bit unsigned integer (synthesised from 3 bytes).
pub fn read_u24(bytes: &[u8], offset: usize) -> Result<(u32, usize)> {
    need(bytes, offset, 3, "u24")?;
    let v = bytes[offset] as u32 | (bytes[offset + 1] as u32) << 8 | (bytes[offset + 2] as u32) << 16;
    Ok((v, offset + 3))
}

/// Packs the low 24 bits of `value` as 3 little-endian bytes.
pub fn pack_u24(value: u32) -> Vec<u8> {
    vec![(value & 0xFF) as u8, ((value >> 8) & 0xFF) as u8, ((value >> 16) & 0xFF) as u8]
}

macro_rules! signed_extractor {
    ($name:ident, $pack:ident, $unsigned_read:ident, $unsigned_pack:ident, $uty:ty, $ity:ty, $width:expr) => {
        /// Reads a little-endian signed integer, returning the value and the
        /// offset just past it.
        pub fn $name(bytes: &[u8], offset: usize) -> Result<($ity, usize)> {
            let (raw, new_offset) = $unsigned_read(bytes, offset)?;
            Ok((sign_extend(raw as u64, $width * 8) as $ity, new_offset))
        }

        /// Packs a signed integer of this width.
        pub fn $pack(value: $ity) -> Vec<u8> {
            $unsigned_pack(value as $uty)
        }
    };
}

fn sign_extend(value: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

signed_extractor!(read_i8, pack_i8, read_u8, pack_u8, u8, i8, 1);
signed_extractor!(read_i16, pack_i16, read_u16, pack_u16, u16, i16, 2);
signed_extractor!(read_i32, pack_i32, read_u32, pack_u32, u32, i32, 4);
signed_extractor!(read_i64, pack_i64, read_u64, pack_u64, u64, i64, 8);

/// Reads a little-endian sign-extended 24-bit integer.
pub fn read_i24(bytes: &[u8], offset: usize) -> Result<(i32, usize)> {
    let (raw, new_offset) = read_u24(bytes, offset)?;
    Ok((sign_extend(raw as u64, 24) as i32, new_offset))
}

/// Packs the low 24 bits of a signed integer.
pub fn pack_i24(value: i32) -> Vec<u8> {
    pack_u24((value as u32) & 0x00FF_FFFF)
}

/// Reads a little-endian IEEE-754 single-precision float.
pub fn read_f32(bytes: &[u8], offset: usize) -> Result<(f32, usize)> {
    let (raw, new_offset) = read_u32(bytes, offset)?;
    Ok((f32::from_bits(raw), new_offset))
}

pub fn pack_f32(value: f32) -> Vec<u8> {
    pack_u32(value.to_bits())
}

/// Reads a little-endian IEEE-754 double-precision float.
pub fn read_f64(bytes: &[u8], offset: usize) -> Result<(f64, usize)> {
    let (raw, new_offset) = read_u64(bytes, offset)?;
    Ok((f64::from_bits(raw), new_offset))
}

pub fn pack_f64(value: f64) -> Vec<u8> {
    pack_u64(value.to_bits())
}

/// IEEE-11073-20601 medfloat16 (SFLOAT) sentinel raw values.
pub const MEDFLOAT16_POSITIVE_INFINITY: u16 = 0x07FE;
pub const MEDFLOAT16_NAN: u16 = 0x07FF;
pub const MEDFLOAT16_NRES: u16 = 0x0800;
pub const MEDFLOAT16_RESERVED: u16 = 0x0801;
pub const MEDFLOAT16_NEGATIVE_INFINITY: u16 = 0x0802;

/// Result of decoding an IEEE-11073 medfloat: either an ordinary value or
/// one of the format's defined sentinels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Medfloat {
    Value(f64),
    PositiveInfinity,
    NaN,
    NotAtThisResolution,
    Reserved,
    NegativeInfinity,
}

/// Decodes a 16-bit IEEE-11073 SFLOAT: a 12-bit signed mantissa and a 4-bit
/// signed exponent, value = mantissa × 10^exponent.
pub fn read_medfloat16(bytes: &[u8], offset: usize) -> Result<(Medfloat, usize)> {
    let (raw, new_offset) = read_u16(bytes, offset)?;
    Ok((decode_medfloat16(raw), new_offset))
}

pub fn decode_medfloat16(raw: u16) -> Medfloat {
    match raw {
        MEDFLOAT16_POSITIVE_INFINITY => return Medfloat::PositiveInfinity,
        MEDFLOAT16_NAN => return Medfloat::NaN,
        MEDFLOAT16_NRES => return Medfloat::NotAtThisResolution,
        MEDFLOAT16_RESERVED => return Medfloat::Reserved,
        MEDFLOAT16_NEGATIVE_INFINITY => return Medfloat::NegativeInfinity,
        _ => {}
    }
    let mantissa_raw = raw & 0x0FFF;
    let exponent_raw = (raw >> 12) & 0x0F;
    let mantissa = sign_extend(mantissa_raw as u64, 12) as i32;
    let exponent = sign_extend(exponent_raw as u64, 4) as i32;
    Medfloat::Value(mantissa as f64 * 10f64.powi(exponent))
}

/// Encodes a medfloat16 value. Ordinary values are scaled to the largest
/// magnitude that fits a 12-bit signed mantissa at a power-of-ten exponent
/// in `[-8, 7]`.
pub fn pack_medfloat16(value: Medfloat) -> Vec<u8> {
    let raw = match value {
        Medfloat::PositiveInfinity => MEDFLOAT16_POSITIVE_INFINITY,
        Medfloat::NaN => MEDFLOAT16_NAN,
        Medfloat::NotAtThisResolution => MEDFLOAT16_NRES,
        Medfloat::Reserved => MEDFLOAT16_RESERVED,
        Medfloat::NegativeInfinity => MEDFLOAT16_NEGATIVE_INFINITY,
        Medfloat::Value(v) => encode_medfloat_mantissa_exponent(v, 12, -8, 7),
    };
    pack_u16(raw)
}

fn encode_medfloat_mantissa_exponent(value: f64, mantissa_bits: u32, min_exp: i32, max_exp: i32) -> u16 {
    let max_mantissa = (1i64 << (mantissa_bits - 1)) - 1;
    let mut exponent = 0i32;
    let mut mantissa = value;
    while mantissa.abs() > max_mantissa as f64 && exponent < max_exp {
        mantissa /= 10.0;
        exponent += 1;
    }
    while mantissa.fract().abs() > 1e-9 && exponent > min_exp {
        mantissa *= 10.0;
        exponent -= 1;
    }
    let mantissa = mantissa.round() as i64;
    let mantissa_bits_val = (mantissa as u16) & ((1u16 << mantissa_bits) - 1);
    let exponent_bits_val = (exponent as u16) & 0x0F;
    mantissa_bits_val | (exponent_bits_val << mantissa_bits)
}

/// IEEE-11073-20601 medfloat32 (FLOAT) sentinel raw values.
pub const MEDFLOAT32_POSITIVE_INFINITY: u32 = 0x007F_FFFE;
pub const MEDFLOAT32_NAN: u32 = 0x007F_FFFF;
pub const MEDFLOAT32_NRES: u32 = 0x0080_0000;
pub const MEDFLOAT32_RESERVED: u32 = 0x0080_0001;
pub const MEDFLOAT32_NEGATIVE_INFINITY: u32 = 0x0080_0002;

/// Decodes a 32-bit IEEE-11073 FLOAT: a 24-bit signed mantissa and an 8-bit
/// signed exponent.
pub fn read_medfloat32(bytes: &[u8], offset: usize) -> Result<(Medfloat, usize)> {
    let (raw, new_offset) = read_u32(bytes, offset)?;
    Ok((decode_medfloat32(raw), new_offset))
}

pub fn decode_medfloat32(raw: u32) -> Medfloat {
    match raw {
        MEDFLOAT32_POSITIVE_INFINITY => return Medfloat::PositiveInfinity,
        MEDFLOAT32_NAN => return Medfloat::NaN,
        MEDFLOAT32_NRES => return Medfloat::NotAtThisResolution,
        MEDFLOAT32_RESERVED => return Medfloat::Reserved,
        MEDFLOAT32_NEGATIVE_INFINITY => return Medfloat::NegativeInfinity,
        _ => {}
    }
    let mantissa_raw = raw & 0x00FF_FFFF;
    let exponent_raw = (raw >> 24) & 0xFF;
    let mantissa = sign_extend(mantissa_raw as u64, 24) as i32;
    let exponent = sign_extend(exponent_raw as u64, 8) as i32;
    Medfloat::Value(mantissa as f64 * 10f64.powi(exponent))
}

pub fn pack_medfloat32(value: Medfloat) -> Vec<u8> {
    let raw = match value {
        Medfloat::PositiveInfinity => MEDFLOAT32_POSITIVE_INFINITY,
        Medfloat::NaN => MEDFLOAT32_NAN,
        Medfloat::NotAtThisResolution => MEDFLOAT32_NRES,
        Medfloat::Reserved => MEDFLOAT32_RESERVED,
        Medfloat::NegativeInfinity => MEDFLOAT32_NEGATIVE_INFINITY,
        Medfloat::Value(v) => encode_medfloat_mantissa_exponent(v, 24, -128, 127) as u32,
    };
    pack_u32(raw)
}

/// Reads a UTF-8 string from the remainder of the buffer starting at
/// `offset`. Bluetooth SIG `utf8s` fields are conventionally
/// remainder-of-value; length-prefixed sites slice the buffer before
/// calling this.
pub fn read_utf8s(bytes: &[u8], offset: usize) -> Result<(String, usize)> {
    if offset > bytes.len() {
        return Err(Error::with_message(
            ErrorKind::ParseField("utf8s".into(), format!("offset {offset} beyond buffer")),
            "buffer too short",
        ));
    }
    let slice = &bytes[offset..];
    let end = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
    let text = String::from_utf8_lossy(&slice[..end]).into_owned();
    Ok((text, bytes.len()))
}

pub fn pack_utf8s(value: &str) -> Vec<u8> {
    value.as_bytes().to_vec()
}

/// Reads a UTF-16LE string from the remainder of the buffer.
pub fn read_utf16s(bytes: &[u8], offset: usize) -> Result<(String, usize)> {
    if offset > bytes.len() || (bytes.len() - offset) % 2 != 0 {
        return Err(Error::with_message(
            ErrorKind::ParseField("utf16s".into(), "odd number of trailing bytes".into()),
            "malformed utf16s field",
        ));
    }
    let units: Vec<u16> = bytes[offset..].chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
    let text = String::from_utf16_lossy(&units);
    Ok((text, bytes.len()))
}

pub fn pack_utf16s(value: &str) -> Vec<u8> {
    value.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

/// Extracts `num_bits` starting at bit `start` (LSB-first) from `value`.
pub fn extract_bit_field(value: u32, start: u32, num_bits: u32) -> u32 {
    let mask = if num_bits >= 32 { u32::MAX } else { (1u32 << num_bits) - 1 };
    (value >> start) & mask
}

/// Tests a single bit of `value`.
pub fn test_bit(value: u32, bit: u32) -> bool {
    extract_bit_field(value, bit, 1) != 0
}

/// Merges `(value, start, num_bits)` fields into a single word, each
/// shifted into place and masked to its declared width.
pub fn merge_bit_fields(fields: &[(u32, u32, u32)]) -> u32 {
    fields.iter().fold(0u32, |acc, &(value, start, num_bits)| {
        let mask = if num_bits >= 32 { u32::MAX } else { (1u32 << num_bits) - 1 };
        acc | ((value & mask) << start)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_unsigned_widths() {
        assert_eq!(read_u16(&pack_u16(0xBEEF), 0).unwrap().0, 0xBEEF);
        assert_eq!(read_u24(&pack_u24(0x00_12_34_56 & 0xFFFFFF), 0).unwrap().0, 0x123456);
        assert_eq!(read_u64(&pack_u64(0x1122_3344_5566_7788), 0).unwrap().0, 0x1122_3344_5566_7788);
    }

    #[test]
    fn signed_sign_extends() {
        assert_eq!(read_i8(&[0xFF], 0).unwrap().0, -1);
        assert_eq!(read_i16(&pack_i16(-100), 0).unwrap().0, -100);
        assert_eq!(read_i24(&pack_i24(-1), 0).unwrap().0, -1);
    }

    #[test]
    fn medfloat16_sentinels_round_trip() {
        assert_eq!(decode_medfloat16(MEDFLOAT16_NAN), Medfloat::NaN);
        assert_eq!(decode_medfloat16(MEDFLOAT16_POSITIVE_INFINITY), Medfloat::PositiveInfinity);
        assert_eq!(pack_medfloat16(Medfloat::NaN), vec![0xFF, 0x07]);
    }

    #[test]
    fn medfloat16_ordinary_value_round_trips_within_tolerance() {
        let decoded = decode_medfloat16(0x00C8); // mantissa 200, exponent 0
        assert_eq!(decoded, Medfloat::Value(200.0));
    }

    #[test]
    fn insufficient_data_reports_field_error() {
        let err = read_u16(&[0x01], 0).unwrap_err();
        matches!(err.kind, ErrorKind::ParseField(_, _));
    }

    #[test]
    fn bitfield_helpers_extract_and_merge() {
        let merged = merge_bit_fields(&[(1, 0, 1), (0b101, 1, 3)]);
        assert_eq!(extract_bit_field(merged, 0, 1), 1);
        assert_eq!(extract_bit_field(merged, 1, 3), 0b101);
        assert!(test_bit(merged, 0));
    }

    #[test]
    fn utf8s_reads_to_null_or_end() {
        let (s, _) = read_utf8s(b"hello\0trailing", 0).unwrap();
        assert_eq!(s, "hello");
    }
}
