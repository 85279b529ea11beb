//! Glucose Measurement (0x2A18): Flags-driven optional fields wrapped around
//! a mandatory sequence number, IEEE-11073 base time, and IEEE-11073
//! SFLOAT glucose concentration.
//!
//! Wire layout: Flags(1) + Sequence Number(2) + Base Time(7) +
//! \[Time Offset(2)\] + Glucose Concentration(2) + \[Type/Sample Location(1)\]
//! + \[Sensor Status Annunciation(2)\].

use crate::characteristic::class_registry::ClassRegistry;
use crate::characteristic::{Characteristic, CharacteristicDescriptor, LengthSpec, ParseOutcome};
use crate::codec::primitives::{decode_medfloat16, pack_medfloat16, read_i16, read_u16, read_u8, test_bit, Medfloat};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{CharacteristicContext, ParsedValue, ValueType};

const TIME_OFFSET_PRESENT_BIT: u32 = 0;
const MMOL_PER_L_UNIT_BIT: u32 = 1;
const TYPE_SAMPLE_LOCATION_PRESENT_BIT: u32 = 2;
const SENSOR_STATUS_PRESENT_BIT: u32 = 3;

/// IEEE-11073-20601 "Date Time" base time: a plain calendar timestamp with
/// no timezone, year `0` meaning unknown.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ieee11073Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Ieee11073Timestamp {
    pub(crate) fn decode(bytes: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (year, offset) = read_u16(bytes, offset)?;
        let (month, offset) = read_u8(bytes, offset)?;
        let (day, offset) = read_u8(bytes, offset)?;
        let (hour, offset) = read_u8(bytes, offset)?;
        let (minute, offset) = read_u8(bytes, offset)?;
        let (second, offset) = read_u8(bytes, offset)?;
        Ok((Ieee11073Timestamp { year, month, day, hour, minute, second }, offset))
    }

    pub(crate) fn encode(self) -> Vec<u8> {
        let mut out = self.year.to_le_bytes().to_vec();
        out.extend_from_slice(&[self.month, self.day, self.hour, self.minute, self.second]);
        out
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum GlucoseConcentrationUnit {
    MgPerDl,
    MmolPerL,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GlucoseMeasurement {
    pub sequence_number: u16,
    pub base_time: Ieee11073Timestamp,
    pub time_offset_minutes: Option<i16>,
    pub glucose_concentration: Option<Medfloat>,
    pub unit: GlucoseConcentrationUnit,
    pub glucose_type: Option<u8>,
    pub sample_location: Option<u8>,
    pub sensor_status: Option<u16>,
}

impl Characteristic for GlucoseMeasurement {
    const INFO: CharacteristicDescriptor =
        CharacteristicDescriptor { name: "Glucose Measurement", uuid: "2A18", value_type: ValueType::Bitfield };

    fn length_spec() -> LengthSpec {
        LengthSpec::Variable { min: 12 }
    }

    fn decode_value(bytes: &[u8], _ctx: Option<&CharacteristicContext>) -> Result<ParseOutcome<Self>> {
        let (flags, offset) = read_u8(bytes, 0)?;
        let flags = flags as u32;
        let (sequence_number, offset) = read_u16(bytes, offset)?;
        let (base_time, mut offset) = Ieee11073Timestamp::decode(bytes, offset)?;

        let mut time_offset_minutes = None;
        if test_bit(flags, TIME_OFFSET_PRESENT_BIT) && bytes.len() >= offset + 2 {
            let (v, new_offset) = read_i16(bytes, offset)?;
            time_offset_minutes = Some(v);
            offset = new_offset;
        }

        let mut glucose_concentration = None;
        if bytes.len() >= offset + 2 {
            let (raw, new_offset) = read_u16(bytes, offset)?;
            glucose_concentration = Some(decode_medfloat16(raw));
            offset = new_offset;
        }
        let unit =
            if test_bit(flags, MMOL_PER_L_UNIT_BIT) { GlucoseConcentrationUnit::MmolPerL } else { GlucoseConcentrationUnit::MgPerDl };

        let mut glucose_type = None;
        let mut sample_location = None;
        if test_bit(flags, TYPE_SAMPLE_LOCATION_PRESENT_BIT) && bytes.len() >= offset + 1 {
            let (type_sample, new_offset) = read_u8(bytes, offset)?;
            glucose_type = Some((type_sample >> 4) & 0x0F);
            sample_location = Some(type_sample & 0x0F);
            offset = new_offset;
        }

        let mut sensor_status = None;
        if test_bit(flags, SENSOR_STATUS_PRESENT_BIT) && bytes.len() >= offset + 2 {
            let (v, _) = read_u16(bytes, offset)?;
            sensor_status = Some(v);
        }

        Ok(ParseOutcome::Value(GlucoseMeasurement {
            sequence_number,
            base_time,
            time_offset_minutes,
            glucose_concentration,
            unit,
            glucose_type,
            sample_location,
            sensor_status,
        }))
    }

    fn encode_value(&self) -> Result<Vec<u8>> {
        let mut flags = 0u8;
        if self.time_offset_minutes.is_some() {
            flags |= 1 << TIME_OFFSET_PRESENT_BIT;
        }
        if matches!(self.unit, GlucoseConcentrationUnit::MmolPerL) {
            flags |= 1 << MMOL_PER_L_UNIT_BIT;
        }
        if self.glucose_type.is_some() || self.sample_location.is_some() {
            flags |= 1 << TYPE_SAMPLE_LOCATION_PRESENT_BIT;
        }
        if self.sensor_status.is_some() {
            flags |= 1 << SENSOR_STATUS_PRESENT_BIT;
        }

        let mut out = vec![flags];
        out.extend_from_slice(&self.sequence_number.to_le_bytes());
        out.extend_from_slice(&self.base_time.encode());
        if let Some(offset) = self.time_offset_minutes {
            out.extend_from_slice(&offset.to_le_bytes());
        }
        if let Some(glucose) = self.glucose_concentration {
            out.extend_from_slice(&pack_medfloat16(glucose));
        } else {
            return Err(Error::with_message(
                ErrorKind::Encode(Self::INFO.name.into(), "glucose_concentration".into()),
                "glucose concentration is required to encode a measurement",
            ));
        }
        if self.glucose_type.is_some() || self.sample_location.is_some() {
            let type_location = ((self.glucose_type.unwrap_or(0) & 0x0F) << 4) | (self.sample_location.unwrap_or(0) & 0x0F);
            out.push(type_location);
        }
        if let Some(status) = self.sensor_status {
            out.extend_from_slice(&status.to_le_bytes());
        }
        Ok(out)
    }

    fn to_parsed_value(&self) -> ParsedValue {
        ParsedValue::Structured(serde_json::json!({
            "sequence_number": self.sequence_number,
            "base_time": timestamp_to_json(&self.base_time),
            "time_offset_minutes": self.time_offset_minutes,
            "glucose_concentration": self.glucose_concentration.map(medfloat_to_json),
            "unit": self.unit.to_string(),
            "glucose_type": self.glucose_type,
            "sample_location": self.sample_location,
            "sensor_status": self.sensor_status,
        }))
    }

    fn from_parsed_value(value: &ParsedValue) -> Result<Self> {
        let ParsedValue::Structured(json) = value else {
            return Err(Error::with_message(
                ErrorKind::Encode(Self::INFO.name.into(), "expected a structured measurement payload".into()),
                "unsupported ParsedValue variant",
            ));
        };
        let invalid = || {
            Error::with_message(
                ErrorKind::Encode(Self::INFO.name.into(), "malformed structured payload".into()),
                "glucose measurement JSON is missing or has the wrong shape for a required field",
            )
        };
        let sequence_number = json.get("sequence_number").and_then(|v| v.as_u64()).ok_or_else(invalid)? as u16;
        let base_time = json.get("base_time").ok_or_else(invalid).and_then(timestamp_from_json)?;
        let unit_str = json.get("unit").and_then(|v| v.as_str()).ok_or_else(invalid)?;
        let unit: GlucoseConcentrationUnit =
            unit_str.parse().map_err(|_| invalid())?;
        Ok(GlucoseMeasurement {
            sequence_number,
            base_time,
            time_offset_minutes: json.get("time_offset_minutes").and_then(|v| v.as_i64()).map(|v| v as i16),
            glucose_concentration: json
                .get("glucose_concentration")
                .filter(|v| !v.is_null())
                .map(medfloat_from_json)
                .transpose()?,
            unit,
            glucose_type: json.get("glucose_type").and_then(|v| v.as_u64()).map(|v| v as u8),
            sample_location: json.get("sample_location").and_then(|v| v.as_u64()).map(|v| v as u8),
            sensor_status: json.get("sensor_status").and_then(|v| v.as_u64()).map(|v| v as u16),
        })
    }
}

fn timestamp_to_json(ts: &Ieee11073Timestamp) -> serde_json::Value {
    serde_json::json!({
        "year": ts.year,
        "month": ts.month,
        "day": ts.day,
        "hour": ts.hour,
        "minute": ts.minute,
        "second": ts.second,
    })
}

fn timestamp_from_json(json: &serde_json::Value) -> Result<Ieee11073Timestamp> {
    let field = |name: &str| -> Option<u64> { json.get(name)?.as_u64() };
    let missing = || {
        Error::with_message(
            ErrorKind::Encode("Glucose Measurement".into(), "malformed base_time payload".into()),
            "base_time JSON is missing or has the wrong shape for a required field",
        )
    };
    Ok(Ieee11073Timestamp {
        year: field("year").ok_or_else(missing)? as u16,
        month: field("month").ok_or_else(missing)? as u8,
        day: field("day").ok_or_else(missing)? as u8,
        hour: field("hour").ok_or_else(missing)? as u8,
        minute: field("minute").ok_or_else(missing)? as u8,
        second: field("second").ok_or_else(missing)? as u8,
    })
}

fn medfloat_to_json(value: Medfloat) -> serde_json::Value {
    match value {
        Medfloat::Value(v) => serde_json::json!(v),
        Medfloat::PositiveInfinity => serde_json::json!("positive_infinity"),
        Medfloat::NaN => serde_json::json!("nan"),
        Medfloat::NotAtThisResolution => serde_json::json!("not_at_this_resolution"),
        Medfloat::Reserved => serde_json::json!("reserved"),
        Medfloat::NegativeInfinity => serde_json::json!("negative_infinity"),
    }
}

fn medfloat_from_json(json: &serde_json::Value) -> Result<Medfloat> {
    if let Some(v) = json.as_f64() {
        return Ok(Medfloat::Value(v));
    }
    match json.as_str() {
        Some("positive_infinity") => Ok(Medfloat::PositiveInfinity),
        Some("nan") => Ok(Medfloat::NaN),
        Some("not_at_this_resolution") => Ok(Medfloat::NotAtThisResolution),
        Some("reserved") => Ok(Medfloat::Reserved),
        Some("negative_infinity") => Ok(Medfloat::NegativeInfinity),
        _ => Err(Error::with_message(
            ErrorKind::Encode("Glucose Measurement".into(), "malformed glucose_concentration payload".into()),
            "glucose_concentration JSON is neither a number nor a recognized sentinel tag",
        )),
    }
}

pub(crate) fn register(registry: &mut ClassRegistry) {
    registry.insert_builtin::<GlucoseMeasurement>();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes() -> Vec<u8> {
        let mut bytes = vec![0x00]; // flags: none of the optional fields
        bytes.extend_from_slice(&7u16.to_le_bytes()); // sequence number
        bytes.extend_from_slice(&2026u16.to_le_bytes()); // year
        bytes.extend_from_slice(&[7, 27, 14, 30, 0]); // month, day, hour, minute, second
        bytes.extend_from_slice(&pack_medfloat16(Medfloat::Value(95.0)));
        bytes
    }

    #[test]
    fn decodes_minimal_measurement() {
        let ParseOutcome::Value(measurement) = GlucoseMeasurement::decode_value(&sample_bytes(), None).unwrap() else {
            panic!("expected a value")
        };
        assert_eq!(measurement.sequence_number, 7);
        assert_eq!(measurement.base_time.year, 2026);
        assert_eq!(measurement.unit, GlucoseConcentrationUnit::MgPerDl);
        assert_eq!(measurement.glucose_concentration, Some(Medfloat::Value(95.0)));
    }

    #[test]
    fn encode_round_trips() {
        let ParseOutcome::Value(measurement) = GlucoseMeasurement::decode_value(&sample_bytes(), None).unwrap() else {
            panic!("expected a value")
        };
        let encoded = measurement.encode_value().unwrap();
        assert_eq!(encoded, sample_bytes());
    }

    #[test]
    fn structured_value_round_trips_every_field() {
        let ParseOutcome::Value(measurement) = GlucoseMeasurement::decode_value(&sample_bytes(), None).unwrap() else {
            panic!("expected a value")
        };
        let structured = measurement.to_parsed_value();
        let rebuilt = GlucoseMeasurement::from_parsed_value(&structured).unwrap();
        assert_eq!(rebuilt, measurement);
    }
}
