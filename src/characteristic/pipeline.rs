//! Parse/encode pipeline (C6): length validation, decode, range validation,
//! wrapped in structured errors with an optional trace.
//!
//! Sentinel detection (spec stage 3) is folded into each characteristic's
//! `decode_value` rather than run as a separate generic stage here, since
//! struct-shaped characteristics have no single raw integer to test
//! uniformly; template-bound scalar characteristics perform the check
//! themselves before falling through to an ordinary decode.

use std::sync::OnceLock;

use crate::characteristic::{
    Characteristic, CharacteristicEncodeError, CharacteristicParseError, LengthSpec, ParseFieldError, ParseOutcome,
    ValidationAccumulator,
};
use crate::error::ErrorKind;
use crate::types::CharacteristicContext;

fn expected_length(spec: LengthSpec) -> usize {
    match spec {
        LengthSpec::Exact(n) => n,
        LengthSpec::Range(min, _) => min,
        LengthSpec::Variable { min } => min,
    }
}

const VALID_RANGE_DESCRIPTOR_UUID: &str = "2906";

static TRACE_ENABLED: OnceLock<bool> = OnceLock::new();

/// Whether `BLUETOOTH_SIG_ENABLE_PARSE_TRACE` is truthy. Read once and
/// cached; later changes to the environment are not observed.
pub fn trace_enabled() -> bool {
    *TRACE_ENABLED.get_or_init(|| {
        std::env::var("BLUETOOTH_SIG_ENABLE_PARSE_TRACE")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false)
    })
}

fn maybe_trace(trace: &mut Vec<String>, stage: &str) {
    if trace_enabled() {
        trace.push(stage.to_string());
    }
}

fn resolve_range<C: Characteristic>(ctx: Option<&CharacteristicContext>) -> Option<(f64, f64)> {
    if let Some(ctx) = ctx {
        if let Some(range) = ctx.valid_range(VALID_RANGE_DESCRIPTOR_UUID) {
            return Some(range);
        }
    }
    C::expected_range()
}

/// Runs the full parse pipeline for characteristic `C` over `bytes`.
pub fn parse<C: Characteristic>(
    bytes: &[u8],
    ctx: Option<&CharacteristicContext>,
) -> Result<ParseOutcome<C>, CharacteristicParseError> {
    let mut trace = Vec::new();
    let mut accumulator = ValidationAccumulator::default();
    let name = C::INFO.name.to_string();
    let uuid = C::INFO.uuid.to_string();

    maybe_trace(&mut trace, "length_validation");
    if !C::length_spec().matches(bytes.len()) {
        accumulator.push_error(
            ErrorKind::InsufficientData(uuid.clone(), expected_length(C::length_spec()), bytes.len()).to_string(),
        );
        return Err(CharacteristicParseError {
            name,
            uuid,
            raw: bytes.to_vec(),
            raw_int: None,
            field_errors: Vec::new(),
            trace,
            accumulator,
        });
    }

    maybe_trace(&mut trace, "decode");
    let outcome = C::decode_value(bytes, ctx).map_err(|e| {
        accumulator.push_error(e.to_string());
        // Only a field-level decode failure carries enough identity (which
        // field, what went wrong) to become a `ParseFieldError`; other error
        // kinds (e.g. a malformed structured payload) have no single field to
        // name and leave this empty, matching the source's `isinstance`
        // check on the raised exception type.
        let field_errors = match &e.kind {
            ErrorKind::ParseField(field, reason) => {
                vec![ParseFieldError { field: field.clone(), reason: reason.clone(), offset: None, raw_slice: Some(bytes.to_vec()) }]
            }
            _ => Vec::new(),
        };
        CharacteristicParseError {
            name: name.clone(),
            uuid: uuid.clone(),
            raw: bytes.to_vec(),
            raw_int: None,
            field_errors,
            trace: trace.clone(),
            accumulator: accumulator.clone(),
        }
    })?;

    if let ParseOutcome::Value(ref value) = outcome {
        maybe_trace(&mut trace, "range_validation");
        if let Some(raw) = value.numeric_value() {
            if let Some((min, max)) = resolve_range::<C>(ctx) {
                let tolerance = (max - min).abs() * 1e-6;
                if raw < min - tolerance || raw > max + tolerance {
                    accumulator.push_error(format!("value {raw} outside range [{min}, {max}]"));
                    return Err(CharacteristicParseError {
                        name,
                        uuid,
                        raw: bytes.to_vec(),
                        raw_int: None,
                        field_errors: Vec::new(),
                        trace,
                        accumulator,
                    });
                }
            }
        }
    }

    Ok(outcome)
}

/// Runs the full encode pipeline for characteristic `C`.
pub fn encode<C: Characteristic>(value: &C) -> Result<Vec<u8>, CharacteristicEncodeError> {
    let name = C::INFO.name.to_string();
    let uuid = C::INFO.uuid.to_string();
    let mut accumulator = ValidationAccumulator::default();

    if let Some(raw) = value.numeric_value() {
        if let Some((min, max)) = C::expected_range() {
            let tolerance = (max - min).abs() * 1e-6;
            if raw < min - tolerance || raw > max + tolerance {
                accumulator.push_error(format!("value {raw} outside range [{min}, {max}]"));
                return Err(CharacteristicEncodeError { name, uuid, accumulator });
            }
        }
    }

    let bytes = value.encode_value().map_err(|e| {
        accumulator.push_error(e.to_string());
        CharacteristicEncodeError { name: name.clone(), uuid: uuid.clone(), accumulator: accumulator.clone() }
    })?;

    if !C::length_spec().matches(bytes.len()) {
        accumulator.push_error(format!("encoded length {} does not satisfy {:?}", bytes.len(), C::length_spec()));
        return Err(CharacteristicEncodeError { name, uuid, accumulator });
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characteristic::builtin::battery_level::BatteryLevel;
    use crate::characteristic::builtin::battery_level_status::BatteryLevelStatus;

    #[test]
    fn parse_rejects_wrong_length() {
        let err = parse::<BatteryLevel>(&[], None).unwrap_err();
        assert!(!err.accumulator.errors.is_empty());
    }

    #[test]
    fn empty_buffer_reports_insufficient_data() {
        let err = parse::<BatteryLevel>(&[], None).unwrap_err();
        assert!(err.accumulator.errors[0].contains("insufficient data for 2A19"));
    }

    #[test]
    fn parse_and_encode_round_trip() {
        let outcome = parse::<BatteryLevel>(&[42], None).unwrap();
        let value = outcome.into_value().unwrap();
        let bytes = encode(&value).unwrap();
        assert_eq!(bytes, vec![42]);
    }

    #[test]
    fn field_level_decode_failure_populates_field_errors() {
        // Flags byte claims an Identifier field is present, but the payload
        // ends before it.
        let err = parse::<BatteryLevelStatus>(&[0x01, 0x00, 0x00], None).unwrap_err();
        assert_eq!(err.field_errors.len(), 1);
        assert_eq!(err.field_errors[0].field, "identifier");
    }
}
