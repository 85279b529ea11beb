//! Per-characteristic codecs (C5), the parse/encode pipeline (C6), and the
//! characteristic/service class registry (C7).

pub mod builtin;
pub mod class_registry;
pub mod pipeline;

use crate::types::{CharacteristicContext, ParsedValue, SpecialValueResult, ValueType};

/// Static identity of a built-in characteristic type, standing in for the
/// metaclass-stamped `_info` of the source implementation.
#[derive(Clone, Copy, Debug)]
pub struct CharacteristicDescriptor {
    pub name: &'static str,
    pub uuid: &'static str,
    pub value_type: ValueType,
}

/// Declares how the pipeline validates raw byte length before decoding.
#[derive(Clone, Copy, Debug)]
pub enum LengthSpec {
    Exact(usize),
    Range(usize, usize),
    Variable { min: usize },
}

impl LengthSpec {
    pub fn matches(&self, len: usize) -> bool {
        match *self {
            LengthSpec::Exact(n) => len == n,
            LengthSpec::Range(min, max) => (min..=max).contains(&len),
            LengthSpec::Variable { min } => len >= min,
        }
    }
}

/// A single special/sentinel raw-value mapping, e.g. uint16 `0xFFFF` =
/// "unknown".
#[derive(Clone, Copy, Debug)]
pub struct SpecialValueEntry {
    pub raw: i64,
    pub meaning: &'static str,
    pub value_type: ValueType,
}

/// Either an ordinarily-decoded value or a detected sentinel — the sum-type
/// replacement for the signalling-exception pattern used when a single raw
/// encoding can mean either "a real value" or "a defined absence/overflow
/// marker".
#[derive(Clone, Debug)]
pub enum ParseOutcome<T> {
    Value(T),
    Special(SpecialValueResult),
}

impl<T> ParseOutcome<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            ParseOutcome::Value(v) => Some(v),
            ParseOutcome::Special(_) => None,
        }
    }
}

/// A field-level decode failure, carrying enough context to diagnose which
/// byte range and field name were involved.
#[derive(Clone, Debug)]
pub struct ParseFieldError {
    pub field: String,
    pub reason: String,
    pub offset: Option<usize>,
    pub raw_slice: Option<Vec<u8>>,
}

/// Ordered collection of validation errors/warnings accumulated across a
/// single pipeline run.
#[derive(Clone, Debug, Default)]
pub struct ValidationAccumulator {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationAccumulator {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Everything known about a failed parse: the characteristic identity, the
/// raw input, any extracted raw integer, per-field errors, the optional
/// trace, and the accumulator.
#[derive(Clone, Debug)]
pub struct CharacteristicParseError {
    pub name: String,
    pub uuid: String,
    pub raw: Vec<u8>,
    pub raw_int: Option<i64>,
    pub field_errors: Vec<ParseFieldError>,
    pub trace: Vec<String>,
    pub accumulator: ValidationAccumulator,
}

impl std::fmt::Display for CharacteristicParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to parse {} ({}): {:?}", self.name, self.uuid, self.accumulator.errors)
    }
}

impl std::error::Error for CharacteristicParseError {}

/// Mirror of [`CharacteristicParseError`] for the encode direction.
#[derive(Clone, Debug)]
pub struct CharacteristicEncodeError {
    pub name: String,
    pub uuid: String,
    pub accumulator: ValidationAccumulator,
}

impl std::fmt::Display for CharacteristicEncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to encode {} ({}): {:?}", self.name, self.uuid, self.accumulator.errors)
    }
}

impl std::error::Error for CharacteristicEncodeError {}

/// A per-characteristic codec. Built-in types bind a fixed
/// [`CharacteristicDescriptor`], declare their wire-length and range
/// contracts, and implement decode/encode directly — with sentinel
/// detection folded into `decode_value` itself (rather than a separate
/// generic pipeline stage) since struct-shaped characteristics have no
/// single "raw int" to test uniformly.
pub trait Characteristic: Sized {
    const INFO: CharacteristicDescriptor;

    fn length_spec() -> LengthSpec;

    fn required_dependencies() -> &'static [&'static str] {
        &[]
    }

    fn optional_dependencies() -> &'static [&'static str] {
        &[]
    }

    fn decode_value(bytes: &[u8], ctx: Option<&CharacteristicContext>) -> crate::error::Result<ParseOutcome<Self>>;

    fn encode_value(&self) -> crate::error::Result<Vec<u8>>;

    /// The numeric reading this characteristic carries, if any — used by
    /// the pipeline's range-validation stage. Structured/bitfield
    /// characteristics leave this `None` and are exempt from numeric range
    /// checks.
    fn numeric_value(&self) -> Option<f64> {
        None
    }

    /// Class-level `[min_value, max_value]`, the second-precedence range
    /// source after a Valid Range descriptor.
    fn expected_range() -> Option<(f64, f64)> {
        None
    }

    /// Converts a decoded value into the dynamically-typed map entry the
    /// class registry and batch resolver pass around.
    fn to_parsed_value(&self) -> ParsedValue;

    /// Reconstructs a typed value from a dynamically-typed map entry, for
    /// UUID-dispatched `encode_characteristic` calls.
    fn from_parsed_value(value: &ParsedValue) -> crate::error::Result<Self>;
}
