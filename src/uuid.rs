//! Bluetooth UUID handling: 16-bit and 128-bit forms with automatic expansion
//! against the Bluetooth SIG base UUID.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ErrorKind, Result};

const SHORT_LEN: usize = 4;
const FULL_LEN: usize = 32;

const BASE_UUID_SUFFIX: &str = "00001000800000805F9B34FB";

const INVALID_BASE_UUID_NORMALIZED: &str = "0000000000001000800000805F9B34FB";
const INVALID_NULL_UUID: &str = "00000000000000000000000000000000";
const INVALID_PLACEHOLDER_UUID: &str = "0000123400001000800000805F9B34FB";

/// A Bluetooth UUID, stored internally as its normalized 128-bit hex form.
///
/// Accepts both 16-bit short forms ("180F") and full 128-bit forms (dashed or
/// not), but a short form is expanded against the Bluetooth base UUID
/// immediately on construction — there is exactly one canonical `normalized`
/// string per logical UUID, so equality, hashing and ordering (all derived
/// from the raw field) already agree with a 16-bit UUID and its expanded
/// 128-bit form without any special-casing at the comparison site.
#[derive(Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Uuid {
    normalized: String,
}

impl Uuid {
    /// Parses a UUID from any accepted string form: short ("180F", "0x180f"),
    /// full ("0000180F00001000800000805F9B34FB") or dashed
    /// ("0000180F-0000-1000-8000-00805F9B34FB").
    pub fn parse(input: &str) -> Result<Self> {
        let normalized = normalize_str(input)?;
        Self::from_normalized(normalized)
    }

    /// Builds a UUID from an integer, choosing 16-bit or 128-bit width by
    /// magnitude the way the source implementation does. A 16-bit-range value
    /// is expanded against the Bluetooth base UUID immediately.
    pub fn from_u128(value: u128) -> Result<Self> {
        let normalized = if value <= u128::from(u16::MAX) {
            format!("0000{:04X}{}", value, BASE_UUID_SUFFIX)
        } else {
            format!("{:032X}", value)
        };
        Self::from_normalized(normalized)
    }

    /// Builds a UUID from a 16-bit assigned number.
    pub fn from_u16(value: u16) -> Self {
        Self::from_normalized(format!("0000{:04X}{}", value, BASE_UUID_SUFFIX))
            .expect("a 16-bit value always expands to a valid full-form UUID")
    }

    fn from_normalized(normalized: String) -> Result<Self> {
        if !is_valid_normalized(&normalized) {
            return Err(Error::with_message(
                ErrorKind::InvalidUuid(normalized.clone()),
                "not a valid 4- or 32-digit hex UUID",
            ));
        }
        Ok(Self { normalized })
    }

    /// True if this is a 16-bit short-form UUID. `normalized` is always
    /// expanded to full width on construction, so this is always `false` —
    /// kept for parity with the upstream property it mirrors.
    pub fn is_short(&self) -> bool {
        self.normalized.len() == SHORT_LEN
    }

    /// True if this is a 128-bit full-form UUID. Always `true`, since
    /// `normalized` is always stored at full width.
    pub fn is_full(&self) -> bool {
        self.normalized.len() == FULL_LEN
    }

    /// The normalized form: uppercase hex, no dashes, no `0x` prefix, always
    /// at the full 32-hex-digit width — there is exactly one canonical
    /// string per logical UUID regardless of the input form it was parsed
    /// from.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// The 16-bit short form, e.g. `"180F"`. Errors if this UUID does not lie
    /// within the Bluetooth base UUID range (i.e. it is a vendor-specific
    /// 128-bit UUID with no 16-bit equivalent).
    pub fn short_form(&self) -> Result<String> {
        if self.is_short() {
            Ok(self.normalized.clone())
        } else {
            let full = self.full_form();
            if full[8..] == *BASE_UUID_SUFFIX && &full[..4] == "0000" {
                Ok(full[4..8].to_string())
            } else {
                Err(Error::with_message(
                    ErrorKind::InvalidUuid(full),
                    "not within the Bluetooth base UUID range; has no 16-bit short form",
                ))
            }
        }
    }

    /// The 128-bit full form, expanding against the Bluetooth base UUID if
    /// necessary.
    pub fn full_form(&self) -> String {
        if self.is_full() {
            self.normalized.clone()
        } else {
            format!("0000{}{}", self.normalized, BASE_UUID_SUFFIX)
        }
    }

    /// The 128-bit full form in standard dashed notation.
    pub fn dashed_form(&self) -> String {
        let full = self.full_form();
        format!(
            "{}-{}-{}-{}-{}",
            &full[0..8],
            &full[8..12],
            &full[12..16],
            &full[16..20],
            &full[20..32]
        )
    }

    /// The UUID as a 128-bit integer (always the full-form expansion).
    pub fn int_value(&self) -> u128 {
        u128::from_str_radix(&self.full_form(), 16).expect("normalized hex is always parseable")
    }

    /// True if `other` refers to the same UUID, comparing full-form
    /// expansions so short and long forms of the same value match.
    pub fn matches(&self, other: &Uuid) -> bool {
        self.full_form() == other.full_form()
    }

    /// False for the handful of UUIDs the Bluetooth SIG reserves and that
    /// must never be accepted as a custom characteristic or service UUID:
    /// the bare base UUID, the all-zero UUID, and the `1234` placeholder
    /// used internally by some tooling.
    pub fn is_valid_for_custom_registration(&self) -> bool {
        let full = self.full_form();
        full != INVALID_BASE_UUID_NORMALIZED
            && full != INVALID_NULL_UUID
            && full != INVALID_PLACEHOLDER_UUID
    }
}

fn normalize_str(input: &str) -> Result<String> {
    let mut cleaned: String = input
        .chars()
        .filter(|c| *c != '-' && *c != ' ')
        .collect::<String>()
        .to_uppercase();
    if let Some(rest) = cleaned.strip_prefix("0X") {
        cleaned = rest.to_string();
    }
    if !cleaned.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::with_message(
            ErrorKind::InvalidUuid(input.to_string()),
            "not a hexadecimal string",
        ));
    }
    match cleaned.len() {
        SHORT_LEN => Ok(format!("0000{cleaned}{BASE_UUID_SUFFIX}")),
        FULL_LEN => Ok(cleaned),
        other => Err(Error::with_message(
            ErrorKind::InvalidUuid(input.to_string()),
            format!("invalid UUID length: {other} (expected 4 or 32 hex digits)"),
        )),
    }
}

fn is_valid_normalized(normalized: &str) -> bool {
    matches!(normalized.len(), SHORT_LEN | FULL_LEN)
        && normalized.chars().all(|c| c.is_ascii_hexdigit())
}

impl FromStr for Uuid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl TryFrom<String> for Uuid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

#[cfg(feature = "serde")]
impl From<Uuid> for String {
    fn from(value: Uuid) -> Self {
        value.dashed_form()
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dashed_form())
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uuid({})", self.normalized)
    }
}

impl Ord for Uuid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl PartialOrd for Uuid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_full_forms_match() {
        let short = Uuid::parse("180F").unwrap();
        let full = Uuid::parse("0000180F-0000-1000-8000-00805F9B34FB").unwrap();
        assert!(short.matches(&full));
        assert_eq!(short, full);
    }

    #[test]
    fn accepts_0x_prefix_and_lowercase() {
        let a = Uuid::parse("0x180f").unwrap();
        assert_eq!(a.short_form().unwrap(), "180F");
    }

    #[test]
    fn short_and_full_forms_share_one_normalized_string() {
        let short = Uuid::parse("180F").unwrap();
        let full = Uuid::parse("0000180F00001000800000805F9B34FB").unwrap();
        assert_eq!(short.normalized(), full.normalized());
    }

    #[test]
    fn rejects_bad_length() {
        assert!(Uuid::parse("18F").is_err());
        assert!(Uuid::parse("ZZZZ").is_err());
    }

    #[test]
    fn full_form_expands_short() {
        let u = Uuid::parse("2A19").unwrap();
        assert_eq!(u.full_form(), "00002A1900001000800000805F9B34FB");
    }

    #[test]
    fn short_form_rejects_vendor_uuid() {
        let vendor = Uuid::parse("12345678-1234-5678-1234-56789ABCDEF0").unwrap();
        assert!(vendor.short_form().is_err());
    }

    #[test]
    fn reserved_uuids_rejected_for_custom_registration() {
        let base = Uuid::parse("00000000-0000-1000-8000-00805F9B34FB").unwrap();
        assert!(!base.is_valid_for_custom_registration());
        let ordinary = Uuid::parse("180F").unwrap();
        assert!(ordinary.is_valid_for_custom_registration());
    }

    #[test]
    fn ordering_matches_normalized_string_order() {
        let a = Uuid::parse("180F").unwrap();
        let b = Uuid::parse("180A").unwrap();
        assert!(b < a);
    }

    #[test]
    fn from_u16_round_trips() {
        let u = Uuid::from_u16(0x180F);
        assert_eq!(u.short_form().unwrap(), "180F");
    }
}
