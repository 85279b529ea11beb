//! Integration coverage for the library's cross-module, end-to-end behaviors —
//! the concrete scenarios and boundary cases that only show up once
//! `Translator`, the batch resolver, and the advertising parser are driven
//! together through the public API, rather than unit-tested per module.

use bluesig::types::ParsedValue;
use bluesig::{parse_advertising_data, Translator};

#[test]
fn battery_level_scenario() {
    let t = Translator::new().unwrap();
    let value = t.parse_characteristic("2A19", &[0x64], None).unwrap();
    assert_eq!(value, ParsedValue::Int(100));

    let bytes = t.encode_characteristic("2A19", &ParsedValue::Int(100)).unwrap();
    assert_eq!(bytes, vec![0x64]);

    let err = t.parse_characteristic("2A19", &[0x65], None).unwrap_err();
    assert!(err.to_string().contains("parse"));
}

#[test]
fn temperature_scaled_sint16_scenario() {
    let t = Translator::new().unwrap();
    let ParsedValue::Float(celsius) = t.parse_characteristic("2A6E", &[0xE7, 0x08], None).unwrap() else {
        panic!("expected a float")
    };
    assert!((celsius - 22.79).abs() < 1e-6);

    let bytes = t.encode_characteristic("2A6E", &ParsedValue::Float(22.79)).unwrap();
    assert_eq!(bytes, vec![0xE7, 0x08]);
}

#[test]
fn humidity_scaled_uint16_scenario() {
    let t = Translator::new().unwrap();
    let ParsedValue::Float(percent) = t.parse_characteristic("2A6F", &[0x32, 0x13], None).unwrap() else {
        panic!("expected a float")
    };
    assert!((percent - 49.14).abs() < 1e-6);

    let bytes = t.encode_characteristic("2A6F", &ParsedValue::Float(49.14)).unwrap();
    assert_eq!(bytes, vec![0x32, 0x13]);

    let err = t.encode_characteristic("2A6F", &ParsedValue::Float(120.0)).unwrap_err();
    assert!(err.to_string().contains("encode"));
}

#[test]
fn voc_concentration_sentinels_and_ordinary_value() {
    let t = Translator::new().unwrap();

    let ParsedValue::Special(not_known) = t.parse_characteristic("2BE7", &[0xFF, 0xFF], None).unwrap() else {
        panic!("expected a special value")
    };
    assert_eq!(not_known.meaning, "value not known");

    let ParsedValue::Special(ceiling) = t.parse_characteristic("2BE7", &[0xFE, 0xFF], None).unwrap() else {
        panic!("expected a special value")
    };
    assert_eq!(ceiling.meaning, "65534 or greater");

    let value = t.parse_characteristic("2BE7", &[0x10, 0x27], None).unwrap();
    assert_eq!(value, ParsedValue::Int(10000));
}

#[test]
fn dependency_batch_scenario() {
    let t = Translator::new().unwrap();
    let char_data = vec![
        ("2A65".to_string(), vec![0x01, 0x01, 0x00, 0x00]), // Cycling Power Feature
        ("2A63".to_string(), vec![0x00, 0x00, 0xC8, 0x00]), // Cycling Power Measurement
    ];

    let results = t.parse_characteristics(&char_data, None).unwrap();
    assert!(results.contains_key("2A65"));
    assert!(results.contains_key("2A63"));
}

#[test]
fn legacy_advertising_scenario() {
    let bytes = vec![0x02, 0x01, 0x06, 0x05, 0x09, b'T', b'E', b'S', b'T'];
    let record = parse_advertising_data(&bytes);
    assert_eq!(record.flags, Some(0x06));
    assert_eq!(record.local_name.as_deref(), Some("TEST"));
    assert!(record.service_uuids.is_empty());
    assert!(record.manufacturer_data.is_empty());
}

#[test]
fn empty_buffer_parse_reports_insufficient_data() {
    let t = Translator::new().unwrap();
    let err = t.parse_characteristic("2A19", &[], None).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("insufficient data"), "unexpected message: {message}");
}

#[test]
fn unsupported_uuid_is_distinct_from_parse_failure() {
    let t = Translator::new().unwrap();
    let err = t.parse_characteristic("FFFF", &[0x00], None).unwrap_err();
    assert!(err.to_string().contains("no codec registered"));
}

#[test]
fn uuid_round_trip_through_characteristic_info_lookup() {
    let t = Translator::new().unwrap();
    let info = t.get_characteristic_info_by_uuid("2A19").expect("battery level should be known to the SIG registry");
    assert_eq!(info.uuid.to_string().to_uppercase(), "00002A19-0000-1000-8000-00805F9B34FB");
}
