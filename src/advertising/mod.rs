//! Advertising parser (C10): legacy + extended PDU decoding with
//! AD-structure demultiplexing, grounded on `original_source/advertising/advertising_parser.py`.

use std::collections::HashMap;

use log::warn;

use crate::codec::primitives::{read_i8, read_u16, read_u24, read_u32};
use crate::uuid::Uuid;

const PDU_TYPE_MASK: u8 = 0x0F;
const ADV_EXT_IND: u8 = 0x07;
const ADV_AUX_IND: u8 = 0x08;

const AD_FLAGS: u8 = 0x01;
const AD_INCOMPLETE_16: u8 = 0x02;
const AD_COMPLETE_16: u8 = 0x03;
const AD_INCOMPLETE_32: u8 = 0x04;
const AD_COMPLETE_32: u8 = 0x05;
const AD_INCOMPLETE_128: u8 = 0x06;
const AD_COMPLETE_128: u8 = 0x07;
const AD_SHORT_LOCAL_NAME: u8 = 0x08;
const AD_COMPLETE_LOCAL_NAME: u8 = 0x09;
const AD_TX_POWER_LEVEL: u8 = 0x0A;
const AD_CLASS_OF_DEVICE: u8 = 0x0D;
const AD_SM_TK: u8 = 0x10;
const AD_SM_OOB: u8 = 0x11;
const AD_SLAVE_CONN_INTERVAL_RANGE: u8 = 0x12;
const AD_SERVICE_DATA_16: u8 = 0x16;
const AD_PUBLIC_TARGET_ADDRESS: u8 = 0x17;
const AD_RANDOM_TARGET_ADDRESS: u8 = 0x18;
const AD_APPEARANCE: u8 = 0x19;
const AD_ADV_INTERVAL: u8 = 0x1A;
const AD_LE_BT_DEVICE_ADDRESS: u8 = 0x1B;
const AD_LE_ROLE: u8 = 0x1C;
const AD_SP_HASH: u8 = 0x1D;
const AD_SP_RANDOMIZER: u8 = 0x1E;
const AD_URI: u8 = 0x24;
const AD_INDOOR_POSITIONING: u8 = 0x25;
const AD_TRANSPORT_DISCOVERY: u8 = 0x26;
const AD_LE_SUPPORTED_FEATURES: u8 = 0x27;
const AD_CHANNEL_MAP_UPDATE: u8 = 0x28;
const AD_PB_ADV: u8 = 0x29;
const AD_MESH_MESSAGE: u8 = 0x2A;
const AD_MESH_BEACON: u8 = 0x2B;
const AD_BIGINFO: u8 = 0x2C;
const AD_BROADCAST_CODE: u8 = 0x2D;
const AD_RESOLVABLE_SET_IDENTIFIER: u8 = 0x2E;
const AD_ADV_INTERVAL_LONG: u8 = 0x2F;
const AD_BROADCAST_NAME: u8 = 0x30;
const AD_ENCRYPTED_ADVERTISING_DATA: u8 = 0x31;
const AD_PERIODIC_ADV_RESPONSE_TIMING: u8 = 0x32;
const AD_ELECTRONIC_SHELF_LABEL: u8 = 0x34;
const AD_3D_INFORMATION: u8 = 0x3D;
const AD_MANUFACTURER_DATA: u8 = 0xFF;
const AD_SECURE_CONNECTIONS_CONFIRM: u8 = 0x22;
const AD_SECURE_CONNECTIONS_RANDOM: u8 = 0x23;

/// Fully demultiplexed advertising payload. Fields not present in the
/// advertisement stay at their default (`None`/empty).
#[derive(Clone, Debug, Default)]
pub struct AdvertisingRecord {
    pub flags: Option<u8>,
    pub service_uuids: Vec<Uuid>,
    pub local_name: Option<String>,
    pub tx_power: Option<i8>,
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
    pub appearance: Option<u16>,
    pub service_data: HashMap<String, Vec<u8>>,
    pub uri: Option<String>,
    pub adv_interval: Option<u32>,
    pub le_role: Option<u8>,
    pub class_of_device: Option<u32>,
    pub target_addresses: Vec<String>,
    pub device_address: Option<String>,
    /// Every AD structure this parser has no dedicated field for, keyed by
    /// its `ad_type` code, carried through as raw bytes.
    pub raw_fields: HashMap<u8, Vec<u8>>,
    /// `true` once an extended-PDU AuxPtr field was seen — the follow-up
    /// packet it references is transport-dependent and out of scope.
    pub has_aux_ptr: bool,
}

fn mac_from_reversed(bytes: &[u8]) -> String {
    bytes.iter().rev().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(":")
}

/// Decodes a local-name-like AD field as UTF-8; a device sending invalid
/// UTF-8 falls back to a hex string rather than raising an error.
fn decode_text_field(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(s) => s.to_string(),
        Err(_) => data.iter().map(|b| format!("{b:02X}")).collect(),
    }
}

fn push_uuid16(record: &mut AdvertisingRecord, data: &[u8]) {
    for chunk in data.chunks_exact(2) {
        if let Ok((v, _)) = read_u16(chunk, 0) {
            record.service_uuids.push(Uuid::from_u16(v));
        }
    }
}

fn push_uuid32(record: &mut AdvertisingRecord, data: &[u8]) {
    for chunk in data.chunks_exact(4) {
        if let Ok((v, _)) = read_u32(chunk, 0) {
            if let Ok(uuid) = Uuid::from_u128(v as u128) {
                record.service_uuids.push(uuid);
            }
        }
    }
}

fn push_uuid128(record: &mut AdvertisingRecord, data: &[u8]) {
    for chunk in data.chunks_exact(16) {
        let hex: String = chunk.iter().rev().map(|b| format!("{b:02X}")).collect();
        if let Ok(uuid) = Uuid::parse(&hex) {
            record.service_uuids.push(uuid);
        }
    }
}

fn dispatch_ad_structure(record: &mut AdvertisingRecord, ad_type: u8, data: &[u8]) {
    match ad_type {
        AD_FLAGS => record.flags = data.first().copied(),
        AD_INCOMPLETE_16 | AD_COMPLETE_16 => push_uuid16(record, data),
        AD_INCOMPLETE_32 | AD_COMPLETE_32 => push_uuid32(record, data),
        AD_INCOMPLETE_128 | AD_COMPLETE_128 => push_uuid128(record, data),
        AD_SHORT_LOCAL_NAME | AD_COMPLETE_LOCAL_NAME => {
            record.local_name = Some(decode_text_field(data));
        }
        AD_TX_POWER_LEVEL => record.tx_power = read_i8(data, 0).ok().map(|(v, _)| v),
        AD_MANUFACTURER_DATA => {
            if let Ok((company_id, _)) = read_u16(data, 0) {
                record.manufacturer_data.insert(company_id, data[2.min(data.len())..].to_vec());
            }
        }
        AD_APPEARANCE => record.appearance = read_u16(data, 0).ok().map(|(v, _)| v),
        AD_SERVICE_DATA_16 => {
            if let Ok((uuid, _)) = read_u16(data, 0) {
                record.service_data.insert(format!("{uuid:04X}"), data[2.min(data.len())..].to_vec());
            }
        }
        0x20 => {
            // SERVICE DATA - 32-bit UUID
            if let Ok((uuid, _)) = read_u32(data, 0) {
                record.service_data.insert(format!("{uuid:08X}"), data[4.min(data.len())..].to_vec());
            }
        }
        AD_URI => record.uri = Some(decode_text_field(data)),
        AD_ADV_INTERVAL => record.adv_interval = read_u16(data, 0).ok().map(|(v, _)| v as u32),
        AD_ADV_INTERVAL_LONG => record.adv_interval = read_u24(data, 0).ok().map(|(v, _)| v),
        AD_LE_BT_DEVICE_ADDRESS => {
            if data.len() >= 6 {
                record.device_address = Some(mac_from_reversed(&data[..6]));
            }
        }
        AD_LE_ROLE => record.le_role = data.first().copied(),
        AD_CLASS_OF_DEVICE => record.class_of_device = read_u24(data, 0).ok().map(|(v, _)| v),
        AD_PUBLIC_TARGET_ADDRESS | AD_RANDOM_TARGET_ADDRESS => {
            for chunk in data.chunks_exact(6) {
                record.target_addresses.push(mac_from_reversed(chunk));
            }
        }
        AD_INDOOR_POSITIONING
        | AD_TRANSPORT_DISCOVERY
        | AD_LE_SUPPORTED_FEATURES
        | AD_ENCRYPTED_ADVERTISING_DATA
        | AD_PERIODIC_ADV_RESPONSE_TIMING
        | AD_ELECTRONIC_SHELF_LABEL
        | AD_3D_INFORMATION
        | AD_SM_TK
        | AD_SM_OOB
        | AD_SP_HASH
        | AD_SP_RANDOMIZER
        | AD_SLAVE_CONN_INTERVAL_RANGE
        | AD_SECURE_CONNECTIONS_CONFIRM
        | AD_SECURE_CONNECTIONS_RANDOM
        | AD_CHANNEL_MAP_UPDATE
        | AD_PB_ADV
        | AD_MESH_MESSAGE
        | AD_MESH_BEACON
        | AD_BIGINFO
        | AD_BROADCAST_CODE
        | AD_RESOLVABLE_SET_IDENTIFIER => {
            record.raw_fields.insert(ad_type, data.to_vec());
        }
        AD_BROADCAST_NAME => record.local_name = Some(decode_text_field(data)),
        _ => {
            warn!("unrecognized AD type 0x{ad_type:02X}, skipping");
        }
    }
}

/// Iterates AD structures over `bytes`, tolerant of a malformed trailing
/// structure (stops rather than erroring).
fn parse_ad_structures(bytes: &[u8], record: &mut AdvertisingRecord) {
    let mut i = 0usize;
    while i < bytes.len() {
        let len = bytes[i] as usize;
        if len == 0 || i + len + 1 > bytes.len() {
            break;
        }
        let ad_type = bytes[i + 1];
        let data = &bytes[i + 2..i + 1 + len];
        dispatch_ad_structure(record, ad_type, data);
        i += len + 1;
    }
}

/// Entry point: dispatches on the first byte to the legacy or extended PDU
/// parser. Every short-buffer condition yields a partial record rather than
/// an error.
pub fn parse_advertising_data(bytes: &[u8]) -> AdvertisingRecord {
    let mut record = AdvertisingRecord::default();
    if bytes.is_empty() {
        return record;
    }

    let pdu_type = bytes[0] & PDU_TYPE_MASK;
    if pdu_type == ADV_EXT_IND || pdu_type == ADV_AUX_IND {
        parse_extended(bytes, &mut record);
    } else {
        parse_ad_structures(bytes, &mut record);
    }
    record
}

/// Extended advertising PDU: header byte, length byte, then an extended
/// header whose presence bitfield gates a fixed sequence of optional
/// fields, followed by the AD-structure payload.
fn parse_extended(bytes: &[u8], record: &mut AdvertisingRecord) {
    if bytes.len() < 2 {
        return;
    }
    let declared_len = bytes[1] as usize;
    let pdu_end = (2 + declared_len).min(bytes.len());
    if bytes.len() < 3 {
        return;
    }

    let ext_header_len = (bytes[2] & 0x3F) as usize;
    let mut offset = 3usize;
    if ext_header_len == 0 {
        parse_ad_structures(&bytes[offset.min(pdu_end)..pdu_end], record);
        return;
    }
    if offset >= bytes.len() {
        return;
    }

    let presence = bytes[offset];
    offset += 1;

    const ADVA_PRESENT: u8 = 1 << 0;
    const TARGETA_PRESENT: u8 = 1 << 1;
    const CTE_INFO_PRESENT: u8 = 1 << 2;
    const ADI_PRESENT: u8 = 1 << 3;
    const AUX_PTR_PRESENT: u8 = 1 << 4;
    const SYNC_INFO_PRESENT: u8 = 1 << 5;
    const TX_POWER_PRESENT: u8 = 1 << 6;

    let mut take = |n: usize, bytes: &[u8], offset: &mut usize| -> Option<Vec<u8>> {
        if *offset + n > bytes.len() {
            return None;
        }
        let slice = bytes[*offset..*offset + n].to_vec();
        *offset += n;
        Some(slice)
    };

    if presence & ADVA_PRESENT != 0 {
        if let Some(addr) = take(6, bytes, &mut offset) {
            record.device_address = Some(mac_from_reversed(&addr));
        }
    }
    if presence & TARGETA_PRESENT != 0 {
        if let Some(addr) = take(6, bytes, &mut offset) {
            record.target_addresses.push(mac_from_reversed(&addr));
        }
    }
    if presence & CTE_INFO_PRESENT != 0 {
        take(1, bytes, &mut offset);
    }
    if presence & ADI_PRESENT != 0 {
        take(2, bytes, &mut offset);
    }
    if presence & AUX_PTR_PRESENT != 0 {
        take(3, bytes, &mut offset);
        record.has_aux_ptr = true;
    }
    if presence & SYNC_INFO_PRESENT != 0 {
        take(18, bytes, &mut offset);
    }
    if presence & TX_POWER_PRESENT != 0 {
        if let Some(tx) = take(1, bytes, &mut offset) {
            record.tx_power = read_i8(&tx, 0).ok().map(|(v, _)| v);
        }
    }

    let header_end = (3 + ext_header_len).min(bytes.len());
    let payload_start = offset.max(header_end).min(pdu_end);
    if payload_start < pdu_end {
        parse_ad_structures(&bytes[payload_start..pdu_end], record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_flags_and_local_name() {
        let mut bytes = vec![0x02, AD_FLAGS, 0x06];
        bytes.extend_from_slice(&[0x04, AD_COMPLETE_LOCAL_NAME, b'a', b'b', b'c']);
        let record = parse_advertising_data(&bytes);
        assert_eq!(record.flags, Some(0x06));
        assert_eq!(record.local_name.as_deref(), Some("abc"));
    }

    #[test]
    fn legacy_tolerates_malformed_trailing_structure() {
        let bytes = vec![0x02, AD_FLAGS, 0x06, 0x05, AD_TX_POWER_LEVEL]; // declares 5, only 1 byte follows
        let record = parse_advertising_data(&bytes);
        assert_eq!(record.flags, Some(0x06));
        assert!(record.tx_power.is_none());
    }

    #[test]
    fn manufacturer_data_keys_by_company_id() {
        let mut bytes = vec![0x05, AD_MANUFACTURER_DATA];
        bytes.extend_from_slice(&0x004Cu16.to_le_bytes());
        bytes.extend_from_slice(&[0x01, 0x02]);
        let record = parse_advertising_data(&bytes);
        assert_eq!(record.manufacturer_data.get(&0x004C), Some(&vec![0x01, 0x02]));
    }

    #[test]
    fn unknown_ad_type_is_skipped_not_fatal() {
        let bytes = vec![0x02, 0x7E, 0xAA, 0x02, AD_FLAGS, 0x01];
        let record = parse_advertising_data(&bytes);
        assert_eq!(record.flags, Some(0x01));
    }

    #[test]
    fn worked_example_legacy_advertisement() {
        let bytes = vec![0x02, 0x01, 0x06, 0x05, 0x09, b'T', b'E', b'S', b'T'];
        let record = parse_advertising_data(&bytes);
        assert_eq!(record.flags, Some(0x06));
        assert_eq!(record.local_name.as_deref(), Some("TEST"));
        assert!(record.service_uuids.is_empty());
        assert!(record.manufacturer_data.is_empty());
    }

    #[test]
    fn invalid_utf8_local_name_falls_back_to_hex() {
        let mut bytes = vec![0x04, AD_COMPLETE_LOCAL_NAME];
        bytes.extend_from_slice(&[0xFF, 0xFE, 0x80]);
        let record = parse_advertising_data(&bytes);
        assert_eq!(record.local_name.as_deref(), Some("FFFE80"));
    }

    #[test]
    fn parse_is_idempotent() {
        let bytes = vec![0x02, 0x01, 0x06, 0x05, 0x09, b'T', b'E', b'S', b'T'];
        let first = parse_advertising_data(&bytes);
        let second = parse_advertising_data(&bytes);
        assert_eq!(first.flags, second.flags);
        assert_eq!(first.local_name, second.local_name);
        assert_eq!(first.service_uuids, second.service_uuids);
    }
}
