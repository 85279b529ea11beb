//! Query & translator façade (C8): the single read-mostly entry point over
//! the SIG data registry (C2) and characteristic/service class registry
//! (C7), plus batch parsing (C9) and transient discovered-service state.
//!
//! Grounded on `original_source/core/translator.py`'s `BluetoothSIGTranslator`
//! — construction is idempotent (a process-wide singleton via [`global_translator`]),
//! and `process_services`/`clear_services` manage the only mutable state.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::batch;
use crate::characteristic::class_registry::ClassRegistry;
use crate::error::{Error, ErrorKind, Result};
use crate::registry::SigRegistry;
use crate::types::{
    CharacteristicContext, CharacteristicInfo, CharacteristicRegistration, ParsedValue, ServiceInfo,
    ServiceRegistration, ValidationResult, ValueType,
};

/// Raw discovery payload handed to [`Translator::process_services`]: for each
/// service UUID, the characteristics the transport actually saw on the
/// device, keyed by characteristic UUID.
pub type DiscoveredServiceMap = HashMap<String, HashMap<String, CharacteristicInfo>>;

pub struct Translator {
    classes: ClassRegistry,
    sig: SigRegistry,
    discovered: RwLock<HashMap<String, ServiceInfo>>,
}

impl Translator {
    pub fn new() -> Result<Self> {
        Ok(Self { classes: ClassRegistry::with_builtins(), sig: SigRegistry::new()?, discovered: RwLock::new(HashMap::new()) })
    }

    pub fn supports(&self, uuid: &str) -> bool {
        self.classes.supports(uuid)
    }

    pub fn get_value_type(&self, uuid: &str) -> Option<ValueType> {
        self.classes.get_by_uuid(uuid).map(|e| e.info.value_type)
    }

    pub fn get_characteristic_info_by_uuid(&self, uuid: &str) -> Option<CharacteristicInfo> {
        self.sig.get_characteristic_info(uuid)
    }

    pub fn get_characteristic_info_by_name(&self, name: &str) -> Option<CharacteristicInfo> {
        self.sig.get_characteristic_info(name)
    }

    pub fn get_service_info_by_uuid(&self, uuid: &str) -> Option<ServiceInfo> {
        self.sig.get_service_info(uuid)
    }

    pub fn get_service_info_by_name(&self, name: &str) -> Option<ServiceInfo> {
        self.sig.get_service_info(name)
    }

    /// Union lookup: tries characteristic info first, then service info.
    pub fn get_sig_info_by_uuid(&self, uuid: &str) -> Option<CharacteristicInfo> {
        self.get_characteristic_info_by_uuid(uuid).or_else(|| {
            self.get_service_info_by_uuid(uuid).map(|s| CharacteristicInfo {
                uuid: s.uuid,
                name: s.name,
                id: s.id,
                summary: s.summary,
                value_type: ValueType::Unknown,
                unit: String::new(),
            })
        })
    }

    pub fn get_sig_info_by_name(&self, name: &str) -> Option<CharacteristicInfo> {
        self.get_characteristic_info_by_name(name).or_else(|| {
            self.get_service_info_by_name(name).map(|s| CharacteristicInfo {
                uuid: s.uuid,
                name: s.name,
                id: s.id,
                summary: s.summary,
                value_type: ValueType::Unknown,
                unit: String::new(),
            })
        })
    }

    /// `name → uuid-string` for every built-in characteristic class.
    pub fn list_supported_characteristics(&self) -> HashMap<String, String> {
        self.classes.list_supported().map(|(name, uuid)| (name.to_string(), uuid.to_string())).collect()
    }

    /// Services carry no built-in codec class of their own (they group
    /// characteristics, not bytes), so this surfaces whatever the SIG
    /// registry and `process_services` discovery together know about.
    pub fn list_supported_services(&self) -> HashMap<String, String> {
        self.discovered.read().unwrap().values().map(|s| (s.name.clone(), s.uuid.to_string())).collect()
    }

    /// UUID strings of the characteristics known for `service_uuid`, from
    /// discovered-service state if present.
    pub fn get_service_characteristics(&self, service_uuid: &str) -> Vec<String> {
        self.discovered
            .read()
            .unwrap()
            .get(&service_uuid.to_uppercase())
            .map(|s| s.characteristics.iter().map(|c| c.uuid.to_string()).collect())
            .unwrap_or_default()
    }

    /// Parses a single characteristic's raw bytes, dispatching by UUID.
    pub fn parse_characteristic(&self, uuid: &str, bytes: &[u8], ctx: Option<&CharacteristicContext>) -> Result<ParsedValue> {
        let entry = self
            .classes
            .get_by_uuid(uuid)
            .ok_or_else(|| Error::with_message(ErrorKind::Unsupported(uuid.to_string()), "no codec registered for this UUID"))?;
        entry.parse(bytes, ctx).map_err(|e| Error::with_message(ErrorKind::Parse(entry.info.name.to_string(), uuid.to_string()), e.to_string()))
    }

    /// Batch-parses `char_data` in dependency order (C9). `char_data` is an
    /// ordered list so that UUIDs with no declared dependency between them
    /// are resolved in the caller's input order.
    pub fn parse_characteristics(
        &self,
        char_data: &[(String, Vec<u8>)],
        ctx: Option<&CharacteristicContext>,
    ) -> Result<HashMap<String, ParsedValue>> {
        batch::parse_characteristics_batch(&self.classes, char_data, ctx)
    }

    /// Encodes a typed value back to raw bytes, dispatching by UUID.
    pub fn encode_characteristic(&self, uuid: &str, value: &ParsedValue) -> Result<Vec<u8>> {
        let entry = self
            .classes
            .get_by_uuid(uuid)
            .ok_or_else(|| Error::with_message(ErrorKind::Unsupported(uuid.to_string()), "no codec registered for this UUID"))?;
        entry.encode(value).map_err(|e| Error::with_message(ErrorKind::Encode(entry.info.name.to_string(), uuid.to_string()), e.to_string()))
    }

    /// Round-trips `value` through encode then parse, producing the
    /// canonical decoded form the way the source's `create_value`
    /// constructs a typed instance from caller-supplied fields.
    pub fn create_value(&self, uuid: &str, value: &ParsedValue) -> Result<ParsedValue> {
        let bytes = self.encode_characteristic(uuid, value)?;
        self.parse_characteristic(uuid, &bytes, None)
    }

    pub fn validate_characteristic_data(&self, uuid: &str, bytes: &[u8]) -> ValidationResult {
        match self.parse_characteristic(uuid, bytes, None) {
            Ok(_) => ValidationResult { is_valid: true, expected_length: None, actual_length: Some(bytes.len()), error_message: String::new() },
            Err(e) => ValidationResult {
                is_valid: false,
                expected_length: None,
                actual_length: Some(bytes.len()),
                error_message: e.to_string(),
            },
        }
    }

    pub fn register_custom_characteristic_class(
        &self,
        reg: CharacteristicRegistration,
        override_existing: bool,
    ) -> Result<()> {
        self.sig.register_characteristic(reg, override_existing)
    }

    pub fn register_custom_service_class(&self, reg: ServiceRegistration, override_existing: bool) -> Result<()> {
        self.sig.register_service(reg, override_existing)
    }

    /// Records discovery results from a live device: for each service UUID,
    /// the characteristics the transport actually found.
    pub fn process_services(&self, discovery: DiscoveredServiceMap) {
        let mut map = self.discovered.write().unwrap();
        for (service_uuid, characteristics) in discovery {
            let info = self.sig.get_service_info(&service_uuid);
            let entry = map.entry(service_uuid.to_uppercase()).or_insert_with(|| ServiceInfo {
                uuid: crate::uuid::Uuid::parse(&service_uuid).unwrap_or_else(|_| crate::uuid::Uuid::from_u16(0)),
                name: info.as_ref().map(|i| i.name.clone()).unwrap_or_else(|| service_uuid.clone()),
                id: info.as_ref().and_then(|i| i.id.clone()),
                summary: info.as_ref().map(|i| i.summary.clone()).unwrap_or_default(),
                characteristics: Vec::new(),
            });
            entry.characteristics = characteristics.into_values().collect();
        }
    }

    pub fn get_service_by_uuid(&self, uuid: &str) -> Option<ServiceInfo> {
        self.discovered.read().unwrap().get(&uuid.to_uppercase()).cloned()
    }

    pub fn discovered_services(&self) -> HashMap<String, ServiceInfo> {
        self.discovered.read().unwrap().clone()
    }

    pub fn clear_services(&self) {
        self.discovered.write().unwrap().clear();
    }
}

static GLOBAL: OnceLock<Translator> = OnceLock::new();

/// The process-wide translator singleton, built on first access.
pub fn global_translator() -> &'static Translator {
    GLOBAL.get_or_init(|| Translator::new().expect("embedded SIG data set failed to load"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supports_and_parses_a_builtin_uuid() {
        let t = Translator::new().unwrap();
        assert!(t.supports("2A19"));
        let value = t.parse_characteristic("2A19", &[77], None).unwrap();
        assert!(matches!(value, ParsedValue::Int(77)));
    }

    #[test]
    fn validate_reports_failure_message() {
        let t = Translator::new().unwrap();
        let result = t.validate_characteristic_data("2A19", &[]);
        assert!(!result.is_valid);
        assert!(!result.error_message.is_empty());
    }

    #[test]
    fn process_services_then_lookup_round_trips() {
        let t = Translator::new().unwrap();
        let mut discovery = DiscoveredServiceMap::new();
        let mut chars = HashMap::new();
        chars.insert(
            "2A19".to_string(),
            CharacteristicInfo { uuid: crate::uuid::Uuid::parse("2A19").unwrap(), name: "Battery Level".into(), id: None, summary: String::new(), value_type: ValueType::Int, unit: "%".into() },
        );
        discovery.insert("180F".to_string(), chars);
        t.process_services(discovery);
        assert_eq!(t.get_service_characteristics("180F"), vec![crate::uuid::Uuid::parse("2A19").unwrap().to_string()]);
        t.clear_services();
        assert!(t.get_service_by_uuid("180F").is_none());
    }
}
