//! Canonical SIG data registry (C2): characteristics, services, descriptors,
//! units, appearance values, company identifiers and AD types, loaded from
//! YAML and mutable at runtime under a conflict policy.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use log::{debug, warn};

use crate::data::SigDataSet;
use crate::error::{Error, ErrorKind, Result};
use crate::types::{CharacteristicInfo, CharacteristicRegistration, ServiceInfo, ServiceRegistration, ValueType};
use crate::uuid::Uuid;

/// Whether a registry entry came from the embedded/loaded SIG tables or was
/// registered at runtime by a consumer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Origin {
    Sig,
    Runtime,
}

#[derive(Clone, Debug)]
struct RegistryEntry {
    uuid: Uuid,
    name: String,
    id: Option<String>,
    summary: String,
    unit: Option<String>,
    value_type: Option<ValueType>,
    origin: Origin,
}

impl RegistryEntry {
    fn to_characteristic_info(&self) -> CharacteristicInfo {
        CharacteristicInfo {
            uuid: self.uuid.clone(),
            name: self.name.clone(),
            id: self.id.clone(),
            summary: self.summary.clone(),
            value_type: self.value_type.unwrap_or_default(),
            unit: self.unit.clone().unwrap_or_default(),
        }
    }
}

#[derive(Default)]
struct Table {
    canonical: HashMap<String, RegistryEntry>,
    aliases: HashMap<String, String>,
    override_shadow: HashMap<String, RegistryEntry>,
}

impl Table {
    fn insert_sig(&mut self, entry: RegistryEntry) {
        let key = entry.uuid.normalized().to_string();
        for alias in alias_candidates(&entry) {
            self.aliases.insert(alias, key.clone());
        }
        self.canonical.insert(key, entry);
    }

    fn register(&mut self, entry: RegistryEntry, override_existing: bool) -> Result<()> {
        let key = entry.uuid.normalized().to_string();
        if let Some(existing) = self.canonical.get(&key) {
            if !override_existing {
                return Err(Error::with_message(
                    ErrorKind::RegistrationConflict(entry.uuid.dashed_form(), existing.name.clone()),
                    "existing entry present; pass override=true to replace it",
                ));
            }
            if existing.origin == Origin::Sig {
                self.override_shadow.entry(key.clone()).or_insert_with(|| existing.clone());
            }
        }
        for alias in alias_candidates(&entry) {
            self.aliases.insert(alias, key.clone());
        }
        self.canonical.insert(key, entry);
        Ok(())
    }

    fn clear_custom(&mut self) {
        let runtime_keys: Vec<String> = self
            .canonical
            .iter()
            .filter(|(_, e)| e.origin == Origin::Runtime)
            .map(|(k, _)| k.clone())
            .collect();
        for key in runtime_keys {
            self.canonical.remove(&key);
        }
        for (key, original) in self.override_shadow.drain() {
            self.canonical.insert(key, original);
        }
        self.aliases.retain(|_, uuid_key| self.canonical.contains_key(uuid_key));
        for entry in self.canonical.values() {
            for alias in alias_candidates(entry) {
                self.aliases.insert(alias, entry.uuid.normalized().to_string());
            }
        }
    }

    fn lookup(&self, identifier: &str) -> Option<&RegistryEntry> {
        if let Ok(uuid) = Uuid::parse(identifier) {
            if let Some(entry) = self.canonical.get(uuid.normalized()) {
                return Some(entry);
            }
        }
        let lowered = identifier.to_lowercase();
        if let Some(key) = self.aliases.get(&lowered) {
            return self.canonical.get(key);
        }
        None
    }
}

/// Generates the alias set the loader writes into the alias index: the
/// literal name, its lowercase form, the reverse-DNS id if present, and the
/// name with a trailing "Service"/"Characteristic" stripped.
fn alias_candidates(entry: &RegistryEntry) -> Vec<String> {
    let mut out = Vec::new();
    let lower_name = entry.name.to_lowercase();
    out.push(lower_name.clone());
    if let Some(id) = &entry.id {
        out.push(id.to_lowercase());
    }
    for suffix in [" service", " characteristic"] {
        if let Some(stripped) = lower_name.strip_suffix(suffix) {
            out.push(stripped.to_string());
        }
    }
    out
}

/// Appearance value: 16-bit code split into a category (upper 10 bits) and
/// subcategory (lower 6 bits).
#[derive(Clone, Debug)]
pub struct AppearanceData {
    pub code: u16,
    pub category: u16,
    pub subcategory: u16,
    pub category_name: String,
    pub subcategory_name: String,
}

struct AppearanceCategory {
    category: u16,
    name: String,
    subcategories: HashMap<u16, String>,
}

/// The process-global registry of SIG-assigned and runtime-registered
/// identifiers. Construct with [`SigRegistry::new`] (embedded snapshot) or
/// [`SigRegistry::load_from_dir`] (on-disk tree).
pub struct SigRegistry {
    characteristics: RwLock<Table>,
    services: RwLock<Table>,
    descriptors: RwLock<Table>,
    units: HashMap<String, String>,
    appearance: Vec<AppearanceCategory>,
    company_identifiers: HashMap<u16, String>,
    ad_types: HashMap<u8, String>,
    mutation_lock: Mutex<()>,
}

impl SigRegistry {
    /// Builds a registry from the snapshot embedded in the crate binary.
    pub fn new() -> Result<Self> {
        Self::from_data_set(SigDataSet::embedded()?)
    }

    /// Builds a registry from a full assigned-numbers tree on disk, using
    /// the same seven file names as the embedded snapshot.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_data_set(SigDataSet::load_from_dir(dir.as_ref())?)
    }

    fn from_data_set(data: SigDataSet) -> Result<Self> {
        let mut characteristics = Table::default();
        for raw in data.characteristics {
            characteristics.insert_sig(entry_from_raw(raw)?);
        }
        let mut services = Table::default();
        for raw in data.services {
            services.insert_sig(entry_from_raw(raw)?);
        }
        let mut descriptors = Table::default();
        for raw in data.descriptors {
            descriptors.insert_sig(entry_from_raw(raw)?);
        }
        let units = data.units.into_iter().map(|u| (u.id, u.symbol)).collect();
        let appearance = data
            .appearance
            .into_iter()
            .map(|c| AppearanceCategory {
                category: c.category,
                name: c.name,
                subcategories: c.subcategories.into_iter().map(|s| (s.value, s.name)).collect(),
            })
            .collect();
        let company_identifiers = data.company_identifiers.into_iter().map(|c| (c.id, c.name)).collect();
        let ad_types = data.ad_types.into_iter().map(|a| (a.code, a.name)).collect();

        Ok(Self {
            characteristics: RwLock::new(characteristics),
            services: RwLock::new(services),
            descriptors: RwLock::new(descriptors),
            units,
            appearance,
            company_identifiers,
            ad_types,
            mutation_lock: Mutex::new(()),
        })
    }

    /// Looks up a characteristic by UUID (any form), name, or reverse-DNS id.
    pub fn get_characteristic_info(&self, identifier: &str) -> Option<CharacteristicInfo> {
        self.characteristics.read().unwrap().lookup(identifier).map(|e| e.to_characteristic_info())
    }

    /// Looks up a service by UUID (any form), name, or reverse-DNS id.
    pub fn get_service_info(&self, identifier: &str) -> Option<ServiceInfo> {
        self.services.read().unwrap().lookup(identifier).map(|e| ServiceInfo {
            uuid: e.uuid.clone(),
            name: e.name.clone(),
            id: e.id.clone(),
            summary: e.summary.clone(),
            characteristics: Vec::new(),
        })
    }

    /// Looks up a descriptor by UUID, name, or id.
    pub fn get_descriptor_info(&self, identifier: &str) -> Option<CharacteristicInfo> {
        self.descriptors.read().unwrap().lookup(identifier).map(|e| e.to_characteristic_info())
    }

    pub fn unit_symbol(&self, unit_id: &str) -> Option<&str> {
        self.units.get(unit_id).map(String::as_str)
    }

    /// Decodes a 16-bit appearance code into its category/subcategory names.
    pub fn appearance(&self, code: u16) -> AppearanceData {
        let category_code = code >> 6;
        let subcategory_code = code & 0x3F;
        let category = self.appearance.iter().find(|c| c.category == category_code);
        AppearanceData {
            code,
            category: category_code,
            subcategory: subcategory_code,
            category_name: category.map(|c| c.name.clone()).unwrap_or_else(|| "Unknown".to_string()),
            subcategory_name: category
                .and_then(|c| c.subcategories.get(&subcategory_code))
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }

    pub fn company_identifier(&self, id: u16) -> Option<&str> {
        self.company_identifiers.get(&id).map(String::as_str)
    }

    pub fn ad_type_name(&self, code: u8) -> Option<&str> {
        self.ad_types.get(&code).map(String::as_str)
    }

    /// Registers a custom characteristic UUID. See [`crate::registry`] module
    /// docs for the conflict policy.
    pub fn register_characteristic(&self, reg: CharacteristicRegistration, override_existing: bool) -> Result<()> {
        let _guard = self.mutation_lock.lock().unwrap();
        if !reg.uuid.is_valid_for_custom_registration() {
            return Err(Error::with_message(
                ErrorKind::InvalidUuid(reg.uuid.dashed_form()),
                "reserved UUID cannot be registered as a custom characteristic",
            ));
        }
        debug!("registering custom characteristic {} ({})", reg.name, reg.uuid);
        let entry = RegistryEntry {
            uuid: reg.uuid,
            name: reg.name,
            id: reg.id,
            summary: reg.summary,
            unit: if reg.unit.is_empty() { None } else { Some(reg.unit) },
            value_type: Some(reg.value_type),
            origin: Origin::Runtime,
        };
        self.characteristics.write().unwrap().register(entry, override_existing)
    }

    /// Registers a custom service UUID. See [`crate::registry`] module docs
    /// for the conflict policy.
    pub fn register_service(&self, reg: ServiceRegistration, override_existing: bool) -> Result<()> {
        let _guard = self.mutation_lock.lock().unwrap();
        if !reg.uuid.is_valid_for_custom_registration() {
            return Err(Error::with_message(
                ErrorKind::InvalidUuid(reg.uuid.dashed_form()),
                "reserved UUID cannot be registered as a custom service",
            ));
        }
        let entry = RegistryEntry {
            uuid: reg.uuid,
            name: reg.name,
            id: reg.id,
            summary: reg.summary,
            unit: None,
            value_type: None,
            origin: Origin::Runtime,
        };
        self.services.write().unwrap().register(entry, override_existing)
    }

    /// Removes every runtime-registered entry and restores any SIG entry it
    /// shadowed.
    pub fn clear_custom(&self) {
        let _guard = self.mutation_lock.lock().unwrap();
        self.characteristics.write().unwrap().clear_custom();
        self.services.write().unwrap().clear_custom();
        warn!("cleared all custom characteristic/service registrations");
    }
}

fn entry_from_raw(raw: crate::data::RawUuidEntry) -> Result<RegistryEntry> {
    let value_type = raw.value_type.as_deref().and_then(|s| s.parse().ok());
    Ok(RegistryEntry {
        uuid: Uuid::parse(&raw.uuid)?,
        name: raw.name,
        id: raw.id,
        summary: String::new(),
        unit: raw.unit,
        value_type,
        origin: Origin::Sig,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SigRegistry {
        SigRegistry::new().unwrap()
    }

    #[test]
    fn looks_up_by_uuid_name_and_id() {
        let reg = registry();
        assert!(reg.get_characteristic_info("2A19").is_some());
        assert!(reg.get_characteristic_info("battery level").is_some());
        assert!(reg.get_characteristic_info("org.bluetooth.characteristic.battery_level").is_some());
        assert!(reg.get_characteristic_info("0000abcd").is_none());
    }

    #[test]
    fn register_without_override_conflicts() {
        let reg = registry();
        let attempt = CharacteristicRegistration {
            uuid: Uuid::parse("2A19").unwrap(),
            name: "Custom Battery".into(),
            id: None,
            summary: String::new(),
            unit: String::new(),
            value_type: ValueType::Int,
        };
        let err = reg.register_characteristic(attempt, false).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::RegistrationConflict("0000180F-0000-1000-8000-00805F9B34FB".into(), "Battery Level".into())
        );
    }

    #[test]
    fn override_then_clear_restores_sig_entry() {
        let reg = registry();
        let custom = CharacteristicRegistration {
            uuid: Uuid::parse("2A19").unwrap(),
            name: "Custom Battery".into(),
            id: None,
            summary: String::new(),
            unit: String::new(),
            value_type: ValueType::Int,
        };
        reg.register_characteristic(custom, true).unwrap();
        assert_eq!(reg.get_characteristic_info("2A19").unwrap().name, "Custom Battery");
        reg.clear_custom();
        assert_eq!(reg.get_characteristic_info("2A19").unwrap().name, "Battery Level");
    }

    #[test]
    fn rejects_reserved_uuid_registration() {
        let reg = registry();
        let bad = CharacteristicRegistration {
            uuid: Uuid::parse("00000000-0000-1000-8000-00805F9B34FB").unwrap(),
            name: "Bad".into(),
            id: None,
            summary: String::new(),
            unit: String::new(),
            value_type: ValueType::Unknown,
        };
        assert!(reg.register_characteristic(bad, true).is_err());
    }

    #[test]
    fn appearance_splits_category_and_subcategory() {
        let reg = registry();
        let code = (64u16 << 6) | 1;
        let app = reg.appearance(code);
        assert_eq!(app.category, 64);
        assert_eq!(app.subcategory, 1);
        assert_eq!(app.subcategory_name, "Heart Rate Belt");
    }
}
