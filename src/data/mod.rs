//! Embedded Bluetooth SIG assigned-numbers tables.
//!
//! The canonical source is a YAML tree the same shape as the Bluetooth SIG's
//! own `assigned_numbers` repository. We embed a curated snapshot via
//! `include_str!` and parse it once at registry construction, but
//! [`SigRegistry::load_from_dir`](crate::registry::SigRegistry::load_from_dir)
//! lets a consumer point at a fuller on-disk tree instead.

use serde::Deserialize;

use crate::error::{Error, ErrorKind, Result};

const CHARACTERISTIC_UUIDS_YAML: &str = include_str!("characteristic_uuids.yaml");
const SERVICE_UUIDS_YAML: &str = include_str!("service_uuids.yaml");
const DESCRIPTORS_YAML: &str = include_str!("descriptors.yaml");
const UNITS_YAML: &str = include_str!("units.yaml");
const APPEARANCE_VALUES_YAML: &str = include_str!("appearance_values.yaml");
const COMPANY_IDENTIFIERS_YAML: &str = include_str!("company_identifiers.yaml");
const AD_TYPES_YAML: &str = include_str!("ad_types.yaml");

#[derive(Debug, Deserialize)]
pub(crate) struct RawUuidEntry {
    pub uuid: String,
    pub name: String,
    pub id: Option<String>,
    pub unit: Option<String>,
    pub value_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawUnitEntry {
    pub id: String,
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAppearanceSubcategory {
    pub value: u16,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAppearanceCategory {
    pub category: u16,
    pub name: String,
    #[serde(default)]
    pub subcategories: Vec<RawAppearanceSubcategory>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCompanyIdentifier {
    pub id: u16,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAdType {
    pub code: u8,
    pub name: String,
}

/// Every table loaded from a single assigned-numbers tree, embedded or
/// on-disk.
pub(crate) struct SigDataSet {
    pub characteristics: Vec<RawUuidEntry>,
    pub services: Vec<RawUuidEntry>,
    pub descriptors: Vec<RawUuidEntry>,
    pub units: Vec<RawUnitEntry>,
    pub appearance: Vec<RawAppearanceCategory>,
    pub company_identifiers: Vec<RawCompanyIdentifier>,
    pub ad_types: Vec<RawAdType>,
}

fn parse_yaml<T: serde::de::DeserializeOwned>(name: &str, text: &str) -> Result<Vec<T>> {
    serde_yaml::from_str(text).map_err(|e| {
        Error::with_message(ErrorKind::Internal(format!("malformed {name} data")), e.to_string())
    })
}

impl SigDataSet {
    /// Parses the snapshot embedded in the crate binary.
    pub(crate) fn embedded() -> Result<Self> {
        Ok(Self {
            characteristics: parse_yaml("characteristic_uuids.yaml", CHARACTERISTIC_UUIDS_YAML)?,
            services: parse_yaml("service_uuids.yaml", SERVICE_UUIDS_YAML)?,
            descriptors: parse_yaml("descriptors.yaml", DESCRIPTORS_YAML)?,
            units: parse_yaml("units.yaml", UNITS_YAML)?,
            appearance: parse_yaml("appearance_values.yaml", APPEARANCE_VALUES_YAML)?,
            company_identifiers: parse_yaml("company_identifiers.yaml", COMPANY_IDENTIFIERS_YAML)?,
            ad_types: parse_yaml("ad_types.yaml", AD_TYPES_YAML)?,
        })
    }

    /// Parses the same seven tables from files of the same name under
    /// `dir`, for consumers who maintain a fuller assigned-numbers tree
    /// on disk (e.g. a full checkout of the Bluetooth SIG's own
    /// `assigned_numbers` repository).
    pub(crate) fn load_from_dir(dir: &std::path::Path) -> Result<Self> {
        let read = |file: &str| -> Result<String> {
            std::fs::read_to_string(dir.join(file)).map_err(|e| {
                Error::with_message(
                    ErrorKind::Internal(format!("cannot read {file}")),
                    e.to_string(),
                )
            })
        };
        Ok(Self {
            characteristics: parse_yaml("characteristic_uuids.yaml", &read("characteristic_uuids.yaml")?)?,
            services: parse_yaml("service_uuids.yaml", &read("service_uuids.yaml")?)?,
            descriptors: parse_yaml("descriptors.yaml", &read("descriptors.yaml")?)?,
            units: parse_yaml("units.yaml", &read("units.yaml")?)?,
            appearance: parse_yaml("appearance_values.yaml", &read("appearance_values.yaml")?)?,
            company_identifiers: parse_yaml(
                "company_identifiers.yaml",
                &read("company_identifiers.yaml")?,
            )?,
            ad_types: parse_yaml("ad_types.yaml", &read("ad_types.yaml")?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_snapshot_parses() {
        let data = SigDataSet::embedded().unwrap();
        assert!(!data.characteristics.is_empty());
        assert!(!data.services.is_empty());
        assert!(!data.ad_types.is_empty());
    }
}
