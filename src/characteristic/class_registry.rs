//! Characteristic/service class registry (C7): UUID- and name-indexed
//! lookup over the built-in classes plus any runtime registrations.
//!
//! The source discovers classes by walking a module tree at import time;
//! without an equivalent to that reflection, built-in classes register
//! themselves explicitly through [`builtin::register_builtin`], invoked
//! once from [`ClassRegistry::with_builtins`].

use std::collections::HashMap;

use crate::characteristic::{
    builtin, pipeline, Characteristic, CharacteristicDescriptor, CharacteristicEncodeError, CharacteristicParseError,
    ParseOutcome,
};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{CharacteristicContext, ParsedValue};
use crate::uuid::Uuid;

type ParseFn = fn(&[u8], Option<&CharacteristicContext>) -> std::result::Result<ParsedValue, CharacteristicParseError>;
type EncodeFn = fn(&ParsedValue) -> std::result::Result<Vec<u8>, CharacteristicEncodeError>;

/// Everything the registry needs to dispatch by UUID without knowing the
/// concrete Rust type: a type-erased parse/encode pair plus the class's
/// static identity and dependency declarations.
#[derive(Clone)]
pub struct ClassEntry {
    pub info: CharacteristicDescriptor,
    pub required_dependencies: &'static [&'static str],
    pub optional_dependencies: &'static [&'static str],
    parse: ParseFn,
    encode: EncodeFn,
}

impl ClassEntry {
    /// Builds a [`ClassEntry`] for characteristic type `C`, type-erasing its
    /// parse/encode through [`pipeline::parse`]/[`pipeline::encode`].
    pub fn for_characteristic<C: Characteristic>() -> Self {
        fn parse_dyn<C: Characteristic>(
            bytes: &[u8],
            ctx: Option<&CharacteristicContext>,
        ) -> std::result::Result<ParsedValue, CharacteristicParseError> {
            match pipeline::parse::<C>(bytes, ctx)? {
                ParseOutcome::Value(v) => Ok(v.to_parsed_value()),
                ParseOutcome::Special(s) => Ok(ParsedValue::Special(s)),
            }
        }
        fn encode_dyn<C: Characteristic>(
            value: &ParsedValue,
        ) -> std::result::Result<Vec<u8>, CharacteristicEncodeError> {
            let typed = C::from_parsed_value(value).map_err(|e| CharacteristicEncodeError {
                name: C::INFO.name.to_string(),
                uuid: C::INFO.uuid.to_string(),
                accumulator: {
                    let mut acc = crate::characteristic::ValidationAccumulator::default();
                    acc.push_error(e.to_string());
                    acc
                },
            })?;
            pipeline::encode(&typed)
        }
        Self {
            info: C::INFO,
            required_dependencies: C::required_dependencies(),
            optional_dependencies: C::optional_dependencies(),
            parse: parse_dyn::<C>,
            encode: encode_dyn::<C>,
        }
    }

    pub fn parse(
        &self,
        bytes: &[u8],
        ctx: Option<&CharacteristicContext>,
    ) -> std::result::Result<ParsedValue, CharacteristicParseError> {
        (self.parse)(bytes, ctx)
    }

    pub fn encode(&self, value: &ParsedValue) -> std::result::Result<Vec<u8>, CharacteristicEncodeError> {
        (self.encode)(value)
    }
}

/// UUID- and name-indexed table of characteristic classes.
#[derive(Default)]
pub struct ClassRegistry {
    by_uuid: HashMap<String, ClassEntry>,
    by_name: HashMap<String, String>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with every built-in characteristic class.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtin(&mut registry);
        registry
    }

    /// Registers a built-in class under its declared UUID, rejecting
    /// duplicate UUIDs — built-in registration is expected to be conflict
    /// free by construction.
    pub(crate) fn insert_builtin<C: Characteristic>(&mut self) {
        let entry = ClassEntry::for_characteristic::<C>();
        let uuid_key = Uuid::parse(entry.info.uuid)
            .unwrap_or_else(|e| panic!("built-in characteristic {} has an invalid UUID: {e}", C::INFO.name))
            .normalized()
            .to_string();
        self.by_name.insert(entry.info.name.to_lowercase(), uuid_key.clone());
        if self.by_uuid.insert(uuid_key, entry).is_some() {
            panic!("duplicate built-in characteristic UUID for {}", C::INFO.name);
        }
    }

    /// Registers a class at runtime. SIG-assigned UUIDs require
    /// `allow_sig_override = true` as well as `override_existing`, matching
    /// the source's double-gate (`override=true` AND an explicit
    /// class-level opt-in) against accidental SIG redefinition.
    pub fn register_characteristic_class(
        &mut self,
        entry: ClassEntry,
        override_existing: bool,
        allow_sig_override: bool,
    ) -> Result<()> {
        let uuid_key = Uuid::parse(entry.info.uuid)
            .map_err(|_| Error::with_message(ErrorKind::InvalidUuid(entry.info.uuid.to_string()), "class UUID is not valid"))?
            .normalized()
            .to_string();
        if let Some(existing) = self.by_uuid.get(&uuid_key) {
            if !override_existing {
                return Err(Error::with_message(
                    ErrorKind::RegistrationConflict(entry.info.uuid.to_string(), existing.info.name.to_string()),
                    "class already registered for this UUID",
                ));
            }
            if !allow_sig_override {
                return Err(Error::with_message(
                    ErrorKind::RegistrationConflict(entry.info.uuid.to_string(), existing.info.name.to_string()),
                    "overriding a class requires allow_sig_override=true",
                ));
            }
        }
        self.by_name.insert(entry.info.name.to_lowercase(), uuid_key.clone());
        self.by_uuid.insert(uuid_key, entry);
        Ok(())
    }

    pub fn get_by_uuid(&self, uuid: &str) -> Option<&ClassEntry> {
        let key = Uuid::parse(uuid).ok()?;
        self.by_uuid.get(key.normalized())
    }

    pub fn get_by_name(&self, name: &str) -> Option<&ClassEntry> {
        let uuid_key = self.by_name.get(&name.to_lowercase())?;
        self.by_uuid.get(uuid_key)
    }

    pub fn supports(&self, uuid: &str) -> bool {
        Uuid::parse(uuid).is_ok_and(|key| self.by_uuid.contains_key(key.normalized()))
    }

    pub fn list_supported(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_uuid.values().map(|e| (e.info.name, e.info.uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_discoverable_by_uuid_and_name() {
        let registry = ClassRegistry::with_builtins();
        assert!(registry.supports("2A19"));
        assert!(registry.get_by_name("Battery Level").is_some());
    }
}
