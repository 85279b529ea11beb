//! Dependency-pair stream buffer (C11): a generic, transport-agnostic buffer
//! that correlates dependent characteristic notifications by a
//! caller-supplied grouping key until a declared UUID set is complete, then
//! batch-parses and invokes a callback once.
//!
//! Grounded on `original_source/stream/pairing.py`'s `DependencyPairingBuffer`.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::error::Result;
use crate::translator::Translator;
use crate::types::ParsedValue;

/// Snapshot of pairing buffer statistics — mirrors `BufferStats`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BufferStats {
    pub pending: usize,
    pub completed: u64,
    pub evicted: u64,
}

/// Buffers incoming notifications, keyed by a caller-derived grouping key,
/// until every UUID in `required_uuids` has been seen for that key, then
/// batch-parses the group through `translator` and invokes `on_pair` once.
///
/// `K` must be hashable the way the source's grouping key is — any value
/// `group_key` extracts from a parsed notification.
pub struct DependencyPairingBuffer<'a, K, G, F>
where
    K: Eq + Hash + Clone,
    G: Fn(&str, &ParsedValue) -> K,
    F: FnMut(HashMap<String, ParsedValue>),
{
    translator: &'a Translator,
    required: HashSet<String>,
    group_key: G,
    on_pair: F,
    max_age_seconds: Option<f64>,
    clock: Box<dyn Fn() -> f64 + 'a>,
    buffer: HashMap<K, Vec<(String, Vec<u8>)>>,
    group_timestamps: HashMap<K, f64>,
    completed: u64,
    evicted: u64,
}

impl<'a, K, G, F> DependencyPairingBuffer<'a, K, G, F>
where
    K: Eq + Hash + Clone,
    G: Fn(&str, &ParsedValue) -> K,
    F: FnMut(HashMap<String, ParsedValue>),
{
    pub fn new(
        translator: &'a Translator,
        required_uuids: HashSet<String>,
        group_key: G,
        on_pair: F,
        max_age_seconds: Option<f64>,
        clock: impl Fn() -> f64 + 'a,
    ) -> Self {
        Self {
            translator,
            required: required_uuids.into_iter().map(|u| u.to_uppercase()).collect(),
            group_key,
            on_pair,
            max_age_seconds,
            clock: Box::new(clock),
            buffer: HashMap::new(),
            group_timestamps: HashMap::new(),
            completed: 0,
            evicted: 0,
        }
    }

    /// Ingests a single raw notification. Evicts stale groups first, parses
    /// just enough to derive the grouping key, then accumulates raw bytes
    /// and fires the callback the moment the required set completes.
    pub fn ingest(&mut self, uuid: &str, data: Vec<u8>) -> Result<()> {
        self.evict_stale();

        let parsed = self.translator.parse_characteristic(uuid, &data, None)?;
        let key = (self.group_key)(uuid, &parsed);

        let now = (self.clock)();
        self.group_timestamps.entry(key.clone()).or_insert(now);
        let group = self.buffer.entry(key.clone()).or_default();
        let uuid = uuid.to_uppercase();
        match group.iter_mut().find(|(existing, _)| *existing == uuid) {
            Some(entry) => entry.1 = data,
            None => group.push((uuid, data)),
        }

        let present: HashSet<&String> = group.iter().map(|(uuid, _)| uuid).collect();
        if self.required.iter().all(|req| present.contains(req)) {
            let batch = self.buffer.remove(&key).unwrap();
            self.group_timestamps.remove(&key);
            self.completed += 1;

            let results = self.translator.parse_characteristics(&batch, None)?;
            (self.on_pair)(results);
        }
        Ok(())
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats { pending: self.buffer.len(), completed: self.completed, evicted: self.evicted }
    }

    fn evict_stale(&mut self) {
        let Some(max_age) = self.max_age_seconds else { return };
        let now = (self.clock)();
        let cutoff = now - max_age;
        let stale: Vec<K> =
            self.group_timestamps.iter().filter(|(_, &ts)| ts <= cutoff).map(|(k, _)| k.clone()).collect();
        for key in stale {
            self.buffer.remove(&key);
            self.group_timestamps.remove(&key);
            self.evicted += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn pairs_complete_once_all_required_uuids_seen() {
        let translator = Translator::new().unwrap();
        let required: HashSet<String> = ["2A19".to_string(), "2A6E".to_string()].into_iter().collect();
        let paired: Rc<RefCell<Vec<HashMap<String, ParsedValue>>>> = Rc::new(RefCell::new(Vec::new()));
        let paired_clone = paired.clone();

        let mut buffer = DependencyPairingBuffer::new(
            &translator,
            required,
            |_, _| 1u32, // single group for this test
            move |result| paired_clone.borrow_mut().push(result),
            None,
            || 0.0,
        );

        buffer.ingest("2A19", vec![50]).unwrap();
        assert_eq!(buffer.stats().pending, 1);
        buffer.ingest("2A6E", vec![0x10, 0x00]).unwrap();
        assert_eq!(buffer.stats().pending, 0);
        assert_eq!(buffer.stats().completed, 1);
        assert_eq!(paired.borrow().len(), 1);
    }

    #[test]
    fn stale_groups_are_evicted_before_the_ttl() {
        let translator = Translator::new().unwrap();
        let required: HashSet<String> = ["2A19".to_string(), "2A6E".to_string()].into_iter().collect();
        let now = Rc::new(RefCell::new(0.0f64));
        let now_clone = now.clone();

        let mut buffer = DependencyPairingBuffer::new(
            &translator,
            required,
            |_, _| 1u32,
            |_| {},
            Some(5.0),
            move || *now_clone.borrow(),
        );

        buffer.ingest("2A19", vec![50]).unwrap();
        assert_eq!(buffer.stats().pending, 1);
        *now.borrow_mut() = 10.0;
        buffer.ingest("2A19", vec![51]).unwrap();
        assert_eq!(buffer.stats().evicted, 1);
    }
}
