//! Connection-manager port (§6.4, consumers only) and a thin `Device`
//! convenience wrapper over it. Gated behind the `device` feature: the
//! transport itself is an external collaborator, never part of the core
//! codec, but a consumer wiring one in shouldn't have to hand-roll the glue
//! between raw GATT bytes and the translator façade.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::translator::Translator;
use crate::types::{CharacteristicContext, ParsedValue};

/// Minimal async contract a BLE transport must satisfy for [`Device`] to
/// drive it. Implementations may be thread- or task-based; the core treats
/// them as opaque.
#[async_trait]
pub trait ConnectionPort: Send + Sync {
    async fn connect(&self, timeout: std::time::Duration) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
    async fn read_gatt_char(&self, uuid: &str) -> Result<Vec<u8>>;
    async fn write_gatt_char(&self, uuid: &str, value: &[u8], response: bool) -> Result<()>;
    async fn start_notify(&self, uuid: &str) -> Result<()>;
    async fn stop_notify(&self, uuid: &str) -> Result<()>;
    async fn read_gatt_descriptor(&self, uuid: &str) -> Result<Vec<u8>>;
    async fn write_gatt_descriptor(&self, uuid: &str, value: &[u8]) -> Result<()>;
    async fn get_services(&self) -> Result<HashMap<String, Vec<String>>>;
    async fn pair(&self) -> Result<()>;
    async fn unpair(&self) -> Result<()>;
    async fn read_rssi(&self) -> Result<i16>;
    async fn mtu_size(&self) -> Result<u16>;
}

/// Wires a [`ConnectionPort`] to the translator façade: reads come back
/// decoded, writes take an already-typed [`ParsedValue`] and encode it
/// before writing.
pub struct Device<'a, P: ConnectionPort> {
    port: P,
    translator: &'a Translator,
}

impl<'a, P: ConnectionPort> Device<'a, P> {
    pub fn new(port: P, translator: &'a Translator) -> Self {
        Self { port, translator }
    }

    pub async fn read(&self, uuid: &str, ctx: Option<&CharacteristicContext>) -> Result<ParsedValue> {
        let bytes = self.port.read_gatt_char(uuid).await?;
        self.translator.parse_characteristic(uuid, &bytes, ctx)
    }

    pub async fn write(&self, uuid: &str, value: &ParsedValue, response: bool) -> Result<()> {
        let bytes = self.translator.encode_characteristic(uuid, value)?;
        self.port.write_gatt_char(uuid, &bytes, response).await
    }
}
