#![cfg_attr(docsrs, feature(doc_cfg))]

//! # bluesig — Bluetooth SIG GATT codec
//!
//! A framework-agnostic, pure codec for Bluetooth SIG GATT standards: it
//! parses and encodes raw bytes exchanged over Bluetooth Low Energy against
//! the published SIG GATT specifications — characteristics, services,
//! descriptors, advertising data, units, appearance values, and company
//! identifiers.
//!
//! This crate carries no transport of its own. GATT connections, pairing and
//! notification plumbing are consumer concerns; the optional `device`
//! feature exposes a narrow async [`ConnectionPort`](device::ConnectionPort)
//! trait so a consumer can wire their own transport in without pulling one
//! into this crate's dependency graph.
//!
//! ## Layout
//! * [`uuid`] — normalised 16/128-bit identifiers, short/full/dashed forms.
//! * [`registry`] — the canonical SIG data set (characteristics, services,
//!   units, appearance values, company identifiers), plus runtime
//!   registration of custom UUIDs.
//! * [`characteristic`] — per-type codecs ([`characteristic::builtin`]), the
//!   parse/encode pipeline, and the UUID/name-indexed class registry.
//! * [`translator`] — the single façade over all of the above:
//!   [`Translator`] and the process-wide [`global_translator`].
//! * [`batch`] — topological ordering of a batch of raw payloads by declared
//!   characteristic dependencies.
//! * [`advertising`] — legacy and extended advertising PDU decoding.
//! * [`stream_pairing`] — correlates dependent notifications arriving out of
//!   order until a declared UUID set completes.
//! * [`async_facade`] — thin async wrappers over the synchronous core, plus
//!   a [`async_facade::Session`] that accumulates parse context across calls.
//! * [`device`] *(feature `device`)* — the [`device::ConnectionPort`] trait
//!   and [`device::Device`] convenience wrapper.
//!
//! ## Crate features
//! * `serde` — enables `Serialize`/`Deserialize` on public data types.
//! * `device` — enables the async connection-port trait and `Device`
//!   wrapper. Off by default: transport is an external collaborator, not
//!   part of the core codec.
//!
//! ## Basic usage
//! Reach for the process-wide [`global_translator`] singleton, or construct
//! an independent [`Translator`] when isolated registry state is needed
//! (tests, multiple disjoint sets of custom registrations):
//!
//! ```
//! use bluesig::global_translator;
//!
//! let translator = global_translator();
//! assert!(translator.supports("2A19")); // Battery Level
//! let level = translator.parse_characteristic("2A19", &[77], None).unwrap();
//! ```

pub mod advertising;
pub mod async_facade;
pub mod batch;
pub mod characteristic;
pub mod codec;
pub mod data;
pub mod error;
pub mod registry;
pub mod stream_pairing;
pub mod translator;
pub mod types;
pub mod uuid;

#[cfg(feature = "device")]
#[cfg_attr(docsrs, doc(cfg(feature = "device")))]
pub mod device;

pub use advertising::{parse_advertising_data, AdvertisingRecord};
pub use error::{Error, ErrorKind, Result};
pub use translator::{global_translator, DiscoveredServiceMap, Translator};
pub use types::{
    CharacteristicContext, CharacteristicInfo, CharacteristicRegistration, CharacteristicRole, DataType, DeviceInfo,
    GattProperty, ParsedValue, ServiceInfo, ServiceRegistration, SpecialValueResult, ValidationResult, ValueType,
};
pub use uuid::Uuid;
