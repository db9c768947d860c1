//! # registry-protocol
//!
//! Typed payload codec registry with negotiated partial registry
//! synchronization.
//!
//! A server owns a set of named registries (keyed, ordered collections of
//! serializable entries) and shares them with peers. Before sending
//! anything, the two sides negotiate which *known packs* — named,
//! versioned content bundles — they both hold; entries sourced from a
//! shared pack travel as bare ids, everything else ships its encoded
//! body. Heterogeneous payloads share one wire entry point through a
//! type-tagged envelope dispatched against immutable codec registries.
//!
//! ## Layers
//! - [`core`]: packet framing, resource ids, wire primitives, value formats
//! - [`protocol`]: payload codecs, type registries, sync messages, the
//!   negotiation state machine
//! - [`sync`]: the registry model, snapshot packer, and reference
//!   validation walk
//! - [`transport`]: framed TCP plumbing for servers and clients
//! - [`utils`]: compression, logging, metrics, timeouts
//!
//! ## Quick start
//! ```no_run
//! use registry_protocol::protocol::message::KnownPack;
//! use registry_protocol::protocol::negotiation::RegistrySyncTask;
//! use registry_protocol::protocol::payload::{codecs, Envelope};
//! use registry_protocol::sync::access::{Registry, RegistrySnapshot};
//! use registry_protocol::sync::packer::RegistryDescriptor;
//! use registry_protocol::ResourceId;
//! use std::sync::Arc;
//!
//! # fn main() -> registry_protocol::Result<()> {
//! let mut widgets = Registry::new(ResourceId::parse("registry:widgets")?);
//! widgets.insert(
//!     ResourceId::parse("base:button")?,
//!     7u32,
//!     Some(KnownPack::new("base", "1.0.0")),
//! )?;
//! let snapshot = Arc::new(RegistrySnapshot::builder().add(widgets)?.build());
//!
//! let mut task = RegistrySyncTask::new(
//!     vec![KnownPack::new("base", "1.0.0")],
//!     snapshot,
//!     vec![RegistryDescriptor::new(
//!         ResourceId::parse("registry:widgets")?,
//!         codecs::u32(),
//!     )],
//!     vec![],
//! );
//!
//! let mut outbound: Vec<Envelope> = Vec::new();
//! task.start(&mut outbound)?;
//! // ... deliver the request, receive the peer's claimed packs ...
//! task.handle_response(&[KnownPack::new("base", "1.0.0")], &mut outbound)?;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod sync;
pub mod transport;
pub mod utils;

pub use crate::core::packet::Packet;
pub use crate::core::resource::ResourceId;
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::message::KnownPack;
pub use crate::protocol::payload::{Envelope, PayloadCodec};
pub use crate::protocol::registry::{FlowDirection, PayloadTypeRegistry};
