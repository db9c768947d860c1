//! # Registry Synchronization Negotiation
//!
//! Two-phase state machine driving one synchronization pass per peer
//! connection.
//!
//! ```text
//! New -> AwaitingKnownPacks -> SendingRegistries -> Done
//! ```
//!
//! `start` asks the peer which of the offered packs it already holds.
//! `handle_response` intersects the offer with the peer's claim, packs
//! every synchronizable registry against that effective known set, and
//! finishes with the always-sent tag payload.
//!
//! The intersection is deliberate: a peer claiming fewer packs than
//! offered (a mismatched content set) still skips exactly the packs both
//! sides share, instead of falling back to a full resync.
//!
//! Task state is per connection and strictly sequential — a response
//! outside `AwaitingKnownPacks` is a protocol error, and a second
//! response after `Done` is rejected rather than silently accepted.

use crate::error::{constants, ProtocolError, Result};
use crate::protocol::message::{
    KnownPack, KnownPacksRequest, RegistryData, TagSet, UpdateTags,
};
use crate::protocol::payload::Envelope;
use crate::sync::access::RegistrySnapshot;
use crate::sync::packer::{pack_registries, RegistryDescriptor};
use crate::utils::metrics::global_metrics;
use std::sync::Arc;
use tracing::{debug, instrument};

/// States of one synchronization task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    New,
    AwaitingKnownPacks,
    SendingRegistries,
    Done,
}

/// Destination for outgoing payloads: a connection, or a buffer in tests.
pub trait PayloadSink {
    /// Hand one payload to the peer.
    ///
    /// # Errors
    /// Implementations fail when the underlying connection does.
    fn send(&mut self, payload: Envelope) -> Result<()>;
}

impl PayloadSink for Vec<Envelope> {
    fn send(&mut self, payload: Envelope) -> Result<()> {
        self.push(payload);
        Ok(())
    }
}

/// One synchronization pass against one peer.
pub struct RegistrySyncTask {
    offered: Vec<KnownPack>,
    snapshot: Arc<RegistrySnapshot>,
    descriptors: Vec<RegistryDescriptor>,
    tags: Vec<TagSet>,
    state: SyncState,
}

impl RegistrySyncTask {
    pub fn new(
        offered: Vec<KnownPack>,
        snapshot: Arc<RegistrySnapshot>,
        descriptors: Vec<RegistryDescriptor>,
        tags: Vec<TagSet>,
    ) -> Self {
        Self {
            offered,
            snapshot,
            descriptors,
            tags,
            state: SyncState::New,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Begin the pass: request the peer's known-pack status for the
    /// offered packs.
    ///
    /// # Errors
    /// Returns `ProtocolError::ProtocolState` if the task was already
    /// started, or the sink's error if sending fails.
    #[instrument(skip(self, sink), fields(offered = self.offered.len()))]
    pub fn start(&mut self, sink: &mut dyn PayloadSink) -> Result<()> {
        if self.state != SyncState::New {
            return Err(ProtocolError::ProtocolState(
                constants::ERR_TASK_ALREADY_STARTED.to_string(),
            ));
        }
        sink.send(Envelope::new(
            KnownPacksRequest::type_id(),
            KnownPacksRequest {
                packs: self.offered.clone(),
            },
        ))?;
        self.state = SyncState::AwaitingKnownPacks;
        global_metrics().sync_task_started();
        debug!("Known-pack status requested");
        Ok(())
    }

    /// Process the peer's claimed packs: pack and send every registry
    /// against the offered ∩ reported set, then the tag payload.
    ///
    /// # Errors
    /// - `ProtocolError::ProtocolState` outside `AwaitingKnownPacks`
    /// - any packing failure (which aborts the pass with no tag payload)
    /// - the sink's error if sending fails
    #[instrument(skip(self, reported, sink), fields(reported = reported.len()))]
    pub fn handle_response(
        &mut self,
        reported: &[KnownPack],
        sink: &mut dyn PayloadSink,
    ) -> Result<()> {
        match self.state {
            SyncState::AwaitingKnownPacks => {}
            SyncState::Done => {
                return Err(ProtocolError::ProtocolState(
                    constants::ERR_RESPONSE_AFTER_DONE.to_string(),
                ))
            }
            _ => {
                return Err(ProtocolError::ProtocolState(
                    constants::ERR_RESPONSE_NOT_AWAITED.to_string(),
                ))
            }
        }
        self.state = SyncState::SendingRegistries;

        // Offered ∩ reported, in offer order.
        let effective: Vec<KnownPack> = self
            .offered
            .iter()
            .filter(|pack| reported.contains(pack))
            .cloned()
            .collect();
        debug!(
            effective = effective.len(),
            offered = self.offered.len(),
            "Effective known-pack set negotiated"
        );

        pack_registries(
            &self.descriptors,
            self.snapshot.as_ref(),
            &effective,
            |registry, entries| {
                sink.send(Envelope::new(
                    RegistryData::type_id(),
                    RegistryData {
                        registry: registry.clone(),
                        entries,
                    },
                ))
            },
        )?;

        // Tag data is supplementary and never elided.
        sink.send(Envelope::new(
            UpdateTags::type_id(),
            UpdateTags {
                sets: self.tags.clone(),
            },
        ))?;

        self.state = SyncState::Done;
        global_metrics().sync_task_completed();
        debug!("Synchronization pass complete");
        Ok(())
    }
}

impl std::fmt::Debug for RegistrySyncTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrySyncTask")
            .field("state", &self.state)
            .field("offered", &self.offered.len())
            .field("descriptors", &self.descriptors.len())
            .finish()
    }
}
