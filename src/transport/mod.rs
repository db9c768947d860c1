//! # Transport Layer
//!
//! Connection plumbing that moves packets between peers.
//!
//! The synchronization logic itself is transport-agnostic: it talks to a
//! payload sink and a registry snapshot. This module supplies the framed
//! TCP implementation used by servers and clients.

pub mod local;

pub use local::{connect, run_client, start_server, SyncOutcome, SyncServerContext};
