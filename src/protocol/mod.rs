//! # Protocol Layer
//!
//! Payload codecs, type dispatch, and the synchronization negotiation.
//!
//! ## Components
//! - **Payload**: composable encode/decode pairs and the typed envelope
//! - **Registry**: immutable type-id → codec maps with fallback dispatch
//! - **Message**: the synchronization payload types and their codecs
//! - **Negotiation**: the per-peer two-phase sync state machine

pub mod message;
pub mod negotiation;
pub mod payload;
pub mod registry;
