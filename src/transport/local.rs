//! # Local TCP Transport
//!
//! Framed TCP transport driving one registry synchronization pass per
//! accepted connection.
//!
//! The server owns a read-only [`RegistrySnapshot`] shared by every peer;
//! each connection gets its own [`RegistrySyncTask`]. Outgoing payloads
//! are buffered through the task's sink, encoded against the clientbound
//! type registry, framed, and flushed in order.
//!
//! The client helper performs the peer side of the negotiation and
//! collects synchronized registries until the tag payload — which is
//! never elided — marks the end of the pass.

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

use crate::config::TransportConfig;
use crate::core::codec::PacketCodec;
use crate::core::packet::Packet;
use crate::error::{ProtocolError, Result};
use crate::protocol::message::{
    KnownPack, KnownPacksRequest, KnownPacksResponse, RegistryData, TagSet, UpdateTags,
};
use crate::protocol::negotiation::RegistrySyncTask;
use crate::protocol::payload::Envelope;
use crate::protocol::registry::{DiscardedPayload, PayloadTypeRegistry};
use crate::sync::access::RegistrySnapshot;
use crate::sync::packer::RegistryDescriptor;
use crate::sync::validation::{validate_tag_sets, ProblemCollector};
use crate::utils::metrics::global_metrics;
use crate::utils::timeout::{with_timeout, RESPONSE_TIMEOUT, SHUTDOWN_TIMEOUT};

/// Everything a server needs to synchronize peers: the snapshot, the
/// offer, the codecs, and the transport settings.
pub struct SyncServerContext {
    offered: Vec<KnownPack>,
    snapshot: Arc<RegistrySnapshot>,
    descriptors: Vec<RegistryDescriptor>,
    tags: Vec<TagSet>,
    clientbound: PayloadTypeRegistry,
    serverbound: PayloadTypeRegistry,
    transport: TransportConfig,
}

impl SyncServerContext {
    /// Assemble a server context, validating the tag sets up front.
    ///
    /// # Errors
    /// Returns `ProtocolError::ConfigError` listing every tag problem
    /// (cycles, dangling includes, duplicates) found by the validation
    /// walk — cyclic tag data must never reach the wire.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        offered: Vec<KnownPack>,
        snapshot: Arc<RegistrySnapshot>,
        descriptors: Vec<RegistryDescriptor>,
        tags: Vec<TagSet>,
        clientbound: PayloadTypeRegistry,
        serverbound: PayloadTypeRegistry,
        transport: TransportConfig,
    ) -> Result<Self> {
        let collector = ProblemCollector::new();
        validate_tag_sets(&tags, &collector);
        if !collector.is_empty() {
            let problems: Vec<String> = collector
                .into_problems()
                .into_iter()
                .map(|p| p.to_string())
                .collect();
            return Err(ProtocolError::ConfigError(format!(
                "Tag validation failed:\n  - {}",
                problems.join("\n  - ")
            )));
        }
        Ok(Self {
            offered,
            snapshot,
            descriptors,
            tags,
            clientbound,
            serverbound,
            transport,
        })
    }

    fn new_task(&self) -> RegistrySyncTask {
        RegistrySyncTask::new(
            self.offered.clone(),
            Arc::clone(&self.snapshot),
            self.descriptors.clone(),
            self.tags.clone(),
        )
    }
}

/// Start a synchronization server with CTRL+C shutdown handling.
///
/// # Errors
/// Returns transport errors from binding or the accept loop.
#[instrument(skip(ctx))]
pub async fn start_server(addr: &str, ctx: Arc<SyncServerContext>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx_clone.send(()).await;
        }
    });

    start_server_with_shutdown(addr, ctx, shutdown_rx).await
}

/// Start a synchronization server with an external shutdown channel.
///
/// # Errors
/// Returns transport errors from binding or the accept loop.
#[instrument(skip(ctx, shutdown_rx))]
pub async fn start_server_with_shutdown(
    addr: &str,
    ctx: Arc<SyncServerContext>,
    shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(address = addr, "Listening for synchronization peers");
    serve_with_listener(listener, ctx, shutdown_rx).await
}

/// Accept loop over an already-bound listener (useful with ephemeral
/// ports in tests).
///
/// # Errors
/// Returns transport errors from the accept loop.
pub async fn serve_with_listener(
    listener: TcpListener,
    ctx: Arc<SyncServerContext>,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    // Track active connections
    let active_connections = Arc::new(Mutex::new(0u32));

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutting down server. Waiting for connections to close...");

                let timeout = tokio::time::sleep(SHUTDOWN_TIMEOUT);
                tokio::pin!(timeout);

                loop {
                    tokio::select! {
                        _ = &mut timeout => {
                            warn!("Shutdown timeout reached, forcing exit");
                            break;
                        }
                        _ = tokio::time::sleep(Duration::from_millis(100)) => {
                            let connections = *active_connections.lock().await;
                            if connections == 0 {
                                info!("All connections closed, shutting down");
                                break;
                            }
                            debug!(connections, "Waiting for connections to close");
                        }
                    }
                }

                return Ok(());
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        debug!(peer = %peer, "Peer connected");
                        let ctx = Arc::clone(&ctx);
                        let active_connections = Arc::clone(&active_connections);

                        {
                            let mut count = active_connections.lock().await;
                            *count += 1;
                        }

                        tokio::spawn(async move {
                            if let Err(e) = handle_peer(stream, ctx).await {
                                global_metrics().protocol_error();
                                warn!(peer = %peer, error = %e, "Peer synchronization failed");
                            }

                            let mut count = active_connections.lock().await;
                            *count -= 1;
                            debug!(peer = %peer, "Peer disconnected");
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Error accepting connection");
                    }
                }
            }
        }
    }
}

/// Drive one synchronization pass over one connection.
async fn handle_peer(stream: TcpStream, ctx: Arc<SyncServerContext>) -> Result<()> {
    let mut framed = Framed::new(stream, PacketCodec);
    let mut task = ctx.new_task();
    let mut outbound: Vec<Envelope> = Vec::new();

    task.start(&mut outbound)?;
    flush(&mut framed, &ctx, &mut outbound).await?;

    while let Some(frame) = framed.next().await {
        let packet = frame?;
        global_metrics().message_received(packet.payload.len() as u64);
        let payload = packet.into_payload()?;
        let envelope = ctx.serverbound.decode(payload.into())?;

        if let Some(response) = envelope.downcast_ref::<KnownPacksResponse>() {
            task.handle_response(&response.packs, &mut outbound)?;
            flush(&mut framed, &ctx, &mut outbound).await?;
            debug!("Synchronization pass complete, closing connection");
            return Ok(());
        }
        if envelope.downcast_ref::<DiscardedPayload>().is_some() {
            debug!(id = %envelope.id, "Ignoring unknown serverbound payload");
            continue;
        }
        return Err(ProtocolError::UnexpectedMessage);
    }

    Err(ProtocolError::ConnectionClosed)
}

/// Encode, frame, and send every buffered envelope in order.
async fn flush(
    framed: &mut Framed<TcpStream, PacketCodec>,
    ctx: &SyncServerContext,
    outbound: &mut Vec<Envelope>,
) -> Result<()> {
    for envelope in outbound.drain(..) {
        let bytes = ctx.clientbound.encode(&envelope)?;
        let packet = Packet::from_payload(bytes.to_vec(), &ctx.transport)?;
        global_metrics().message_sent(packet.payload.len() as u64);
        framed.send(packet).await?;
    }
    Ok(())
}

/// Connect to a synchronization server.
///
/// # Errors
/// Returns connection errors from the underlying socket.
#[instrument]
pub async fn connect(addr: &str) -> Result<Framed<TcpStream, PacketCodec>> {
    let stream = TcpStream::connect(addr).await?;
    Ok(Framed::new(stream, PacketCodec))
}

/// What a client ends up with after one synchronization pass.
#[derive(Debug)]
pub struct SyncOutcome {
    /// Registry contents in arrival order.
    pub registries: Vec<RegistryData>,
    /// Tag sets from the final payload.
    pub tags: Vec<TagSet>,
    /// Unknown payloads consumed by the fallback along the way.
    pub discarded: usize,
}

/// Run the peer side of a synchronization pass.
///
/// Responds to the server's known-pack request with the intersection of
/// the request and `local_packs`, then collects registry data until the
/// tag payload arrives.
///
/// # Errors
/// - `ProtocolError::Timeout` if the server goes quiet mid-pass
/// - `ProtocolError::ConnectionClosed` if the stream ends early
/// - codec errors for malformed payloads
#[instrument(skip(local_packs, clientbound, serverbound, transport))]
pub async fn run_client(
    addr: &str,
    local_packs: &[KnownPack],
    clientbound: &PayloadTypeRegistry,
    serverbound: &PayloadTypeRegistry,
    transport: &TransportConfig,
) -> Result<SyncOutcome> {
    let mut framed = connect(addr).await?;

    let mut registries = Vec::new();
    let mut discarded = 0usize;

    loop {
        let frame = with_timeout(RESPONSE_TIMEOUT, framed.next())
            .await?
            .ok_or(ProtocolError::ConnectionClosed)?;
        let packet = frame?;
        global_metrics().message_received(packet.payload.len() as u64);
        let payload = packet.into_payload()?;
        let envelope = clientbound.decode(payload.into())?;

        let envelope = match envelope.downcast::<KnownPacksRequest>() {
            Ok(request) => {
                let claimed: Vec<KnownPack> = request
                    .packs
                    .iter()
                    .filter(|pack| local_packs.contains(pack))
                    .cloned()
                    .collect();
                debug!(
                    offered = request.packs.len(),
                    claimed = claimed.len(),
                    "Answering known-pack request"
                );
                let response = Envelope::new(
                    KnownPacksResponse::type_id(),
                    KnownPacksResponse { packs: claimed },
                );
                let bytes = serverbound.encode(&response)?;
                let packet = Packet::from_payload(bytes.to_vec(), transport)?;
                global_metrics().message_sent(packet.payload.len() as u64);
                framed.send(packet).await?;
                continue;
            }
            Err(envelope) => envelope,
        };

        let envelope = match envelope.downcast::<RegistryData>() {
            Ok(data) => {
                debug!(registry = %data.registry, entries = data.entries.len(), "Registry received");
                registries.push(data);
                continue;
            }
            Err(envelope) => envelope,
        };

        match envelope.downcast::<UpdateTags>() {
            Ok(tags) => {
                // Tag data is always the final payload of a pass.
                return Ok(SyncOutcome {
                    registries,
                    tags: tags.sets,
                    discarded,
                });
            }
            Err(envelope) => {
                if envelope.downcast_ref::<DiscardedPayload>().is_some() {
                    discarded += 1;
                    continue;
                }
                return Err(ProtocolError::UnexpectedMessage);
            }
        }
    }
}
