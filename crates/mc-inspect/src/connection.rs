//! TCP accept loop and per-connection read loop.
//!
//! Every accepted connection gets its own Tokio task and its own
//! [`PacketDecoder`].  The task reads whatever the client sends into a
//! pending buffer, hands each complete packet to the decoder, and logs the
//! resulting event.  Nothing is ever written back to the client.
//!
//! A packet is only handed to the decoder once all of its bytes have arrived:
//!
//! - framed packets are measured with [`complete_frame_len`] first;
//! - a legacy probe carries no outer length, so it is simply retried each time
//!   more bytes arrive until it stops failing with `Truncated`.
//!
//! The first decode error ends the connection.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use mc_core::protocol::frame::complete_frame_len;
use mc_core::protocol::legacy::is_legacy_probe;
use mc_core::{DecodeError, DecoderConfig, Event, PacketDecoder, SecretDecryptor};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::InspectConfig;
use crate::decryptor::UnconfiguredDecryptor;

/// Bytes requested from the socket per read.
const READ_CHUNK: usize = 4096;

/// How often the accept loop wakes up to check the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Reasons a connection is closed by the inspector.
#[derive(Debug, Error)]
pub enum InspectError {
    /// Reading from the socket failed.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client sent bytes the decoder rejected.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An incomplete packet grew past the configured limit.
    #[error("{buffered} bytes buffered without a complete packet (limit {limit})")]
    BufferLimit { buffered: usize, limit: usize },
}

// ── Accept loop ───────────────────────────────────────────────────────────────

/// Binds the configured address and runs [`serve_listener`] on it.
///
/// # Errors
///
/// Returns an error if the listen address is invalid or cannot be bound.
pub async fn serve(config: InspectConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let addr = config.network.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind listener on {addr}"))?;

    serve_listener(listener, config, running).await
}

/// Runs the accept loop on an already bound listener until `running` is
/// cleared.
///
/// Only the `[network] max_buffered_bytes` and `[protocol]` settings are
/// used; the listen address is whatever `listener` is bound to.
///
/// # Errors
///
/// Returns an error if the listener's local address cannot be read.
pub async fn serve_listener(
    listener: TcpListener,
    config: InspectConfig,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let addr = listener
        .local_addr()
        .context("failed to read listener address")?;

    info!(
        "listening on {addr}, accepting protocols {:?}",
        config.protocol.accepted_protocols
    );

    let decoder_config = Arc::new(config.protocol);
    let decryptor: Arc<dyn SecretDecryptor> = Arc::new(UnconfiguredDecryptor);
    let max_buffered = config.network.max_buffered_bytes;

    while running.load(Ordering::Relaxed) {
        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                info!("connection opened: {peer}");
                let decoder =
                    PacketDecoder::new(DecoderConfig::clone(&decoder_config), Arc::clone(&decryptor));
                tokio::spawn(handle_connection(stream, peer, decoder, max_buffered));
            }
            Ok(Err(e)) => error!("accept error: {e}"),
            Err(_) => {}
        }
    }

    info!("shutdown flag set; stopping accept loop");
    Ok(())
}

/// Drives one connection to completion and logs how it ended.
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    mut decoder: PacketDecoder,
    max_buffered: usize,
) {
    let log_event = |event: &Event| match serde_json::to_string(event) {
        Ok(json) => info!(%peer, kind = event.kind(), event = %json, "decoded event"),
        Err(e) => warn!(%peer, "could not render event: {e}"),
    };

    match inspect_stream(&mut stream, &mut decoder, max_buffered, log_event).await {
        Ok(count) => info!(
            %peer,
            events = count,
            state = %decoder.state(),
            "connection closed"
        ),
        Err(e) => warn!(
            %peer,
            state = %decoder.state(),
            "connection closed with error: {e}"
        ),
    }
}

// ── Read loop ─────────────────────────────────────────────────────────────────

/// Reads `reader` to end of stream, decoding every complete packet.
///
/// `on_event` is called once per decoded packet, in wire order.  Returns the
/// number of events decoded.  Bytes of an unfinished packet still buffered at
/// end of stream are discarded.
///
/// # Errors
///
/// Stops at the first I/O or decode error, or when more than `max_buffered`
/// bytes are waiting without forming a complete packet.
pub async fn inspect_stream<R, F>(
    mut reader: R,
    decoder: &mut PacketDecoder,
    max_buffered: usize,
    mut on_event: F,
) -> Result<usize, InspectError>
where
    R: AsyncRead + Unpin,
    F: FnMut(&Event),
{
    let mut pending = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut decoded = 0;

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            if !pending.is_empty() {
                debug!(
                    unconsumed = pending.len(),
                    "end of stream inside a packet"
                );
            }
            return Ok(decoded);
        }
        pending.extend_from_slice(&chunk[..n]);

        decoded += drain_complete(&mut pending, decoder, &mut on_event)?;

        if pending.len() > max_buffered {
            return Err(InspectError::BufferLimit {
                buffered: pending.len(),
                limit: max_buffered,
            });
        }
    }
}

/// Decodes every complete packet at the front of `pending` and removes its
/// bytes.  Returns how many packets were decoded.
fn drain_complete<F>(
    pending: &mut Vec<u8>,
    decoder: &mut PacketDecoder,
    on_event: &mut F,
) -> Result<usize, DecodeError>
where
    F: FnMut(&Event),
{
    let mut consumed = 0;
    let mut decoded = 0;

    while consumed < pending.len() {
        let buf = &pending[consumed..];

        let packet_len = if is_legacy_probe(buf) {
            match decoder.decode(buf) {
                Ok((rest, event)) => {
                    on_event(&event);
                    buf.len() - rest.len()
                }
                Err(DecodeError::Truncated { .. }) => break,
                Err(e) => return Err(e),
            }
        } else {
            let Some(len) = complete_frame_len(buf)? else {
                break;
            };
            let (_, event) = decoder.decode(&buf[..len])?;
            on_event(&event);
            len
        };

        consumed += packet_len;
        decoded += 1;
    }

    pending.drain(..consumed);
    Ok(decoded)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
