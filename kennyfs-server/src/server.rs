//! The single-threaded event-loop server (spec.md §4.C), mapped onto a
//! current-thread Tokio runtime: the runtime's reactor *is* the readiness
//! wait of spec.md step 3, and each connection is one spawned task that is
//! never polled concurrently with another on a single-threaded runtime —
//! the exact "no request is processed concurrently with another" guarantee
//! spec.md §5 requires, without hand-rolling `select(2)` over raw fds.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kennyfs_core::backend::Backend;
use kennyfs_core::connection::Connection;
use kennyfs_core::context::Context;
use kennyfs_wire::SOP;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::handlers::{dispatch, HandlerOutcome};

/// Upper bound on the scratch buffer used for one non-blocking-equivalent
/// `read` per readable event (spec.md §4.C step 5: "perform one non-blocking
/// receive into a scratch buffer and fold the bytes into RX"). Each read is
/// additionally capped to `conn.rx.free()` so the fold into RX can never
/// overflow it, regardless of how large a single legal frame's body is.
const RECV_SCRATCH_LEN: usize = 8192;

/// Runs the server until a fatal listen-socket error occurs. Binds to
/// `127.0.0.1:{cfg.listen_port}` and spawns one task per accepted
/// connection; `backend` is shared (via `Arc`) across every connection, as
/// spec.md's "backend operations" are a set of calls every handler
/// invokes, not per-connection state.
pub async fn run<B: Backend + 'static>(cfg: Arc<Config>, backend: Arc<B>) -> Result<()> {
    let addr = (std::net::Ipv4Addr::LOCALHOST, cfg.listen_port);
    let listener = TcpListener::bind(addr).await?;
    info!(port = cfg.listen_port, buf_cap = cfg.buf_cap, "kennyfs-server listening");

    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%err, "accept failed, continuing");
                continue;
            }
        };

        if cfg.max_connections != 0 && active_connections.load(Ordering::Relaxed) >= cfg.max_connections {
            warn!(%peer, max_connections = cfg.max_connections, "rejecting connection: at capacity");
            drop(socket);
            continue;
        }

        active_connections.fetch_add(1, Ordering::Relaxed);
        info!(%peer, "accepted connection");

        let backend = Arc::clone(&backend);
        let buf_cap = cfg.buf_cap;
        let active_connections = Arc::clone(&active_connections);
        tokio::spawn(async move {
            handle_connection(socket, peer, backend.as_ref(), buf_cap).await;
            active_connections.fetch_sub(1, Ordering::Relaxed);
            info!(%peer, "connection closed");
        });
    }
}

/// Drives one connection to completion: send the SOP handshake, then
/// alternate between filling RX from the socket, draining the framer, and
/// flushing whatever handlers queued onto TX. Returns when the client
/// disconnects, sends `quit`, or the connection is poisoned by a protocol
/// violation.
async fn handle_connection<B: Backend>(mut socket: TcpStream, peer: std::net::SocketAddr, backend: &B, buf_cap: usize) {
    if let Err(err) = socket.write_all(SOP).await {
        warn!(%peer, %err, "failed to send SOP handshake");
        return;
    }

    let mut conn = Connection::<B::DirHandle>::new(buf_cap);
    let ctx = Context::default();
    let mut scratch = vec![0u8; RECV_SCRATCH_LEN];

    loop {
        if conn.rx.free() == 0 {
            // Backpressure (spec.md §4.C): RX is full, meaning the client is
            // outrunning its own reply consumption. A cooperative per-task
            // model has no "skip this cycle's recv" primitive the way a
            // shared-fd select() loop does; the documented divergence is
            // closing the connection instead of stalling the read
            // indefinitely (see DESIGN.md).
            warn!(%peer, "RX ring full, closing connection");
            return;
        }

        let recv_cap = conn.rx.free().min(RECV_SCRATCH_LEN);
        let n = match socket.read(&mut scratch[..recv_cap]).await {
            Ok(0) => {
                debug!(%peer, "EOF from client");
                return;
            }
            Ok(n) => n,
            Err(err) => {
                warn!(%peer, %err, "recv failed, closing connection");
                return;
            }
        };

        if conn.rx.write(&scratch[..n]).is_err() {
            warn!(%peer, "RX ring overflowed mid-fold, closing connection");
            return;
        }

        loop {
            match conn.framer.try_next(&mut conn.rx, conn.max_body_len()) {
                Ok(Some(req)) => match dispatch(&mut conn, backend, &ctx, req.op, &req.body) {
                    HandlerOutcome::Continue => {}
                    HandlerOutcome::Close => {
                        flush_tx(&mut socket, &mut conn).await;
                        return;
                    }
                },
                Ok(None) => break,
                Err(err) => {
                    warn!(%peer, %err, "protocol violation, closing connection without a reply");
                    return;
                }
            }
        }

        if !flush_tx(&mut socket, &mut conn).await {
            return;
        }
    }
}

/// Drains `conn`'s TX ring onto the socket in one write, matching "the
/// event loop drains the TX ring with one send when the socket is
/// writable; if the queued bytes wrap across the ring end, they are copied
/// into a scratch buffer for one contiguous send" (spec.md §4.B). Returns
/// `false` if the write failed, signaling the caller to close the
/// connection.
async fn flush_tx<D>(socket: &mut TcpStream, conn: &mut Connection<D>) -> bool {
    let mut scratch = Vec::new();
    let pending_len = {
        let view = conn.tx.peek_contiguous(&mut scratch);
        if view.is_empty() {
            return true;
        }
        let len = view.len();
        if let Err(err) = socket.write_all(view).await {
            warn!(%err, "send failed, closing connection");
            return false;
        }
        len
    };
    conn.tx.consume(pending_len);
    true
}
