//! The server-side operation handler table (spec.md §4.D): decode argument,
//! invoke the backend operation, encode reply. One `match` arm per
//! catalogued [`Request`] variant stands in for the historical fixed-size
//! array of function pointers — `decode_request` already rejected anything
//! outside the dense op-id range or with the wrong body shape, so this
//! function only ever sees a well-formed request.

use kennyfs_core::backend::Backend;
use kennyfs_core::connection::Connection;
use kennyfs_core::context::Context;
use kennyfs_core::errno::Errno;
use kennyfs_core::handles::DirHandle;
use kennyfs_core::ops::{decode_request, encode_dir_entry, encode_reply_open, encode_reply_stat, Request};
use kennyfs_core::reply::{new_reply_buf, stamp_header};
use kennyfs_wire::OpId;
use tracing::{debug, warn};

/// The three dispositions spec.md §4.D describes as zero/positive/negative
/// handler status: continue serving this connection, or close it. `Close`
/// covers both the graceful `quit` path and the fatal "reply does not fit
/// in TX" path — the distinction between the two is only in what gets
/// logged, not in what the connection does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Continue,
    Close,
}

/// Dispatches one decoded request frame against `backend`, writing the
/// encoded reply onto `conn`'s TX ring. `quit` is intercepted before
/// decoding reaches the backend at all — it carries no backend operation
/// and spec.md's catalogue gives it no reply body, only "(triggers
/// disconnection)".
pub fn dispatch<B: Backend>(conn: &mut Connection<B::DirHandle>, backend: &B, ctx: &Context, op: OpId, body: &[u8]) -> HandlerOutcome {
    if op == OpId::Quit {
        debug!("quit received, closing connection");
        return HandlerOutcome::Close;
    }

    let mut reply_buf = new_reply_buf();
    // `reply_buf` already carries the 8 reserved header bytes, so the cap
    // handlers fill against is the ring capacity itself, not capacity minus
    // the header — subtracting it again would under-fill every reply by 8.
    let max_reply_len = conn.buf_cap();
    let return_code: i64 = match decode_request(op, body) {
        Ok(request) => match handle_request(conn, backend, ctx, request, &mut reply_buf, max_reply_len) {
            Ok(code) => code,
            Err(errno) => -i64::from(errno),
        },
        Err(errno) => -i64::from(errno),
    };
    stamp_header(&mut reply_buf, return_code);

    match conn.tx.write(&reply_buf) {
        Ok(()) => HandlerOutcome::Continue,
        Err(_) => {
            warn!(?op, "reply does not fit in the TX ring, closing connection");
            HandlerOutcome::Close
        }
    }
}

/// Invokes the backend operation matching `request`, appending its encoded
/// reply body to `reply_buf` (which already carries the 8 reserved header
/// bytes) and returning the wire return code on success. Every operation
/// returns `0` on success, except `write`, whose return code carries the
/// number of bytes written (spec.md §4.D).
fn handle_request<B: Backend>(
    conn: &mut Connection<B::DirHandle>,
    backend: &B,
    ctx: &Context,
    request: Request,
    reply_buf: &mut Vec<u8>,
    max_reply_len: usize,
) -> Result<i64, Errno> {
    match request {
        Request::Quit => unreachable!("intercepted by dispatch before decoding"),
        Request::Getattr { path } => {
            let stat = backend.getattr(ctx, &path)?;
            reply_buf.extend_from_slice(&encode_reply_stat(&stat));
            Ok(0)
        }
        Request::Readlink { path } => {
            let target = backend.readlink(ctx, &path)?;
            reply_buf.extend_from_slice(&target);
            Ok(0)
        }
        Request::Mknod { mode, path } => {
            backend.mknod(ctx, &path, mode)?;
            Ok(0)
        }
        Request::Mkdir { mode, path } => {
            backend.mkdir(ctx, &path, mode)?;
            Ok(0)
        }
        Request::Unlink { path } => {
            backend.unlink(ctx, &path)?;
            Ok(0)
        }
        Request::Rmdir { path } => {
            backend.rmdir(ctx, &path)?;
            Ok(0)
        }
        Request::Symlink { target, linkpath } => {
            backend.symlink(ctx, &target, &linkpath)?;
            Ok(0)
        }
        Request::Rename { from, to } => {
            backend.rename(ctx, &from, &to)?;
            Ok(0)
        }
        Request::Link { oldpath, newpath } => {
            backend.link(ctx, &oldpath, &newpath)?;
            Ok(0)
        }
        Request::Chmod { mode, path } => {
            backend.chmod(ctx, &path, mode)?;
            Ok(0)
        }
        Request::Chown { uid, gid, path } => {
            backend.chown(ctx, &path, uid, gid)?;
            Ok(0)
        }
        Request::Truncate { offset, path } => {
            backend.truncate(ctx, &path, offset)?;
            Ok(0)
        }
        Request::Open { flags, path } => {
            let open = backend.open(ctx, &path, flags)?;
            reply_buf.extend_from_slice(&encode_reply_open(&open));
            Ok(0)
        }
        Request::Create { flags, mode, path } => {
            let open = backend.create(ctx, &path, flags, mode)?;
            reply_buf.extend_from_slice(&encode_reply_open(&open));
            Ok(0)
        }
        Request::Read { fh, len, offset } => {
            let data = backend.read(ctx, fh, offset, len)?;
            reply_buf.extend_from_slice(&data);
            Ok(0)
        }
        Request::Write { fh, offset, data } => {
            let written = backend.write(ctx, fh, offset, &data)?;
            Ok(i64::from(written))
        }
        Request::Flush { fh } => {
            backend.flush(ctx, fh)?;
            Ok(0)
        }
        Request::Release { fh } => {
            backend.release(ctx, fh)?;
            Ok(0)
        }
        Request::Fsync { fh, datasync } => {
            backend.fsync(ctx, fh, datasync)?;
            Ok(0)
        }
        Request::Opendir { path } => {
            let backend_dh = backend.opendir(ctx, &path)?;
            let wire_handle = conn.dirs.insert(backend_dh);
            reply_buf.extend_from_slice(&wire_handle.to_wire());
            Ok(0)
        }
        Request::Readdir { dh, offset } => {
            let handle = DirHandle::from_wire(&dh);
            let backend_dh = conn.dirs.get(handle)?;
            // `readdir returns with what it has`: the filler stops accepting
            // entries once the reply would no longer fit this connection's
            // ring, rather than growing the reply unboundedly.
            let mut would_overflow = false;
            backend.readdir(ctx, backend_dh, offset, &mut |entry| {
                let mut encoded = Vec::new();
                encode_dir_entry(&mut encoded, &entry);
                if reply_buf.len() + encoded.len() > max_reply_len {
                    would_overflow = true;
                    return false;
                }
                reply_buf.extend_from_slice(&encoded);
                true
            })?;
            Ok(0)
        }
        Request::Releasedir { dh } => {
            let handle = DirHandle::from_wire(&dh);
            let backend_dh = conn.dirs.remove(handle)?;
            backend.releasedir(ctx, backend_dh)?;
            Ok(0)
        }
        Request::Fgetattr { fh } => {
            let stat = backend.fgetattr(ctx, fh)?;
            reply_buf.extend_from_slice(&encode_reply_stat(&stat));
            Ok(0)
        }
        Request::Utimens { times, path } => {
            backend.utimens(ctx, &path, times)?;
            Ok(0)
        }
    }
}
