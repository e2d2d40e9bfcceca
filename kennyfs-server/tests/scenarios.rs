//! End-to-end scenarios from spec.md §8 ("Concrete scenarios"), driven over
//! real loopback TCP against `kennyfs-backend-memory`, in the style of the
//! teacher's `tests/tcp_basic.rs`: spawn the server on an ephemeral port,
//! connect with a plain `TcpStream`, assert on wire bytes.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use kennyfs_backend_memory::MemoryBackend;
use kennyfs_wire::frame::{decode_reply_header, encode_request_header};
use kennyfs_wire::{OpId, SOP};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

async fn spawn_server(buf_cap: usize) -> u16 {
    let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let cfg = Arc::new(kennyfs_server::Config {
        listen_port: port,
        buf_cap,
        max_connections: 0,
        logging: kennyfs_server::config::LoggingConfig::default(),
    });
    let backend = Arc::new(MemoryBackend::new());
    tokio::spawn(async move {
        let _ = kennyfs_server::run(cfg, backend).await;
    });
    // Give the listener a moment to bind.
    tokio::time::sleep(Duration::from_millis(50)).await;
    port
}

async fn connect_and_handshake(port: u16) -> TcpStream {
    let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.unwrap();
    let mut sop = vec![0u8; SOP.len()];
    timeout(Duration::from_secs(1), stream.read_exact(&mut sop)).await.unwrap().unwrap();
    assert_eq!(sop, SOP);
    stream.write_all(SOP).await.unwrap();
    stream
}

/// Scenario 1: getattr on an existing root replies with a full stat body.
#[tokio::test]
async fn scenario_getattr_root() {
    let port = spawn_server(65536).await;
    let mut stream = connect_and_handshake(port).await;

    let mut req = Vec::new();
    encode_request_header(&mut req, OpId::Getattr, 1);
    req.extend_from_slice(b"/");
    stream.write_all(&req).await.unwrap();

    let mut header = [0u8; kennyfs_core::reply::REPLY_HEADER_LEN];
    timeout(Duration::from_secs(1), stream.read_exact(&mut header)).await.unwrap().unwrap();
    let hdr = decode_reply_header(&header).unwrap();
    assert_eq!(hdr.return_code, 0);
    assert_eq!(hdr.body_len, kennyfs_wire::STAT_WIRE_LEN as u32);
}

/// Scenario 2: quit closes the connection with no reply bytes at all.
#[tokio::test]
async fn scenario_quit_closes_with_no_reply() {
    let port = spawn_server(65536).await;
    let mut stream = connect_and_handshake(port).await;

    let mut req = Vec::new();
    encode_request_header(&mut req, OpId::Quit, 0);
    stream.write_all(&req).await.unwrap();

    let mut byte = [0u8; 1];
    let n = timeout(Duration::from_secs(1), stream.read(&mut byte)).await.unwrap().unwrap();
    assert_eq!(n, 0);
}

/// Scenario 3: a malformed rename (non-NUL separator) gets `-EINVAL` and
/// the connection stays open for a follow-up request.
#[tokio::test]
async fn scenario_malformed_rename_gets_einval_and_stays_open() {
    let port = spawn_server(65536).await;
    let mut stream = connect_and_handshake(port).await;

    let mut body = Vec::new();
    kennyfs_wire::integers::put_u32(&mut body, 3);
    body.extend_from_slice(b"abc");
    body.push(b'X');
    body.extend_from_slice(b"xyz");
    let mut req = Vec::new();
    encode_request_header(&mut req, OpId::Rename, body.len() as u32);
    req.extend_from_slice(&body);
    stream.write_all(&req).await.unwrap();

    let mut header = [0u8; kennyfs_core::reply::REPLY_HEADER_LEN];
    timeout(Duration::from_secs(1), stream.read_exact(&mut header)).await.unwrap().unwrap();
    let hdr = decode_reply_header(&header).unwrap();
    assert_eq!(hdr.return_code, -libc::EINVAL);
    assert_eq!(hdr.body_len, 0);

    // Connection remains open: a follow-up getattr still gets served.
    let mut req = Vec::new();
    encode_request_header(&mut req, OpId::Getattr, 1);
    req.extend_from_slice(b"/");
    stream.write_all(&req).await.unwrap();
    let mut header = [0u8; kennyfs_core::reply::REPLY_HEADER_LEN];
    timeout(Duration::from_secs(1), stream.read_exact(&mut header)).await.unwrap().unwrap();
    assert_eq!(decode_reply_header(&header).unwrap().return_code, 0);
}

/// Scenario 4: an announced body length exceeding `BUF_CAP - 2` poisons the
/// connection; the server closes it without replying.
#[tokio::test]
async fn scenario_oversize_body_poisons_connection() {
    let buf_cap = 4096usize;
    let port = spawn_server(buf_cap).await;
    let mut stream = connect_and_handshake(port).await;

    let mut req = Vec::new();
    encode_request_header(&mut req, OpId::Read, buf_cap as u32);
    stream.write_all(&req).await.unwrap();

    let mut byte = [0u8; 1];
    let n = timeout(Duration::from_secs(1), stream.read(&mut byte)).await.unwrap().unwrap();
    assert_eq!(n, 0, "oversize body must close the connection without a reply");
}

/// Scenario 5: opendir / readdir / releasedir lifecycle over the wire.
#[tokio::test]
async fn scenario_directory_lifecycle() {
    let port = spawn_server(65536).await;
    let mut stream = connect_and_handshake(port).await;

    let mut req = Vec::new();
    encode_request_header(&mut req, OpId::Opendir, 1);
    req.extend_from_slice(b"/");
    stream.write_all(&req).await.unwrap();
    let mut header = [0u8; kennyfs_core::reply::REPLY_HEADER_LEN];
    stream.read_exact(&mut header).await.unwrap();
    let hdr = decode_reply_header(&header).unwrap();
    assert_eq!(hdr.return_code, 0);
    assert_eq!(hdr.body_len, 8);
    let mut dh = [0u8; 8];
    stream.read_exact(&mut dh).await.unwrap();

    let mut body = Vec::new();
    body.extend_from_slice(&dh);
    kennyfs_wire::integers::put_u64(&mut body, 0);
    let mut req = Vec::new();
    encode_request_header(&mut req, OpId::Readdir, body.len() as u32);
    req.extend_from_slice(&body);
    stream.write_all(&req).await.unwrap();
    let mut header = [0u8; kennyfs_core::reply::REPLY_HEADER_LEN];
    stream.read_exact(&mut header).await.unwrap();
    let hdr = decode_reply_header(&header).unwrap();
    assert_eq!(hdr.return_code, 0);
    let mut readdir_body = vec![0u8; hdr.body_len as usize];
    stream.read_exact(&mut readdir_body).await.unwrap();

    let mut req = Vec::new();
    encode_request_header(&mut req, OpId::Releasedir, 8);
    req.extend_from_slice(&dh);
    stream.write_all(&req).await.unwrap();
    let mut header = [0u8; kennyfs_core::reply::REPLY_HEADER_LEN];
    stream.read_exact(&mut header).await.unwrap();
    let hdr = decode_reply_header(&header).unwrap();
    assert_eq!(hdr.return_code, 0);
    assert_eq!(hdr.body_len, 0);
}

/// Scenario 6: two concurrent clients each drive many getattr requests;
/// every reply lands on the connection that asked for it.
#[tokio::test]
async fn scenario_two_concurrent_clients_no_crosstalk() {
    let port = spawn_server(65536).await;

    async fn run_client(port: u16, count: usize) {
        let mut stream = connect_and_handshake(port).await;
        for _ in 0..count {
            let mut req = Vec::new();
            encode_request_header(&mut req, OpId::Getattr, 1);
            req.extend_from_slice(b"/");
            stream.write_all(&req).await.unwrap();
            let mut header = [0u8; kennyfs_core::reply::REPLY_HEADER_LEN];
            stream.read_exact(&mut header).await.unwrap();
            let hdr = decode_reply_header(&header).unwrap();
            assert_eq!(hdr.return_code, 0);
            let mut body = vec![0u8; hdr.body_len as usize];
            stream.read_exact(&mut body).await.unwrap();
        }
    }

    let a = tokio::spawn(run_client(port, 50));
    let b = tokio::spawn(run_client(port, 50));
    a.await.unwrap();
    b.await.unwrap();
}
