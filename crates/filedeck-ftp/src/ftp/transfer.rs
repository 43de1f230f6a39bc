//! Data-channel management for FTP transfers.
//!
//! Supports four modes (RFC 959 + RFC 2428):
//! - **PASV**: server opens a port, client connects
//! - **EPSV**: extended passive (IPv6-ready)
//! - **PORT**: client opens a port, tells server
//! - **EPRT**: extended active (IPv6-ready)
//!
//! Opening a channel is split in two. `prepare` runs before the transfer
//! command (passive modes connect, active modes bind and announce), and
//! `PendingData::establish` runs after the server's preliminary reply
//! (active modes accept, FTPS wraps the socket in TLS). The server only
//! connects, and only starts its TLS handshake, once it has the command.

use crate::ftp::error::data_channel;
use crate::ftp::protocol::FtpCodec;
use crate::ftp::tls::FtpTls;
use crate::ftp::types::DataChannelMode;
use filedeck_core::{ByteSink, ByteSource, RemoteError, RemoteResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tokio_rustls::client::TlsStream;

lazy_static! {
    static ref PASV_RE: Regex = Regex::new(r"(\d+),\s*(\d+),\s*(\d+),\s*(\d+),\s*(\d+),\s*(\d+)")
        .expect("valid PASV pattern");
    static ref EPSV_RE: Regex = Regex::new(r"\(\D{3}(\d+)\D\)").expect("valid EPSV pattern");
}

/// A plain or TLS-wrapped data stream.
pub enum DataStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

/// A data channel between `prepare` and `establish`.
pub enum PendingData {
    Connected(TcpStream),
    Listening(TcpListener),
}

/// Everything `prepare` needs from the client.
pub struct DataChannelParams<'a> {
    pub mode: DataChannelMode,
    pub host: &'a str,
    /// Server address of the control connection.
    pub control_peer: Option<IpAddr>,
    /// Our address on the control connection; announced in PORT/EPRT.
    pub control_local: Option<IpAddr>,
    pub timeout: Duration,
    pub active_bind: Option<&'a str>,
}

pub async fn prepare(codec: &mut FtpCodec, params: &DataChannelParams<'_>) -> RemoteResult<PendingData> {
    match params.mode {
        DataChannelMode::Passive => open_pasv(codec, params).await.map(PendingData::Connected),
        DataChannelMode::ExtendedPassive => open_epsv(codec, params).await.map(PendingData::Connected),
        DataChannelMode::Active => open_port(codec, params).await.map(PendingData::Listening),
        DataChannelMode::ExtendedActive => open_eprt(codec, params).await.map(PendingData::Listening),
    }
}

impl PendingData {
    /// Finish opening the channel once the server has the command.
    pub async fn establish(self, tls: Option<&FtpTls>, data_timeout: Duration) -> RemoteResult<DataStream> {
        let tcp = match self {
            PendingData::Connected(tcp) => tcp,
            PendingData::Listening(listener) => {
                let (tcp, _) = timeout(data_timeout, listener.accept())
                    .await
                    .map_err(|_| data_channel("Active-mode accept timed out"))?
                    .map_err(|e| data_channel(format!("Active-mode accept failed: {}", e)))?;
                tcp
            }
        };
        match tls {
            Some(tls) => {
                let stream = timeout(data_timeout, tls.wrap_data(tcp))
                    .await
                    .map_err(|_| data_channel("Data channel TLS handshake timed out"))??;
                Ok(DataStream::Tls(Box::new(stream)))
            }
            None => Ok(DataStream::Plain(tcp)),
        }
    }
}

impl DataStream {
    pub async fn read_to_end(self) -> RemoteResult<Vec<u8>> {
        let mut buf = Vec::new();
        let read = match self {
            DataStream::Plain(mut tcp) => tcp.read_to_end(&mut buf).await,
            DataStream::Tls(mut tls) => tls.read_to_end(&mut buf).await,
        };
        read.map_err(|e| RemoteError::transfer(format!("Listing transfer failed: {}", e)))?;
        Ok(buf)
    }

    /// Copy the whole stream into `sink`.
    pub async fn copy_to(self, sink: &mut ByteSink<'_>) -> std::io::Result<u64> {
        let copied = match self {
            DataStream::Plain(mut tcp) => tokio::io::copy(&mut tcp, &mut *sink).await?,
            DataStream::Tls(mut tls) => tokio::io::copy(&mut *tls, &mut *sink).await?,
        };
        sink.flush().await?;
        Ok(copied)
    }

    /// Copy `source` into the stream and close it, which signals
    /// end-of-file to the server.
    pub async fn copy_from(self, source: &mut ByteSource<'_>) -> std::io::Result<u64> {
        match self {
            DataStream::Plain(mut tcp) => {
                let n = tokio::io::copy(&mut *source, &mut tcp).await?;
                tcp.shutdown().await?;
                Ok(n)
            }
            DataStream::Tls(mut tls) => {
                let n = tokio::io::copy(&mut *source, &mut *tls).await?;
                tls.shutdown().await?;
                Ok(n)
            }
        }
    }
}

async fn connect_data(addr: SocketAddr, data_timeout: Duration, label: &str) -> RemoteResult<TcpStream> {
    timeout(data_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| data_channel(format!("{} data connect timed out", label)))?
        .map_err(|e| data_channel(format!("{} data connect to {} failed: {}", label, addr, e)))
}

// ─── PASV ────────────────────────────────────────────────────────────

/// Issue `PASV`, parse the response, connect to the returned address.
///
/// Response format: `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`
async fn open_pasv(codec: &mut FtpCodec, params: &DataChannelParams<'_>) -> RemoteResult<TcpStream> {
    let resp = codec.expect_ok("PASV").await?;
    let mut addr = parse_pasv_response(&resp.text())?;
    // Servers behind NAT often announce an unroutable address.
    if addr.ip().is_unspecified() || is_private_mismatch(addr.ip(), params.control_peer) {
        if let Some(peer) = params.control_peer {
            addr.set_ip(peer);
        }
    }
    connect_data(addr, params.timeout, "PASV").await
}

fn is_private_mismatch(announced: IpAddr, peer: Option<IpAddr>) -> bool {
    match (announced, peer) {
        (IpAddr::V4(a), Some(IpAddr::V4(p))) => a.is_private() && !p.is_private() && !p.is_loopback(),
        _ => false,
    }
}

/// Parse `(h1,h2,h3,h4,p1,p2)` from a 227 response.
pub(crate) fn parse_pasv_response(text: &str) -> RemoteResult<SocketAddr> {
    let caps = PASV_RE
        .captures(text)
        .ok_or_else(|| RemoteError::protocol(format!("Cannot parse PASV reply: {}", text)))?;

    let mut nums = [0u8; 6];
    for (i, slot) in nums.iter_mut().enumerate() {
        *slot = caps[i + 1]
            .parse::<u8>()
            .map_err(|_| RemoteError::protocol(format!("PASV number out of range: {}", text)))?;
    }

    let ip = IpAddr::from([nums[0], nums[1], nums[2], nums[3]]);
    let port = u16::from(nums[4]) * 256 + u16::from(nums[5]);
    Ok(SocketAddr::new(ip, port))
}

// ─── EPSV ────────────────────────────────────────────────────────────

/// Issue `EPSV`, then connect to the control host on the returned port.
///
/// Response format: `229 Entering Extended Passive Mode (|||port|)`
async fn open_epsv(codec: &mut FtpCodec, params: &DataChannelParams<'_>) -> RemoteResult<TcpStream> {
    let resp = codec.expect_ok("EPSV").await?;
    let port = parse_epsv_response(&resp.text())?;
    let addr = match params.control_peer {
        Some(ip) => SocketAddr::new(ip, port),
        None => tokio::net::lookup_host((params.host, port))
            .await
            .map_err(|e| RemoteError::network(format!("Cannot resolve {}: {}", params.host, e)))?
            .next()
            .ok_or_else(|| RemoteError::network(format!("No address for {}", params.host)))?,
    };
    connect_data(addr, params.timeout, "EPSV").await
}

pub(crate) fn parse_epsv_response(text: &str) -> RemoteResult<u16> {
    let caps = EPSV_RE
        .captures(text)
        .ok_or_else(|| RemoteError::protocol(format!("Cannot parse EPSV reply: {}", text)))?;
    caps[1]
        .parse::<u16>()
        .map_err(|_| RemoteError::protocol(format!("EPSV port out of range: {}", text)))
}

// ─── PORT / EPRT ─────────────────────────────────────────────────────

async fn bind_listener(params: &DataChannelParams<'_>, label: &str) -> RemoteResult<(TcpListener, SocketAddr)> {
    let bind = params.active_bind.unwrap_or("0.0.0.0");
    let listener = TcpListener::bind(format!("{}:0", bind))
        .await
        .map_err(|e| data_channel(format!("{} bind failed: {}", label, e)))?;
    let local = listener
        .local_addr()
        .map_err(|e| data_channel(format!("{} local_addr failed: {}", label, e)))?;
    Ok((listener, local))
}

/// A wildcard bind is announced as the control connection's local address.
fn announce_address(local: SocketAddr, params: &DataChannelParams<'_>) -> Option<IpAddr> {
    if local.ip().is_unspecified() {
        params.control_local
    } else {
        Some(local.ip())
    }
}

/// Bind a local listener and announce it via `PORT`.
async fn open_port(codec: &mut FtpCodec, params: &DataChannelParams<'_>) -> RemoteResult<TcpListener> {
    let (listener, local) = bind_listener(params, "PORT").await?;
    let ip = match announce_address(local, params) {
        Some(IpAddr::V4(v4)) => v4,
        _ => return Err(data_channel("PORT requires an IPv4 local address")),
    };
    let octets = ip.octets();
    let port = local.port();
    let cmd = format!(
        "PORT {},{},{},{},{},{}",
        octets[0],
        octets[1],
        octets[2],
        octets[3],
        port / 256,
        port % 256
    );
    codec.expect_ok(&cmd).await?;
    Ok(listener)
}

/// Bind a local listener and announce it via `EPRT |af|ip|port|`.
async fn open_eprt(codec: &mut FtpCodec, params: &DataChannelParams<'_>) -> RemoteResult<TcpListener> {
    let (listener, local) = bind_listener(params, "EPRT").await?;
    let ip = announce_address(local, params)
        .ok_or_else(|| data_channel("EPRT needs the control connection's local address"))?;
    let af = match ip {
        IpAddr::V4(_) => 1,
        IpAddr::V6(_) => 2,
    };
    codec
        .expect_ok(&format!("EPRT |{}|{}|{}|", af, ip, local.port()))
        .await?;
    Ok(listener)
}
