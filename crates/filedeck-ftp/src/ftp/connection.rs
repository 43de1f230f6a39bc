//! Control connection: TCP connect under the configured timeout and the
//! server greeting.

use crate::ftp::error::from_reply;
use crate::ftp::protocol::FtpCodec;
use crate::ftp::types::{FtpConnectionConfig, FtpResponse};
use filedeck_core::{RemoteError, RemoteResult};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Establish the control connection and return the codec plus the
/// `220` welcome banner. AUTH TLS is issued by the client afterwards.
pub async fn connect(config: &FtpConnectionConfig) -> RemoteResult<(FtpCodec, FtpResponse)> {
    let addr = format!("{}:{}", config.host, config.port);
    let dur = Duration::from_secs(config.connect_timeout_sec);

    let tcp = timeout(dur, TcpStream::connect(&addr))
        .await
        .map_err(|_| RemoteError::network(format!("TCP connect to {} timed out", addr)))?
        .map_err(|e| RemoteError::network(format!("TCP connect to {} failed: {}", addr, e)))?;

    tcp.set_nodelay(true).ok();

    let mut codec = FtpCodec::from_tcp(tcp);
    let banner = timeout(dur, codec.read_response())
        .await
        .map_err(|_| RemoteError::network(format!("No greeting from {} within {:?}", addr, dur)))??;

    // 120 = "service ready in nnn minutes"; wait for the real greeting.
    let banner = if banner.code == 120 {
        timeout(dur, codec.read_response()).await??
    } else {
        banner
    };

    if banner.code != 220 {
        return Err(from_reply(banner.code, &banner.text()));
    }
    log::debug!("[ftp] {} greeting: {}", addr, banner.text());
    Ok((codec, banner))
}
