//! Low-level FTP command/response codec (RFC 959 §4).
//!
//! Handles:
//! - Sending FTP commands terminated with `\r\n`
//! - Reading single-line and multi-line replies
//! - Parsing the 3-digit reply code

use crate::ftp::error::from_reply;
use crate::ftp::types::FtpResponse;
use filedeck_core::{RemoteError, RemoteResult};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

/// Plain TCP or TLS-wrapped read half.
pub enum ReadHalf {
    Plain(BufReader<OwnedReadHalf>),
    Tls(BufReader<tokio::io::ReadHalf<TlsStream<TcpStream>>>),
}

/// Plain TCP or TLS-wrapped write half.
pub enum WriteHalf {
    Plain(OwnedWriteHalf),
    Tls(tokio::io::WriteHalf<TlsStream<TcpStream>>),
}

/// The FTP command/response codec operating on split halves.
pub struct FtpCodec {
    pub reader: ReadHalf,
    pub writer: WriteHalf,
}

impl FtpCodec {
    pub fn from_tcp(stream: TcpStream) -> Self {
        let (rd, wr) = stream.into_split();
        Self {
            reader: ReadHalf::Plain(BufReader::new(rd)),
            writer: WriteHalf::Plain(wr),
        }
    }

    pub fn from_tls(stream: TlsStream<TcpStream>) -> Self {
        let (rd, wr) = tokio::io::split(stream);
        Self {
            reader: ReadHalf::Tls(BufReader::new(rd)),
            writer: WriteHalf::Tls(wr),
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self.writer, WriteHalf::Tls(_))
    }

    /// Send a raw FTP command (CRLF is appended here).
    pub async fn send_command(&mut self, cmd: &str) -> RemoteResult<()> {
        let line = format!("{}\r\n", cmd);
        let written = match &mut self.writer {
            WriteHalf::Plain(w) => w.write_all(line.as_bytes()).await,
            WriteHalf::Tls(w) => match w.write_all(line.as_bytes()).await {
                Ok(()) => w.flush().await,
                Err(e) => Err(e),
            },
        };
        written.map_err(|e| RemoteError::network(format!("Control channel write failed: {}", e)))?;
        log::trace!(">>> {}", redact(cmd));
        Ok(())
    }

    /// Read a single line from the control channel (including CRLF).
    async fn read_line_raw(&mut self) -> RemoteResult<String> {
        let mut buf = String::new();
        let read = match &mut self.reader {
            ReadHalf::Plain(r) => r.read_line(&mut buf).await,
            ReadHalf::Tls(r) => r.read_line(&mut buf).await,
        };
        let n = read
            .map_err(|e| RemoteError::network(format!("Control channel read failed: {}", e)))?;
        if n == 0 {
            return Err(RemoteError::network("Server closed connection"));
        }
        Ok(buf)
    }

    /// Read a complete FTP response (possibly multi-line).
    ///
    /// Multi-line responses look like:
    /// ```text
    /// 220-Welcome to my FTP server
    /// 220-This is line 2
    /// 220 End of greeting
    /// ```
    pub async fn read_response(&mut self) -> RemoteResult<FtpResponse> {
        let first = self.read_line_raw().await?;
        let first_trimmed = first.trim_end_matches(['\r', '\n']);

        let code = parse_code(first_trimmed)?;
        let mut lines = vec![first_trimmed.to_string()];

        // "NNN-" means more lines follow until "NNN " is seen.
        let is_multi = first_trimmed.as_bytes().get(3) == Some(&b'-');
        if is_multi {
            let terminator = format!("{} ", code);
            loop {
                let next = self.read_line_raw().await?;
                let next_trimmed = next.trim_end_matches(['\r', '\n']);
                lines.push(next_trimmed.to_string());
                if next_trimmed.starts_with(&terminator) || next_trimmed == terminator.trim_end() {
                    break;
                }
            }
        }

        let resp = FtpResponse { code, lines };
        log::trace!("<<< {} {}", resp.code, resp.text());
        Ok(resp)
    }

    /// Send a command and return the response.
    pub async fn execute(&mut self, cmd: &str) -> RemoteResult<FtpResponse> {
        self.send_command(cmd).await?;
        self.read_response().await
    }

    /// Send a command and require a reply of the given class.
    pub async fn expect(&mut self, cmd: &str, expected_first_digit: u16) -> RemoteResult<FtpResponse> {
        let resp = self.execute(cmd).await?;
        if resp.code / 100 != expected_first_digit {
            return Err(from_reply(resp.code, &resp.text()));
        }
        Ok(resp)
    }

    /// Expect a 2xx reply.
    pub async fn expect_ok(&mut self, cmd: &str) -> RemoteResult<FtpResponse> {
        self.expect(cmd, 2).await
    }
}

/// Parse the 3-digit reply code from the start of a line.
pub(crate) fn parse_code(line: &str) -> RemoteResult<u16> {
    line.get(..3)
        .and_then(|c| c.parse::<u16>().ok())
        .filter(|c| (100..600).contains(c))
        .ok_or_else(|| RemoteError::protocol(format!("Invalid reply from server: '{}'", line)))
}

/// Keep passwords out of trace logs.
fn redact(cmd: &str) -> &str {
    if cmd.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("PASS ")) {
        "PASS ****"
    } else {
        cmd
    }
}
