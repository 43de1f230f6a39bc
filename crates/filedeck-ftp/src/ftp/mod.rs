//! FTP / FTPS client (RFC 959 with RFC 2228/4217 TLS, RFC 2389 FEAT,
//! RFC 2428 EPSV/EPRT and RFC 3659 MLSD/MLST/SIZE).
//!
//! Architecture:
//! - `types`: connection config, reply and feature types
//! - `error`: reply-code classification into `RemoteError`
//! - `protocol`: command/response codec over plain or TLS halves
//! - `connection`: control connection + banner
//! - `tls`: rustls client config, AUTH TLS upgrade, data-channel wrapping
//! - `transfer`: PASV/EPSV/PORT/EPRT data channels
//! - `parser`: Unix/Windows LIST and MLSD parsing into `Entry`
//! - `client`: login, FEAT, PWD/CWD, listings
//! - `directory`: mkdir (with parents), recursive rmdir, rename, delete
//! - `file_ops`: streamed RETR / STOR
//! - `adapter`: `RemoteFs` implementation

pub mod adapter;
pub mod client;
pub mod connection;
pub mod directory;
pub mod error;
pub mod file_ops;
pub mod parser;
pub mod protocol;
pub mod tls;
pub mod transfer;
pub mod types;

pub use client::FtpClient;
pub use types::*;
