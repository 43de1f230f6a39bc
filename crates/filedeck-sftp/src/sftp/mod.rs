// ── filedeck-sftp / sftp module ───────────────────────────────────────────────
//
// SFTP adapter built on libssh2 (`ssh2`):
//   • Password, keyboard-interactive and in-memory private-key auth
//   • Simulated working directory (SFTP has none of its own)
//   • Listing, mkdir -p, recursive rmdir, rename, delete
//   • Streamed downloads / uploads bridged through bounded channels
//
// libssh2 calls block, so every one of them runs on tokio's blocking pool.

pub mod adapter;
pub mod dir_ops;
pub mod error;
pub mod file_ops;
pub mod session;
pub mod types;

pub use session::SftpClient;
pub use types::*;
