//! # filedeck
//!
//! One operation surface over FTP, FTPS and SFTP sessions:
//!
//! - `session`: registry of live sessions and the per-session FIFO slot
//! - `connector`: connect requests to adapters
//! - `batch`: multi-file upload with per-file failure isolation
//! - `service`: the operations callers invoke by session id
//! - `api` / `envelope`: the HTTP binding
//! - `config` / `logging`: process setup

pub mod api;
pub mod batch;
pub mod config;
pub mod connector;
pub mod envelope;
pub mod logging;
pub mod service;
pub mod session;
