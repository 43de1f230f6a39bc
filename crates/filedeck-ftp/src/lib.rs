//! # filedeck – FTP
//!
//! FTP and explicit-FTPS adapter implementing the shared `RemoteFs` contract.

pub mod ftp;
