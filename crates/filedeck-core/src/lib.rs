//! # filedeck – Core
//!
//! Vocabulary shared by the protocol adapters and the session coordinator:
//!
//! - `error`: the `RemoteError` taxonomy every layer reports through
//! - `entry`: canonical directory-listing rows and the protocol tag
//! - `normalize`: permission / kind mapping and listing sort order
//! - `path`: remote (always `/`-separated) path helpers
//! - `adapter`: the `RemoteFs` capability trait both adapters implement

pub mod adapter;
pub mod entry;
pub mod error;
pub mod normalize;
pub mod path;

pub use adapter::{ByteSink, ByteSource, RemoteFs};
pub use entry::{Entry, EntryKind, Protocol};
pub use error::{RemoteError, RemoteErrorKind, RemoteResult};
