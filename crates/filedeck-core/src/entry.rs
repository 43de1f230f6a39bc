//! Canonical directory-listing rows and the protocol tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire protocol a session speaks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Ftp,
    /// FTP upgraded with `AUTH TLS` on the control port.
    Ftps,
    Sftp,
}

impl Protocol {
    pub fn default_port(self) -> u16 {
        match self {
            Self::Ftp | Self::Ftps => 21,
            Self::Sftp => 22,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ftp => "ftp",
            Self::Ftps => "ftps",
            Self::Sftp => "sftp",
        })
    }
}

/// Type of a remote filesystem entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    File,
    Directory,
    SymbolicLink,
    Unknown,
}

/// One normalized directory-listing row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Byte size as reported; meaningless for directories.
    pub size: u64,
    pub modified_at: DateTime<Utc>,
    /// `rwxrwxrwx`-shaped owner/group/other string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
}

impl Entry {
    /// Build an entry, substituting "now" for a missing timestamp.
    pub fn new(
        name: impl Into<String>,
        kind: EntryKind,
        size: u64,
        modified_at: Option<DateTime<Utc>>,
        permissions: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            size,
            modified_at: modified_at.unwrap_or_else(Utc::now),
            permissions,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}
