//! The `{success, data?, error?, errorKind?}` wrapper every reply uses.

use filedeck_core::{RemoteError, RemoteErrorKind};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<RemoteErrorKind>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }

    /// Data is present but the operation as a whole did not succeed
    /// (a batch with failed entries).
    pub fn partial(data: T, success: bool) -> Self {
        Self {
            success,
            ..Self::ok(data)
        }
    }

    pub fn failed(err: &RemoteError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.message.clone()),
            error_kind: Some(err.kind),
        }
    }
}

impl ApiResponse<()> {
    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            error_kind: None,
        }
    }
}
