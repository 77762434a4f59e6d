//! # Engine Errors
//!
//! Two layers of errors live here:
//!
//! - [`ApiError`] is what the remote API client collaborator reports. It only knows
//!   about HTTP-shaped outcomes (not found, 4xx, 5xx/network, cancellation).
//! - [`ReconcileError`] is what the [`Controller`](crate::Controller) reports. Every
//!   variant carries the resource kind and the attempted [`Operation`], plus the
//!   handle when one is known, so an orchestrator can render a precise message.
//!
//! "Not found" is deliberately *not* a [`ReconcileError`] on its own. On `Read` it
//! becomes [`ReadOutcome::Drifted`](crate::ReadOutcome::Drifted), on `Delete` it is
//! success, and on `Update` it becomes [`ReconcileError::StaleReference`].

use crate::record::ResourceHandle;
use std::fmt;

/// Errors reported by the remote API client collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,
    #[error("request rejected: {0}")]
    Validation(String),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("request cancelled")]
    Cancelled,
}

/// The remote call that was being attempted when an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
    UploadContent,
    DownloadContent,
    AddMembers,
    RemoveMembers,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List => "list",
            Operation::UploadContent => "upload content",
            Operation::DownloadContent => "download content",
            Operation::AddMembers => "add members",
            Operation::RemoveMembers => "remove members",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    /// The caller believed the resource existed but the remote API no longer has it.
    #[error("{kind} {handle}: {operation} failed because the resource no longer exists")]
    StaleReference {
        kind: String,
        handle: ResourceHandle,
        operation: Operation,
    },

    /// The desired state was rejected, locally by a driver or remotely with a 4xx.
    #[error("invalid {kind} configuration ({operation}): {message}")]
    Validation {
        kind: String,
        operation: Operation,
        message: String,
    },

    /// Network or server-side failure. Retry policy belongs to the caller.
    #[error("{operation} {kind}{}: {message}", display_handle(.handle))]
    Transient {
        kind: String,
        operation: Operation,
        handle: Option<ResourceHandle>,
        message: String,
    },

    #[error("{operation} {kind}{} was cancelled", display_handle(.handle))]
    Cancelled {
        kind: String,
        operation: Operation,
        handle: Option<ResourceHandle>,
    },

    #[error("invalid {kind} import id {import_id:?}: expected {expected} fields in the form {format}")]
    MalformedImportId {
        kind: String,
        import_id: String,
        expected: usize,
        format: String,
    },

    /// The metadata was created but a follow-up call failed. The handle is live.
    #[error("{kind} {handle} was created but {operation} failed: {source}")]
    PartialCreateFailure {
        kind: String,
        handle: ResourceHandle,
        operation: Operation,
        #[source]
        source: ApiError,
    },

    #[error("{kind} {handle}: changing {} requires replacing the resource", .attributes.join(", "))]
    RequiresReplacement {
        kind: String,
        handle: ResourceHandle,
        attributes: Vec<String>,
    },

    #[error("{kind} referenced by import id {import_id:?} does not exist")]
    ImportTargetNotFound { kind: String, import_id: String },

    #[error("could not find {kind} {organization}/{name}")]
    NotFoundByName {
        kind: String,
        organization: String,
        name: String,
    },
}

fn display_handle(handle: &Option<ResourceHandle>) -> String {
    handle
        .as_ref()
        .map(|h| format!(" {h}"))
        .unwrap_or_default()
}

impl ReconcileError {
    /// Translates a collaborator error into an engine error.
    ///
    /// `NotFound` only becomes `StaleReference` when a handle is known; a not-found
    /// without a handle (e.g. on create) is reported as a validation failure because
    /// it points at a missing parent in the desired state.
    pub fn from_api(
        err: ApiError,
        kind: &str,
        operation: Operation,
        handle: Option<&ResourceHandle>,
    ) -> Self {
        let kind = kind.to_string();
        match (err, handle) {
            (ApiError::NotFound, Some(handle)) => ReconcileError::StaleReference {
                kind,
                handle: handle.clone(),
                operation,
            },
            (ApiError::NotFound, None) => ReconcileError::Validation {
                kind,
                operation,
                message: "referenced remote object does not exist".to_string(),
            },
            (ApiError::Validation(message), _) => ReconcileError::Validation {
                kind,
                operation,
                message,
            },
            (ApiError::Transient(message), handle) => ReconcileError::Transient {
                kind,
                operation,
                handle: handle.cloned(),
                message,
            },
            (ApiError::Cancelled, handle) => ReconcileError::Cancelled {
                kind,
                operation,
                handle: handle.cloned(),
            },
        }
    }

    /// The live handle this error refers to, if any.
    pub fn handle(&self) -> Option<&ResourceHandle> {
        match self {
            ReconcileError::StaleReference { handle, .. }
            | ReconcileError::PartialCreateFailure { handle, .. }
            | ReconcileError::RequiresReplacement { handle, .. } => Some(handle),
            ReconcileError::Transient { handle, .. } | ReconcileError::Cancelled { handle, .. } => {
                handle.as_ref()
            }
            _ => None,
        }
    }

    /// Whether an orchestrator may retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::Transient { .. } => true,
            ReconcileError::PartialCreateFailure { source, .. } => {
                matches!(source, ApiError::Transient(_))
            }
            _ => false,
        }
    }

    /// Whether local state should be cleared because the remote object is gone.
    pub fn is_stale_reference(&self) -> bool {
        matches!(self, ReconcileError::StaleReference { .. })
    }
}
