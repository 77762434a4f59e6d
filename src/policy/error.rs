use thiserror::Error;

/// Reasons a desired policy is rejected before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("{0} is required")]
    MissingAttribute(&'static str),

    #[error("unsupported policy kind {0}: has to be one of [sentinel, opa]")]
    UnsupportedKind(String),

    #[error("unknown enforce_mode {0}")]
    UnknownMode(String),

    #[error("enforce_mode {mode} is not valid for {kind} policies; expected one of [{allowed}]")]
    ModeNotAllowed {
        kind: &'static str,
        mode: &'static str,
        allowed: String,
    },

    #[error("query is only supported for opa policies")]
    QueryNotSupported,
}
