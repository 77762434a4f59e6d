//! # Tracing Setup
//!
//! Structured logging for the engine uses the `tracing` crate. Every controller
//! operation runs in a span named after the operation with the resource `kind` and
//! `handle` as fields, so one reconciliation reads as a single block:
//!
//! ```text
//! INFO create{kind="tfe_policy"}: Created handle=pol-7
//! INFO read{kind="tfe_team_members" handle=team-1}: Drifted
//! ```
//!
//! Remote calls are logged at `debug`, completed operations at `info`, drift at
//! `info` and failures at `warn`.
//!
//! # Environment Variables
//!
//! `RUST_LOG` controls verbosity, e.g. `RUST_LOG=reconcile_framework=debug`.

/// Installs the global subscriber. Panics if one is already installed.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // kind and handle fields already say where we are
        .compact()
        .init();
}

/// Like [`setup_tracing`] but leaves an existing subscriber in place. Meant for tests,
/// where many cases race to install one.
pub fn try_setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .with_test_writer()
        .try_init();
}
