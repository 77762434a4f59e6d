//! # Policy Kinds & Enforcement
//!
//! The two policy languages accept different enforcement levels:
//!
//! | Kind | Modes | Default | Path |
//! |------|-------|---------|------|
//! | `sentinel` | advisory, soft-mandatory, hard-mandatory | soft-mandatory | `<name>.sentinel` |
//! | `opa` | advisory, mandatory | advisory | `<name>.rego` |
//!
//! The enforcement is sent as a single `enforce` block of `{path, mode}`.

use super::error::PolicyError;
use reconcile_framework::Attributes;
use std::fmt;
use std::str::FromStr;

pub const ENFORCE_BLOCK: &str = "enforce";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PolicyKind {
    #[default]
    Sentinel,
    Opa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforceMode {
    Advisory,
    SoftMandatory,
    HardMandatory,
    Mandatory,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Sentinel => "sentinel",
            PolicyKind::Opa => "opa",
        }
    }

    pub fn allowed_modes(&self) -> &'static [EnforceMode] {
        match self {
            PolicyKind::Sentinel => &[
                EnforceMode::Advisory,
                EnforceMode::SoftMandatory,
                EnforceMode::HardMandatory,
            ],
            PolicyKind::Opa => &[EnforceMode::Advisory, EnforceMode::Mandatory],
        }
    }

    pub fn default_mode(&self) -> EnforceMode {
        match self {
            PolicyKind::Sentinel => EnforceMode::SoftMandatory,
            PolicyKind::Opa => EnforceMode::Advisory,
        }
    }

    pub fn path(&self, name: &str) -> String {
        match self {
            PolicyKind::Sentinel => format!("{name}.sentinel"),
            PolicyKind::Opa => format!("{name}.rego"),
        }
    }

    /// Resolves the requested mode (or the default) and checks it against this kind.
    pub fn mode(&self, requested: Option<&str>) -> Result<EnforceMode, PolicyError> {
        let mode = match requested {
            Some(raw) => raw.parse()?,
            None => return Ok(self.default_mode()),
        };
        if !self.allowed_modes().contains(&mode) {
            return Err(PolicyError::ModeNotAllowed {
                kind: self.as_str(),
                mode: mode.as_str(),
                allowed: self
                    .allowed_modes()
                    .iter()
                    .map(EnforceMode::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        Ok(mode)
    }

    /// The single enforcement block for policy `name`.
    pub fn enforcement(&self, name: &str, mode: EnforceMode) -> Vec<Attributes> {
        vec![Attributes::new()
            .with("path", self.path(name))
            .with("mode", mode.as_str())]
    }
}

impl FromStr for PolicyKind {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sentinel" => Ok(PolicyKind::Sentinel),
            "opa" => Ok(PolicyKind::Opa),
            other => Err(PolicyError::UnsupportedKind(other.to_string())),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EnforceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforceMode::Advisory => "advisory",
            EnforceMode::SoftMandatory => "soft-mandatory",
            EnforceMode::HardMandatory => "hard-mandatory",
            EnforceMode::Mandatory => "mandatory",
        }
    }
}

impl FromStr for EnforceMode {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "advisory" => Ok(EnforceMode::Advisory),
            "soft-mandatory" => Ok(EnforceMode::SoftMandatory),
            "hard-mandatory" => Ok(EnforceMode::HardMandatory),
            "mandatory" => Ok(EnforceMode::Mandatory),
            other => Err(PolicyError::UnknownMode(other.to_string())),
        }
    }
}
