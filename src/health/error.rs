//! Probe and registry error types.

use std::fmt;
use std::time::Duration;

use super::CheckKind;

/// Per-probe failures. All of these become CRITICAL results; none escape
/// an aggregation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The dependency behind the probe reported a failure.
    Evaluation(String),

    /// The probe did not finish within its timeout.
    Timeout(Duration),

    /// The probe implementation itself malfunctioned (panic, bug).
    InternalFault(String),
}

impl ProbeError {
    /// Build an evaluation failure from any displayable error.
    pub fn evaluation(err: impl fmt::Display) -> Self {
        ProbeError::Evaluation(err.to_string())
    }

    /// Short machine-friendly reason, used as a metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            ProbeError::Evaluation(_) => "evaluation",
            ProbeError::Timeout(_) => "timeout",
            ProbeError::InternalFault(_) => "internal",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Timeout(_))
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Evaluation(msg) => f.write_str(msg),
            ProbeError::Timeout(d) => write!(f, "timed out after {}ms", d.as_millis()),
            ProbeError::InternalFault(msg) => write!(f, "internal probe fault: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {}

/// Registry configuration errors. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A probe with this name already exists for the kind.
    DuplicateName { name: String, kind: CheckKind },

    /// Probe name is empty or not a lowercase identifier.
    InvalidName { name: String },

    /// No probe with this name is registered for the kind.
    UnknownProbe { name: String, kind: CheckKind },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateName { name, kind } => {
                write!(f, "duplicate {} probe name: {}", kind, name)
            }
            RegistryError::InvalidName { name } => {
                write!(
                    f,
                    "invalid probe name '{}': expected [a-z0-9][a-z0-9_.-]*",
                    name
                )
            }
            RegistryError::UnknownProbe { name, kind } => {
                write!(f, "no {} probe named {}", kind, name)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
