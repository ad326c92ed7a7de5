//! Service requirements.
//!
//! A requirement is written either as a plain string or as a small table:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `"storage"` | service reference |
//! | `"::serde_json"` | external library reference |
//! | `{ service = "storage" }` | service reference |
//! | `{ lib = "serde_json" }` | external library reference |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Prefix marking an external library reference in string form.
pub const EXTERNAL_PREFIX: &str = "::";

/// One dependency of a service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Another service, looked up by name (plugin-local first, then exported).
    Service(String),
    /// A library resolved by the module loader, never awaited.
    External(String),
}

impl Requirement {
    pub fn service(name: impl Into<String>) -> Self {
        Self::Service(name.into())
    }

    pub fn external(identifier: impl Into<String>) -> Self {
        Self::External(identifier.into())
    }

    /// Parses the string form, where a leading `::` marks an external reference.
    pub fn parse(s: &str) -> Result<Self, ConfigurationError> {
        let s = s.trim();
        let (external, name) = match s.strip_prefix(EXTERNAL_PREFIX) {
            Some(rest) => (true, rest.trim()),
            None => (false, s),
        };
        if name.is_empty() {
            return Err(ConfigurationError::EmptyRequirement);
        }
        Ok(if external {
            Self::External(name.to_string())
        } else {
            Self::Service(name.to_string())
        })
    }

    /// Name or identifier without the `::` prefix.
    pub fn name(&self) -> &str {
        match self {
            Self::Service(name) | Self::External(name) => name,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }
}

impl FromStr for Requirement {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service(name) => f.write_str(name),
            Self::External(id) => write!(f, "{EXTERNAL_PREFIX}{id}"),
        }
    }
}

// ─── RequirementSpec ──────────────────────────────────────────────────────────

/// Requirement as written in a plugin descriptor, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequirementSpec {
    /// `"name"` or `"::library"`.
    Name(String),
    /// `{ lib = "library" }`.
    Library { lib: String },
    /// `{ service = "name" }`.
    Service { service: String },
}

impl RequirementSpec {
    pub fn normalize(&self) -> Result<Requirement, ConfigurationError> {
        match self {
            Self::Name(s) => Requirement::parse(s),
            Self::Library { lib } => non_empty(lib).map(Requirement::external),
            Self::Service { service } => non_empty(service).map(Requirement::service),
        }
    }
}

impl From<&str> for RequirementSpec {
    fn from(s: &str) -> Self {
        Self::Name(s.to_string())
    }
}

impl From<String> for RequirementSpec {
    fn from(s: String) -> Self {
        Self::Name(s)
    }
}

impl From<Requirement> for RequirementSpec {
    fn from(r: Requirement) -> Self {
        match r {
            Requirement::Service(service) => Self::Service { service },
            Requirement::External(lib) => Self::Library { lib },
        }
    }
}

fn non_empty(s: &str) -> Result<&str, ConfigurationError> {
    let s = s.trim();
    if s.is_empty() {
        Err(ConfigurationError::EmptyRequirement)
    } else {
        Ok(s)
    }
}
