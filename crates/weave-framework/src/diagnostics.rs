//! Point-in-time snapshot of a container, for humans and tools.
//!
//! [`ContainerInfo`] serializes with `serde` and renders as plain-text tables
//! through `Display`:
//!
//! ```text
//! Plugin "pluginB" @path "pluginB"
//! +---+---------+-----------------+--------+
//! |   | service | requirements    | status |
//! +---+---------+-----------------+--------+
//! | * | B.a     | timeout (ready) | ready  |
//! +---+---------+-----------------+--------+
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use weave_core::ServiceStatus;

use crate::table::ServiceTable;

#[derive(Debug, Clone, Serialize)]
pub struct ContainerInfo {
    pub plugins: BTreeMap<String, PluginInfo>,
    pub errors: Vec<ErrorInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub path: String,
    /// In declaration order.
    pub services: ServiceTable<ServiceInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub exported: bool,
    pub status: ServiceStatus,
    pub requirements: Vec<RequirementInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequirementInfo {
    pub requirement: String,
    pub state: RequirementState,
}

/// How a requirement looks from the requiring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementState {
    /// An external library.
    Lib,
    /// A service, with its current status.
    Service(ServiceStatus),
    /// Neither local nor exported.
    Missing,
}

impl fmt::Display for RequirementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lib => f.write_str("lib"),
            Self::Service(status) => f.write_str(status.as_str()),
            Self::Missing => f.write_str("missing"),
        }
    }
}

impl Serialize for RequirementState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub plugin: String,
    pub service: String,
    pub status: ServiceStatus,
    pub message: String,
}

impl ContainerInfo {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Number of services currently in `status`.
    pub fn count(&self, status: ServiceStatus) -> usize {
        self.plugins
            .values()
            .flat_map(|p| p.services.values())
            .filter(|s| s.status == status)
            .count()
    }

    pub fn service_count(&self) -> usize {
        self.plugins.values().map(|p| p.services.len()).sum()
    }
}

// ─── Table rendering ──────────────────────────────────────────────────────────

const HEADERS: [&str; 4] = ["", "service", "requirements", "status"];

fn separator(f: &mut fmt::Formatter<'_>, widths: &[usize; 4]) -> fmt::Result {
    for w in widths {
        write!(f, "+{}", "-".repeat(w + 2))?;
    }
    writeln!(f, "+")
}

fn row(f: &mut fmt::Formatter<'_>, widths: &[usize; 4], cells: [&str; 4]) -> fmt::Result {
    for (cell, &w) in cells.iter().zip(widths) {
        write!(f, "| {cell:<w$} ")?;
    }
    writeln!(f, "|")
}

impl fmt::Display for PluginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plugin \"{}\" @path \"{}\"", self.name, self.path)?;
        if let Some(desc) = &self.description {
            write!(f, " ({desc})")?;
        }
        writeln!(f)?;

        let rows: Vec<[String; 4]> = self
            .services
            .iter()
            .map(|(name, service)| {
                let requirements = service
                    .requirements
                    .iter()
                    .map(|r| format!("{} ({})", r.requirement, r.state))
                    .collect::<Vec<_>>()
                    .join(", ");
                [
                    if service.exported { "*" } else { "" }.to_string(),
                    name.to_string(),
                    requirements,
                    service.status.to_string(),
                ]
            })
            .collect();

        let mut widths = HEADERS.map(str::len);
        for cells in &rows {
            for (w, cell) in widths.iter_mut().zip(cells) {
                *w = (*w).max(cell.chars().count());
            }
        }

        separator(f, &widths)?;
        row(f, &widths, HEADERS)?;
        separator(f, &widths)?;
        for cells in &rows {
            row(f, &widths, cells.each_ref().map(String::as_str))?;
        }
        separator(f, &widths)
    }
}

impl fmt::Display for ContainerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for plugin in self.plugins.values() {
            writeln!(f, "{plugin}")?;
        }
        if !self.errors.is_empty() {
            writeln!(f, "Errors:")?;
            for e in &self.errors {
                writeln!(f, "  [{}] {}/{}: {}", e.status, e.plugin, e.service, e.message)?;
            }
        }
        Ok(())
    }
}
