//! Plugin descriptor files.
//!
//! A descriptor is a TOML, YAML or JSON document deserialized into a
//! [`PluginDescriptor`]:
//!
//! ```toml
//! name = "pluginB"
//! description = "Example plugin"
//! exports = ["B.a", "B.b"]
//!
//! [services]
//! "B.a" = "./a << timeout"
//! "B.b" = { module = "./b", require = ["B.a", { lib = "serde" }], async = true }
//! ```
//!
//! Without an explicit `path`, the plugin path is the directory holding the
//! file, relative to the container root.

use std::path::{Component, Path, PathBuf};

#[cfg(feature = "yaml-config")]
use figment::{
    Figment,
    providers::{Format, Yaml},
};
use tracing::{debug, info};

use weave_framework::PluginDescriptor;

use crate::error::{RuntimeError, RuntimeResult};

/// Loads one descriptor.  `file` is taken relative to `root` unless absolute.
///
/// JSON and TOML descriptors keep the order services are written in.
pub fn load_descriptor(root: &Path, file: &Path) -> RuntimeResult<PluginDescriptor> {
    let path = root.join(file);
    if !path.is_file() {
        return Err(RuntimeError::DescriptorNotFound(path));
    }

    let load_error = |message: String| RuntimeError::DescriptorLoad {
        path: path.clone(),
        message,
    };

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parsed: Result<PluginDescriptor, String> = match ext {
        "json" => std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string())),
        #[cfg(feature = "toml-config")]
        "toml" => std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| toml::from_str(&text).map_err(|e| e.to_string())),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Figment::from(Yaml::file(&path))
            .extract()
            .map_err(|e: figment::Error| e.to_string()),
        other => Err(format!("unsupported or disabled descriptor format: .{other}")),
    };
    let mut descriptor = parsed.map_err(load_error)?;

    if descriptor.path.is_empty() {
        descriptor.path = default_plugin_path(root, &path);
    }
    debug!(
        plugin = %descriptor.name,
        path = %descriptor.path,
        services = descriptor.services.len(),
        "Read plugin descriptor"
    );
    Ok(descriptor)
}

/// Loads every descriptor in order.
pub fn load_descriptors(root: &Path, files: &[PathBuf]) -> RuntimeResult<Vec<PluginDescriptor>> {
    info!(root = %root.display(), count = files.len(), "Loading plugin descriptors");
    files
        .iter()
        .map(|file| load_descriptor(root, file))
        .collect()
}

/// Directory of `file` relative to `root`, `/`-separated.
fn default_plugin_path(root: &Path, file: &Path) -> String {
    let dir = file.parent().unwrap_or_else(|| Path::new(""));
    let relative = dir.strip_prefix(root).unwrap_or(dir);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
