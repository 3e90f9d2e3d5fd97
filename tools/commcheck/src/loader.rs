//! Node file loading

use std::path::Path;

use anyhow::{bail, Context, Result};
use ecunet_model::Node;
use tracing::debug;

/// Read a node configuration from a JSON or YAML file
pub fn load_node(path: &Path) -> Result<Node> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let node: Node = match extension.as_deref() {
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("Invalid node file {}", path.display()))?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&text)
            .with_context(|| format!("Invalid node file {}", path.display()))?,
        _ => bail!(
            "Unsupported node file format: {} (expected .json, .yaml or .yml)",
            path.display()
        ),
    };

    debug!(
        "Loaded node '{}': {} data pools, {} protocols, {} CANopen managers",
        node.name,
        node.data_pools.len(),
        node.protocols.len(),
        node.canopen_managers.len()
    );
    Ok(node)
}
