//! Configuration loading helper functions
//!
//! Layered loading with figment: defaults, then a YAML/JSON/TOML file picked
//! by extension, then prefixed environment variables.

use std::path::Path;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Figment with the file at `path` merged in, format chosen by extension
fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.exists() {
        return Err(Error::config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let figment = match extension.as_deref() {
        Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        Some("toml") => figment.merge(Toml::file(path)),
        _ => {
            return Err(Error::config(format!(
                "Unsupported configuration format: {}",
                path.display()
            )))
        },
    };
    debug!("Loading configuration from {}", path.display());
    Ok(figment)
}

/// Load `T` from `path`, overridden by `{env_prefix}*` environment variables
///
/// Nested keys use `__` in variable names, e.g. `COMMCHECK_LOGGING__LEVEL`.
pub fn load_config<T: DeserializeOwned>(path: &Path, env_prefix: &str) -> Result<T> {
    let figment = merge_file(Figment::new(), path)?;
    Ok(figment
        .merge(Env::prefixed(env_prefix).split("__"))
        .extract()?)
}

/// Like [`load_config`], starting from `T::default()` and with an optional file
pub fn load_config_or_default<T>(path: Option<&Path>, env_prefix: &str) -> Result<T>
where
    T: DeserializeOwned + Serialize + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));
    if let Some(path) = path {
        figment = merge_file(figment, path)?;
    }
    Ok(figment
        .merge(Env::prefixed(env_prefix).split("__"))
        .extract()?)
}
