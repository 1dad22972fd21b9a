use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::de::DeserializeOwned;
use std::path::Path;

/// A plain (unprefixed) environment variable that overrides one settings key.
#[derive(Debug, Clone, Copy)]
pub struct EnvOverride {
    pub key: &'static str,
    pub env_var: &'static str,
}

/// Load settings from a YAML file, then `<PREFIX>_SECTION__KEY` environment
/// variables, then the explicit overrides (highest precedence).
pub fn load_layered<T: DeserializeOwned>(
    file: &Path,
    env_prefix: &str,
    overrides: &[EnvOverride],
) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let mut builder = Cfg::builder()
        .add_source(File::from(file).required(true))
        .add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__"),
        );

    for o in overrides {
        if let Ok(value) = std::env::var(o.env_var) {
            if !value.trim().is_empty() {
                builder = builder.set_override(o.key, value)?;
            }
        }
    }

    Ok(builder.build()?.try_deserialize()?)
}
