//! Config loading.
//!
//! One TOML file plus environment overrides. A broken file never stops
//! the editor: load falls back to defaults with a warning.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::geometry;
use crate::core::reconcile::ReconcileOptions;
use crate::error::{Effect, Transience};
use crate::template::StreetTemplate;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn transience(&self) -> Transience {
        match self {
            Self::Read { .. } => Transience::Unknown,
            Self::Parse { .. } => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazetteerConfig {
    /// Naming authority stamped onto new streets.
    pub authority_code: u16,
    /// Endpoint snap distance when chaining unit geometry.
    pub geometry_epsilon: f64,
    /// Copy the whole-road endpoints onto the street extent fields.
    pub derive_street_extent: bool,
}

impl Default for GazetteerConfig {
    fn default() -> Self {
        Self {
            authority_code: 0,
            geometry_epsilon: geometry::JOIN_EPSILON,
            derive_street_extent: true,
        }
    }
}

impl GazetteerConfig {
    pub fn load_from(path: &Path) -> Result<GazetteerConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given, else defaults; apply environment overrides
    /// either way. Load failures warn and fall back rather than abort.
    pub fn load_or_default(path: Option<&Path>) -> GazetteerConfig {
        let mut config = match path {
            Some(path) => match Self::load_from(path) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!("config load failed, using defaults: {err}");
                    Self::default()
                }
            },
            None => Self::default(),
        };
        apply_env_overrides(&mut config);
        config
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            geometry_epsilon: self.geometry_epsilon,
            derive_street_extent: self.derive_street_extent,
        }
    }

    pub fn template(&self) -> StreetTemplate {
        StreetTemplate::for_authority(self.authority_code)
    }
}

pub fn apply_env_overrides(config: &mut GazetteerConfig) {
    apply_env_overrides_inner(config, &|name| std::env::var(name).ok());
}

fn apply_env_overrides_inner(
    config: &mut GazetteerConfig,
    get: &dyn Fn(&str) -> Option<String>,
) {
    if let Some(raw) = get("GAZETTEER_AUTHORITY") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            match trimmed.parse::<u16>() {
                Ok(value) => config.authority_code = value,
                Err(err) => {
                    tracing::warn!("invalid GAZETTEER_AUTHORITY, ignoring: {err}");
                }
            }
        }
    }

    if let Some(raw) = get("GAZETTEER_GEOMETRY_EPSILON") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            match trimmed.parse::<f64>() {
                Ok(value) if value.is_finite() && value >= 0.0 => {
                    config.geometry_epsilon = value;
                }
                Ok(_) => {
                    tracing::warn!("invalid GAZETTEER_GEOMETRY_EPSILON, ignoring: not a distance");
                }
                Err(err) => {
                    tracing::warn!("invalid GAZETTEER_GEOMETRY_EPSILON, ignoring: {err}");
                }
            }
        }
    }

    if get("GAZETTEER_NO_STREET_EXTENT").is_some() {
        config.derive_street_extent = false;
    }
}
