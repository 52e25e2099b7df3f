use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Registry settings.
///
/// Loadable from TOML; every field has a default, so an empty document is a
/// valid configuration.
///
/// ```toml
/// namespace = "BirthRecord"
/// create_event = "CreateBirthRecord"
/// update_event = "UpdateMedicalInfo"
/// reject_duplicate_create = false
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Object type prefix of every record key.
    pub namespace: String,
    /// Event emitted with the encoded record when a record is created.
    pub create_event: String,
    /// Event emitted with the encoded record after a medical update.
    /// No event is emitted when unset.
    pub update_event: Option<String>,
    /// When `false`, creating a record whose id already exists replaces it
    /// (last write wins). When `true`, such a create fails with
    /// `AlreadyExists`.
    pub reject_duplicate_create: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            namespace: "BirthRecord".into(),
            create_event: "CreateBirthRecord".into(),
            update_event: None,
            reject_duplicate_create: false,
        }
    }
}

impl RegistryConfig {
    pub fn from_toml_str(text: &str) -> RegistryResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| RegistryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> RegistryResult<()> {
        if self.namespace.is_empty() {
            return Err(RegistryError::Config("namespace must not be empty".into()));
        }
        if self.create_event.is_empty() {
            return Err(RegistryError::Config("create_event must not be empty".into()));
        }
        if self.update_event.as_deref() == Some("") {
            return Err(RegistryError::Config("update_event must not be empty when set".into()));
        }
        Ok(())
    }
}
