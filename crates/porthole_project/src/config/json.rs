use serde_derive::Deserialize;

use super::{ConfigError, ElmConfig};

/// A project configuration as spelled in an `elm.json` file.
///
/// Only the fields this tool consumes are declared; the rest of the file
/// (`type`, `dependencies`, ...) is passed over.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JsonConfig {
    elm_version: String,
    source_directories: Vec<String>,
}

impl JsonConfig {
    /// Convert this raw deserialized form into a validated configuration.
    pub fn into_real_config(self) -> Result<ElmConfig, ConfigError> {
        let elm_version = self.elm_version.trim();
        if elm_version.is_empty() {
            return Err(ConfigError::Malformed(
                "elm-version cannot be an empty string".to_owned(),
            ));
        }

        Ok(ElmConfig {
            elm_version: elm_version.to_owned(),
            source_directories: self.source_directories,
        })
    }
}
