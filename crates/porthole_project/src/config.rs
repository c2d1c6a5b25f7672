use std::path::Path;
use std::str::FromStr;

use porthole_paths::DirPath;

use crate::ELM_CONFIG_FILENAME;

mod json;

/// The Elm compiler versions this tool knows how to generate declarations
/// for.
pub const SUPPORTED_ELM_VERSIONS: [&str; 2] = ["0.19.0", "0.19.1"];

/// Contains the configuration of an Elm project. Usually this information
/// is read from an `elm.json` file at the project root.
#[derive(PartialEq, Clone, Debug)]
pub struct ElmConfig {
    elm_version: String,
    source_directories: Vec<String>,
}

/// An error raised while locating, reading, or parsing the project
/// configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The directory holds no `elm.json`, so it is not an Elm project root.
    #[error("no `elm.json` found in this directory; run porthole from your project's root directory")]
    Missing,

    #[error("could not read `elm.json`")]
    Io(#[from] std::io::Error),

    #[error("could not parse `elm.json`: {0}")]
    Malformed(String),
}

impl ElmConfig {
    /// Try to read the configuration of the project rooted at `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<ElmConfig, ConfigError> {
        let path = dir.as_ref().join(ELM_CONFIG_FILENAME);
        if !path.is_file() {
            return Err(ConfigError::Missing);
        }
        Self::from_file(path)
    }

    /// Try to read a configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<ElmConfig, ConfigError> {
        let file_contents = std::fs::read_to_string(path)?;
        Self::from_str(&file_contents)
    }

    /// Returns the Elm version the project declares.
    pub fn elm_version(&self) -> &str {
        &self.elm_version
    }

    /// Returns the source directories as split paths, in declaration order.
    pub fn source_dir_paths(&self) -> Vec<DirPath> {
        self.source_directories
            .iter()
            .map(|dir| DirPath::from(dir.as_str()))
            .collect()
    }

    /// Returns true if the declared Elm version is one this tool supports.
    pub fn is_supported_version(&self) -> bool {
        SUPPORTED_ELM_VERSIONS.contains(&self.elm_version())
    }
}

impl FromStr for ElmConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config = serde_json::from_str::<json::JsonConfig>(s)
            .map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.into_real_config()
    }
}
