//! Access to an Elm project's configuration.
//!
//! A project is identified by the `elm.json` at its root. This crate reads
//! that file, validates the parts the tool depends on, and exposes them as
//! an [`ElmConfig`].

pub use config::{ConfigError, ElmConfig, SUPPORTED_ELM_VERSIONS};

mod config;

/// Name of the configuration file at an Elm project's root.
pub const ELM_CONFIG_FILENAME: &str = "elm.json";
