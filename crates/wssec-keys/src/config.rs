#![forbid(unsafe_code)]

//! Keystore configuration file.
//!
//! ```toml
//! default_alias = "alice"
//!
//! [[keys]]
//! alias = "alice"
//! private_key = "alice.key"
//! certificate = "alice.pem"
//! password = "security"
//!
//! [[keys]]
//! alias = "bob"
//! certificate = "bob.pem"
//!
//! [[secrets]]
//! alias = "shared"
//! key = "MDEyMzQ1Njc4OWFiY2RlZg=="
//! ```
//!
//! Relative paths resolve against the directory holding the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use wssec_core::Error;

/// Parsed keystore configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyStoreConfig {
    /// Alias used when a caller does not name one.
    #[serde(default)]
    pub default_alias: Option<String>,
    #[serde(default)]
    pub keys: Vec<KeyEntry>,
    #[serde(default)]
    pub secrets: Vec<SecretEntry>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// An asymmetric key entry: a certificate, optionally with its private key.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyEntry {
    pub alias: String,
    #[serde(default)]
    pub private_key: Option<PathBuf>,
    #[serde(default)]
    pub certificate: Option<PathBuf>,
    /// Password protecting the private key.
    #[serde(default)]
    pub password: Option<String>,
}

/// A named shared secret, base64 encoded.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretEntry {
    pub alias: String,
    pub key: String,
}

impl KeyStoreConfig {
    /// Parse configuration text. Relative paths stay relative to the
    /// working directory.
    pub fn parse(text: &str) -> Result<Self, Error> {
        toml::from_str(text).map_err(|e| Error::Config(format!("keystore: {e}")))
    }

    /// Read and parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read keystore {}: {e}", path.display()))
        })?;
        let mut config = Self::parse(&text)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Resolve a path from the file against the configuration directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}
