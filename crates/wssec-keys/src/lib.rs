#![forbid(unsafe_code)]

//! Keystore for WS-Security processing.
//!
//! Loads RSA keys and X.509 certificates from PEM and DER files, and shared
//! secrets from configuration. A `KeysManager` resolves aliases to keys,
//! certificate chains and secrets.

pub mod config;
pub mod key;
pub mod loader;
pub mod manager;
pub mod x509;

pub use config::KeyStoreConfig;
pub use key::{Key, KeyData, KeyUsage};
pub use manager::KeysManager;
pub use x509::X509Cert;
