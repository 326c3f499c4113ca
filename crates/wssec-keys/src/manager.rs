#![forbid(unsafe_code)]

//! Keystore with aliased entries.

use std::path::Path;

use base64::Engine;
use tracing::debug;
use wssec_core::Error;

use crate::config::KeyStoreConfig;
use crate::key::Key;
use crate::loader;
use crate::x509::X509Cert;

struct Entry {
    alias: String,
    private: Option<Key>,
    certs: Vec<X509Cert>,
    password: Option<String>,
}

/// Named keys, certificates and shared secrets.
///
/// An alias maps to a certificate chain and optionally to a private key.
/// A private key stored with a password is only handed out to callers
/// presenting the same password.
#[derive(Default)]
pub struct KeysManager {
    entries: Vec<Entry>,
    secrets: Vec<(String, Vec<u8>)>,
    default_alias: Option<String>,
}

impl std::fmt::Debug for KeysManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeysManager")
            .field("aliases", &self.aliases().collect::<Vec<_>>())
            .field("default_alias", &self.default_alias)
            .finish()
    }
}

impl KeysManager {
    /// Create an empty keystore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a keystore from parsed configuration, loading every file it names.
    pub fn from_config(config: &KeyStoreConfig) -> Result<Self, Error> {
        let mut manager = Self::new();
        for entry in &config.keys {
            let certs = match &entry.certificate {
                Some(path) => loader::load_certificate_file(&config.resolve(path))?,
                None => Vec::new(),
            };
            match &entry.private_key {
                Some(path) => {
                    let key = loader::load_private_key_file(
                        &config.resolve(path),
                        entry.password.as_deref(),
                    )?;
                    manager.add_private_key(&entry.alias, key, certs, entry.password.clone());
                }
                None => {
                    for cert in certs {
                        manager.add_certificate(&entry.alias, cert);
                    }
                }
            }
        }
        for secret in &config.secrets {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(secret.key.trim())
                .map_err(|e| Error::Config(format!("secret {}: {e}", secret.alias)))?;
            manager.add_secret(&secret.alias, bytes);
        }
        manager.default_alias = config.default_alias.clone();
        debug!(entries = manager.entries.len(), secrets = manager.secrets.len(), "keystore loaded");
        Ok(manager)
    }

    /// Load a keystore configuration file.
    pub fn from_config_file(path: &Path) -> Result<Self, Error> {
        Self::from_config(&KeyStoreConfig::from_file(path)?)
    }

    fn entry(&self, alias: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.alias == alias)
    }

    fn entry_mut(&mut self, alias: &str) -> &mut Entry {
        if let Some(pos) = self.entries.iter().position(|e| e.alias == alias) {
            return &mut self.entries[pos];
        }
        self.entries.push(Entry {
            alias: alias.to_owned(),
            private: None,
            certs: Vec::new(),
            password: None,
        });
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    /// Add a private key with its certificate chain under `alias`.
    pub fn add_private_key(
        &mut self,
        alias: &str,
        key: Key,
        chain: Vec<X509Cert>,
        password: Option<String>,
    ) {
        let mut key = key.with_name(alias);
        key.x509_chain = chain.clone();
        let entry = self.entry_mut(alias);
        entry.private = Some(key);
        entry.certs = chain;
        entry.password = password;
    }

    /// Append a trusted certificate under `alias`.
    pub fn add_certificate(&mut self, alias: &str, cert: X509Cert) {
        self.entry_mut(alias).certs.push(cert);
    }

    /// Store a named shared secret, replacing any previous value.
    pub fn add_secret(&mut self, alias: &str, bytes: Vec<u8>) {
        self.secrets.retain(|(a, _)| a != alias);
        self.secrets.push((alias.to_owned(), bytes));
    }

    pub fn set_default_alias(&mut self, alias: impl Into<String>) {
        self.default_alias = Some(alias.into());
    }

    /// The configured default alias, or the only alias when there is one.
    pub fn default_alias(&self) -> Option<&str> {
        match &self.default_alias {
            Some(alias) => Some(alias),
            None if self.entries.len() == 1 => Some(&self.entries[0].alias),
            None => None,
        }
    }

    /// All aliases with certificates or keys.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.alias.as_str())
    }

    /// The private key for `alias`, checked against `password`.
    pub fn private_key(&self, alias: &str, password: Option<&str>) -> Result<&Key, Error> {
        let entry = self
            .entry(alias)
            .ok_or_else(|| Error::KeyNotFound(format!("no keystore entry for alias {alias}")))?;
        let key = entry
            .private
            .as_ref()
            .ok_or_else(|| Error::KeyNotFound(format!("no private key for alias {alias}")))?;
        if let Some(stored) = &entry.password {
            if password != Some(stored.as_str()) {
                return Err(Error::Key(format!("wrong password for private key {alias}")));
            }
        }
        Ok(key)
    }

    /// The certificate chain for `alias`, end-entity first.
    pub fn certificates(&self, alias: &str) -> Result<&[X509Cert], Error> {
        match self.entry(alias) {
            Some(entry) if !entry.certs.is_empty() => Ok(&entry.certs),
            _ => Err(Error::KeyNotFound(format!("no certificate for alias {alias}"))),
        }
    }

    /// The end-entity certificate for `alias`.
    pub fn certificate(&self, alias: &str) -> Result<&X509Cert, Error> {
        self.certificates(alias).map(|chain| &chain[0])
    }

    /// A shared secret by name.
    pub fn secret(&self, alias: &str) -> Option<&[u8]> {
        self.secrets
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, bytes)| bytes.as_slice())
    }

    /// Number of aliased entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.secrets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_key() -> Key {
        let mut rng = rand::thread_rng();
        Key::rsa_private(rsa::RsaPrivateKey::new(&mut rng, 1024).unwrap())
    }

    #[test]
    fn test_private_key_password() {
        let mut ks = KeysManager::new();
        ks.add_private_key("alice", rsa_key(), Vec::new(), Some("security".into()));
        assert!(ks.private_key("alice", Some("security")).is_ok());
        assert!(matches!(
            ks.private_key("alice", Some("nope")),
            Err(Error::Key(_))
        ));
        assert!(matches!(ks.private_key("alice", None), Err(Error::Key(_))));
        assert!(matches!(
            ks.private_key("bob", Some("security")),
            Err(Error::KeyNotFound(_))
        ));
        assert_eq!(
            ks.private_key("alice", Some("security")).unwrap().name.as_deref(),
            Some("alice")
        );
    }

    #[test]
    fn test_unprotected_key_and_default_alias() {
        let mut ks = KeysManager::new();
        ks.add_private_key("only", rsa_key(), Vec::new(), None);
        assert!(ks.private_key("only", Some("anything")).is_ok());
        assert_eq!(ks.default_alias(), Some("only"));
        ks.set_default_alias("other");
        assert_eq!(ks.default_alias(), Some("other"));
        assert!(ks.certificate("only").is_err());
    }

    #[test]
    fn test_secrets() {
        let config = KeyStoreConfig::parse(
            "[[secrets]]\nalias = \"shared\"\nkey = \"AAECAw==\"\n",
        )
        .unwrap();
        let mut ks = KeysManager::from_config(&config).unwrap();
        assert_eq!(ks.secret("shared"), Some(&[0u8, 1, 2, 3][..]));
        ks.add_secret("shared", vec![9]);
        assert_eq!(ks.secret("shared"), Some(&[9u8][..]));
        assert!(ks.secret("missing").is_none());
        assert!(!ks.is_empty());
    }

    #[test]
    fn test_bad_secret_encoding() {
        let config =
            KeyStoreConfig::parse("[[secrets]]\nalias = \"s\"\nkey = \"!!\"\n").unwrap();
        assert!(matches!(
            KeysManager::from_config(&config),
            Err(Error::Config(_))
        ));
    }
}
