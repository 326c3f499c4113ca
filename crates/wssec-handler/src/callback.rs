#![forbid(unsafe_code)]

//! Credential callbacks.
//!
//! A callback receives the identifier (user name, key alias or key name),
//! why the credential is needed and which option selected the callback. It answers with a [`Credential`],
//! whose identifier may differ from the one asked for, or with `None`
//! when it knows nothing about the identifier.

use std::collections::HashMap;

use wssec_core::Error;

use crate::action::ActionCode;

/// Why a credential is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackUsage {
    UsernameToken,
    Signature,
    /// A symmetric key looked up by name.
    KeyName,
    Unknown,
}

impl CallbackUsage {
    pub fn for_action(action: ActionCode) -> Self {
        match action {
            ActionCode::UsernameToken | ActionCode::UsernameTokenSignature => Self::UsernameToken,
            ActionCode::Signature => Self::Signature,
            ActionCode::Encrypt => Self::KeyName,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CredentialRequest<'a> {
    pub identifier: &'a str,
    pub usage: CallbackUsage,
    pub action: ActionCode,
    /// The callback class name from the options, when one selected the
    /// callback.
    pub callback_class: Option<&'a str>,
    /// The reference key the callback was registered under, otherwise.
    pub callback_ref: Option<&'a str>,
}

/// Resolved credential material.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// The identifier to put on the wire, possibly normalized.
    pub identifier: String,
    pub password: Option<String>,
    /// Raw symmetric key bytes.
    pub key: Option<Vec<u8>>,
}

impl Credential {
    pub fn password(identifier: &str, password: &str) -> Self {
        Self {
            identifier: identifier.to_owned(),
            password: Some(password.to_owned()),
            key: None,
        }
    }

    pub fn key(identifier: &str, key: Vec<u8>) -> Self {
        Self {
            identifier: identifier.to_owned(),
            password: None,
            key: Some(key),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("key", &self.key.as_ref().map(|k| format!("{} bytes", k.len())))
            .finish()
    }
}

/// Resolves credentials. Called synchronously from the pipeline, possibly
/// from several threads at once.
pub trait CallbackHandler: Send + Sync {
    fn handle(&self, request: &CredentialRequest<'_>) -> Result<Option<Credential>, Error>;
}

impl<F> CallbackHandler for F
where
    F: Fn(&CredentialRequest<'_>) -> Result<Option<Credential>, Error> + Send + Sync,
{
    fn handle(&self, request: &CredentialRequest<'_>) -> Result<Option<Credential>, Error> {
        self(request)
    }
}

/// In-memory passwords and named keys.
#[derive(Debug, Clone, Default)]
pub struct PasswordMap {
    passwords: HashMap<String, String>,
    keys: HashMap<String, Vec<u8>>,
    identifiers: HashMap<String, String>,
}

impl PasswordMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_password(mut self, identifier: &str, password: &str) -> Self {
        self.passwords.insert(identifier.to_owned(), password.to_owned());
        self
    }

    pub fn with_key(mut self, name: &str, key: Vec<u8>) -> Self {
        self.keys.insert(name.to_owned(), key);
        self
    }

    /// Answer requests for `identifier` with the credential of `canonical`.
    pub fn with_identifier(mut self, identifier: &str, canonical: &str) -> Self {
        self.identifiers.insert(identifier.to_owned(), canonical.to_owned());
        self
    }
}

impl CallbackHandler for PasswordMap {
    fn handle(&self, request: &CredentialRequest<'_>) -> Result<Option<Credential>, Error> {
        let identifier = self
            .identifiers
            .get(request.identifier)
            .map(String::as_str)
            .unwrap_or(request.identifier);
        let password = self.passwords.get(identifier).cloned();
        let key = self.keys.get(identifier).cloned();
        if password.is_none() && key.is_none() {
            return Ok(None);
        }
        Ok(Some(Credential {
            identifier: identifier.to_owned(),
            password,
            key,
        }))
    }
}
