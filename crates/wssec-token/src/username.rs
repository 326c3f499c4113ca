#![forbid(unsafe_code)]

//! `wsse:UsernameToken` with clear-text or digest passwords and the
//! secret keys a UsernameToken can sign with.

use base64::Engine;
use chrono::Utc;
use rand::RngCore;
use wssec_core::ns::{self, value_type};
use wssec_core::Error;
use wssec_crypto::{digest::sha1_of, kdf};
use wssec_xml::Element;

use crate::id;
use crate::timestamp::format_instant;

/// How the password travels in the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordType {
    Text,
    Digest,
    /// No Password element at all.
    None,
}

impl PasswordType {
    pub fn uri(self) -> Option<&'static str> {
        match self {
            PasswordType::Text => Some(value_type::PASSWORD_TEXT),
            PasswordType::Digest => Some(value_type::PASSWORD_DIGEST),
            PasswordType::None => None,
        }
    }
}

/// A UsernameToken under construction.
///
/// Nonce and Created are generated once; adding them twice has no further
/// effect. A digest password always carries both.
#[derive(Debug, Clone)]
pub struct UsernameToken {
    id: String,
    user: String,
    password: Option<String>,
    password_type: PasswordType,
    passwords_encoded: bool,
    nonce: Option<Vec<u8>>,
    created: Option<String>,
    salt: Option<Vec<u8>>,
    iteration: Option<u32>,
    milliseconds: bool,
}

impl UsernameToken {
    pub fn new(user: &str, password: Option<&str>, password_type: PasswordType) -> Self {
        let mut token = Self {
            id: id::generate_id("UsernameToken-"),
            user: user.to_owned(),
            password: password.map(str::to_owned),
            password_type,
            passwords_encoded: false,
            nonce: None,
            created: None,
            salt: None,
            iteration: None,
            milliseconds: true,
        };
        if password_type == PasswordType::Digest {
            token.add_nonce();
            token.add_created();
        }
        token
    }

    /// Created values carry milliseconds unless switched off before
    /// `add_created`.
    pub fn set_precision_in_milliseconds(&mut self, milliseconds: bool) {
        self.milliseconds = milliseconds;
        if self.password_type == PasswordType::Digest {
            self.created = Some(format_instant(Utc::now(), milliseconds));
        }
    }

    /// Treat the password as Base64 of the raw password bytes.
    pub fn set_passwords_encoded(&mut self, encoded: bool) {
        self.passwords_encoded = encoded;
    }

    pub fn add_nonce(&mut self) {
        if self.nonce.is_none() {
            let mut nonce = vec![0u8; 16];
            rand::thread_rng().fill_bytes(&mut nonce);
            self.nonce = Some(nonce);
        }
    }

    pub fn add_created(&mut self) {
        if self.created.is_none() {
            self.created = Some(format_instant(Utc::now(), self.milliseconds));
        }
    }

    /// Add Salt and Iteration so the token yields a derived key instead of
    /// the P_SHA1 secret.
    pub fn add_derived_key(&mut self, for_mac: bool, iterations: u32) {
        self.salt = Some(kdf::generate_salt(for_mac));
        self.iteration = Some(if iterations == 0 {
            kdf::DEFAULT_ITERATION
        } else {
            iterations
        });
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn nonce(&self) -> Option<&[u8]> {
        self.nonce.as_deref()
    }

    pub fn created(&self) -> Option<&str> {
        self.created.as_deref()
    }

    fn password_bytes(&self) -> Result<Vec<u8>, Error> {
        let password = self.password.as_deref().unwrap_or("");
        if self.passwords_encoded {
            base64::engine::general_purpose::STANDARD
                .decode(password)
                .map_err(|e| Error::Base64(format!("encoded password: {e}")))
        } else {
            Ok(password.as_bytes().to_vec())
        }
    }

    /// Base64(SHA-1(nonce || created || password)).
    pub fn password_digest(&self) -> Result<String, Error> {
        let nonce = self.nonce.as_deref().unwrap_or(&[]);
        let created = self.created.as_deref().unwrap_or("");
        let password = self.password_bytes()?;
        let digest = sha1_of(&[nonce, created.as_bytes(), password.as_slice()]);
        Ok(base64::engine::general_purpose::STANDARD.encode(digest))
    }

    /// The key this token signs with: the iterated SHA-1 derived key when a
    /// Salt is present, else P_SHA1 over the nonce and created time.
    pub fn secret_key(&self) -> Result<Vec<u8>, Error> {
        let password = self.password_bytes()?;
        if let Some(salt) = &self.salt {
            return Ok(kdf::derive_key(
                &password,
                salt,
                self.iteration.unwrap_or(kdf::DEFAULT_ITERATION),
            ));
        }
        let (Some(nonce), Some(created)) = (&self.nonce, &self.created) else {
            return Err(Error::Key(
                "UsernameToken secret key needs Nonce and Created".into(),
            ));
        };
        kdf::secret_key(
            &password,
            kdf::SECRET_KEY_LABEL,
            nonce,
            created,
            kdf::SECRET_KEY_LENGTH,
        )
    }

    pub fn to_element(&self) -> Result<Element, Error> {
        let b64 = base64::engine::general_purpose::STANDARD;
        let mut el = Element::new(ns::WSSE, ns::prefix::WSSE, ns::node::USERNAME_TOKEN);
        id::set_wsu_id(&mut el, &self.id);
        el.push_child(
            Element::new(ns::WSSE, ns::prefix::WSSE, ns::node::USERNAME).text(self.user.as_str()),
        );

        if let Some(type_uri) = self.password_type.uri() {
            let password = self.password.as_deref().ok_or_else(|| {
                Error::Key(format!("no password for UsernameToken user {}", self.user))
            })?;
            let value = match self.password_type {
                PasswordType::Digest => self.password_digest()?,
                _ => password.to_owned(),
            };
            el.push_child(
                Element::new(ns::WSSE, ns::prefix::WSSE, ns::node::PASSWORD)
                    .attr(ns::attr::TYPE, type_uri)
                    .text(value),
            );
        }
        if let Some(nonce) = &self.nonce {
            el.push_child(
                Element::new(ns::WSSE, ns::prefix::WSSE, ns::node::NONCE)
                    .attr(ns::attr::ENCODING_TYPE, value_type::BASE64_BINARY)
                    .text(b64.encode(nonce)),
            );
        }
        if let Some(created) = &self.created {
            el.push_child(
                Element::new(ns::WSU, ns::prefix::WSU, ns::node::CREATED).text(created.as_str()),
            );
        }
        if let Some(salt) = &self.salt {
            el.push_child(
                Element::new(ns::WSSE11, ns::prefix::WSSE11, ns::node::SALT).text(b64.encode(salt)),
            );
        }
        if let Some(iteration) = self.iteration {
            el.push_child(
                Element::new(ns::WSSE11, ns::prefix::WSSE11, ns::node::ITERATION)
                    .text(iteration.to_string()),
            );
        }
        Ok(el)
    }
}
