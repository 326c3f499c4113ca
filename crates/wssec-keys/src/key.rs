#![forbid(unsafe_code)]

//! Key types and data structures.

use crate::x509::X509Cert;
use wssec_crypto::SigningKey;

/// Usage flags for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    Sign,
    Verify,
    Encrypt,
    Any,
}

/// The underlying key data.
#[derive(Clone)]
pub enum KeyData {
    Rsa {
        private: Option<rsa::RsaPrivateKey>,
        public: rsa::RsaPublicKey,
    },
    /// Raw secret bytes, used for HMAC and for symmetric encryption.
    Symmetric(Vec<u8>),
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa { private, .. } => {
                if private.is_some() {
                    write!(f, "RSA private+public key")
                } else {
                    write!(f, "RSA public key")
                }
            }
            Self::Symmetric(k) => write!(f, "symmetric key ({} bytes)", k.len()),
        }
    }
}

/// A named key with associated data.
#[derive(Debug, Clone)]
pub struct Key {
    /// Optional name for key lookup.
    pub name: Option<String>,
    /// The key data.
    pub data: KeyData,
    /// The intended usage.
    pub usage: KeyUsage,
    /// Certificate chain, end-entity first.
    pub x509_chain: Vec<X509Cert>,
}

impl Key {
    /// Create a new key.
    pub fn new(data: KeyData, usage: KeyUsage) -> Self {
        Self {
            name: None,
            data,
            usage,
            x509_chain: Vec::new(),
        }
    }

    /// Set the key name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Wrap an RSA private key.
    pub fn rsa_private(private: rsa::RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self::new(
            KeyData::Rsa {
                private: Some(private),
                public,
            },
            KeyUsage::Any,
        )
    }

    /// Wrap raw secret bytes.
    pub fn symmetric(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(KeyData::Symmetric(bytes.into()), KeyUsage::Any)
    }

    /// Convert to a `SigningKey` for use with crypto algorithms.
    pub fn to_signing_key(&self) -> SigningKey {
        match &self.data {
            KeyData::Rsa {
                private: Some(pk), ..
            } => SigningKey::Rsa(pk.clone()),
            KeyData::Rsa { public, .. } => SigningKey::RsaPublic(public.clone()),
            KeyData::Symmetric(k) => SigningKey::Hmac(k.clone()),
        }
    }

    /// Get the raw symmetric key bytes.
    pub fn symmetric_key_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            KeyData::Symmetric(k) => Some(k),
            _ => None,
        }
    }

    /// Get the RSA public key if available.
    pub fn rsa_public_key(&self) -> Option<&rsa::RsaPublicKey> {
        match &self.data {
            KeyData::Rsa { public, .. } => Some(public),
            _ => None,
        }
    }

    /// Get the RSA private key if available.
    pub fn rsa_private_key(&self) -> Option<&rsa::RsaPrivateKey> {
        match &self.data {
            KeyData::Rsa {
                private: Some(pk), ..
            } => Some(pk),
            _ => None,
        }
    }

    /// The end-entity certificate, if the key carries a chain.
    pub fn certificate(&self) -> Option<&X509Cert> {
        self.x509_chain.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_signing_key() {
        let key = Key::symmetric(vec![7u8; 16]).with_name("shared");
        assert_eq!(key.name.as_deref(), Some("shared"));
        assert_eq!(key.symmetric_key_bytes(), Some(&[7u8; 16][..]));
        assert!(key.to_signing_key().is_symmetric());
        assert!(key.rsa_public_key().is_none());
        assert_eq!(format!("{:?}", key.data), "symmetric key (16 bytes)");
    }
}
