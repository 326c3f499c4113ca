#![forbid(unsafe_code)]

//! Cryptographic algorithm implementations for the wssec WS-Security library.
//!
//! Provides traits and implementations for the operations the security
//! token builders need: digests, signatures, block ciphers, key transport
//! and the UsernameToken key derivations.

pub mod cipher;
pub mod digest;
pub mod kdf;
pub mod keytransport;
pub mod sign;

pub use cipher::CipherAlgorithm;
pub use digest::DigestAlgorithm;
pub use keytransport::KeyTransportAlgorithm;
pub use sign::{SignatureAlgorithm, SigningKey};
