#![forbid(unsafe_code)]

//! WS-Security token builders.
//!
//! Each builder computes a complete fragment (and any `wsu:Id` it needs
//! on signed or encrypted parts) before touching the message, then places
//! it into the `wsse:Security` header in one step.

pub mod encrypt;
pub mod header;
pub mod id;
pub mod parts;
pub mod saml;
pub mod sigconf;
pub mod signature;
pub mod timestamp;
pub mod token_ref;
pub mod username;
pub mod verify;

pub use encrypt::{ComputedEncryption, EncryptionBuilder, KeyEncryption};
pub use header::SecurityHeader;
pub use parts::{PartModifier, SecurityPart};
pub use saml::{DefaultSamlIssuer, SamlAssertion, SamlIssuer, SamlIssuerConfig, SignedSamlBuilder};
pub use sigconf::SignatureConfirmation;
pub use signature::{ComputedSignature, SignatureBuilder};
pub use timestamp::Timestamp;
pub use token_ref::{KeyIdentifierType, KeyReference};
pub use username::{PasswordType, UsernameToken};
pub use verify::{verify_signature, VerifiedSignature};
