#![forbid(unsafe_code)]

//! Results of processing a received message, as consumed by signature
//! confirmation and the receiver-side checks.

use wssec_keys::X509Cert;
use wssec_token::SignatureConfirmation;

use crate::action::ActionCode;

/// Result kind of a processed BinarySecurityToken. Never configured as an
/// action.
pub const BST: u32 = 0x1000;

/// The outcome of one processed header element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineResult {
    /// Action code of the element, or [`BST`].
    pub action: u32,
    pub signature_value: Option<Vec<u8>>,
    pub certificate: Option<X509Cert>,
    pub signature_confirmation: Option<SignatureConfirmation>,
}

impl EngineResult {
    pub fn new(action: u32) -> Self {
        Self {
            action,
            signature_value: None,
            certificate: None,
            signature_confirmation: None,
        }
    }

    /// A verified signature of kind `action` (Signature, SAMLTokenSigned or
    /// UsernameTokenSignature).
    pub fn signature(action: ActionCode, value: Vec<u8>, certificate: Option<X509Cert>) -> Self {
        Self {
            signature_value: Some(value),
            certificate,
            ..Self::new(action.code())
        }
    }

    /// A received SignatureConfirmation.
    pub fn confirmation(confirmation: SignatureConfirmation) -> Self {
        Self {
            signature_confirmation: Some(confirmation),
            ..Self::new(ActionCode::SignatureConfirmation.code())
        }
    }

    /// Whether this result stems from a signature.
    pub fn is_signature(&self) -> bool {
        [
            ActionCode::Signature,
            ActionCode::SamlTokenSigned,
            ActionCode::UsernameTokenSignature,
        ]
        .iter()
        .any(|a| a.code() == self.action)
    }
}

/// The results one security header produced, tagged with its actor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerResult {
    pub actor: Option<String>,
    pub results: Vec<EngineResult>,
}

impl HandlerResult {
    pub fn new(actor: Option<&str>, results: Vec<EngineResult>) -> Self {
        Self {
            actor: actor.map(str::to_owned),
            results,
        }
    }
}
