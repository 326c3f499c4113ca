#![forbid(unsafe_code)]

//! Pipeline actions.
//!
//! Each action adds one kind of token to the security header. Actions are
//! stateless; everything they read or produce lives in [`RequestData`] and
//! the document.

pub mod encryption;
pub mod saml;
pub mod signature;
pub mod signature_confirmation;
pub mod timestamp;
pub mod username_token;
pub mod username_token_signed;

use std::collections::HashMap;
use std::sync::Arc;

use wssec_core::Error;
use wssec_xml::XmlDocument;

use crate::handler::WsHandler;
use crate::request_data::RequestData;

pub use encryption::EncryptionAction;
pub use saml::{SamlTokenSignedAction, SamlTokenUnsignedAction};
pub use signature::SignatureAction;
pub use signature_confirmation::SignatureConfirmationAction;
pub use timestamp::TimestampAction;
pub use username_token::UsernameTokenAction;
pub use username_token_signed::UsernameTokenSignedAction;

/// Action codes. Built-in codes are distinct bits so a configured action
/// list folds into a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCode {
    UsernameToken,
    Signature,
    Encrypt,
    SamlTokenUnsigned,
    SamlTokenSigned,
    Timestamp,
    UsernameTokenSignature,
    SignatureConfirmation,
    NoSerialization,
    /// A code handled by a registered custom action.
    Custom(u32),
}

impl ActionCode {
    pub fn code(self) -> u32 {
        match self {
            ActionCode::UsernameToken => 0x1,
            ActionCode::Signature => 0x2,
            ActionCode::Encrypt => 0x4,
            ActionCode::SamlTokenUnsigned => 0x8,
            ActionCode::SamlTokenSigned => 0x10,
            ActionCode::Timestamp => 0x20,
            ActionCode::UsernameTokenSignature => 0x40,
            ActionCode::SignatureConfirmation => 0x80,
            ActionCode::NoSerialization => 0x100,
            ActionCode::Custom(code) => code,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            0x1 => ActionCode::UsernameToken,
            0x2 => ActionCode::Signature,
            0x4 => ActionCode::Encrypt,
            0x8 => ActionCode::SamlTokenUnsigned,
            0x10 => ActionCode::SamlTokenSigned,
            0x20 => ActionCode::Timestamp,
            0x40 => ActionCode::UsernameTokenSignature,
            0x80 => ActionCode::SignatureConfirmation,
            0x100 => ActionCode::NoSerialization,
            other => ActionCode::Custom(other),
        }
    }

    /// The configuration name of a built-in action.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "UsernameToken" => Some(ActionCode::UsernameToken),
            "Signature" => Some(ActionCode::Signature),
            "Encrypt" => Some(ActionCode::Encrypt),
            "SAMLTokenUnsigned" => Some(ActionCode::SamlTokenUnsigned),
            "SAMLTokenSigned" => Some(ActionCode::SamlTokenSigned),
            "Timestamp" => Some(ActionCode::Timestamp),
            "UsernameTokenSignature" => Some(ActionCode::UsernameTokenSignature),
            "enableSignatureConfirmation" | "SignatureConfirmation" => {
                Some(ActionCode::SignatureConfirmation)
            }
            "NoSerialization" => Some(ActionCode::NoSerialization),
            _ => None,
        }
    }

    pub fn is_custom(self) -> bool {
        matches!(self, ActionCode::Custom(_))
    }
}

impl std::fmt::Display for ActionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionCode::UsernameToken => f.write_str("UsernameToken"),
            ActionCode::Signature => f.write_str("Signature"),
            ActionCode::Encrypt => f.write_str("Encrypt"),
            ActionCode::SamlTokenUnsigned => f.write_str("SAMLTokenUnsigned"),
            ActionCode::SamlTokenSigned => f.write_str("SAMLTokenSigned"),
            ActionCode::Timestamp => f.write_str("Timestamp"),
            ActionCode::UsernameTokenSignature => f.write_str("UsernameTokenSignature"),
            ActionCode::SignatureConfirmation => f.write_str("SignatureConfirmation"),
            ActionCode::NoSerialization => f.write_str("NoSerialization"),
            ActionCode::Custom(code) => write!(f, "custom action {code}"),
        }
    }
}

const NO_SECURITY: &str = "NoSecurity";

/// Decode a whitespace-separated action list.
///
/// Returns the actions in order and the OR of the built-in codes. A
/// `NoSecurity` entry disables processing altogether.
pub fn decode_action(text: &str) -> Result<(Vec<ActionCode>, u32), Error> {
    let mut actions = Vec::new();
    let mut mask = 0;
    for name in text.split_whitespace() {
        if name == NO_SECURITY {
            return Ok((Vec::new(), 0));
        }
        let action = match ActionCode::from_name(name) {
            Some(action) => action,
            None => match name.parse::<u32>() {
                Ok(code) => ActionCode::from_code(code),
                Err(_) => {
                    return Err(Error::Config(format!("Unknown action defined: {name}")));
                }
            },
        };
        if !action.is_custom() {
            mask |= action.code();
        }
        actions.push(action);
    }
    Ok((actions, mask))
}

/// One step of the sender pipeline.
pub trait Action: Send + Sync {
    /// Add this action's tokens to `doc`.
    ///
    /// On error nothing of this action is in the document, and the error
    /// is a single security-processing error naming the action.
    fn execute(
        &self,
        handler: &WsHandler,
        action: ActionCode,
        doc: &mut XmlDocument,
        req: &mut RequestData<'_>,
    ) -> Result<(), Error>;
}

/// The built-in actions keyed by code.
pub(crate) fn builtin_actions() -> HashMap<ActionCode, Arc<dyn Action>> {
    let mut actions: HashMap<ActionCode, Arc<dyn Action>> = HashMap::new();
    actions.insert(ActionCode::UsernameToken, Arc::new(UsernameTokenAction));
    actions.insert(ActionCode::Signature, Arc::new(SignatureAction));
    actions.insert(ActionCode::Encrypt, Arc::new(EncryptionAction));
    actions.insert(ActionCode::SamlTokenUnsigned, Arc::new(SamlTokenUnsignedAction));
    actions.insert(ActionCode::SamlTokenSigned, Arc::new(SamlTokenSignedAction));
    actions.insert(ActionCode::Timestamp, Arc::new(TimestampAction));
    actions.insert(
        ActionCode::UsernameTokenSignature,
        Arc::new(UsernameTokenSignedAction),
    );
    actions.insert(
        ActionCode::SignatureConfirmation,
        Arc::new(SignatureConfirmationAction),
    );
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_action() {
        let (actions, mask) = decode_action("Timestamp  Signature Encrypt").unwrap();
        assert_eq!(
            actions,
            vec![ActionCode::Timestamp, ActionCode::Signature, ActionCode::Encrypt]
        );
        assert_eq!(mask, 0x20 | 0x2 | 0x4);
    }

    #[test]
    fn test_decode_confirmation_names() {
        let (actions, mask) = decode_action("SignatureConfirmation enableSignatureConfirmation").unwrap();
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| *a == ActionCode::SignatureConfirmation));
        assert_eq!(mask, 0x80);
    }

    #[test]
    fn test_decode_no_security() {
        let (actions, mask) = decode_action("NoSecurity Signature").unwrap();
        assert!(actions.is_empty());
        assert_eq!(mask, 0);
        assert!(decode_action("   ").unwrap().0.is_empty());
    }

    #[test]
    fn test_decode_custom_and_unknown() {
        let (actions, mask) = decode_action("UsernameToken 4096").unwrap();
        assert_eq!(actions, vec![ActionCode::UsernameToken, ActionCode::Custom(4096)]);
        assert_eq!(mask, 0x1);
        // A number naming a built-in code is that action.
        assert_eq!(decode_action("2").unwrap().0, vec![ActionCode::Signature]);

        let err = decode_action("Timestamp Sign").unwrap_err();
        assert_eq!(err.to_string(), "configuration error: Unknown action defined: Sign");
    }

    #[test]
    fn test_code_round_trip() {
        for code in [0x1, 0x2, 0x4, 0x8, 0x10, 0x20, 0x40, 0x80, 0x100, 0x2000] {
            assert_eq!(ActionCode::from_code(code).code(), code);
        }
        assert!(ActionCode::from_code(0x2000).is_custom());
    }

    #[test]
    fn test_builtin_registry() {
        let actions = builtin_actions();
        assert_eq!(actions.len(), 8);
        assert!(!actions.contains_key(&ActionCode::NoSerialization));
    }
}
