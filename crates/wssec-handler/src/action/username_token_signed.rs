#![forbid(unsafe_code)]

//! Signature keyed by a UsernameToken secret.

use tracing::debug;
use wssec_core::{algorithm, Error};
use wssec_crypto::SigningKey;
use wssec_token::token_ref::username_token_reference;
use wssec_token::{KeyReference, PasswordType, SignatureBuilder, UsernameToken};
use wssec_xml::XmlDocument;

use super::{Action, ActionCode};
use crate::config::keys;
use crate::handler::WsHandler;
use crate::request_data::RequestData;

/// Builds a UsernameToken, signs the configured parts with the key it
/// yields and places both so the token precedes the Signature.
///
/// With `useDerivedKey` the token carries Salt and Iteration and no
/// password; otherwise it carries Nonce and Created and the key is the
/// P_SHA1 secret.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsernameTokenSignedAction;

impl Action for UsernameTokenSignedAction {
    fn execute(
        &self,
        handler: &WsHandler,
        action: ActionCode,
        doc: &mut XmlDocument,
        req: &mut RequestData<'_>,
    ) -> Result<(), Error> {
        build(handler, action, doc, req)
            .map_err(|e| Error::security("Error during UsernameTokenSignature", e))
    }
}

fn build(
    handler: &WsHandler,
    action: ActionCode,
    doc: &mut XmlDocument,
    req: &mut RequestData<'_>,
) -> Result<(), Error> {
    let configured = req.username.clone().unwrap_or_default();
    let credential = handler.get_password(
        &configured,
        action,
        keys::PW_CALLBACK_CLASS,
        keys::PW_CALLBACK_REF,
        req,
    )?;
    let password = credential.password.as_deref();

    let mut token = if req.use_derived_key {
        let mut token = UsernameToken::new(&credential.identifier, password, PasswordType::None);
        token.add_derived_key(req.use_derived_key_for_mac, req.derived_key_iterations);
        token
    } else {
        let mut token = UsernameToken::new(&credential.identifier, password, req.password_type);
        token.set_precision_in_milliseconds(req.precision_in_milliseconds);
        token.add_nonce();
        token.add_created();
        token
    };
    token.set_passwords_encoded(req.passwords_encoded);

    let key = SigningKey::Hmac(token.secret_key()?);
    let token_el = token.to_element()?;
    let computed = SignatureBuilder::new()
        .signature_algorithm(Some(
            req.sig_algorithm.as_deref().unwrap_or(algorithm::HMAC_SHA1),
        ))
        .digest_algorithm(req.sig_digest_algorithm.as_deref())
        .parts(req.signature_parts.clone())
        .key_reference(KeyReference {
            key_info: vec![username_token_reference(token.id())],
            binary_token: None,
        })
        .compute(doc, &key)?;

    let header = req.security_header()?;
    let (signature, _, value) = computed.into_elements(doc)?;
    header.prepend(doc, signature)?;
    header.prepend(doc, token_el)?;
    req.signature_values.push(value);
    debug!(user = %credential.identifier, derived = req.use_derived_key, "signed with UsernameToken key");
    Ok(())
}
