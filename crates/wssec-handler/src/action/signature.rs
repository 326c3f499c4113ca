#![forbid(unsafe_code)]

//! X.509 or shared-key signature over the configured parts.

use base64::Engine;
use tracing::debug;
use wssec_core::Error;
use wssec_crypto::{digest, SigningKey};
use wssec_token::token_ref::{self, KeyIdentifierType};
use wssec_token::{KeyReference, SignatureBuilder};
use wssec_xml::XmlDocument;

use super::{Action, ActionCode};
use crate::callback::Credential;
use crate::config::keys;
use crate::handler::WsHandler;
use crate::request_data::RequestData;

/// Signs the configured parts (the SOAP Body by default) as the signature
/// user.
///
/// A credential carrying a raw key signs with HMAC and names the key, as
/// does a shared secret stored under the user's alias in the signature
/// keystore. Otherwise the user's private key comes from that keystore
/// and the callback password unlocks it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureAction;

impl Action for SignatureAction {
    fn execute(
        &self,
        handler: &WsHandler,
        action: ActionCode,
        doc: &mut XmlDocument,
        req: &mut RequestData<'_>,
    ) -> Result<(), Error> {
        build(handler, action, doc, req).map_err(|e| Error::security("Error during Signature", e))
    }
}

fn build(
    handler: &WsHandler,
    action: ActionCode,
    doc: &mut XmlDocument,
    req: &mut RequestData<'_>,
) -> Result<(), Error> {
    let user = req
        .signature_user
        .clone()
        .or_else(|| req.username.clone())
        .unwrap_or_default();
    let credential = handler.get_password(
        &user,
        action,
        keys::PW_CALLBACK_CLASS,
        keys::PW_CALLBACK_REF,
        req,
    )?;
    let key_id = req.sig_key_id.unwrap_or(KeyIdentifierType::IssuerSerial);

    let secret = credential.key.as_deref().or_else(|| {
        req.sig_crypto
            .as_ref()
            .and_then(|crypto| crypto.secret(&user))
    });
    let (key, reference) = match secret {
        Some(secret) => secret_key_reference(&user, secret, key_id),
        None => certificate_key(&user, &credential, key_id, req)?,
    };

    let computed = SignatureBuilder::new()
        .signature_algorithm(req.sig_algorithm.as_deref())
        .digest_algorithm(req.sig_digest_algorithm.as_deref())
        .parts(req.signature_parts.clone())
        .key_reference(reference)
        .compute(doc, &key)?;
    let id = computed.id().to_owned();
    let value = computed.prepend_to_header(doc, &req.security_header()?)?;
    req.signature_values.push(value);
    debug!(user = %user, id = %id, key_id = ?key_id, "added Signature");
    Ok(())
}

fn secret_key_reference(
    user: &str,
    secret: &[u8],
    key_id: KeyIdentifierType,
) -> (SigningKey, KeyReference) {
    let key_info = if key_id == KeyIdentifierType::EncryptedKeySha1 {
        let sha1 = digest::sha1_of(&[secret]);
        token_ref::encrypted_key_sha1(&base64::engine::general_purpose::STANDARD.encode(sha1))
    } else {
        token_ref::key_name(user)
    };
    (
        SigningKey::Hmac(secret.to_vec()),
        KeyReference {
            key_info: vec![key_info],
            binary_token: None,
        },
    )
}

fn certificate_key(
    user: &str,
    credential: &Credential,
    key_id: KeyIdentifierType,
    req: &RequestData<'_>,
) -> Result<(SigningKey, KeyReference), Error> {
    let crypto = req
        .sig_crypto
        .as_ref()
        .ok_or_else(|| Error::Config("WSHandler: Signature: no signature keystore configured".into()))?;
    let private = crypto.private_key(user, credential.password.as_deref())?;
    let chain = crypto.certificates(user)?;
    let reference = token_ref::certificate_reference(key_id, chain, req.use_single_cert)?;
    Ok((private.to_signing_key(), reference))
}
