#![forbid(unsafe_code)]

//! SAML assertions, signed and unsigned.
//!
//! Both actions obtain their issuer through [`load_saml_issuer`]: the
//! issuer registered on the handler, else the one described by the
//! `samlPropFile` option.

use std::sync::Arc;

use tracing::{debug, warn};
use wssec_core::Error;
use wssec_crypto::SigningKey;
use wssec_keys::{KeysManager, X509Cert};
use wssec_token::{DefaultSamlIssuer, SamlAssertion, SamlIssuer, SignedSamlBuilder};
use wssec_xml::XmlDocument;

use super::{Action, ActionCode};
use crate::config::keys;
use crate::handler::WsHandler;
use crate::request_data::RequestData;

/// The SAML issuer for this message.
pub fn load_saml_issuer(
    handler: &WsHandler,
    req: &RequestData<'_>,
) -> Result<Arc<dyn SamlIssuer>, Error> {
    if let Some(issuer) = handler.saml_issuer() {
        return Ok(issuer);
    }
    let file = handler
        .get_string(keys::SAML_PROP_FILE, req.message_context())
        .ok_or_else(|| Error::Config("WSHandler: no SAML issuer configured".into()))?;
    let issuer = DefaultSamlIssuer::from_file(&handler.resolve_path(&file))?;
    Ok(Arc::new(issuer))
}

fn new_assertion(issuer: &dyn SamlIssuer, req: &RequestData<'_>) -> Result<SamlAssertion, Error> {
    let user = req.username.as_deref().unwrap_or_default();
    issuer
        .new_assertion(user)?
        .ok_or_else(|| Error::MissingArtifact("no SAML token received".into()))
}

/// Prepends an unsigned assertion about the configured user.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamlTokenUnsignedAction;

impl Action for SamlTokenUnsignedAction {
    fn execute(
        &self,
        handler: &WsHandler,
        _action: ActionCode,
        doc: &mut XmlDocument,
        req: &mut RequestData<'_>,
    ) -> Result<(), Error> {
        build_unsigned(handler, doc, req)
            .map_err(|e| Error::security("WSHandler: Unsigned SAML", e))
    }
}

fn build_unsigned(
    handler: &WsHandler,
    doc: &mut XmlDocument,
    req: &RequestData<'_>,
) -> Result<(), Error> {
    let issuer = load_saml_issuer(handler, req)?;
    let assertion = new_assertion(issuer.as_ref(), req)?;
    let id = assertion.id().to_owned();
    req.security_header()?.prepend(doc, assertion.into_element())?;
    debug!(id = %id, "added unsigned SAML assertion");
    Ok(())
}

/// Prepends an assertion together with a signature over it and the
/// configured parts.
///
/// A sender-vouches issuer signs with its own key. Otherwise the subject
/// signs with its key from the signature keystore, unlocked by the
/// password callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamlTokenSignedAction;

impl Action for SamlTokenSignedAction {
    fn execute(
        &self,
        handler: &WsHandler,
        action: ActionCode,
        doc: &mut XmlDocument,
        req: &mut RequestData<'_>,
    ) -> Result<(), Error> {
        build_signed(handler, action, doc, req)
            .map_err(|e| Error::security("WSHandler: Signed SAML", e))
    }
}

fn build_signed(
    handler: &WsHandler,
    action: ActionCode,
    doc: &mut XmlDocument,
    req: &mut RequestData<'_>,
) -> Result<(), Error> {
    // Sender-vouches needs no user keystore.
    let user_crypto = match handler.load_signature_crypto(req) {
        Ok(crypto) => crypto,
        Err(e) => {
            warn!(error = %e, "signature keystore unavailable for signed SAML");
            None
        }
    };

    let issuer = load_saml_issuer(handler, req)?;
    let assertion = new_assertion(issuer.as_ref(), req)?;

    let (key, chain) = if issuer.is_sender_vouches() {
        let crypto = issuer
            .issuer_crypto()
            .ok_or_else(|| Error::Config("SAML issuer has no keystore".into()))?;
        signing_material(
            crypto,
            issuer.issuer_key_name(),
            issuer.issuer_key_password(),
        )?
    } else {
        let user = req.username.clone().unwrap_or_default();
        let credential = handler.get_password(
            &user,
            action,
            keys::PW_CALLBACK_CLASS,
            keys::PW_CALLBACK_REF,
            req,
        )?;
        let crypto = user_crypto.as_deref().ok_or_else(|| {
            Error::Config("WSHandler: Signed SAML: no signature keystore configured".into())
        })?;
        signing_material(crypto, Some(&user), credential.password.as_deref())?
    };

    let mut builder = SignedSamlBuilder::new()
        .use_single_certificate(req.use_single_cert)
        .signature_algorithm(req.sig_algorithm.as_deref())
        .digest_algorithm(req.sig_digest_algorithm.as_deref())
        .parts(req.signature_parts.clone());
    if let Some(kind) = req.sig_key_id {
        builder = builder.key_identifier(kind)?;
    }
    let id = assertion.id().to_owned();
    let computed = builder.compute(doc, assertion, &key, &chain)?;
    let value = computed.prepend_to_header(doc, &req.security_header()?)?;
    req.signature_values.push(value);
    debug!(id = %id, sender_vouches = issuer.is_sender_vouches(), "added signed SAML assertion");
    Ok(())
}

fn signing_material(
    crypto: &KeysManager,
    alias: Option<&str>,
    password: Option<&str>,
) -> Result<(SigningKey, Vec<X509Cert>), Error> {
    let alias = alias
        .or_else(|| crypto.default_alias())
        .ok_or_else(|| Error::KeyNotFound("no signing key alias for SAML".into()))?;
    let key = crypto.private_key(alias, password)?.to_signing_key();
    let chain = crypto.certificates(alias)?.to_vec();
    Ok((key, chain))
}
