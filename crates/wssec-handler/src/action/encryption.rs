#![forbid(unsafe_code)]

//! XML Encryption of the configured parts.

use tracing::debug;
use wssec_core::Error;
use wssec_token::{EncryptionBuilder, KeyEncryption, KeyIdentifierType};
use wssec_xml::XmlDocument;

use super::{Action, ActionCode};
use crate::config::keys;
use crate::handler::WsHandler;
use crate::request_data::RequestData;

/// Encrypts the configured parts (the SOAP Body content by default) for
/// the encryption user.
///
/// The session key is wrapped for the user's certificate, named by an
/// embedded key name, or, with `encryptSymmetricEncryptionKey` off, not
/// transported at all. Shared keys come from the key callback, else from
/// the encryption keystore's secrets.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncryptionAction;

impl Action for EncryptionAction {
    fn execute(
        &self,
        handler: &WsHandler,
        action: ActionCode,
        doc: &mut XmlDocument,
        req: &mut RequestData<'_>,
    ) -> Result<(), Error> {
        build(handler, action, doc, req).map_err(|e| Error::security("Error during encryption", e))
    }
}

fn build(
    handler: &WsHandler,
    action: ActionCode,
    doc: &mut XmlDocument,
    req: &mut RequestData<'_>,
) -> Result<(), Error> {
    let key = key_encryption(handler, action, req)?;
    let computed = EncryptionBuilder::new(key)
        .symmetric_algorithm(req.enc_sym_algorithm.as_deref())
        .key_transport_algorithm(req.enc_key_transport.as_deref())
        .parts(req.encrypt_parts.clone())
        .compute(doc)?;
    let count = computed.data_ids().len();
    computed.apply(doc, &req.security_header()?)?;
    debug!(user = ?req.enc_user, parts = count, "encrypted message parts");
    Ok(())
}

fn shared_key(
    handler: &WsHandler,
    action: ActionCode,
    user: &str,
    req: &RequestData<'_>,
) -> Result<Vec<u8>, Error> {
    let credential = handler.get_password(
        user,
        action,
        keys::ENC_CALLBACK_CLASS,
        keys::ENC_CALLBACK_REF,
        req,
    )?;
    if let Some(key) = credential.key {
        return Ok(key);
    }
    req.enc_crypto
        .as_ref()
        .and_then(|crypto| crypto.secret(user))
        .map(<[u8]>::to_vec)
        .ok_or_else(|| Error::Callback(format!("no symmetric key supplied for {user}")))
}

fn key_encryption(
    handler: &WsHandler,
    action: ActionCode,
    req: &RequestData<'_>,
) -> Result<KeyEncryption, Error> {
    let user = req.enc_user.clone().unwrap_or_default();
    let key_id = req.enc_key_id.unwrap_or(KeyIdentifierType::IssuerSerial);

    if !req.encrypt_symmetric_encryption_key {
        return Ok(KeyEncryption::Unencrypted {
            key: shared_key(handler, action, &user, req)?,
            sha1_reference: key_id == KeyIdentifierType::EncryptedKeySha1,
        });
    }

    if key_id == KeyIdentifierType::EmbeddedKeyName {
        let name = req.embedded_key_name.clone().unwrap_or_else(|| user.clone());
        return Ok(KeyEncryption::EmbeddedKeyName {
            key: shared_key(handler, action, &user, req)?,
            name,
        });
    }

    let chain = match &req.enc_cert {
        Some(cert) => vec![cert.clone()],
        None => {
            let crypto = req.enc_crypto.as_ref().ok_or_else(|| {
                Error::Config("WSHandler: Encryption: no encryption keystore configured".into())
            })?;
            crypto.certificates(&user)?.to_vec()
        }
    };
    Ok(KeyEncryption::Certificate {
        chain,
        key_identifier: key_id,
        use_single_cert: req.use_single_cert,
    })
}
