#![forbid(unsafe_code)]

//! Plain UsernameToken.

use tracing::debug;
use wssec_core::Error;
use wssec_token::{PasswordType, UsernameToken};
use wssec_xml::XmlDocument;

use super::{Action, ActionCode};
use crate::config::keys;
use crate::handler::WsHandler;
use crate::request_data::RequestData;

const NONCE: &str = "Nonce";
const CREATED: &str = "Created";

/// Prepends a UsernameToken for the configured user.
///
/// The password callback also supplies the user name placed on the wire,
/// which may differ from the configured one. Without a password type no
/// callback is made.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsernameTokenAction;

impl Action for UsernameTokenAction {
    fn execute(
        &self,
        handler: &WsHandler,
        action: ActionCode,
        doc: &mut XmlDocument,
        req: &mut RequestData<'_>,
    ) -> Result<(), Error> {
        build(handler, action, doc, req).map_err(|e| Error::security("Error during UsernameToken", e))
    }
}

fn build(
    handler: &WsHandler,
    action: ActionCode,
    doc: &mut XmlDocument,
    req: &mut RequestData<'_>,
) -> Result<(), Error> {
    let configured = req.username.clone().unwrap_or_default();
    let (user, password) = if req.password_type == PasswordType::None {
        (configured, None)
    } else {
        let credential = handler.get_password(
            &configured,
            action,
            keys::PW_CALLBACK_CLASS,
            keys::PW_CALLBACK_REF,
            req,
        )?;
        (credential.identifier, credential.password)
    };

    let mut token = UsernameToken::new(&user, password.as_deref(), req.password_type);
    token.set_passwords_encoded(req.passwords_encoded);
    token.set_precision_in_milliseconds(req.precision_in_milliseconds);
    // Each extra element is honoured once per message.
    for element in std::mem::take(&mut req.ut_elements) {
        match element.as_str() {
            NONCE => token.add_nonce(),
            CREATED => token.add_created(),
            _ => {}
        }
    }

    let el = token.to_element()?;
    req.security_header()?.prepend(doc, el)?;
    debug!(user = %user, id = token.id(), "added UsernameToken");
    Ok(())
}
