#![forbid(unsafe_code)]

//! SignatureConfirmation for responses.

use tracing::debug;
use wssec_core::Error;
use wssec_token::{SecurityPart, SignatureConfirmation};
use wssec_xml::XmlDocument;

use super::{Action, ActionCode};
use crate::handler::WsHandler;
use crate::request_data::RequestData;

/// Echoes every signature value of the received request.
///
/// One confirmation is built per signature result across all received
/// result sets, in order, or a single confirmation without a value when
/// the request carried no signature. Each confirmation joins the parts a
/// later signature covers. Runs at most once per message: a response
/// already confirmed by the handler skips it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureConfirmationAction;

impl Action for SignatureConfirmationAction {
    fn execute(
        &self,
        _handler: &WsHandler,
        _action: ActionCode,
        doc: &mut XmlDocument,
        req: &mut RequestData<'_>,
    ) -> Result<(), Error> {
        if req.message_context().is_signature_confirmation_done() {
            debug!("signature confirmation already done");
            return Ok(());
        }
        let confirmations = confirmations(req);
        let header = req
            .security_header()
            .map_err(|e| Error::security("Error during SignatureConfirmation", e))?;
        for confirmation in &confirmations {
            header
                .prepend(doc, confirmation.to_element())
                .map_err(|e| Error::security("Error during SignatureConfirmation", e))?;
        }
        if !req.signature_parts.is_empty() {
            req.signature_parts
                .extend(confirmations.iter().map(|c| SecurityPart::by_id(c.id())));
        }
        req.message_context_mut().set_signature_confirmation_done(true);
        debug!(count = confirmations.len(), "added SignatureConfirmation");
        Ok(())
    }
}

fn confirmations(req: &RequestData<'_>) -> Vec<SignatureConfirmation> {
    let values: Vec<&[u8]> = req
        .message_context()
        .received_results()
        .unwrap_or_default()
        .iter()
        .flat_map(|handler_result| handler_result.results.iter())
        .filter(|result| result.is_signature())
        .map(|result| result.signature_value.as_deref().unwrap_or_default())
        .collect();
    if values.is_empty() {
        return vec![SignatureConfirmation::new(None)];
    }
    values
        .into_iter()
        .map(|value| SignatureConfirmation::new(Some(value)))
        .collect()
}
