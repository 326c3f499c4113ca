#![forbid(unsafe_code)]

use tracing::debug;
use wssec_core::Error;
use wssec_token::Timestamp;
use wssec_xml::XmlDocument;

use super::{Action, ActionCode};
use crate::handler::WsHandler;
use crate::request_data::RequestData;

/// Prepends a `wsu:Timestamp` expiring after the configured time to live.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampAction;

impl Action for TimestampAction {
    fn execute(
        &self,
        _handler: &WsHandler,
        _action: ActionCode,
        doc: &mut XmlDocument,
        req: &mut RequestData<'_>,
    ) -> Result<(), Error> {
        let timestamp = Timestamp::new(req.time_to_live, req.precision_in_milliseconds);
        req.security_header()
            .and_then(|header| header.prepend(doc, timestamp.to_element()))
            .map_err(|e| Error::security("Error during Timestamp", e))?;
        debug!(id = timestamp.id(), ttl = req.time_to_live, "added Timestamp");
        Ok(())
    }
}
