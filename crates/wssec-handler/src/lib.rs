#![forbid(unsafe_code)]

//! The WS-Security action pipeline.
//!
//! A [`WsHandler`] is configured once from [`HandlerOptions`] and secures
//! any number of SOAP messages. For each message it reads the `action`
//! list, decodes the options those actions need into a [`RequestData`],
//! inserts the `wsse:Security` header and runs the actions in order.
//!
//! ```no_run
//! use wssec_handler::{HandlerOptions, MessageContext, WsHandler};
//! use wssec_xml::XmlDocument;
//!
//! # fn main() -> Result<(), wssec_core::Error> {
//! let handler = WsHandler::new(HandlerOptions::parse("action = \"Timestamp\"")?);
//! let mut doc: XmlDocument = std::fs::read_to_string("request.xml")?.parse()?;
//! let mut msg = MessageContext::new();
//! handler.secure(&mut doc, &mut msg, true)?;
//! println!("{}", doc.to_xml());
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod callback;
pub mod config;
pub mod handler;
pub mod request_data;
pub mod results;

pub use action::{decode_action, Action, ActionCode};
pub use callback::{CallbackHandler, CallbackUsage, Credential, CredentialRequest, PasswordMap};
pub use config::{keys, HandlerOptions};
pub use handler::{WsHandler, DEFAULT_TIME_TO_LIVE};
pub use request_data::{MessageContext, RequestData};
pub use results::{EngineResult, HandlerResult, BST};
