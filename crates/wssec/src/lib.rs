#![forbid(unsafe_code)]

//! wssec: WS-Security for SOAP messages.
//!
//! Re-exports the workspace crates under short names. Most callers only
//! need [`handler`]:
//!
//! ```no_run
//! use wssec::handler::{MessageContext, WsHandler};
//!
//! # fn main() -> Result<(), wssec::Error> {
//! let handler = WsHandler::from_file(std::path::Path::new("handler.toml"))?;
//! let mut doc: wssec::xml::XmlDocument = std::fs::read_to_string("request.xml")?.parse()?;
//! handler.secure(&mut doc, &mut MessageContext::new(), true)?;
//! # Ok(())
//! # }
//! ```

pub use wssec_core as core;
pub use wssec_crypto as crypto;
pub use wssec_handler as handler;
pub use wssec_keys as keys;
pub use wssec_token as token;
pub use wssec_xml as xml;

pub use wssec_core::{Error, Result};
