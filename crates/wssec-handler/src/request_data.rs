#![forbid(unsafe_code)]

//! Per-message state: the caller's message context and the decoded
//! configuration plus scratch space of one pipeline run.

use std::collections::HashMap;
use std::sync::Arc;

use wssec_core::Error;
use wssec_keys::{KeysManager, X509Cert};
use wssec_token::{KeyIdentifierType, PasswordType, SecurityHeader, SecurityPart};
use wssec_xml::SoapVersion;

use crate::callback::CallbackHandler;
use crate::results::HandlerResult;

/// State the caller keeps for one message exchange.
///
/// Properties fill in handler options that are not set. Signature
/// values sent with a request stay here until the response is checked.
#[derive(Default, Clone)]
pub struct MessageContext {
    properties: HashMap<String, String>,
    password: Option<String>,
    callbacks: HashMap<String, Arc<dyn CallbackHandler>>,
    received_results: Option<Vec<HandlerResult>>,
    sent_signature_values: Option<Vec<Vec<u8>>>,
    signature_confirmation_done: bool,
}

impl std::fmt::Debug for MessageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageContext")
            .field("properties", &self.properties)
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .field("received_results", &self.received_results)
            .field("signature_confirmation_done", &self.signature_confirmation_done)
            .finish_non_exhaustive()
    }
}

impl MessageContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<String>) {
        self.properties.insert(key.to_owned(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Password used when no callback is configured.
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = Some(password.into());
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Register a callback under a reference key such as
    /// `passwordCallbackRef`.
    pub fn set_callback(&mut self, key: &str, callback: Arc<dyn CallbackHandler>) {
        self.callbacks.insert(key.to_owned(), callback);
    }

    pub fn callback(&self, key: &str) -> Option<Arc<dyn CallbackHandler>> {
        self.callbacks.get(key).cloned()
    }

    /// Results of processing the request this message answers.
    pub fn set_received_results(&mut self, results: Vec<HandlerResult>) {
        self.received_results = Some(results);
    }

    pub fn received_results(&self) -> Option<&[HandlerResult]> {
        self.received_results.as_deref()
    }

    pub fn sent_signature_values(&self) -> Option<&[Vec<u8>]> {
        self.sent_signature_values.as_deref()
    }

    pub(crate) fn sent_signature_values_mut(&mut self) -> &mut Vec<Vec<u8>> {
        self.sent_signature_values.get_or_insert_with(Vec::new)
    }

    pub fn is_signature_confirmation_done(&self) -> bool {
        self.signature_confirmation_done
    }

    pub fn set_signature_confirmation_done(&mut self, done: bool) {
        self.signature_confirmation_done = done;
    }
}

/// Configuration and accumulated results of one pipeline run.
#[derive(Debug)]
pub struct RequestData<'m> {
    msg_context: &'m mut MessageContext,

    pub username: Option<String>,
    pub actor: Option<String>,
    pub must_understand: bool,
    pub soap_version: SoapVersion,
    pub sec_header: Option<SecurityHeader>,

    pub password_type: PasswordType,
    /// Extra UsernameToken children, `Nonce` and `Created`.
    pub ut_elements: Vec<String>,
    pub passwords_encoded: bool,
    pub use_derived_key: bool,
    pub use_derived_key_for_mac: bool,
    pub derived_key_iterations: u32,

    pub signature_user: Option<String>,
    pub sig_key_id: Option<KeyIdentifierType>,
    pub sig_algorithm: Option<String>,
    pub sig_digest_algorithm: Option<String>,
    pub signature_parts: Vec<SecurityPart>,
    pub use_single_cert: bool,
    pub sig_crypto: Option<Arc<KeysManager>>,

    pub enc_user: Option<String>,
    pub enc_cert: Option<X509Cert>,
    pub enc_key_id: Option<KeyIdentifierType>,
    pub enc_sym_algorithm: Option<String>,
    pub enc_key_transport: Option<String>,
    pub encrypt_symmetric_encryption_key: bool,
    pub encrypt_parts: Vec<SecurityPart>,
    pub embedded_key_name: Option<String>,
    pub enc_crypto: Option<Arc<KeysManager>>,

    /// Seconds, for Timestamp expiry.
    pub time_to_live: i64,
    pub precision_in_milliseconds: bool,
    pub enable_signature_confirmation: bool,
    pub no_serialization: bool,

    /// One entry per signature produced in this run, in order.
    pub signature_values: Vec<Vec<u8>>,
}

impl<'m> RequestData<'m> {
    pub fn new(msg_context: &'m mut MessageContext) -> Self {
        Self {
            msg_context,
            username: None,
            actor: None,
            must_understand: true,
            soap_version: SoapVersion::Soap11,
            sec_header: None,
            password_type: PasswordType::Digest,
            ut_elements: Vec::new(),
            passwords_encoded: false,
            use_derived_key: false,
            use_derived_key_for_mac: false,
            derived_key_iterations: 0,
            signature_user: None,
            sig_key_id: None,
            sig_algorithm: None,
            sig_digest_algorithm: None,
            signature_parts: Vec::new(),
            use_single_cert: true,
            sig_crypto: None,
            enc_user: None,
            enc_cert: None,
            enc_key_id: None,
            enc_sym_algorithm: None,
            enc_key_transport: None,
            encrypt_symmetric_encryption_key: true,
            encrypt_parts: Vec::new(),
            embedded_key_name: None,
            enc_crypto: None,
            time_to_live: 300,
            precision_in_milliseconds: true,
            enable_signature_confirmation: true,
            no_serialization: false,
            signature_values: Vec::new(),
        }
    }

    /// The header every action of this run inserts into.
    pub fn security_header(&self) -> Result<SecurityHeader, Error> {
        self.sec_header
            .clone()
            .ok_or_else(|| Error::MissingElement("wsse:Security header not inserted".into()))
    }

    pub fn message_context(&self) -> &MessageContext {
        self.msg_context
    }

    pub fn message_context_mut(&mut self) -> &mut MessageContext {
        self.msg_context
    }
}
