#![forbid(unsafe_code)]

//! The handler: decodes options for one message, inserts the Security
//! header and runs the configured actions in order.
//!
//! The same handler serves any number of messages, also from several
//! threads; everything per message lives in [`RequestData`] and the
//! caller's [`MessageContext`].

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use wssec_core::Error;
use wssec_keys::KeysManager;
use wssec_token::{SamlIssuer, SecurityHeader, SecurityPart};
use wssec_xml::{SoapVersion, XmlDocument};

use crate::action::{self, Action, ActionCode};
use crate::callback::{CallbackHandler, CallbackUsage, Credential, CredentialRequest};
use crate::config::{self, keys, HandlerOptions};
use crate::request_data::{MessageContext, RequestData};
use crate::results::{EngineResult, BST};

/// Timestamp lifetime in seconds when none is configured.
pub const DEFAULT_TIME_TO_LIVE: i64 = 300;

const CRYPTO_CACHE_CAPACITY: usize = 8;

/// Keystores by file, oldest evicted first.
#[derive(Default)]
struct CryptoCache {
    entries: VecDeque<(PathBuf, Arc<KeysManager>)>,
}

impl CryptoCache {
    fn get(&self, path: &Path) -> Option<Arc<KeysManager>> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, crypto)| Arc::clone(crypto))
    }

    fn insert(&mut self, path: PathBuf, crypto: Arc<KeysManager>) {
        if self.get(&path).is_some() {
            return;
        }
        if self.entries.len() >= CRYPTO_CACHE_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back((path, crypto));
    }
}

/// Secures outgoing messages and checks the results of incoming ones.
pub struct WsHandler {
    options: HandlerOptions,
    callbacks: HashMap<String, Arc<dyn CallbackHandler>>,
    actions: HashMap<ActionCode, Arc<dyn Action>>,
    saml_issuer: Option<Arc<dyn SamlIssuer>>,
    cryptos: Mutex<CryptoCache>,
}

impl std::fmt::Debug for WsHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsHandler")
            .field("options", &self.options)
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl WsHandler {
    pub fn new(options: HandlerOptions) -> Self {
        Self {
            options,
            callbacks: HashMap::new(),
            actions: action::builtin_actions(),
            saml_issuer: None,
            cryptos: Mutex::new(CryptoCache::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        Ok(Self::new(HandlerOptions::from_file(path)?))
    }

    pub fn options(&self) -> &HandlerOptions {
        &self.options
    }

    /// Register a callback under `name`. Options such as
    /// `passwordCallbackClass` select it by that name; it also serves as
    /// the callback reference of the same name.
    pub fn register_callback(&mut self, name: &str, callback: Arc<dyn CallbackHandler>) {
        self.callbacks.insert(name.to_owned(), callback);
    }

    /// Register an action for `code`, replacing a built-in one.
    pub fn register_action(&mut self, code: ActionCode, action: Arc<dyn Action>) {
        self.actions.insert(code, action);
    }

    /// Use `issuer` for SAML actions instead of `samlPropFile`.
    pub fn set_saml_issuer(&mut self, issuer: Arc<dyn SamlIssuer>) {
        self.saml_issuer = Some(issuer);
    }

    pub fn saml_issuer(&self) -> Option<Arc<dyn SamlIssuer>> {
        self.saml_issuer.clone()
    }

    /// An option, else the message-context property of the same name.
    pub fn get_string(&self, key: &str, msg: &MessageContext) -> Option<String> {
        self.options
            .get(key)
            .or_else(|| msg.property(key))
            .map(str::to_owned)
    }

    /// Resolve a file named in the options.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        self.options.resolve_path(path)
    }

    /// Secure `doc` with the configured actions.
    ///
    /// `is_request` selects between storing the produced signature values
    /// (requests) and adding SignatureConfirmation (responses). The
    /// returned [`RequestData`] holds the signature values of this run.
    pub fn secure<'m>(
        &self,
        doc: &mut XmlDocument,
        msg: &'m mut MessageContext,
        is_request: bool,
    ) -> Result<RequestData<'m>, Error> {
        let action = self
            .get_string(keys::ACTION, msg)
            .ok_or_else(|| Error::Config("WSHandler: no action defined".into()))?;
        let (actions, mask) = action::decode_action(&action)?;
        let mut req = RequestData::new(msg);
        if actions.is_empty() {
            debug!("no security actions configured");
            return Ok(req);
        }

        req.username = self
            .get_string(keys::USER, req.message_context())
            .filter(|u| !u.is_empty());
        let needs_user = ActionCode::Signature.code()
            | ActionCode::UsernameToken.code()
            | ActionCode::UsernameTokenSignature.code();
        if mask & needs_user != 0 && req.username.is_none() {
            return Err(Error::Config(
                "WSHandler: Empty username for specified action".into(),
            ));
        }

        self.do_sender_action(mask, doc, &mut req, &actions, is_request)?;
        info!(
            actions = %action,
            signatures = req.signature_values.len(),
            "message secured"
        );
        Ok(req)
    }

    /// Decode the options the actions in `mask` need, insert the header
    /// and run `actions`.
    pub fn do_sender_action(
        &self,
        mask: u32,
        doc: &mut XmlDocument,
        req: &mut RequestData<'_>,
        actions: &[ActionCode],
        is_request: bool,
    ) -> Result<(), Error> {
        let has = |action: ActionCode| mask & action.code() != 0;

        req.must_understand = self.decode_bool(keys::MUST_UNDERSTAND, req, true)?;
        req.enable_signature_confirmation =
            self.decode_bool(keys::ENABLE_SIGNATURE_CONFIRMATION, req, true)?
                || has(ActionCode::SignatureConfirmation);
        req.passwords_encoded = self.decode_bool(keys::USE_ENCODED_PASSWORDS, req, false)?;
        req.precision_in_milliseconds =
            self.decode_bool(keys::TIMESTAMP_PRECISION, req, true)?;
        req.time_to_live = self.decode_time_to_live(req.message_context());
        req.actor = self.get_string(keys::ACTOR, req.message_context());

        let header = SecurityHeader::new(req.actor.as_deref(), req.must_understand);
        header.insert(doc)?;
        req.sec_header = Some(header);
        req.soap_version = SoapVersion::of(doc)?;

        if has(ActionCode::UsernameToken) {
            self.decode_ut_parameters(req)?;
        }
        if has(ActionCode::UsernameTokenSignature) {
            self.decode_ut_parameters(req)?;
            self.decode_signature_parameters(req)?;
        }
        if has(ActionCode::Signature) {
            req.sig_crypto = self.load_signature_crypto(req)?;
            self.decode_signature_parameters(req)?;
        }
        if has(ActionCode::SamlTokenSigned) {
            self.decode_signature_parameters(req)?;
        }
        if has(ActionCode::Encrypt) {
            req.enc_crypto = self.load_encryption_crypto(req)?;
            self.decode_encryption_parameters(req)?;
        }

        // Set here so SignatureConfirmation ids add to the Body, not replace it.
        if req.signature_parts.is_empty() {
            req.signature_parts
                .push(SecurityPart::body(req.soap_version.envelope_uri()));
        }

        if req.enable_signature_confirmation
            && !is_request
            && !req.message_context().is_signature_confirmation_done()
            && req.message_context().received_results().is_some()
        {
            self.execute_actions(&[ActionCode::SignatureConfirmation], doc, req)?;
        }

        self.execute_actions(actions, doc, req)?;

        if req.enable_signature_confirmation && is_request && !req.signature_values.is_empty() {
            let values = req.signature_values.clone();
            req.message_context_mut()
                .sent_signature_values_mut()
                .extend(values);
        }
        Ok(())
    }

    /// Run `actions` in order, stopping at the first failure.
    pub fn execute_actions(
        &self,
        actions: &[ActionCode],
        doc: &mut XmlDocument,
        req: &mut RequestData<'_>,
    ) -> Result<(), Error> {
        for &action in actions {
            debug!(action = %action, "performing action");
            if action == ActionCode::NoSerialization {
                req.no_serialization = true;
                continue;
            }
            let Some(implementation) = self.actions.get(&action) else {
                warn!(action = %action, "no implementation registered, skipping");
                continue;
            };
            implementation
                .execute(self, action, doc, req)
                .map_err(|e| Error::security(format!("Error during {action}"), e))?;
        }
        Ok(())
    }

    /// Resolve the credential for `identifier`.
    ///
    /// Sources in order: the callback named by option `class_key`, the
    /// callback registered under `ref_key` (on the handler, then in the
    /// message context), the message-context password.
    pub fn get_password(
        &self,
        identifier: &str,
        action: ActionCode,
        class_key: &str,
        ref_key: &str,
        req: &RequestData<'_>,
    ) -> Result<Credential, Error> {
        let msg = req.message_context();
        let class = self.get_string(class_key, msg);
        let callback = match &class {
            Some(name) => Some(self.callbacks.get(name).cloned().ok_or_else(|| {
                Error::Callback(format!("WSHandler: cannot load password callback class: {name}"))
            })?),
            None => self
                .callbacks
                .get(ref_key)
                .cloned()
                .or_else(|| msg.callback(ref_key)),
        };

        match callback {
            Some(callback) => {
                let request = CredentialRequest {
                    identifier,
                    usage: CallbackUsage::for_action(action),
                    action,
                    callback_class: class.as_deref(),
                    callback_ref: class.is_none().then_some(ref_key),
                };
                perform_callback(callback.as_ref(), &request)
            }
            None => {
                let password = msg.password().ok_or_else(|| {
                    Error::Callback("WSHandler: application provided null or empty password".into())
                })?;
                Ok(Credential::password(identifier, password))
            }
        }
    }

    /// The keystore named by `signaturePropFile`, if any.
    pub fn load_signature_crypto(
        &self,
        req: &RequestData<'_>,
    ) -> Result<Option<Arc<KeysManager>>, Error> {
        match self.get_string(keys::SIG_PROP_FILE, req.message_context()) {
            Some(file) => self.keystore(&self.resolve_path(&file)).map(Some),
            None => Ok(None),
        }
    }

    /// The keystore named by `encryptionPropFile`, else the signature
    /// keystore.
    pub fn load_encryption_crypto(
        &self,
        req: &RequestData<'_>,
    ) -> Result<Option<Arc<KeysManager>>, Error> {
        match self.get_string(keys::ENC_PROP_FILE, req.message_context()) {
            Some(file) => self.keystore(&self.resolve_path(&file)).map(Some),
            None => Ok(req.sig_crypto.clone()),
        }
    }

    fn keystore(&self, path: &Path) -> Result<Arc<KeysManager>, Error> {
        if let Some(crypto) = self.cryptos()?.get(path) {
            return Ok(crypto);
        }
        let crypto = Arc::new(KeysManager::from_config_file(path)?);
        debug!(path = %path.display(), "loaded keystore");
        self.cryptos()?.insert(path.to_path_buf(), Arc::clone(&crypto));
        Ok(crypto)
    }

    fn cryptos(&self) -> Result<MutexGuard<'_, CryptoCache>, Error> {
        self.cryptos
            .lock()
            .map_err(|_| Error::Other("keystore cache lock poisoned".into()))
    }

    /// `timeToLive` in seconds; unset, unparsable or non-positive values
    /// give [`DEFAULT_TIME_TO_LIVE`].
    pub fn decode_time_to_live(&self, msg: &MessageContext) -> i64 {
        self.get_string(keys::TTL_TIMESTAMP, msg)
            .and_then(|ttl| ttl.trim().parse::<i64>().ok())
            .filter(|ttl| *ttl > 0)
            .unwrap_or(DEFAULT_TIME_TO_LIVE)
    }

    fn decode_bool(&self, key: &str, req: &RequestData<'_>, default: bool) -> Result<bool, Error> {
        let value = self.get_string(key, req.message_context());
        config::decode_bool(key, value.as_deref(), default)
    }

    fn decode_ut_parameters(&self, req: &mut RequestData<'_>) -> Result<(), Error> {
        let get = |key: &str| self.get_string(key, req.message_context());
        let password_type = get(keys::PASSWORD_TYPE);
        let ut_elements = get(keys::ADD_UT_ELEMENTS);
        let use_derived_key = config::decode_flag(get(keys::USE_DERIVED_KEY).as_deref());
        let for_mac = config::decode_flag(get(keys::USE_DERIVED_KEY_FOR_MAC).as_deref());
        let iterations = get(keys::DERIVED_KEY_ITERATIONS);

        if let Some(name) = password_type {
            req.password_type = config::decode_password_type(&name)?;
        }
        if let Some(elements) = ut_elements {
            req.ut_elements = elements.split_whitespace().map(str::to_owned).collect();
        }
        req.use_derived_key |= use_derived_key;
        req.use_derived_key_for_mac |= for_mac;
        if let Some(iterations) = iterations {
            req.derived_key_iterations = iterations.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "WSHandler: illegal {} parameter",
                    keys::DERIVED_KEY_ITERATIONS
                ))
            })?;
        }
        Ok(())
    }

    fn decode_signature_parameters(&self, req: &mut RequestData<'_>) -> Result<(), Error> {
        let get = |key: &str| self.get_string(key, req.message_context());
        let signature_user = get(keys::SIGNATURE_USER);
        let key_id = get(keys::SIG_KEY_ID);
        let algorithm = get(keys::SIG_ALGO);
        let digest_algorithm = get(keys::SIG_DIGEST_ALGO);
        let parts = get(keys::SIGNATURE_PARTS);
        let single = get(keys::USE_SINGLE_CERTIFICATE);

        req.signature_user = signature_user.or_else(|| req.username.clone());
        if let Some(name) = key_id {
            req.sig_key_id = Some(config::decode_signature_key_id(&name)?);
        }
        req.sig_algorithm = algorithm;
        req.sig_digest_algorithm = digest_algorithm;
        // Decoded once per signing action in the mask; parts stay unique.
        if let Some(parts) = parts {
            for part in config::parse_parts(&parts, req.soap_version.envelope_uri())? {
                if !req.signature_parts.contains(&part) {
                    req.signature_parts.push(part);
                }
            }
        }
        req.use_single_cert =
            config::decode_bool(keys::USE_SINGLE_CERTIFICATE, single.as_deref(), true)?;
        Ok(())
    }

    fn decode_encryption_parameters(&self, req: &mut RequestData<'_>) -> Result<(), Error> {
        let get = |key: &str| self.get_string(key, req.message_context());
        let enc_user = get(keys::ENCRYPTION_USER);
        let key_id = get(keys::ENC_KEY_ID);
        let sym_algorithm = get(keys::ENC_SYM_ALGO);
        let key_transport = get(keys::ENC_KEY_TRANSPORT);
        let sym_enc_key = get(keys::ENC_SYM_ENC_KEY);
        let parts = get(keys::ENCRYPTION_PARTS);
        let key_name = get(keys::ENC_KEY_NAME);

        req.enc_user = enc_user.or_else(|| req.username.clone());
        if req.enc_user.is_none() {
            return Err(Error::Config("WSHandler: Encryption: no username".into()));
        }
        self.handle_special_user(req);

        if let Some(name) = key_id {
            req.enc_key_id = Some(config::decode_encryption_key_id(&name)?);
        }
        req.enc_sym_algorithm = sym_algorithm;
        req.enc_key_transport = key_transport;
        if let Some(value) = sym_enc_key {
            req.encrypt_symmetric_encryption_key = config::decode_flag(Some(&value));
        }
        if let Some(parts) = parts {
            let parsed = config::parse_parts(&parts, req.soap_version.envelope_uri())?;
            req.encrypt_parts.extend(parsed);
        }
        req.embedded_key_name = key_name;
        Ok(())
    }

    /// For the encryption user `useReqSigCert`, encrypt for the certificate
    /// of the first signature received from the same actor.
    fn handle_special_user(&self, req: &mut RequestData<'_>) {
        if req.enc_user.as_deref() != Some(keys::USE_REQ_SIG_CERT) {
            return;
        }
        let actor = req.actor.as_deref().unwrap_or_default();
        let cert = req
            .message_context()
            .received_results()
            .unwrap_or_default()
            .iter()
            .filter(|r| r.actor.as_deref().unwrap_or_default() == actor)
            .find_map(|r| {
                r.results
                    .iter()
                    .find(|e| e.action == ActionCode::Signature.code())
            })
            .and_then(|e| e.certificate.clone());
        if cert.is_some() {
            debug!("encrypting for the request signature certificate");
        }
        req.enc_cert = cert;
    }

    /// Whether `results` hold exactly `actions`, in order.
    /// SignatureConfirmation and BinarySecurityToken results are ignored.
    pub fn check_receiver_results(&self, results: &[EngineResult], actions: &[ActionCode]) -> bool {
        let received: Vec<u32> = relevant_results(results).collect();
        let expected: Vec<u32> = actions.iter().map(|a| a.code()).collect();
        received == expected
    }

    /// Whether `results` hold exactly `actions`, in any order.
    pub fn check_receiver_results_any_order(
        &self,
        results: &[EngineResult],
        actions: &[ActionCode],
    ) -> bool {
        let mut expected: Vec<u32> = actions.iter().map(|a| a.code()).collect();
        for code in relevant_results(results) {
            match expected.iter().position(|c| *c == code) {
                Some(pos) => {
                    expected.remove(pos);
                }
                None => return false,
            }
        }
        expected.is_empty()
    }

    /// Match received SignatureConfirmation values against the signature
    /// values sent with the request, consuming each match.
    ///
    /// Unless NoSerialization is set this is the last check, so stored
    /// values left over are an error.
    pub fn check_signature_confirmation(
        &self,
        req: &mut RequestData<'_>,
        results: &[EngineResult],
    ) -> Result<(), Error> {
        let fail = |what: &str| {
            Err(Error::SignatureConfirmation(format!(
                "WSHandler: Check Signature confirmation: {what}"
            )))
        };
        let no_serialization = req.no_serialization;
        let stored = req.message_context_mut().sent_signature_values_mut();

        let received = results
            .iter()
            .filter(|r| r.action == ActionCode::SignatureConfirmation.code())
            .filter_map(|r| r.signature_confirmation.as_ref())
            .filter_map(|sc| sc.value());
        for value in received {
            if stored.is_empty() {
                // An empty value confirms that no signature was sent.
                if !value.is_empty() {
                    return fail("got a SC element, but no stored SV");
                }
                continue;
            }
            match stored.iter().position(|s| s.as_slice() == value) {
                Some(pos) => {
                    stored.remove(pos);
                }
                None => return fail("got SC element, but no matching SV"),
            }
        }

        if !no_serialization && !stored.is_empty() {
            return fail("stored SV vector not empty");
        }
        Ok(())
    }

    /// Whether a timestamp created at `created` is acceptable now: not in
    /// the future and younger than `time_to_live` seconds.
    pub fn verify_timestamp(&self, created: DateTime<Utc>, time_to_live: i64) -> bool {
        let now = Utc::now();
        if created > now {
            debug!("timestamp created in the future");
            return false;
        }
        if created <= now - Duration::seconds(time_to_live) {
            debug!("timestamp created too long ago");
            return false;
        }
        true
    }
}

fn relevant_results(results: &[EngineResult]) -> impl Iterator<Item = u32> + '_ {
    results
        .iter()
        .map(|r| r.action)
        .filter(|code| *code != ActionCode::SignatureConfirmation.code() && *code != BST)
}

fn perform_callback(
    callback: &dyn CallbackHandler,
    request: &CredentialRequest<'_>,
) -> Result<Credential, Error> {
    match callback.handle(request) {
        Ok(Some(credential)) => Ok(credential),
        Ok(None) => Err(Error::Callback(format!(
            "no credential for {}",
            request.identifier
        ))),
        Err(e) => Err(Error::Callback(format!("WSHandler: password callback failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::PasswordMap;
    use crate::results::HandlerResult;
    use wssec_token::SignatureConfirmation;

    const ENVELOPE: &str = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body><m:ping xmlns:m="urn:m">hi</m:ping></soap:Body></soap:Envelope>"#;

    fn handler(action: &str) -> WsHandler {
        WsHandler::new(HandlerOptions::new().with(keys::ACTION, action).with(keys::USER, "alice"))
    }

    #[test]
    fn test_options_take_precedence() {
        let handler = handler("Timestamp");
        let mut msg = MessageContext::new();
        msg.set_property(keys::USER, "bob");
        msg.set_property(keys::ACTOR, "urn:next");
        assert_eq!(handler.get_string(keys::USER, &msg).as_deref(), Some("alice"));
        assert_eq!(handler.get_string(keys::ACTOR, &msg).as_deref(), Some("urn:next"));
    }

    #[test]
    fn test_missing_action_and_user() {
        let handler = WsHandler::new(HandlerOptions::new());
        let mut doc = XmlDocument::parse(ENVELOPE).unwrap();
        let mut msg = MessageContext::new();
        let err = handler.secure(&mut doc, &mut msg, true).unwrap_err();
        assert_eq!(err.to_string(), "configuration error: WSHandler: no action defined");

        let handler = WsHandler::new(HandlerOptions::new().with(keys::ACTION, "UsernameToken"));
        let err = handler.secure(&mut doc, &mut msg, true).unwrap_err();
        assert!(err.to_string().contains("Empty username for specified action"));
    }

    #[test]
    fn test_no_security_leaves_document() {
        let handler = handler("NoSecurity");
        let mut doc = XmlDocument::parse(ENVELOPE).unwrap();
        let before = doc.clone();
        let mut msg = MessageContext::new();
        handler.secure(&mut doc, &mut msg, true).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn test_illegal_bool_option() {
        let handler = WsHandler::new(
            HandlerOptions::new()
                .with(keys::ACTION, "Timestamp")
                .with(keys::MUST_UNDERSTAND, "maybe"),
        );
        let mut doc = XmlDocument::parse(ENVELOPE).unwrap();
        let mut msg = MessageContext::new();
        let err = handler.secure(&mut doc, &mut msg, true).unwrap_err();
        assert!(err.to_string().contains("WSHandler: illegal mustUnderstand parameter"));
    }

    #[test]
    fn test_time_to_live() {
        let msg = MessageContext::new();
        assert_eq!(handler("Timestamp").decode_time_to_live(&msg), DEFAULT_TIME_TO_LIVE);
        for (value, expected) in [("60", 60), ("0", 300), ("-5", 300), ("soon", 300)] {
            let h = WsHandler::new(HandlerOptions::new().with(keys::TTL_TIMESTAMP, value));
            assert_eq!(h.decode_time_to_live(&msg), expected, "{value}");
        }
    }

    #[test]
    fn test_password_sources() {
        let handler = handler("UsernameToken");
        let mut msg = MessageContext::new();
        msg.set_password("fallback");
        msg.set_callback(
            keys::PW_CALLBACK_REF,
            Arc::new(PasswordMap::new().with_password("alice", "pw2")),
        );
        let req = RequestData::new(&mut msg);
        // The reference wins over the plain password.
        assert_eq!(lookup(&handler, &req).unwrap().password.as_deref(), Some("pw2"));

        // A named class wins over the reference.
        let mut named = WsHandler::new(handler.options().clone().with(keys::PW_CALLBACK_CLASS, "users"));
        named.register_callback("users", Arc::new(PasswordMap::new().with_password("alice", "pw1")));
        assert_eq!(lookup(&named, &req).unwrap().password.as_deref(), Some("pw1"));

        let missing = WsHandler::new(HandlerOptions::new().with(keys::PW_CALLBACK_CLASS, "nobody"));
        let err = lookup(&missing, &req).unwrap_err();
        assert!(err.to_string().contains("cannot load password callback class: nobody"));
    }

    fn lookup(handler: &WsHandler, req: &RequestData<'_>) -> Result<Credential, Error> {
        handler.get_password(
            "alice",
            ActionCode::UsernameToken,
            keys::PW_CALLBACK_CLASS,
            keys::PW_CALLBACK_REF,
            req,
        )
    }

    #[test]
    fn test_callback_sees_its_source() {
        let source = |req: &CredentialRequest<'_>| -> Result<Option<Credential>, Error> {
            let name = match (req.callback_class, req.callback_ref) {
                (Some(class), None) => format!("class:{class}"),
                (None, Some(reference)) => format!("ref:{reference}"),
                _ => return Err(Error::Other("ambiguous source".into())),
            };
            Ok(Some(Credential::password(req.identifier, &name)))
        };
        let mut msg = MessageContext::new();
        msg.set_callback(keys::PW_CALLBACK_REF, Arc::new(source));
        let req = RequestData::new(&mut msg);

        let by_ref = lookup(&handler("UsernameToken"), &req).unwrap();
        assert_eq!(by_ref.password.as_deref(), Some("ref:passwordCallbackRef"));

        let mut named = WsHandler::new(HandlerOptions::new().with(keys::PW_CALLBACK_CLASS, "users"));
        named.register_callback("users", Arc::new(source));
        let by_class = lookup(&named, &req).unwrap();
        assert_eq!(by_class.password.as_deref(), Some("class:users"));
    }

    #[test]
    fn test_password_fallback_and_failures() {
        let handler = handler("UsernameToken");
        let mut msg = MessageContext::new();
        {
            let req = RequestData::new(&mut msg);
            let err = lookup(&handler, &req).unwrap_err();
            assert!(err.to_string().contains("application provided null or empty password"));
        }
        msg.set_password("secret");
        let failing = |_: &CredentialRequest<'_>| -> Result<Option<Credential>, Error> {
            Err(Error::Other("directory offline".into()))
        };
        msg.set_callback(keys::ENC_CALLBACK_REF, Arc::new(failing));
        let req = RequestData::new(&mut msg);
        let found = lookup(&handler, &req).unwrap();
        assert_eq!(found.password.as_deref(), Some("secret"));
        let err = handler
            .get_password("alice", ActionCode::Encrypt, keys::ENC_CALLBACK_CLASS, keys::ENC_CALLBACK_REF, &req)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "credential callback error: WSHandler: password callback failed: directory offline"
        );
    }

    #[test]
    fn test_check_receiver_results() {
        let handler = handler("Timestamp");
        let results = vec![
            EngineResult::new(ActionCode::Timestamp.code()),
            EngineResult::new(BST),
            EngineResult::signature(ActionCode::Signature, vec![1], None),
            EngineResult::confirmation(SignatureConfirmation::new(None)),
        ];
        let in_order = [ActionCode::Timestamp, ActionCode::Signature];
        let reversed = [ActionCode::Signature, ActionCode::Timestamp];
        assert!(handler.check_receiver_results(&results, &in_order));
        assert!(!handler.check_receiver_results(&results, &reversed));
        assert!(!handler.check_receiver_results(&results, &[ActionCode::Timestamp]));
        assert!(handler.check_receiver_results_any_order(&results, &reversed));
        assert!(!handler.check_receiver_results_any_order(
            &results,
            &[ActionCode::Signature, ActionCode::Signature]
        ));
    }

    #[test]
    fn test_check_signature_confirmation() {
        let handler = handler("Timestamp");
        let mut msg = MessageContext::new();
        msg.sent_signature_values_mut().extend([vec![1, 2], vec![3, 4]]);
        let mut req = RequestData::new(&mut msg);
        let confirm = |v: &[u8]| EngineResult::confirmation(SignatureConfirmation::new(Some(v)));

        let err = handler
            .check_signature_confirmation(&mut req, &[confirm(&[9])])
            .unwrap_err();
        assert!(err.to_string().contains("got SC element, but no matching SV"));

        let err = handler
            .check_signature_confirmation(&mut req, &[confirm(&[1, 2])])
            .unwrap_err();
        assert!(err.to_string().contains("stored SV vector not empty"));

        handler
            .check_signature_confirmation(&mut req, &[confirm(&[3, 4])])
            .unwrap();
        assert_eq!(req.message_context().sent_signature_values(), Some(&[][..]));

        let err = handler
            .check_signature_confirmation(&mut req, &[confirm(&[5])])
            .unwrap_err();
        assert!(err.to_string().contains("got a SC element, but no stored SV"));
        handler
            .check_signature_confirmation(&mut req, &[confirm(&[])])
            .unwrap();
    }

    #[test]
    fn test_no_serialization_keeps_stored_values() {
        let handler = handler("Timestamp");
        let mut msg = MessageContext::new();
        msg.sent_signature_values_mut().push(vec![7]);
        let mut req = RequestData::new(&mut msg);
        req.no_serialization = true;
        handler.check_signature_confirmation(&mut req, &[]).unwrap();
    }

    #[test]
    fn test_verify_timestamp() {
        let handler = handler("Timestamp");
        let now = Utc::now();
        assert!(handler.verify_timestamp(now - Duration::seconds(10), 300));
        assert!(!handler.verify_timestamp(now - Duration::seconds(301), 300));
        assert!(!handler.verify_timestamp(now + Duration::seconds(60), 300));
    }

    #[test]
    fn test_special_encryption_user() {
        let handler = handler("Encrypt");
        let cert_pem = std::fs::read(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/bob-cert.pem")).unwrap();
        let cert = wssec_keys::loader::load_x509_certs_pem(&cert_pem).unwrap().remove(0);
        let mut msg = MessageContext::new();
        msg.set_received_results(vec![
            HandlerResult::new(
                Some("urn:other"),
                vec![EngineResult::signature(ActionCode::Signature, vec![1], None)],
            ),
            HandlerResult::new(
                None,
                vec![
                    EngineResult::new(ActionCode::Timestamp.code()),
                    EngineResult::signature(ActionCode::Signature, vec![2], Some(cert.clone())),
                ],
            ),
        ]);
        let mut req = RequestData::new(&mut msg);
        req.enc_user = Some(keys::USE_REQ_SIG_CERT.to_owned());
        handler.handle_special_user(&mut req);
        assert_eq!(req.enc_cert, Some(cert));
    }

    #[test]
    fn test_crypto_cache_evicts_oldest() {
        let mut cache = CryptoCache::default();
        for i in 0..=CRYPTO_CACHE_CAPACITY {
            cache.insert(PathBuf::from(format!("ks{i}.toml")), Arc::new(KeysManager::new()));
        }
        assert_eq!(cache.entries.len(), CRYPTO_CACHE_CAPACITY);
        assert!(cache.get(Path::new("ks0.toml")).is_none());
        assert!(cache.get(Path::new("ks8.toml")).is_some());
    }
}
