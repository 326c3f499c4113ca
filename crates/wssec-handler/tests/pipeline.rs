//! End-to-end runs of the sender pipeline against test keystores.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use wssec_core::{ns, Error};
use wssec_crypto::SigningKey;
use wssec_handler::{
    keys, ActionCode, EngineResult, HandlerOptions, HandlerResult, MessageContext, PasswordMap,
    WsHandler,
};
use wssec_keys::loader;
use wssec_token::header::child_names;
use wssec_token::verify_signature;
use wssec_xml::{Element, XmlDocument};

const ENVELOPE: &str = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body><m:transfer xmlns:m="urn:bank"><m:amount>100</m:amount></m:transfer></soapenv:Body></soapenv:Envelope>"#;

fn data(name: &str) -> PathBuf {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data")).join(name)
}

/// Writes the keystore and SAML issuer files every test shares.
struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let keystore = format!(
            r#"
default_alias = "alice"

[[keys]]
alias = "alice"
private_key = "{alice_key}"
certificate = "{alice_cert}"

[[keys]]
alias = "bob"
private_key = "{bob_key}"
certificate = "{bob_cert}"
password = "bobpw"

[[secrets]]
alias = "shared"
key = "AAECAwQFBgcICQoLDA0ODw=="
"#,
            alice_key = data("alice-key.pem").display(),
            alice_cert = data("alice-cert.pem").display(),
            bob_key = data("bob-key-enc.pem").display(),
            bob_cert = data("bob-cert.pem").display(),
        );
        std::fs::write(dir.path().join("keystore.toml"), keystore).unwrap();

        let issuer_keystore = format!(
            r#"
[[keys]]
alias = "issuer"
private_key = "{key}"
certificate = "{cert}"
"#,
            key = data("issuer-key.pem").display(),
            cert = data("issuer-cert.pem").display(),
        );
        std::fs::write(dir.path().join("issuer-keystore.toml"), issuer_keystore).unwrap();
        std::fs::write(
            dir.path().join("saml.toml"),
            r#"
issuer = "urn:wssec:test-issuer"
confirmation_method = "senderVouches"
issuer_key_name = "issuer"
keystore = "issuer-keystore.toml"
"#,
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).display().to_string()
    }

    fn options(&self, action: &str) -> HandlerOptions {
        HandlerOptions::new()
            .with(keys::ACTION, action)
            .with(keys::USER, "alice")
            .with(keys::SIG_PROP_FILE, self.path("keystore.toml"))
            .with(keys::SAML_PROP_FILE, self.path("saml.toml"))
    }
}

fn envelope() -> XmlDocument {
    XmlDocument::parse(ENVELOPE).unwrap()
}

fn security(doc: &XmlDocument) -> &Element {
    doc.find_element(ns::WSSE, ns::node::SECURITY).unwrap()
}

fn header_children(doc: &XmlDocument) -> Vec<String> {
    child_names(security(doc)).into_iter().map(str::to_owned).collect()
}

fn count(doc: &XmlDocument, local: &str) -> usize {
    header_children(doc).iter().filter(|n| *n == local).count()
}

fn body_id(doc: &XmlDocument) -> String {
    wssec_xml::soap::body(doc)
        .and_then(|b| b.ns_attribute(ns::WSU, "Id"))
        .unwrap()
        .to_owned()
}

fn alice_public_key() -> SigningKey {
    let pem = std::fs::read(data("alice-cert.pem")).unwrap();
    let cert = loader::load_x509_certs_pem(&pem).unwrap().remove(0);
    SigningKey::RsaPublic(cert.public_key().unwrap())
}

fn alice_callbacks() -> MessageContext {
    let mut msg = MessageContext::new();
    msg.set_callback(
        keys::PW_CALLBACK_REF,
        Arc::new(PasswordMap::new().with_password("alice", "").with_password("bob", "bobpw")),
    );
    msg
}

#[test]
fn test_signature_defaults_to_body() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(fixture.options("Signature"));
    let mut doc = envelope();
    let mut msg = alice_callbacks();

    let req = handler.secure(&mut doc, &mut msg, true).unwrap();
    assert_eq!(req.signature_values.len(), 1);
    let value = req.signature_values[0].clone();
    drop(req);

    let doc = XmlDocument::parse(&doc.to_xml()).unwrap();
    assert_eq!(header_children(&doc), ["Signature"]);
    let signature = security(&doc)
        .find_child(ns::DSIG, ns::node::SIGNATURE)
        .unwrap();
    let verified = verify_signature(&doc, signature, &alice_public_key()).unwrap();
    assert_eq!(verified.references, vec![body_id(&doc)]);
    assert_eq!(verified.value, value);
    assert_eq!(msg.sent_signature_values(), Some(&[value][..]));
}

#[test]
fn test_direct_reference_places_token_before_signature() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(
        fixture
            .options("Timestamp Signature")
            .with(keys::SIG_KEY_ID, "DirectReference")
            .with(keys::SIGNATURE_PARTS, "{}{http://schemas.xmlsoap.org/soap/envelope/}Body"),
    );
    let mut doc = envelope();
    let mut msg = alice_callbacks();
    handler.secure(&mut doc, &mut msg, true).unwrap();

    assert_eq!(
        header_children(&doc),
        ["BinarySecurityToken", "Signature", "Timestamp"]
    );
}

#[test]
fn test_signed_saml_twice_then_confirmation() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(
        fixture.options("SAMLTokenSigned SAMLTokenSigned SignatureConfirmation"),
    );
    let mut doc = envelope();
    let mut msg = MessageContext::new();

    let req = handler.secure(&mut doc, &mut msg, true).unwrap();
    assert_eq!(req.signature_values.len(), 2);
    drop(req);

    assert_eq!(count(&doc, ns::node::ASSERTION), 2);
    assert_eq!(count(&doc, ns::node::SIGNATURE), 2);
    assert_eq!(count(&doc, ns::node::SIGNATURE_CONFIRMATION), 1);
    let confirmation = security(&doc)
        .find_child(ns::WSSE11, ns::node::SIGNATURE_CONFIRMATION)
        .unwrap();
    assert!(confirmation.attribute("Value").is_none());
    assert!(msg.is_signature_confirmation_done());
    assert_eq!(msg.sent_signature_values().map(<[_]>::len), Some(2));
}

#[test]
fn test_username_token_not_found_aborts() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(fixture.options("UsernameToken"));
    let mut doc = envelope();
    let mut msg = MessageContext::new();
    msg.set_callback(
        keys::PW_CALLBACK_REF,
        Arc::new(PasswordMap::new().with_password("bob", "secret")),
    );

    let err = handler.secure(&mut doc, &mut msg, true).unwrap_err();
    assert!(matches!(err, Error::SecurityProcessing { .. }));
    assert_eq!(
        err.to_string(),
        "Error during UsernameToken: credential callback error: no credential for alice"
    );
    assert!(std::error::Error::source(&err).is_some());
    assert!(doc.find_element(ns::WSSE, ns::node::USERNAME_TOKEN).is_none());
}

#[test]
fn test_unsigned_saml_records_no_signature() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(fixture.options("SAMLTokenUnsigned"));
    let mut doc = envelope();
    let mut msg = MessageContext::new();

    let req = handler.secure(&mut doc, &mut msg, true).unwrap();
    assert!(req.signature_values.is_empty());
    drop(req);
    assert_eq!(header_children(&doc), ["Assertion"]);
    assert_eq!(msg.sent_signature_values(), None);
}

#[test]
fn test_username_token_signature_order() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(fixture.options("Timestamp UsernameTokenSignature"));
    let mut doc = envelope();
    let mut msg = MessageContext::new();
    msg.set_password("verysecret");

    let req = handler.secure(&mut doc, &mut msg, true).unwrap();
    assert_eq!(req.signature_values.len(), 1);
    drop(req);

    assert_eq!(
        header_children(&doc),
        ["UsernameToken", "Signature", "Timestamp"]
    );
    let token = security(&doc)
        .find_child(ns::WSSE, ns::node::USERNAME_TOKEN)
        .unwrap();
    assert!(token.find_child(ns::WSSE, ns::node::NONCE).is_some());
}

#[test]
fn test_derived_key_token_has_no_password() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(
        fixture
            .options("UsernameTokenSignature")
            .with(keys::USE_DERIVED_KEY, "true")
            .with(keys::DERIVED_KEY_ITERATIONS, "1500"),
    );
    let mut doc = envelope();
    let mut msg = MessageContext::new();
    msg.set_password("verysecret");
    handler.secure(&mut doc, &mut msg, true).unwrap();

    let token = security(&doc)
        .find_child(ns::WSSE, ns::node::USERNAME_TOKEN)
        .unwrap();
    assert!(token.find_child(ns::WSSE, ns::node::PASSWORD).is_none());
    assert!(token.find_child(ns::WSSE11, ns::node::SALT).is_some());
    assert_eq!(
        token
            .find_child(ns::WSSE11, ns::node::ITERATION)
            .unwrap()
            .text_content(),
        "1500"
    );
}

#[test]
fn test_repeated_action_is_not_idempotent() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(fixture.options("Signature Signature"));
    let mut doc = envelope();
    let mut msg = alice_callbacks();

    let req = handler.secure(&mut doc, &mut msg, true).unwrap();
    assert_eq!(req.signature_values.len(), 2);
    drop(req);
    assert_eq!(header_children(&doc), ["Signature", "Signature"]);
    let ids: Vec<_> = security(&doc)
        .child_elements()
        .map(|sig| sig.attribute("Id").unwrap().to_owned())
        .collect();
    assert_ne!(ids[0], ids[1]);
}

#[test]
fn test_encryption_defaults_to_body_content() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(
        fixture
            .options("Encrypt")
            .with(keys::ENCRYPTION_USER, "bob")
            .with(keys::ENC_PROP_FILE, fixture.path("keystore.toml")),
    );
    let mut doc = envelope();
    let mut msg = MessageContext::new();
    handler.secure(&mut doc, &mut msg, true).unwrap();

    assert_eq!(header_children(&doc), ["EncryptedKey"]);
    let body = wssec_xml::soap::body(&doc).unwrap();
    let children: Vec<_> = body.child_elements().collect();
    assert_eq!(children.len(), 1);
    assert!(children[0].name.is(ns::ENC, ns::node::ENCRYPTED_DATA));
    assert!(!doc.to_xml().contains("<m:amount>"));
}

#[test]
fn test_embedded_key_name_uses_key_callback() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(
        fixture
            .options("Encrypt")
            .with(keys::ENCRYPTION_USER, "shared")
            .with(keys::ENC_KEY_ID, "EmbeddedKeyName")
            .with(keys::ENC_KEY_NAME, "SharedKey"),
    );
    let mut doc = envelope();
    let mut msg = MessageContext::new();
    msg.set_callback(
        keys::ENC_CALLBACK_REF,
        Arc::new(PasswordMap::new().with_key("shared", vec![7; 16])),
    );
    handler.secure(&mut doc, &mut msg, true).unwrap();

    let key_name = doc
        .find_element(ns::DSIG, ns::node::KEY_NAME)
        .unwrap()
        .text_content();
    assert_eq!(key_name, "SharedKey");
}

#[test]
fn test_response_confirms_received_signatures() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(fixture.options("Signature"));
    let mut doc = envelope();
    let mut msg = alice_callbacks();
    msg.set_received_results(vec![
        HandlerResult::new(
            None,
            vec![
                EngineResult::new(ActionCode::Timestamp.code()),
                EngineResult::signature(ActionCode::Signature, vec![1, 2, 3], None),
            ],
        ),
        HandlerResult::new(
            Some("urn:next"),
            vec![EngineResult::signature(ActionCode::SamlTokenSigned, vec![4, 5], None)],
        ),
    ]);

    let req = handler.secure(&mut doc, &mut msg, false).unwrap();
    assert_eq!(req.signature_values.len(), 1);
    drop(req);

    assert_eq!(
        header_children(&doc),
        ["Signature", "SignatureConfirmation", "SignatureConfirmation"]
    );
    let doc = XmlDocument::parse(&doc.to_xml()).unwrap();
    let signature = security(&doc)
        .find_child(ns::DSIG, ns::node::SIGNATURE)
        .unwrap();
    let verified = verify_signature(&doc, signature, &alice_public_key()).unwrap();
    // Body plus both confirmations.
    assert_eq!(verified.references.len(), 3);
    assert!(msg.is_signature_confirmation_done());
    // Responses do not store what they sent.
    assert_eq!(msg.sent_signature_values(), None);
}

#[test]
fn test_request_response_confirmation_round() {
    let fixture = Fixture::new();
    let client = WsHandler::new(fixture.options("Signature"));
    let mut doc = envelope();
    let mut msg = alice_callbacks();
    let sent = client.secure(&mut doc, &mut msg, true).unwrap().signature_values;

    let confirmations: Vec<EngineResult> = sent
        .iter()
        .map(|v| EngineResult::confirmation(wssec_token::SignatureConfirmation::new(Some(v.as_slice()))))
        .collect();
    let mut req = wssec_handler::RequestData::new(&mut msg);
    client
        .check_signature_confirmation(&mut req, &confirmations)
        .unwrap();
    drop(req);
    assert_eq!(msg.sent_signature_values(), Some(&[][..]));
}

#[test]
fn test_bad_configuration_is_rejected() {
    let fixture = Fixture::new();
    for (key, value, message) in [
        (keys::PASSWORD_TYPE, "PasswordPlain", "Unknown password type encoding: PasswordPlain"),
        (keys::SIG_KEY_ID, "EmbeddedKeyName", "WSHandler: Signature: illegal key identification"),
        (keys::SIG_KEY_ID, "Fingerprint", "WSHandler: Signature: unknown key identification"),
        (keys::SIGNATURE_PARTS, "{Header}{urn:x}y", "WSHandler: wrong part definition: {Header}{urn:x}y"),
    ] {
        let handler = WsHandler::new(
            fixture
                .options("UsernameToken Signature")
                .with(key, value),
        );
        let mut doc = envelope();
        let mut msg = alice_callbacks();
        let err = handler.secure(&mut doc, &mut msg, true).unwrap_err();
        assert!(err.to_string().contains(message), "{key}: {err}");
    }

    let handler = WsHandler::new(fixture.options("Timestamp Compress"));
    let err = handler
        .secure(&mut envelope(), &mut MessageContext::new(), true)
        .unwrap_err();
    assert!(err.to_string().contains("Unknown action defined: Compress"));
}

#[test]
fn test_missing_encryption_keystore() {
    let handler = WsHandler::new(
        HandlerOptions::new()
            .with(keys::ACTION, "Encrypt")
            .with(keys::ENCRYPTION_USER, "bob"),
    );
    let err = handler
        .secure(&mut envelope(), &mut MessageContext::new(), true)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error during encryption: configuration error: WSHandler: Encryption: no encryption keystore configured"
    );
}

#[test]
fn test_handler_shared_across_threads() {
    let fixture = Fixture::new();
    let handler = Arc::new(WsHandler::new(fixture.options("Timestamp Signature")));
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let handler = Arc::clone(&handler);
            std::thread::spawn(move || {
                let mut doc = envelope();
                let mut msg = alice_callbacks();
                handler.secure(&mut doc, &mut msg, true).unwrap();
                header_children(&doc)
            })
        })
        .collect();
    for worker in workers {
        assert_eq!(worker.join().unwrap(), ["Signature", "Timestamp"]);
    }
}

fn signatures(doc: &XmlDocument) -> Vec<&Element> {
    security(doc)
        .child_elements()
        .filter(|e| e.name.is(ns::DSIG, ns::node::SIGNATURE))
        .collect()
}

fn one_received_signature() -> Vec<HandlerResult> {
    vec![HandlerResult::new(
        None,
        vec![EngineResult::signature(ActionCode::Signature, vec![1, 2, 3], None)],
    )]
}

#[test]
fn test_response_confirms_once_with_explicit_action() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(fixture.options("Signature SignatureConfirmation"));
    let mut doc = envelope();
    let mut msg = alice_callbacks();
    msg.set_received_results(one_received_signature());

    handler.secure(&mut doc, &mut msg, false).unwrap();

    assert_eq!(header_children(&doc), ["Signature", "SignatureConfirmation"]);
    let doc = XmlDocument::parse(&doc.to_xml()).unwrap();
    let verified = verify_signature(&doc, signatures(&doc)[0], &alice_public_key()).unwrap();
    // Body and the one confirmation.
    assert_eq!(verified.references.len(), 2);
}

#[test]
fn test_signed_saml_twice_on_response() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(
        fixture.options("SAMLTokenSigned SAMLTokenSigned SignatureConfirmation"),
    );
    let mut doc = envelope();
    let mut msg = MessageContext::new();
    msg.set_received_results(vec![]);

    let req = handler.secure(&mut doc, &mut msg, false).unwrap();
    assert_eq!(req.signature_values.len(), 2);
    drop(req);

    assert_eq!(count(&doc, ns::node::ASSERTION), 2);
    assert_eq!(count(&doc, ns::node::SIGNATURE), 2);
    assert_eq!(count(&doc, ns::node::SIGNATURE_CONFIRMATION), 1);
    let confirmation = security(&doc)
        .find_child(ns::WSSE11, ns::node::SIGNATURE_CONFIRMATION)
        .unwrap();
    assert!(confirmation.attribute("Value").is_none());
    assert_eq!(msg.sent_signature_values(), None);
}

#[test]
fn test_signature_parts_not_repeated_across_signing_actions() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(
        fixture
            .options("Signature SAMLTokenSigned")
            .with(keys::SIGNATURE_PARTS, "{}{http://schemas.xmlsoap.org/soap/envelope/}Body"),
    );
    let mut doc = envelope();
    let mut msg = alice_callbacks();
    handler.secure(&mut doc, &mut msg, true).unwrap();

    let doc = XmlDocument::parse(&doc.to_xml()).unwrap();
    let plain = *signatures(&doc).last().unwrap();
    let verified = verify_signature(&doc, plain, &alice_public_key()).unwrap();
    assert_eq!(verified.references, vec![body_id(&doc)]);
}

struct SilentIssuer;

impl wssec_token::SamlIssuer for SilentIssuer {
    fn new_assertion(&self, _user: &str) -> Result<Option<wssec_token::SamlAssertion>, Error> {
        Ok(None)
    }

    fn is_sender_vouches(&self) -> bool {
        true
    }

    fn issuer_key_name(&self) -> Option<&str> {
        None
    }

    fn issuer_key_password(&self) -> Option<&str> {
        None
    }

    fn issuer_crypto(&self) -> Option<&wssec_keys::KeysManager> {
        None
    }
}

#[test]
fn test_saml_issuer_without_assertion() {
    let fixture = Fixture::new();
    for action in ["SAMLTokenUnsigned", "SAMLTokenSigned"] {
        let mut handler = WsHandler::new(fixture.options(action));
        handler.set_saml_issuer(Arc::new(SilentIssuer));
        let mut doc = envelope();
        let mut msg = MessageContext::new();

        let err = handler.secure(&mut doc, &mut msg, true).unwrap_err();
        assert!(matches!(err, Error::SecurityProcessing { .. }), "{action}");
        assert!(err.to_string().contains("no SAML token received"), "{action}: {err}");
        assert_eq!(count(&doc, ns::node::ASSERTION), 0);
    }
}

#[test]
fn test_sender_vouches_without_user_keystore() {
    let fixture = Fixture::new();
    std::fs::write(fixture.dir.path().join("broken.toml"), "[[keys]\n").unwrap();
    for keystore in ["missing.toml", "broken.toml"] {
        let handler = WsHandler::new(
            fixture
                .options("SAMLTokenSigned")
                .with(keys::SIG_PROP_FILE, fixture.path(keystore)),
        );
        let mut doc = envelope();
        let mut msg = MessageContext::new();

        let req = handler.secure(&mut doc, &mut msg, true).unwrap();
        assert_eq!(req.signature_values.len(), 1, "{keystore}");
        drop(req);
        assert_eq!(count(&doc, ns::node::ASSERTION), 1);
        assert_eq!(count(&doc, ns::node::SIGNATURE), 1);
    }
}

#[test]
fn test_holder_of_key_signed_by_subject() {
    let fixture = Fixture::new();
    std::fs::write(
        fixture.dir.path().join("saml-hok.toml"),
        "issuer = \"urn:wssec:test-issuer\"\nconfirmation_method = \"keyHolder\"\n",
    )
    .unwrap();
    let handler = WsHandler::new(
        fixture
            .options("SAMLTokenSigned")
            .with(keys::SAML_PROP_FILE, fixture.path("saml-hok.toml")),
    );
    let mut doc = envelope();
    let mut msg = alice_callbacks();
    handler.secure(&mut doc, &mut msg, true).unwrap();

    let doc = XmlDocument::parse(&doc.to_xml()).unwrap();
    let assertion = security(&doc)
        .find_child(ns::SAML, ns::node::ASSERTION)
        .unwrap();
    let assertion_id = assertion.attribute("AssertionID").unwrap().to_owned();
    let verified = verify_signature(&doc, signatures(&doc)[0], &alice_public_key()).unwrap();
    assert!(verified.references.contains(&assertion_id));
    assert!(verified.references.contains(&body_id(&doc)));
}

#[test]
fn test_holder_of_key_needs_subject_credential() {
    let fixture = Fixture::new();
    std::fs::write(
        fixture.dir.path().join("saml-hok.toml"),
        "issuer = \"urn:wssec:test-issuer\"\nconfirmation_method = \"keyHolder\"\n",
    )
    .unwrap();
    let handler = WsHandler::new(
        fixture
            .options("SAMLTokenSigned")
            .with(keys::SAML_PROP_FILE, fixture.path("saml-hok.toml")),
    );
    let mut doc = envelope();
    let mut msg = MessageContext::new();
    let err = handler.secure(&mut doc, &mut msg, true).unwrap_err();
    assert!(err
        .to_string()
        .contains("application provided null or empty password"));
}

#[test]
fn test_callback_normalizes_username() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(fixture.options("UsernameToken").with(keys::USER, "ALICE"));
    let mut doc = envelope();
    let mut msg = MessageContext::new();
    msg.set_callback(
        keys::PW_CALLBACK_REF,
        Arc::new(
            PasswordMap::new()
                .with_password("alice", "pw")
                .with_identifier("ALICE", "alice"),
        ),
    );
    handler.secure(&mut doc, &mut msg, true).unwrap();

    let username = security(&doc)
        .find_child(ns::WSSE, ns::node::USERNAME_TOKEN)
        .and_then(|token| token.find_child(ns::WSSE, ns::node::USERNAME))
        .unwrap()
        .text_content();
    assert_eq!(username, "alice");
}

#[test]
fn test_username_token_signature_second_precision() {
    let fixture = Fixture::new();
    let handler = WsHandler::new(
        fixture
            .options("UsernameTokenSignature")
            .with(keys::TIMESTAMP_PRECISION, "false"),
    );
    let mut doc = envelope();
    let mut msg = MessageContext::new();
    msg.set_password("verysecret");
    handler.secure(&mut doc, &mut msg, true).unwrap();

    let created = security(&doc)
        .find_child(ns::WSSE, ns::node::USERNAME_TOKEN)
        .and_then(|token| token.find_child(ns::WSU, ns::node::CREATED))
        .unwrap()
        .text_content();
    assert!(created.ends_with('Z'), "{created}");
    assert!(!created.contains('.'), "{created}");
}

#[test]
fn test_keystore_secret_signs_and_encrypts() {
    let fixture = Fixture::new();
    let shared: Vec<u8> = (0u8..16).collect();
    let credentials = Arc::new(
        PasswordMap::new()
            .with_password("alice", "")
            .with_password("shared", ""),
    );

    let signer = WsHandler::new(fixture.options("Signature").with(keys::SIGNATURE_USER, "shared"));
    let mut doc = envelope();
    let mut msg = MessageContext::new();
    msg.set_callback(keys::PW_CALLBACK_REF, credentials.clone());
    signer.secure(&mut doc, &mut msg, true).unwrap();

    let doc = XmlDocument::parse(&doc.to_xml()).unwrap();
    let signature = signatures(&doc)[0];
    let key_name = signature
        .find_child(ns::DSIG, ns::node::KEY_INFO)
        .and_then(|ki| ki.find_child(ns::DSIG, ns::node::KEY_NAME))
        .unwrap()
        .text_content();
    assert_eq!(key_name, "shared");
    let verified = verify_signature(&doc, signature, &SigningKey::Hmac(shared)).unwrap();
    assert_eq!(verified.references, vec![body_id(&doc)]);

    let encrypter = WsHandler::new(
        fixture
            .options("Encrypt")
            .with(keys::ENCRYPTION_USER, "shared")
            .with(keys::ENC_KEY_ID, "EmbeddedKeyName")
            .with(keys::ENC_PROP_FILE, fixture.path("keystore.toml")),
    );
    let mut doc = envelope();
    let mut msg = MessageContext::new();
    msg.set_callback(keys::ENC_CALLBACK_REF, credentials);
    encrypter.secure(&mut doc, &mut msg, true).unwrap();

    let key_name = doc
        .find_element(ns::DSIG, ns::node::KEY_NAME)
        .unwrap()
        .text_content();
    assert_eq!(key_name, "shared");
    assert!(!doc.to_xml().contains("<m:amount>"));
}
