#![forbid(unsafe_code)]

//! SAML 1.1 assertions: issuance and sender-vouches/holder-of-key signing.
//!
//! Issuer properties come from a TOML file:
//!
//! ```toml
//! issuer = "www.example.com"
//! subject_name_qualifier = "www.example.com"
//! confirmation_method = "senderVouches"
//! validity = 300
//! issuer_key_name = "issuer"
//! issuer_key_password = "security"
//! keystore = "issuer-keystore.toml"
//! ```

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::debug;
use wssec_core::{ns, Error};
use wssec_crypto::SigningKey;
use wssec_keys::{KeysManager, X509Cert};
use wssec_xml::{Element, XmlDocument};

use crate::header::SecurityHeader;
use crate::parts::SecurityPart;
use crate::signature::{ComputedSignature, SignatureBuilder};
use crate::timestamp::format_instant;
use crate::token_ref::{self, KeyIdentifierType};

pub const AUTH_METHOD_PASSWORD: &str = "urn:oasis:names:tc:SAML:1.0:am:password";
pub const CONFIRMATION_SENDER_VOUCHES: &str = "urn:oasis:names:tc:SAML:1.0:cm:sender-vouches";
pub const CONFIRMATION_HOLDER_OF_KEY: &str = "urn:oasis:names:tc:SAML:1.0:cm:holder-of-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfirmationMethod {
    #[default]
    SenderVouches,
    KeyHolder,
}

impl ConfirmationMethod {
    pub fn uri(self) -> &'static str {
        match self {
            ConfirmationMethod::SenderVouches => CONFIRMATION_SENDER_VOUCHES,
            ConfirmationMethod::KeyHolder => CONFIRMATION_HOLDER_OF_KEY,
        }
    }
}

fn default_authentication_method() -> String {
    AUTH_METHOD_PASSWORD.to_owned()
}

fn default_validity() -> i64 {
    300
}

/// SAML issuer properties.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamlIssuerConfig {
    pub issuer: String,
    #[serde(default)]
    pub subject_name_qualifier: Option<String>,
    #[serde(default = "default_authentication_method")]
    pub authentication_method: String,
    #[serde(default)]
    pub confirmation_method: ConfirmationMethod,
    /// Seconds the assertion stays valid.
    #[serde(default = "default_validity")]
    pub validity: i64,
    #[serde(default)]
    pub issuer_key_name: Option<String>,
    #[serde(default)]
    pub issuer_key_password: Option<String>,
    /// Keystore file holding the issuer key.
    #[serde(default)]
    pub keystore: Option<PathBuf>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl SamlIssuerConfig {
    pub fn parse(text: &str) -> Result<Self, Error> {
        toml::from_str(text).map_err(|e| Error::Config(format!("SAML issuer: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read SAML issuer properties {}: {e}", path.display()))
        })?;
        let mut config = Self::parse(&text)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// The issuer keystore path, resolved against the properties file.
    pub fn keystore_path(&self) -> Option<PathBuf> {
        let path = self.keystore.as_deref()?;
        Some(match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        })
    }
}

/// An assertion element with its `AssertionID`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamlAssertion {
    id: String,
    element: Element,
}

impl SamlAssertion {
    pub fn from_element(element: Element) -> Result<Self, Error> {
        if !element.name.is(ns::SAML, ns::node::ASSERTION) {
            return Err(Error::XmlStructure(format!(
                "expected saml:Assertion, found {}",
                element.name.local
            )));
        }
        let id = element
            .attribute(ns::attr::ASSERTION_ID)
            .ok_or_else(|| Error::XmlStructure("assertion without AssertionID".into()))?
            .to_owned();
        Ok(Self { id, element })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn into_element(self) -> Element {
        self.element
    }
}

/// Source of SAML assertions for outgoing messages.
pub trait SamlIssuer: Send + Sync {
    /// A new assertion about `user`. `None` means the issuer produced nothing.
    fn new_assertion(&self, user: &str) -> Result<Option<SamlAssertion>, Error>;

    /// Whether the sender vouches for the subject, signing with the issuer key.
    fn is_sender_vouches(&self) -> bool;

    fn issuer_key_name(&self) -> Option<&str>;

    fn issuer_key_password(&self) -> Option<&str>;

    /// Keystore holding the issuer key.
    fn issuer_crypto(&self) -> Option<&KeysManager>;
}

/// Issuer driven by [`SamlIssuerConfig`].
#[derive(Debug)]
pub struct DefaultSamlIssuer {
    config: SamlIssuerConfig,
    crypto: Option<KeysManager>,
}

impl DefaultSamlIssuer {
    /// Build an issuer, loading its keystore when one is configured.
    pub fn new(config: SamlIssuerConfig) -> Result<Self, Error> {
        let crypto = match config.keystore_path() {
            Some(path) => Some(KeysManager::from_config_file(&path)?),
            None => None,
        };
        Ok(Self { config, crypto })
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        Self::new(SamlIssuerConfig::from_file(path)?)
    }

    pub fn config(&self) -> &SamlIssuerConfig {
        &self.config
    }
}

impl SamlIssuer for DefaultSamlIssuer {
    fn new_assertion(&self, user: &str) -> Result<Option<SamlAssertion>, Error> {
        let now = Utc::now();
        let not_after = now + Duration::seconds(self.config.validity);
        let instant = format_instant(now, true);
        let saml = |local: &str| Element::new(ns::SAML, ns::prefix::SAML, local);

        let mut name_identifier = saml(ns::node::NAME_IDENTIFIER).text(user);
        if let Some(qualifier) = &self.config.subject_name_qualifier {
            name_identifier.set_attribute("NameQualifier", qualifier.as_str());
        }
        let subject = saml(ns::node::SUBJECT).child(name_identifier).child(
            saml(ns::node::SUBJECT_CONFIRMATION).child(
                saml(ns::node::CONFIRMATION_METHOD).text(self.config.confirmation_method.uri()),
            ),
        );

        let assertion_id = format!("_{}", uuid::Uuid::new_v4().simple());
        let element = saml(ns::node::ASSERTION)
            .declare(ns::prefix::SAML, ns::SAML)
            .attr(ns::attr::ASSERTION_ID, assertion_id.as_str())
            .attr("IssueInstant", instant.as_str())
            .attr("Issuer", self.config.issuer.as_str())
            .attr("MajorVersion", "1")
            .attr("MinorVersion", "1")
            .child(
                saml(ns::node::CONDITIONS)
                    .attr("NotBefore", instant.as_str())
                    .attr("NotOnOrAfter", format_instant(not_after, true)),
            )
            .child(
                saml(ns::node::AUTHENTICATION_STATEMENT)
                    .attr("AuthenticationInstant", instant.as_str())
                    .attr("AuthenticationMethod", self.config.authentication_method.as_str())
                    .child(subject),
            );
        debug!(id = %assertion_id, user, "issued SAML assertion");
        SamlAssertion::from_element(element).map(Some)
    }

    fn is_sender_vouches(&self) -> bool {
        self.config.confirmation_method == ConfirmationMethod::SenderVouches
    }

    fn issuer_key_name(&self) -> Option<&str> {
        self.config.issuer_key_name.as_deref()
    }

    fn issuer_key_password(&self) -> Option<&str> {
        self.config.issuer_key_password.as_deref()
    }

    fn issuer_crypto(&self) -> Option<&KeysManager> {
        self.crypto.as_ref()
    }
}

/// Signature over a SAML assertion and message parts.
///
/// The signature references the assertion by its `AssertionID` next to the
/// configured parts (the SOAP Body by default).
#[derive(Debug, Clone)]
pub struct SignedSamlBuilder {
    key_identifier: KeyIdentifierType,
    use_single_cert: bool,
    signature: SignatureBuilder,
    parts: Vec<SecurityPart>,
}

impl Default for SignedSamlBuilder {
    fn default() -> Self {
        Self {
            key_identifier: KeyIdentifierType::DirectReference,
            use_single_cert: true,
            signature: SignatureBuilder::new(),
            parts: Vec::new(),
        }
    }
}

impl SignedSamlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only `DirectReference` and `X509KeyIdentifier` are accepted.
    pub fn key_identifier(mut self, kind: KeyIdentifierType) -> Result<Self, Error> {
        match kind {
            KeyIdentifierType::DirectReference | KeyIdentifierType::X509KeyIdentifier => {
                self.key_identifier = kind;
                Ok(self)
            }
            other => Err(Error::Config(format!(
                "unsupported key identifier {other:?} for signed SAML"
            ))),
        }
    }

    pub fn use_single_certificate(mut self, single: bool) -> Self {
        self.use_single_cert = single;
        self
    }

    pub fn signature_algorithm(mut self, uri: Option<&str>) -> Self {
        self.signature = self.signature.signature_algorithm(uri);
        self
    }

    pub fn digest_algorithm(mut self, uri: Option<&str>) -> Self {
        self.signature = self.signature.digest_algorithm(uri);
        self
    }

    pub fn parts(mut self, parts: Vec<SecurityPart>) -> Self {
        self.parts = parts;
        self
    }

    /// Sign `assertion` and the message parts with `key`, identified
    /// through the certificate chain `chain`.
    pub fn compute(
        &self,
        doc: &XmlDocument,
        assertion: SamlAssertion,
        key: &SigningKey,
        chain: &[X509Cert],
    ) -> Result<ComputedSignedSaml, Error> {
        let mut parts = self.parts.clone();
        if parts.is_empty() {
            let envelope = wssec_xml::SoapVersion::of(doc)?.envelope_uri();
            parts.push(SecurityPart::body(envelope));
        }
        parts.push(SecurityPart::by_id(assertion.id()));

        let reference =
            token_ref::certificate_reference(self.key_identifier, chain, self.use_single_cert)?;
        let signature = self
            .signature
            .clone()
            .parts(parts)
            .key_reference(reference)
            .compute_with(doc, &[assertion.element()], key)?;
        let str_el = token_ref::saml_assertion_reference(assertion.id());
        Ok(ComputedSignedSaml {
            assertion,
            str_el,
            signature,
        })
    }
}

/// A signed assertion waiting to be placed.
#[derive(Debug, Clone)]
pub struct ComputedSignedSaml {
    assertion: SamlAssertion,
    str_el: Element,
    signature: ComputedSignature,
}

impl ComputedSignedSaml {
    pub fn signature_value(&self) -> &[u8] {
        self.signature.signature_value()
    }

    /// Place the tokens so the header reads Assertion, STR,
    /// BinarySecurityToken, Signature. Returns the signature value.
    pub fn prepend_to_header(
        self,
        doc: &mut XmlDocument,
        header: &SecurityHeader,
    ) -> Result<Vec<u8>, Error> {
        header.element(doc)?;
        let (signature, binary_token, value) = self.signature.into_elements(doc)?;
        header.prepend(doc, signature)?;
        if let Some(bst) = binary_token {
            header.prepend(doc, bst)?;
        }
        header.prepend(doc, self.str_el)?;
        header.prepend(doc, self.assertion.into_element())?;
        Ok(value)
    }
}
