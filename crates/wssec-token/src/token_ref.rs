#![forbid(unsafe_code)]

//! Security token references: how a Signature or EncryptedKey points at
//! the key that was used.

use base64::Engine;
use rsa::traits::PublicKeyParts;
use wssec_core::ns::{self, value_type};
use wssec_core::Error;
use wssec_keys::x509::{self, X509Cert};
use wssec_xml::Element;

use crate::id;

/// Key identification methods, numbered as in handler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyIdentifierType {
    /// Reference to a BinarySecurityToken carrying the certificate.
    DirectReference = 1,
    IssuerSerial = 2,
    /// The certificate itself inside a KeyIdentifier.
    X509KeyIdentifier = 3,
    SkiKeyIdentifier = 4,
    /// A `ds:KeyName` naming a shared key.
    EmbeddedKeyName = 5,
    /// Reference to a UsernameToken whose secret is the key.
    UsernameTokenSigning = 7,
    Thumbprint = 8,
    EncryptedKeySha1 = 10,
    /// The RSA public key inline, without a token reference.
    KeyValue = 13,
}

impl KeyIdentifierType {
    /// Look up a configuration name such as `DirectReference`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "DirectReference" => Self::DirectReference,
            "IssuerSerial" => Self::IssuerSerial,
            "X509KeyIdentifier" => Self::X509KeyIdentifier,
            "SKIKeyIdentifier" => Self::SkiKeyIdentifier,
            "EmbeddedKeyName" => Self::EmbeddedKeyName,
            "Thumbprint" => Self::Thumbprint,
            "EncryptedKeySHA1" => Self::EncryptedKeySha1,
            "KeyValue" => Self::KeyValue,
            _ => return None,
        })
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    /// Whether the identifier needs the certificate of the key owner.
    pub fn needs_certificate(self) -> bool {
        matches!(
            self,
            Self::DirectReference
                | Self::IssuerSerial
                | Self::X509KeyIdentifier
                | Self::SkiKeyIdentifier
                | Self::Thumbprint
                | Self::KeyValue
        )
    }
}

/// Where a token reference points and what has to travel with it.
#[derive(Debug, Clone)]
pub struct KeyReference {
    /// The `ds:KeyInfo` children.
    pub key_info: Vec<Element>,
    /// A BinarySecurityToken that must precede the referencing token.
    pub binary_token: Option<Element>,
}

/// Build the KeyInfo content for a certificate-based identifier.
///
/// `chain` is the owner's certificate chain, end-entity first; it must not
/// be empty. `use_single_cert` picks an X509v3 over a PKIPath token for
/// direct references.
pub fn certificate_reference(
    kind: KeyIdentifierType,
    chain: &[X509Cert],
    use_single_cert: bool,
) -> Result<KeyReference, Error> {
    let cert = chain
        .first()
        .ok_or_else(|| Error::KeyNotFound("no certificate for key identifier".into()))?;
    let b64 = base64::engine::general_purpose::STANDARD;

    let mut binary_token = None;
    let content = match kind {
        KeyIdentifierType::DirectReference => {
            let (vt, der) = if use_single_cert {
                (value_type::X509_V3, cert.der().to_vec())
            } else {
                (value_type::X509_PKI_PATH, x509::pki_path(chain)?)
            };
            let bst_id = id::generate_id("CertId-");
            binary_token = Some(binary_security_token(&bst_id, vt, &der));
            reference(&format!("#{bst_id}"), Some(vt))
        }
        KeyIdentifierType::IssuerSerial => Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::X509_DATA)
            .child(
                Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::X509_ISSUER_SERIAL)
                    .child(
                        Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::X509_ISSUER_NAME)
                            .text(cert.issuer_name()),
                    )
                    .child(
                        Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::X509_SERIAL_NUMBER)
                            .text(cert.serial_number()),
                    ),
            ),
        KeyIdentifierType::X509KeyIdentifier => {
            key_identifier(value_type::X509_V3, &b64.encode(cert.der()))
        }
        KeyIdentifierType::SkiKeyIdentifier => {
            key_identifier(value_type::X509_SKI, &b64.encode(cert.subject_key_identifier()?))
        }
        KeyIdentifierType::Thumbprint => {
            key_identifier(value_type::THUMBPRINT_SHA1, &b64.encode(cert.thumbprint_sha1()))
        }
        KeyIdentifierType::KeyValue => {
            let public = cert.public_key()?;
            return Ok(KeyReference {
                key_info: vec![rsa_key_value(&public)],
                binary_token: None,
            });
        }
        other => {
            return Err(Error::Config(format!(
                "key identifier {other:?} does not reference a certificate"
            )))
        }
    };

    Ok(KeyReference {
        key_info: vec![security_token_reference(content)],
        binary_token,
    })
}

/// `ds:KeyName` for a named shared key.
pub fn key_name(name: &str) -> Element {
    Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::KEY_NAME).text(name)
}

/// STR carrying the Base64 SHA-1 of a symmetric key.
pub fn encrypted_key_sha1(sha1_b64: &str) -> Element {
    security_token_reference(key_identifier(value_type::ENCRYPTED_KEY_SHA1, sha1_b64))
}

/// STR referencing the UsernameToken `ut_id`.
pub fn username_token_reference(ut_id: &str) -> Element {
    security_token_reference(reference(
        &format!("#{ut_id}"),
        Some(value_type::USERNAME_TOKEN),
    ))
}

/// STR identifying a SAML 1.x assertion by its AssertionID.
pub fn saml_assertion_reference(assertion_id: &str) -> Element {
    security_token_reference(key_identifier(value_type::SAML_ASSERTION_ID, assertion_id))
}

/// `wsse:SecurityTokenReference` with a fresh `wsu:Id` around `content`.
pub fn security_token_reference(content: Element) -> Element {
    let mut str_el = Element::new(ns::WSSE, ns::prefix::WSSE, ns::node::SECURITY_TOKEN_REFERENCE);
    id::set_wsu_id(&mut str_el, &id::generate_id("STRId-"));
    str_el.push_child(content);
    str_el
}

pub fn reference(uri: &str, vt: Option<&str>) -> Element {
    let mut el = Element::new(ns::WSSE, ns::prefix::WSSE, ns::node::REFERENCE).attr(ns::attr::URI, uri);
    if let Some(vt) = vt {
        el.set_attribute(ns::attr::VALUE_TYPE, vt);
    }
    el
}

pub fn key_identifier(vt: &str, value: &str) -> Element {
    let mut el = Element::new(ns::WSSE, ns::prefix::WSSE, ns::node::KEY_IDENTIFIER);
    if vt != value_type::SAML_ASSERTION_ID {
        el.set_attribute(ns::attr::ENCODING_TYPE, value_type::BASE64_BINARY);
    }
    el.set_attribute(ns::attr::VALUE_TYPE, vt);
    el.text(value)
}

pub fn binary_security_token(bst_id: &str, vt: &str, der: &[u8]) -> Element {
    let mut el = Element::new(ns::WSSE, ns::prefix::WSSE, ns::node::BINARY_SECURITY_TOKEN)
        .attr(ns::attr::ENCODING_TYPE, value_type::BASE64_BINARY)
        .attr(ns::attr::VALUE_TYPE, vt);
    id::set_wsu_id(&mut el, bst_id);
    el.text(base64::engine::general_purpose::STANDARD.encode(der))
}

fn rsa_key_value(public: &rsa::RsaPublicKey) -> Element {
    let b64 = base64::engine::general_purpose::STANDARD;
    Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::KEY_VALUE).child(
        Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::RSA_KEY_VALUE)
            .child(
                Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::RSA_MODULUS)
                    .text(b64.encode(public.n().to_bytes_be())),
            )
            .child(
                Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::RSA_EXPONENT)
                    .text(b64.encode(public.e().to_bytes_be())),
            ),
    )
}

/// The certificate carried by a BinarySecurityToken (the first one of a
/// PKIPath).
pub fn certificate_from_token(bst: &Element) -> Result<X509Cert, Error> {
    let der = base64::engine::general_purpose::STANDARD
        .decode(strip_whitespace(&bst.text_content()))
        .map_err(|e| Error::Base64(format!("BinarySecurityToken: {e}")))?;
    match bst.attribute(ns::attr::VALUE_TYPE) {
        Some(value_type::X509_PKI_PATH) => x509::pki_path_certificates(&der)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Certificate("empty PKIPath".into())),
        _ => X509Cert::from_der(&der),
    }
}

pub(crate) fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
