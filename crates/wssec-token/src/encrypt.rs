#![forbid(unsafe_code)]

//! XML Encryption of message parts.
//!
//! Each selected part becomes an `xenc:EncryptedData`, either replacing
//! the whole element (`Element` mode) or its children (`Content` mode).
//! How the session key travels depends on [`KeyEncryption`]:
//!
//! - `Certificate`: a fresh session key wrapped for the recipient in an
//!   `xenc:EncryptedKey` that also lists the encrypted parts
//! - `EmbeddedKeyName`: a shared key named through `ds:KeyName`, with a
//!   standalone `xenc:ReferenceList`
//! - `Unencrypted`: a shared key the recipient already knows, with only a
//!   `xenc:ReferenceList`

use base64::Engine;
use tracing::debug;
use wssec_core::{algorithm, ns, Error};
use wssec_crypto::{cipher, digest, keytransport};
use wssec_keys::X509Cert;
use wssec_xml::soap::SoapVersion;
use wssec_xml::{escape, writer, Element, Node, XmlDocument};

use crate::header::SecurityHeader;
use crate::id;
use crate::parts::{PartModifier, SecurityPart};
use crate::token_ref::{self, KeyIdentifierType};

/// How the symmetric key is conveyed to the recipient.
#[derive(Debug, Clone)]
pub enum KeyEncryption {
    /// Generate a session key and wrap it with the public key of `chain[0]`.
    Certificate {
        chain: Vec<X509Cert>,
        key_identifier: KeyIdentifierType,
        use_single_cert: bool,
    },
    /// A shared key the recipient knows by `name`.
    EmbeddedKeyName { name: String, key: Vec<u8> },
    /// A shared key that is not referenced at all, or referenced by its
    /// SHA-1 when `sha1_reference` is set.
    Unencrypted { key: Vec<u8>, sha1_reference: bool },
}

/// Configuration of one encryption step.
#[derive(Debug, Clone)]
pub struct EncryptionBuilder {
    symmetric_algorithm: Option<String>,
    key_transport_algorithm: Option<String>,
    parts: Vec<SecurityPart>,
    key: KeyEncryption,
}

impl EncryptionBuilder {
    pub fn new(key: KeyEncryption) -> Self {
        Self {
            symmetric_algorithm: None,
            key_transport_algorithm: None,
            parts: Vec::new(),
            key,
        }
    }

    /// Data encryption URI, AES-128-CBC by default.
    pub fn symmetric_algorithm(mut self, uri: Option<&str>) -> Self {
        self.symmetric_algorithm = uri.map(str::to_owned);
        self
    }

    /// Key transport URI, RSA PKCS#1 v1.5 by default.
    pub fn key_transport_algorithm(mut self, uri: Option<&str>) -> Self {
        self.key_transport_algorithm = uri.map(str::to_owned);
        self
    }

    /// Parts to encrypt. An empty list encrypts the content of the SOAP Body.
    pub fn parts(mut self, parts: Vec<SecurityPart>) -> Self {
        self.parts = parts;
        self
    }

    /// Encrypt the selected parts of `doc` without modifying it.
    pub fn compute(&self, doc: &XmlDocument) -> Result<ComputedEncryption, Error> {
        let parts = if self.parts.is_empty() {
            vec![SecurityPart::body(SoapVersion::of(doc)?.envelope_uri())]
        } else {
            self.parts.clone()
        };
        let symmetric_uri = self
            .symmetric_algorithm
            .as_deref()
            .unwrap_or(algorithm::DEFAULT_SYMMETRIC);
        let data_cipher = cipher::from_uri(symmetric_uri)?;

        let session_key = match &self.key {
            KeyEncryption::Certificate { .. } => cipher::generate_key(symmetric_uri)?,
            KeyEncryption::EmbeddedKeyName { key, .. } | KeyEncryption::Unencrypted { key, .. } => {
                key.clone()
            }
        };

        let mut paths: Vec<Vec<usize>> = Vec::with_capacity(parts.len());
        for part in &parts {
            let path = part.locate(doc)?;
            if path.is_empty() && part.modifier == PartModifier::Element {
                return Err(Error::XmlStructure("cannot encrypt the document element".into()));
            }
            if paths
                .iter()
                .any(|p| p.starts_with(&path) || path.starts_with(p))
            {
                return Err(Error::Config(format!("encryption part {part} overlaps another part")));
            }
            paths.push(path);
        }

        let encrypted_key_id = id::generate_id("EncKeyId-");
        let data_key_info = self.data_key_info(&encrypted_key_id, &session_key);
        let b64 = base64::engine::general_purpose::STANDARD;

        let mut replacements = Vec::with_capacity(parts.len());
        let mut data_ids = Vec::with_capacity(parts.len());
        for (part, path) in parts.iter().zip(paths) {
            let plaintext = serialize_part(doc, &path, part.modifier)?;
            let cipher_value = data_cipher.encrypt(&session_key, plaintext.as_bytes())?;

            let data_id = id::generate_id("EncDataId-");
            let enc_type = match part.modifier {
                PartModifier::Content => ns::ENC_TYPE_CONTENT,
                PartModifier::Element => ns::ENC_TYPE_ELEMENT,
            };
            let mut encrypted_data = Element::new(ns::ENC, ns::prefix::ENC, ns::node::ENCRYPTED_DATA)
                .declare(ns::prefix::ENC, ns::ENC)
                .attr(ns::attr::ID, data_id.as_str())
                .attr(ns::attr::TYPE, enc_type)
                .child(encryption_method(symmetric_uri));
            if let Some(key_info) = &data_key_info {
                encrypted_data.push_child(key_info.clone());
            }
            encrypted_data.push_child(cipher_data(&b64.encode(cipher_value)));

            replacements.push(Replacement {
                path,
                modifier: part.modifier,
                encrypted_data,
            });
            data_ids.push(data_id);
        }

        let mut header_elements = Vec::new();
        match &self.key {
            KeyEncryption::Certificate {
                chain,
                key_identifier,
                use_single_cert,
            } => {
                let transport_uri = self
                    .key_transport_algorithm
                    .as_deref()
                    .unwrap_or(algorithm::DEFAULT_KEY_TRANSPORT);
                let cert = chain
                    .first()
                    .ok_or_else(|| Error::KeyNotFound("no certificate for encryption".into()))?;
                let wrapped = keytransport::from_uri(transport_uri)?
                    .encrypt(&cert.public_key()?, &session_key)?;

                let kind = match key_identifier {
                    KeyIdentifierType::EncryptedKeySha1 => KeyIdentifierType::Thumbprint,
                    other => *other,
                };
                let reference = token_ref::certificate_reference(kind, chain, *use_single_cert)?;
                let mut key_info = Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::KEY_INFO)
                    .declare(ns::prefix::DSIG, ns::DSIG);
                for child in reference.key_info {
                    key_info.push_child(child);
                }

                let encrypted_key = Element::new(ns::ENC, ns::prefix::ENC, ns::node::ENCRYPTED_KEY)
                    .declare(ns::prefix::ENC, ns::ENC)
                    .attr(ns::attr::ID, encrypted_key_id.as_str())
                    .child(encryption_method(transport_uri))
                    .child(key_info)
                    .child(cipher_data(&b64.encode(wrapped)))
                    .child(reference_list(&data_ids));
                header_elements.push(encrypted_key);
                if let Some(bst) = reference.binary_token {
                    header_elements.push(bst);
                }
            }
            KeyEncryption::EmbeddedKeyName { .. } | KeyEncryption::Unencrypted { .. } => {
                header_elements.push(
                    reference_list(&data_ids).declare(ns::prefix::ENC, ns::ENC),
                );
            }
        }

        debug!(
            algorithm = symmetric_uri,
            parts = data_ids.len(),
            "computed encryption"
        );
        Ok(ComputedEncryption {
            replacements,
            header_elements,
            data_ids,
        })
    }

    fn data_key_info(&self, encrypted_key_id: &str, session_key: &[u8]) -> Option<Element> {
        let content = match &self.key {
            KeyEncryption::Certificate { .. } => {
                token_ref::security_token_reference(token_ref::reference(&format!("#{encrypted_key_id}"), None))
            }
            KeyEncryption::EmbeddedKeyName { name, .. } => token_ref::key_name(name),
            KeyEncryption::Unencrypted { sha1_reference, .. } => {
                if !sha1_reference {
                    return None;
                }
                let sha1 = digest::sha1_of(&[session_key]);
                token_ref::encrypted_key_sha1(&base64::engine::general_purpose::STANDARD.encode(sha1))
            }
        };
        Some(
            Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::KEY_INFO)
                .declare(ns::prefix::DSIG, ns::DSIG)
                .child(content),
        )
    }
}

fn encryption_method(uri: &str) -> Element {
    Element::new(ns::ENC, ns::prefix::ENC, ns::node::ENCRYPTION_METHOD).attr(ns::attr::ALGORITHM, uri)
}

fn cipher_data(value_b64: &str) -> Element {
    Element::new(ns::ENC, ns::prefix::ENC, ns::node::CIPHER_DATA)
        .child(Element::new(ns::ENC, ns::prefix::ENC, ns::node::CIPHER_VALUE).text(value_b64))
}

fn reference_list(data_ids: &[String]) -> Element {
    let mut list = Element::new(ns::ENC, ns::prefix::ENC, ns::node::REFERENCE_LIST);
    for data_id in data_ids {
        list.push_child(
            Element::new(ns::ENC, ns::prefix::ENC, ns::node::DATA_REFERENCE)
                .attr(ns::attr::URI, format!("#{data_id}")),
        );
    }
    list
}

/// The plaintext of one part: the element itself, or its children, each
/// carrying the namespace declarations in scope at its position.
fn serialize_part(doc: &XmlDocument, path: &[usize], modifier: PartModifier) -> Result<String, Error> {
    let el = doc
        .root()
        .at_path(path)
        .ok_or_else(|| Error::XmlStructure("invalid element path".into()))?;
    if modifier == PartModifier::Element {
        return Ok(writer::write_fragment(el, &doc.inherited_namespaces(path)));
    }

    let mut child_path = path.to_vec();
    child_path.push(0);
    let inherited = doc.inherited_namespaces(&child_path);
    let mut out = String::new();
    for child in &el.children {
        match child {
            Node::Element(e) => out.push_str(&writer::write_fragment(e, &inherited)),
            Node::Text(t) => out.push_str(&escape::escape_text(t)),
            Node::Comment(_) => {}
        }
    }
    Ok(out)
}

#[derive(Debug, Clone)]
struct Replacement {
    path: Vec<usize>,
    modifier: PartModifier,
    encrypted_data: Element,
}

/// Encrypted parts and header tokens waiting to be placed.
#[derive(Debug, Clone)]
pub struct ComputedEncryption {
    replacements: Vec<Replacement>,
    /// In prepend order: the first element ends up last.
    header_elements: Vec<Element>,
    data_ids: Vec<String>,
}

impl ComputedEncryption {
    /// Identifiers of the EncryptedData elements, in part order.
    pub fn data_ids(&self) -> &[String] {
        &self.data_ids
    }

    /// Replace the parts with their EncryptedData and prepend the key
    /// material to the header.
    pub fn apply(self, doc: &mut XmlDocument, header: &SecurityHeader) -> Result<(), Error> {
        header.element(doc)?;
        for replacement in self.replacements {
            match replacement.modifier {
                PartModifier::Element => {
                    doc.root_mut()
                        .replace_at_path(&replacement.path, Node::Element(replacement.encrypted_data))?;
                }
                PartModifier::Content => {
                    let target = doc
                        .root_mut()
                        .at_path_mut(&replacement.path)
                        .ok_or_else(|| Error::XmlStructure("encrypted element moved before placement".into()))?;
                    target.children = vec![Node::Element(replacement.encrypted_data)];
                }
            }
        }
        for el in self.header_elements {
            header.prepend(doc, el)?;
        }
        Ok(())
    }
}
