#![forbid(unsafe_code)]

//! XML Signature creation for security headers.
//!
//! Every part is referenced by identifier and digested after exclusive
//! canonicalization. [`SignatureBuilder::compute`] works on clones, so a
//! failure leaves the document untouched. The returned
//! [`ComputedSignature`] then assigns the missing `wsu:Id`s and inserts
//! the tokens in one step.

use base64::Engine;
use tracing::debug;
use wssec_core::{algorithm, ns, Error};
use wssec_crypto::{digest, sign, SigningKey};
use wssec_xml::soap::SoapVersion;
use wssec_xml::{c14n, Element, XmlDocument};

use crate::header::SecurityHeader;
use crate::id;
use crate::parts::SecurityPart;
use crate::token_ref::KeyReference;

/// Configuration of one signature.
#[derive(Debug, Clone, Default)]
pub struct SignatureBuilder {
    signature_algorithm: Option<String>,
    digest_algorithm: Option<String>,
    parts: Vec<SecurityPart>,
    key_reference: Option<KeyReference>,
}

impl SignatureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signature method URI. Defaults to RSA-SHA1, or HMAC-SHA1 for
    /// symmetric keys.
    pub fn signature_algorithm(mut self, uri: Option<&str>) -> Self {
        self.signature_algorithm = uri.map(str::to_owned);
        self
    }

    /// Digest method URI, SHA-1 by default.
    pub fn digest_algorithm(mut self, uri: Option<&str>) -> Self {
        self.digest_algorithm = uri.map(str::to_owned);
        self
    }

    /// Parts to sign. An empty list signs the SOAP Body.
    pub fn parts(mut self, parts: Vec<SecurityPart>) -> Self {
        self.parts = parts;
        self
    }

    /// The KeyInfo content and any token it refers to.
    pub fn key_reference(mut self, reference: KeyReference) -> Self {
        self.key_reference = Some(reference);
        self
    }

    /// Sign parts of `doc`.
    pub fn compute(&self, doc: &XmlDocument, key: &SigningKey) -> Result<ComputedSignature, Error> {
        self.compute_with(doc, &[], key)
    }

    /// Sign parts of `doc` and of `detached`, elements not yet inserted
    /// into the document. Detached elements must already carry an
    /// identifier.
    pub fn compute_with(
        &self,
        doc: &XmlDocument,
        detached: &[&Element],
        key: &SigningKey,
    ) -> Result<ComputedSignature, Error> {
        let parts = if self.parts.is_empty() {
            vec![SecurityPart::body(SoapVersion::of(doc)?.envelope_uri())]
        } else {
            self.parts.clone()
        };
        let digest_uri = self.digest_algorithm.as_deref().unwrap_or(algorithm::DEFAULT_DIGEST);
        let signature_uri = match (&self.signature_algorithm, key.is_symmetric()) {
            (Some(uri), _) => uri.as_str(),
            (None, true) => algorithm::DEFAULT_MAC,
            (None, false) => algorithm::DEFAULT_SIGNATURE,
        };
        let signer = sign::from_uri(signature_uri)?;
        let b64 = base64::engine::general_purpose::STANDARD;

        let mut assignments: Vec<(Vec<usize>, String)> = Vec::new();
        let mut references = Vec::with_capacity(parts.len());
        for part in &parts {
            let (target, ref_id) = match detached.iter().find(|el| part.selects(el)) {
                Some(el) => {
                    let ref_id = el.id().ok_or_else(|| {
                        Error::XmlStructure(format!("detached part {part} has no identifier"))
                    })?;
                    ((*el).clone(), ref_id.to_owned())
                }
                None => {
                    let path = part.locate(doc)?;
                    let mut target = doc
                        .root()
                        .at_path(&path)
                        .cloned()
                        .ok_or_else(|| Error::MissingElement(part.to_string()))?;
                    let ref_id = match target.id() {
                        Some(existing) => existing.to_owned(),
                        None => {
                            let ref_id = match assignments.iter().find(|(p, _)| *p == path) {
                                Some((_, assigned)) => assigned.clone(),
                                None => {
                                    let fresh = id::generate_id("id-");
                                    assignments.push((path, fresh.clone()));
                                    fresh
                                }
                            };
                            id::set_wsu_id(&mut target, &ref_id);
                            ref_id
                        }
                    };
                    (target, ref_id)
                }
            };
            let digest_value = digest::digest(digest_uri, &c14n::canonicalize(&target))?;
            references.push(reference_element(&ref_id, digest_uri, &b64.encode(digest_value)));
        }

        let mut signed_info = Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::SIGNED_INFO)
            .child(
                Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::CANONICALIZATION_METHOD)
                    .attr(ns::attr::ALGORITHM, algorithm::EXC_C14N),
            )
            .child(
                Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::SIGNATURE_METHOD)
                    .attr(ns::attr::ALGORITHM, signature_uri),
            );
        for reference in references {
            signed_info.push_child(reference);
        }

        let value = signer.sign(key, &c14n::canonicalize(&signed_info))?;

        let signature_id = id::generate_id("Signature-");
        let mut signature = Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::SIGNATURE)
            .declare(ns::prefix::DSIG, ns::DSIG)
            .attr(ns::attr::ID, signature_id.as_str())
            .child(signed_info)
            .child(
                Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::SIGNATURE_VALUE)
                    .text(b64.encode(&value)),
            );

        let mut binary_token = None;
        if let Some(reference) = &self.key_reference {
            let mut key_info = Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::KEY_INFO)
                .attr(ns::attr::ID, id::generate_id("KeyId-"));
            for child in &reference.key_info {
                key_info.push_child(child.clone());
            }
            signature.push_child(key_info);
            binary_token = reference.binary_token.clone();
        }

        debug!(
            id = %signature_id,
            algorithm = signature_uri,
            references = parts.len(),
            "computed signature"
        );
        Ok(ComputedSignature {
            id: signature_id,
            signature,
            binary_token,
            value,
            assignments,
        })
    }
}

fn reference_element(ref_id: &str, digest_uri: &str, digest_b64: &str) -> Element {
    Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::REFERENCE)
        .attr(ns::attr::URI, format!("#{ref_id}"))
        .child(
            Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::TRANSFORMS).child(
                Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::TRANSFORM)
                    .attr(ns::attr::ALGORITHM, algorithm::EXC_C14N),
            ),
        )
        .child(
            Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::DIGEST_METHOD)
                .attr(ns::attr::ALGORITHM, digest_uri),
        )
        .child(Element::new(ns::DSIG, ns::prefix::DSIG, ns::node::DIGEST_VALUE).text(digest_b64))
}

/// A finished signature waiting to be placed into the message.
///
/// The document must not change between `compute` and placement: the
/// pending identifier assignments are located by position.
#[derive(Debug, Clone)]
pub struct ComputedSignature {
    id: String,
    signature: Element,
    binary_token: Option<Element>,
    value: Vec<u8>,
    assignments: Vec<(Vec<usize>, String)>,
}

impl ComputedSignature {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The raw SignatureValue bytes.
    pub fn signature_value(&self) -> &[u8] {
        &self.value
    }

    pub fn signature_element(&self) -> &Element {
        &self.signature
    }

    fn assign_ids(&self, doc: &mut XmlDocument) -> Result<(), Error> {
        for (path, ref_id) in &self.assignments {
            let target = doc
                .root_mut()
                .at_path_mut(path)
                .ok_or_else(|| Error::XmlStructure("signed element moved before placement".into()))?;
            id::set_wsu_id(target, ref_id);
        }
        Ok(())
    }

    /// Assign identifiers and hand back the Signature and BinarySecurityToken
    /// for custom placement, with the signature value.
    pub fn into_elements(
        self,
        doc: &mut XmlDocument,
    ) -> Result<(Element, Option<Element>, Vec<u8>), Error> {
        self.assign_ids(doc)?;
        Ok((self.signature, self.binary_token, self.value))
    }

    /// Assign identifiers, prepend the Signature to the header and then the
    /// BinarySecurityToken in front of it. Returns the signature value.
    pub fn prepend_to_header(
        self,
        doc: &mut XmlDocument,
        header: &SecurityHeader,
    ) -> Result<Vec<u8>, Error> {
        let (signature, binary_token, value) = self.into_elements(doc)?;
        header.prepend(doc, signature)?;
        if let Some(bst) = binary_token {
            header.prepend(doc, bst)?;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::verify_signature;

    const ENVELOPE: &str = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Header/><soapenv:Body><m:ping xmlns:m="urn:m">hi</m:ping></soapenv:Body></soapenv:Envelope>"#;

    #[test]
    fn test_hmac_signature_over_body() {
        let mut doc = XmlDocument::parse(ENVELOPE).unwrap();
        let header = SecurityHeader::new(None, true);
        header.insert(&mut doc).unwrap();
        let key = SigningKey::Hmac(b"0123456789abcdef".to_vec());

        let before = doc.clone();
        let computed = SignatureBuilder::new()
            .key_reference(KeyReference {
                key_info: vec![crate::token_ref::key_name("shared")],
                binary_token: None,
            })
            .compute(&doc, &key)
            .unwrap();
        assert_eq!(doc, before);

        let value = computed.prepend_to_header(&mut doc, &header).unwrap();
        assert_eq!(value.len(), 20);

        let reparsed = XmlDocument::parse(&doc.to_xml()).unwrap();
        let body = wssec_xml::soap::body(&reparsed).unwrap();
        let body_id = body.ns_attribute(ns::WSU, "Id").unwrap();
        let signature = reparsed.find_element(ns::DSIG, "Signature").unwrap();
        let reference = signature.find_descendant(ns::DSIG, "Reference").unwrap();
        assert_eq!(reference.attribute("URI").unwrap(), format!("#{body_id}"));
        assert_eq!(
            signature
                .find_descendant(ns::DSIG, "SignatureMethod")
                .unwrap()
                .attribute("Algorithm"),
            Some(algorithm::HMAC_SHA1)
        );
        let verified = verify_signature(&reparsed, signature, &key).unwrap();
        assert_eq!(verified.value, value);
    }

    #[test]
    fn test_missing_part_leaves_document() {
        let doc = XmlDocument::parse(ENVELOPE).unwrap();
        let err = SignatureBuilder::new()
            .parts(vec![SecurityPart::by_id("absent")])
            .compute(&doc, &SigningKey::Hmac(vec![1; 16]))
            .unwrap_err();
        assert!(matches!(err, Error::MissingElement(_)));
    }

    #[test]
    fn test_detached_part_needs_id() {
        let doc = XmlDocument::parse(ENVELOPE).unwrap();
        let loose = Element::new("urn:x", "x", "token");
        let part = SecurityPart::new(Some("urn:x"), "token", crate::parts::PartModifier::Element);
        let err = SignatureBuilder::new()
            .parts(vec![part])
            .compute_with(&doc, &[&loose], &SigningKey::Hmac(vec![1; 16]))
            .unwrap_err();
        assert!(matches!(err, Error::XmlStructure(_)));
    }

    #[test]
    fn test_rsa_signature_default_algorithm() {
        let mut rng = rand::thread_rng();
        let private = rsa::RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let public = private.to_public_key();
        let mut doc = XmlDocument::parse(ENVELOPE).unwrap();
        let header = SecurityHeader::new(None, false);
        header.insert(&mut doc).unwrap();
        let computed = SignatureBuilder::new()
            .compute(&doc, &SigningKey::Rsa(private))
            .unwrap();
        let sig = computed.signature_element().clone();
        computed.prepend_to_header(&mut doc, &header).unwrap();
        assert_eq!(
            sig.find_descendant(ns::DSIG, "SignatureMethod")
                .unwrap()
                .attribute("Algorithm"),
            Some(algorithm::RSA_SHA1)
        );
        let signature = doc.find_element(ns::DSIG, "Signature").unwrap();
        assert!(verify_signature(&doc, signature, &SigningKey::RsaPublic(public)).is_ok());
    }
}
