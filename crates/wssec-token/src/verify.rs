#![forbid(unsafe_code)]

//! XML Signature verification for security headers.
//!
//! 1. Read `SignedInfo`: CanonicalizationMethod (exclusive C14N only) and
//!    SignatureMethod
//! 2. For each `Reference`: resolve the same-document URI, canonicalize,
//!    digest and compare
//! 3. Canonicalize `SignedInfo` and check the `SignatureValue`

use base64::Engine;
use wssec_core::{algorithm, ns, Error};
use wssec_crypto::{digest, sign, SigningKey};
use wssec_keys::X509Cert;
use wssec_xml::{c14n, Element, XmlDocument};

use crate::token_ref::{certificate_from_token, strip_whitespace};

/// A signature that verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSignature {
    /// The raw SignatureValue bytes.
    pub value: Vec<u8>,
    /// Identifiers of the signed elements.
    pub references: Vec<String>,
}

fn child<'a>(el: &'a Element, local: &str) -> Result<&'a Element, Error> {
    el.find_child(ns::DSIG, local)
        .ok_or_else(|| Error::MissingElement(local.to_owned()))
}

fn algorithm_of<'a>(el: &'a Element) -> Result<&'a str, Error> {
    el.attribute(ns::attr::ALGORITHM).ok_or_else(|| {
        Error::XmlStructure(format!("missing Algorithm on {}", el.name.local))
    })
}

fn decode_b64(text: &str, what: &str) -> Result<Vec<u8>, Error> {
    base64::engine::general_purpose::STANDARD
        .decode(strip_whitespace(text))
        .map_err(|e| Error::Base64(format!("{what}: {e}")))
}

/// Verify `signature`, a `ds:Signature` element of `doc`, with `key`.
pub fn verify_signature(
    doc: &XmlDocument,
    signature: &Element,
    key: &SigningKey,
) -> Result<VerifiedSignature, Error> {
    let signed_info = child(signature, ns::node::SIGNED_INFO)?;

    let c14n_uri = algorithm_of(child(signed_info, ns::node::CANONICALIZATION_METHOD)?)?;
    if c14n_uri != algorithm::EXC_C14N {
        return Err(Error::UnsupportedAlgorithm(format!("C14N: {c14n_uri}")));
    }
    let signature_uri = algorithm_of(child(signed_info, ns::node::SIGNATURE_METHOD)?)?;

    let mut references = Vec::new();
    for reference in signed_info
        .child_elements()
        .filter(|e| e.name.is(ns::DSIG, ns::node::REFERENCE))
    {
        let uri = reference.attribute(ns::attr::URI).unwrap_or("");
        let ref_id = uri
            .strip_prefix('#')
            .ok_or_else(|| Error::XmlStructure(format!("unsupported reference URI: {uri:?}")))?;
        let target = doc
            .find_by_id(ref_id)
            .ok_or_else(|| Error::MissingElement(format!("referenced element #{ref_id}")))?;

        if let Some(transforms) = reference.find_child(ns::DSIG, ns::node::TRANSFORMS) {
            for transform in transforms.child_elements() {
                let uri = algorithm_of(transform)?;
                if uri != algorithm::EXC_C14N {
                    return Err(Error::UnsupportedAlgorithm(format!("transform: {uri}")));
                }
            }
        }

        let digest_uri = algorithm_of(child(reference, ns::node::DIGEST_METHOD)?)?;
        let expected = decode_b64(
            &child(reference, ns::node::DIGEST_VALUE)?.text_content(),
            "DigestValue",
        )?;
        let computed = digest::digest(digest_uri, &c14n::canonicalize(target))?;
        if computed != expected {
            return Err(Error::DigestMismatch(uri.to_owned()));
        }
        references.push(ref_id.to_owned());
    }
    if references.is_empty() {
        return Err(Error::XmlStructure("SignedInfo has no Reference".into()));
    }

    let value = decode_b64(
        &child(signature, ns::node::SIGNATURE_VALUE)?.text_content(),
        "SignatureValue",
    )?;
    let verifier = sign::from_uri(signature_uri)?;
    if !verifier.verify(key, &c14n::canonicalize(signed_info), &value)? {
        return Err(Error::SignatureInvalid(
            "SignatureValue does not match SignedInfo".into(),
        ));
    }

    Ok(VerifiedSignature { value, references })
}

/// The certificate a signature names through a direct reference to a
/// BinarySecurityToken or an X509v3 key identifier, if any.
pub fn signing_certificate(
    doc: &XmlDocument,
    signature: &Element,
) -> Result<Option<X509Cert>, Error> {
    let Some(str_el) = signature
        .find_child(ns::DSIG, ns::node::KEY_INFO)
        .and_then(|ki| ki.find_child(ns::WSSE, ns::node::SECURITY_TOKEN_REFERENCE))
    else {
        return Ok(None);
    };

    if let Some(reference) = str_el.find_child(ns::WSSE, ns::node::REFERENCE) {
        let Some(bst_id) = reference
            .attribute(ns::attr::URI)
            .and_then(|u| u.strip_prefix('#'))
        else {
            return Ok(None);
        };
        return match doc.find_by_id(bst_id) {
            Some(bst) if bst.name.is(ns::WSSE, ns::node::BINARY_SECURITY_TOKEN) => {
                certificate_from_token(bst).map(Some)
            }
            _ => Ok(None),
        };
    }

    if let Some(ki) = str_el.find_child(ns::WSSE, ns::node::KEY_IDENTIFIER) {
        if ki.attribute(ns::attr::VALUE_TYPE) == Some(ns::value_type::X509_V3) {
            let der = decode_b64(&ki.text_content(), "KeyIdentifier")?;
            return X509Cert::from_der(&der).map(Some);
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::SecurityHeader;
    use crate::signature::SignatureBuilder;

    fn signed() -> (XmlDocument, SigningKey) {
        let mut doc = XmlDocument::parse(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><p>amount=10</p></s:Body></s:Envelope>"#,
        )
        .unwrap();
        let header = SecurityHeader::new(None, true);
        header.insert(&mut doc).unwrap();
        let key = SigningKey::Hmac(vec![0x0b; 20]);
        SignatureBuilder::new()
            .compute(&doc, &key)
            .unwrap()
            .prepend_to_header(&mut doc, &header)
            .unwrap();
        (XmlDocument::parse(&doc.to_xml()).unwrap(), key)
    }

    #[test]
    fn test_tampered_body() {
        let (doc, key) = signed();
        let tampered = XmlDocument::parse(&doc.to_xml().replace("amount=10", "amount=99")).unwrap();
        let signature = tampered.find_element(ns::DSIG, "Signature").unwrap();
        assert!(matches!(
            verify_signature(&tampered, signature, &key),
            Err(Error::DigestMismatch(_))
        ));
        let signature = doc.find_element(ns::DSIG, "Signature").unwrap();
        assert_eq!(verify_signature(&doc, signature, &key).unwrap().references.len(), 1);
    }

    #[test]
    fn test_wrong_key() {
        let (doc, _) = signed();
        let signature = doc.find_element(ns::DSIG, "Signature").unwrap();
        assert!(matches!(
            verify_signature(&doc, signature, &SigningKey::Hmac(vec![0x0c; 20])),
            Err(Error::SignatureInvalid(_))
        ));
        assert!(signing_certificate(&doc, signature).unwrap().is_none());
    }
}
