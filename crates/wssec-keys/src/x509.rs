#![forbid(unsafe_code)]

//! X.509 certificate accessors used for token references.
//!
//! A security token reference can point at a certificate by issuer and
//! serial number, by subject key identifier, or by SHA-1 thumbprint. The
//! certificate itself travels as the DER bytes of a BinarySecurityToken.

use der::asn1::ObjectIdentifier;
use der::{Decode, Encode};
use wssec_core::Error;
use x509_cert::ext::pkix::SubjectKeyIdentifier;
use x509_cert::Certificate;

const SUBJECT_KEY_IDENTIFIER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.14");

/// A parsed certificate together with its original DER encoding.
#[derive(Clone)]
pub struct X509Cert {
    der: Vec<u8>,
    cert: Certificate,
}

impl std::fmt::Debug for X509Cert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X509Cert")
            .field("subject", &self.cert.tbs_certificate.subject.to_string())
            .field("serial", &self.serial_number())
            .finish()
    }
}

impl PartialEq for X509Cert {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for X509Cert {}

impl X509Cert {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, Error> {
        let cert = Certificate::from_der(der)
            .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
        Ok(Self {
            der: der.to_vec(),
            cert,
        })
    }

    /// The DER encoding.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Issuer distinguished name in RFC 4514 form.
    pub fn issuer_name(&self) -> String {
        self.cert.tbs_certificate.issuer.to_string()
    }

    /// Subject distinguished name in RFC 4514 form.
    pub fn subject_name(&self) -> String {
        self.cert.tbs_certificate.subject.to_string()
    }

    /// Serial number as a decimal string.
    pub fn serial_number(&self) -> String {
        let bytes = self.cert.tbs_certificate.serial_number.as_bytes();
        rsa::BigUint::from_bytes_be(bytes).to_string()
    }

    /// The subject key identifier.
    ///
    /// Taken from the certificate extension when present, otherwise the
    /// SHA-1 hash of the subject public key bits.
    pub fn subject_key_identifier(&self) -> Result<Vec<u8>, Error> {
        let tbs = &self.cert.tbs_certificate;
        if let Some(ext) = tbs
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == SUBJECT_KEY_IDENTIFIER)
        {
            let ski = SubjectKeyIdentifier::from_der(ext.extn_value.as_bytes())
                .map_err(|e| Error::Certificate(format!("bad subject key identifier: {e}")))?;
            return Ok(ski.0.as_bytes().to_vec());
        }
        let bits = tbs.subject_public_key_info.subject_public_key.raw_bytes();
        Ok(wssec_crypto::digest::sha1_of(&[bits]))
    }

    /// SHA-1 hash of the DER encoding.
    pub fn thumbprint_sha1(&self) -> Vec<u8> {
        wssec_crypto::digest::sha1_of(&[self.der.as_slice()])
    }

    /// The RSA public key carried by the certificate.
    pub fn public_key(&self) -> Result<rsa::RsaPublicKey, Error> {
        use spki::DecodePublicKey;
        let spki_der = self
            .cert
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| Error::Certificate(format!("failed to encode SPKI: {e}")))?;
        rsa::RsaPublicKey::from_public_key_der(&spki_der)
            .map_err(|e| Error::Certificate(format!("certificate key is not RSA: {e}")))
    }
}

/// DER encoding of a PKIPath (`SEQUENCE OF Certificate`) over `chain`.
pub fn pki_path(chain: &[X509Cert]) -> Result<Vec<u8>, Error> {
    let certs: Vec<Certificate> = chain.iter().map(|c| c.cert.clone()).collect();
    certs
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode PKIPath: {e}")))
}

/// The certificates of a DER-encoded PKIPath, in encoded order.
pub fn pki_path_certificates(der: &[u8]) -> Result<Vec<X509Cert>, Error> {
    let certs = Vec::<Certificate>::from_der(der)
        .map_err(|e| Error::Certificate(format!("failed to parse PKIPath: {e}")))?;
    certs
        .into_iter()
        .map(|cert| {
            let der = cert
                .to_der()
                .map_err(|e| Error::Certificate(format!("failed to encode certificate: {e}")))?;
            Ok(X509Cert { der, cert })
        })
        .collect()
}
