#![forbid(unsafe_code)]

//! Key and certificate loading from PEM and DER files.

use std::path::Path;

use crate::key::Key;
use crate::x509::X509Cert;
use wssec_core::Error;

/// Load an RSA private key from PEM data.
///
/// Accepts PKCS#8, encrypted PKCS#8 (when `password` is given) and PKCS#1.
pub fn load_rsa_private_pem(pem_data: &[u8], password: Option<&str>) -> Result<Key, Error> {
    use pkcs1::DecodeRsaPrivateKey;
    use pkcs8::DecodePrivateKey;

    let pem_str = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;

    if pem_str.contains("ENCRYPTED PRIVATE KEY") {
        let password = password.ok_or_else(|| {
            Error::Key("encrypted private key requires a password".into())
        })?;
        let pk = rsa::RsaPrivateKey::from_pkcs8_encrypted_pem(pem_str, password)
            .map_err(|e| Error::Key(format!("failed to decrypt private key: {e}")))?;
        return Ok(Key::rsa_private(pk));
    }

    // Try PKCS#8 first
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_pem(pem_str) {
        return Ok(Key::rsa_private(pk));
    }

    let pk = rsa::RsaPrivateKey::from_pkcs1_pem(pem_str)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key PEM: {e}")))?;
    Ok(Key::rsa_private(pk))
}

/// Load an RSA private key from DER data (PKCS#8 or PKCS#1).
pub fn load_rsa_private_der(der: &[u8]) -> Result<Key, Error> {
    use pkcs1::DecodeRsaPrivateKey;
    use pkcs8::DecodePrivateKey;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        return Ok(Key::rsa_private(pk));
    }
    let pk = rsa::RsaPrivateKey::from_pkcs1_der(der)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key DER: {e}")))?;
    Ok(Key::rsa_private(pk))
}

/// Load every certificate in PEM data, in order of appearance.
pub fn load_x509_certs_pem(pem_data: &[u8]) -> Result<Vec<X509Cert>, Error> {
    const END: &str = "-----END CERTIFICATE-----";

    let pem_str = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Certificate(format!("invalid PEM encoding: {e}")))?;

    let mut certs = Vec::new();
    let mut rest = pem_str;
    while let Some(start) = rest.find("-----BEGIN CERTIFICATE-----") {
        let block = &rest[start..];
        let end = block
            .find(END)
            .ok_or_else(|| Error::Certificate("unterminated certificate PEM block".into()))?;
        let (label, der) = pem_rfc7468::decode_vec(block[..end + END.len()].as_bytes())
            .map_err(|e| Error::Certificate(format!("failed to decode certificate PEM: {e}")))?;
        if label != "CERTIFICATE" {
            return Err(Error::Certificate(format!(
                "expected CERTIFICATE PEM label, got: {label}"
            )));
        }
        certs.push(X509Cert::from_der(&der)?);
        rest = &block[end + END.len()..];
    }

    if certs.is_empty() {
        return Err(Error::Certificate("no certificate found in PEM data".into()));
    }
    Ok(certs)
}

/// Load a private key file, PEM or DER.
pub fn load_private_key_file(path: &Path, password: Option<&str>) -> Result<Key, Error> {
    let data = std::fs::read(path)?;
    if data.starts_with(b"-----BEGIN") {
        load_rsa_private_pem(&data, password)
    } else {
        load_rsa_private_der(&data)
    }
}

/// Load a certificate file, either a PEM bundle or a single DER certificate.
pub fn load_certificate_file(path: &Path) -> Result<Vec<X509Cert>, Error> {
    let data = std::fs::read(path)?;
    if data.starts_with(b"-----BEGIN") {
        load_x509_certs_pem(&data)
    } else {
        Ok(vec![X509Cert::from_der(&data)?])
    }
}
