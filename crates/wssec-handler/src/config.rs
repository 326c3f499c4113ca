#![forbid(unsafe_code)]

//! Handler options.
//!
//! Options form a flat map keyed by the classic handler option names and
//! load from TOML, where scalar values of any type are kept as strings:
//!
//! ```toml
//! action = "Timestamp Signature"
//! user = "alice"
//! signaturePropFile = "alice-keystore.toml"
//! signatureKeyIdentifier = "DirectReference"
//! signatureParts = "{}{http://schemas.xmlsoap.org/soap/envelope/}Body;{Element}{urn:example}token"
//! timeToLive = 600
//! mustUnderstand = true
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use wssec_core::Error;
use wssec_token::{KeyIdentifierType, PartModifier, PasswordType, SecurityPart};

/// Option and message-context keys.
pub mod keys {
    pub const ACTION: &str = "action";
    pub const ACTOR: &str = "actor";
    pub const MUST_UNDERSTAND: &str = "mustUnderstand";
    pub const USER: &str = "user";
    pub const SIGNATURE_USER: &str = "signatureUser";
    pub const ENCRYPTION_USER: &str = "encryptionUser";

    pub const PW_CALLBACK_CLASS: &str = "passwordCallbackClass";
    pub const PW_CALLBACK_REF: &str = "passwordCallbackRef";
    pub const ENC_CALLBACK_CLASS: &str = "EmbeddedKeyCallbackClass";
    pub const ENC_CALLBACK_REF: &str = "EmbeddedKeyCallbackRef";

    pub const PASSWORD_TYPE: &str = "passwordType";
    pub const ADD_UT_ELEMENTS: &str = "addUTElements";
    pub const USE_DERIVED_KEY: &str = "useDerivedKey";
    pub const USE_DERIVED_KEY_FOR_MAC: &str = "useDerivedKeyForMAC";
    pub const DERIVED_KEY_ITERATIONS: &str = "derivedKeyIterations";
    pub const USE_ENCODED_PASSWORDS: &str = "useEncodedPasswords";

    pub const SIG_PROP_FILE: &str = "signaturePropFile";
    pub const SIG_KEY_ID: &str = "signatureKeyIdentifier";
    pub const SIG_ALGO: &str = "signatureAlgorithm";
    pub const SIG_DIGEST_ALGO: &str = "signatureDigestAlgorithm";
    pub const SIGNATURE_PARTS: &str = "signatureParts";
    pub const USE_SINGLE_CERTIFICATE: &str = "useSingleCertificate";

    pub const ENC_PROP_FILE: &str = "encryptionPropFile";
    pub const ENC_KEY_ID: &str = "encryptionKeyIdentifier";
    pub const ENC_SYM_ALGO: &str = "encryptionSymAlgorithm";
    pub const ENC_KEY_TRANSPORT: &str = "encryptionKeyTransportAlgorithm";
    pub const ENC_SYM_ENC_KEY: &str = "encryptSymmetricEncryptionKey";
    pub const ENCRYPTION_PARTS: &str = "encryptionParts";
    pub const ENC_KEY_NAME: &str = "EmbeddedKeyName";
    /// Encryption user value that selects the certificate of the request
    /// signature.
    pub const USE_REQ_SIG_CERT: &str = "useReqSigCert";

    pub const SAML_PROP_FILE: &str = "samlPropFile";
    pub const TTL_TIMESTAMP: &str = "timeToLive";
    pub const TIMESTAMP_PRECISION: &str = "precisionInMilliseconds";
    pub const ENABLE_SIGNATURE_CONFIRMATION: &str = "enableSignatureConfirmation";
}

/// Static handler configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerOptions {
    values: BTreeMap<String, String>,
    base_dir: Option<PathBuf>,
}

impl HandlerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text. Strings, integers, floats and booleans are accepted.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let table: toml::Table =
            toml::from_str(text).map_err(|e| Error::Config(format!("handler options: {e}")))?;
        let mut options = Self::new();
        for (key, value) in table {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(Error::Config(format!(
                        "handler option {key} must be a scalar, found {}",
                        other.type_str()
                    )))
                }
            };
            options.values.insert(key, value);
        }
        Ok(options)
    }

    /// Read an options file. Keystore and SAML property paths resolve
    /// against its directory.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read handler options {}: {e}", path.display()))
        })?;
        let mut options = Self::parse(&text)?;
        options.base_dir = path.parent().map(Path::to_path_buf);
        Ok(options)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_owned(), value.into());
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// A boolean option: `true`/`1`, `false`/`0`, or `default` when unset.
pub fn decode_bool(key: &str, value: Option<&str>, default: bool) -> Result<bool, Error> {
    match value {
        None => Ok(default),
        Some("1" | "true") => Ok(true),
        Some("0" | "false") => Ok(false),
        Some(_) => Err(Error::Config(format!("WSHandler: illegal {key} parameter"))),
    }
}

/// A lenient flag: only `true`, in any case, is set.
pub fn decode_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// `PasswordText`, `PasswordDigest` or `PasswordNone`.
pub fn decode_password_type(name: &str) -> Result<PasswordType, Error> {
    match name {
        "PasswordText" => Ok(PasswordType::Text),
        "PasswordDigest" => Ok(PasswordType::Digest),
        "PasswordNone" => Ok(PasswordType::None),
        other => Err(Error::Config(format!("Unknown password type encoding: {other}"))),
    }
}

/// A key identifier name that is legal for signatures.
pub fn decode_signature_key_id(name: &str) -> Result<KeyIdentifierType, Error> {
    let kind = KeyIdentifierType::from_name(name)
        .ok_or_else(|| Error::Config("WSHandler: Signature: unknown key identification".into()))?;
    match kind {
        KeyIdentifierType::IssuerSerial
        | KeyIdentifierType::DirectReference
        | KeyIdentifierType::X509KeyIdentifier
        | KeyIdentifierType::SkiKeyIdentifier
        | KeyIdentifierType::Thumbprint
        | KeyIdentifierType::EncryptedKeySha1
        | KeyIdentifierType::KeyValue => Ok(kind),
        _ => Err(Error::Config("WSHandler: Signature: illegal key identification".into())),
    }
}

/// A key identifier name that is legal for encryption.
pub fn decode_encryption_key_id(name: &str) -> Result<KeyIdentifierType, Error> {
    let kind = KeyIdentifierType::from_name(name)
        .ok_or_else(|| Error::Config("WSHandler: Encryption: unknown key identification".into()))?;
    match kind {
        KeyIdentifierType::IssuerSerial
        | KeyIdentifierType::DirectReference
        | KeyIdentifierType::X509KeyIdentifier
        | KeyIdentifierType::SkiKeyIdentifier
        | KeyIdentifierType::EmbeddedKeyName
        | KeyIdentifierType::Thumbprint
        | KeyIdentifierType::EncryptedKeySha1 => Ok(kind),
        _ => Err(Error::Config("WSHandler: Encryption: illegal key identification".into())),
    }
}

const NULL_NS: &str = "Null";

/// Parse `;`-separated part selectors of the form
/// `{modifier}{namespace}localName`, or a bare local name in the envelope
/// namespace.
pub fn parse_parts(text: &str, envelope_uri: &str) -> Result<Vec<SecurityPart>, Error> {
    let wrong = |entry: &str| Error::Config(format!("WSHandler: wrong part definition: {entry}"));
    let mut parts = Vec::new();
    for entry in text.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let fields: Vec<&str> = entry.split('}').map(str::trim).collect();
        let part = match fields.as_slice() {
            [name] => SecurityPart::new(Some(envelope_uri), name, PartModifier::Content),
            [mode, namespace, name] if !name.is_empty() => {
                let mode = mode.strip_prefix('{').ok_or_else(|| wrong(entry))?;
                let namespace = namespace.strip_prefix('{').ok_or_else(|| wrong(entry))?;
                let modifier = match mode {
                    "" | "Content" => PartModifier::Content,
                    "Element" => PartModifier::Element,
                    _ => return Err(wrong(entry)),
                };
                let namespace = match namespace {
                    "" => Some(envelope_uri),
                    NULL_NS => None,
                    uri => Some(uri),
                };
                SecurityPart::new(namespace, name, modifier)
            }
            _ => return Err(wrong(entry)),
        };
        parts.push(part);
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOAP11: &str = "http://schemas.xmlsoap.org/soap/envelope/";

    #[test]
    fn test_parse_stringifies_scalars() {
        let options = HandlerOptions::parse(
            "action = \"Timestamp\"\ntimeToLive = 60\nmustUnderstand = false\n",
        )
        .unwrap();
        assert_eq!(options.get(keys::ACTION), Some("Timestamp"));
        assert_eq!(options.get(keys::TTL_TIMESTAMP), Some("60"));
        assert_eq!(options.get(keys::MUST_UNDERSTAND), Some("false"));
        assert!(HandlerOptions::parse("parts = [\"a\"]").is_err());
    }

    #[test]
    fn test_decode_bool() {
        assert!(decode_bool(keys::MUST_UNDERSTAND, None, true).unwrap());
        assert!(!decode_bool(keys::MUST_UNDERSTAND, Some("0"), true).unwrap());
        assert!(decode_bool(keys::MUST_UNDERSTAND, Some("1"), false).unwrap());
        let err = decode_bool(keys::MUST_UNDERSTAND, Some("yes"), true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: WSHandler: illegal mustUnderstand parameter"
        );
    }

    #[test]
    fn test_flags_and_password_types() {
        assert!(decode_flag(Some("TRUE")));
        assert!(!decode_flag(Some("1")));
        assert!(!decode_flag(None));
        assert_eq!(decode_password_type("PasswordText").unwrap(), PasswordType::Text);
        assert_eq!(decode_password_type("PasswordNone").unwrap(), PasswordType::None);
        assert_eq!(
            decode_password_type("PasswordPlain").unwrap_err().to_string(),
            "configuration error: Unknown password type encoding: PasswordPlain"
        );
    }

    #[test]
    fn test_parse_parts() {
        let parts = parse_parts(
            "Body; {Element}{urn:x}token ;{}{}Header;{Content}{Null}plain",
            SOAP11,
        )
        .unwrap();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], SecurityPart::new(Some(SOAP11), "Body", PartModifier::Content));
        assert_eq!(parts[1], SecurityPart::new(Some("urn:x"), "token", PartModifier::Element));
        assert_eq!(parts[2], SecurityPart::new(Some(SOAP11), "Header", PartModifier::Content));
        assert_eq!(parts[3], SecurityPart::new(None, "plain", PartModifier::Content));
    }

    #[test]
    fn test_wrong_part_definition() {
        for bad in ["{Element}token", "{Whole}{urn:x}token", "{}{urn:x}", "a}b}c"] {
            let err = parse_parts(bad, SOAP11).unwrap_err();
            assert!(
                err.to_string().contains("WSHandler: wrong part definition"),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_key_identifiers() {
        assert_eq!(
            decode_signature_key_id("DirectReference").unwrap(),
            KeyIdentifierType::DirectReference
        );
        assert_eq!(
            decode_signature_key_id("EmbeddedKeyName").unwrap_err().to_string(),
            "configuration error: WSHandler: Signature: illegal key identification"
        );
        assert_eq!(
            decode_encryption_key_id("EmbeddedKeyName").unwrap(),
            KeyIdentifierType::EmbeddedKeyName
        );
        assert!(decode_encryption_key_id("KeyValue").is_err());
        assert!(decode_signature_key_id("Fingerprint").is_err());
    }
}
