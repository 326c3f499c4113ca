#![forbid(unsafe_code)]

//! XML namespace constants used across the library.

/// WS-Security 1.0 secext namespace
pub const WSSE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";

/// WS-Security 1.1 secext namespace
pub const WSSE11: &str = "http://docs.oasis-open.org/wss/oasis-wss-wssecurity-secext-1.1.xsd";

/// WS-Security utility namespace
pub const WSU: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";

/// SOAP message security 1.0
pub const SOAP_MESSAGE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0";

/// SOAP message security 1.1
pub const SOAP_MESSAGE11: &str =
    "http://docs.oasis-open.org/wss/oasis-wss-soap-message-security-1.1";

/// Username token profile 1.0
pub const USERNAME_TOKEN_PROFILE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0";

/// X.509 token profile 1.0
pub const X509_TOKEN_PROFILE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-x509-token-profile-1.0";

/// SAML 1.x assertion namespace
pub const SAML: &str = "urn:oasis:names:tc:SAML:1.0:assertion";

/// SAML 2.0 assertion namespace
pub const SAML2: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

/// SOAP 1.1 envelope namespace
pub const SOAP11: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// SOAP 1.2 envelope namespace
pub const SOAP12: &str = "http://www.w3.org/2003/05/soap-envelope";

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// XML Encryption namespace
pub const ENC: &str = "http://www.w3.org/2001/04/xmlenc#";

/// Exclusive C14N namespace
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// XML namespace
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

// ── Prefixes ─────────────────────────────────────────────────────────

pub mod prefix {
    pub const WSSE: &str = "wsse";
    pub const WSSE11: &str = "wsse11";
    pub const WSU: &str = "wsu";
    pub const DSIG: &str = "ds";
    pub const ENC: &str = "xenc";
    pub const SAML: &str = "saml";
    pub const EXC_C14N: &str = "ec";
}

// ── Token value and encoding types ───────────────────────────────────

pub mod value_type {
    pub const BASE64_BINARY: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";
    pub const X509_V3: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-x509-token-profile-1.0#X509v3";
    pub const X509_PKI_PATH: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-x509-token-profile-1.0#X509PKIPathv1";
    pub const X509_SKI: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-x509-token-profile-1.0#X509SubjectKeyIdentifier";
    pub const THUMBPRINT_SHA1: &str =
        "http://docs.oasis-open.org/wss/oasis-wss-soap-message-security-1.1#ThumbprintSHA1";
    pub const ENCRYPTED_KEY_SHA1: &str =
        "http://docs.oasis-open.org/wss/oasis-wss-soap-message-security-1.1#EncryptedKeySHA1";
    pub const USERNAME_TOKEN: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#UsernameToken";
    pub const PASSWORD_TEXT: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";
    pub const PASSWORD_DIGEST: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest";
    pub const SAML_ASSERTION_ID: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-saml-token-profile-1.0#SAMLAssertionID";
}

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    // SOAP
    pub const ENVELOPE: &str = "Envelope";
    pub const HEADER: &str = "Header";
    pub const BODY: &str = "Body";

    // WS-Security
    pub const SECURITY: &str = "Security";
    pub const USERNAME_TOKEN: &str = "UsernameToken";
    pub const USERNAME: &str = "Username";
    pub const PASSWORD: &str = "Password";
    pub const NONCE: &str = "Nonce";
    pub const CREATED: &str = "Created";
    pub const EXPIRES: &str = "Expires";
    pub const SALT: &str = "Salt";
    pub const ITERATION: &str = "Iteration";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const BINARY_SECURITY_TOKEN: &str = "BinarySecurityToken";
    pub const SECURITY_TOKEN_REFERENCE: &str = "SecurityTokenReference";
    pub const REFERENCE: &str = "Reference";
    pub const KEY_IDENTIFIER: &str = "KeyIdentifier";
    pub const SIGNATURE_CONFIRMATION: &str = "SignatureConfirmation";

    // DSig
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNED_INFO: &str = "SignedInfo";
    pub const CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const SIGNATURE_VALUE: &str = "SignatureValue";
    pub const TRANSFORMS: &str = "Transforms";
    pub const TRANSFORM: &str = "Transform";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const DIGEST_VALUE: &str = "DigestValue";
    pub const KEY_INFO: &str = "KeyInfo";
    pub const KEY_NAME: &str = "KeyName";
    pub const KEY_VALUE: &str = "KeyValue";
    pub const RSA_KEY_VALUE: &str = "RSAKeyValue";
    pub const RSA_MODULUS: &str = "Modulus";
    pub const RSA_EXPONENT: &str = "Exponent";
    pub const X509_DATA: &str = "X509Data";
    pub const X509_ISSUER_SERIAL: &str = "X509IssuerSerial";
    pub const X509_ISSUER_NAME: &str = "X509IssuerName";
    pub const X509_SERIAL_NUMBER: &str = "X509SerialNumber";

    // Encryption
    pub const ENCRYPTED_DATA: &str = "EncryptedData";
    pub const ENCRYPTED_KEY: &str = "EncryptedKey";
    pub const ENCRYPTION_METHOD: &str = "EncryptionMethod";
    pub const CIPHER_DATA: &str = "CipherData";
    pub const CIPHER_VALUE: &str = "CipherValue";
    pub const REFERENCE_LIST: &str = "ReferenceList";
    pub const DATA_REFERENCE: &str = "DataReference";

    // SAML 1.1
    pub const ASSERTION: &str = "Assertion";
    pub const CONDITIONS: &str = "Conditions";
    pub const AUTHENTICATION_STATEMENT: &str = "AuthenticationStatement";
    pub const SUBJECT: &str = "Subject";
    pub const NAME_IDENTIFIER: &str = "NameIdentifier";
    pub const SUBJECT_CONFIRMATION: &str = "SubjectConfirmation";
    pub const CONFIRMATION_METHOD: &str = "ConfirmationMethod";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ID: &str = "Id";
    pub const URI: &str = "URI";
    pub const TYPE: &str = "Type";
    pub const ALGORITHM: &str = "Algorithm";
    pub const VALUE_TYPE: &str = "ValueType";
    pub const ENCODING_TYPE: &str = "EncodingType";
    pub const VALUE: &str = "Value";
    pub const ACTOR: &str = "actor";
    pub const ROLE: &str = "role";
    pub const MUST_UNDERSTAND: &str = "mustUnderstand";
    pub const PREFIX_LIST: &str = "PrefixList";
    pub const ASSERTION_ID: &str = "AssertionID";
}

// ── Encryption type URIs ─────────────────────────────────────────────

pub const ENC_TYPE_CONTENT: &str = "http://www.w3.org/2001/04/xmlenc#Content";
pub const ENC_TYPE_ELEMENT: &str = "http://www.w3.org/2001/04/xmlenc#Element";
