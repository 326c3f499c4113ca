#![forbid(unsafe_code)]

/// Errors produced by the wssec WS-Security library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("digest mismatch for reference: {0}")]
    DigestMismatch(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    /// Invalid handler option or token builder input.
    #[error("configuration error: {0}")]
    Config(String),

    /// Credential callback failed or could not resolve the identifier.
    #[error("credential callback error: {0}")]
    Callback(String),

    /// A collaborator did not supply a required artifact.
    #[error("{0}")]
    MissingArtifact(String),

    #[error("signature confirmation error: {0}")]
    SignatureConfirmation(String),

    /// A pipeline action failed. `source` is the original cause.
    #[error("{context}: {source}")]
    SecurityProcessing {
        context: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap `source` as a security-processing failure of `context`.
    ///
    /// An error that is already a security-processing error is returned
    /// unchanged so a failed pipeline surfaces exactly one wrapper.
    pub fn security(context: impl Into<String>, source: Error) -> Self {
        match source {
            Error::SecurityProcessing { .. } => source,
            other => Error::SecurityProcessing {
                context: context.into(),
                source: Box::new(other),
            },
        }
    }

    /// Whether this is the wrapped failure of a pipeline action.
    pub fn is_security_processing(&self) -> bool {
        matches!(self, Error::SecurityProcessing { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_security_wraps_cause() {
        let err = Error::security("Error during Signature", Error::Key("bad key".into()));
        assert!(err.is_security_processing());
        assert_eq!(err.to_string(), "Error during Signature: key error: bad key");
        let source = err.source().expect("wrapped source");
        assert_eq!(source.to_string(), "key error: bad key");
    }

    #[test]
    fn test_security_does_not_double_wrap() {
        let inner = Error::security("Error during encryption", Error::Crypto("x".into()));
        let outer = Error::security("pipeline", inner);
        assert_eq!(outer.to_string(), "Error during encryption: cryptographic error: x");
    }
}
