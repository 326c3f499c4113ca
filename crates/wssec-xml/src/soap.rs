#![forbid(unsafe_code)]

//! SOAP envelope helpers: version detection and the names that differ
//! between SOAP 1.1 and 1.2.

use crate::document::{Element, XmlDocument};
use wssec_core::{ns, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapVersion {
    Soap11,
    Soap12,
}

impl SoapVersion {
    /// Detect the version from the document element.
    pub fn of(doc: &XmlDocument) -> Result<Self, Error> {
        let root = doc.root();
        if root.name.is(ns::SOAP11, ns::node::ENVELOPE) {
            Ok(SoapVersion::Soap11)
        } else if root.name.is(ns::SOAP12, ns::node::ENVELOPE) {
            Ok(SoapVersion::Soap12)
        } else {
            Err(Error::XmlStructure(format!(
                "document element is not a SOAP envelope: {}",
                root.name.qualified()
            )))
        }
    }

    pub fn envelope_uri(self) -> &'static str {
        match self {
            SoapVersion::Soap11 => ns::SOAP11,
            SoapVersion::Soap12 => ns::SOAP12,
        }
    }

    /// Attribute naming the header target: `actor` (1.1) or `role` (1.2).
    pub fn actor_attribute(self) -> &'static str {
        match self {
            SoapVersion::Soap11 => ns::attr::ACTOR,
            SoapVersion::Soap12 => ns::attr::ROLE,
        }
    }

    /// Value of a set `mustUnderstand` attribute.
    pub fn must_understand_value(self) -> &'static str {
        match self {
            SoapVersion::Soap11 => "1",
            SoapVersion::Soap12 => "true",
        }
    }
}

/// The prefix the envelope is written with, `soapenv` when it uses the
/// default namespace.
pub fn envelope_prefix(doc: &XmlDocument) -> String {
    doc.root()
        .name
        .prefix
        .clone()
        .unwrap_or_else(|| "soapenv".to_owned())
}

/// The SOAP Body element.
pub fn body(doc: &XmlDocument) -> Option<&Element> {
    let version = SoapVersion::of(doc).ok()?;
    doc.root().find_child(version.envelope_uri(), ns::node::BODY)
}
