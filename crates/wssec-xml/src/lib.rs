#![forbid(unsafe_code)]

//! XML document layer for the wssec WS-Security library.
//!
//! Provides an owned, mutable tree parsed with `roxmltree`, a serializer
//! with namespace fixup, exclusive canonicalization and SOAP helpers.

pub mod c14n;
pub mod document;
pub mod escape;
pub mod soap;
pub mod writer;

pub use document::{Attribute, Element, Node, NsBinding, QName, XmlDocument};
pub use soap::SoapVersion;
