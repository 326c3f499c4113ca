#![forbid(unsafe_code)]

//! `wsse11:SignatureConfirmation` tokens.

use base64::Engine;
use wssec_core::{ns, Error};
use wssec_xml::Element;

use crate::id;

/// Confirmation of one received signature value, or of receiving none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureConfirmation {
    id: String,
    value: Option<Vec<u8>>,
}

impl SignatureConfirmation {
    pub fn new(value: Option<&[u8]>) -> Self {
        Self {
            id: id::generate_id("SigConf-"),
            value: value.map(<[u8]>::to_vec),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    pub fn to_element(&self) -> Element {
        let mut el = Element::new(ns::WSSE11, ns::prefix::WSSE11, ns::node::SIGNATURE_CONFIRMATION)
            .declare(ns::prefix::WSSE11, ns::WSSE11);
        id::set_wsu_id(&mut el, &self.id);
        if let Some(value) = &self.value {
            el.set_attribute(
                ns::attr::VALUE,
                base64::engine::general_purpose::STANDARD.encode(value),
            );
        }
        el
    }

    /// Read a received token. A missing `Value` confirms that no signature
    /// was received.
    pub fn from_element(el: &Element) -> Result<Self, Error> {
        if !el.name.is(ns::WSSE11, ns::node::SIGNATURE_CONFIRMATION) {
            return Err(Error::XmlStructure(format!(
                "expected SignatureConfirmation, found {}",
                el.name.local
            )));
        }
        let value = match el.attribute(ns::attr::VALUE) {
            Some(text) => Some(
                base64::engine::general_purpose::STANDARD
                    .decode(crate::token_ref::strip_whitespace(text))
                    .map_err(|e| Error::Base64(format!("SignatureConfirmation Value: {e}")))?,
            ),
            None => None,
        };
        Ok(Self {
            id: el.id().unwrap_or_default().to_owned(),
            value,
        })
    }
}
