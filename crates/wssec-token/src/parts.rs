#![forbid(unsafe_code)]

//! Message parts selected for signing or encryption.

use wssec_core::Error;
use wssec_xml::{Element, XmlDocument};

/// How much of a selected element is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartModifier {
    /// Only the children; the element itself stays in clear.
    #[default]
    Content,
    /// The whole element.
    Element,
}

impl PartModifier {
    pub fn as_str(self) -> &'static str {
        match self {
            PartModifier::Content => "Content",
            PartModifier::Element => "Element",
        }
    }
}

/// One element selected by name or by identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPart {
    pub name: String,
    /// `None` selects an element without a namespace.
    pub namespace: Option<String>,
    pub modifier: PartModifier,
    /// When set, the element is selected by its identifier instead of name.
    pub id: Option<String>,
}

impl SecurityPart {
    pub fn new(namespace: Option<&str>, name: &str, modifier: PartModifier) -> Self {
        Self {
            name: name.to_owned(),
            namespace: namespace.map(str::to_owned),
            modifier,
            id: None,
        }
    }

    /// Select the element carrying identifier `id`.
    pub fn by_id(id: &str) -> Self {
        Self {
            name: String::new(),
            namespace: None,
            modifier: PartModifier::Element,
            id: Some(id.to_owned()),
        }
    }

    /// The SOAP Body of the given envelope namespace, Content mode.
    pub fn body(envelope_uri: &str) -> Self {
        Self::new(
            Some(envelope_uri),
            wssec_core::ns::node::BODY,
            PartModifier::Content,
        )
    }

    fn matches(&self, el: &Element) -> bool {
        match &self.id {
            Some(id) => el.id() == Some(id.as_str()),
            None => el.name.is(self.namespace.as_deref().unwrap_or(""), &self.name),
        }
    }

    /// Child-index path from the document element to the selected element.
    pub fn locate(&self, doc: &XmlDocument) -> Result<Vec<usize>, Error> {
        doc.root()
            .path_to(&|e: &Element| self.matches(e))
            .ok_or_else(|| Error::MissingElement(format!("no element found for part {self}")))
    }

    /// Whether `el` is the selected element.
    pub fn selects(&self, el: &Element) -> bool {
        self.matches(el)
    }
}

impl std::fmt::Display for SecurityPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "#{id}"),
            None => write!(
                f,
                "{{{}}}{{{}}}{}",
                self.modifier.as_str(),
                self.namespace.as_deref().unwrap_or("Null"),
                self.name
            ),
        }
    }
}
