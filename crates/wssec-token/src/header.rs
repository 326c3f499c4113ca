#![forbid(unsafe_code)]

//! The `wsse:Security` header block.
//!
//! A message can carry one Security header per actor. Every token builder
//! inserts into the header chosen here, either in front of the existing
//! children (`prepend`) or after them (`append`).

use tracing::debug;
use wssec_core::{ns, Error};
use wssec_xml::soap::{self, SoapVersion};
use wssec_xml::{Element, XmlDocument};

/// Locates (and creates) the Security header for one actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityHeader {
    actor: Option<String>,
    must_understand: bool,
}

impl SecurityHeader {
    /// `actor` of `None` (or empty) targets the ultimate receiver.
    pub fn new(actor: Option<&str>, must_understand: bool) -> Self {
        Self {
            actor: actor.filter(|a| !a.is_empty()).map(str::to_owned),
            must_understand,
        }
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    fn matches(&self, el: &Element, version: SoapVersion) -> bool {
        el.name.is(ns::WSSE, ns::node::SECURITY)
            && el
                .ns_attribute(version.envelope_uri(), version.actor_attribute())
                .filter(|a| !a.is_empty())
                == self.actor.as_deref()
    }

    fn path(&self, doc: &XmlDocument) -> Result<Option<Vec<usize>>, Error> {
        let version = SoapVersion::of(doc)?;
        let root = doc.root();
        let Some(header_idx) = root.children.iter().position(|n| {
            matches!(n, wssec_xml::Node::Element(e) if e.name.is(version.envelope_uri(), ns::node::HEADER))
        }) else {
            return Ok(None);
        };
        let Some(header) = root.at_path(&[header_idx]) else {
            return Ok(None);
        };
        Ok(header
            .children
            .iter()
            .position(|n| matches!(n, wssec_xml::Node::Element(e) if self.matches(e, version)))
            .map(|sec_idx| vec![header_idx, sec_idx]))
    }

    /// Whether the document already carries this header.
    pub fn exists(&self, doc: &XmlDocument) -> Result<bool, Error> {
        Ok(self.path(doc)?.is_some())
    }

    /// Insert the Security header, creating the SOAP Header when needed.
    /// An existing header for the same actor is reused.
    pub fn insert(&self, doc: &mut XmlDocument) -> Result<(), Error> {
        if self.exists(doc)? {
            return Ok(());
        }
        let version = SoapVersion::of(doc)?;
        let env_uri = version.envelope_uri();
        let env_prefix = soap::envelope_prefix(doc);

        let mut security = Element::new(ns::WSSE, ns::prefix::WSSE, ns::node::SECURITY)
            .declare(ns::prefix::WSSE, ns::WSSE);
        if self.must_understand {
            security.set_ns_attribute(
                env_uri,
                &env_prefix,
                ns::attr::MUST_UNDERSTAND,
                version.must_understand_value(),
            );
        }
        if let Some(actor) = &self.actor {
            security.set_ns_attribute(env_uri, &env_prefix, version.actor_attribute(), actor.as_str());
        }

        let root = doc.root_mut();
        let element_prefix = root.name.prefix.clone().unwrap_or_default();
        if let Some(header) = root.find_child_mut(env_uri, ns::node::HEADER) {
            header.prepend_child(security);
        } else {
            let header = Element::new(env_uri, &element_prefix, ns::node::HEADER).child(security);
            root.prepend_child(header);
        }
        debug!(actor = ?self.actor, "inserted wsse:Security header");
        Ok(())
    }

    /// The Security element.
    pub fn element<'a>(&self, doc: &'a XmlDocument) -> Result<&'a Element, Error> {
        let path = self.path(doc)?.ok_or_else(Self::missing)?;
        doc.root().at_path(&path).ok_or_else(Self::missing)
    }

    pub fn element_mut<'a>(&self, doc: &'a mut XmlDocument) -> Result<&'a mut Element, Error> {
        let path = self.path(doc)?.ok_or_else(Self::missing)?;
        doc.root_mut().at_path_mut(&path).ok_or_else(Self::missing)
    }

    /// Insert `el` before every existing child of the header.
    pub fn prepend(&self, doc: &mut XmlDocument, el: Element) -> Result<(), Error> {
        self.element_mut(doc)?.prepend_child(el);
        Ok(())
    }

    /// Insert `el` after every existing child of the header.
    pub fn append(&self, doc: &mut XmlDocument, el: Element) -> Result<(), Error> {
        self.element_mut(doc)?.push_child(el);
        Ok(())
    }

    fn missing() -> Error {
        Error::MissingElement("wsse:Security header".into())
    }
}

/// Local names of the child elements of `security`, in document order.
pub fn child_names(security: &Element) -> Vec<&str> {
    security.child_elements().map(|e| e.name.local.as_str()).collect()
}
