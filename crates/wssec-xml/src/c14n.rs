#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N) without comments.
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//!
//! Only "visibly utilized" namespace declarations are output: the prefix of
//! the element's own name and the prefixes of its attributes. A declaration
//! is emitted when it differs from the one already rendered by an output
//! ancestor. Canonicalizing a subtree therefore depends on nothing outside
//! it, which is what lets a reference be digested before its target is
//! placed into the message.

use crate::document::{Element, Node};
use crate::escape;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NsDecl {
    /// The prefix ("" for default namespace).
    prefix: String,
    uri: String,
}

impl NsDecl {
    fn render(&self, out: &mut String) {
        if self.prefix.is_empty() {
            out.push_str(&format!(" xmlns=\"{}\"", escape::escape_attr(&self.uri)));
        } else {
            out.push_str(&format!(
                " xmlns:{}=\"{}\"",
                self.prefix,
                escape::escape_attr(&self.uri)
            ));
        }
    }
}

impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Default namespace sorts first, then by prefix.
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Attr<'a> {
    /// "" for no namespace.
    ns_uri: &'a str,
    local_name: &'a str,
    qualified_name: String,
    value: &'a str,
}

impl Ord for Attr<'_> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Attributes with no namespace come first, sorted by local name;
        // the rest by (namespace URI, local name).
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(other.local_name),
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(other.ns_uri)
                .then(self.local_name.cmp(other.local_name)),
        }
    }
}

impl PartialOrd for Attr<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Canonicalize the subtree rooted at `el`.
pub fn canonicalize(el: &Element) -> Vec<u8> {
    let mut out = String::new();
    render_element(el, &mut Vec::new(), &mut out);
    out.into_bytes()
}

fn rendered_uri<'a>(rendered: &'a [NsDecl], prefix: &str) -> Option<&'a str> {
    rendered
        .iter()
        .rev()
        .find(|d| d.prefix == prefix)
        .map(|d| d.uri.as_str())
}

fn render_element(el: &Element, rendered: &mut Vec<NsDecl>, out: &mut String) {
    let mark = rendered.len();

    let mut utilized: Vec<(&str, &str)> = vec![(
        el.name.prefix.as_deref().unwrap_or(""),
        el.name.namespace.as_deref().unwrap_or(""),
    )];
    for attr in &el.attributes {
        if let (Some(uri), Some(prefix)) = (attr.name.namespace.as_deref(), attr.name.prefix.as_deref()) {
            if prefix != "xml" && !utilized.iter().any(|(p, _)| *p == prefix) {
                utilized.push((prefix, uri));
            }
        }
    }

    let mut decls: Vec<NsDecl> = Vec::new();
    for (prefix, uri) in utilized {
        let current = rendered_uri(rendered, prefix);
        let needed = if uri.is_empty() {
            // Only the default namespace can be undeclared.
            prefix.is_empty() && current.is_some_and(|c| !c.is_empty())
        } else {
            current != Some(uri)
        };
        if needed {
            decls.push(NsDecl {
                prefix: prefix.to_owned(),
                uri: uri.to_owned(),
            });
        }
    }
    decls.sort();

    let mut attrs: Vec<Attr<'_>> = el
        .attributes
        .iter()
        .map(|a| Attr {
            ns_uri: a.name.namespace.as_deref().unwrap_or(""),
            local_name: &a.name.local,
            qualified_name: a.name.qualified(),
            value: &a.value,
        })
        .collect();
    attrs.sort();

    let qname = el.name.qualified();
    out.push('<');
    out.push_str(&qname);
    for d in &decls {
        d.render(out);
    }
    for a in &attrs {
        out.push_str(&format!(
            " {}=\"{}\"",
            a.qualified_name,
            escape::escape_attr(a.value)
        ));
    }
    out.push('>');

    rendered.extend(decls);
    for child in &el.children {
        match child {
            Node::Element(e) => render_element(e, rendered, out),
            Node::Text(t) => out.push_str(&escape::escape_text(t)),
            Node::Comment(_) => {}
        }
    }
    rendered.truncate(mark);

    out.push_str("</");
    out.push_str(&qname);
    out.push('>');
}
