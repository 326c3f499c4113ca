#![forbid(unsafe_code)]

//! Serialization of the owned tree with namespace fixup.
//!
//! Elements only carry the declarations they were parsed or built with; the
//! writer emits any extra `xmlns` declarations needed to bind the prefixes
//! actually used on element and attribute names.

use crate::document::{Element, Node, NsBinding, XmlDocument};
use crate::escape::{escape_attr, escape_text};

/// Serialize a whole document.
pub fn write_document(doc: &XmlDocument) -> String {
    let mut out = String::new();
    if doc.has_declaration() {
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    }
    write_into(doc.root(), &mut Vec::new(), &mut out);
    out
}

/// Serialize `el` as a standalone fragment.
pub fn write_element(el: &Element) -> String {
    write_fragment(el, &[])
}

/// Serialize `el` as a standalone fragment, also declaring the `inherited`
/// bindings it would see in its original position.
pub fn write_fragment(el: &Element, inherited: &[NsBinding]) -> String {
    let mut out = String::new();
    if inherited.is_empty() {
        write_into(el, &mut Vec::new(), &mut out);
    } else {
        let mut copy = el.clone();
        for b in inherited {
            if !copy.namespaces.iter().any(|own| own.prefix == b.prefix) {
                copy.namespaces.push(b.clone());
            }
        }
        write_into(&copy, &mut Vec::new(), &mut out);
    }
    out
}

fn lookup<'a>(scope: &'a [NsBinding], prefix: &str) -> Option<&'a str> {
    scope
        .iter()
        .rev()
        .find(|b| b.prefix == prefix)
        .map(|b| b.uri.as_str())
}

fn bind(scope: &mut Vec<NsBinding>, decls: &mut Vec<NsBinding>, prefix: &str, uri: &str) {
    let binding = NsBinding {
        prefix: prefix.to_owned(),
        uri: uri.to_owned(),
    };
    scope.push(binding.clone());
    decls.push(binding);
}

fn write_into(el: &Element, scope: &mut Vec<NsBinding>, out: &mut String) {
    let mark = scope.len();
    let mut decls = Vec::new();

    for b in &el.namespaces {
        if lookup(scope, &b.prefix) != Some(b.uri.as_str()) {
            bind(scope, &mut decls, &b.prefix, &b.uri);
        }
    }

    let prefix = el.name.prefix.as_deref().unwrap_or("");
    match el.name.namespace.as_deref() {
        Some(uri) => {
            if lookup(scope, prefix) != Some(uri) {
                bind(scope, &mut decls, prefix, uri);
            }
        }
        None => {
            if prefix.is_empty() && lookup(scope, "").is_some_and(|u| !u.is_empty()) {
                bind(scope, &mut decls, "", "");
            }
        }
    }

    for attr in &el.attributes {
        let (Some(uri), Some(p)) = (attr.name.namespace.as_deref(), attr.name.prefix.as_deref())
        else {
            continue;
        };
        if p != "xml" && lookup(scope, p) != Some(uri) {
            bind(scope, &mut decls, p, uri);
        }
    }

    let qname = el.name.qualified();
    out.push('<');
    out.push_str(&qname);
    for d in &decls {
        if d.prefix.is_empty() {
            out.push_str(&format!(" xmlns=\"{}\"", escape_attr(&d.uri)));
        } else {
            out.push_str(&format!(" xmlns:{}=\"{}\"", d.prefix, escape_attr(&d.uri)));
        }
    }
    for attr in &el.attributes {
        out.push_str(&format!(
            " {}=\"{}\"",
            attr.name.qualified(),
            escape_attr(&attr.value)
        ));
    }

    if el.children.is_empty() {
        out.push_str("/>");
    } else {
        out.push('>');
        for child in &el.children {
            match child {
                Node::Element(e) => write_into(e, scope, out),
                Node::Text(t) => out.push_str(&escape_text(t)),
                Node::Comment(c) => {
                    out.push_str("<!--");
                    out.push_str(c);
                    out.push_str("-->");
                }
            }
        }
        out.push_str("</");
        out.push_str(&qname);
        out.push('>');
    }

    scope.truncate(mark);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_missing_declarations() {
        let el = Element::new("urn:a", "a", "root")
            .ns_attr("urn:b", "b", "flag", "1")
            .child(Element::new("urn:a", "a", "inner").text("x < y"));
        assert_eq!(
            write_element(&el),
            r#"<a:root xmlns:a="urn:a" xmlns:b="urn:b" b:flag="1"><a:inner>x &lt; y</a:inner></a:root>"#
        );
    }

    #[test]
    fn test_round_trip_keeps_source_declarations() {
        let src = r#"<s:Envelope xmlns:s="urn:s" xmlns:xsd="urn:xsd"><s:Body a="&quot;q&quot;"/></s:Envelope>"#;
        let doc = XmlDocument::parse(src).unwrap();
        assert_eq!(doc.to_xml(), src);
    }

    #[test]
    fn test_undeclares_default_namespace() {
        let el = Element::new("urn:d", "", "outer").child(Element::with_name(
            crate::document::QName::local("plain"),
        ));
        assert_eq!(
            write_element(&el),
            r#"<outer xmlns="urn:d"><plain xmlns=""/></outer>"#
        );
    }

    #[test]
    fn test_fragment_carries_inherited_bindings() {
        let el = Element::new("urn:m", "m", "op");
        let inherited = vec![NsBinding {
            prefix: "xsd".into(),
            uri: "urn:xsd".into(),
        }];
        assert_eq!(
            write_fragment(&el, &inherited),
            r#"<m:op xmlns:xsd="urn:xsd" xmlns:m="urn:m"/>"#
        );
    }
}
