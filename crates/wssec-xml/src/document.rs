#![forbid(unsafe_code)]

//! Owned, mutable XML tree.
//!
//! Security actions insert fragments into the message in place, so the
//! document here owns its nodes instead of borrowing from the source text.
//! Parsing goes through `roxmltree`; serialization lives in [`crate::writer`].

use wssec_core::{ns, Error};

/// A namespace-qualified element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    /// A name in `namespace` written with `prefix` (empty for the default namespace).
    pub fn new(namespace: &str, prefix: &str, local: &str) -> Self {
        Self {
            namespace: Some(namespace.to_owned()),
            prefix: (!prefix.is_empty()).then(|| prefix.to_owned()),
            local: local.to_owned(),
        }
    }

    /// A name with no namespace.
    pub fn local(local: &str) -> Self {
        Self {
            namespace: None,
            prefix: None,
            local: local.to_owned(),
        }
    }

    /// Whether this name has the given local name and namespace (`""` for none).
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.local == local && self.namespace.as_deref().unwrap_or("") == namespace
    }

    /// The name as written: `prefix:local` or `local`.
    pub fn qualified(&self) -> String {
        match self.prefix.as_deref() {
            Some(p) if !p.is_empty() => format!("{p}:{}", self.local),
            _ => self.local.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

/// A namespace declaration carried by an element (`prefix` is empty for
/// the default namespace).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsBinding {
    pub prefix: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    /// Declarations written on this element. The writer adds whatever else
    /// is needed to bind the element and attribute prefixes.
    pub namespaces: Vec<NsBinding>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(namespace: &str, prefix: &str, local: &str) -> Self {
        Self::with_name(QName::new(namespace, prefix, local))
    }

    pub fn with_name(name: QName) -> Self {
        Self {
            name,
            namespaces: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    // ── Builders ─────────────────────────────────────────────────────

    pub fn attr(mut self, local: &str, value: impl Into<String>) -> Self {
        self.set_attribute(local, value);
        self
    }

    pub fn ns_attr(
        mut self,
        namespace: &str,
        prefix: &str,
        local: &str,
        value: impl Into<String>,
    ) -> Self {
        self.set_ns_attribute(namespace, prefix, local, value);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn declare(mut self, prefix: &str, uri: &str) -> Self {
        self.declare_namespace(prefix, uri);
        self
    }

    // ── Attributes ───────────────────────────────────────────────────

    /// Set an attribute with no namespace, replacing any existing value.
    pub fn set_attribute(&mut self, local: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
        {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                name: QName::local(local),
                value,
            }),
        }
    }

    /// Set a namespaced attribute, replacing any existing value.
    pub fn set_ns_attribute(
        &mut self,
        namespace: &str,
        prefix: &str,
        local: &str,
        value: impl Into<String>,
    ) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name.is(namespace, local) && a.name.namespace.is_some())
        {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                name: QName::new(namespace, prefix, local),
                value,
            }),
        }
    }

    /// Value of the attribute `local` with no namespace.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    pub fn ns_attribute(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.as_deref() == Some(namespace) && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// The element's identifier: `wsu:Id`, then `Id`, `ID`, `id`, then the
    /// SAML 1.x `AssertionID`.
    pub fn id(&self) -> Option<&str> {
        self.ns_attribute(ns::WSU, "Id")
            .or_else(|| self.attribute("Id"))
            .or_else(|| self.attribute("ID"))
            .or_else(|| self.attribute("id"))
            .or_else(|| self.attribute(ns::attr::ASSERTION_ID))
    }

    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        if let Some(existing) = self.namespaces.iter_mut().find(|b| b.prefix == prefix) {
            existing.uri = uri.to_owned();
        } else {
            self.namespaces.push(NsBinding {
                prefix: prefix.to_owned(),
                uri: uri.to_owned(),
            });
        }
    }

    // ── Children ─────────────────────────────────────────────────────

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Insert `child` before the first existing child node.
    pub fn prepend_child(&mut self, child: Element) {
        self.children.insert(0, Node::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn find_child(&self, namespace: &str, local: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.name.is(namespace, local))
    }

    pub fn find_child_mut(&mut self, namespace: &str, local: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) if e.name.is(namespace, local) => Some(e),
            _ => None,
        })
    }

    /// Concatenated text of the direct text children.
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    // ── Search ───────────────────────────────────────────────────────

    /// Child-index path from `self` to the first element (pre-order,
    /// `self` included) matching `pred`.
    pub fn path_to<F: Fn(&Element) -> bool>(&self, pred: &F) -> Option<Vec<usize>> {
        if pred(self) {
            return Some(Vec::new());
        }
        for (i, child) in self.children.iter().enumerate() {
            if let Node::Element(e) = child {
                if let Some(mut path) = e.path_to(pred) {
                    path.insert(0, i);
                    return Some(path);
                }
            }
        }
        None
    }

    pub fn at_path(&self, path: &[usize]) -> Option<&Element> {
        let mut cur = self;
        for &i in path {
            cur = match cur.children.get(i)? {
                Node::Element(e) => e,
                _ => return None,
            };
        }
        Some(cur)
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut cur = self;
        for &i in path {
            cur = match cur.children.get_mut(i)? {
                Node::Element(e) => e,
                _ => return None,
            };
        }
        Some(cur)
    }

    /// Replace the node at `path` (which must not be empty) with `node`.
    pub fn replace_at_path(&mut self, path: &[usize], node: Node) -> Result<Node, Error> {
        let (last, parent_path) = path
            .split_last()
            .ok_or_else(|| Error::XmlStructure("cannot replace the element itself".into()))?;
        let parent = self
            .at_path_mut(parent_path)
            .ok_or_else(|| Error::XmlStructure("invalid element path".into()))?;
        let slot = parent
            .children
            .get_mut(*last)
            .ok_or_else(|| Error::XmlStructure("invalid element path".into()))?;
        Ok(std::mem::replace(slot, node))
    }

    /// First element (pre-order, `self` included) with the given name.
    pub fn find_descendant(&self, namespace: &str, local: &str) -> Option<&Element> {
        let path = self.path_to(&|e: &Element| e.name.is(namespace, local))?;
        self.at_path(&path)
    }

    pub fn find_descendant_mut(&mut self, namespace: &str, local: &str) -> Option<&mut Element> {
        let path = self.path_to(&|e: &Element| e.name.is(namespace, local))?;
        self.at_path_mut(&path)
    }

    /// All elements (pre-order, `self` included) with the given name.
    pub fn find_all(&self, namespace: &str, local: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_matching(&|e: &Element| e.name.is(namespace, local), &mut found);
        found
    }

    fn collect_matching<'a, F: Fn(&Element) -> bool>(&'a self, pred: &F, out: &mut Vec<&'a Element>) {
        if pred(self) {
            out.push(self);
        }
        for child in self.child_elements() {
            child.collect_matching(pred, out);
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        let path = self.path_to(&|e: &Element| e.id() == Some(id))?;
        self.at_path(&path)
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        let path = self.path_to(&|e: &Element| e.id() == Some(id))?;
        self.at_path_mut(&path)
    }
}

/// A parsed XML document whose tree can be modified in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: Element,
    declaration: bool,
}

impl XmlDocument {
    /// Parse XML text into an owned tree.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let doc = roxmltree::Document::parse(text).map_err(|e| Error::XmlParse(e.to_string()))?;
        let root = convert_element(doc.root_element(), doc.input_text());
        Ok(Self {
            root,
            declaration: text.trim_start().starts_with("<?xml"),
        })
    }

    pub fn parse_bytes(data: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?;
        Self::parse(text)
    }

    pub fn from_root(root: Element) -> Self {
        Self {
            root,
            declaration: false,
        }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Whether the source started with an XML declaration.
    pub fn has_declaration(&self) -> bool {
        self.declaration
    }

    pub fn find_element(&self, namespace: &str, local: &str) -> Option<&Element> {
        self.root.find_descendant(namespace, local)
    }

    pub fn find_element_mut(&mut self, namespace: &str, local: &str) -> Option<&mut Element> {
        self.root.find_descendant_mut(namespace, local)
    }

    pub fn find_elements(&self, namespace: &str, local: &str) -> Vec<&Element> {
        self.root.find_all(namespace, local)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.root.find_by_id(id)
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.root.find_by_id_mut(id)
    }

    /// Namespace declarations in scope at the element reached by `path`,
    /// outermost first, excluding the element's own declarations.
    pub fn inherited_namespaces(&self, path: &[usize]) -> Vec<NsBinding> {
        let mut scope: Vec<NsBinding> = Vec::new();
        let mut cur = &self.root;
        for &i in path {
            for b in &cur.namespaces {
                scope.retain(|s| s.prefix != b.prefix);
                scope.push(b.clone());
            }
            cur = match cur.children.get(i) {
                Some(Node::Element(e)) => e,
                _ => break,
            };
        }
        scope
    }

    /// Serialize the document.
    pub fn to_xml(&self) -> String {
        crate::writer::write_document(self)
    }
}

impl std::str::FromStr for XmlDocument {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn convert_element(node: roxmltree::Node<'_, '_>, input: &str) -> Element {
    let tag = node.tag_name();
    let name = QName {
        namespace: tag.namespace().map(str::to_owned),
        prefix: element_prefix(node, input),
        local: tag.name().to_owned(),
    };

    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|n| (n.name(), n.uri())).collect())
        .unwrap_or_default();
    let namespaces = node
        .namespaces()
        .filter(|n| n.name() != Some("xml"))
        .filter(|n| !inherited.contains(&(n.name(), n.uri())))
        .map(|n| NsBinding {
            prefix: n.name().unwrap_or("").to_owned(),
            uri: n.uri().to_owned(),
        })
        .collect();

    let attributes = node
        .attributes()
        .enumerate()
        .map(|(i, a)| {
            let name = match a.namespace() {
                Some(uri) => QName {
                    namespace: Some(uri.to_owned()),
                    prefix: Some(attribute_prefix(node, uri).unwrap_or_else(|| format!("ns{i}"))),
                    local: a.name().to_owned(),
                },
                None => QName::local(a.name()),
            };
            Attribute {
                name,
                value: a.value().to_owned(),
            }
        })
        .collect();

    let children = node
        .children()
        .filter_map(|child| {
            if child.is_element() {
                Some(Node::Element(convert_element(child, input)))
            } else if child.is_text() {
                child.text().map(|t| Node::Text(t.to_owned()))
            } else if child.is_comment() {
                child.text().map(|t| Node::Comment(t.to_owned()))
            } else {
                None
            }
        })
        .collect();

    Element {
        name,
        namespaces,
        attributes,
        children,
    }
}

/// The prefix written on the element's start tag in the source text.
fn element_prefix(node: roxmltree::Node<'_, '_>, input: &str) -> Option<String> {
    let raw = input.get(node.range().start + 1..)?;
    let end = raw.find(|c: char| c.is_whitespace() || c == '>' || c == '/')?;
    raw[..end].split_once(':').map(|(p, _)| p.to_owned())
}

/// A non-default prefix bound to `uri` at `node`.
fn attribute_prefix(node: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    if uri == ns::XML {
        return Some("xml".into());
    }
    node.namespaces()
        .filter(|n| n.uri() == uri)
        .find_map(|n| n.name())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOAP: &str = r#"<?xml version="1.0"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:wsu="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd">
  <soapenv:Body wsu:Id="body-1"><m:echo xmlns:m="urn:echo">hi<!-- note --></m:echo></soapenv:Body>
</soapenv:Envelope>"#;

    #[test]
    fn test_parse_keeps_prefixes_and_declarations() {
        let doc = XmlDocument::parse(SOAP).unwrap();
        assert!(doc.has_declaration());
        let root = doc.root();
        assert_eq!(root.name.qualified(), "soapenv:Envelope");
        assert_eq!(root.namespaces.len(), 2);

        let body = doc.find_element(ns::SOAP11, "Body").unwrap();
        assert!(body.namespaces.is_empty());
        let id_attr = &body.attributes[0];
        assert_eq!(id_attr.name.prefix.as_deref(), Some("wsu"));
        assert_eq!(body.id(), Some("body-1"));

        let echo = doc.find_element("urn:echo", "echo").unwrap();
        assert_eq!(echo.name.prefix.as_deref(), Some("m"));
        assert_eq!(echo.text_content(), "hi");
        assert!(matches!(echo.children[1], Node::Comment(_)));
    }

    #[test]
    fn test_find_by_id_and_path() {
        let doc = XmlDocument::parse(SOAP).unwrap();
        let body = doc.find_by_id("body-1").unwrap();
        assert!(body.name.is(ns::SOAP11, "Body"));
        assert!(doc.find_by_id("missing").is_none());

        let path = doc
            .root()
            .path_to(&|e: &Element| e.name.is("urn:echo", "echo"))
            .unwrap();
        let inherited = doc.inherited_namespaces(&path);
        assert!(inherited.iter().any(|b| b.prefix == "soapenv"));
        assert!(inherited.iter().any(|b| b.prefix == "wsu"));
    }

    #[test]
    fn test_mutation() {
        let mut doc = XmlDocument::parse(SOAP).unwrap();
        let body = doc.find_element_mut(ns::SOAP11, "Body").unwrap();
        body.prepend_child(Element::new("urn:x", "x", "first"));
        body.set_attribute("a", "1");
        body.set_attribute("a", "2");
        assert_eq!(body.attribute("a"), Some("2"));
        assert_eq!(body.child_elements().next().unwrap().name.local, "first");

        let path = doc
            .root()
            .path_to(&|e: &Element| e.name.is("urn:x", "first"))
            .unwrap();
        let old = doc
            .root_mut()
            .replace_at_path(&path, Node::Text("gone".into()))
            .unwrap();
        assert!(matches!(old, Node::Element(_)));
        assert!(doc.find_element("urn:x", "first").is_none());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            XmlDocument::parse("<a><b></a>"),
            Err(Error::XmlParse(_))
        ));
    }
}
