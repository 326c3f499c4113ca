#![forbid(unsafe_code)]

//! `wsu:Id` allocation.

use wssec_core::ns;
use wssec_xml::Element;

/// A fresh identifier: `prefix` followed by a random UUID.
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}{}", uuid::Uuid::new_v4().simple())
}

/// The element's existing identifier, or a new `wsu:Id` set on it.
pub fn ensure_wsu_id(el: &mut Element, prefix: &str) -> String {
    if let Some(id) = el.id() {
        return id.to_owned();
    }
    let id = generate_id(prefix);
    set_wsu_id(el, &id);
    id
}

pub fn set_wsu_id(el: &mut Element, id: &str) {
    el.set_ns_attribute(ns::WSU, ns::prefix::WSU, ns::attr::ID, id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = generate_id("id-");
        let b = generate_id("id-");
        assert!(a.starts_with("id-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_existing_id_kept() {
        let mut el = Element::new("urn:m", "m", "op").attr("Id", "given");
        assert_eq!(ensure_wsu_id(&mut el, "id-"), "given");
        let mut el = Element::new("urn:m", "m", "op");
        let id = ensure_wsu_id(&mut el, "id-");
        assert_eq!(el.ns_attribute(ns::WSU, "Id"), Some(id.as_str()));
    }
}
