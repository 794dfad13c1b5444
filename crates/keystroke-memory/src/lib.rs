#![forbid(unsafe_code)]

//! `keystroke-memory` provides an in-memory host document for Keystroke.
//!
//! Design goals:
//! - **Host-driven**: the embedder inserts containers and reads back their
//!   text after advancing the engine clock.
//! - **Deterministic**: no browser, no timers, no threads.
//!
//! [`MemoryDocument`] implements [`Document`] with a flat list of elements in
//! document order and a head holding marked stylesheet nodes. It backs the
//! test suites and any headless embedding.

use std::collections::BTreeMap;

use keystroke_core::document::{ContainerId, Document};
use keystroke_core::selector::{ElementView, Selector, SelectorError};

/// One element in a [`MemoryDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
}

impl Element {
    /// Create an element with a lowercase tag name and no content.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
        }
    }

    #[must_use]
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    /// Add a class to the element's class list.
    #[must_use]
    pub fn class(mut self, class: impl AsRef<str>) -> Self {
        let class = class.as_ref();
        let list = self.attributes.entry("class".to_string()).or_default();
        if !list.split_whitespace().any(|c| c == class) {
            if !list.is_empty() {
                list.push(' ');
            }
            list.push_str(class);
        }
        self
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

impl ElementView for Element {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Stylesheet node in the document head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleNode {
    pub marker: String,
    pub css: String,
}

/// In-memory [`Document`].
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    elements: Vec<(ContainerId, Element)>,
    head: Vec<StyleNode>,
    next_id: u32,
    writes: u64,
}

impl MemoryDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element to the body. Returns its handle.
    pub fn insert(&mut self, element: Element) -> ContainerId {
        let id = ContainerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.elements.push((id, element));
        id
    }

    /// Detach an element. Later calls addressing it fail softly.
    pub fn detach(&mut self, id: ContainerId) -> Option<Element> {
        let index = self.elements.iter().position(|(eid, _)| *eid == id)?;
        Some(self.elements.remove(index).1)
    }

    #[must_use]
    pub fn element(&self, id: ContainerId) -> Option<&Element> {
        self.elements
            .iter()
            .find_map(|(eid, el)| (*eid == id).then_some(el))
    }

    fn element_mut(&mut self, id: ContainerId) -> Option<&mut Element> {
        self.elements
            .iter_mut()
            .find_map(|(eid, el)| (*eid == id).then_some(el))
    }

    /// Number of elements in the body.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All stylesheet nodes in the head, in insertion order.
    #[must_use]
    pub fn head(&self) -> &[StyleNode] {
        &self.head
    }

    /// Add a raw stylesheet node without replacing existing ones.
    ///
    /// Lets tests model stray duplicates left behind by other code.
    pub fn push_stylesheet(&mut self, marker: impl Into<String>, css: impl Into<String>) {
        self.head.push(StyleNode {
            marker: marker.into(),
            css: css.into(),
        });
    }

    /// Total successful `set_text` calls.
    #[must_use]
    pub fn text_writes(&self) -> u64 {
        self.writes
    }
}

impl Document for MemoryDocument {
    fn query_all(&self, selector: &str) -> Result<Vec<ContainerId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .elements
            .iter()
            .filter(|(_, el)| selector.matches(el))
            .map(|(id, _)| *id)
            .collect())
    }

    fn text(&self, id: ContainerId) -> Option<String> {
        self.element(id).map(|el| el.text.clone())
    }

    fn set_text(&mut self, id: ContainerId, text: &str) -> bool {
        let Some(el) = self.element_mut(id) else {
            return false;
        };
        if el.text != text {
            el.text.clear();
            el.text.push_str(text);
        }
        self.writes += 1;
        true
    }

    fn attribute(&self, id: ContainerId, name: &str) -> Option<String> {
        self.element(id)
            .and_then(|el| el.attributes.get(name).cloned())
    }

    fn set_attribute(&mut self, id: ContainerId, name: &str, value: &str) -> bool {
        let Some(el) = self.element_mut(id) else {
            return false;
        };
        el.attributes.insert(name.to_string(), value.to_string());
        true
    }

    fn upsert_stylesheet(&mut self, marker: &str, css: &str) {
        match self.head.iter_mut().find(|node| node.marker == marker) {
            Some(node) => {
                node.css.clear();
                node.css.push_str(css);
            }
            None => self.push_stylesheet(marker, css),
        }
    }

    fn remove_stylesheets(&mut self, marker: &str) -> usize {
        let before = self.head.len();
        self.head.retain(|node| node.marker != marker);
        before - self.head.len()
    }

    fn stylesheet_count(&self, marker: &str) -> usize {
        self.head.iter().filter(|node| node.marker == marker).count()
    }

    fn stylesheet(&self, marker: &str) -> Option<String> {
        self.head
            .iter()
            .find(|node| node.marker == marker)
            .map(|node| node.css.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> (MemoryDocument, ContainerId, ContainerId, ContainerId) {
        let mut doc = MemoryDocument::new();
        let a = doc.insert(Element::new("H1").class("keystroke").id("hero").text("hi"));
        let b = doc.insert(Element::new("p").class("keystroke").class("muted"));
        let c = doc.insert(Element::new("div").attr("data-role", "banner"));
        (doc, a, b, c)
    }

    #[test]
    fn query_in_document_order() {
        let (doc, a, b, c) = sample();
        assert_eq!(doc.query_all(".keystroke").unwrap(), vec![a, b]);
        assert_eq!(doc.query_all("#hero").unwrap(), vec![a]);
        assert_eq!(doc.query_all("[data-role=banner]").unwrap(), vec![c]);
        assert_eq!(doc.query_all("h1, div").unwrap(), vec![a, c]);
        assert_eq!(doc.query_one(".muted").unwrap(), Some(b));
        assert_eq!(doc.query_one(".nothing").unwrap(), None);
    }

    #[test]
    fn query_reports_bad_selectors() {
        let (doc, ..) = sample();
        assert!(doc.query_all("div > p").is_err());
        assert!(doc.query_all("").is_err());
    }

    #[test]
    fn class_builder_dedups() {
        let el = Element::new("p").class("a").class("a").class("b");
        assert_eq!(el.attribute("class"), Some("a b"));
    }

    #[test]
    fn text_and_attributes() {
        let (mut doc, a, ..) = sample();
        assert_eq!(doc.text(a).as_deref(), Some("hi"));
        assert!(doc.set_text(a, "bye"));
        assert_eq!(doc.text(a).as_deref(), Some("bye"));
        assert_eq!(doc.text_writes(), 1);
        assert!(doc.set_attribute(a, "data-x", "1"));
        assert_eq!(doc.attribute(a, "data-x").as_deref(), Some("1"));
        assert_eq!(doc.attribute(a, "data-y"), None);
    }

    #[test]
    fn detached_elements_fail_softly() {
        let (mut doc, a, ..) = sample();
        assert!(doc.detach(a).is_some());
        assert!(doc.detach(a).is_none());
        assert!(!doc.set_text(a, "x"));
        assert!(!doc.set_attribute(a, "k", "v"));
        assert_eq!(doc.text(a), None);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn stylesheet_upsert_and_remove() {
        let mut doc = MemoryDocument::new();
        doc.upsert_stylesheet("m", "a{}");
        doc.upsert_stylesheet("m", "b{}");
        assert_eq!(doc.stylesheet_count("m"), 1);
        assert_eq!(doc.stylesheet("m").as_deref(), Some("b{}"));
        doc.push_stylesheet("m", "c{}");
        doc.push_stylesheet("other", "d{}");
        assert_eq!(doc.remove_stylesheets("m"), 2);
        assert_eq!(doc.remove_stylesheets("m"), 0);
        assert_eq!(doc.head().len(), 1);
    }
}
