//! Serialisable DOM snapshot used as detector input
//!
//! A snapshot is captured from the live page (see `wasm::capture_page`) or
//! loaded from a saved capture file. Each element records whether it took
//! part in layout at capture time, since hidden elements are skipped by the
//! whole-document scans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomNode {
    pub tag: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    #[serde(default = "default_visible")]
    pub visible: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DomChild>,
}

fn default_visible() -> bool {
    true
}

/// Text is stored as a bare JSON string, elements as objects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomChild {
    Text(String),
    Element(DomNode),
}

impl DomNode {
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            visible: true,
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(DomChild::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: DomNode) -> Self {
        self.children.push(DomChild::Element(child));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Concatenated text of all descendants, like `Node.textContent`
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                DomChild::Text(text) => out.push_str(text),
                DomChild::Element(node) => node.collect_text(out),
            }
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &DomNode> {
        self.children.iter().filter_map(|c| match c {
            DomChild::Element(node) => Some(node),
            DomChild::Text(_) => None,
        })
    }

    /// All descendant elements in document order, excluding `self`
    pub fn descendants(&self) -> Vec<&DomNode> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, out: &mut Vec<&'a DomNode>) {
        for child in self.child_elements() {
            out.push(child);
            child.collect_descendants(out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomSnapshot {
    pub root: DomNode,
}

impl DomSnapshot {
    pub fn new(root: DomNode) -> Self {
        Self { root }
    }

    /// Every element including the root, in document order
    pub fn elements(&self) -> Vec<&DomNode> {
        let mut out = vec![&self.root];
        out.extend(self.root.descendants());
        out
    }
}

/// A snapshot together with the URL it was taken at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCapture {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,

    pub document: DomSnapshot,
}

impl PageCapture {
    pub fn new(url: impl Into<String>, root: DomNode) -> Self {
        Self {
            url: url.into(),
            captured_at: None,
            document: DomSnapshot::new(root),
        }
    }
}
