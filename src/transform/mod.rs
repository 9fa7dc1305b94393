//! Source-to-tree transformation.
//!
//! The sync engine treats a [`Transformer`] as a pure black box:
//! `content -> RenderResult`. The shipped implementation turns a markdown
//! outline into a mind-map tree ([`MarkdownTransformer`]).

mod markdown;

use std::collections::BTreeSet;

use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

pub use markdown::MarkdownTransformer;

/// Pure content transformation used by every recompute.
pub trait Transformer: Send + Sync + 'static {
    fn transform(&self, content: &str) -> Result<RenderResult, TransformError>;
}

/// Transformer rejected its input.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("transform rejected input: {0}")]
    Rejected(String),
}

/// Output of one transformation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RenderResult {
    pub root: Node,
    pub features: Features,
}

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Heading,
    ListItem,
    Paragraph,
    Code,
    Table,
}

/// Source lines a node was built from (zero-based, end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct NodePayload {
    pub lines: [usize; 2],
}

/// A mind-map node. `content` is inline HTML.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub depth: u32,
    pub content: String,
    pub children: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<NodePayload>,
}

impl Node {
    /// Empty document root.
    pub fn root() -> Self {
        Self::new(NodeKind::Root, 0, String::new())
    }

    pub fn new(kind: NodeKind, depth: u32, content: String) -> Self {
        Self {
            kind,
            depth,
            content,
            children: Vec::new(),
            payload: None,
        }
    }

    pub fn with_lines(mut self, start: usize, end: usize) -> Self {
        self.payload = Some(NodePayload { lines: [start, end] });
        self
    }

    /// Child contents in order.
    #[cfg(test)]
    pub fn child_contents(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.content.as_str()).collect()
    }

    /// Total node count including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

/// Optional client-side features a tree needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureTag {
    /// Math rendering.
    Katex,
    /// Syntax highlighting for fenced code.
    Prism,
}

impl FeatureTag {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Katex => "katex",
            Self::Prism => "prism",
        }
    }
}

/// Set of features, serialized as `{ "katex": true, ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Features(BTreeSet<FeatureTag>);

impl Features {
    pub fn insert(&mut self, tag: FeatureTag) {
        self.0.insert(tag);
    }

    pub fn contains(&self, tag: FeatureTag) -> bool {
        self.0.contains(&tag)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Features {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for tag in &self.0 {
            map.serialize_entry(tag.name(), &true)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_features_serialize_as_flags() {
        let mut features = Features::default();
        features.insert(FeatureTag::Prism);
        features.insert(FeatureTag::Katex);
        features.insert(FeatureTag::Katex);

        let json = serde_json::to_string(&features).unwrap();
        assert_eq!(json, r#"{"katex":true,"prism":true}"#);
    }

    #[test]
    fn test_empty_features_serialize_as_empty_object() {
        let json = serde_json::to_string(&Features::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_node_json_omits_missing_payload() {
        let json = serde_json::to_value(Node::root()).unwrap();
        assert_eq!(json["type"], "root");
        assert_eq!(json["depth"], 0);
        assert!(json.get("payload").is_none());

        let json =
            serde_json::to_value(Node::new(NodeKind::ListItem, 2, "x".into()).with_lines(3, 4))
                .unwrap();
        assert_eq!(json["type"], "list_item");
        assert_eq!(json["payload"]["lines"], serde_json::json!([3, 4]));
    }

    #[test]
    fn test_node_count() {
        let mut root = Node::root();
        let mut a = Node::new(NodeKind::Heading, 1, "A".into());
        a.children.push(Node::new(NodeKind::Heading, 2, "B".into()));
        root.children.push(a);
        assert_eq!(root.count(), 3);
    }
}
