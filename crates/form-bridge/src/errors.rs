// File: src/errors.rs
// Purpose: Field error trees and merging of client and server errors

use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Key used for errors that belong to the form (or a container) as a whole
pub const FORM_ERROR_KEY: &str = "_form";

/// One node of an [`ErrorTree`]
///
/// Serializes untagged: a message is a JSON string, several messages are an
/// array and a nested tree is an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorNode {
    Message(String),
    Messages(Vec<String>),
    Tree(ErrorTree),
}

impl ErrorNode {
    /// Whether this node carries an error (empty messages do not)
    pub fn is_truthy(&self) -> bool {
        match self {
            ErrorNode::Message(message) => !message.is_empty(),
            ErrorNode::Messages(messages) => !messages.is_empty(),
            ErrorNode::Tree(_) => true,
        }
    }

    /// First message of a leaf node
    pub fn first_message(&self) -> Option<&str> {
        match self {
            ErrorNode::Message(message) => Some(message),
            ErrorNode::Messages(messages) => messages.first().map(String::as_str),
            ErrorNode::Tree(_) => None,
        }
    }

    fn from_messages(mut messages: Vec<String>) -> Self {
        if messages.len() == 1 {
            ErrorNode::Message(messages.remove(0))
        } else {
            ErrorNode::Messages(messages)
        }
    }

    /// Turn this node into a tree, dropping a leaf, and return the tree
    fn make_tree(&mut self) -> &mut ErrorTree {
        if !matches!(self, ErrorNode::Tree(_)) {
            *self = ErrorNode::Tree(ErrorTree::new());
        }
        match self {
            ErrorNode::Tree(tree) => tree,
            _ => unreachable!("node was converted to a tree above"),
        }
    }
}

impl From<&str> for ErrorNode {
    fn from(message: &str) -> Self {
        ErrorNode::Message(message.to_string())
    }
}

impl From<String> for ErrorNode {
    fn from(message: String) -> Self {
        ErrorNode::Message(message)
    }
}

impl From<ErrorTree> for ErrorNode {
    fn from(tree: ErrorTree) -> Self {
        ErrorNode::Tree(tree)
    }
}

/// Field errors shaped like the submitted value
///
/// Object fields nest under their keys and array elements under their
/// decimal index, so `items.0.name` addresses the `name` field of the first
/// item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorTree {
    nodes: IndexMap<String, ErrorNode>,
}

impl ErrorTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set `key` to `node`
    pub fn with(mut self, key: impl Into<String>, node: impl Into<ErrorNode>) -> Self {
        self.insert(key, node);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, node: impl Into<ErrorNode>) {
        self.nodes.insert(key.into(), node.into());
    }

    pub fn get(&self, key: &str) -> Option<&ErrorNode> {
        self.nodes.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ErrorNode> {
        self.nodes.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of top-level entries
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.nodes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ErrorNode)> {
        self.nodes.iter()
    }

    /// Node at a path such as `items[0].name` or `items.0.name`
    pub fn get_path(&self, path: &str) -> Option<&ErrorNode> {
        let segments = split_path(path);
        let (last, parents) = segments.split_last()?;
        let mut tree = self;
        for segment in parents {
            match tree.nodes.get(segment)? {
                ErrorNode::Tree(next) => tree = next,
                _ => return None,
            }
        }
        tree.nodes.get(last)
    }

    /// First message at a path
    pub fn message(&self, path: &str) -> Option<&str> {
        self.get_path(path)?.first_message()
    }

    /// Record a message at a path, creating intermediate trees
    ///
    /// An empty path files the message under [`FORM_ERROR_KEY`]. A message
    /// for an existing leaf is appended to it; a message for an existing
    /// tree goes under that tree's [`FORM_ERROR_KEY`].
    pub fn add(&mut self, path: &str, message: impl Into<String>) {
        let segments = split_path(path);
        self.add_at(&segments, vec![message.into()]);
    }

    fn add_at(&mut self, segments: &[String], mut messages: Vec<String>) {
        let Some((last, parents)) = segments.split_last() else {
            self.add_at(&[FORM_ERROR_KEY.to_string()], messages);
            return;
        };

        let mut tree = self;
        for segment in parents {
            tree = tree.subtree_mut(segment);
        }

        match tree.nodes.get_mut(last) {
            None => {
                tree.nodes
                    .insert(last.clone(), ErrorNode::from_messages(messages));
            }
            Some(ErrorNode::Message(existing)) => {
                let mut merged = vec![std::mem::take(existing)];
                merged.append(&mut messages);
                tree.nodes.insert(last.clone(), ErrorNode::Messages(merged));
            }
            Some(ErrorNode::Messages(existing)) => existing.append(&mut messages),
            Some(ErrorNode::Tree(subtree)) => {
                subtree.add_at(&[FORM_ERROR_KEY.to_string()], messages);
            }
        }
    }

    /// Build a tree from a flat `field -> messages` map
    ///
    /// Field names may be paths (`address.city`, `items[1].qty`); fields
    /// without messages are skipped.
    pub fn from_field_map(fields: &HashMap<String, Vec<String>>) -> Self {
        let mut names: Vec<&String> = fields.keys().collect();
        names.sort();

        let mut tree = ErrorTree::new();
        for name in names {
            let messages = &fields[name];
            if !messages.is_empty() {
                tree.add_at(&split_path(name), messages.clone());
            }
        }
        tree
    }

    /// Every leaf as `(dotted path, first message)`, depth first
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        for (key, node) in &self.nodes {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            match node {
                ErrorNode::Tree(tree) => tree.flatten_into(&path, out),
                leaf => {
                    if let Some(message) = leaf.first_message() {
                        out.push((path, message.to_string()));
                    }
                }
            }
        }
    }

    fn subtree_mut(&mut self, key: &str) -> &mut ErrorTree {
        self.nodes
            .entry(key.to_string())
            .or_insert_with(|| ErrorNode::Tree(ErrorTree::new()))
            .make_tree()
    }

    /// Fold `secondary` into this tree
    ///
    /// Top-level keys of `secondary` must pass `allowed`; below the top level
    /// every key is merged. Nested trees merge recursively, non-empty leaves
    /// overwrite, empty leaves never erase an existing error.
    pub fn merge(&mut self, secondary: Option<&ErrorTree>, allowed: &AllowedKeys) -> &mut Self {
        if let Some(secondary) = secondary {
            self.merge_at(secondary, allowed, 0);
        }
        self
    }

    fn merge_at(&mut self, secondary: &ErrorTree, allowed: &AllowedKeys, depth: usize) {
        for (key, node) in &secondary.nodes {
            if depth == 0 && !allowed.permits(key) {
                trace!(key = %key, "dropping error for field outside the form");
                continue;
            }

            match node {
                ErrorNode::Tree(subtree) => {
                    self.subtree_mut(key).merge_at(subtree, allowed, depth + 1);
                }
                leaf if leaf.is_truthy() => {
                    self.nodes.insert(key.clone(), leaf.clone());
                }
                _ => {}
            }
        }
    }
}

/// Merge `secondary` into `primary` and return the result
///
/// ```
/// use form_bridge::{merge_errors, AllowedKeys, ErrorTree};
///
/// let client = ErrorTree::new().with("x", "err1");
/// let server = ErrorTree::new().with("x", "err2").with("y", "err3");
///
/// let merged = merge_errors(client, Some(&server), &AllowedKeys::new(["x"]));
/// assert_eq!(merged, ErrorTree::new().with("x", "err2"));
/// ```
pub fn merge_errors(
    mut primary: ErrorTree,
    secondary: Option<&ErrorTree>,
    allowed: &AllowedKeys,
) -> ErrorTree {
    primary.merge(secondary, allowed);
    primary
}

/// Top-level field names a merge accepts from the secondary tree
///
/// An empty set accepts every key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedKeys {
    keys: HashSet<String>,
}

impl AllowedKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Accept every key
    pub fn any() -> Self {
        Self::default()
    }

    /// Keys of the values a form currently holds
    pub fn from_values(values: &Value) -> Self {
        values
            .as_object()
            .map(|map| Self::new(map.keys().cloned()))
            .unwrap_or_default()
    }

    pub fn permits(&self, key: &str) -> bool {
        self.keys.is_empty() || self.keys.contains(key)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for AllowedKeys {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Split `a.b[0].c` / `a.b.0.c` into `["a", "b", "0", "c"]`
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                let index: String = chars.by_ref().take_while(|c| *c != ']').collect();
                segments.push(index);
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}
