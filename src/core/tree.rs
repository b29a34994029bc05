//! The immutable tree snapshot returned by a single load.
//!
//! A [`Tree`] is built once from the service's JSON document and never mutated
//! afterwards. Children keep the order the service sent them in. Every walk in
//! this module, including conversion, cloning, comparison and drop, is
//! iterative, so a very deep snapshot does not grow the call stack. Decoding
//! runs on a stack that grows on demand.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::mem;

use super::error::TreeError;

/// Whether a node is a directory or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Directory,
    File,
}

/// One entry (file or directory) of a snapshot.
#[derive(Debug)]
pub struct Node {
    name: String,
    path: String,
    kind: NodeKind,
    children: Vec<Node>,
}

impl Node {
    /// Creates a file (leaf) node.
    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::File,
            children: Vec::new(),
        }
    }

    /// Creates a directory node with its children in display order.
    pub fn directory(
        name: impl Into<String>,
        path: impl Into<String>,
        children: Vec<Node>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::Directory,
            children,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The globally unique identifier of this node.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Ordered children. Always empty for files.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Iterates this node and all of its descendants in pre-order, left to right.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// Paths of every file below (or at) this node, in pre-order.
    pub fn leaf_paths(&self) -> Vec<&str> {
        self.iter()
            .filter(|node| !node.is_dir())
            .map(Node::path)
            .collect()
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        // Each entry pairs a source node with the clones of its children so far.
        let mut current: (&Node, Vec<Node>) = (self, Vec::with_capacity(self.children.len()));
        let mut parents = Vec::new();
        loop {
            let source = current.0;
            match source.children.get(current.1.len()) {
                Some(child) => {
                    let next = (child, Vec::with_capacity(child.children.len()));
                    parents.push(mem::replace(&mut current, next));
                }
                None => {
                    let (source, children) = current;
                    let node = Node {
                        name: source.name.clone(),
                        path: source.path.clone(),
                        kind: source.kind,
                        children,
                    };
                    match parents.pop() {
                        Some(mut parent) => {
                            parent.1.push(node);
                            current = parent;
                        }
                        None => return node,
                    }
                }
            }
        }
    }
}

impl PartialEq for Node {
    /// Two trees are equal when their pre-order walks agree node for node,
    /// child counts included.
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.iter();
        let mut right = other.iter();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(a), Some(b))
                    if a.kind == b.kind
                        && a.name == b.name
                        && a.path == b.path
                        && a.children.len() == b.children.len() => {}
                _ => return false,
            }
        }
    }
}

impl Eq for Node {}

impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Pre-order iterator over a subtree.
pub struct PreOrder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// The JSON shape the service sends: `{name, path, isDir, children?}`.
///
/// A directory without `children` simply has none.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireNode {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<WireNode>>,
}

impl WireNode {
    /// Decodes a tree document of any depth.
    ///
    /// serde_json's nesting limit is lifted and the recursion runs under
    /// `serde_stacker`, which moves to a fresh stack segment when the current
    /// one runs low.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let mut json = serde_json::Deserializer::from_slice(bytes);
        json.disable_recursion_limit();
        let node = WireNode::deserialize(serde_stacker::Deserializer::new(&mut json))?;
        json.end()?;
        Ok(node)
    }
}

impl Drop for WireNode {
    fn drop(&mut self) {
        let mut pending = self.children.take().unwrap_or_default();
        while let Some(mut node) = pending.pop() {
            if let Some(children) = node.children.take() {
                pending.extend(children);
            }
        }
    }
}

/// A directory whose children are still being converted.
struct PendingDirectory {
    name: String,
    path: String,
    remaining: std::vec::IntoIter<WireNode>,
    converted: Vec<Node>,
}

impl PendingDirectory {
    fn finish(self) -> Node {
        Node::directory(self.name, self.path, self.converted)
    }
}

enum Opened {
    File(Node),
    Directory(PendingDirectory),
}

/// Validates one wire node and detaches its children for later conversion.
fn open(mut wire: WireNode) -> Result<Opened, TreeError> {
    let name = mem::take(&mut wire.name);
    let path = mem::take(&mut wire.path);
    if name.is_empty() {
        return Err(TreeError::EmptyName(path));
    }
    let children = wire.children.take();
    if !wire.is_dir {
        if children.as_ref().is_some_and(|c| !c.is_empty()) {
            return Err(TreeError::FileWithChildren(path));
        }
        return Ok(Opened::File(Node::file(name, path)));
    }
    let children = children.unwrap_or_default();
    Ok(Opened::Directory(PendingDirectory {
        name,
        path,
        converted: Vec::with_capacity(children.len()),
        remaining: children.into_iter(),
    }))
}

impl TryFrom<WireNode> for Node {
    type Error = TreeError;

    fn try_from(wire: WireNode) -> Result<Self, Self::Error> {
        let mut current = match open(wire)? {
            Opened::File(node) => return Ok(node),
            Opened::Directory(directory) => directory,
        };
        let mut parents = Vec::new();
        loop {
            match current.remaining.next() {
                Some(child) => match open(child)? {
                    Opened::File(node) => current.converted.push(node),
                    Opened::Directory(directory) => {
                        parents.push(mem::replace(&mut current, directory));
                    }
                },
                None => {
                    let node = current.finish();
                    match parents.pop() {
                        Some(parent) => {
                            current = parent;
                            current.converted.push(node);
                        }
                        None => return Ok(node),
                    }
                }
            }
        }
    }
}

/// A complete, validated snapshot with exactly one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    root: Node,
    len: usize,
}

impl Tree {
    /// Validates path uniqueness and node names, then wraps the root.
    pub fn new(root: Node) -> Result<Self, TreeError> {
        let mut seen = HashSet::new();
        for node in root.iter() {
            if node.name.is_empty() {
                return Err(TreeError::EmptyName(node.path.clone()));
            }
            if !seen.insert(node.path.as_str()) {
                return Err(TreeError::DuplicatePath(node.path.clone()));
            }
        }
        let len = seen.len();
        Ok(Self { root, len })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Finds the node with the given path.
    pub fn get(&self, path: &str) -> Option<&Node> {
        self.root.iter().find(|node| node.path == path)
    }

    /// Total number of nodes, directories included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn leaf_count(&self) -> usize {
        self.root.iter().filter(|node| !node.is_dir()).count()
    }

    /// Paths of every directory, in pre-order.
    pub fn directory_paths(&self) -> Vec<String> {
        self.root
            .iter()
            .filter(|node| node.is_dir())
            .map(|node| node.path.clone())
            .collect()
    }
}

impl TryFrom<WireNode> for Tree {
    type Error = TreeError;

    fn try_from(wire: WireNode) -> Result<Self, Self::Error> {
        Tree::new(Node::try_from(wire)?)
    }
}
