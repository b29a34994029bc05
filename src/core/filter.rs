//! Provides the name filter applied while rendering the tree.
//!
//! The filter only hides files. Directories stay visible whatever the query,
//! even when nothing below them matches.

use super::tree::Node;

/// A utility struct for matching nodes against a search query.
///
/// This struct is stateless and provides methods as associated functions.
pub struct SearchEngine;

impl SearchEngine {
    /// Case-insensitive substring test of `query` against the node's name.
    pub fn matches(node: &Node, query: &str) -> bool {
        Self::matches_name(node.name(), query)
    }

    /// Checks if a name contains the query, ignoring case.
    pub fn matches_name(name: &str, query: &str) -> bool {
        name.to_lowercase().contains(&query.to_lowercase())
    }

    /// Decides whether a node is rendered under the given query.
    pub fn is_visible(node: &Node, query: &str) -> bool {
        node.is_dir() || query.is_empty() || Self::matches(node, query)
    }

    /// Paths of the visible nodes of a subtree, in pre-order.
    pub fn visible_paths<'a>(root: &'a Node, query: &str) -> Vec<&'a str> {
        root.iter()
            .filter(|node| Self::is_visible(node, query))
            .map(Node::path)
            .collect()
    }
}
