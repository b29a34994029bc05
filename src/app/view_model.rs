//! Responsible for transforming the `AppState` into a `UiState` view model.
//!
//! This module acts as a presentation layer: it applies the name filter and the
//! expansion side table to the snapshot without changing the snapshot or its
//! child order.

use serde::Serialize;
use std::collections::HashSet;

use super::state::AppState;
use crate::config::Theme;
use crate::core::{Node, SearchEngine};

/// A serializable representation of the application state for the UI.
#[derive(Serialize, Clone, Debug)]
pub struct UiState {
    pub current_root: String,
    /// The visible part of the snapshot, `None` before the first load.
    pub tree: Option<TreeNodeView>,
    pub total_nodes: usize,
    pub total_files: usize,
    pub visible_files_count: usize,
    pub filter_query: String,
    pub history: Vec<String>,
    pub theme: Theme,
    pub is_loading: bool,
    pub is_aggregating: bool,
    pub previewed_path: Option<String>,
    pub status_message: String,
    pub loaded_at: Option<String>,
}

/// A serializable representation of a single visible node.
///
/// `children` is empty for files and for collapsed directories.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TreeNodeView {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    pub is_expanded: bool,
    pub is_match: bool,
    pub is_previewed: bool,
    pub children: Vec<TreeNodeView>,
}

/// Creates the complete `UiState` from the current `AppState`.
pub fn generate_ui_state(state: &AppState) -> UiState {
    let previewed_path = state.preview.as_ref().map(|p| p.path.clone());
    let (tree, total_nodes, total_files, visible_files_count) = match &state.tree {
        Some(tree) => {
            let view = build_tree_view(
                tree.root(),
                &state.expanded_dirs,
                &state.filter_query,
                previewed_path.as_deref(),
            );
            let visible_files = tree
                .root()
                .iter()
                .filter(|node| {
                    !node.is_dir() && SearchEngine::is_visible(node, &state.filter_query)
                })
                .count();
            (view, tree.len(), tree.leaf_count(), visible_files)
        }
        None => (None, 0, 0, 0),
    };

    let status_message = if state.is_loading {
        format!("Loading {}...", state.current_root)
    } else if state.is_aggregating {
        "Copying everything...".to_string()
    } else {
        state.status_message.clone()
    };

    UiState {
        current_root: state.current_root.clone(),
        tree,
        total_nodes,
        total_files,
        visible_files_count,
        filter_query: state.filter_query.clone(),
        history: state.config.path_history.entries().to_vec(),
        theme: state.config.theme,
        is_loading: state.is_loading,
        is_aggregating: state.is_aggregating,
        previewed_path,
        status_message,
        loaded_at: state
            .loaded_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}

/// Builds the view of a node, or `None` if the filter hides it.
///
/// Only expanded directories contribute children.
pub fn build_tree_view(
    node: &Node,
    expanded: &HashSet<String>,
    query: &str,
    previewed_path: Option<&str>,
) -> Option<TreeNodeView> {
    if !SearchEngine::is_visible(node, query) {
        return None;
    }
    let is_expanded = node.is_dir() && expanded.contains(node.path());
    let children = if is_expanded {
        node.children()
            .iter()
            .filter_map(|child| build_tree_view(child, expanded, query, previewed_path))
            .collect()
    } else {
        Vec::new()
    };

    Some(TreeNodeView {
        name: node.name().to_string(),
        path: node.path().to_string(),
        is_directory: node.is_dir(),
        is_expanded,
        is_match: !query.is_empty() && SearchEngine::matches(node, query),
        is_previewed: previewed_path == Some(node.path()),
        children,
    })
}

/// Expands the parent directories of files that match the current filter.
pub fn auto_expand_for_matches(state: &mut AppState) {
    let Some(tree) = state.tree.clone() else {
        return;
    };
    if state.filter_query.is_empty() {
        return;
    }

    let mut ancestors: Vec<&str> = Vec::new();
    let mut stack = vec![(tree.root(), 0usize)];
    while let Some((node, depth)) = stack.pop() {
        ancestors.truncate(depth);
        if node.is_dir() {
            ancestors.push(node.path());
            stack.extend(node.children().iter().rev().map(|child| (child, depth + 1)));
        } else if SearchEngine::matches(node, &state.filter_query) {
            state
                .expanded_dirs
                .extend(ancestors.iter().map(|path| path.to_string()));
        }
    }
}
