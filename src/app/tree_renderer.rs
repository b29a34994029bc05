//! Generates an ASCII representation of the visible tree.

use super::view_model::TreeNodeView;

/// A utility struct for rendering a [`TreeNodeView`] as text.
///
/// Children are rendered in the order they appear in the view, which is the
/// order the service delivered them in.
pub struct TreeRenderer;

impl TreeRenderer {
    /// Renders the root line followed by every visible descendant.
    pub fn render(root: &TreeNodeView) -> String {
        let mut result = format!("{}{}{}\n", Self::icon(root), root.name, Self::marker(root));
        Self::render_children(&root.children, &mut result, "");
        result
    }

    fn render_children(children: &[TreeNodeView], result: &mut String, prefix: &str) {
        for (i, node) in children.iter().enumerate() {
            let is_last = i == children.len() - 1;
            let connector = if is_last { "└── " } else { "├── " };

            result.push_str(&format!(
                "{prefix}{connector}{}{}{}\n",
                Self::icon(node),
                node.name,
                Self::marker(node)
            ));

            if !node.children.is_empty() {
                let new_prefix = if is_last {
                    format!("{prefix}    ")
                } else {
                    format!("{prefix}│   ")
                };
                Self::render_children(&node.children, result, &new_prefix);
            }
        }
    }

    fn icon(node: &TreeNodeView) -> &'static str {
        match (node.is_directory, node.is_expanded) {
            (true, true) => "📂 ",
            (true, false) => "📁 ",
            (false, _) => "📄 ",
        }
    }

    fn marker(node: &TreeNodeView) -> &'static str {
        if node.is_previewed {
            "  ◀"
        } else {
            ""
        }
    }
}
