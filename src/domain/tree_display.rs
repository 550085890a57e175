use termtree::Tree;
use tracing::instrument;

use crate::domain::arena::{Board, NodeId};

/// Renders boards as text trees for inspection.
pub trait TreeDisplay {
    fn to_tree(&self) -> Tree<String>;
}

impl TreeDisplay for Board {
    #[instrument(level = "debug", skip(self), fields(board = %self.title))]
    fn to_tree(&self) -> Tree<String> {
        fn label(board: &Board, id: NodeId) -> String {
            let Some(node) = board.node(id) else {
                return format!("{id} <missing>");
            };
            let global = board.global_position(id).unwrap_or(node.local_position);
            let title = if node.title.trim().is_empty() {
                "-"
            } else {
                node.title.as_str()
            };
            let marker = match (node.children().is_empty(), node.is_expanded) {
                (true, _) => "",
                (false, true) => " [-]",
                (false, false) => " [+]",
            };
            format!(
                "{title}{marker} @ ({:.1}, {:.1}) h={:.1} content={:.1}",
                global.x,
                global.y,
                node.own_height,
                node.content_height()
            )
        }

        fn build(board: &Board, id: NodeId, parent_tree: &mut Tree<String>) {
            for &child in board.children_of(id) {
                let mut child_tree = Tree::new(label(board, child));
                if board.should_show_children(child) {
                    build(board, child, &mut child_tree);
                } else if let Some(node) = board.node(child) {
                    if !node.summary_text.is_empty() {
                        child_tree.push(Tree::new(format!("… {}", node.summary_text)));
                    }
                }
                parent_tree.push(child_tree);
            }
        }

        let mut tree = Tree::new(self.title.clone());
        for root in self.roots() {
            let mut root_tree = Tree::new(label(self, root));
            if self.should_show_children(root) {
                build(self, root, &mut root_tree);
            } else if let Some(node) = self.node(root) {
                if !node.summary_text.is_empty() {
                    root_tree.push(Tree::new(format!("… {}", node.summary_text)));
                }
            }
            tree.push(root_tree);
        }
        tree
    }
}
