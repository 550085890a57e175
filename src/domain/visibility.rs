//! What the presentation layer shows, derived from expand flags.

use itertools::Itertools;

use crate::domain::arena::{Board, NodeId};

impl Board {
    /// A root is always shown; a child only while its parent shows children.
    pub fn should_show_self(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        match self.parent_of(id) {
            None => true,
            Some(parent) => self.should_show_children(parent),
        }
    }

    pub fn can_show_children(&self, id: NodeId) -> bool {
        !self.children_of(id).is_empty() && self.should_show_self(id)
    }

    pub fn should_show_children(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.is_expanded) && self.can_show_children(id)
    }

    pub fn visible_nodes(&self) -> Vec<NodeId> {
        self.iter()
            .map(|(id, _)| id)
            .filter(|&id| self.should_show_self(id))
            .collect()
    }

    /// Non-blank child titles, ascending by order, joined by spaces.
    pub fn summary_text(&self, id: NodeId) -> String {
        self.children_of(id)
            .iter()
            .filter_map(|&child| self.node(child))
            .sorted_by_key(|child| child.order)
            .map(|child| child.title.as_str())
            .filter(|title| !title.trim().is_empty())
            .join(" ")
    }

    /// Recomputes the cached summary of `id` and its collapsed box height.
    ///
    /// Positions are left alone; the ancestors are re-laid-out only when the
    /// collapsed height changed.
    pub fn refresh_summary(&mut self, id: NodeId) {
        let summary = self.summary_text(id);
        let height = self
            .metrics()
            .collapsed_summary_height(summary.chars().count());
        let Some(node) = self.node_mut(id) else {
            return;
        };
        let resized = node.collapsed_summary_height != height;
        node.summary_text = summary;
        node.collapsed_summary_height = height;
        let parent = node.parent();

        if resized {
            if let Some(parent) = parent {
                self.rearrange_self_and_parent(parent);
            }
        }
    }
}
