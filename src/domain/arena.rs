use std::fmt;

use generational_arena::{Arena, Index};
use kurbo::{Point, Vec2};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::layout::LayoutMetrics;

/// Generational handle of a node inside a [`Board`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "#{slot}.{generation}")
    }
}

/// A single mind-map item.
///
/// Geometry is parent-relative: `local_position` is an offset from the parent's
/// global position, or an absolute board position for roots. The parent/children
/// relation is private so that it can only change through [`Board`] operations,
/// which keep both sides in sync.
#[derive(Debug, Clone)]
pub struct Node {
    /// Persistent identity, used as the record key by the store
    pub uuid: Uuid,
    pub title: String,
    pub local_position: Point,
    /// Laid-out slot for children, drag anchor for roots
    pub last_local_position: Point,
    /// Collapsed-summary bubble position relative to the node
    pub content_offset: Vec2,
    /// Measured height of the node box, fed back by the presentation layer
    pub own_height: f64,
    pub collapsed_summary_height: f64,
    pub subtree_content_height: f64,
    /// Sibling rank; higher orders are stacked first
    pub order: i64,
    pub is_expanded: bool,
    pub image_ref: Option<String>,
    /// Space-joined titles of the children, ascending by order
    pub summary_text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(title: impl Into<String>, position: Point, metrics: &LayoutMetrics) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            title: title.into(),
            local_position: position,
            last_local_position: position,
            content_offset: Vec2::new(metrics.column_offset(), 0.0),
            own_height: metrics.min_node_height,
            collapsed_summary_height: metrics.min_node_height,
            subtree_content_height: metrics.min_node_height,
            order: 0,
            is_expanded: false,
            image_ref: None,
            summary_text: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// Height of whatever is drawn next to the node: the expanded children
    /// stack or the collapsed summary box.
    pub fn content_height(&self) -> f64 {
        if self.is_expanded {
            self.subtree_content_height
        } else {
            self.collapsed_summary_height
        }
    }
}

/// A named arena of nodes forming one or more rooted trees.
///
/// The board owns every node; parents and children refer to each other by
/// [`NodeId`] only, so removing a node is an explicit arena operation.
#[derive(Debug)]
pub struct Board {
    pub id: Uuid,
    pub title: String,
    nodes: Arena<Node>,
    metrics: LayoutMetrics,
}

impl Board {
    pub fn new(title: impl Into<String>, metrics: LayoutMetrics) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            nodes: Arena::new(),
            metrics,
        }
    }

    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub(crate) fn require(&self, id: NodeId) -> DomainResult<&Node> {
        self.node(id).ok_or(DomainError::UnknownNode(id))
    }

    pub(crate) fn require_mut(&mut self, id: NodeId) -> DomainResult<&mut Node> {
        self.node_mut(id).ok_or(DomainError::UnknownNode(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(idx, node)| (NodeId(idx), node))
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|(idx, _)| NodeId(idx)).collect()
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Inserts a detached node. Use [`Board::add_child`] to attach it.
    #[instrument(level = "trace", skip(self, node), fields(title = %node.title))]
    pub fn insert(&mut self, mut node: Node) -> NodeId {
        node.parent = None;
        node.children.clear();
        NodeId(self.nodes.insert(node))
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|node| node.children()).unwrap_or(&[])
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            if result.len() > self.nodes.len() {
                break;
            }
            result.push(parent);
            current = self.parent_of(parent);
        }
        result
    }

    /// Descendants of `id` in depth-first pre-order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.subtree(id).skip(1).map(|(child, _)| child).collect()
    }

    /// Depth-first pre-order walk of the subtree rooted at `id`, `id` included.
    pub fn subtree(&self, id: NodeId) -> SubtreeIter<'_> {
        SubtreeIter::new(self, id)
    }

    pub fn is_ancestor(&self, ancestor: NodeId, of: NodeId) -> bool {
        self.ancestors(of).contains(&ancestor)
    }

    /// Absolute board position: the sum of local positions up the parent chain.
    pub fn global_position(&self, id: NodeId) -> Option<Point> {
        let node = self.node(id)?;
        let mut position = node.local_position;
        for ancestor in self.ancestors(id) {
            position += self.node(ancestor)?.local_position.to_vec2();
        }
        Some(position)
    }

    /// Global position of the node's laid-out slot (its `last_local_position`).
    pub fn last_global_position(&self, id: NodeId) -> Option<Point> {
        let node = self.node(id)?;
        let base = match node.parent {
            Some(parent) => self.global_position(parent)?.to_vec2(),
            None => Vec2::ZERO,
        };
        Some(node.last_local_position + base)
    }

    pub fn set_local_position(&mut self, id: NodeId, position: Point) -> DomainResult<()> {
        self.require_mut(id)?.local_position = position;
        Ok(())
    }

    /// Attaches `child` under `parent` as its newest (highest order) child.
    ///
    /// A child that already has another parent is detached first, keeping its
    /// global position. The parent is expanded and re-laid-out together with
    /// all of its ancestors.
    #[instrument(level = "debug", skip(self))]
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> DomainResult<()> {
        self.require(parent)?;
        self.require(child)?;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(DomainError::CycleDetected { parent, child });
        }
        if self.parent_of(child) == Some(parent) {
            return Ok(());
        }
        if self.parent_of(child).is_some() {
            self.remove_parent(child)?;
        }

        let order = self
            .children_of(parent)
            .iter()
            .filter_map(|&sibling| self.node(sibling))
            .map(|sibling| sibling.order)
            .max()
            .unwrap_or(0)
            + 1;

        let node = self.require_mut(child)?;
        node.parent = Some(parent);
        node.order = order;

        let parent_node = self.require_mut(parent)?;
        parent_node.children.push(child);
        parent_node.is_expanded = true;

        self.rearrange_self_and_parent(parent);
        debug_assert!(self.verify_integrity().is_ok());
        Ok(())
    }

    /// Detaches `child` from its parent without moving it on the board.
    ///
    /// Returns the former parent, or `None` if `child` was already a root.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_parent(&mut self, child: NodeId) -> DomainResult<Option<NodeId>> {
        let Some(parent) = self.require(child)?.parent else {
            return Ok(None);
        };
        let global = self
            .global_position(child)
            .ok_or(DomainError::UnknownNode(child))?;

        let node = self.require_mut(child)?;
        node.parent = None;
        node.local_position = global;
        node.last_local_position = global;
        self.require_mut(parent)?.children.retain(|&c| c != child);

        self.rearrange_self_and_parent(parent);
        debug_assert!(self.verify_integrity().is_ok());
        Ok(Some(parent))
    }

    /// Detaches every child of `id`, each keeping its global position.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_all_children(&mut self, id: NodeId) -> DomainResult<Vec<NodeId>> {
        let children = self.require(id)?.children.clone();
        let globals: Vec<(NodeId, Point)> = children
            .iter()
            .filter_map(|&child| self.global_position(child).map(|p| (child, p)))
            .collect();

        for (child, global) in globals {
            let node = self.require_mut(child)?;
            node.parent = None;
            node.local_position = global;
            node.last_local_position = global;
        }
        self.require_mut(id)?.children.clear();

        self.rearrange_self_and_parent(id);
        debug_assert!(self.verify_integrity().is_ok());
        Ok(children)
    }

    /// Removes `id` from the arena after detaching its children and itself.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_node(&mut self, id: NodeId) -> DomainResult<Node> {
        self.require(id)?;
        self.remove_all_children(id)?;
        self.remove_parent(id)?;
        self.nodes.remove(id.0).ok_or(DomainError::UnknownNode(id))
    }

    pub(crate) fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        self.node_mut(id).map(|node| &mut node.children)
    }

    /// Checks mutual parent/children consistency and acyclicity.
    pub fn verify_integrity(&self) -> DomainResult<()> {
        for (id, node) in self.iter() {
            if let Some(parent) = node.parent {
                let parent_node = self.node(parent).ok_or_else(|| DomainError::Inconsistent {
                    node: id,
                    message: format!("parent {parent} is not on the board"),
                })?;
                if !parent_node.children.contains(&id) {
                    return Err(DomainError::Inconsistent {
                        node: id,
                        message: format!("missing from children of {parent}"),
                    });
                }
            }

            for (i, &child) in node.children.iter().enumerate() {
                if node.children[..i].contains(&child) {
                    return Err(DomainError::Inconsistent {
                        node: id,
                        message: format!("child {child} listed twice"),
                    });
                }
                if self.parent_of(child) != Some(id) {
                    return Err(DomainError::Inconsistent {
                        node: id,
                        message: format!("child {child} does not point back"),
                    });
                }
            }

            let mut steps = 0;
            let mut current = node.parent;
            while let Some(parent) = current {
                steps += 1;
                if steps > self.nodes.len() {
                    return Err(DomainError::Inconsistent {
                        node: id,
                        message: "parent chain does not terminate".to_string(),
                    });
                }
                current = self.parent_of(parent);
            }
        }
        Ok(())
    }
}

/// Pre-order iterator over a subtree.
pub struct SubtreeIter<'a> {
    board: &'a Board,
    stack: Vec<NodeId>,
}

impl<'a> SubtreeIter<'a> {
    fn new(board: &'a Board, root: NodeId) -> Self {
        let stack = if board.contains(root) {
            vec![root]
        } else {
            Vec::new()
        };
        Self { board, stack }
    }
}

impl<'a> Iterator for SubtreeIter<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.board.node(current) {
                // Push children in reverse order for first-to-last traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, node));
            }
        }
        None
    }
}
