//! Domain entities: persisted shapes of board data

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::arena::{Board, NodeId};

/// Persisted form of a node.
///
/// Layout caches (content heights, summaries) are not stored; positions are
/// stored as last laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Uuid>,
    pub local_x: f64,
    pub local_y: f64,
    pub order: i64,
    pub is_expanded: bool,
    pub own_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl NodeRecord {
    /// Snapshot of `id` as currently laid out on `board`.
    pub fn from_board(board: &Board, id: NodeId) -> Option<Self> {
        let node = board.node(id)?;
        let parent = node
            .parent()
            .and_then(|parent| board.node(parent))
            .map(|parent| parent.uuid);
        Some(Self {
            id: node.uuid,
            title: node.title.clone(),
            parent,
            local_x: node.local_position.x,
            local_y: node.local_position.y,
            order: node.order,
            is_expanded: node.is_expanded,
            own_height: node.own_height,
            image_ref: node.image_ref.clone(),
        })
    }
}

/// Result of committing an edited title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleEdit {
    /// The title was blank and the node was deleted
    Deleted,
    /// A follow-up sibling was created under the same parent
    CreatedSibling(NodeId),
    /// A follow-up child was created under the edited node
    CreatedChild(NodeId),
}
