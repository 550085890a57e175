//! Board coordinator service
//!
//! Owns one board, its drag controller and the store handle. Every mutation a
//! user can trigger goes through here so that layout, timers and persistence
//! stay in step.

use std::collections::BTreeSet;
use std::sync::Arc;

use kurbo::{Point, Vec2};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::services::proximity::{
    DragEnd, DragFeedback, ProximityController, Reparented,
};
use crate::application::{ApplicationResult, IoResultExt};
use crate::domain::{Board, Node, NodeId, NodeRecord, TitleEdit};
use crate::infrastructure::traits::NodeStore;

pub struct BoardService {
    board: Board,
    store: Arc<dyn NodeStore>,
    proximity: ProximityController,
    /// Former parents of nodes detached during the current drag
    detached_parents: Vec<NodeId>,
}

impl BoardService {
    pub fn new(board: Board, store: Arc<dyn NodeStore>, proximity: ProximityController) -> Self {
        Self {
            board,
            store,
            proximity,
            detached_parents: Vec::new(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn id(&self) -> Uuid {
        self.board.id
    }

    pub fn title(&self) -> &str {
        &self.board.title
    }

    pub(crate) fn set_title_unchecked(&mut self, title: String) {
        self.board.title = title;
    }

    pub fn proximity(&self) -> &ProximityController {
        &self.proximity
    }

    /// Creates an untitled node, attached under `parent` when given.
    pub fn create(&mut self, parent: Option<NodeId>, position: Point) -> ApplicationResult<NodeId> {
        self.create_with_title("", parent, position)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn create_with_title(
        &mut self,
        title: &str,
        parent: Option<NodeId>,
        position: Point,
    ) -> ApplicationResult<NodeId> {
        if let Some(parent) = parent {
            self.board.require(parent)?;
        }
        let node = Node::new(title, position, self.board.metrics());
        let id = self.board.insert(node);
        match parent {
            Some(parent) => {
                self.board.add_child(parent, id)?;
                self.persist_relaid(parent)?;
            }
            None => self.persist(id)?,
        }
        debug!("create: {} under {:?}", id, parent);
        Ok(id)
    }

    /// Deletes `node`; its children become roots where they stand.
    ///
    /// Returns `false` when the node is not on this board. Store failures are
    /// logged, not propagated: the node is gone from the board either way.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&mut self, node: NodeId) -> bool {
        if !self.board.contains(node) {
            debug!("delete: {} is not on board {}", node, self.board.id);
            return false;
        }
        if self.proximity.cancel_for(node) {
            debug!("delete: cancelled drag state for {}", node);
        }

        let children = self.board.children_of(node).to_vec();
        let former_parent = self.board.parent_of(node);
        let removed = match self.board.remove_node(node) {
            Ok(removed) => removed,
            Err(e) => {
                warn!("delete: {}", e);
                return false;
            }
        };

        if let Some(image) = &removed.image_ref {
            if let Err(e) = self.store.release_image(image) {
                warn!("delete: failed to release image {}: {}", image, e);
            }
        }
        if let Err(e) = self.store.remove_node(self.board.id, removed.uuid) {
            warn!("delete: failed to remove record {}: {}", removed.uuid, e);
        }
        for id in children {
            if let Err(e) = self.persist(id) {
                warn!("delete: {}", e);
            }
        }
        if let Some(parent) = former_parent {
            if let Err(e) = self.persist_relaid(parent) {
                warn!("delete: {}", e);
            }
        }
        true
    }

    /// Deletes every node; returns how many were removed.
    #[instrument(level = "debug", skip(self))]
    pub fn clear(&mut self) -> usize {
        let removed = self
            .board
            .ids()
            .into_iter()
            .filter(|&id| self.delete(id))
            .count();
        info!("clear: removed {} nodes from {}", removed, self.board.title);
        removed
    }

    pub fn set_title(&mut self, node: NodeId, title: &str) -> ApplicationResult<()> {
        self.board.require_mut(node)?.title = title.to_string();
        match self.board.parent_of(node) {
            Some(parent) => {
                self.board.refresh_summary(parent);
                self.persist_relaid(parent)
            }
            None => self.persist(node),
        }
    }

    /// Stores a measured height; returns whether the layout changed.
    pub fn set_height(&mut self, node: NodeId, height: f64) -> ApplicationResult<bool> {
        let changed = self.board.set_height(node, height)?;
        if changed {
            self.persist(node)?;
            if let Some(parent) = self.board.parent_of(node) {
                self.persist_relaid(parent)?;
            }
        }
        Ok(changed)
    }

    pub fn toggle_expand(&mut self, node: NodeId) -> ApplicationResult<bool> {
        let expanded = self.board.toggle_expand(node)?;
        self.persist_relaid(node)?;
        Ok(expanded)
    }

    /// Replaces the node's image, releasing the one it had.
    #[instrument(level = "debug", skip(self))]
    pub fn set_image(&mut self, node: NodeId, image: Option<String>) -> ApplicationResult<()> {
        let state = self.board.require_mut(node)?;
        if state.image_ref == image {
            return Ok(());
        }
        let previous = std::mem::replace(&mut state.image_ref, image);
        if let Some(previous) = previous {
            self.store
                .release_image(&previous)
                .with_context("release image", &previous)?;
        }
        self.persist(node)
    }

    /// Commits an edited title.
    ///
    /// A blank title deletes the node. Otherwise a follow-up node is created:
    /// a sibling when a just-created node is its parent's newest child, a
    /// child of the edited node in every other case.
    #[instrument(level = "debug", skip(self))]
    pub fn finish_title_edit(
        &mut self,
        node: NodeId,
        text: &str,
        just_created: bool,
    ) -> ApplicationResult<TitleEdit> {
        self.board.require(node)?;
        if text.trim().is_empty() {
            self.delete(node);
            return Ok(TitleEdit::Deleted);
        }
        self.set_title(node, text)?;

        match self.board.parent_of(node) {
            Some(parent) if just_created && self.is_newest_child(node, parent) => {
                let sibling = self.create(Some(parent), Point::ZERO)?;
                Ok(TitleEdit::CreatedSibling(sibling))
            }
            _ => {
                let child = self.create(Some(node), Point::ZERO)?;
                Ok(TitleEdit::CreatedChild(child))
            }
        }
    }

    pub fn drag_start(&mut self, node: NodeId) -> ApplicationResult<()> {
        self.detached_parents.clear();
        Ok(self.proximity.drag_start(&mut self.board, node)?)
    }

    /// Applies a pointer move. Nothing is persisted until the drag ends.
    pub fn drag_update(&mut self, delta: Vec2) -> ApplicationResult<DragFeedback> {
        let feedback = self.proximity.drag_update(&mut self.board, delta)?;
        if let Some(parent) = feedback.detached_from {
            self.detached_parents.push(parent);
        }
        Ok(feedback)
    }

    /// Fires a due proximity timer, persisting the re-parented node.
    pub fn poll(&mut self) -> ApplicationResult<Option<Reparented>> {
        let reparented = self.proximity.poll(&mut self.board)?;
        if let Some(event) = reparented {
            info!("poll: {} moved under {}", event.node, event.new_parent);
            if let Some(old_parent) = event.old_parent {
                self.persist_relaid(old_parent)?;
            }
            self.persist_relaid(event.new_parent)?;
        }
        Ok(reparented)
    }

    pub fn drag_end(&mut self) -> ApplicationResult<Option<DragEnd>> {
        let end = self.proximity.drag_end(&mut self.board)?;
        let detached = std::mem::take(&mut self.detached_parents);
        if let Some(end) = end {
            self.persist_relaid(end.node)?;
            for parent in detached {
                self.persist_relaid(parent)?;
            }
        }
        Ok(end)
    }

    fn is_newest_child(&self, node: NodeId, parent: NodeId) -> bool {
        let Some(order) = self.board.node(node).map(|n| n.order) else {
            return false;
        };
        self.board
            .children_of(parent)
            .iter()
            .filter_map(|&sibling| self.board.node(sibling))
            .all(|sibling| sibling.order <= order)
    }

    /// Persists everything a re-layout starting at `from` may have touched:
    /// `from`, its ancestors, and the children of each.
    fn persist_relaid(&self, from: NodeId) -> ApplicationResult<()> {
        let mut touched = BTreeSet::new();
        for id in std::iter::once(from).chain(self.board.ancestors(from)) {
            touched.insert(id);
            touched.extend(self.board.children_of(id).iter().copied());
        }
        for id in touched {
            self.persist(id)?;
        }
        Ok(())
    }

    fn persist(&self, node: NodeId) -> ApplicationResult<()> {
        let Some(record) = NodeRecord::from_board(&self.board, node) else {
            return Ok(());
        };
        self.store
            .save_node(self.board.id, &record)
            .with_context("save node", record.id)
    }
}
