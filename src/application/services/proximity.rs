//! Drag and proximity-reparent controller
//!
//! Tracks one drag session at a time. Pointer moves are damped while a node is
//! attached, siblings swap order live, a hard sideways pull detaches the node,
//! and hovering over another node for the proximity delay re-parents onto it.
//! Timers are deadlines checked by [`ProximityController::poll`] against an
//! injected [`Clock`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{Board, DomainError, DomainResult, NodeId};
use crate::infrastructure::traits::Clock;

/// Drag feel and proximity timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragTuning {
    pub damping_k1: f64,
    pub damping_k2: f64,
    /// Raw horizontal pull that detaches an attached node
    pub detach_threshold: f64,
    /// Pull below which a freshly re-parented node is damped again
    pub settle_release: f64,
    pub proximity_delay_ms: u64,
}

impl Default for DragTuning {
    fn default() -> Self {
        Self {
            damping_k1: 4.0,
            damping_k2: 8.0,
            detach_threshold: 135.0,
            settle_release: 85.0,
            proximity_delay_ms: 2000,
        }
    }
}

impl DragTuning {
    pub fn proximity_delay(&self) -> Duration {
        Duration::from_millis(self.proximity_delay_ms)
    }

    /// Square-root damping, sign preserving: `sign(dx) * sqrt(k1 * k2 * |dx|)`.
    pub fn damp(&self, dx: f64) -> f64 {
        let magnitude = (self.damping_k1 * self.damping_k2 * dx.abs()).sqrt();
        if dx < 0.0 {
            -magnitude
        } else {
            magnitude
        }
    }
}

/// Unordered pair of nodes, used as the proximity timer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodePair(NodeId, NodeId);

impl NodePair {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.0 == id || self.1 == id
    }
}

#[derive(Debug, Clone)]
struct PendingReparent {
    pair: NodePair,
    candidate: NodeId,
    deadline: Instant,
}

/// State of the node currently being dragged.
#[derive(Debug, Clone)]
pub struct DragSession {
    node: NodeId,
    /// Pointer position at drag start, in board coordinates
    origin: Point,
    nearest: Option<NodeId>,
    pending: Option<PendingReparent>,
    settling: bool,
}

impl DragSession {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn is_settling(&self) -> bool {
        self.settling
    }

    pub fn nearest(&self) -> Option<NodeId> {
        self.nearest
    }

    pub fn pending_candidate(&self) -> Option<NodeId> {
        self.pending.as_ref().map(|p| p.candidate)
    }

    pub fn pending_pair(&self) -> Option<NodePair> {
        self.pending.as_ref().map(|p| p.pair)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }
}

/// What a single pointer move did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragFeedback {
    /// Local position assigned to the dragged node
    pub position: Option<Point>,
    pub reordered: bool,
    pub detached_from: Option<NodeId>,
    /// Candidate whose proximity timer was armed by this move
    pub armed: Option<NodeId>,
}

/// A proximity timer fired and moved the dragged node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reparented {
    pub node: NodeId,
    pub new_parent: NodeId,
    pub old_parent: Option<NodeId>,
}

/// Where the dragged node came to rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragEnd {
    pub node: NodeId,
    pub local_position: Point,
    /// Root nodes snap to the grid; children snap back to their slot
    pub snapped_to_grid: bool,
}

pub struct ProximityController {
    tuning: DragTuning,
    clock: Arc<dyn Clock>,
    session: Option<DragSession>,
}

impl ProximityController {
    pub fn new(tuning: DragTuning, clock: Arc<dyn Clock>) -> Self {
        Self {
            tuning,
            clock,
            session: None,
        }
    }

    pub fn tuning(&self) -> &DragTuning {
        &self.tuning
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Starts dragging `node`, discarding any previous session and its timer.
    #[instrument(level = "debug", skip(self, board))]
    pub fn drag_start(&mut self, board: &mut Board, node: NodeId) -> DomainResult<()> {
        if let Some(previous) = self.session.take() {
            debug!("drag_start: discarding session for {}", previous.node);
        }
        let origin = board
            .global_position(node)
            .ok_or(DomainError::UnknownNode(node))?;
        let state = board.require_mut(node)?;
        state.last_local_position = state.local_position;

        self.session = Some(DragSession {
            node,
            origin,
            nearest: None,
            pending: None,
            settling: false,
        });
        Ok(())
    }

    /// Applies a pointer move, `delta` being the offset since drag start.
    #[instrument(level = "trace", skip(self, board))]
    pub fn drag_update(&mut self, board: &mut Board, delta: Vec2) -> DomainResult<DragFeedback> {
        let tuning = self.tuning;
        let now = self.clock.now();
        let Some(session) = self.session.as_mut() else {
            return Ok(DragFeedback::default());
        };
        let id = session.node;
        if !board.contains(id) {
            self.session = None;
            return Err(DomainError::UnknownNode(id));
        }

        let pointer = session.origin + delta;
        let slot = board
            .last_global_position(id)
            .ok_or(DomainError::UnknownNode(id))?;
        let dif = pointer - slot;
        let attached = board.parent_of(id).is_some();
        let dx = if attached && !session.settling {
            tuning.damp(dif.x)
        } else {
            dif.x
        };
        let position = board.require(id)?.last_local_position + Vec2::new(dx, dif.y);
        board.set_local_position(id, position)?;

        let mut feedback = DragFeedback {
            position: Some(position),
            ..DragFeedback::default()
        };

        if let Some(parent) = board.parent_of(id) {
            feedback.reordered = reorder_siblings(board, id, parent, position)?;
            if !session.settling && dif.x.abs() > tuning.detach_threshold {
                debug!("drag_update: detaching {} from {}", id, parent);
                board.remove_parent(id)?;
                feedback.position = board.node(id).map(|node| node.local_position);
                feedback.detached_from = Some(parent);
            }
        }
        if session.settling && dif.x.abs() < tuning.settle_release {
            debug!("drag_update: {} settled", id);
            session.settling = false;
        }

        let nearest = nearest_candidate(board, id);
        if nearest != session.nearest {
            if let Some(pending) = session.pending.take() {
                debug!("drag_update: cancelled timer for {}", pending.candidate);
            }
            session.nearest = nearest;
            if let Some(candidate) = nearest {
                debug!("drag_update: armed timer {} -> {}", id, candidate);
                session.pending = Some(PendingReparent {
                    pair: NodePair::new(id, candidate),
                    candidate,
                    deadline: now + tuning.proximity_delay(),
                });
                feedback.armed = Some(candidate);
            }
        }

        Ok(feedback)
    }

    /// Fires the proximity timer if its deadline has passed.
    ///
    /// The candidate is re-validated first; a stale timer is dropped.
    #[instrument(level = "trace", skip(self, board))]
    pub fn poll(&mut self, board: &mut Board) -> DomainResult<Option<Reparented>> {
        let now = self.clock.now();
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };
        if !session.pending.as_ref().is_some_and(|p| now >= p.deadline) {
            return Ok(None);
        }
        let Some(pending) = session.pending.take() else {
            return Ok(None);
        };

        let id = session.node;
        let candidate = pending.candidate;
        if !is_valid_candidate(board, id, candidate) || !boxes_touch(board, id, candidate) {
            debug!("poll: dropping stale timer {} -> {}", id, candidate);
            return Ok(None);
        }

        let old_global = board
            .global_position(id)
            .ok_or(DomainError::UnknownNode(id))?;
        let old_parent = board.remove_parent(id)?;
        board.add_child(candidate, id)?;
        let parent_global = board
            .global_position(candidate)
            .ok_or(DomainError::UnknownNode(candidate))?;
        board.set_local_position(id, old_global - parent_global.to_vec2())?;

        session.settling = true;
        session.nearest = None;
        debug!("poll: re-parented {} onto {}", id, candidate);
        Ok(Some(Reparented {
            node: id,
            new_parent: candidate,
            old_parent,
        }))
    }

    /// Ends the drag: children return to their slot, roots snap to the grid.
    #[instrument(level = "debug", skip(self, board))]
    pub fn drag_end(&mut self, board: &mut Board) -> DomainResult<Option<DragEnd>> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };
        let id = session.node;
        if !board.contains(id) {
            return Ok(None);
        }

        let snapped_to_grid = match board.parent_of(id) {
            Some(parent) => {
                board.rearrange_children(parent);
                false
            }
            None => {
                let metrics = *board.metrics();
                let node = board.require_mut(id)?;
                let snapped = metrics.snap_to_grid(node.local_position);
                node.local_position = snapped;
                node.last_local_position = snapped;
                true
            }
        };

        Ok(Some(DragEnd {
            node: id,
            local_position: board.require(id)?.local_position,
            snapped_to_grid,
        }))
    }

    /// Drops any drag state that refers to `node`; returns whether anything was dropped.
    pub fn cancel_for(&mut self, node: NodeId) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.node == node {
            self.session = None;
            return true;
        }
        if session.pending.as_ref().is_some_and(|p| p.pair.contains(node)) {
            session.pending = None;
            session.nearest = None;
            return true;
        }
        false
    }
}

/// Swaps `order` with every sibling the dragged node has crossed vertically.
///
/// After each swap the parent is re-laid-out and the dragged node is put back
/// under the pointer.
fn reorder_siblings(
    board: &mut Board,
    id: NodeId,
    parent: NodeId,
    position: Point,
) -> DomainResult<bool> {
    let siblings: Vec<NodeId> = board
        .children_of(parent)
        .iter()
        .copied()
        .filter(|&sibling| sibling != id)
        .collect();

    let mut reordered = false;
    for sibling in siblings {
        let (Some(mine), Some(theirs)) = (board.global_position(id), board.global_position(sibling))
        else {
            continue;
        };
        let my_order = board.require(id)?.order;
        let their_order = board.require(sibling)?.order;
        let crossed = (mine.y > theirs.y && my_order < their_order)
            || (mine.y < theirs.y && my_order > their_order);
        if !crossed {
            continue;
        }

        board.require_mut(id)?.order = their_order;
        board.require_mut(sibling)?.order = my_order;
        board.rearrange_children(parent);
        board.set_local_position(id, position)?;
        reordered = true;
    }
    Ok(reordered)
}

/// Nearest visible node whose box intersects the dragged node's box.
///
/// Ancestors and descendants never qualify.
fn nearest_candidate(board: &Board, id: NodeId) -> Option<NodeId> {
    let center = board.global_position(id)?;
    let own = node_box(board, id)?;
    let mut excluded: HashSet<NodeId> = board.ancestors(id).into_iter().collect();
    excluded.extend(board.descendants(id));
    excluded.insert(id);

    board
        .visible_nodes()
        .into_iter()
        .filter(|other| !excluded.contains(other))
        .filter_map(|other| {
            let other_box = node_box(board, other)?;
            if !intersects(&own, &other_box) {
                return None;
            }
            let distance = center.distance(board.global_position(other)?);
            Some((other, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(other, _)| other)
}

fn is_valid_candidate(board: &Board, id: NodeId, candidate: NodeId) -> bool {
    board.contains(id)
        && board.contains(candidate)
        && id != candidate
        && !board.is_ancestor(candidate, id)
        && !board.is_ancestor(id, candidate)
        && board.should_show_self(candidate)
}

fn boxes_touch(board: &Board, a: NodeId, b: NodeId) -> bool {
    match (node_box(board, a), node_box(board, b)) {
        (Some(a), Some(b)) => intersects(&a, &b),
        _ => false,
    }
}

/// Board-space box: node width by own height, centered on the global position.
fn node_box(board: &Board, id: NodeId) -> Option<Rect> {
    let node = board.node(id)?;
    let center = board.global_position(id)?;
    let size = Size::new(board.metrics().node_width, node.own_height);
    Some(Rect::from_center_size(center, size))
}

/// Strict overlap; touching edges do not count.
fn intersects(a: &Rect, b: &Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}
