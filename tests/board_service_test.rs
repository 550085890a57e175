//! Tests for BoardService: the coordinator behind every user-visible mutation

use std::io;
use std::sync::Arc;
use std::time::Duration;

use kurbo::{Point, Vec2};
use uuid::Uuid;

use mindboard::application::services::{BoardService, DragTuning, ProximityController};
use mindboard::application::ApplicationError;
use mindboard::domain::{Board, LayoutMetrics, NodeId, NodeRecord, TitleEdit};
use mindboard::infrastructure::traits::{ManualClock, MemoryStore, NodeStore};
use mindboard::util::testing;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

fn service() -> (BoardService, Arc<MemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new());
    let board = Board::new("service", LayoutMetrics::default());
    let proximity = ProximityController::new(DragTuning::default(), clock.clone());
    (
        BoardService::new(board, store.clone(), proximity),
        store,
        clock,
    )
}

/// Store whose every write fails.
struct FailingStore;

impl NodeStore for FailingStore {
    fn save_node(&self, _board: Uuid, _record: &NodeRecord) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }

    fn remove_node(&self, _board: Uuid, _node: Uuid) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }

    fn release_image(&self, _name: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }
}

#[test]
fn given_node_with_two_children_when_deleted_then_children_become_roots_in_place() {
    // Arrange
    let (mut service, store, _clock) = service();
    let parent = service.create(None, Point::new(500.0, 500.0)).unwrap();
    let c1 = service.create(Some(parent), Point::ZERO).unwrap();
    let c2 = service.create(Some(parent), Point::ZERO).unwrap();
    let g1 = service.board().global_position(c1).unwrap();
    let g2 = service.board().global_position(c2).unwrap();
    let parent_uuid = service.board().node(parent).unwrap().uuid;

    // Act
    let deleted = service.delete(parent);

    // Assert
    assert!(deleted);
    let board = service.board();
    assert_eq!(board.parent_of(c1), None);
    assert_eq!(board.parent_of(c2), None);
    assert_eq!(board.global_position(c1).unwrap(), g1);
    assert_eq!(board.global_position(c2).unwrap(), g2);
    assert_eq!(board.len(), 2);
    assert!(store.record(service.id(), parent_uuid).is_none());
    let c1_record = store
        .record(service.id(), board.node(c1).unwrap().uuid)
        .unwrap();
    assert_eq!(c1_record.parent, None);
    assert_eq!((c1_record.local_x, c1_record.local_y), (g1.x, g1.y));
}

#[test]
fn given_deleted_node_when_deleting_again_then_false() {
    let (mut service, _store, _clock) = service();
    let node = service.create(None, Point::ZERO).unwrap();

    assert!(service.delete(node));
    assert!(!service.delete(node));
}

#[test]
fn given_child_when_deleted_then_parent_relaid_out() {
    let (mut service, _store, _clock) = service();
    let parent = service.create(None, Point::ZERO).unwrap();
    let c1 = service.create(Some(parent), Point::ZERO).unwrap();
    let c2 = service.create(Some(parent), Point::ZERO).unwrap();
    assert_eq!(
        service.board().node(parent).unwrap().subtree_content_height,
        67.5
    );

    service.delete(c1);

    let board = service.board();
    assert_eq!(board.node(parent).unwrap().subtree_content_height, 30.0);
    assert_eq!(board.node(c2).unwrap().local_position, Point::new(157.5, 0.0));
}

#[test]
fn given_unknown_parent_when_creating_then_error_and_nothing_inserted() {
    let (mut service, _store, _clock) = service();
    let gone = service.create(None, Point::ZERO).unwrap();
    service.delete(gone);

    let result = service.create(Some(gone), Point::ZERO);

    assert!(matches!(result, Err(ApplicationError::Domain(_))));
    assert!(service.board().is_empty());
}

#[test]
fn given_node_with_image_when_replaced_and_deleted_then_each_image_released_once() {
    // Arrange
    let (mut service, store, _clock) = service();
    let node = service.create(None, Point::ZERO).unwrap();
    store.add_image("first.png");
    store.add_image("second.png");
    service.set_image(node, Some("first.png".into())).unwrap();

    // Act
    service.set_image(node, Some("second.png".into())).unwrap();
    service.set_image(node, Some("second.png".into())).unwrap();
    service.delete(node);

    // Assert
    assert_eq!(store.released_images(), vec!["first.png", "second.png"]);
    assert!(!store.has_image("first.png"));
    assert!(!store.has_image("second.png"));
}

#[test]
fn given_failing_store_when_creating_then_error_but_delete_still_succeeds() {
    // Arrange
    let clock = Arc::new(ManualClock::new());
    let board = Board::new("failing", LayoutMetrics::default());
    let proximity = ProximityController::new(DragTuning::default(), clock);
    let mut service = BoardService::new(board, Arc::new(FailingStore), proximity);

    // Act
    let created = service.create(None, Point::ZERO);

    // Assert
    assert!(matches!(
        created,
        Err(ApplicationError::OperationFailed { .. })
    ));
    let node = service.board().ids()[0];
    assert!(service.delete(node));
    assert!(service.board().is_empty());
}

#[test]
fn given_blank_title_when_edit_finished_then_node_deleted() {
    let (mut service, _store, _clock) = service();
    let node = service.create(None, Point::ZERO).unwrap();

    let outcome = service.finish_title_edit(node, "   ", true).unwrap();

    assert_eq!(outcome, TitleEdit::Deleted);
    assert!(!service.board().contains(node));
}

#[test]
fn given_just_created_newest_child_when_titled_then_sibling_follows() {
    // Arrange
    let (mut service, _store, _clock) = service();
    let root = service.create_with_title("root", None, Point::ZERO).unwrap();
    let fresh = service.create(Some(root), Point::ZERO).unwrap();

    // Act
    let outcome = service.finish_title_edit(fresh, "idea", true).unwrap();

    // Assert
    let TitleEdit::CreatedSibling(sibling) = outcome else {
        panic!("expected a sibling, got {outcome:?}");
    };
    let board = service.board();
    assert_eq!(board.parent_of(sibling), Some(root));
    assert_eq!(board.node(fresh).unwrap().title, "idea");
    assert_eq!(board.node(root).unwrap().summary_text, "idea");
}

#[test]
fn given_existing_node_when_titled_then_child_follows() {
    let (mut service, _store, _clock) = service();
    let root = service.create(None, Point::ZERO).unwrap();
    let older = service.create(Some(root), Point::ZERO).unwrap();
    service.create(Some(root), Point::ZERO).unwrap();

    let as_root = service.finish_title_edit(root, "root", false).unwrap();
    let as_older = service.finish_title_edit(older, "older", true).unwrap();

    let TitleEdit::CreatedChild(root_child) = as_root else {
        panic!("expected a child, got {as_root:?}");
    };
    let TitleEdit::CreatedChild(older_child) = as_older else {
        panic!("expected a child, got {as_older:?}");
    };
    assert_eq!(service.board().parent_of(root_child), Some(root));
    assert_eq!(service.board().parent_of(older_child), Some(older));
}

#[test]
fn given_collapsed_node_when_toggled_then_persisted_state_matches() {
    let (mut service, store, _clock) = service();
    let root = service.create(None, Point::ZERO).unwrap();
    service.create(Some(root), Point::ZERO).unwrap();

    let expanded = service.toggle_expand(root).unwrap();

    let uuid = service.board().node(root).unwrap().uuid;
    assert!(!expanded);
    assert!(!store.record(service.id(), uuid).unwrap().is_expanded);
}

#[test]
fn given_hover_over_node_when_polled_after_delay_then_reparent_persisted() {
    // Arrange
    let (mut service, store, clock) = service();
    let x = service.create(None, Point::new(1000.0, 1000.0)).unwrap();
    let y = service.create(None, Point::new(1000.0, 1100.0)).unwrap();
    service.drag_start(x).unwrap();
    service.drag_update(Vec2::new(0.0, 90.0)).unwrap();

    // Act
    clock.advance(Duration::from_secs(2));
    let event = service.poll().unwrap().unwrap();
    service.drag_end().unwrap();

    // Assert
    assert_eq!(event.new_parent, y);
    let board = service.board();
    let record = store.record(service.id(), board.node(x).unwrap().uuid).unwrap();
    assert_eq!(record.parent, Some(board.node(y).unwrap().uuid));
    // released as a child: back in its slot
    assert_eq!(board.node(x).unwrap().local_position, Point::new(157.5, 0.0));
}

#[test]
fn given_dragged_node_when_deleted_then_drag_session_dropped() {
    let (mut service, _store, _clock) = service();
    let node = service.create(None, Point::ZERO).unwrap();
    service.drag_start(node).unwrap();

    service.delete(node);

    assert!(!service.proximity().is_dragging());
    assert_eq!(service.drag_end().unwrap(), None);
}

#[test]
fn given_populated_board_when_cleared_then_empty_and_records_gone() {
    let (mut service, store, _clock) = service();
    let root = service.create(None, Point::ZERO).unwrap();
    let a = service.create(Some(root), Point::ZERO).unwrap();
    service.create(Some(a), Point::ZERO).unwrap();

    let removed = service.clear();

    assert_eq!(removed, 3);
    assert!(service.board().is_empty());
    assert!(store.records(service.id()).is_empty());
}

/// Stored (order, local_y) of `node`.
fn stored_slot(service: &BoardService, store: &MemoryStore, node: NodeId) -> (i64, f64) {
    let uuid = service.board().node(node).unwrap().uuid;
    let record = store.record(service.id(), uuid).unwrap();
    (record.order, record.local_y)
}

#[test]
fn given_drag_past_sibling_when_released_then_both_siblings_stored_in_new_order() {
    // Arrange
    let (mut service, store, _clock) = service();
    let parent = service.create(None, Point::new(1000.0, 1000.0)).unwrap();
    let a = service.create(Some(parent), Point::ZERO).unwrap();
    let b = service.create(Some(parent), Point::ZERO).unwrap();
    service.drag_start(a).unwrap();

    // Act
    let feedback = service.drag_update(Vec2::new(0.0, 50.0)).unwrap();
    service.drag_end().unwrap();

    // Assert
    assert!(feedback.reordered);
    assert_eq!(stored_slot(&service, &store, a), (2, 18.75));
    assert_eq!(stored_slot(&service, &store, b), (1, -18.75));
}

#[test]
fn given_child_pulled_off_when_released_then_remaining_sibling_stored_in_its_new_slot() {
    // Arrange
    let (mut service, store, _clock) = service();
    let parent = service.create(None, Point::new(1000.0, 1000.0)).unwrap();
    let a = service.create(Some(parent), Point::ZERO).unwrap();
    let b = service.create(Some(parent), Point::ZERO).unwrap();
    service.drag_start(a).unwrap();

    // Act
    let feedback = service.drag_update(Vec2::new(200.0, 0.0)).unwrap();
    service.drag_end().unwrap();

    // Assert
    assert_eq!(feedback.detached_from, Some(parent));
    assert_eq!(stored_slot(&service, &store, b), (2, 0.0));
    let a_uuid = service.board().node(a).unwrap().uuid;
    assert_eq!(store.record(service.id(), a_uuid).unwrap().parent, None);
}

#[test]
fn given_existing_child_when_sibling_created_then_moved_child_stored() {
    let (mut service, store, _clock) = service();
    let parent = service.create(None, Point::ZERO).unwrap();
    let first = service.create(Some(parent), Point::ZERO).unwrap();
    assert_eq!(stored_slot(&service, &store, first), (1, 0.0));

    service.create(Some(parent), Point::ZERO).unwrap();

    assert_eq!(stored_slot(&service, &store, first), (1, -18.75));
}
