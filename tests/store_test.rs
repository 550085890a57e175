//! Tests for the directory-backed node store

use std::fs;
use std::io;

use tempfile::TempDir;
use uuid::Uuid;

use mindboard::domain::NodeRecord;
use mindboard::infrastructure::traits::{DirectoryStore, NodeStore};

fn record(title: &str, parent: Option<Uuid>, order: i64) -> NodeRecord {
    NodeRecord {
        id: Uuid::new_v4(),
        title: title.to_string(),
        parent,
        local_x: 157.5,
        local_y: -18.75,
        order,
        is_expanded: true,
        own_height: 30.0,
        image_ref: None,
    }
}

#[test]
fn given_saved_records_when_loading_board_then_all_read_back() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::new(dir.path());
    let board = Uuid::new_v4();
    let root = record("root", None, 0);
    let mut child = record("child", Some(root.id), 1);
    child.image_ref = Some("cat.png".into());

    // Act
    store.save_node(board, &root).unwrap();
    store.save_node(board, &child).unwrap();
    let mut loaded = store.load_board(board).unwrap();

    // Assert
    loaded.sort_by_key(|r| r.order);
    assert_eq!(loaded, vec![root, child]);
}

#[test]
fn given_saved_record_when_saved_again_then_overwritten() {
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::new(dir.path());
    let board = Uuid::new_v4();
    let mut node = record("draft", None, 0);
    store.save_node(board, &node).unwrap();

    node.title = "final".into();
    store.save_node(board, &node).unwrap();

    let loaded = store.load_board(board).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].title, "final");
}

#[test]
fn given_unknown_board_when_loading_then_empty() {
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::new(dir.path());

    assert!(store.load_board(Uuid::new_v4()).unwrap().is_empty());
}

#[test]
fn given_removed_record_when_removing_again_then_ok() {
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::new(dir.path());
    let board = Uuid::new_v4();
    let node = record("gone", None, 0);
    store.save_node(board, &node).unwrap();

    store.remove_node(board, node.id).unwrap();
    store.remove_node(board, node.id).unwrap();

    assert!(!store.node_path(board, node.id).exists());
}

#[test]
fn given_image_file_when_released_then_deleted_and_second_release_ok() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::new(dir.path());
    fs::create_dir_all(store.images_dir()).unwrap();
    let image = store.image_path("cat.png").unwrap();
    fs::write(&image, b"png").unwrap();

    // Act
    store.release_image("cat.png").unwrap();

    // Assert
    assert!(!image.exists());
    store.release_image("cat.png").unwrap();
}

#[test]
fn given_name_with_path_components_when_resolving_image_then_rejected() {
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::new(dir.path());

    for name in ["../escape.png", "a/b.png", "", ".."] {
        let err = store.image_path(name).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "{name:?}");
    }
}
