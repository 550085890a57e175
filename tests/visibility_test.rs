//! Tests for expand/collapse visibility and collapsed summaries

use kurbo::Point;

use mindboard::domain::{Board, LayoutMetrics, Node, NodeId, TreeDisplay};

fn node(board: &mut Board, title: &str) -> NodeId {
    let node = Node::new(title, Point::ZERO, board.metrics());
    board.insert(node)
}

fn child(board: &mut Board, parent: NodeId, title: &str) -> NodeId {
    let id = node(board, title);
    board.add_child(parent, id).unwrap();
    id
}

struct Fixture {
    board: Board,
    root: NodeId,
    branch: NodeId,
    leaf: NodeId,
    grandchild: NodeId,
}

/// root -> branch -> leaf -> grandchild, plus a sibling of branch
fn fixture() -> Fixture {
    let mut board = Board::new("visibility", LayoutMetrics::default());
    let root = node(&mut board, "root");
    let branch = child(&mut board, root, "branch");
    child(&mut board, root, "sibling");
    let leaf = child(&mut board, branch, "leaf");
    let grandchild = child(&mut board, leaf, "grandchild");
    Fixture {
        board,
        root,
        branch,
        leaf,
        grandchild,
    }
}

#[test]
fn given_fully_expanded_tree_then_every_node_is_shown() {
    let f = fixture();

    assert_eq!(f.board.visible_nodes().len(), 5);
    assert!(f.board.should_show_children(f.root));
    assert!(f.board.should_show_self(f.grandchild));
}

#[test]
fn given_collapsed_branch_then_whole_subtree_hidden_even_if_expanded_below() {
    // Arrange
    let mut f = fixture();

    // Act
    f.board.toggle_expand(f.branch).unwrap();

    // Assert
    assert!(f.board.should_show_self(f.branch));
    assert!(!f.board.should_show_children(f.branch));
    assert!(f.board.node(f.leaf).unwrap().is_expanded);
    assert!(!f.board.should_show_self(f.leaf));
    assert!(!f.board.should_show_self(f.grandchild));
    assert_eq!(f.board.visible_nodes().len(), 3);
}

#[test]
fn given_any_state_then_show_children_implies_can_show_implies_has_children() {
    let mut f = fixture();
    f.board.toggle_expand(f.leaf).unwrap();
    f.board.toggle_expand(f.root).unwrap();

    for id in f.board.ids() {
        if f.board.should_show_children(id) {
            assert!(f.board.can_show_children(id));
        }
        if f.board.can_show_children(id) {
            assert!(!f.board.children_of(id).is_empty());
        }
    }
}

#[test]
fn given_childless_node_when_expanded_then_cannot_show_children() {
    let mut f = fixture();
    f.board.node_mut(f.grandchild).unwrap().is_expanded = true;

    assert!(!f.board.can_show_children(f.grandchild));
    assert!(!f.board.should_show_children(f.grandchild));
}

#[test]
fn given_children_with_orders_when_summarizing_then_ascending_by_order() {
    // Arrange
    let mut board = Board::new("summary", LayoutMetrics::default());
    let root = node(&mut board, "root");
    let first = child(&mut board, root, "first");
    child(&mut board, root, "second");
    child(&mut board, root, "third");

    // Act: give the oldest child the highest rank
    board.node_mut(first).unwrap().order = 10;
    board.refresh_summary(root);

    // Assert
    assert_eq!(board.node(root).unwrap().summary_text, "second third first");
}

#[test]
fn given_collapsed_node_when_rendering_tree_then_summary_shown_instead_of_children() {
    let mut f = fixture();
    f.board.toggle_expand(f.branch).unwrap();

    let rendered = f.board.to_tree().to_string();

    assert!(rendered.contains("branch [+]"), "{rendered}");
    assert!(rendered.contains("… leaf"), "{rendered}");
    assert!(!rendered.contains("grandchild"), "{rendered}");
}
