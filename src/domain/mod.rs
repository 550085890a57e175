//! Domain layer: the node tree, its layout and visibility rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod entities;
pub mod error;
pub mod layout;
pub mod tree_display;
pub mod visibility;

pub use arena::{Board, Node, NodeId};
pub use entities::{NodeRecord, TitleEdit};
pub use error::{DomainError, DomainResult};
pub use layout::LayoutMetrics;
pub use tree_display::TreeDisplay;
