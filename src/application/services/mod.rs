//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (NodeStore, Clock)
//! but are themselves concrete structs, not traits.

mod board;
mod library;
mod proximity;

pub use board::BoardService;
pub use library::{BoardLibrary, DEFAULT_BOARD_TITLE};
pub use proximity::{
    DragEnd, DragFeedback, DragSession, DragTuning, NodePair, ProximityController, Reparented,
};
