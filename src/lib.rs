//! mindboard: a mind-map board engine.
//!
//! Nodes form rooted trees kept in a generational arena. Children are stacked
//! in a column to the right of their parent; collapsed subtrees shrink to a
//! summary box. Dragging a node damps its sideways motion, reorders siblings
//! live, detaches it on a hard pull and re-parents it onto a node it hovers
//! over long enough.
//!
//! Layers, innermost first:
//! - [`domain`]: board arena, layout, visibility
//! - [`application`]: drag controller, board coordinator, board library
//! - [`infrastructure`]: stores, clocks, dependency wiring
//! - [`cli`]: the `mindboard` binary

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
