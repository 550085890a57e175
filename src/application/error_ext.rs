//! Error conversion helpers for store operations
//!
//! Provides an extension trait for attaching context to I/O failures.

use std::fmt::Display;
use std::io;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add action and subject context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// store.save_node(board, &record)
    ///     .with_context("save node", record.id)?;
    /// ```
    fn with_context(self, action: &str, subject: impl Display) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_context(self, action: &str, subject: impl Display) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{action}: {subject}"),
            source: Box::new(e),
        })
    }
}
