//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{BoardLibrary, BoardService, ProximityController};
use crate::config::Settings;
use crate::domain::Board;
use crate::infrastructure::traits::{Clock, DirectoryStore, NodeStore, SystemClock};

/// Container holding the shared dependencies of all boards.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Node record and image storage
    pub store: Arc<dyn NodeStore>,

    /// Time source for proximity timers
    pub clock: Arc<dyn Clock>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        let store = Arc::new(DirectoryStore::new(settings.storage.data_dir.clone()));
        Self::with_deps(settings, store, Arc::new(SystemClock))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        store: Arc<dyn NodeStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            store,
            clock,
        }
    }

    /// A coordinator for a fresh, empty board.
    pub fn board_service(&self, title: &str) -> BoardService {
        let board = Board::new(title, self.settings.layout);
        BoardService::new(board, self.store.clone(), self.proximity())
    }

    pub fn library(&self) -> BoardLibrary {
        BoardLibrary::new(
            self.settings.layout,
            self.settings.drag,
            self.store.clone(),
            self.clock.clone(),
        )
    }

    fn proximity(&self) -> ProximityController {
        ProximityController::new(self.settings.drag, self.clock.clone())
    }
}
