//! Board library service
//!
//! Keeps the set of boards and their titles. Titles are normalized and kept
//! unique so they can double as display keys.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::application::services::board::BoardService;
use crate::application::services::proximity::{DragTuning, ProximityController};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{Board, LayoutMetrics};
use crate::infrastructure::traits::{Clock, NodeStore};

pub const DEFAULT_BOARD_TITLE: &str = "new board";

pub struct BoardLibrary {
    metrics: LayoutMetrics,
    tuning: DragTuning,
    store: Arc<dyn NodeStore>,
    clock: Arc<dyn Clock>,
    boards: Vec<BoardService>,
}

impl BoardLibrary {
    pub fn new(
        metrics: LayoutMetrics,
        tuning: DragTuning,
        store: Arc<dyn NodeStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            metrics,
            tuning,
            store,
            clock,
            boards: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    /// Adds an empty board; a blank title falls back to [`DEFAULT_BOARD_TITLE`].
    #[instrument(level = "debug", skip(self))]
    pub fn create_board(&mut self, title: &str) -> Uuid {
        let title = self.unique_title(None, title);
        let board = Board::new(title, self.metrics);
        let proximity = ProximityController::new(self.tuning, self.clock.clone());
        let service = BoardService::new(board, self.store.clone(), proximity);
        let id = service.id();
        info!("create_board: {} '{}'", id, service.title());
        self.boards.push(service);
        id
    }

    /// Renames a board; returns the title actually stored.
    ///
    /// The title is lower-cased and trimmed. If another board already uses it,
    /// the first free `title(n)` is taken instead.
    #[instrument(level = "debug", skip(self))]
    pub fn rename_board(&mut self, id: Uuid, title: &str) -> ApplicationResult<String> {
        let title = self.unique_title(Some(id), title);
        let board = self
            .board_mut(id)
            .ok_or(ApplicationError::UnknownBoard(id))?;
        board.set_title_unchecked(title.clone());
        debug!("rename_board: {} -> '{}'", id, title);
        Ok(title)
    }

    /// Clears and removes a board; returns `false` if it is unknown.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_board(&mut self, id: Uuid) -> bool {
        let Some(index) = self.boards.iter().position(|b| b.id() == id) else {
            return false;
        };
        let mut board = self.boards.remove(index);
        board.clear();
        info!("delete_board: {} '{}'", id, board.title());
        true
    }

    /// Removes every board; returns how many there were.
    pub fn delete_all(&mut self) -> usize {
        let ids: Vec<Uuid> = self.boards.iter().map(|b| b.id()).collect();
        ids.into_iter().filter(|&id| self.delete_board(id)).count()
    }

    pub fn board(&self, id: Uuid) -> Option<&BoardService> {
        self.boards.iter().find(|b| b.id() == id)
    }

    pub fn board_mut(&mut self, id: Uuid) -> Option<&mut BoardService> {
        self.boards.iter_mut().find(|b| b.id() == id)
    }

    pub fn boards_sorted(&self) -> Vec<&BoardService> {
        let mut boards: Vec<&BoardService> = self.boards.iter().collect();
        boards.sort_by(|a, b| a.title().cmp(b.title()));
        boards
    }

    fn unique_title(&self, except: Option<Uuid>, title: &str) -> String {
        let base = normalize_title(title);
        let taken = |candidate: &str| {
            self.boards
                .iter()
                .any(|b| Some(b.id()) != except && b.title() == candidate)
        };
        if !taken(&base) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}({n})");
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn normalize_title(title: &str) -> String {
    let title = title.trim().to_lowercase();
    if title.is_empty() {
        DEFAULT_BOARD_TITLE.to_string()
    } else {
        title
    }
}
