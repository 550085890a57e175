//! I/O boundary traits for testability
//!
//! These traits abstract the collaborators the board engine talks to, allowing
//! services to be tested with in-memory implementations.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, trace};
use uuid::Uuid;

use crate::domain::NodeRecord;

/// Persistence collaborator for node records and their image resources.
pub trait NodeStore: Send + Sync {
    /// Create or overwrite the record of a node.
    fn save_node(&self, board: Uuid, record: &NodeRecord) -> io::Result<()>;

    /// Remove the record of a node. Removing an absent record is not an error.
    fn remove_node(&self, board: Uuid, node: Uuid) -> io::Result<()>;

    /// Release an external image resource by name.
    ///
    /// Idempotent: releasing an already-absent resource is not an error.
    fn release_image(&self, name: &str) -> io::Result<()>;
}

/// Time source for debounce deadlines.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Wall clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Stores one TOML file per node.
///
/// Layout below the root directory:
/// - `boards/<board-uuid>/<node-uuid>.toml`
/// - `images/<name>`
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn board_dir(&self, board: Uuid) -> PathBuf {
        self.root.join("boards").join(board.to_string())
    }

    pub fn node_path(&self, board: Uuid, node: Uuid) -> PathBuf {
        self.board_dir(board).join(format!("{node}.toml"))
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    /// Resolve an image name inside the images directory.
    ///
    /// Names are plain file names; anything with path components is rejected.
    pub fn image_path(&self, name: &str) -> io::Result<PathBuf> {
        let candidate = Path::new(name);
        if name.is_empty() || candidate.file_name() != Some(candidate.as_os_str()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid image name: {name:?}"),
            ));
        }
        Ok(self.images_dir().join(candidate))
    }

    /// Read back every record of a board, ordered by file name.
    pub fn load_board(&self, board: Uuid) -> io::Result<Vec<NodeRecord>> {
        let dir = self.board_dir(board);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        paths
            .iter()
            .map(|path| {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
            })
            .collect()
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            trace!("already absent: {}", path.display());
            Ok(())
        }
        other => other,
    }
}

impl NodeStore for DirectoryStore {
    fn save_node(&self, board: Uuid, record: &NodeRecord) -> io::Result<()> {
        let path = self.node_path(board, record.id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(&path, content)?;
        debug!("saved node record {}", path.display());
        Ok(())
    }

    fn remove_node(&self, board: Uuid, node: Uuid) -> io::Result<()> {
        remove_if_present(&self.node_path(board, node))
    }

    fn release_image(&self, name: &str) -> io::Result<()> {
        remove_if_present(&self.image_path(name)?)
    }
}

/// In-process store; keeps everything in memory and records released images.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<(Uuid, Uuid), NodeRecord>>,
    images: Mutex<BTreeSet<String>>,
    released: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image resource as present.
    pub fn add_image(&self, name: impl Into<String>) {
        lock(&self.images).insert(name.into());
    }

    pub fn has_image(&self, name: &str) -> bool {
        lock(&self.images).contains(name)
    }

    pub fn record(&self, board: Uuid, node: Uuid) -> Option<NodeRecord> {
        lock(&self.records).get(&(board, node)).cloned()
    }

    pub fn records(&self, board: Uuid) -> Vec<NodeRecord> {
        lock(&self.records)
            .iter()
            .filter(|((b, _), _)| *b == board)
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Every `release_image` call, in call order.
    pub fn released_images(&self) -> Vec<String> {
        lock(&self.released).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl NodeStore for MemoryStore {
    fn save_node(&self, board: Uuid, record: &NodeRecord) -> io::Result<()> {
        lock(&self.records).insert((board, record.id), record.clone());
        Ok(())
    }

    fn remove_node(&self, board: Uuid, node: Uuid) -> io::Result<()> {
        lock(&self.records).remove(&(board, node));
        Ok(())
    }

    fn release_image(&self, name: &str) -> io::Result<()> {
        lock(&self.images).remove(name);
        lock(&self.released).push(name.to_string());
        Ok(())
    }
}

/// Clock that only moves when told to; drives timers deterministically.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *lock(&self.now) += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *lock(&self.now)
    }
}
