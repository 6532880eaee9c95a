use crate::error::{Error, Result};
use crate::models::paper::Paper;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

/// Shared handle to one paper. All read-modify-write cycles on a paper go
/// through its cell lock, so concurrent operations on the same paper
/// serialize while different papers proceed in parallel.
pub type PaperCell = Arc<AsyncMutex<Paper>>;

/// In-memory registry of papers plus the global set of issued passcodes.
#[derive(Default)]
pub struct PaperStore {
    cells: RwLock<HashMap<Uuid, PaperCell>>,
    issued_passcodes: Mutex<HashSet<String>>,
}

impl PaperStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the registry from persisted records, re-seeding the passcode
    /// set so codes issued before a restart stay reserved.
    pub fn load_from(&self, papers: Vec<Paper>) {
        let mut cells = self.cells.write().expect("paper store lock poisoned");
        let mut codes = self
            .issued_passcodes
            .lock()
            .expect("passcode set lock poisoned");
        cells.clear();
        codes.clear();
        for paper in papers {
            if let Some(code) = &paper.passcode {
                codes.insert(code.clone());
            }
            cells.insert(paper.paper_id, Arc::new(AsyncMutex::new(paper)));
        }
    }

    pub fn insert(&self, paper: Paper) -> PaperCell {
        let id = paper.paper_id;
        let cell = Arc::new(AsyncMutex::new(paper));
        let mut cells = self.cells.write().expect("paper store lock poisoned");
        cells.insert(id, Arc::clone(&cell));
        cell
    }

    pub fn get(&self, paper_id: Uuid) -> Result<PaperCell> {
        let cells = self.cells.read().expect("paper store lock poisoned");
        cells
            .get(&paper_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("paper {paper_id} does not exist")))
    }

    pub fn remove(&self, paper_id: Uuid) -> Result<()> {
        let mut cells = self.cells.write().expect("paper store lock poisoned");
        cells
            .remove(&paper_id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("paper {paper_id} does not exist")))
    }

    fn all_cells(&self) -> Vec<PaperCell> {
        let cells = self.cells.read().expect("paper store lock poisoned");
        cells.values().cloned().collect()
    }

    /// Clone of every paper, for history scans and persistence snapshots.
    pub async fn snapshot(&self) -> Vec<Paper> {
        let cells = self.all_cells();
        let mut papers = Vec::with_capacity(cells.len());
        for cell in cells {
            papers.push(cell.lock().await.clone());
        }
        papers
    }

    /// Reserve a passcode globally. Returns false if it was already issued,
    /// in which case the caller generates a fresh one and retries.
    pub fn register_passcode(&self, code: &str) -> bool {
        let mut codes = self
            .issued_passcodes
            .lock()
            .expect("passcode set lock poisoned");
        codes.insert(code.to_string())
    }
}
