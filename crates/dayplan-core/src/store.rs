use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::storage::{Storage, StorageError};
use crate::task::{Task, TaskPatch};

/// Storage key holding the whole serialized collection. Kept verbatim so
/// collections exported by older builds land in place.
pub const TASKS_KEY: &str = "@tasks";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to encode task collection: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("task index {index} out of bounds (collection has {len})")]
    OutOfBounds { index: usize, len: usize },

    #[error("no task with id {0}")]
    UnknownId(Uuid),
}

/// Owns the canonical task collection under [`TASKS_KEY`].
///
/// Every mutator is a full read-modify-write of the collection, and the
/// index-addressed operations refer to positions in the date-sorted order
/// that [`TaskStore::load_all`] returns. Interleaving reads and index
/// mutations from different snapshots can therefore target the wrong task;
/// the id-addressed variants exist for callers that want to be immune to
/// that.
#[derive(Debug)]
pub struct TaskStore<S: Storage> {
    storage: S,
}

impl<S: Storage> TaskStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Raw stored collection, before sorting. A missing entry and a
    /// malformed one both load as empty: there is no recovery path for a
    /// corrupt value, so the read path fails soft instead of wedging every
    /// screen.
    fn load_raw(&self) -> Result<Vec<Task>, StoreError> {
        let Some(raw) = self.storage.get(TASKS_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(tasks) => Ok(tasks),
            Err(err) => {
                warn!(error = %err, "stored task collection is malformed; treating as empty");
                Ok(Vec::new())
            }
        }
    }

    fn load_sorted(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks = self.load_raw()?;
        // Stable, so tasks sharing a date keep their stored relative order.
        tasks.sort_by_key(|task| task.date);
        Ok(tasks)
    }

    fn persist(&mut self, tasks: &[Task]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(tasks)?;
        self.storage.set(TASKS_KEY, &raw)?;
        Ok(())
    }

    #[instrument(skip(self, task), fields(id = ?task.id, date = %task.date))]
    pub fn add(&mut self, task: Task) -> Result<(), StoreError> {
        let mut tasks = self.load_raw()?;
        tasks.push(task);
        self.persist(&tasks)?;
        debug!(count = tasks.len(), "task added");
        Ok(())
    }

    /// The full collection, sorted ascending by date (stable for ties).
    #[instrument(skip(self))]
    pub fn load_all(&self) -> Result<Vec<Task>, StoreError> {
        let tasks = self.load_sorted()?;
        debug!(count = tasks.len(), "loaded task collection");
        Ok(tasks)
    }

    #[instrument(skip(self, patch))]
    pub fn update_at(&mut self, index: usize, patch: &TaskPatch) -> Result<(), StoreError> {
        let mut tasks = self.load_sorted()?;
        let len = tasks.len();
        let task = tasks
            .get_mut(index)
            .ok_or(StoreError::OutOfBounds { index, len })?;
        patch.apply(task);
        self.persist(&tasks)
    }

    /// Removes and returns the task at `index`.
    #[instrument(skip(self))]
    pub fn remove_at(&mut self, index: usize) -> Result<Task, StoreError> {
        let mut tasks = self.load_sorted()?;
        let len = tasks.len();
        if index >= len {
            return Err(StoreError::OutOfBounds { index, len });
        }
        let removed = tasks.remove(index);
        self.persist(&tasks)?;
        debug!(title = %removed.title, "task removed");
        Ok(removed)
    }

    /// Flips the completion flag at `index`; returns the new value.
    #[instrument(skip(self))]
    pub fn toggle_completed_at(&mut self, index: usize) -> Result<bool, StoreError> {
        let mut tasks = self.load_sorted()?;
        let len = tasks.len();
        let task = tasks
            .get_mut(index)
            .ok_or(StoreError::OutOfBounds { index, len })?;
        task.completed = !task.completed;
        let completed = task.completed;
        self.persist(&tasks)?;
        Ok(completed)
    }

    #[instrument(skip(self, patch))]
    pub fn update_by_id(&mut self, id: Uuid, patch: &TaskPatch) -> Result<(), StoreError> {
        let tasks = self.load_sorted()?;
        let index = position_of(&tasks, id)?;
        self.update_at(index, patch)
    }

    #[instrument(skip(self))]
    pub fn remove_by_id(&mut self, id: Uuid) -> Result<Task, StoreError> {
        let tasks = self.load_sorted()?;
        let index = position_of(&tasks, id)?;
        self.remove_at(index)
    }

    #[instrument(skip(self))]
    pub fn toggle_completed_by_id(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let tasks = self.load_sorted()?;
        let index = position_of(&tasks, id)?;
        self.toggle_completed_at(index)
    }

    /// Drops the whole collection; a following [`TaskStore::load_all`]
    /// returns an empty sequence.
    #[instrument(skip(self))]
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.storage.remove(TASKS_KEY)?;
        Ok(())
    }
}

fn position_of(tasks: &[Task], id: Uuid) -> Result<usize, StoreError> {
    tasks
        .iter()
        .position(|task| task.id == Some(id))
        .ok_or(StoreError::UnknownId(id))
}
