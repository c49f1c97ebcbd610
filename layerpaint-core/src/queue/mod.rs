//! Command Queue
//!
//! The queue manages all the edits performed on one document, keeping track of commands, undo/redo
//! state, etc. It is the ground truth for the current state of its document. Listeners to the queue can
//! be various stages of out-of-date, at any point they can take a snapshot and bring themselves back to
//! the present.
//!
//! Every change is announced after the queue's lock is released. A listener that falls far enough
//! behind skips announcements, but never misses the newest state.

use std::sync::{Arc, Weak};

use tokio::sync::broadcast;

use crate::{
    commands::{Command, CommandError},
    config::QueueConfig,
    history::{Direction, History, HistoryError, StackHistory},
    io::{self, IoError},
    state::{Document, DocumentID, DocumentSnapshot, Version},
};

pub mod writer;

struct DocumentCommandQueueInner {
    document: Document,
    history: Box<dyn History + Send + Sync>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::AsRefStr)]
pub enum ChangeKind {
    /// A new command or batch of commands was applied.
    Applied,
    Undone,
    Redone,
}
impl From<Direction> for ChangeKind {
    fn from(value: Direction) -> Self {
        match value {
            Direction::Undo => Self::Undone,
            Direction::Redo => Self::Redone,
        }
    }
}

/// Announced after every successful mutation of a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentChanged {
    pub document: DocumentID,
    /// The version the document reached. Later changes may have happened since.
    pub version: Version,
    pub kind: ChangeKind,
    pub can_undo: bool,
    pub can_redo: bool,
}

pub struct DocumentCommandQueue {
    /// Mutable inner bits.
    inner: Arc<parking_lot::RwLock<DocumentCommandQueueInner>>,
    document: DocumentID,
    on_change: broadcast::Sender<DocumentChanged>,
}
impl DocumentCommandQueue {
    /// Take ownership of a document, with a fresh [`StackHistory`].
    #[must_use]
    pub fn new(document: Document, config: &QueueConfig) -> Self {
        Self::with_history(document, StackHistory::new(config.max_history), config)
    }
    /// Take ownership of a document, tracking its edits with the given history.
    #[must_use]
    pub fn with_history(
        document: Document,
        history: impl History + Send + Sync + 'static,
        config: &QueueConfig,
    ) -> Self {
        // Broadcast channels panic on a zero capacity.
        let (on_change, _) = broadcast::channel(config.notify_capacity.max(1));
        Self {
            document: document.id(),
            inner: Arc::new(
                DocumentCommandQueueInner {
                    document,
                    history: Box::new(history),
                }
                .into(),
            ),
            on_change,
        }
    }
    /// A queue for a new blank document.
    pub fn new_blank(
        width: u32,
        height: u32,
        config: &QueueConfig,
    ) -> Result<Self, crate::raster::RasterError> {
        Ok(Self::new(Document::blank(width, height)?, config))
    }
    /// A queue for a document loaded from an image file.
    pub fn open(path: impl AsRef<std::path::Path>, config: &QueueConfig) -> Result<Self, IoError> {
        Ok(Self::new(io::load(path)?, config))
    }
    #[must_use]
    pub fn id(&self) -> DocumentID {
        self.document
    }
    /// Build a command from the current state, apply and record it. Returns the version reached.
    ///
    /// The document is locked for the whole duration, so the state seen by `factory` is the state
    /// the command is applied to.
    pub fn issue<F>(&self, factory: F) -> Result<Version, CommandError>
    where
        F: FnOnce(&Document) -> Result<Command, CommandError>,
    {
        let change = {
            let mut lock = self.inner.write();
            let DocumentCommandQueueInner { document, history } = &mut *lock;
            let command = factory(document)?;
            command.apply(document)?;
            log::trace!("Issued command: {command:#?}");
            history.push(command);
            Self::describe(document, &**history, ChangeKind::Applied)
        };
        let version = change.version;
        self.notify(change);
        Ok(version)
    }
    /// Locks the queue for writing commands during the span of the closure, where each modification of
    /// the state is tracked by the command queue. If multiple commands are written, they are recorded
    /// in order as a single Atoms scope and the version advances once.
    ///
    /// If the closure fails or panics, every edit it made is taken back and nothing is recorded.
    pub fn write_with<F, T, E>(&self, write: F) -> Result<T, E>
    where
        F: FnOnce(&mut writer::CommandQueueWriter<'_>) -> Result<T, E>,
    {
        let (value, change) = {
            let mut lock = self.inner.write();
            let DocumentCommandQueueInner { document, history } = &mut *lock;
            let mut writer = writer::CommandQueueWriter::new(document);
            // Panic safe - the writer's Drop impl rolls back its edits.
            // Errors take the same path, by dropping the writer unfinished.
            let value = write(&mut writer)?;
            let change = writer.finish().map(|command| {
                document.bump_version();
                history.push(command);
                Self::describe(document, &**history, ChangeKind::Applied)
            });
            (value, change)
        };
        if let Some(change) = change {
            self.notify(change);
        }
        Ok(value)
    }
    /// Take back the most recent command. `Ok(false)` if there was nothing to undo.
    pub fn undo(&self) -> Result<bool, HistoryError> {
        self.step_n(Direction::Undo, 1).map(|done| done != 0)
    }
    /// Re-apply the most recently undone command. `Ok(false)` if there was nothing to redo.
    pub fn redo(&self) -> Result<bool, HistoryError> {
        self.step_n(Direction::Redo, 1).map(|done| done != 0)
    }
    /// Undo up to `num` steps, returning how many were taken.
    pub fn undo_n(&self, num: usize) -> Result<usize, HistoryError> {
        self.step_n(Direction::Undo, num)
    }
    /// Redo up to `num` steps, returning how many were taken.
    pub fn redo_n(&self, num: usize) -> Result<usize, HistoryError> {
        self.step_n(Direction::Redo, num)
    }
    fn step_n(&self, direction: Direction, num: usize) -> Result<usize, HistoryError> {
        let (result, change) = {
            let mut lock = self.inner.write();
            let DocumentCommandQueueInner { document, history } = &mut *lock;
            let mut done = 0;
            let mut result = Ok(());
            while done < num {
                let step = match direction {
                    Direction::Undo => history.undo(document),
                    Direction::Redo => history.redo(document),
                };
                match step {
                    Ok(true) => done += 1,
                    Ok(false) => break,
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                }
            }
            if done != 0 {
                log::debug!(
                    "{} {done} step(s) on {}, now at {}",
                    direction.as_ref(),
                    self.document,
                    document.version()
                );
            }
            let change = (done != 0)
                .then(|| Self::describe(document, &**history, direction.into()));
            (result.map(|()| done), change)
        };
        if let Some(change) = change {
            self.notify(change);
        }
        result
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.inner.read().history.can_undo()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.inner.read().history.can_redo()
    }
    #[must_use]
    pub fn version(&self) -> Version {
        self.inner.read().document.version()
    }
    /// View the state as it is at this moment.
    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        self.inner.read().document.snapshot()
    }
    /// Inspect the document under the read lock. Mutations wait until `f` returns.
    pub fn with_document<T>(&self, f: impl FnOnce(&Document) -> T) -> T {
        f(&self.inner.read().document)
    }
    /// Flatten and store the current state, then associate `path` with the document.
    /// The document is not locked while encoding.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), IoError> {
        let path = path.as_ref();
        let snapshot = self.snapshot();
        io::store_snapshot(&snapshot, path)?;
        self.inner.write().document.set_path(path.to_owned());
        log::info!("Saved {} at {} to {}", self.document, snapshot.version(), path.display());
        Ok(())
    }
    /// Raw change announcements, starting with the next change.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentChanged> {
        self.on_change.subscribe()
    }
    /// Create a listener that has not yet seen any state.
    #[must_use]
    pub fn listen(&self) -> DocumentCommandListener {
        // Subscribe under lock, so no change can slip between the two.
        let _lock = self.inner.read();
        DocumentCommandListener {
            document: self.document,
            cursor: None,
            inner: Arc::downgrade(&self.inner),
            changes: self.on_change.subscribe(),
        }
    }
    fn describe(document: &Document, history: &dyn History, kind: ChangeKind) -> DocumentChanged {
        DocumentChanged {
            document: document.id(),
            version: document.version(),
            kind,
            can_undo: history.can_undo(),
            can_redo: history.can_redo(),
        }
    }
    fn notify(&self, change: DocumentChanged) {
        // Err only means nobody is listening.
        let _ = self.on_change.send(change);
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ListenerError {
    #[error("document not available")]
    DocumentClosed,
}

/// Follows one queue, remembering the last version it brought itself up to.
pub struct DocumentCommandListener {
    document: DocumentID,
    // Version this listener has last seen, None if it has never looked.
    cursor: Option<Version>,
    inner: Weak<parking_lot::RwLock<DocumentCommandQueueInner>>,
    changes: broadcast::Receiver<DocumentChanged>,
}
impl DocumentCommandListener {
    #[must_use]
    pub fn document(&self) -> DocumentID {
        self.document
    }
    #[must_use]
    pub fn cursor(&self) -> Option<Version> {
        self.cursor
    }
    /// Whether the document has changed since this listener last looked.
    pub fn is_behind(&self) -> Result<bool, ListenerError> {
        let inner = self.inner.upgrade().ok_or(ListenerError::DocumentClosed)?;
        let version = inner.read().document.version();
        Ok(self.cursor != Some(version))
    }
    /// View the state, without forwarding this listener's point in time.
    pub fn peek_snapshot(&self) -> Result<DocumentSnapshot, ListenerError> {
        let inner = self.inner.upgrade().ok_or(ListenerError::DocumentClosed)?;
        let snapshot = inner.read().document.snapshot();
        Ok(snapshot)
    }
    /// View the state, bringing this listener up-to-date in the process.
    pub fn forward_snapshot(&mut self) -> Result<DocumentSnapshot, ListenerError> {
        let snapshot = self.peek_snapshot()?;
        self.cursor = Some(snapshot.version());
        Ok(snapshot)
    }
    /// Moves the cursor forward up-to-date with the document, not reporting the changes.
    /// Returns `true` if any change occured.
    pub fn forward(&mut self) -> Result<bool, ListenerError> {
        let inner = self.inner.upgrade().ok_or(ListenerError::DocumentClosed)?;
        let version = inner.read().document.version();
        let changed = self.cursor != Some(version);
        self.cursor = Some(version);
        Ok(changed)
    }
    /// Wait for a change newer than this listener's cursor. Does not move the cursor.
    pub async fn changed(&mut self) -> Result<DocumentChanged, ListenerError> {
        loop {
            match self.changes.recv().await {
                Ok(change) => {
                    if self.cursor.is_some_and(|cursor| change.version <= cursor) {
                        // Already seen through a snapshot.
                        continue;
                    }
                    return Ok(change);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Listener of {} skipped {skipped} change(s)", self.document);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(ListenerError::DocumentClosed)
                }
            }
        }
    }
}
