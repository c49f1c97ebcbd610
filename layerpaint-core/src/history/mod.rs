//! # History
//!
//! Linear undo and redo stacks of applied commands. Recording a new command after an undo forgets
//! everything that was undone, there is no branching.

use std::{collections::VecDeque, num::NonZeroUsize};

use crate::{
    commands::{Command, CommandError},
    state::Document,
};

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::AsRefStr)]
pub enum Direction {
    Undo,
    Redo,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// A recorded command no longer matches the document. The command was dropped and the
    /// history cleared.
    #[error("history desynchronized during {}: {source}", .direction.as_ref())]
    Desynchronized {
        direction: Direction,
        source: CommandError,
    },
}

/// Tracks applied commands for a single document.
pub trait History {
    /// Record a command that has already been applied to the document.
    fn push(&mut self, command: Command);
    /// Invert the most recent command. `Ok(false)` if there was nothing to undo.
    fn undo(&mut self, document: &mut Document) -> Result<bool, HistoryError>;
    /// Re-apply the most recently undone command. `Ok(false)` if there was nothing to redo.
    fn redo(&mut self, document: &mut Document) -> Result<bool, HistoryError>;
    fn can_undo(&self) -> bool {
        self.undo_len() != 0
    }
    fn can_redo(&self) -> bool {
        self.redo_len() != 0
    }
    fn undo_len(&self) -> usize;
    fn redo_len(&self) -> usize;
    fn clear(&mut self);
}

#[derive(Default)]
pub struct StackHistory {
    /// Most recent last.
    undo: VecDeque<Command>,
    /// Most recently undone last.
    redo: Vec<Command>,
    max_depth: Option<NonZeroUsize>,
}
impl StackHistory {
    /// A history keeping at most `max_depth` undo steps, or unbounded if None.
    #[must_use]
    pub fn new(max_depth: Option<NonZeroUsize>) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth,
        }
    }
    #[must_use]
    pub fn max_depth(&self) -> Option<NonZeroUsize> {
        self.max_depth
    }
    /// Estimated bytes held by every recorded command.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        self.undo
            .iter()
            .chain(self.redo.iter())
            .map(Command::memory_size)
            .sum()
    }
    fn desynchronized(
        &mut self,
        direction: Direction,
        command: &Command,
        source: CommandError,
    ) -> HistoryError {
        log::error!(
            "{} of {command:?} failed ({source}), dropping {} undo and {} redo entries",
            direction.as_ref(),
            self.undo.len(),
            self.redo.len(),
        );
        self.clear();
        HistoryError::Desynchronized { direction, source }
    }
}
impl History for StackHistory {
    fn push(&mut self, command: Command) {
        self.redo.clear();
        self.undo.push_back(command);
        if let Some(max) = self.max_depth {
            while self.undo.len() > max.get() {
                if let Some(evicted) = self.undo.pop_front() {
                    log::trace!("Evicted oldest history entry {evicted:?}");
                }
            }
        }
        log::debug!(
            "History holds {} steps, {}",
            self.undo.len(),
            human_bytes::human_bytes(self.memory_size() as f64)
        );
    }
    fn undo(&mut self, document: &mut Document) -> Result<bool, HistoryError> {
        let Some(command) = self.undo.pop_back() else {
            return Ok(false);
        };
        match command.invert(document) {
            Ok(()) => {
                self.redo.push(command);
                Ok(true)
            }
            Err(e) => Err(self.desynchronized(Direction::Undo, &command, e)),
        }
    }
    fn redo(&mut self, document: &mut Document) -> Result<bool, HistoryError> {
        let Some(command) = self.redo.pop() else {
            return Ok(false);
        };
        match command.apply(document) {
            Ok(()) => {
                self.undo.push_back(command);
                Ok(true)
            }
            Err(e) => Err(self.desynchronized(Direction::Redo, &command, e)),
        }
    }
    fn undo_len(&self) -> usize {
        self.undo.len()
    }
    fn redo_len(&self) -> usize {
        self.redo.len()
    }
    fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod test {
    use std::num::NonZeroUsize;

    use super::{Direction, History, HistoryError, StackHistory};
    use crate::{
        commands::{Command, CommandError, LayerCommand},
        state::{Document, DocumentSnapshot},
    };

    /// Rename the background layer to `name`, applying and recording it.
    fn rename(document: &mut Document, history: &mut StackHistory, name: &str) -> DocumentSnapshot {
        let target = document.layers().at(0).unwrap().id();
        let command: Command = LayerCommand::rename(document.layers(), target, name)
            .unwrap()
            .into();
        command.apply(document).unwrap();
        history.push(command);
        document.snapshot()
    }
    fn background_name(document: &Document) -> &str {
        document.layers().at(0).unwrap().name()
    }

    #[test]
    fn empty() {
        let mut document = Document::blank(1, 1).unwrap();
        let mut history = StackHistory::default();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.undo(&mut document), Ok(false));
        assert_eq!(history.redo(&mut document), Ok(false));
        assert_eq!(document.version().get(), 0);
    }
    #[test]
    fn undo_redo_round_trip() {
        let mut document = Document::blank(2, 2).unwrap();
        let mut history = StackHistory::default();
        let mut states = vec![document.snapshot()];
        for name in ["a", "b", "c"] {
            states.push(rename(&mut document, &mut history, name));
        }
        for expected in states.iter().rev().skip(1) {
            assert_eq!(history.undo(&mut document), Ok(true));
            assert!(document.snapshot().same_content(expected));
        }
        assert_eq!(history.undo(&mut document), Ok(false));
        for expected in states.iter().skip(1) {
            assert_eq!(history.redo(&mut document), Ok(true));
            assert!(document.snapshot().same_content(expected));
        }
        assert_eq!(history.redo(&mut document), Ok(false));
        // 3 applies, 3 undos, 3 redos.
        assert_eq!(document.version().get(), 9);
    }
    #[test]
    fn push_clears_redo() {
        let mut document = Document::blank(2, 2).unwrap();
        let mut history = StackHistory::default();
        rename(&mut document, &mut history, "a");
        rename(&mut document, &mut history, "b");
        assert_eq!(history.undo(&mut document), Ok(true));
        assert!(history.can_redo());
        rename(&mut document, &mut history, "c");
        assert!(!history.can_redo());
        assert_eq!(history.redo(&mut document), Ok(false));
        assert_eq!(background_name(&document), "c");
        assert_eq!(history.undo_len(), 2);
    }
    #[test]
    fn max_depth_evicts_oldest() {
        let mut document = Document::blank(2, 2).unwrap();
        let mut history = StackHistory::new(NonZeroUsize::new(3));
        for name in ["a", "b", "c", "d"] {
            rename(&mut document, &mut history, name);
        }
        assert_eq!(history.undo_len(), 3);
        for _ in 0..3 {
            assert_eq!(history.undo(&mut document), Ok(true));
        }
        // "a" was evicted, so its rename can't be taken back.
        assert_eq!(history.undo(&mut document), Ok(false));
        assert_eq!(background_name(&document), "a");
        assert_eq!(history.redo_len(), 3);
    }
    #[test]
    fn desync_clears() {
        let mut document = Document::blank(2, 2).unwrap();
        let mut history = StackHistory::default();
        rename(&mut document, &mut history, "a");
        rename(&mut document, &mut history, "b");
        // Change the document behind the history's back.
        let target = document.layers().at(0).unwrap().id();
        let sneaky: Command = LayerCommand::rename(document.layers(), target, "z")
            .unwrap()
            .into();
        sneaky.apply(&mut document).unwrap();
        let version = document.version();

        assert_eq!(
            history.undo(&mut document),
            Err(HistoryError::Desynchronized {
                direction: Direction::Undo,
                source: CommandError::MismatchedState,
            })
        );
        assert_eq!(document.version(), version);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
