//! # Commands
//!
//! Commands are the only way the state of a document is modified. Each one carries enough information to be
//! performed (`Do`) and reversed (`Undo`), and is consumed through [`CommandConsumer`]. Commands are built against
//! the document state by the builders in [`state::layer::commands`], or recorded automatically by a
//! [`crate::queue::writer::CommandQueueWriter`].

pub use state::layer::commands::{LayerCommand, RasterCommand};

use crate::{raster::RasterError, state};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("command constructed for a state that does not match the current state")]
    MismatchedState,
    #[error("resource referenced by the command is not found")]
    UnknownResource,
    #[error("command makes no changes")]
    NoOp,
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    #[error(transparent)]
    Raster(#[from] RasterError),
}
pub trait CommandConsumer<C> {
    /// Apply a single command. If this generates an error,
    /// the state of `self` should *not* be observably changed.
    fn apply(&mut self, command: DoUndo<'_, C>) -> Result<(), CommandError>;
}
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeType {
    /// Commands are grouped because they were individual parts of a single, larger operation.
    Atoms,
}
/// Commands about commands!
#[derive(Clone, Debug)]
pub enum MetaCommand {
    /// Bundle many commands into one group, treated as a single command as far as the user can tell.
    /// Done in order, undone in reverse order.
    Scope(ScopeType, Box<[Command]>),
}

#[derive(Clone, Debug)]
pub enum Command {
    Meta(MetaCommand),
    Layer(LayerCommand),
    Raster(RasterCommand),
}
impl From<MetaCommand> for Command {
    fn from(value: MetaCommand) -> Self {
        Self::Meta(value)
    }
}
impl From<LayerCommand> for Command {
    fn from(value: LayerCommand) -> Self {
        Self::Layer(value)
    }
}
impl From<RasterCommand> for Command {
    fn from(value: RasterCommand) -> Self {
        Self::Raster(value)
    }
}
impl Command {
    #[must_use]
    pub fn meta(&self) -> Option<&MetaCommand> {
        match self {
            Self::Meta(m) => Some(m),
            _ => None,
        }
    }
    #[must_use]
    pub fn layer(&self) -> Option<&LayerCommand> {
        match self {
            Self::Layer(m) => Some(m),
            _ => None,
        }
    }
    #[must_use]
    pub fn raster(&self) -> Option<&RasterCommand> {
        match self {
            Self::Raster(m) => Some(m),
            _ => None,
        }
    }
    /// Perform the command's forward operation on `consumer`.
    pub fn apply<Consumer>(&self, consumer: &mut Consumer) -> Result<(), CommandError>
    where
        Consumer: CommandConsumer<Command> + ?Sized,
    {
        consumer.apply(DoUndo::Do(self))
    }
    /// Perform the command's inverse operation on `consumer`.
    pub fn invert<Consumer>(&self, consumer: &mut Consumer) -> Result<(), CommandError>
    where
        Consumer: CommandConsumer<Command> + ?Sized,
    {
        consumer.apply(DoUndo::Undo(self))
    }
    /// Approximate heap bytes retained by this command. Rasters shared with the document are counted in full.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        match self {
            Self::Meta(MetaCommand::Scope(_, commands)) => {
                commands.iter().map(Command::memory_size).sum()
            }
            Self::Layer(layer) => layer.memory_size(),
            Self::Raster(raster) => raster.memory_size(),
        }
    }
}

#[derive(PartialEq, Eq, Debug)]
pub enum DoUndo<'c, T> {
    Do(&'c T),
    Undo(&'c T),
}
// Derive would require T: Clone/Copy, which references don't need.
impl<T> Clone for DoUndo<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for DoUndo<'_, T> {}
impl<'c, T> DoUndo<'c, T> {
    /// Apply a closure to the inner type T, maintaining the
    /// Do or Undo status. Returns None if the closure returns None.
    pub fn filter_map<Func, Return>(&self, f: Func) -> Option<DoUndo<'c, Return>>
    where
        Func: FnOnce(&'c T) -> Option<&'c Return>,
        Return: 'c,
    {
        match self {
            Self::Do(c) => Some(DoUndo::Do(f(c)?)),
            Self::Undo(c) => Some(DoUndo::Undo(f(c)?)),
        }
    }
    /// Map the inner command, maintaining the Do or Undo status.
    #[must_use]
    pub fn map<Return>(self, f: impl FnOnce(&'c T) -> &'c Return) -> DoUndo<'c, Return> {
        match self {
            Self::Do(c) => DoUndo::Do(f(c)),
            Self::Undo(c) => DoUndo::Undo(f(c)),
        }
    }
    /// The same command, in the opposite direction.
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::Do(c) => Self::Undo(c),
            Self::Undo(c) => Self::Do(c),
        }
    }
    #[must_use]
    pub fn command(self) -> &'c T {
        match self {
            Self::Do(c) | Self::Undo(c) => c,
        }
    }
}
