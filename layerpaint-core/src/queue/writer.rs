use crate::{
    commands::{self, Command, DoUndo},
    state::{
        layer::writer::{LayerWriter, RasterWriter},
        Document, LayerID,
    },
};

/// Any type which can sink commands.
pub trait CommandWrite<Command> {
    /// Inserts a command.
    fn write(&mut self, command: Command);
}
impl<Write, Command> CommandWrite<Command> for &mut Write
where
    Write: CommandWrite<Command>,
{
    fn write(&mut self, command: Command) {
        (**self).write(command);
    }
}
// Any subcommand that can be wrapped in Command can be written into any
// smallvec of Command.
impl<Subcommand, Array> CommandWrite<Subcommand> for smallvec::SmallVec<Array>
where
    Subcommand: Into<Command>,
    Array: smallvec::Array<Item = Command>,
{
    fn write(&mut self, command: Subcommand) {
        self.push(command.into());
    }
}

/// Edits a document while the queue is locked. Every edit is applied as soon as it's made, so later
/// edits observe earlier ones.
///
/// Unless [`Self::finish`]ed, dropping the writer takes back every edit it made. This covers both an
/// early return with an error and an unwinding panic.
pub struct CommandQueueWriter<'a> {
    pub(super) document: &'a mut Document,
    // Optimize for exactly one command (the most common case)
    pub(super) commands: smallvec::SmallVec<[Command; 1]>,
}
impl<'a> CommandQueueWriter<'a> {
    pub(super) fn new(document: &'a mut Document) -> Self {
        Self {
            document,
            commands: smallvec::SmallVec::new(),
        }
    }
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.commands.is_empty()
    }
    /// The document, including every edit written so far.
    #[must_use]
    pub fn document(&self) -> &Document {
        self.document
    }
    pub fn layers(&'_ mut self) -> LayerWriter<'_, &mut smallvec::SmallVec<[Command; 1]>> {
        LayerWriter::new(&mut self.commands, self.document.layers_mut())
    }
    /// Write to the pixels of one layer. Fails if no such layer exists.
    pub fn raster(
        &'_ mut self,
        target: LayerID,
    ) -> Result<RasterWriter<'_, &mut smallvec::SmallVec<[Command; 1]>>, commands::CommandError>
    {
        RasterWriter::new(&mut self.commands, self.document.layers_mut(), target)
    }
    /// Take the edits as one command: the single command written, or an Atoms scope if several.
    /// None if nothing was written.
    pub(super) fn finish(mut self) -> Option<Command> {
        let mut commands = std::mem::take(&mut self.commands);
        let command = if commands.len() > 1 {
            Command::Meta(commands::MetaCommand::Scope(
                commands::ScopeType::Atoms,
                commands.into_vec().into_boxed_slice(),
            ))
        } else {
            commands.pop()?
        };
        log::trace!("Writing new command: {:#?}", command);
        Some(command)
    }
}
impl Drop for CommandQueueWriter<'_> {
    fn drop(&mut self) {
        if self.commands.is_empty() {
            return;
        }
        log::debug!(
            "Rolling back {} unfinished command(s) on {}",
            self.commands.len(),
            self.document.id()
        );
        for command in self.commands.drain(..).rev() {
            if let Err(e) = self.document.apply_unversioned(DoUndo::Undo(&command)) {
                log::error!("Rollback of {command:?} failed: {e}");
            }
        }
    }
}
