use std::{path::PathBuf, sync::Arc};

use super::layer::{Layer, LayerID, LayerStack};
use crate::{
    commands::{Command, CommandConsumer, CommandError, DoUndo, MetaCommand},
    raster::{ChannelLayout, Raster, RasterError},
};

pub type DocumentID = crate::UniqueID<Document>;

/// Counts the mutations a document has seen. Never decreases, not even on undo.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Version(u64);
impl Version {
    /// The version of every freshly created or loaded document.
    pub const INITIAL: Self = Self(0);
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
    #[must_use]
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}
impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

pub struct Document {
    id: DocumentID,
    /// The path from which the file was loaded or saved, or None if opened as new.
    path: Option<PathBuf>,
    /// Name of the document, inferred from its path or generated.
    name: String,
    layers: LayerStack,
    version: Version,
}
impl Document {
    const UNNAMED: &'static str = "New Document";
    /// An empty canvas, without any layers.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: DocumentID::new(),
            path: None,
            name: Self::UNNAMED.to_owned(),
            layers: LayerStack::new(width, height),
            version: Version::INITIAL,
        }
    }
    /// A canvas with a single opaque white background layer.
    pub fn blank(width: u32, height: u32) -> Result<Self, RasterError> {
        let background = Raster::filled(width, height, ChannelLayout::Rgba, &[u8::MAX; 4])?;
        Ok(Self::from_raster(background, None))
    }
    /// A canvas the size of `raster`, which becomes its only layer.
    #[must_use]
    pub fn from_raster(raster: Raster, path: Option<PathBuf>) -> Self {
        let mut document = Self::new(raster.width(), raster.height());
        // Construction, not mutation. Goes in directly.
        document.layers = {
            let mut layers = LayerStack::new(raster.width(), raster.height());
            let background = Layer::new("Background", raster);
            // The stack is empty and sized to the raster, so this is accepted.
            let created = crate::commands::LayerCommand::Created {
                index: 0,
                layer: background,
            };
            if let Err(e) = layers.apply(DoUndo::Do(&created)) {
                log::error!("Failed to add the background layer: {e}");
                debug_assert!(false, "background layer rejected: {e}");
            }
            layers
        };
        if let Some(path) = path {
            document.set_path(path);
        }
        document
    }
    #[must_use]
    pub fn id(&self) -> DocumentID {
        self.id
    }
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        self.path.as_deref()
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        self.layers.size()
    }
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }
    #[must_use]
    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }
    #[must_use]
    pub fn layer(&self, id: LayerID) -> Option<&Layer> {
        self.layers.get(id)
    }
    /// Capture the current state. Cheap, layer rasters are shared until next modified.
    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        let [width, height] = self.size();
        DocumentSnapshot {
            document: self.id,
            version: self.version,
            width,
            height,
            layers: self.layers.as_slice().into(),
        }
    }
}
// Crate-private mutation, for the command queue and its writers.
impl Document {
    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.name = path
            .file_stem()
            .map_or_else(|| Self::UNNAMED.to_owned(), |stem| stem.to_string_lossy().into_owned());
        self.path = Some(path);
    }
    pub(crate) fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }
    pub(crate) fn bump_version(&mut self) {
        self.version = self.version.next();
    }
    /// Apply without counting a new version. Groups of commands applied this way must be followed
    /// by exactly one [`Self::bump_version`] to be observable.
    pub(crate) fn apply_unversioned(
        &mut self,
        command: DoUndo<'_, Command>,
    ) -> Result<(), CommandError> {
        match command.command() {
            Command::Layer(layer) => self.layers.apply(command.map(|_| layer)),
            Command::Raster(raster) => self.layers.apply(command.map(|_| raster)),
            Command::Meta(MetaCommand::Scope(_, commands)) => {
                self.apply_scope(commands, matches!(command, DoUndo::Do(_)))
            }
        }
    }
    /// Do every command in order, or undo every command in reverse order. All or nothing.
    fn apply_scope(&mut self, commands: &[Command], forward: bool) -> Result<(), CommandError> {
        fn directed(forward: bool, command: &Command) -> DoUndo<'_, Command> {
            if forward {
                DoUndo::Do(command)
            } else {
                DoUndo::Undo(command)
            }
        }
        let ordered: Vec<&Command> = if forward {
            commands.iter().collect()
        } else {
            commands.iter().rev().collect()
        };
        for (done, child) in ordered.iter().enumerate() {
            if let Err(e) = self.apply_unversioned(directed(forward, child)) {
                // Take back what this scope already did, newest first.
                for applied in ordered[..done].iter().rev() {
                    if let Err(rollback) =
                        self.apply_unversioned(directed(forward, applied).reversed())
                    {
                        log::error!("Scope rollback failed, document {} may be inconsistent: {rollback}", self.id);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

impl CommandConsumer<Command> for Document {
    fn apply(&mut self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
        self.apply_unversioned(command)?;
        self.bump_version();
        Ok(())
    }
}

/// An immutable view of a document at one version.
#[derive(Clone, Debug)]
pub struct DocumentSnapshot {
    document: DocumentID,
    version: Version,
    width: u32,
    height: u32,
    layers: Arc<[Layer]>,
}
impl DocumentSnapshot {
    #[must_use]
    pub fn document(&self) -> DocumentID {
        self.document
    }
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }
    /// Layers, bottom-most first.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
    /// Whether both snapshots show the same layers and pixels, regardless of version.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.size() == other.size()
            && self.layers.len() == other.layers.len()
            && self
                .layers
                .iter()
                .zip(other.layers.iter())
                .all(|(a, b)| a.same_content(b))
    }
}
