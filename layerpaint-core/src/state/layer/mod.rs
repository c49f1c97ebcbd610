//! # Layers
//!
//! The document's editable content: an ordered stack of same-sized raster layers, bottom first.
//! Rasters are shared copy-on-write, so snapshots and commands may hold onto them for free, and
//! mutation only clones a raster while someone else is looking at it.

pub mod commands;
pub mod writer;

use std::sync::Arc;

use crate::{
    blend::Blend,
    commands::{CommandConsumer, CommandError, DoUndo},
    raster::Raster,
};

pub type LayerID = crate::UniqueID<Layer>;

#[derive(Clone, Debug)]
pub struct Layer {
    id: LayerID,
    name: String,
    blend: Blend,
    visible: bool,
    raster: Arc<Raster>,
}
impl Layer {
    /// Create a new, visible layer with a fresh ID. It becomes part of a document only through a
    /// [`commands::LayerCommand::Created`].
    #[must_use]
    pub fn new(name: impl Into<String>, raster: Raster) -> Self {
        Self {
            id: LayerID::new(),
            name: name.into(),
            blend: Blend::default(),
            visible: true,
            raster: Arc::new(raster),
        }
    }
    #[must_use]
    pub fn with_blend(self, blend: Blend) -> Self {
        Self { blend, ..self }
    }
    #[must_use]
    pub fn id(&self) -> LayerID {
        self.id
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn blend(&self) -> Blend {
        self.blend
    }
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }
    #[must_use]
    pub fn raster(&self) -> &Raster {
        &self.raster
    }
    /// Shared handle to the raster, as it is at this moment.
    #[must_use]
    pub fn raster_handle(&self) -> Arc<Raster> {
        self.raster.clone()
    }
    /// Whether two layers are observationally identical.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.blend == other.blend
            && self.visible == other.visible
            && same_raster(&self.raster, &other.raster)
    }
}

pub(crate) fn same_raster(a: &Arc<Raster>, b: &Arc<Raster>) -> bool {
    // Pointer check first, comparing pixels is the slow path.
    Arc::ptr_eq(a, b) || a == b
}

/// All the layers of a document, bottom-most first.
#[derive(Clone, Debug)]
pub struct LayerStack {
    width: u32,
    height: u32,
    layers: Vec<Layer>,
}
// Public methods for access by the client
impl LayerStack {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layers: Vec::new(),
        }
    }
    /// Canvas size every layer shares.
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
    /// Iterate bottom-to-top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Layer> + ExactSizeIterator + '_ {
        self.layers.iter()
    }
    #[must_use]
    pub fn as_slice(&self) -> &[Layer] {
        &self.layers
    }
    #[must_use]
    pub fn get(&self, id: LayerID) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }
    #[must_use]
    pub fn index_of(&self, id: LayerID) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == id)
    }
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }
    /// Whether a raster could be a layer of this stack.
    #[must_use]
    pub fn fits(&self, raster: &Raster) -> bool {
        raster.width() == self.width && raster.height() == self.height
    }
}
// Private methods for the command applier
impl LayerStack {
    fn get_mut(&mut self, id: LayerID) -> Result<&mut Layer, CommandError> {
        self.layers
            .iter_mut()
            .find(|layer| layer.id == id)
            .ok_or(CommandError::UnknownResource)
    }
    fn insert(&mut self, index: usize, layer: &Layer) -> Result<(), CommandError> {
        if self.get(layer.id).is_some() || index > self.layers.len() {
            return Err(CommandError::MismatchedState);
        }
        if !self.fits(&layer.raster) {
            return Err(CommandError::InvalidParameter(
                "layer size does not match the canvas",
            ));
        }
        self.layers.insert(index, layer.clone());
        Ok(())
    }
    fn remove(&mut self, index: usize, expected: &Layer) -> Result<(), CommandError> {
        match self.layers.get(index) {
            Some(layer) if layer.same_content(expected) => {
                self.layers.remove(index);
                Ok(())
            }
            Some(_) => Err(CommandError::MismatchedState),
            None => Err(CommandError::UnknownResource),
        }
    }
}

impl CommandConsumer<commands::LayerCommand> for LayerStack {
    fn apply(&mut self, command: DoUndo<'_, commands::LayerCommand>) -> Result<(), CommandError> {
        use commands::LayerCommand;
        match command {
            DoUndo::Do(LayerCommand::Created { index, layer })
            | DoUndo::Undo(LayerCommand::Deleted { index, layer }) => self.insert(*index, layer),
            DoUndo::Undo(LayerCommand::Created { index, layer })
            | DoUndo::Do(LayerCommand::Deleted { index, layer }) => self.remove(*index, layer),
            DoUndo::Do(LayerCommand::Reordered { target, from, to })
            | DoUndo::Undo(LayerCommand::Reordered {
                target,
                from: to,
                to: from,
            }) => {
                match self.layers.get(*from) {
                    Some(layer) if layer.id == *target => (),
                    Some(_) => return Err(CommandError::MismatchedState),
                    None => return Err(CommandError::UnknownResource),
                }
                if *to >= self.layers.len() {
                    return Err(CommandError::MismatchedState);
                }
                let layer = self.layers.remove(*from);
                self.layers.insert(*to, layer);
                Ok(())
            }
            DoUndo::Do(LayerCommand::Renamed { target, from, to })
            | DoUndo::Undo(LayerCommand::Renamed {
                target,
                from: to,
                to: from,
            }) => {
                let layer = self.get_mut(*target)?;
                if layer.name != *from {
                    return Err(CommandError::MismatchedState);
                }
                layer.name.clone_from(to);
                Ok(())
            }
            DoUndo::Do(LayerCommand::BlendChanged { target, from, to })
            | DoUndo::Undo(LayerCommand::BlendChanged {
                target,
                from: to,
                to: from,
            }) => {
                let layer = self.get_mut(*target)?;
                if layer.blend != *from {
                    return Err(CommandError::MismatchedState);
                }
                layer.blend = *to;
                Ok(())
            }
            DoUndo::Do(LayerCommand::VisibilityChanged { target, from, to })
            | DoUndo::Undo(LayerCommand::VisibilityChanged {
                target,
                from: to,
                to: from,
            }) => {
                let layer = self.get_mut(*target)?;
                if layer.visible != *from {
                    return Err(CommandError::MismatchedState);
                }
                layer.visible = *to;
                Ok(())
            }
        }
    }
}

impl CommandConsumer<commands::RasterCommand> for LayerStack {
    fn apply(&mut self, command: DoUndo<'_, commands::RasterCommand>) -> Result<(), CommandError> {
        use commands::RasterCommand;
        match command {
            DoUndo::Do(RasterCommand::Pixels {
                target,
                region,
                before,
                after,
            })
            | DoUndo::Undo(RasterCommand::Pixels {
                target,
                region,
                before: after,
                after: before,
            }) => {
                let layer = self.get_mut(*target)?;
                if !layer.raster.region_eq(*region, before) {
                    return Err(CommandError::MismatchedState);
                }
                // Bounds and length were just checked by the comparison, this will not fail halfway.
                Arc::make_mut(&mut layer.raster).write_region(*region, after)?;
                Ok(())
            }
            // Flips are their own inverse.
            DoUndo::Do(RasterCommand::Flipped { target, axis })
            | DoUndo::Undo(RasterCommand::Flipped { target, axis }) => {
                let layer = self.get_mut(*target)?;
                Arc::make_mut(&mut layer.raster).flip(*axis);
                Ok(())
            }
            DoUndo::Do(RasterCommand::Replaced { target, from, to })
            | DoUndo::Undo(RasterCommand::Replaced {
                target,
                from: to,
                to: from,
            }) => {
                let (width, height) = (self.width, self.height);
                let layer = self.get_mut(*target)?;
                if !same_raster(&layer.raster, from) {
                    return Err(CommandError::MismatchedState);
                }
                if to.width() != width || to.height() != height {
                    return Err(CommandError::InvalidParameter(
                        "layer size does not match the canvas",
                    ));
                }
                layer.raster = to.clone();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{
        commands::{LayerCommand, RasterCommand},
        Layer, LayerStack,
    };
    use crate::{
        commands::{CommandConsumer, CommandError, DoUndo},
        raster::{Axis, ChannelLayout, Raster, RasterError, Rect},
    };

    fn stack_with(count: usize) -> LayerStack {
        let mut stack = LayerStack::new(4, 4);
        for i in 0..count {
            let layer = Layer::new(
                format!("Layer {i}"),
                Raster::filled(4, 4, ChannelLayout::Rgba, &[0, 0, 0, 0]).unwrap(),
            );
            let create = LayerCommand::create(&stack, None, layer).unwrap();
            stack.apply(DoUndo::Do(&create)).unwrap();
        }
        stack
    }

    #[test]
    fn created_and_deleted_are_inverses() {
        let mut stack = stack_with(2);
        let target = stack.at(0).unwrap().id();
        let delete = LayerCommand::delete(&stack, target).unwrap();
        stack.apply(DoUndo::Do(&delete)).unwrap();
        assert_eq!(stack.len(), 1);
        assert!(stack.get(target).is_none());
        // Twice is a mismatch, the layer at that index is a different one now.
        assert_eq!(
            stack.apply(DoUndo::Do(&delete)),
            Err(CommandError::MismatchedState)
        );
        stack.apply(DoUndo::Undo(&delete)).unwrap();
        assert_eq!(stack.index_of(target), Some(0));
    }
    #[test]
    fn wrong_size_layers_are_rejected() {
        let stack = stack_with(0);
        let layer = Layer::new("Big", Raster::zeroed(5, 4, ChannelLayout::Gray).unwrap());
        assert!(matches!(
            LayerCommand::create(&stack, None, layer),
            Err(CommandError::InvalidParameter(_))
        ));
    }
    #[test]
    fn reorder_round_trip() {
        let mut stack = stack_with(3);
        let ids: Vec<_> = stack.iter().map(Layer::id).collect();
        let reorder = LayerCommand::reorder(&stack, ids[0], 2).unwrap();
        stack.apply(DoUndo::Do(&reorder)).unwrap();
        assert_eq!(
            stack.iter().map(Layer::id).collect::<Vec<_>>(),
            [ids[1], ids[2], ids[0]]
        );
        stack.apply(DoUndo::Undo(&reorder)).unwrap();
        assert_eq!(stack.iter().map(Layer::id).collect::<Vec<_>>(), ids);
        assert_eq!(
            LayerCommand::reorder(&stack, ids[1], 1).unwrap_err(),
            CommandError::NoOp
        );
    }
    #[test]
    fn stale_pixels_are_a_mismatch() {
        let mut stack = stack_with(1);
        let target = stack.at(0).unwrap().id();
        let region = Rect::new(0, 0, 2, 2);
        let red = RasterCommand::fill(&stack, target, region, &[255, 0, 0, 255]).unwrap();
        let blue = RasterCommand::fill(&stack, target, region, &[0, 0, 255, 255]).unwrap();
        stack.apply(DoUndo::Do(&red)).unwrap();
        // Blue was built against the transparent state.
        let before = stack.at(0).unwrap().raster().clone();
        assert_eq!(
            stack.apply(DoUndo::Do(&blue)),
            Err(CommandError::MismatchedState)
        );
        assert_eq!(stack.at(0).unwrap().raster(), &before);
    }
    #[test]
    fn oversized_fills_are_out_of_bounds() {
        let stack = stack_with(1);
        let target = stack.at(0).unwrap().id();
        for region in [
            Rect::new(0, 0, u32::MAX, u32::MAX),
            Rect::new(0, 0, 100_000, 100_000),
            Rect::new(3, 3, 2, 1),
        ] {
            assert!(matches!(
                RasterCommand::fill(&stack, target, region, &[1, 2, 3, 4]),
                Err(CommandError::Raster(RasterError::OutOfBounds { .. }))
            ));
        }
    }
    #[test]
    fn snapshots_are_not_disturbed() {
        let mut stack = stack_with(1);
        let target = stack.at(0).unwrap().id();
        let held = stack.at(0).unwrap().raster_handle();
        let paint =
            RasterCommand::fill(&stack, target, Rect::new(0, 0, 1, 1), &[1, 2, 3, 4]).unwrap();
        stack.apply(DoUndo::Do(&paint)).unwrap();
        assert_eq!(held.pixel(0, 0), Some(&[0, 0, 0, 0][..]));
        assert_eq!(stack.at(0).unwrap().raster().pixel(0, 0), Some(&[1, 2, 3, 4][..]));
    }
    #[test]
    fn flips_invert_themselves() {
        let mut stack = stack_with(1);
        let target = stack.at(0).unwrap().id();
        let paint = RasterCommand::fill(&stack, target, Rect::new(0, 0, 1, 4), &[9, 9, 9, 9]).unwrap();
        stack.apply(DoUndo::Do(&paint)).unwrap();
        let before = stack.at(0).unwrap().raster().clone();

        let flip = RasterCommand::flip(&stack, target, Axis::Horizontal).unwrap();
        stack.apply(DoUndo::Do(&flip)).unwrap();
        assert_eq!(stack.at(0).unwrap().raster().pixel(3, 2), Some(&[9, 9, 9, 9][..]));
        stack.apply(DoUndo::Undo(&flip)).unwrap();
        assert_eq!(stack.at(0).unwrap().raster(), &before);
    }
    #[test]
    fn lossy_conversion_is_restored() {
        let mut stack = stack_with(1);
        let target = stack.at(0).unwrap().id();
        let paint =
            RasterCommand::fill(&stack, target, Rect::new(1, 1, 2, 2), &[200, 10, 10, 128]).unwrap();
        stack.apply(DoUndo::Do(&paint)).unwrap();
        let before = stack.at(0).unwrap().raster().clone();

        let convert = RasterCommand::convert(&stack, target, ChannelLayout::Gray).unwrap();
        stack.apply(DoUndo::Do(&convert)).unwrap();
        assert_eq!(stack.at(0).unwrap().raster().layout(), ChannelLayout::Gray);
        stack.apply(DoUndo::Undo(&convert)).unwrap();
        assert_eq!(stack.at(0).unwrap().raster(), &before);
    }
}
