//! Writers apply edits to a [`LayerStack`] immediately and record the command for each one into a sink.
//! Edits that would change nothing are skipped and not recorded.

use super::{
    commands::{LayerCommand, RasterCommand},
    Layer, LayerID, LayerStack,
};
use crate::{
    blend::{Blend, BlendMode},
    commands::{CommandConsumer, CommandError, DoUndo},
    queue::writer::CommandWrite,
    raster::{Axis, ChannelLayout, Raster, Rect},
    util::UnitF32,
};

/// Run a builder, apply and record its command. A `NoOp` from the builder is not an error here.
fn commit<Command, Write>(
    layers: &mut LayerStack,
    writer: &mut Write,
    build: impl FnOnce(&LayerStack) -> Result<Command, CommandError>,
) -> Result<(), CommandError>
where
    LayerStack: CommandConsumer<Command>,
    Write: CommandWrite<Command>,
{
    let command = match build(layers) {
        Ok(command) => command,
        Err(CommandError::NoOp) => return Ok(()),
        Err(e) => return Err(e),
    };
    layers.apply(DoUndo::Do(&command))?;
    writer.write(command);
    Ok(())
}

pub struct LayerWriter<'a, Write> {
    writer: Write,
    layers: &'a mut LayerStack,
}
impl<Write> std::ops::Deref for LayerWriter<'_, Write> {
    type Target = LayerStack;
    fn deref(&self) -> &Self::Target {
        self.layers
    }
}
impl<'a, Write: CommandWrite<LayerCommand>> LayerWriter<'a, Write> {
    pub fn new(writer: Write, layers: &'a mut LayerStack) -> Self {
        Self { writer, layers }
    }
    /// Insert a layer at `index`, or on top if None.
    pub fn insert(&mut self, index: Option<usize>, layer: Layer) -> Result<LayerID, CommandError> {
        let id = layer.id();
        commit(self.layers, &mut self.writer, |layers| {
            LayerCommand::create(layers, index, layer)
        })?;
        Ok(id)
    }
    /// Create a new top-most layer, with every pixel set to `pixel`.
    pub fn create_filled(
        &mut self,
        name: impl Into<String>,
        layout: ChannelLayout,
        pixel: &[u8],
    ) -> Result<LayerID, CommandError> {
        let [width, height] = self.layers.size();
        let raster = Raster::filled(width, height, layout, pixel)?;
        self.insert(None, Layer::new(name, raster))
    }
    pub fn delete(&mut self, target: LayerID) -> Result<(), CommandError> {
        commit(self.layers, &mut self.writer, |layers| {
            LayerCommand::delete(layers, target)
        })
    }
    pub fn reorder(&mut self, target: LayerID, to: usize) -> Result<(), CommandError> {
        commit(self.layers, &mut self.writer, |layers| {
            LayerCommand::reorder(layers, target, to)
        })
    }
    pub fn rename(&mut self, target: LayerID, name: impl Into<String>) -> Result<(), CommandError> {
        commit(self.layers, &mut self.writer, |layers| {
            LayerCommand::rename(layers, target, name)
        })
    }
    pub fn set_blend(&mut self, target: LayerID, blend: Blend) -> Result<(), CommandError> {
        commit(self.layers, &mut self.writer, |layers| {
            LayerCommand::set_blend(layers, target, blend)
        })
    }
    pub fn set_opacity(&mut self, target: LayerID, opacity: UnitF32) -> Result<(), CommandError> {
        let blend = self
            .layers
            .get(target)
            .ok_or(CommandError::UnknownResource)?
            .blend();
        self.set_blend(target, blend.with_opacity(opacity))
    }
    pub fn set_blend_mode(&mut self, target: LayerID, mode: BlendMode) -> Result<(), CommandError> {
        let blend = self
            .layers
            .get(target)
            .ok_or(CommandError::UnknownResource)?
            .blend();
        self.set_blend(target, blend.with_mode(mode))
    }
    pub fn set_visible(&mut self, target: LayerID, visible: bool) -> Result<(), CommandError> {
        commit(self.layers, &mut self.writer, |layers| {
            LayerCommand::set_visible(layers, target, visible)
        })
    }
}

/// Writes to the pixels of a single layer.
pub struct RasterWriter<'a, Write> {
    writer: Write,
    layers: &'a mut LayerStack,
    target: LayerID,
}
impl<'a, Write: CommandWrite<RasterCommand>> RasterWriter<'a, Write> {
    /// Fails if `target` is not a layer of the stack.
    pub fn new(
        writer: Write,
        layers: &'a mut LayerStack,
        target: LayerID,
    ) -> Result<Self, CommandError> {
        if layers.get(target).is_none() {
            return Err(CommandError::UnknownResource);
        }
        Ok(Self {
            writer,
            layers,
            target,
        })
    }
    /// The layer, as it is after every write so far.
    #[must_use]
    pub fn layer(&self) -> Option<&Layer> {
        self.layers.get(self.target)
    }
    pub fn fill(&mut self, region: Rect, pixel: &[u8]) -> Result<(), CommandError> {
        let target = self.target;
        commit(self.layers, &mut self.writer, |layers| {
            RasterCommand::fill(layers, target, region, pixel)
        })
    }
    pub fn write(&mut self, region: Rect, pixels: Box<[u8]>) -> Result<(), CommandError> {
        let target = self.target;
        commit(self.layers, &mut self.writer, |layers| {
            RasterCommand::write(layers, target, region, pixels)
        })
    }
    pub fn flip(&mut self, axis: Axis) -> Result<(), CommandError> {
        let target = self.target;
        commit(self.layers, &mut self.writer, |layers| {
            RasterCommand::flip(layers, target, axis)
        })
    }
    pub fn convert(&mut self, layout: ChannelLayout) -> Result<(), CommandError> {
        let target = self.target;
        commit(self.layers, &mut self.writer, |layers| {
            RasterCommand::convert(layers, target, layout)
        })
    }
    pub fn replace(&mut self, raster: Raster) -> Result<(), CommandError> {
        let target = self.target;
        commit(self.layers, &mut self.writer, |layers| {
            RasterCommand::replace(layers, target, raster)
        })
    }
}
