//! Layer and pixel commands, and the builders that capture them from the current state.
//!
//! Builders never modify the stack. They fail with [`CommandError::NoOp`] for edits that would change
//! nothing, so that the history only ever holds meaningful steps.

use std::sync::Arc;

use super::{Layer, LayerID, LayerStack};
use crate::{
    blend::Blend,
    commands::CommandError,
    raster::{Axis, ChannelLayout, Raster, Rect},
};

#[derive(Clone, Debug)]
pub enum LayerCommand {
    /// A layer was inserted at `index`. Undo removes it again.
    Created { index: usize, layer: Layer },
    /// The layer at `index` was removed. The layer is kept here, as it was at removal, to restore it on undo.
    Deleted { index: usize, layer: Layer },
    Reordered {
        target: LayerID,
        from: usize,
        to: usize,
    },
    Renamed {
        target: LayerID,
        from: String,
        to: String,
    },
    BlendChanged {
        target: LayerID,
        from: Blend,
        to: Blend,
    },
    VisibilityChanged {
        target: LayerID,
        from: bool,
        to: bool,
    },
}

#[derive(Clone, Debug)]
pub enum RasterCommand {
    /// A rectangle of pixels changed. Both sides are packed in the layer's layout.
    Pixels {
        target: LayerID,
        region: Rect,
        before: Box<[u8]>,
        after: Box<[u8]>,
    },
    Flipped { target: LayerID, axis: Axis },
    /// The whole raster was swapped, e.g. for a lossy layout conversion.
    Replaced {
        target: LayerID,
        from: Arc<Raster>,
        to: Arc<Raster>,
    },
}

fn existing(layers: &LayerStack, target: LayerID) -> Result<&Layer, CommandError> {
    layers.get(target).ok_or(CommandError::UnknownResource)
}

impl LayerCommand {
    /// Insert `layer` at `index`, or on top if None.
    pub fn create(
        layers: &LayerStack,
        index: Option<usize>,
        layer: Layer,
    ) -> Result<Self, CommandError> {
        let index = index.unwrap_or(layers.len());
        if index > layers.len() {
            return Err(CommandError::InvalidParameter("layer index out of range"));
        }
        if !layers.fits(layer.raster()) {
            return Err(CommandError::InvalidParameter(
                "layer size does not match the canvas",
            ));
        }
        if layers.get(layer.id()).is_some() {
            return Err(CommandError::MismatchedState);
        }
        Ok(Self::Created { index, layer })
    }
    pub fn delete(layers: &LayerStack, target: LayerID) -> Result<Self, CommandError> {
        let index = layers
            .index_of(target)
            .ok_or(CommandError::UnknownResource)?;
        let layer = layers.as_slice()[index].clone();
        Ok(Self::Deleted { index, layer })
    }
    /// Move a layer so it ends up at index `to`.
    pub fn reorder(layers: &LayerStack, target: LayerID, to: usize) -> Result<Self, CommandError> {
        let from = layers
            .index_of(target)
            .ok_or(CommandError::UnknownResource)?;
        if to >= layers.len() {
            return Err(CommandError::InvalidParameter("layer index out of range"));
        }
        if from == to {
            return Err(CommandError::NoOp);
        }
        Ok(Self::Reordered { target, from, to })
    }
    pub fn rename(
        layers: &LayerStack,
        target: LayerID,
        name: impl Into<String>,
    ) -> Result<Self, CommandError> {
        let layer = existing(layers, target)?;
        let to = name.into();
        if layer.name() == to {
            return Err(CommandError::NoOp);
        }
        Ok(Self::Renamed {
            target,
            from: layer.name().to_owned(),
            to,
        })
    }
    pub fn set_blend(
        layers: &LayerStack,
        target: LayerID,
        blend: Blend,
    ) -> Result<Self, CommandError> {
        let from = existing(layers, target)?.blend();
        if from == blend {
            return Err(CommandError::NoOp);
        }
        Ok(Self::BlendChanged {
            target,
            from,
            to: blend,
        })
    }
    pub fn set_visible(
        layers: &LayerStack,
        target: LayerID,
        visible: bool,
    ) -> Result<Self, CommandError> {
        let from = existing(layers, target)?.is_visible();
        if from == visible {
            return Err(CommandError::NoOp);
        }
        Ok(Self::VisibilityChanged {
            target,
            from,
            to: visible,
        })
    }
    /// The layer this command acts upon.
    #[must_use]
    pub fn target(&self) -> LayerID {
        match self {
            Self::Created { layer, .. } | Self::Deleted { layer, .. } => layer.id(),
            Self::Reordered { target, .. }
            | Self::Renamed { target, .. }
            | Self::BlendChanged { target, .. }
            | Self::VisibilityChanged { target, .. } => *target,
        }
    }
    #[must_use]
    pub fn memory_size(&self) -> usize {
        match self {
            Self::Created { layer, .. } | Self::Deleted { layer, .. } => {
                layer.raster().data().len() + layer.name().len()
            }
            Self::Renamed { from, to, .. } => from.len() + to.len(),
            Self::Reordered { .. } | Self::BlendChanged { .. } | Self::VisibilityChanged { .. } => 0,
        }
    }
}

impl RasterCommand {
    /// Overwrite `region` of a layer with packed `pixels` in the layer's layout.
    pub fn write(
        layers: &LayerStack,
        target: LayerID,
        region: Rect,
        pixels: Box<[u8]>,
    ) -> Result<Self, CommandError> {
        let raster = existing(layers, target)?.raster();
        let before = raster.read_region(region)?;
        if pixels.len() != before.len() {
            return Err(crate::raster::RasterError::SizeMismatch {
                expected: before.len(),
                actual: pixels.len(),
            }
            .into());
        }
        if region.is_empty() || before == pixels {
            return Err(CommandError::NoOp);
        }
        Ok(Self::Pixels {
            target,
            region,
            before,
            after: pixels,
        })
    }
    /// Set every pixel of `region` to `pixel`, given in the layer's layout.
    pub fn fill(
        layers: &LayerStack,
        target: LayerID,
        region: Rect,
        pixel: &[u8],
    ) -> Result<Self, CommandError> {
        let raster = existing(layers, target)?.raster();
        if pixel.len() != raster.layout().channels() {
            return Err(CommandError::InvalidParameter(
                "fill color does not match the layer's channel layout",
            ));
        }
        let after: Box<[u8]> = pixel
            .iter()
            .copied()
            .cycle()
            .take(raster.region_len(region)?)
            .collect();
        Self::write(layers, target, region, after)
    }
    pub fn flip(layers: &LayerStack, target: LayerID, axis: Axis) -> Result<Self, CommandError> {
        let raster = existing(layers, target)?.raster();
        let extent = match axis {
            Axis::Horizontal => raster.width(),
            Axis::Vertical => raster.height(),
        };
        // Mirroring a single row or column changes nothing.
        if extent <= 1 {
            return Err(CommandError::NoOp);
        }
        Ok(Self::Flipped { target, axis })
    }
    /// Swap the layer's raster wholesale.
    pub fn replace(
        layers: &LayerStack,
        target: LayerID,
        raster: Raster,
    ) -> Result<Self, CommandError> {
        let from = existing(layers, target)?.raster_handle();
        if !layers.fits(&raster) {
            return Err(CommandError::InvalidParameter(
                "layer size does not match the canvas",
            ));
        }
        if *from == raster {
            return Err(CommandError::NoOp);
        }
        Ok(Self::Replaced {
            target,
            from,
            to: Arc::new(raster),
        })
    }
    /// Change the channel layout of a layer. Conversions may be lossy, so the old raster is retained.
    pub fn convert(
        layers: &LayerStack,
        target: LayerID,
        layout: ChannelLayout,
    ) -> Result<Self, CommandError> {
        let from = existing(layers, target)?.raster_handle();
        if from.layout() == layout {
            return Err(CommandError::NoOp);
        }
        let to = Arc::new(from.converted(layout));
        Ok(Self::Replaced { target, from, to })
    }
    #[must_use]
    pub fn target(&self) -> LayerID {
        match self {
            Self::Pixels { target, .. }
            | Self::Flipped { target, .. }
            | Self::Replaced { target, .. } => *target,
        }
    }
    #[must_use]
    pub fn memory_size(&self) -> usize {
        match self {
            Self::Pixels { before, after, .. } => before.len() + after.len(),
            Self::Flipped { .. } => 0,
            Self::Replaced { from, to, .. } => from.data().len() + to.data().len(),
        }
    }
}
