//! Scripted edit sessions.
//!
//! A script is a TOML file naming a starting canvas, a list of `[[edit]]` steps and optionally where to
//! store the result:
//!
//! ```toml
//! blank = { width = 64, height = 64 }
//! output = "out.png"
//!
//! [[edit]]
//! op = "add_layer"
//! name = "Ink"
//!
//! [[edit]]
//! op = "fill"
//! layer = "Ink"
//! rect = { x = 0, y = 0, width = 8, height = 8 }
//! color = [255, 0, 0, 255]
//! group = true
//! ```
//!
//! Consecutive steps marked `group = true` are written as one undo step.

use std::path::{Path, PathBuf};

use layerpaint_core::{
    blend::BlendMode,
    commands::CommandError,
    config::QueueConfig,
    history::HistoryError,
    io::IoError,
    queue::{writer::CommandQueueWriter, DocumentCommandQueue},
    raster::{Axis, ChannelLayout, RasterError, Rect},
    state::{Document, LayerID},
    util::UnitF32,
};

#[derive(thiserror::Error, Debug)]
pub enum ScriptError {
    #[error("reading script: {0}")]
    Read(#[from] std::io::Error),
    #[error("parsing script: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("a script names exactly one of `source` or `blank`")]
    Canvas,
    #[error("no layer {0}")]
    NoSuchLayer(LayerRef),
    #[error("undo and redo can't be grouped")]
    HistoryInGroup,
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error("step {index}: {source}")]
    Step {
        index: usize,
        source: Box<ScriptError>,
    },
}

#[derive(serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

/// A layer, by its index from the bottom or by name. Names find the top-most match.
#[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum LayerRef {
    Index(usize),
    Name(String),
}
impl std::fmt::Display for LayerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(index) => write!(f, "#{index}"),
            Self::Name(name) => write!(f, "{name:?}"),
        }
    }
}
impl LayerRef {
    fn resolve(&self, document: &Document) -> Result<LayerID, ScriptError> {
        let layers = document.layers();
        let found = match self {
            Self::Index(index) => layers.at(*index),
            Self::Name(name) => layers.iter().rev().find(|layer| layer.name() == name),
        };
        found
            .map(layerpaint_core::state::Layer::id)
            .ok_or_else(|| ScriptError::NoSuchLayer(self.clone()))
    }
}

fn one() -> usize {
    1
}

#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    /// Add a layer on top, filled with `color`, or transparent black by default.
    AddLayer {
        name: String,
        #[serde(default)]
        layout: Option<ChannelLayout>,
        #[serde(default)]
        color: Option<Vec<u8>>,
    },
    DeleteLayer {
        layer: LayerRef,
    },
    MoveLayer {
        layer: LayerRef,
        to: usize,
    },
    Rename {
        layer: LayerRef,
        name: String,
    },
    Visible {
        layer: LayerRef,
        visible: bool,
    },
    Opacity {
        layer: LayerRef,
        opacity: UnitF32,
    },
    Blend {
        layer: LayerRef,
        mode: BlendMode,
    },
    /// Fill `rect`, or the whole layer, with one pixel in the layer's layout.
    Fill {
        layer: LayerRef,
        #[serde(default)]
        rect: Option<Rect>,
        color: Vec<u8>,
    },
    Flip {
        layer: LayerRef,
        axis: Axis,
    },
    Convert {
        layer: LayerRef,
        layout: ChannelLayout,
    },
    Undo {
        #[serde(default = "one")]
        steps: usize,
    },
    Redo {
        #[serde(default = "one")]
        steps: usize,
    },
}

#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Step {
    #[serde(flatten)]
    pub op: Op,
    #[serde(default)]
    pub group: bool,
}

#[derive(serde::Deserialize, Debug)]
pub struct Script {
    /// Relative paths are resolved against this.
    #[serde(skip)]
    base: PathBuf,
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default)]
    pub blank: Option<Canvas>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub edit: Vec<Step>,
}
impl Script {
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let string = std::fs::read_to_string(path)?;
        let base = path.parent().map(Path::to_owned).unwrap_or_default();
        Self::parse(&string, base)
    }
    pub fn parse(string: &str, base: PathBuf) -> Result<Self, ScriptError> {
        let mut script: Self = toml::from_str(string)?;
        script.base = base;
        Ok(script)
    }
    /// Where to store the result, if anywhere.
    #[must_use]
    pub fn output(&self) -> Option<PathBuf> {
        self.output.as_ref().map(|output| self.base.join(output))
    }
    /// Create the queue holding the script's starting canvas.
    pub fn open(&self, config: &QueueConfig) -> Result<DocumentCommandQueue, ScriptError> {
        match (&self.source, self.blank) {
            (Some(source), None) => Ok(DocumentCommandQueue::open(self.base.join(source), config)?),
            (None, Some(Canvas { width, height })) => {
                Ok(DocumentCommandQueue::new_blank(width, height, config)?)
            }
            _ => Err(ScriptError::Canvas),
        }
    }
    /// Perform every step, stopping at the first failure. Steps before it stay applied.
    pub fn play(&self, queue: &DocumentCommandQueue) -> Result<(), ScriptError> {
        let mut steps = self.edit.iter().enumerate().peekable();
        while let Some((index, step)) = steps.next() {
            let wrap = |source: ScriptError| ScriptError::Step {
                index,
                source: Box::new(source),
            };
            match step.op {
                Op::Undo { steps: count } if !step.group => {
                    queue.undo_n(count).map_err(|e| wrap(e.into()))?;
                    continue;
                }
                Op::Redo { steps: count } if !step.group => {
                    queue.redo_n(count).map_err(|e| wrap(e.into()))?;
                    continue;
                }
                _ => (),
            }
            let mut batch = vec![&step.op];
            if step.group {
                while let Some((_, next)) = steps.next_if(|(_, next)| next.group) {
                    batch.push(&next.op);
                }
            }
            log::debug!("Step {index}: writing {} op(s)", batch.len());
            queue
                .write_with(|writer| batch.iter().try_for_each(|op| apply(writer, op)))
                .map_err(wrap)?;
        }
        Ok(())
    }
}

fn apply(writer: &mut CommandQueueWriter<'_>, op: &Op) -> Result<(), ScriptError> {
    match op {
        Op::AddLayer {
            name,
            layout,
            color,
        } => {
            let layout = layout.unwrap_or(ChannelLayout::Rgba);
            let pixel = color
                .clone()
                .unwrap_or_else(|| vec![0; layout.channels()]);
            writer
                .layers()
                .create_filled(name.clone(), layout, &pixel)?;
        }
        Op::DeleteLayer { layer } => {
            let target = layer.resolve(writer.document())?;
            writer.layers().delete(target)?;
        }
        Op::MoveLayer { layer, to } => {
            let target = layer.resolve(writer.document())?;
            writer.layers().reorder(target, *to)?;
        }
        Op::Rename { layer, name } => {
            let target = layer.resolve(writer.document())?;
            writer.layers().rename(target, name.clone())?;
        }
        Op::Visible { layer, visible } => {
            let target = layer.resolve(writer.document())?;
            writer.layers().set_visible(target, *visible)?;
        }
        Op::Opacity { layer, opacity } => {
            let target = layer.resolve(writer.document())?;
            writer.layers().set_opacity(target, *opacity)?;
        }
        Op::Blend { layer, mode } => {
            let target = layer.resolve(writer.document())?;
            writer.layers().set_blend_mode(target, *mode)?;
        }
        Op::Fill { layer, rect, color } => {
            let target = layer.resolve(writer.document())?;
            let [width, height] = writer.document().size();
            let region = rect.unwrap_or(Rect::new(0, 0, width, height));
            writer.raster(target)?.fill(region, color)?;
        }
        Op::Flip { layer, axis } => {
            let target = layer.resolve(writer.document())?;
            writer.raster(target)?.flip(*axis)?;
        }
        Op::Convert { layer, layout } => {
            let target = layer.resolve(writer.document())?;
            writer.raster(target)?.convert(*layout)?;
        }
        Op::Undo { .. } | Op::Redo { .. } => return Err(ScriptError::HistoryInGroup),
    }
    Ok(())
}
