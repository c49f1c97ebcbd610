use crate::util::UnitF32;

#[derive(
    strum::AsRefStr,
    PartialEq,
    Eq,
    strum::EnumIter,
    Copy,
    Clone,
    Hash,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
    Multiply,
}
impl BlendMode {
    /// Blend a straight (non-premultiplied) source channel onto a destination channel, both in `[0, 1]`.
    #[must_use]
    pub fn apply(self, src: f32, dst: f32) -> f32 {
        match self {
            Self::Normal => src,
            Self::Add => (src + dst).min(1.0),
            Self::Multiply => src * dst,
        }
    }
}

/// How a layer is combined with the layers beneath it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Blend {
    pub mode: BlendMode,
    pub opacity: UnitF32,
}
impl Blend {
    #[must_use]
    pub fn with_opacity(self, opacity: UnitF32) -> Self {
        Self { opacity, ..self }
    }
    #[must_use]
    pub fn with_mode(self, mode: BlendMode) -> Self {
        Self { mode, ..self }
    }
}
