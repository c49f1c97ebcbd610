//! Channel layouts and conversion between them.
//!
//! Conversion is total: every buffer converts, and a trailing partial pixel is ignored.
//! * Gray expands to color by replicating its channel.
//! * Adding alpha fills it fully opaque.
//! * Color reduces to gray by integer Rec.601 luma.
//! * Removing alpha discards it.

#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    strum::AsRefStr,
    strum::EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChannelLayout {
    Gray,
    Rgb,
    Rgba,
}
impl ChannelLayout {
    /// Number of 8-bit channels per pixel.
    #[must_use]
    pub const fn channels(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
    #[must_use]
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba)
    }
}

/// Integer Rec.601 luma, rounded.
#[must_use]
pub fn luma([r, g, b]: [u8; 3]) -> u8 {
    let weighted = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    // Max is 255_000 + 500, which divides back into u8 range.
    ((weighted + 500) / 1000) as u8
}

/// Expand one pixel of `layout` into straight RGBA.
///
/// # Panics
/// If `pixel` is shorter than `layout.channels()`.
#[must_use]
pub fn to_rgba(pixel: &[u8], layout: ChannelLayout) -> [u8; 4] {
    match layout {
        ChannelLayout::Gray => [pixel[0], pixel[0], pixel[0], u8::MAX],
        ChannelLayout::Rgb => [pixel[0], pixel[1], pixel[2], u8::MAX],
        ChannelLayout::Rgba => [pixel[0], pixel[1], pixel[2], pixel[3]],
    }
}

/// Write an RGBA pixel into `out` in the given layout. `out` must be exactly `layout.channels()` long.
pub fn from_rgba([r, g, b, a]: [u8; 4], layout: ChannelLayout, out: &mut [u8]) {
    match layout {
        ChannelLayout::Gray => out[0] = luma([r, g, b]),
        ChannelLayout::Rgb => out.copy_from_slice(&[r, g, b]),
        ChannelLayout::Rgba => out.copy_from_slice(&[r, g, b, a]),
    }
}

/// Convert a packed buffer of pixels from one layout to another.
#[must_use]
pub fn convert(data: &[u8], from: ChannelLayout, to: ChannelLayout) -> Vec<u8> {
    let pixels = data.len() / from.channels();
    if from == to {
        return data[..pixels * from.channels()].to_vec();
    }
    let mut out = vec![0; pixels * to.channels()];
    for (src, dst) in data
        .chunks_exact(from.channels())
        .zip(out.chunks_exact_mut(to.channels()))
    {
        from_rgba(to_rgba(src, from), to, dst);
    }
    out
}
