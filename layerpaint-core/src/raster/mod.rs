//! # Rasters
//!
//! Packed, row-major 8-bit pixel buffers in one of the [`ChannelLayout`]s. Every region operation checks
//! bounds and lengths before touching a byte, so a failed operation leaves the raster untouched.

pub mod layout;

pub use layout::ChannelLayout;

/// An axis-aligned pixel rectangle, extending right and down from `(x, y)`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
impl Rect {
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
    #[must_use]
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
    /// Whether this rect lies entirely within a `width` by `height` image.
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height)
    }
}
impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::AsRefStr, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Axis {
    /// Mirror left-to-right.
    Horizontal,
    /// Mirror top-to-bottom.
    Vertical,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    #[error("region {region} out of bounds of {width}x{height} raster")]
    OutOfBounds { region: Rect, width: u32, height: u32 },
    #[error("expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("raster dimensions overflow")]
    TooLarge,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    layout: ChannelLayout,
    data: Vec<u8>,
}
impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}
impl Raster {
    fn byte_len(width: u32, height: u32, layout: ChannelLayout) -> Result<usize, RasterError> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(layout.channels()))
            .ok_or(RasterError::TooLarge)
    }
    /// Create a raster with every pixel set to `pixel`, which must be one pixel in `layout`.
    pub fn filled(
        width: u32,
        height: u32,
        layout: ChannelLayout,
        pixel: &[u8],
    ) -> Result<Self, RasterError> {
        if pixel.len() != layout.channels() {
            return Err(RasterError::SizeMismatch {
                expected: layout.channels(),
                actual: pixel.len(),
            });
        }
        let len = Self::byte_len(width, height, layout)?;
        let data = pixel.iter().copied().cycle().take(len).collect();
        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }
    /// Create a raster of all zeros: black, and transparent if `layout` has alpha.
    pub fn zeroed(width: u32, height: u32, layout: ChannelLayout) -> Result<Self, RasterError> {
        let len = Self::byte_len(width, height, layout)?;
        Ok(Self {
            width,
            height,
            layout,
            data: vec![0; len],
        })
    }
    /// Wrap existing packed pixel data.
    pub fn from_raw(
        width: u32,
        height: u32,
        layout: ChannelLayout,
        data: Vec<u8>,
    ) -> Result<Self, RasterError> {
        let expected = Self::byte_len(width, height, layout)?;
        if data.len() != expected {
            return Err(RasterError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
    #[must_use]
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
    fn check_bounds(&self, region: Rect) -> Result<(), RasterError> {
        if region.fits_within(self.width, self.height) {
            Ok(())
        } else {
            Err(RasterError::OutOfBounds {
                region,
                width: self.width,
                height: self.height,
            })
        }
    }
    /// Bytes a copy of `region` occupies in this raster's layout. Fails if `region` is out of bounds.
    pub fn region_len(&self, region: Rect) -> Result<usize, RasterError> {
        self.check_bounds(region)?;
        // Bounded by the data length.
        Ok(region.area() * self.layout.channels())
    }
    fn row_stride(&self) -> usize {
        self.width as usize * self.layout.channels()
    }
    /// Byte range of each row of `region`, top to bottom.
    fn region_rows(&self, region: Rect) -> Result<impl Iterator<Item = std::ops::Range<usize>>, RasterError> {
        self.check_bounds(region)?;
        let channels = self.layout.channels();
        let stride = self.row_stride();
        let row_len = region.width as usize * channels;
        let start_x = region.x as usize * channels;
        Ok((region.y..region.y + region.height).map(move |y| {
            let start = y as usize * stride + start_x;
            start..start + row_len
        }))
    }
    /// Get a single pixel, or None if out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let channels = self.layout.channels();
        let start = y as usize * self.row_stride() + x as usize * channels;
        self.data.get(start..start + channels)
    }
    /// Copy the pixels of `region` out into a packed buffer.
    pub fn read_region(&self, region: Rect) -> Result<Box<[u8]>, RasterError> {
        let mut out = Vec::with_capacity(self.region_len(region)?);
        for row in self.region_rows(region)? {
            out.extend_from_slice(&self.data[row]);
        }
        Ok(out.into_boxed_slice())
    }
    /// Check whether `region` holds exactly `pixels`. Out-of-bounds or wrongly sized input compares unequal.
    #[must_use]
    pub fn region_eq(&self, region: Rect, pixels: &[u8]) -> bool {
        match self.region_len(region) {
            Ok(len) if len == pixels.len() => (),
            _ => return false,
        }
        let Ok(rows) = self.region_rows(region) else {
            return false;
        };
        let row_len = region.width as usize * self.layout.channels();
        rows.zip(pixels.chunks(row_len.max(1)))
            .all(|(row, expected)| &self.data[row] == expected)
    }
    /// Overwrite `region` with packed `pixels`.
    pub fn write_region(&mut self, region: Rect, pixels: &[u8]) -> Result<(), RasterError> {
        let expected = self.region_len(region)?;
        if pixels.len() != expected {
            return Err(RasterError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        let rows: Vec<_> = self.region_rows(region)?.collect();
        let row_len = region.width as usize * self.layout.channels();
        for (row, src) in rows.into_iter().zip(pixels.chunks(row_len.max(1))) {
            self.data[row].copy_from_slice(src);
        }
        Ok(())
    }
    /// Mirror the whole raster along `axis`. Applying twice is the identity.
    pub fn flip(&mut self, axis: Axis) {
        let channels = self.layout.channels();
        let stride = self.row_stride();
        if stride == 0 {
            return;
        }
        match axis {
            Axis::Horizontal => {
                for row in self.data.chunks_exact_mut(stride) {
                    let width = row.len() / channels;
                    for x in 0..width / 2 {
                        let mirror = width - 1 - x;
                        for c in 0..channels {
                            row.swap(x * channels + c, mirror * channels + c);
                        }
                    }
                }
            }
            Axis::Vertical => {
                let height = self.height as usize;
                for y in 0..height / 2 {
                    let (top, bottom) = self.data.split_at_mut((height - 1 - y) * stride);
                    top[y * stride..(y + 1) * stride].swap_with_slice(&mut bottom[..stride]);
                }
            }
        }
    }
    /// A copy of this raster in another layout.
    #[must_use]
    pub fn converted(&self, layout: ChannelLayout) -> Self {
        Self {
            width: self.width,
            height: self.height,
            layout,
            data: layout::convert(&self.data, self.layout, layout),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Axis, ChannelLayout, Raster, RasterError, Rect};

    fn counting(width: u32, height: u32) -> Raster {
        let data = (0..(width * height)).map(|v| v as u8).collect();
        Raster::from_raw(width, height, ChannelLayout::Gray, data).unwrap()
    }

    #[test]
    fn from_raw_checks_length() {
        assert_eq!(
            Raster::from_raw(2, 2, ChannelLayout::Rgb, vec![0; 11]),
            Err(RasterError::SizeMismatch {
                expected: 12,
                actual: 11
            })
        );
    }
    #[test]
    fn regions() {
        let mut raster = counting(4, 3);
        let region = Rect::new(1, 1, 2, 2);
        assert_eq!(&*raster.read_region(region).unwrap(), &[5, 6, 9, 10]);
        assert!(raster.region_eq(region, &[5, 6, 9, 10]));
        assert!(!raster.region_eq(region, &[5, 6, 9]));

        raster.write_region(region, &[0, 0, 0, 0]).unwrap();
        assert_eq!(raster.pixel(1, 1), Some(&[0][..]));
        assert_eq!(raster.pixel(3, 1), Some(&[7][..]));
        assert_eq!(raster.pixel(4, 0), None);
    }
    #[test]
    fn rejected_writes_change_nothing() {
        let mut raster = counting(4, 3);
        let before = raster.clone();
        assert!(matches!(
            raster.write_region(Rect::new(3, 0, 2, 1), &[1, 1]),
            Err(RasterError::OutOfBounds { .. })
        ));
        assert!(matches!(
            raster.write_region(Rect::new(0, 0, 2, 1), &[1, 1, 1]),
            Err(RasterError::SizeMismatch { .. })
        ));
        assert!(raster.read_region(Rect::new(u32::MAX, 0, 2, 1)).is_err());
        assert!(matches!(
            raster.region_len(Rect::new(0, 0, u32::MAX, u32::MAX)),
            Err(RasterError::OutOfBounds { .. })
        ));
        assert!(!raster.region_eq(Rect::new(0, 0, u32::MAX, u32::MAX), &[]));
        assert_eq!(raster, before);
    }
    #[test]
    fn flips() {
        let mut raster = counting(3, 2);
        raster.flip(Axis::Horizontal);
        assert_eq!(raster.data(), &[2, 1, 0, 5, 4, 3]);
        raster.flip(Axis::Vertical);
        assert_eq!(raster.data(), &[5, 4, 3, 2, 1, 0]);

        let mut color = Raster::from_raw(2, 1, ChannelLayout::Rgb, vec![1, 2, 3, 4, 5, 6]).unwrap();
        color.flip(Axis::Horizontal);
        assert_eq!(color.data(), &[4, 5, 6, 1, 2, 3]);
    }
    #[test]
    fn filled_and_converted() {
        let raster = Raster::filled(2, 1, ChannelLayout::Gray, &[128]).unwrap();
        let rgba = raster.converted(ChannelLayout::Rgba);
        assert_eq!(rgba.data(), &[128, 128, 128, 255, 128, 128, 128, 255]);
        assert!(Raster::filled(1, 1, ChannelLayout::Rgb, &[0; 4]).is_err());
    }
}
