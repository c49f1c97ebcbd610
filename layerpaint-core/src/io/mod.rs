//! # Image IO
//!
//! Loading and storing flat image files at the document boundary. Whatever the file's pixel format,
//! a loaded document holds 8-bit Gray, Rgb or Rgba. Stores are atomic: the target is either replaced
//! completely or left alone.

use std::path::{Path, PathBuf};

use crate::{
    raster::{layout, ChannelLayout, Raster, RasterError},
    render::compose,
    state::{Document, DocumentSnapshot},
};

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),
    #[error("reading {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("decoding {}: {source}", .path.display())]
    DecodeFailed {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("unsupported image format of {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error("encoding: {0}")]
    EncodeFailed(image::ImageError),
    #[error("writing {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Read and decode an image file into a new document with a single layer.
pub fn load(path: impl AsRef<Path>) -> Result<Document, IoError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => IoError::NotFound(path.to_owned()),
        _ => IoError::ReadFailed {
            path: path.to_owned(),
            source,
        },
    })?;
    let format =
        image::guess_format(&bytes).map_err(|_| IoError::UnsupportedFormat(path.to_owned()))?;
    let image = image::load_from_memory_with_format(&bytes, format).map_err(|source| {
        IoError::DecodeFailed {
            path: path.to_owned(),
            source,
        }
    })?;
    log::info!(
        "Loaded {} ({format:?}, {:?}, {}x{})",
        path.display(),
        image.color(),
        image.width(),
        image.height()
    );
    let raster = normalize(image)?;
    Ok(Document::from_raster(raster, Some(path.to_owned())))
}

/// Reduce any decoded image to the nearest 8-bit layout. Alpha is kept if present, color is kept if present.
pub fn normalize(image: image::DynamicImage) -> Result<Raster, RasterError> {
    let (width, height) = (image.width(), image.height());
    let color = image.color();
    let (layout, data) = match (color.has_color(), color.has_alpha()) {
        (_, true) => (ChannelLayout::Rgba, image.into_rgba8().into_raw()),
        (true, false) => (ChannelLayout::Rgb, image.into_rgb8().into_raw()),
        (false, false) => (ChannelLayout::Gray, image.into_luma8().into_raw()),
    };
    Raster::from_raw(width, height, layout, data)
}

/// Flatten the document as it is now and store it at `path`, in the format named by its extension.
/// The document is untouched, including its path.
pub fn store(document: &Document, path: impl AsRef<Path>) -> Result<(), IoError> {
    store_snapshot(&document.snapshot(), path)
}

/// Flatten and store a snapshot at `path`, in the format named by its extension.
pub fn store_snapshot(snapshot: &DocumentSnapshot, path: impl AsRef<Path>) -> Result<(), IoError> {
    let path = path.as_ref();
    let format = image::ImageFormat::from_path(path)
        .map_err(|_| IoError::UnsupportedFormat(path.to_owned()))?;
    let [width, height] = snapshot.size();
    let rgba = compose::flatten(snapshot);
    let (pixels, color) = if supports_alpha(format) {
        (rgba, image::ExtendedColorType::Rgba8)
    } else {
        (
            layout::convert(&rgba, ChannelLayout::Rgba, ChannelLayout::Rgb),
            image::ExtendedColorType::Rgb8,
        )
    };

    let mut encoded = std::io::Cursor::new(Vec::new());
    image::write_buffer_with_format(&mut encoded, &pixels, width, height, color, format)
        .map_err(IoError::EncodeFailed)?;
    let encoded = encoded.into_inner();

    write_atomic(path, &encoded).map_err(|source| IoError::WriteFailed {
        path: path.to_owned(),
        source,
    })?;
    log::info!(
        "Stored {} {} as {format:?} to {} ({})",
        snapshot.document(),
        snapshot.version(),
        path.display(),
        human_bytes::human_bytes(encoded.len() as f64)
    );
    Ok(())
}

fn supports_alpha(format: image::ImageFormat) -> bool {
    !matches!(format, image::ImageFormat::Jpeg)
}

/// Write into a sibling temporary file, and move it over `path` only once complete.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
