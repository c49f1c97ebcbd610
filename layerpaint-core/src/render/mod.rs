//! # Render
//!
//! Turns document snapshots into displayable [`Surface`]s. The [`Renderer`] remembers the last surface
//! of each document and only composites again once the document's version moves.

pub mod canvas;
pub mod compose;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::{
    raster::{ChannelLayout, Raster, RasterError},
    state::{Document, DocumentID, DocumentSnapshot, Version},
};

/// The flattened image of a document at one version. Straight RGBA8.
pub struct Surface {
    document: DocumentID,
    version: Version,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}
impl Surface {
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
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * 4;
        let pixel = self.pixels.get(start..start + 4)?;
        pixel.try_into().ok()
    }
    pub fn to_raster(&self) -> Result<Raster, RasterError> {
        Raster::from_raw(self.width, self.height, ChannelLayout::Rgba, self.pixels.clone())
    }
}
impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("document", &self.document)
            .field("version", &self.version)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// The cached surface of one document, behind its own lock.
type Slot = Arc<parking_lot::Mutex<Option<Arc<Surface>>>>;

#[derive(Default)]
pub struct Renderer {
    /// Last surface of each document. Only valid for the version it carries.
    cache: parking_lot::Mutex<hashbrown::HashMap<DocumentID, Slot>>,
    composites: AtomicU64,
}
impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    fn slot(&self, document: DocumentID) -> Slot {
        self.cache.lock().entry(document).or_default().clone()
    }
    /// Get the surface for exactly this snapshot, compositing only if the cache is stale.
    pub fn render(&self, snapshot: &DocumentSnapshot) -> Arc<Surface> {
        let slot = self.slot(snapshot.document());
        // Held across the composite, so concurrent renders of one version composite once.
        // Other documents are not blocked.
        let mut cached = slot.lock();
        if let Some(surface) = cached.as_ref() {
            if surface.version == snapshot.version() {
                log::debug!("Render cache hit for {} {}", snapshot.document(), snapshot.version());
                return surface.clone();
            }
        }
        log::debug!("Compositing {} {}", snapshot.document(), snapshot.version());
        let [width, height] = snapshot.size();
        let surface = Arc::new(Surface {
            document: snapshot.document(),
            version: snapshot.version(),
            width,
            height,
            pixels: compose::flatten(snapshot),
        });
        self.composites.fetch_add(1, Ordering::Relaxed);
        *cached = Some(surface.clone());
        surface
    }
    pub fn render_document(&self, document: &Document) -> Arc<Surface> {
        self.render(&document.snapshot())
    }
    /// How many times a surface was actually composited, as opposed to served from cache.
    #[must_use]
    pub fn composite_count(&self) -> u64 {
        self.composites.load(Ordering::Relaxed)
    }
    #[must_use]
    pub fn cached_version(&self, document: DocumentID) -> Option<Version> {
        let slot = self.cache.lock().get(&document).cloned()?;
        let version = slot.lock().as_ref().map(|surface| surface.version);
        version
    }
    /// Forget the cached surface of a document. Returns whether there was one.
    pub fn evict(&self, document: DocumentID) -> bool {
        let slot = self.cache.lock().remove(&document);
        slot.is_some_and(|slot| slot.lock().is_some())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::Renderer;
    use crate::{
        commands::{Command, LayerCommand},
        state::Document,
    };

    #[test]
    fn cache_hits_share() {
        let renderer = Renderer::new();
        let document = Document::blank(3, 3).unwrap();
        let a = renderer.render_document(&document);
        let b = renderer.render_document(&document);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(renderer.composite_count(), 1);
        assert_eq!(a.pixel(2, 2), Some([255; 4]));
        assert_eq!(a.pixel(3, 0), None);
        assert_eq!(renderer.cached_version(document.id()), Some(document.version()));
    }
    #[test]
    fn new_versions_recomposite() {
        let renderer = Renderer::new();
        let mut document = Document::blank(2, 2).unwrap();
        let stale = renderer.render_document(&document);
        let target = document.layers().at(0).unwrap().id();
        let hide: Command = LayerCommand::set_visible(document.layers(), target, false)
            .unwrap()
            .into();
        hide.apply(&mut document).unwrap();

        let fresh = renderer.render_document(&document);
        assert_eq!(renderer.composite_count(), 2);
        assert_eq!(fresh.version(), document.version());
        assert_eq!(fresh.pixel(0, 0), Some([0; 4]));
        assert_eq!(stale.pixel(0, 0), Some([255; 4]));

        assert!(renderer.evict(document.id()));
        assert!(!renderer.evict(document.id()));
        renderer.render_document(&document);
        assert_eq!(renderer.composite_count(), 3);
    }
    #[test]
    fn documents_cache_separately() {
        let renderer = Renderer::new();
        let a = Document::blank(1, 1).unwrap();
        let b = Document::blank(1, 1).unwrap();
        renderer.render_document(&a);
        renderer.render_document(&b);
        renderer.render_document(&a);
        assert_eq!(renderer.composite_count(), 2);
    }
    #[test]
    fn busy_documents_dont_block_others() {
        let renderer = Renderer::new();
        let a = Document::blank(1, 1).unwrap();
        let b = Document::blank(1, 1).unwrap();
        renderer.render_document(&a);
        let slot = renderer.slot(a.id());
        let _busy = slot.lock();
        // Would deadlock if every document shared one lock.
        let surface = renderer.render_document(&b);
        assert_eq!(surface.document(), b.id());
        assert_eq!(renderer.composite_count(), 2);
    }
    #[test]
    fn parallel_renders_composite_once_each() {
        let renderer = Renderer::new();
        let documents = [Document::blank(8, 8).unwrap(), Document::blank(8, 8).unwrap()];
        std::thread::scope(|scope| {
            for _ in 0..4 {
                for document in &documents {
                    let renderer = &renderer;
                    scope.spawn(move || renderer.render_document(document));
                }
            }
        });
        assert_eq!(renderer.composite_count(), 2);
        for document in &documents {
            assert_eq!(renderer.cached_version(document.id()), Some(document.version()));
        }
    }
}
