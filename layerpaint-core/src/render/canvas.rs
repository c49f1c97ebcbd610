use std::sync::Arc;

use super::{Renderer, Surface};
use crate::queue::{DocumentCommandListener, ListenerError};

/// Keeps an up-to-date image of one document for display.
///
/// Renders at most once per observed version. Changes that land between two refreshes are drawn
/// together, as one render of the newest state.
/// The versions in between are skipped on purpose and never rendered, so a slow consumer only
/// ever sees the latest frame.
pub struct CanvasSurface {
    listener: DocumentCommandListener,
    renderer: Arc<Renderer>,
    current: Option<Arc<Surface>>,
}
impl CanvasSurface {
    #[must_use]
    pub fn new(listener: DocumentCommandListener, renderer: Arc<Renderer>) -> Self {
        Self {
            listener,
            renderer,
            current: None,
        }
    }
    /// The most recently rendered frame, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Arc<Surface>> {
        self.current.as_ref()
    }
    /// Render if the document has moved on since the last frame.
    /// Returns the new frame, or None if the current one is still accurate.
    pub fn refresh(&mut self) -> Result<Option<Arc<Surface>>, ListenerError> {
        if self.current.is_some() && !self.listener.is_behind()? {
            return Ok(None);
        }
        let snapshot = self.listener.forward_snapshot()?;
        let surface = self.renderer.render(&snapshot);
        self.current = Some(surface.clone());
        Ok(Some(surface))
    }
    /// Wait until there is something new to show, and render it.
    pub async fn next_frame(&mut self) -> Result<Arc<Surface>, ListenerError> {
        loop {
            if let Some(frame) = self.refresh()? {
                return Ok(frame);
            }
            self.listener.changed().await?;
        }
    }
}
