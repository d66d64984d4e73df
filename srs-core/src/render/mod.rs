//! Frame presentation pipeline.
//!
//! [`FrameRenderer`] owns the rendering surface and the FPS counter.
//! Each frame replaces the previous contents entirely: no partial
//! updates, no double buffering beyond what decoding implies. A late
//! frame landing after a reconnect is therefore a harmless overwrite.

pub mod decoder;
pub mod fps;

use bytes::Bytes;
use tokio::task;

use crate::calibration::{ClickPoint, MarkerColor};
use crate::error::SrsError;

use self::decoder::DecodedFrame;
use self::fps::FpsCounter;

// ── RenderSurface ────────────────────────────────────────────────

/// Where decoded frames land.
///
/// Exactly one [`FrameRenderer`] writes to a surface; other
/// components only observe it or request actions through the owner.
pub trait RenderSurface {
    /// Native pixel dimensions of the surface content, `(0, 0)` until
    /// the first frame arrives.
    fn native_size(&self) -> (u32, u32);

    /// Replace the surface contents with `frame`.
    fn present(&mut self, frame: &DecodedFrame);

    /// Overlay a calibration marker. Observational only.
    fn place_marker(&mut self, point: ClickPoint, color: MarkerColor);
}

// ── FrameRenderer ────────────────────────────────────────────────

/// Decodes and presents frames, keeping the FPS statistic.
pub struct FrameRenderer<S: RenderSurface> {
    surface: S,
    fps: FpsCounter,
    displayed_fps: Option<u32>,
}

impl<S: RenderSurface> FrameRenderer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            fps: FpsCounter::new(),
            displayed_fps: None,
        }
    }

    /// Decode `payload` off the async thread and draw it.
    ///
    /// A decode failure drops the frame: the error comes back for
    /// logging, the previous contents stay on the surface, and the
    /// next frame simply supersedes it. Returns the fresh FPS figure
    /// when a window closes.
    pub async fn render_frame(&mut self, payload: Bytes) -> Result<Option<u32>, SrsError> {
        let decoded = task::spawn_blocking(move || DecodedFrame::decode(&payload))
            .await
            .map_err(|e| SrsError::Other(format!("decode task failed: {e}")))??;

        self.surface.present(&decoded);

        let published = self.fps.record();
        if published.is_some() {
            self.displayed_fps = published;
        }
        Ok(published)
    }

    /// Most recently published FPS figure.
    pub fn displayed_fps(&self) -> Option<u32> {
        self.displayed_fps
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

// ── Tests ────────────────────────────────────────────────────────
