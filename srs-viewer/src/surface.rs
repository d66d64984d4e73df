//! Terminal rendering surface.
//!
//! Frames land here as a ratatui-image protocol object, re-encoded
//! for whatever graphics protocol the terminal supports: Sixel,
//! Kitty, iTerm2, or halfblock cells as the universal fallback.

use ratatui_image::picker::{Picker, ProtocolType};
use ratatui_image::protocol::StatefulProtocol;
use tracing::debug;

use srs_core::{ClickPoint, DecodedFrame, MarkerColor, RenderSurface};

// ── TerminalSurface ──────────────────────────────────────────────

/// The viewer's one rendering surface.
///
/// Owned by the frame renderer; each presented frame replaces the
/// previous protocol object wholesale. Calibration markers are kept
/// separately and overlaid at draw time.
pub struct TerminalSurface {
    picker: Picker,
    protocol: Option<StatefulProtocol>,
    native_size: (u32, u32),
    markers: Vec<(ClickPoint, MarkerColor)>,
}

impl TerminalSurface {
    pub fn new(picker: Picker) -> Self {
        Self {
            picker,
            protocol: None,
            native_size: (0, 0),
            markers: Vec::new(),
        }
    }

    /// The current frame's protocol object, for the image widget.
    pub fn protocol_mut(&mut self) -> Option<&mut StatefulProtocol> {
        self.protocol.as_mut()
    }

    /// Markers placed since the last clear, oldest first.
    pub fn markers(&self) -> &[(ClickPoint, MarkerColor)] {
        &self.markers
    }

    pub fn clear_markers(&mut self) {
        self.markers.clear();
    }
}

impl RenderSurface for TerminalSurface {
    fn native_size(&self) -> (u32, u32) {
        self.native_size
    }

    fn present(&mut self, frame: &DecodedFrame) {
        self.native_size = (frame.width, frame.height);
        self.protocol = Some(self.picker.new_resize_protocol(frame.image.clone()));
    }

    fn place_marker(&mut self, point: ClickPoint, color: MarkerColor) {
        self.markers.push((point, color));
    }
}

// ── Picker creation ──────────────────────────────────────────────

/// Create a Picker by querying terminal capabilities.
///
/// If `force` names a protocol, detection is skipped. Must be called
/// BEFORE entering raw mode / the alternate screen, since the query
/// talks to the terminal over stdio.
pub fn create_picker(force: Option<&str>) -> Picker {
    if let Some(name) = force {
        let proto = match name.to_lowercase().as_str() {
            "sixel" => Some(ProtocolType::Sixel),
            "kitty" => Some(ProtocolType::Kitty),
            "iterm2" | "iterm" => Some(ProtocolType::Iterm2),
            "halfblocks" | "half" | "text" => Some(ProtocolType::Halfblocks),
            other => {
                debug!("unknown graphics protocol {other:?}, auto-detecting");
                None
            }
        };
        if let Some(proto) = proto {
            let mut picker = Picker::halfblocks();
            picker.set_protocol_type(proto);
            return picker;
        }
    }

    match Picker::from_query_stdio() {
        Ok(picker) => picker,
        Err(_) => Picker::halfblocks(),
    }
}
