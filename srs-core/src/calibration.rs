//! Operator-driven region calibration.
//!
//! The operator clicks the four corners of the desired capture region
//! on the rendered image. The suggested order is top-left, top-right,
//! bottom-right, bottom-left, but nothing depends on it: the region
//! is the axis-aligned bounding box of the points, whatever sequence
//! they arrive in.
//!
//! Click positions arrive in display coordinates and are scaled into
//! the surface's native resolution, each axis independently, since
//! layout may stretch the two differently.

use crate::protocol::RegionConfig;

/// Points per completed calibration.
pub const REQUIRED_POINTS: usize = 4;

// ── ClickPoint ───────────────────────────────────────────────────

/// One corner click, in surface-native coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickPoint {
    pub x: f64,
    pub y: f64,
}

// ── MarkerColor ──────────────────────────────────────────────────

/// Marker colour for a placed point: green for odd-numbered points,
/// red for even. Purely observational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerColor {
    Green,
    Red,
}

// ── SurfaceGeometry ──────────────────────────────────────────────

/// How the surface is currently laid out: native pixel dimensions
/// versus the size it is displayed at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceGeometry {
    pub native_width: f64,
    pub native_height: f64,
    pub displayed_width: f64,
    pub displayed_height: f64,
}

impl SurfaceGeometry {
    /// Map a pointer position from display space into native space,
    /// one scale factor per axis.
    pub fn to_native(&self, display_x: f64, display_y: f64) -> ClickPoint {
        ClickPoint {
            x: display_x * (self.native_width / self.displayed_width),
            y: display_y * (self.native_height / self.displayed_height),
        }
    }
}

// ── ClickOutcome ─────────────────────────────────────────────────

/// Result of one click while calibration is active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickOutcome {
    /// Point recorded; more corners to go.
    Marked {
        point: ClickPoint,
        color: MarkerColor,
    },
    /// Fourth point recorded; the session is finished and discarded.
    /// The region is ready to send upstream.
    Completed {
        point: ClickPoint,
        color: MarkerColor,
        region: RegionConfig,
    },
}

// ── CalibrationEngine ────────────────────────────────────────────

/// Two-state engine: Inactive (no session) or Active (collecting up
/// to four points). The point sequence is the only mutable state and
/// never outlives the Active phase.
#[derive(Debug, Default)]
pub struct CalibrationEngine {
    session: Option<Vec<ClickPoint>>,
}

impl CalibrationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether clicks are currently being collected.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Points collected so far in the active session.
    pub fn collected(&self) -> usize {
        self.session.as_ref().map_or(0, Vec::len)
    }

    /// Flip between Inactive and Active.
    ///
    /// Activating starts an empty session, clearing any prior one;
    /// deactivating discards an incomplete session without sending
    /// anything. Returns the new active flag.
    pub fn toggle(&mut self) -> bool {
        if self.session.take().is_some() {
            false
        } else {
            self.session = Some(Vec::with_capacity(REQUIRED_POINTS));
            true
        }
    }

    /// Record a click at a raw display position.
    ///
    /// Returns `None` while inactive. On the fourth point the engine
    /// computes the region, goes Inactive, and discards the session.
    pub fn handle_click(
        &mut self,
        display_x: f64,
        display_y: f64,
        geometry: SurfaceGeometry,
    ) -> Option<ClickOutcome> {
        let session = self.session.as_mut()?;
        let point = geometry.to_native(display_x, display_y);
        session.push(point);

        let color = if session.len() % 2 == 1 {
            MarkerColor::Green
        } else {
            MarkerColor::Red
        };

        if session.len() < REQUIRED_POINTS {
            return Some(ClickOutcome::Marked { point, color });
        }

        let region = RegionConfig::bounding(session);
        self.session = None;
        Some(ClickOutcome::Completed {
            point,
            color,
            region,
        })
    }
}

// ── Region derivation ────────────────────────────────────────────

impl RegionConfig {
    /// Axis-aligned bounding box of the clicked corners, independent
    /// of click order. Width and height are never negative.
    pub fn bounding(points: &[ClickPoint]) -> Self {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Self {
            left: min_x,
            top: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
