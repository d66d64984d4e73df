//! The viewer event loop.
//!
//! One task drives everything: draw the UI, drain dispatched units,
//! fire the periodic latency probe, and poll terminal input. Frames
//! decode on the blocking pool, so a slow decode never stalls input
//! handling for long.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui_image::StatefulImage;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use srs_core::{
    CalibrationEngine, ClickOutcome, ConnectionManager, ConnectionState, DispatchEvent,
    FrameRenderer, InboundUnit, MarkerColor, OutboundMessage, REQUIRED_POINTS, RenderSurface,
    SurfaceGeometry, dispatch,
};

use crate::config::ViewerConfig;
use crate::surface::TerminalSurface;

// ── ViewerApp ────────────────────────────────────────────────────

/// All per-session UI state.
pub struct ViewerApp {
    manager: Arc<ConnectionManager>,
    inbound_rx: mpsc::Receiver<InboundUnit>,
    renderer: FrameRenderer<TerminalSurface>,
    calibration: CalibrationEngine,
    /// Server-pushed latency sample; preferred over the probe.
    server_latency_ms: Option<f64>,
    /// Round-trip latency measured by the ping probe.
    probe_latency_ms: Option<f64>,
    ping_interval: Duration,
    last_ping: Instant,
    ping_sent_at: Option<Instant>,
    tick: Duration,
    status: String,
    /// Where the image landed in the last draw; clicks are mapped
    /// relative to this.
    image_area: Rect,
    should_quit: bool,
}

impl ViewerApp {
    pub fn new(
        manager: Arc<ConnectionManager>,
        inbound_rx: mpsc::Receiver<InboundUnit>,
        surface: TerminalSurface,
        config: &ViewerConfig,
    ) -> Self {
        Self {
            manager,
            inbound_rx,
            renderer: FrameRenderer::new(surface),
            calibration: CalibrationEngine::new(),
            server_latency_ms: None,
            probe_latency_ms: None,
            ping_interval: Duration::from_millis(config.network.ping_interval_ms),
            last_ping: Instant::now(),
            ping_sent_at: None,
            tick: Duration::from_millis(config.display.tick_ms),
            status: "press c to calibrate, q to quit".into(),
            image_area: Rect::default(),
            should_quit: false,
        }
    }

    /// Run until the operator quits.
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        while !self.should_quit {
            terminal.draw(|f| self.ui(f))?;

            self.drain_units().await;
            self.maybe_ping();

            if event::poll(self.tick)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key(key),
                    Event::Mouse(mouse) => self.on_mouse(mouse),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    // ── Inbound ──────────────────────────────────────────────────

    /// Drain everything the dispatcher has for us without blocking
    /// the input poll.
    async fn drain_units(&mut self) {
        while let Ok(unit) = self.inbound_rx.try_recv() {
            if let Some(event) = dispatch(unit) {
                self.on_event(event).await;
            }
        }
    }

    async fn on_event(&mut self, event: DispatchEvent) {
        match event {
            DispatchEvent::Frame(payload) => {
                if let Err(e) = self.renderer.render_frame(payload).await {
                    warn!("dropping frame: {e}");
                }
            }
            DispatchEvent::Config(data) => {
                info!("server config: {data}");
            }
            DispatchEvent::Latency(ms) => {
                self.server_latency_ms = Some(ms);
            }
            DispatchEvent::Pong => {
                if let Some(sent) = self.ping_sent_at.take() {
                    self.probe_latency_ms = Some(sent.elapsed().as_secs_f64() * 1000.0);
                }
            }
        }
    }

    /// Fire the latency probe on its interval while connected.
    fn maybe_ping(&mut self) {
        if self.last_ping.elapsed() < self.ping_interval {
            return;
        }
        self.last_ping = Instant::now();
        if self.manager.send(&OutboundMessage::Ping) {
            self.ping_sent_at = Some(Instant::now());
        }
    }

    // ── Input ────────────────────────────────────────────────────

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') => self.toggle_calibration(),
            KeyCode::Char('r') => {
                // Off the UI task: a connect to a dead host can sit in
                // the TCP handshake for a while.
                let manager = self.manager.clone();
                tokio::spawn(async move {
                    if let Err(e) = manager.connect().await {
                        debug!("manual reconnect: {e}");
                    }
                });
            }
            KeyCode::Char('d') => {
                self.manager.disconnect();
                self.status = "disconnected by operator, press r to reconnect".into();
            }
            _ => {}
        }
    }

    fn toggle_calibration(&mut self) {
        self.renderer.surface_mut().clear_markers();
        if self.calibration.toggle() {
            self.status =
                "calibration: click the four corners (top-left, top-right, bottom-right, bottom-left)"
                    .into();
        } else {
            self.status = "calibration cancelled".into();
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        if !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
            return;
        }
        if !self.calibration.is_active() {
            return;
        }
        let area = self.image_area;
        if !area.contains(Position::new(mouse.column, mouse.row)) {
            return;
        }
        let (native_w, native_h) = self.renderer.surface().native_size();
        if native_w == 0 || native_h == 0 || area.width == 0 || area.height == 0 {
            // No frame on screen yet; nothing meaningful to calibrate.
            return;
        }

        let geometry = SurfaceGeometry {
            native_width: native_w as f64,
            native_height: native_h as f64,
            displayed_width: area.width as f64,
            displayed_height: area.height as f64,
        };
        let display_x = (mouse.column - area.x) as f64;
        let display_y = (mouse.row - area.y) as f64;

        match self.calibration.handle_click(display_x, display_y, geometry) {
            Some(ClickOutcome::Marked { point, color }) => {
                self.renderer.surface_mut().place_marker(point, color);
                self.status = format!(
                    "calibration: {}/{REQUIRED_POINTS} corners",
                    self.calibration.collected()
                );
            }
            Some(ClickOutcome::Completed {
                point,
                color,
                region,
            }) => {
                self.renderer.surface_mut().place_marker(point, color);
                if !self.manager.send(&OutboundMessage::Region(region)) {
                    warn!("calibration region lost: not connected at send time");
                }
                // Completion is reported regardless of the send
                // outcome; the status bar carries the link state.
                self.status = format!(
                    "calibration complete: region {:.0}x{:.0} at ({:.0}, {:.0})",
                    region.width, region.height, region.left, region.top
                );
            }
            None => {}
        }
    }

    // ── Drawing ──────────────────────────────────────────────────

    fn ui(&mut self, f: &mut Frame) {
        let [status_area, image_area, help_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .areas(f.area());
        self.image_area = image_area;

        let status = self.status_line();
        f.render_widget(status, status_area);

        if let Some(protocol) = self.renderer.surface_mut().protocol_mut() {
            f.render_stateful_widget(StatefulImage::default(), image_area, protocol);
        } else {
            f.render_widget(
                Paragraph::new("waiting for frames...")
                    .style(Style::new().fg(Color::DarkGray)),
                image_area,
            );
        }
        self.draw_markers(f, image_area);

        f.render_widget(
            Paragraph::new(" q quit | c calibrate | r reconnect | d disconnect ")
                .style(Style::new().fg(Color::DarkGray)),
            help_area,
        );
    }

    fn status_line(&self) -> Line<'_> {
        let state = self.manager.state();
        let state_style = match state {
            ConnectionState::Connected { .. } => Style::new().fg(Color::Green),
            ConnectionState::Connecting => Style::new().fg(Color::Yellow),
            ConnectionState::Disconnected => Style::new().fg(Color::Red),
            ConnectionState::Closed => Style::new().fg(Color::DarkGray),
        };
        let fps = self
            .renderer
            .displayed_fps()
            .map_or("--".to_string(), |n| n.to_string());
        let latency = self
            .server_latency_ms
            .or(self.probe_latency_ms)
            .map_or("--".to_string(), |ms| format!("{ms:.0}"));

        Line::from(vec![
            Span::styled(format!(" {state} "), state_style),
            Span::raw(format!(
                "| fps {fps} | latency {latency} ms | {} | {}",
                self.manager.endpoint().url(),
                self.status
            )),
        ])
    }

    /// Overlay calibration markers on top of the rendered frame,
    /// mapping native pixels back into display cells.
    fn draw_markers(&self, f: &mut Frame, area: Rect) {
        let (native_w, native_h) = self.renderer.surface().native_size();
        if native_w == 0 || native_h == 0 {
            return;
        }
        let buf = f.buffer_mut();
        for (point, color) in self.renderer.surface().markers() {
            let cx = area.x + (point.x * area.width as f64 / native_w as f64) as u16;
            let cy = area.y + (point.y * area.height as f64 / native_h as f64) as u16;
            if !area.contains(Position::new(cx, cy)) {
                continue;
            }
            let style = match color {
                MarkerColor::Green => Style::new().fg(Color::Green),
                MarkerColor::Red => Style::new().fg(Color::Red),
            };
            buf.set_string(cx, cy, "\u{25CF}", style);
        }
    }
}
