//! Rendering of fetch outcomes onto the e-paper panel.
//!
//! The dispatcher translates a [`FetchOutcome`] into layout-level draw
//! commands (rectangles, text at positions, a divider line) and hands them to
//! a [`Panel`] backend. It knows nothing about pixel formats; that's the
//! backend's job. It also owns the periodic full-refresh policy that keeps
//! e-paper ghosting in check.

use std::time::Duration;

use log::{debug, error};
use thiserror::Error;
use tokio::time::Instant;

use trackboard::clock;
use trackboard::schedule::{DepartureView, FetchOutcome};

pub mod framebuffer;
pub mod headless;

/// Panel width/height in pixels for the stock 2.13" module, landscape.
pub const PANEL_WIDTH: u32 = 250;
pub const PANEL_HEIGHT: u32 = 122;

const HEADER_HEIGHT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Black,
    White,
}

/// One layout-level drawing operation. Coordinates are in panel pixels with
/// the origin top-left; text positions name the top-left of the first glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    Clear,
    FillRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        fill: Fill,
    },
    Line {
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        /// Draw white-on-black (for text inside the header bar).
        inverted: bool,
    },
}

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("panel I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A display device. The dispatcher is the only writer, and it never
/// overlaps a partial update with a full refresh.
pub trait Panel: Send {
    /// Fast partial-area update; leaves residual ghosting over many cycles.
    fn partial_update(&mut self, commands: &[DrawCommand]) -> Result<(), PanelError>;
    /// Slow full-waveform update that clears ghosting artifacts.
    fn full_update(&mut self, commands: &[DrawCommand]) -> Result<(), PanelError>;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

pub struct Dispatcher {
    panel: Box<dyn Panel>,
}

impl Dispatcher {
    pub fn new(panel: Box<dyn Panel>) -> Self {
        Dispatcher { panel }
    }

    /// Render a fetch outcome: the two-column departure layout on success,
    /// the message view on failure. Render failures are logged, never
    /// escalated; the next cycle simply draws again.
    pub fn render_outcome(&mut self, outcome: &FetchOutcome) {
        let (width, height) = (self.panel.width(), self.panel.height());
        let stamp = clock::current_local_display();
        let commands = match outcome {
            Ok(view) => departure_layout(view, width, height, &stamp),
            Err(e) => message_layout(&e.to_string(), width, height, &stamp),
        };
        debug!("partial update with {} draw commands", commands.len());
        if let Err(e) = self.panel.partial_update(&commands) {
            error!("partial update failed: {e}");
        }
    }

    /// Run the black-then-white inversion cycle when `interval` has elapsed
    /// since `last`, returning the new refresh baseline. Runs every cycle
    /// regardless of fetch outcome; a failed refresh still advances the
    /// baseline so the panel isn't hammered with retries.
    pub fn maybe_full_refresh(
        &mut self,
        now: Instant,
        last: Instant,
        interval: Duration,
    ) -> Instant {
        if now.duration_since(last) <= interval {
            return last;
        }
        debug!("running full inversion refresh");
        let (width, height) = (self.panel.width(), self.panel.height());
        for fill in [Fill::Black, Fill::White] {
            let commands = vec![DrawCommand::FillRect {
                x: 0,
                y: 0,
                width,
                height,
                fill,
            }];
            if let Err(e) = self.panel.full_update(&commands) {
                error!("full refresh failed: {e}");
            }
        }
        now
    }
}

/// The fixed "next departure" view: origin column left, destination column
/// right, station names in a filled header bar, divider down the middle,
/// route label bottom-left and the wall clock bottom-right.
fn departure_layout(
    view: &DepartureView,
    width: u32,
    height: u32,
    clock_stamp: &str,
) -> Vec<DrawCommand> {
    let mid = width as i32 / 2;
    vec![
        DrawCommand::Clear,
        DrawCommand::FillRect {
            x: 0,
            y: 0,
            width,
            height: HEADER_HEIGHT,
            fill: Fill::Black,
        },
        DrawCommand::Text {
            x: 10,
            y: 3,
            text: view.origin_station.clone(),
            inverted: true,
        },
        DrawCommand::Text {
            x: mid + 10,
            y: 3,
            text: view.dest_station.clone(),
            inverted: true,
        },
        DrawCommand::Line {
            x0: mid,
            y0: 0,
            x1: mid,
            y1: height as i32 - 1,
        },
        DrawCommand::Text {
            x: 10,
            y: 34,
            text: view.origin_platform.clone(),
            inverted: false,
        },
        DrawCommand::Text {
            x: 10,
            y: 54,
            text: format!("Dep: {}", view.origin_time),
            inverted: false,
        },
        DrawCommand::Text {
            x: mid + 10,
            y: 34,
            text: view.dest_platform.clone(),
            inverted: false,
        },
        DrawCommand::Text {
            x: mid + 10,
            y: 54,
            text: format!("Arr: {}", view.dest_time),
            inverted: false,
        },
        DrawCommand::Text {
            x: 10,
            y: height as i32 - 22,
            text: view.route_label.clone(),
            inverted: false,
        },
        DrawCommand::Text {
            x: width as i32 - 58,
            y: height as i32 - 12,
            text: clock_stamp.to_string(),
            inverted: false,
        },
    ]
}

/// The message view used for every failure kind: wall clock top-right,
/// message text below.
fn message_layout(detail: &str, width: u32, _height: u32, clock_stamp: &str) -> Vec<DrawCommand> {
    vec![
        DrawCommand::Clear,
        DrawCommand::Text {
            x: width as i32 - 58,
            y: 2,
            text: clock_stamp.to_string(),
            inverted: false,
        },
        DrawCommand::Text {
            x: 2,
            y: 22,
            text: detail.to_string(),
            inverted: false,
        },
    ]
}
