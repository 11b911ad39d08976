//! E-paper panel behind a Linux framebuffer device.
//!
//! Draw commands are rasterized into a 1-bit framebuffer image and the
//! packed bytes written to the fb device. The panel driver picks the
//! waveform: a sysfs attribute toggles between the fast partial update and
//! the slow full (ghost-clearing) one for the next flush.

use embedded_graphics::framebuffer::{Framebuffer, buffer_size};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::pixelcolor::raw::{BigEndian, RawU1};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use log::error;

use crate::config::Config;
use crate::display::{DrawCommand, Fill, Panel, PanelError};

const WIDTH: usize = super::PANEL_WIDTH as usize;
const HEIGHT: usize = super::PANEL_HEIGHT as usize;

type EpdFramebuffer = Framebuffer<
    BinaryColor,
    RawU1,
    BigEndian,
    WIDTH,
    HEIGHT,
    { buffer_size::<BinaryColor>(WIDTH, HEIGHT) },
>;

pub struct FramebufferPanel {
    fb_path: String,
    refresh_ctl_path: String,
}

impl FramebufferPanel {
    pub fn new(config: &Config) -> Self {
        FramebufferPanel {
            fb_path: config.fb_path.clone(),
            refresh_ctl_path: config.refresh_ctl_path.clone(),
        }
    }

    fn flush(&self, fb: &EpdFramebuffer) -> Result<(), PanelError> {
        std::fs::write(&self.fb_path, fb.data())?;
        Ok(())
    }

    fn set_full_waveform(&self, on: bool) {
        let val = if on { "1" } else { "0" };
        if let Err(e) = std::fs::write(&self.refresh_ctl_path, val) {
            error!(
                "failed to set refresh mode via {}: {e}",
                self.refresh_ctl_path
            );
        }
    }
}

impl Panel for FramebufferPanel {
    fn partial_update(&mut self, commands: &[DrawCommand]) -> Result<(), PanelError> {
        self.set_full_waveform(false);
        self.flush(&render(commands))
    }

    fn full_update(&mut self, commands: &[DrawCommand]) -> Result<(), PanelError> {
        self.set_full_waveform(true);
        self.flush(&render(commands))
    }

    fn width(&self) -> u32 {
        super::PANEL_WIDTH
    }

    fn height(&self) -> u32 {
        super::PANEL_HEIGHT
    }
}

fn color(fill: Fill) -> BinaryColor {
    match fill {
        // On is ink (black) on the panel, Off is paper white.
        Fill::Black => BinaryColor::On,
        Fill::White => BinaryColor::Off,
    }
}

fn render(commands: &[DrawCommand]) -> EpdFramebuffer {
    let mut fb = EpdFramebuffer::new();
    let text_style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    let inverted_style = MonoTextStyle::new(&FONT_6X10, BinaryColor::Off);

    for command in commands {
        match command {
            DrawCommand::Clear => {
                fb.clear(BinaryColor::Off).ok();
            }
            DrawCommand::FillRect {
                x,
                y,
                width,
                height,
                fill,
            } => {
                Rectangle::new(Point::new(*x, *y), Size::new(*width, *height))
                    .into_styled(PrimitiveStyle::with_fill(color(*fill)))
                    .draw(&mut fb)
                    .ok();
            }
            DrawCommand::Line { x0, y0, x1, y1 } => {
                Line::new(Point::new(*x0, *y0), Point::new(*x1, *y1))
                    .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
                    .draw(&mut fb)
                    .ok();
            }
            DrawCommand::Text {
                x,
                y,
                text,
                inverted,
            } => {
                let style = if *inverted { inverted_style } else { text_style };
                Text::with_baseline(text, Point::new(*x, *y), style, Baseline::Top)
                    .draw(&mut fb)
                    .ok();
            }
        }
    }
    fb
}
