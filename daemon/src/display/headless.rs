//! Log-only panel backend for running the daemon on a bench machine.

use log::info;

use crate::display::{DrawCommand, Panel, PanelError};

pub struct HeadlessPanel;

impl HeadlessPanel {
    pub fn new() -> Self {
        HeadlessPanel
    }
}

impl Default for HeadlessPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel for HeadlessPanel {
    fn partial_update(&mut self, commands: &[DrawCommand]) -> Result<(), PanelError> {
        for command in commands {
            if let DrawCommand::Text { text, .. } = command {
                info!("panel: {text}");
            }
        }
        Ok(())
    }

    fn full_update(&mut self, commands: &[DrawCommand]) -> Result<(), PanelError> {
        info!("panel: full refresh ({} commands)", commands.len());
        Ok(())
    }

    fn width(&self) -> u32 {
        super::PANEL_WIDTH
    }

    fn height(&self) -> u32 {
        super::PANEL_HEIGHT
    }
}
