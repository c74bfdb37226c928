//! Host settings persisted alongside the wrapped instance.

use serde::{Deserialize, Serialize};

pub const MIN_UI_WIDTH: u32 = 400;
pub const MIN_UI_HEIGHT: u32 = 200;
pub const DEFAULT_OSC_PORT: u16 = 9000;

/// One record per host, owned by `HostProcessor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSettings {
    pub ui_width: u32,
    pub ui_height: u32,
    pub osc_port: u16,
    /// Selects the `/module/{n}/` address subtree this host answers to
    pub instance_number: u32,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            ui_width: MIN_UI_WIDTH,
            ui_height: MIN_UI_HEIGHT,
            osc_port: DEFAULT_OSC_PORT,
            instance_number: 0,
        }
    }
}

impl HostSettings {
    /// Set the editor size, clamped to the minimum.
    pub fn set_ui_size(&mut self, width: u32, height: u32) {
        self.ui_width = width.max(MIN_UI_WIDTH);
        self.ui_height = height.max(MIN_UI_HEIGHT);
    }

    pub fn ui_size(&self) -> (u32, u32) {
        (self.ui_width, self.ui_height)
    }
}
