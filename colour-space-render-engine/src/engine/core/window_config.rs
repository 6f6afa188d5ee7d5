use bevy::prelude::*;
use bevy::window::PresentMode;

pub const WINDOW_TITLE: &str = "Colour Space Viewer";

pub fn create_window_config() -> Window {
    Window {
        title: WINDOW_TITLE.into(),
        present_mode: PresentMode::AutoVsync,
        ..default()
    }
}
