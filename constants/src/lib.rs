pub mod colour_layout;
pub mod compute;
pub mod render_settings;
