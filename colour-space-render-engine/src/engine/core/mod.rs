//! Core application setup and state management.
//!
//! Handles application lifecycle, window configuration, state transitions,
//! and plugin initialisation.

/// Application setup and plugin configuration for the Bevy engine.
///
/// Creates the main app with the colour pipeline, marker rendering, settings loading,
/// and the launch backend choice.
pub mod app_setup;

/// Application state machine, viewer system ordering, and overlay markers.
pub mod app_state;

/// Native window configuration.
pub mod window_config;
