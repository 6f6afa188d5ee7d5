//! Startup loading of the viewer configuration.
//!
//! The JSON settings asset is requested at startup. The app moves to `Running` once it has
//! parsed, or once the asset server reports it missing or malformed.

/// Viewer settings asset, loader resource, and the `LoadingSettings` state systems.
pub mod settings;
