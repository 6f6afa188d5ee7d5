use bevy::prelude::*;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum AppState {
    #[default]
    LoadingSettings,
    Running,
}

/// Ordering of the per-frame viewer work inside `Update`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerSet {
    /// Keyboard and drag-and-drop become requests.
    Input,
    /// Load, start, scale, and readback requests are applied to the pipeline.
    Requests,
    /// The animator advances and dispatches the blend.
    Animate,
    /// Markers, overlays, and gizmos read the settled pipeline.
    Present,
}

#[derive(Component)]
pub struct StatusText;
