use bevy::asset::LoadState;
use bevy::prelude::*;
use constants::render_settings::{DEFAULT_ANIMATION_TIME, DEFAULT_MARKER_SCALE};
use serde::Deserialize;
use std::path::PathBuf;

use crate::engine::colour::layout::ColourLayout;
use crate::engine::core::app_state::AppState;
use crate::engine::pipeline::orchestrator::PipelineSettings;

/// Asset path of the viewer configuration, relative to `assets/`.
pub const VIEWER_SETTINGS_PATH: &str = "viewer_settings.json";

/// User-editable viewer configuration. Every field is optional in the file.
#[derive(Asset, TypePath, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ViewerSettings {
    pub animation_time: f32,
    pub scale: f32,
    pub skip_transparent: bool,
    pub layout: ColourLayout,
    pub initial_image: Option<PathBuf>,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            animation_time: DEFAULT_ANIMATION_TIME,
            scale: DEFAULT_MARKER_SCALE,
            skip_transparent: false,
            layout: ColourLayout::default(),
            initial_image: None,
        }
    }
}

impl ViewerSettings {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            animation_time: self.animation_time,
            scale: self.scale,
            skip_transparent: self.skip_transparent,
            layout: self.layout,
        }
    }
}

#[derive(Resource, Default)]
pub struct SettingsLoader {
    handle: Option<Handle<ViewerSettings>>,
}

/// Settings in effect for this run, resolved once during `AppState::LoadingSettings`.
#[derive(Resource, Clone, Debug, Default, Deref)]
pub struct ActiveSettings(pub ViewerSettings);

pub fn start_settings_load(mut loader: ResMut<SettingsLoader>, asset_server: Res<AssetServer>) {
    info!("Loading viewer settings from {VIEWER_SETTINGS_PATH}");
    loader.handle = Some(asset_server.load(VIEWER_SETTINGS_PATH));
}

/// Moves to `Running` once the settings file is parsed, or falls back to defaults if it is
/// missing or malformed.
pub fn finish_settings_load(
    mut commands: Commands,
    loader: Res<SettingsLoader>,
    asset_server: Res<AssetServer>,
    settings: Res<Assets<ViewerSettings>>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    let Some(handle) = &loader.handle else {
        return;
    };

    if let Some(loaded) = settings.get(handle) {
        info!("✓ Viewer settings loaded");
        commands.insert_resource(ActiveSettings(loaded.clone()));
        next_state.set(AppState::Running);
        return;
    }

    if let LoadState::Failed(err) = asset_server.load_state(handle.id()) {
        warn!("Viewer settings unavailable ({err}), using defaults");
        commands.insert_resource(ActiveSettings::default());
        next_state.set(AppState::Running);
    }
}
