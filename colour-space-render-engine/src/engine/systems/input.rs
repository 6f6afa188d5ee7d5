use bevy::prelude::*;
use bevy::window::FileDragAndDrop;
use constants::render_settings::MARKER_SCALE_STEP;

use crate::engine::core::app_state::ViewerSet;
use crate::engine::systems::viewer::{
    DebugReadbackRequest, LoadImageRequest, ScaleChangeRequest, StartAnimationRequest,
};

/// Maps keyboard and drag-and-drop input onto viewer requests.
pub struct ViewerInputPlugin;

impl Plugin for ViewerInputPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (handle_viewer_shortcuts, handle_file_drops).in_set(ViewerSet::Input),
        );
    }
}

pub fn handle_viewer_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut loads: EventWriter<LoadImageRequest>,
    mut starts: EventWriter<StartAnimationRequest>,
    mut scales: EventWriter<ScaleChangeRequest>,
    mut readbacks: EventWriter<DebugReadbackRequest>,
) {
    if keyboard.just_pressed(KeyCode::Space) {
        loads.write(LoadImageRequest::Reload);
    }
    if keyboard.any_just_pressed([KeyCode::Enter, KeyCode::NumpadEnter, KeyCode::KeyC]) {
        starts.write(StartAnimationRequest);
    }
    if keyboard.any_just_pressed([KeyCode::Equal, KeyCode::NumpadAdd]) {
        scales.write(ScaleChangeRequest {
            factor: MARKER_SCALE_STEP,
        });
    }
    if keyboard.any_just_pressed([KeyCode::Minus, KeyCode::NumpadSubtract]) {
        scales.write(ScaleChangeRequest {
            factor: MARKER_SCALE_STEP.recip(),
        });
    }
    if keyboard.just_pressed(KeyCode::KeyR) {
        readbacks.write(DebugReadbackRequest);
    }
}

pub fn handle_file_drops(
    mut drops: EventReader<FileDragAndDrop>,
    mut loads: EventWriter<LoadImageRequest>,
) {
    for drop in drops.read() {
        if let FileDragAndDrop::DroppedFile { path_buf, .. } = drop {
            loads.write(LoadImageRequest::Path(path_buf.clone()));
        }
    }
}
