use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::math::EulerRot;
use bevy::prelude::*;
use constants::render_settings::{
    CAMERA_FOCUS, CAMERA_MAX_DISTANCE, CAMERA_MIN_DISTANCE, CAMERA_START_DISTANCE,
    CAMERA_START_PITCH, CAMERA_START_YAW,
};

const YAW_SENSITIVITY: f32 = 0.0035;
const PITCH_SENSITIVITY: f32 = 0.0030;
const PITCH_LIMIT: f32 = 1.55;
const ZOOM_STEP: f32 = 0.1;
const SMOOTHING: f32 = 12.0;

/// Orbit state around a fixed focus point. The camera transform eases towards it.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct ViewportCamera {
    pub focus_point: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for ViewportCamera {
    fn default() -> Self {
        Self {
            focus_point: CAMERA_FOCUS,
            distance: CAMERA_START_DISTANCE,
            yaw: CAMERA_START_YAW,
            pitch: CAMERA_START_PITCH,
        }
    }
}

impl ViewportCamera {
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Transform the camera settles at for the current orbit.
    pub fn target_transform(&self) -> Transform {
        let rotation = self.rotation();
        Transform {
            translation: self.focus_point + rotation * Vec3::Z * self.distance,
            rotation,
            ..default()
        }
    }

    pub fn orbit(&mut self, mouse_delta: Vec2) {
        self.yaw -= mouse_delta.x * YAW_SENSITIVITY;
        self.pitch =
            (self.pitch - mouse_delta.y * PITCH_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Positive scroll moves closer.
    pub fn zoom(&mut self, scroll: f32) {
        let factor = (1.0 - scroll * ZOOM_STEP).max(0.1);
        self.distance = (self.distance * factor).clamp(CAMERA_MIN_DISTANCE, CAMERA_MAX_DISTANCE);
    }
}

pub fn camera_controller(
    mut camera_query: Query<&mut Transform, With<Camera3d>>,
    mut viewport_camera: ResMut<ViewportCamera>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut scroll_events: EventReader<MouseWheel>,
    time: Res<Time>,
) {
    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    let mouse_delta: Vec2 = mouse_motion.read().map(|m| m.delta).sum();
    if mouse_button.pressed(MouseButton::Right) && mouse_delta != Vec2::ZERO {
        viewport_camera.orbit(mouse_delta);
    }

    let scroll: f32 = scroll_events
        .read()
        .map(|ev| match ev.unit {
            MouseScrollUnit::Line => ev.y,
            MouseScrollUnit::Pixel => ev.y * 0.05,
        })
        .sum();
    if scroll.abs() > f32::EPSILON {
        viewport_camera.zoom(scroll);
    }

    let target = viewport_camera.target_transform();
    let lerp_speed = (SMOOTHING * time.delta_secs()).min(1.0);
    camera_transform.translation = camera_transform
        .translation
        .lerp(target.translation, lerp_speed);
    camera_transform.rotation = camera_transform.rotation.slerp(target.rotation, lerp_speed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_sits_at_distance_from_focus() {
        let camera = ViewportCamera::default();
        let target = camera.target_transform();
        let offset = target.translation - camera.focus_point;
        assert!((offset.length() - camera.distance).abs() < 1e-4);

        // Looking back at the focus.
        let forward = target.forward();
        assert!(forward.dot(-offset.normalize()) > 0.999);
    }

    #[test]
    fn zoom_and_pitch_are_clamped() {
        let mut camera = ViewportCamera::default();
        for _ in 0..200 {
            camera.zoom(5.0);
        }
        assert_eq!(camera.distance, CAMERA_MIN_DISTANCE);
        for _ in 0..200 {
            camera.zoom(-5.0);
        }
        assert_eq!(camera.distance, CAMERA_MAX_DISTANCE);

        camera.orbit(Vec2::new(0.0, -100_000.0));
        assert_eq!(camera.pitch, PITCH_LIMIT);
    }
}
