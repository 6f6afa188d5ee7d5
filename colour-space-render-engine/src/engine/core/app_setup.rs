use bevy::asset::AssetMetaCheck;
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy::render::renderer::{RenderDevice, RenderQueue};
use bevy_common_assets::json::JsonAssetPlugin;
use constants::render_settings::CLEAR_COLOUR;
use std::path::PathBuf;

use crate::engine::camera::viewport_camera::{ViewportCamera, camera_controller};
use crate::engine::compute::cpu_backend::CpuBackend;
use crate::engine::compute::gpu_backend::GpuBackend;
use crate::engine::core::app_state::{AppState, StatusText, ViewerSet};
use crate::engine::core::window_config::create_window_config;
use crate::engine::loading::settings::{
    ActiveSettings, SettingsLoader, ViewerSettings, finish_settings_load, start_settings_load,
};
use crate::engine::pipeline::orchestrator::ColourPipeline;
use crate::engine::render::colour_marker_plugin::ColourMarkerRenderPlugin;
use crate::engine::scene::axes::{spawn_colour_axes, update_axis_visibility};
use crate::engine::systems::input::ViewerInputPlugin;
use crate::engine::systems::status::status_text_update_system;
use crate::engine::systems::viewer::{ColourViewerPlugin, LoadImageRequest};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendChoice {
    #[default]
    Gpu,
    Cpu,
}

/// Command line choices, resolved against `ViewerSettings` once they have loaded.
#[derive(Resource, Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Overrides `initial_image` from the settings file.
    pub image: Option<PathBuf>,
    pub backend: BackendChoice,
}

pub fn create_app(launch: LaunchOptions) -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .init_state::<AppState>()
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        // Registers ViewerSettings as a loadable asset type from JSON files.
        .add_plugins(JsonAssetPlugin::<ViewerSettings>::new(&["json"]))
        .add_plugins(ColourViewerPlugin::<GpuBackend>::default())
        .add_plugins(ColourViewerPlugin::<CpuBackend>::default())
        .add_plugins(ViewerInputPlugin)
        .add_plugins(ColourMarkerRenderPlugin)
        .insert_resource(ClearColor(Color::linear_rgb(
            CLEAR_COLOUR[0],
            CLEAR_COLOUR[1],
            CLEAR_COLOUR[2],
        )))
        .insert_resource(launch)
        .init_resource::<SettingsLoader>()
        .init_resource::<ViewportCamera>();

    app.add_systems(Startup, (setup, start_settings_load))
        .add_systems(
            Update,
            finish_settings_load.run_if(in_state(AppState::LoadingSettings)),
        )
        .add_systems(
            OnEnter(AppState::Running),
            (start_colour_pipeline, spawn_colour_axes),
        )
        .add_systems(
            Update,
            camera_controller.run_if(in_state(AppState::Running)),
        );

    // Only the backend chosen at launch has a pipeline resource; the other set never runs.
    app.add_systems(
        Update,
        (
            (
                status_text_update_system::<GpuBackend>,
                update_axis_visibility::<GpuBackend>,
            )
                .run_if(resource_exists::<ColourPipeline<GpuBackend>>),
            (
                status_text_update_system::<CpuBackend>,
                update_axis_visibility::<CpuBackend>,
            )
                .run_if(resource_exists::<ColourPipeline<CpuBackend>>),
        )
            .in_set(ViewerSet::Present),
    );

    app
}

/// Builds the pipeline for the launch backend and queues the initial image, if any.
fn start_colour_pipeline(
    mut commands: Commands,
    launch: Res<LaunchOptions>,
    settings: Res<ActiveSettings>,
    render_device: Option<Res<RenderDevice>>,
    render_queue: Option<Res<RenderQueue>>,
    mut loads: EventWriter<LoadImageRequest>,
) {
    let pipeline_settings = settings.pipeline_settings();

    match (launch.backend, render_device, render_queue) {
        (BackendChoice::Gpu, Some(render_device), Some(render_queue)) => {
            info!("→ Colour pipeline running on the GPU");
            let backend = GpuBackend::new(render_device.clone(), render_queue.clone());
            commands.insert_resource(ColourPipeline::new(backend, pipeline_settings));
        }
        (BackendChoice::Gpu, ..) => {
            warn!("No render device available, falling back to the CPU backend");
            commands.insert_resource(ColourPipeline::new(CpuBackend, pipeline_settings));
        }
        (BackendChoice::Cpu, ..) => {
            info!("→ Colour pipeline running on the CPU (markers are not drawn)");
            commands.insert_resource(ColourPipeline::new(CpuBackend, pipeline_settings));
        }
    }

    let initial_image = launch
        .image
        .clone()
        .or_else(|| settings.initial_image.clone());
    if let Some(path) = initial_image {
        loads.write(LoadImageRequest::Path(path));
    }
}

fn setup(mut commands: Commands, viewport_camera: Res<ViewportCamera>) {
    commands.spawn((Camera3d::default(), viewport_camera.target_transform()));
    create_native_overlays(&mut commands);
}

fn create_native_overlays(commands: &mut Commands) {
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                Text::new("Loading settings..."),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(Color::srgb(0.9, 0.9, 0.9)),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Px(12.0),
                    left: Val::Px(12.0),
                    ..default()
                },
                StatusText,
            ));
        });
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}
