use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use std::marker::PhantomData;
use std::path::PathBuf;

use crate::engine::compute::backend::{ColourBackend, WorkSetArray};
use crate::engine::core::app_state::ViewerSet;
use crate::engine::pipeline::orchestrator::ColourPipeline;
use crate::engine::source::image_source::SourceImage;

/// Records logged by a debug readback.
const DEBUG_READBACK_RECORDS: usize = 8;

#[derive(Event, Clone, Debug, PartialEq, Eq)]
pub enum LoadImageRequest {
    Path(PathBuf),
    /// Load the most recently requested path again. Fails the load if there is none.
    Reload,
}

#[derive(Event, Clone, Copy, Debug, Default)]
pub struct StartAnimationRequest;

#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub struct ScaleChangeRequest {
    pub factor: f32,
}

#[derive(Event, Clone, Copy, Debug, Default)]
pub struct DebugReadbackRequest;

#[derive(Resource, Default, Debug)]
pub struct LastLoadRequest {
    pub path: Option<PathBuf>,
}

/// Texture copy of the loaded source image, tracked per generation.
#[derive(Resource, Default, Debug)]
pub struct ViewerImage {
    generation: Option<u64>,
    pub handle: Option<Handle<Image>>,
}

impl ViewerImage {
    pub fn generation(&self) -> Option<u64> {
        self.generation
    }
}

/// Request handling and per-frame animation for a `ColourPipeline<B>` resource.
///
/// Every system is gated on the pipeline resource, so one plugin per backend can be added and
/// only the backend actually inserted does any work.
pub struct ColourViewerPlugin<B: ColourBackend>(PhantomData<B>);

impl<B: ColourBackend> Default for ColourViewerPlugin<B> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<B: ColourBackend> Plugin for ColourViewerPlugin<B> {
    fn build(&self, app: &mut App) {
        app.add_event::<LoadImageRequest>()
            .add_event::<StartAnimationRequest>()
            .add_event::<ScaleChangeRequest>()
            .add_event::<DebugReadbackRequest>()
            .init_resource::<LastLoadRequest>()
            .init_resource::<ViewerImage>()
            .configure_sets(
                Update,
                (
                    ViewerSet::Input,
                    ViewerSet::Requests,
                    ViewerSet::Animate,
                    ViewerSet::Present,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    (
                        handle_load_requests::<B>,
                        handle_animation_requests::<B>,
                        handle_scale_requests::<B>,
                        handle_debug_readback::<B>,
                    )
                        .chain()
                        .in_set(ViewerSet::Requests),
                    animate_colours::<B>.in_set(ViewerSet::Animate),
                    publish_viewer_image::<B>.in_set(ViewerSet::Present),
                )
                    .run_if(resource_exists::<ColourPipeline<B>>),
            );
    }
}

/// Only the newest request in a frame is loaded.
pub fn handle_load_requests<B: ColourBackend>(
    mut requests: EventReader<LoadImageRequest>,
    mut pipeline: ResMut<ColourPipeline<B>>,
    mut last_request: ResMut<LastLoadRequest>,
) {
    let Some(request) = requests.read().last().cloned() else {
        return;
    };

    if let LoadImageRequest::Path(path) = request {
        last_request.path = Some(path);
    }
    let path = last_request.path.as_deref();
    match path {
        Some(path) => info!("Loading image {}", path.display()),
        None => warn!("Reload requested before any image was chosen"),
    }

    if let Err(err) = pipeline.load(SourceImage::open_selection(path)) {
        error!("Can't load image: {err}");
    }
}

pub fn handle_animation_requests<B: ColourBackend>(
    mut requests: EventReader<StartAnimationRequest>,
    mut pipeline: ResMut<ColourPipeline<B>>,
) {
    if requests.read().count() == 0 {
        return;
    }
    if !pipeline.start_animation() {
        debug!("Animation request ignored: no image loaded or already animating");
    }
}

pub fn handle_scale_requests<B: ColourBackend>(
    mut requests: EventReader<ScaleChangeRequest>,
    mut pipeline: ResMut<ColourPipeline<B>>,
) {
    for request in requests.read() {
        let scale = pipeline.scale() * request.factor;
        let applied = pipeline.set_scale(scale);
        debug!("Marker scale {applied:.2}");
    }
}

pub fn handle_debug_readback<B: ColourBackend>(
    mut requests: EventReader<DebugReadbackRequest>,
    mut pipeline: ResMut<ColourPipeline<B>>,
) {
    if requests.read().count() == 0 {
        return;
    }

    match pipeline.read_records(WorkSetArray::Work) {
        Ok(Some(records)) => {
            info!(
                "Work array: {} records, {} in {}",
                records.len(),
                pipeline.unique_count(),
                pipeline.colour_space().label()
            );
            for (index, record) in records.iter().take(DEBUG_READBACK_RECORDS).enumerate() {
                info!(
                    "  [{index}] colour {:?} position {:?} count {}",
                    record.colour, record.position, record.count
                );
            }
        }
        Ok(None) => info!("Work array is empty"),
        Err(err) => error!("Debug readback failed: {err}"),
    }
}

pub fn animate_colours<B: ColourBackend>(time: Res<Time>, mut pipeline: ResMut<ColourPipeline<B>>) {
    if !pipeline.animation().is_running() {
        return;
    }
    if let Some(step) = pipeline.tick(time.delta_secs()) {
        debug!("Animation t = {:.3}", step.t);
    }
}

/// Keeps `ViewerImage` pointing at a texture of the current generation's source image.
/// Skipped when the app has no image assets (headless runs).
pub fn publish_viewer_image<B: ColourBackend>(
    pipeline: Res<ColourPipeline<B>>,
    images: Option<ResMut<Assets<Image>>>,
    mut viewer_image: ResMut<ViewerImage>,
) {
    let generation = pipeline.generation().map(|generation| generation.id());
    if viewer_image.generation == generation {
        return;
    }
    let Some(mut images) = images else {
        return;
    };

    if let Some(handle) = viewer_image.handle.take() {
        images.remove(&handle);
    }
    viewer_image.generation = generation;
    viewer_image.handle = pipeline.image().map(|source| images.add(source_texture(source)));
}

fn source_texture(source: &SourceImage) -> Image {
    Image::new(
        Extent3d {
            width: source.width(),
            height: source.height(),
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        source.pixels().to_vec(),
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}
