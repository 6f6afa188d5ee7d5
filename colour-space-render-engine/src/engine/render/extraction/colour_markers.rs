use bevy::prelude::*;
use bevy::render::extract_component::ExtractComponent;
use bevy::render::render_resource::Buffer;
use constants::render_settings::DEFAULT_MARKER_SCALE;

use crate::engine::compute::backend::ColourBackend;
use crate::engine::compute::cpu_backend::CpuBackend;
use crate::engine::compute::gpu_backend::GpuBackend;
use crate::engine::pipeline::orchestrator::ColourPipeline;

/// Backends whose work set can feed the marker draw.
pub trait MarkerInstanceSource: ColourBackend {
    /// The Work array as a `VERTEX` buffer, or `None` when it only lives on the host.
    fn instance_buffer(work_set: &Self::WorkSet) -> Option<Buffer>;
}

impl MarkerInstanceSource for GpuBackend {
    fn instance_buffer(work_set: &Self::WorkSet) -> Option<Buffer> {
        Some(work_set.work_buffer().clone())
    }
}

impl MarkerInstanceSource for CpuBackend {
    fn instance_buffer(_work_set: &Self::WorkSet) -> Option<Buffer> {
        None
    }
}

/// The live generation's Work array as seen by the draw.
#[derive(Clone, Debug)]
pub struct MarkerInstances {
    pub generation: u64,
    pub count: u32,
    /// Missing for host-only backends; such instances are counted but never drawn.
    pub buffer: Option<Buffer>,
}

/// Carried by the single marker mesh entity and mirrored into the render world every frame.
#[derive(Component, Clone, Debug, ExtractComponent)]
pub struct ColourMarkers {
    pub instances: Option<MarkerInstances>,
    pub scale: f32,
}

impl Default for ColourMarkers {
    fn default() -> Self {
        Self {
            instances: None,
            scale: DEFAULT_MARKER_SCALE,
        }
    }
}

impl ColourMarkers {
    pub fn generation(&self) -> Option<u64> {
        self.instances.as_ref().map(|instances| instances.generation)
    }
}

/// Points the marker entity at the current generation's Work array. Writes only on change so
/// the component is not marked dirty every frame.
///
/// Instances are replaced whole whenever the generation changes; an empty generation or no
/// image at all leaves nothing to draw.
pub fn sync_colour_markers<B: MarkerInstanceSource>(
    pipeline: Res<ColourPipeline<B>>,
    mut markers: Query<&mut ColourMarkers>,
) {
    let generation = pipeline
        .generation()
        .filter(|generation| generation.work_set().is_some());
    let generation_id = generation.map(|generation| generation.id());

    for mut marker in &mut markers {
        if marker.generation() != generation_id {
            marker.instances = generation.and_then(|generation| {
                generation.work_set().map(|work_set| MarkerInstances {
                    generation: generation.id(),
                    count: generation.unique_count(),
                    buffer: B::instance_buffer(work_set),
                })
            });
        }
        if marker.scale != pipeline.scale() {
            marker.scale = pipeline.scale();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    use crate::engine::pipeline::orchestrator::PipelineSettings;
    use crate::engine::source::image_source::{SourceError, SourceImage};

    fn world_with_markers(settings: PipelineSettings) -> (World, Entity) {
        let mut world = World::new();
        world.insert_resource(ColourPipeline::new(CpuBackend, settings));
        let marker = world.spawn(ColourMarkers::default()).id();
        (world, marker)
    }

    fn load(world: &mut World, image: Result<SourceImage, SourceError>) {
        let _ = world
            .resource_mut::<ColourPipeline<CpuBackend>>()
            .load(image);
        world
            .run_system_once(sync_colour_markers::<CpuBackend>)
            .unwrap();
    }

    fn instances(world: &World, marker: Entity) -> Option<(u64, u32)> {
        world
            .get::<ColourMarkers>(marker)
            .and_then(|markers| markers.instances.as_ref())
            .map(|instances| (instances.generation, instances.count))
    }

    #[test]
    fn instances_follow_each_generation() {
        let (mut world, marker) = world_with_markers(PipelineSettings::default());
        world
            .run_system_once(sync_colour_markers::<CpuBackend>)
            .unwrap();
        assert_eq!(instances(&world, marker), None);

        let four = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255], [9, 9, 9, 255]];
        load(&mut world, SourceImage::from_rgba(2, 2, &four));
        assert_eq!(instances(&world, marker), Some((1, 4)));

        load(&mut world, SourceImage::from_rgba(2, 1, &[[1, 1, 1, 255]; 2]));
        assert_eq!(instances(&world, marker), Some((2, 1)));

        load(&mut world, SourceImage::from_encoded(&[]));
        assert_eq!(instances(&world, marker), None);
    }

    #[test]
    fn empty_generation_has_no_instances() {
        let settings = PipelineSettings {
            skip_transparent: true,
            ..PipelineSettings::default()
        };
        let (mut world, marker) = world_with_markers(settings);

        load(&mut world, SourceImage::from_rgba(1, 1, &[[3, 3, 3, 255]]));
        assert_eq!(instances(&world, marker), Some((1, 1)));

        load(&mut world, SourceImage::from_rgba(1, 1, &[[3, 3, 3, 0]]));
        assert!(
            world
                .resource::<ColourPipeline<CpuBackend>>()
                .image_loaded()
        );
        assert_eq!(instances(&world, marker), None);
    }

    #[test]
    fn host_only_instances_carry_no_buffer() {
        let (mut world, marker) = world_with_markers(PipelineSettings::default());
        load(&mut world, SourceImage::from_rgba(1, 1, &[[3, 3, 3, 255]]));

        let markers = world.get::<ColourMarkers>(marker).unwrap();
        assert!(markers.instances.as_ref().unwrap().buffer.is_none());
    }

    #[test]
    fn scale_is_mirrored() {
        let (mut world, marker) = world_with_markers(PipelineSettings::default());
        world
            .resource_mut::<ColourPipeline<CpuBackend>>()
            .set_scale(2.5);
        world
            .run_system_once(sync_colour_markers::<CpuBackend>)
            .unwrap();
        assert_eq!(world.get::<ColourMarkers>(marker).unwrap().scale, 2.5);
    }
}
