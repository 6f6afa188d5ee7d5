use crate::engine::compute::cpu_backend::CpuBackend;
use crate::engine::compute::gpu_backend::GpuBackend;
use crate::engine::core::app_state::ViewerSet;
use crate::engine::pipeline::orchestrator::ColourPipeline;
use crate::engine::render::extraction::colour_markers::{
    ColourMarkers, MarkerInstances, sync_colour_markers,
};
use bevy::{
    core_pipeline::core_3d::Transparent3d,
    ecs::system::{SystemParamItem, lifetimeless::*},
    pbr::{
        MeshPipeline, MeshPipelineKey, RenderMeshInstances, SetMeshBindGroup, SetMeshViewBindGroup,
    },
    prelude::*,
    render::{
        Render, RenderApp, RenderSet,
        extract_component::ExtractComponentPlugin,
        mesh::{
            MeshVertexBufferLayoutRef, RenderMesh, RenderMeshBufferInfo, allocator::MeshAllocator,
        },
        render_asset::RenderAssets,
        render_phase::{
            AddRenderCommand, DrawFunctions, PhaseItem, PhaseItemExtraIndex, RenderCommand,
            RenderCommandResult, SetItemPipeline, TrackedRenderPass, ViewSortedRenderPhases,
        },
        render_resource::*,
        renderer::RenderDevice,
        sync_world::MainEntity,
        view::{ExtractedView, NoFrustumCulling},
    },
};
use bytemuck::{Pod, Zeroable};
use constants::compute::COLOUR_RECORD_SIZE;
use constants::render_settings::{MARKER_BASE_RADIUS, MARKER_SPHERE_SECTORS, MARKER_SPHERE_STACKS};

const COLOUR_MARKER_SHADER_PATH: &str = "shaders/colour_markers.wgsl";

/// Draws one sphere per unique colour with a single indirect, instanced draw call.
///
/// The instance buffer is the animated Work array itself, bound as a vertex buffer. The draw
/// arguments live in an `INDIRECT` buffer that is rebuilt only when the generation, the instance
/// count, or the mesh slice changes.
pub struct ColourMarkerRenderPlugin;

impl Plugin for ColourMarkerRenderPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(ExtractComponentPlugin::<ColourMarkers>::default())
            .add_systems(Startup, spawn_colour_markers)
            .add_systems(
                Update,
                (
                    sync_colour_markers::<GpuBackend>
                        .run_if(resource_exists::<ColourPipeline<GpuBackend>>),
                    sync_colour_markers::<CpuBackend>
                        .run_if(resource_exists::<ColourPipeline<CpuBackend>>),
                )
                    .in_set(ViewerSet::Present),
            );

        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app
            .add_render_command::<Transparent3d, DrawColourMarkers>()
            .init_resource::<SpecializedMeshPipelines<ColourMarkerPipeline>>()
            .init_resource::<PreparedMarkerBindGroup>()
            .init_resource::<MarkerIndirectArgs>()
            .add_systems(
                Render,
                (
                    prepare_marker_indirect_args.in_set(RenderSet::PrepareResources),
                    prepare_marker_bind_group.in_set(RenderSet::PrepareBindGroups),
                    queue_colour_markers.in_set(RenderSet::QueueMeshes),
                ),
            );
    }

    fn finish(&self, app: &mut App) {
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };
        render_app.init_resource::<ColourMarkerPipeline>();
    }
}

fn spawn_colour_markers(mut commands: Commands, mut meshes: ResMut<Assets<Mesh>>) {
    let sphere = Sphere::new(1.0)
        .mesh()
        .uv(MARKER_SPHERE_SECTORS, MARKER_SPHERE_STACKS);

    // Instances are placed in the vertex shader, so the entity's bounds mean nothing.
    commands.spawn((
        Mesh3d(meshes.add(sphere)),
        Transform::default(),
        Visibility::default(),
        NoFrustumCulling,
        ColourMarkers::default(),
    ));
}

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct MarkerUniform {
    scale: f32,
    base_radius: f32,
    _padding: [f32; 2],
}

#[derive(Resource)]
struct ColourMarkerPipeline {
    shader: Handle<Shader>,
    mesh_pipeline: MeshPipeline,
    marker_bind_group_layout: BindGroupLayout,
}

impl FromWorld for ColourMarkerPipeline {
    fn from_world(world: &mut World) -> Self {
        let mesh_pipeline = world.resource::<MeshPipeline>().clone();
        let render_device = world.resource::<RenderDevice>();
        let marker_bind_group_layout = create_marker_bind_group_layout(render_device);

        Self {
            shader: world.load_asset(COLOUR_MARKER_SHADER_PATH),
            mesh_pipeline,
            marker_bind_group_layout,
        }
    }
}

impl SpecializedMeshPipeline for ColourMarkerPipeline {
    type Key = MeshPipelineKey;

    fn specialize(
        &self,
        key: Self::Key,
        layout: &MeshVertexBufferLayoutRef,
    ) -> Result<RenderPipelineDescriptor, SpecializedMeshPipelineError> {
        let mut descriptor = self.mesh_pipeline.specialize(key, layout)?;
        descriptor.label = Some("colour_marker_pipeline".into());
        descriptor.vertex.shader = self.shader.clone();
        // One ColourRecord per instance: colour vec4, position vec3, count u32.
        descriptor.vertex.buffers.push(VertexBufferLayout {
            array_stride: COLOUR_RECORD_SIZE,
            step_mode: VertexStepMode::Instance,
            attributes: vec![
                VertexAttribute {
                    format: VertexFormat::Float32x4,
                    offset: 0,
                    shader_location: 3,
                },
                VertexAttribute {
                    format: VertexFormat::Float32x3,
                    offset: 16,
                    shader_location: 4,
                },
                VertexAttribute {
                    format: VertexFormat::Uint32,
                    offset: 28,
                    shader_location: 5,
                },
            ],
        });

        if let Some(fragment) = descriptor.fragment.as_mut() {
            fragment.shader = self.shader.clone();
        }
        descriptor.layout.push(self.marker_bind_group_layout.clone());

        Ok(descriptor)
    }
}

#[derive(Resource, Default)]
struct PreparedMarkerBindGroup {
    scale: Option<f32>,
    bind_group: Option<BindGroup>,
}

fn prepare_marker_bind_group(
    mut prepared: ResMut<PreparedMarkerBindGroup>,
    render_device: Res<RenderDevice>,
    pipeline: Res<ColourMarkerPipeline>,
    markers: Query<&ColourMarkers>,
) {
    let Some(markers) = markers.iter().next() else {
        return;
    };
    if prepared.scale == Some(markers.scale) && prepared.bind_group.is_some() {
        return;
    }

    let uniform = MarkerUniform {
        scale: markers.scale,
        base_radius: MARKER_BASE_RADIUS,
        _padding: [0.0; 2],
    };
    let buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
        label: Some("colour_marker_uniform"),
        contents: bytemuck::bytes_of(&uniform),
        usage: BufferUsages::UNIFORM,
    });

    prepared.bind_group = Some(render_device.create_bind_group(
        "colour_marker_bind_group",
        &pipeline.marker_bind_group_layout,
        &[BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    ));
    prepared.scale = Some(markers.scale);
}

/// Everything the indirect arguments depend on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndirectArgsKey {
    pub generation: u64,
    pub instance_count: u32,
    pub index_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
}

/// Indexed draw of the marker mesh slice, once per unique colour.
///
/// `None` when there is nothing to draw. A different generation or count yields a different
/// key, so the argument buffer is rebuilt rather than patched.
pub fn marker_draw_args(
    instances: &MarkerInstances,
    index_count: u32,
    first_index: u32,
    base_vertex: i32,
) -> Option<(IndirectArgsKey, DrawIndexedIndirectArgs)> {
    if instances.count == 0 || index_count == 0 {
        return None;
    }
    let key = IndirectArgsKey {
        generation: instances.generation,
        instance_count: instances.count,
        index_count,
        first_index,
        base_vertex,
    };
    let args = DrawIndexedIndirectArgs {
        index_count,
        instance_count: instances.count,
        first_index,
        base_vertex,
        first_instance: 0,
    };
    Some((key, args))
}

#[derive(Resource, Default)]
struct MarkerIndirectArgs {
    key: Option<IndirectArgsKey>,
    buffer: Option<Buffer>,
}

impl MarkerIndirectArgs {
    /// The argument buffer, only if it was built for `generation`.
    fn buffer_for(&self, generation: u64) -> Option<&Buffer> {
        match self.key {
            Some(key) if key.generation == generation => self.buffer.as_ref(),
            _ => None,
        }
    }

    fn clear(&mut self) {
        self.key = None;
        self.buffer = None;
    }
}

fn prepare_marker_indirect_args(
    mut indirect_args: ResMut<MarkerIndirectArgs>,
    render_device: Res<RenderDevice>,
    markers: Query<(&ColourMarkers, &MainEntity)>,
    render_mesh_instances: Res<RenderMeshInstances>,
    meshes: Res<RenderAssets<RenderMesh>>,
    mesh_allocator: Res<MeshAllocator>,
) {
    let Some((markers, main_entity)) = markers.iter().next() else {
        indirect_args.clear();
        return;
    };
    let Some(instances) = markers
        .instances
        .as_ref()
        .filter(|instances| instances.buffer.is_some())
    else {
        indirect_args.clear();
        return;
    };
    let Some(mesh_instance) = render_mesh_instances.render_mesh_queue_data(*main_entity) else {
        return;
    };
    let Some(gpu_mesh) = meshes.get(mesh_instance.mesh_asset_id) else {
        return;
    };
    let RenderMeshBufferInfo::Indexed { count, .. } = gpu_mesh.buffer_info else {
        return;
    };
    let (Some(vertex_slice), Some(index_slice)) = (
        mesh_allocator.mesh_vertex_slice(&mesh_instance.mesh_asset_id),
        mesh_allocator.mesh_index_slice(&mesh_instance.mesh_asset_id),
    ) else {
        return;
    };

    let Some((key, args)) = marker_draw_args(
        instances,
        count,
        index_slice.range.start,
        vertex_slice.range.start as i32,
    ) else {
        indirect_args.clear();
        return;
    };
    if indirect_args.key == Some(key) {
        return;
    }

    indirect_args.buffer = Some(render_device.create_buffer_with_data(&BufferInitDescriptor {
        label: Some("colour_marker_indirect_args"),
        contents: args.as_bytes(),
        usage: BufferUsages::INDIRECT,
    }));
    indirect_args.key = Some(key);
}

fn queue_colour_markers(
    transparent_3d_draw_functions: Res<DrawFunctions<Transparent3d>>,
    colour_marker_pipeline: Res<ColourMarkerPipeline>,
    mut pipelines: ResMut<SpecializedMeshPipelines<ColourMarkerPipeline>>,
    pipeline_cache: Res<PipelineCache>,
    meshes: Res<RenderAssets<RenderMesh>>,
    render_mesh_instances: Res<RenderMeshInstances>,
    markers: Query<(Entity, &MainEntity, &ColourMarkers)>,
    mut transparent_render_phases: ResMut<ViewSortedRenderPhases<Transparent3d>>,
    views: Query<(&ExtractedView, &Msaa)>,
) {
    let draw_colour_markers = transparent_3d_draw_functions
        .read()
        .id::<DrawColourMarkers>();

    for (view, msaa) in &views {
        let Some(transparent_phase) = transparent_render_phases.get_mut(&view.retained_view_entity)
        else {
            continue;
        };

        let msaa_key = MeshPipelineKey::from_msaa_samples(msaa.samples());
        let view_key = msaa_key | MeshPipelineKey::from_hdr(view.hdr);
        let rangefinder = view.rangefinder3d();

        for (entity, main_entity, markers) in &markers {
            let drawable = markers
                .instances
                .as_ref()
                .is_some_and(|instances| instances.count > 0 && instances.buffer.is_some());
            if !drawable {
                continue;
            }
            let Some(mesh_instance) = render_mesh_instances.render_mesh_queue_data(*main_entity)
            else {
                continue;
            };
            let Some(mesh) = meshes.get(mesh_instance.mesh_asset_id) else {
                continue;
            };

            let key =
                view_key | MeshPipelineKey::from_primitive_topology(mesh.primitive_topology());
            let pipeline = match pipelines.specialize(
                &pipeline_cache,
                &colour_marker_pipeline,
                key,
                &mesh.layout,
            ) {
                Ok(pipeline) => pipeline,
                Err(err) => {
                    error!("Colour marker pipeline specialisation failed: {err}");
                    continue;
                }
            };

            transparent_phase.add(Transparent3d {
                entity: (entity, *main_entity),
                pipeline,
                draw_function: draw_colour_markers,
                distance: rangefinder.distance_translation(&mesh_instance.translation),
                batch_range: 0..1,
                extra_index: PhaseItemExtraIndex::None,
                indexed: true,
            });
        }
    }
}

type DrawColourMarkers = (
    SetItemPipeline,
    SetMeshViewBindGroup<0>,
    SetMeshBindGroup<1>,
    SetMarkerBindGroup<2>,
    DrawColourMarkersIndirect,
);

struct SetMarkerBindGroup<const I: usize>;

impl<P: PhaseItem, const I: usize> RenderCommand<P> for SetMarkerBindGroup<I> {
    type Param = SRes<PreparedMarkerBindGroup>;
    type ViewQuery = ();
    type ItemQuery = ();

    #[inline]
    fn render<'w>(
        _item: &P,
        _view: (),
        _entity: Option<()>,
        prepared: SystemParamItem<'w, '_, Self::Param>,
        pass: &mut TrackedRenderPass<'w>,
    ) -> RenderCommandResult {
        let prepared = prepared.into_inner();
        if let Some(bind_group) = &prepared.bind_group {
            pass.set_bind_group(I, bind_group, &[]);
            RenderCommandResult::Success
        } else {
            RenderCommandResult::Failure("missing colour marker bind group")
        }
    }
}

struct DrawColourMarkersIndirect;

impl<P: PhaseItem> RenderCommand<P> for DrawColourMarkersIndirect {
    type Param = (
        SRes<RenderAssets<RenderMesh>>,
        SRes<RenderMeshInstances>,
        SRes<MeshAllocator>,
        SRes<MarkerIndirectArgs>,
    );
    type ViewQuery = ();
    type ItemQuery = Read<ColourMarkers>;

    #[inline]
    fn render<'w>(
        item: &P,
        _view: (),
        markers: Option<&'w ColourMarkers>,
        (meshes, render_mesh_instances, mesh_allocator, indirect_args): SystemParamItem<
            'w,
            '_,
            Self::Param,
        >,
        pass: &mut TrackedRenderPass<'w>,
    ) -> RenderCommandResult {
        let mesh_allocator = mesh_allocator.into_inner();
        let indirect_args = indirect_args.into_inner();

        let Some(instances) = markers.and_then(|markers| markers.instances.as_ref()) else {
            return RenderCommandResult::Skip;
        };
        let Some(instance_buffer) = instances.buffer.as_ref() else {
            return RenderCommandResult::Skip;
        };
        let Some(indirect_buffer) = indirect_args.buffer_for(instances.generation) else {
            return RenderCommandResult::Skip;
        };
        let Some(mesh_instance) = render_mesh_instances.render_mesh_queue_data(item.main_entity())
        else {
            return RenderCommandResult::Skip;
        };
        let Some(gpu_mesh) = meshes.into_inner().get(mesh_instance.mesh_asset_id) else {
            return RenderCommandResult::Skip;
        };
        let RenderMeshBufferInfo::Indexed { index_format, .. } = gpu_mesh.buffer_info else {
            return RenderCommandResult::Skip;
        };
        let (Some(vertex_buffer_slice), Some(index_buffer_slice)) = (
            mesh_allocator.mesh_vertex_slice(&mesh_instance.mesh_asset_id),
            mesh_allocator.mesh_index_slice(&mesh_instance.mesh_asset_id),
        ) else {
            return RenderCommandResult::Skip;
        };

        pass.set_vertex_buffer(0, vertex_buffer_slice.buffer.slice(..));
        pass.set_vertex_buffer(1, instance_buffer.slice(..));
        pass.set_index_buffer(index_buffer_slice.buffer.slice(..), 0, index_format);
        pass.draw_indexed_indirect(indirect_buffer, 0);

        RenderCommandResult::Success
    }
}

fn create_marker_bind_group_layout(render_device: &RenderDevice) -> BindGroupLayout {
    render_device.create_bind_group_layout(
        "colour_marker_layout",
        &[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStages::VERTEX,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    )
}
