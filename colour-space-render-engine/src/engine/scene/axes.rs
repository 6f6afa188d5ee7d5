use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::view::NoFrustumCulling;
use std::f32::consts::TAU;

use crate::engine::animation::state::ColourSpace;
use crate::engine::colour::hsv::hsv_to_rgb;
use crate::engine::colour::layout::ColourLayout;
use crate::engine::compute::backend::ColourBackend;
use crate::engine::loading::settings::ActiveSettings;
use crate::engine::pipeline::orchestrator::ColourPipeline;

const HSV_RING_SEGMENTS: u32 = 72;
/// Hues of the vertical guides on the cylinder wall: the primaries and secondaries.
const HSV_GUIDE_HUES: [f32; 6] = [0.0, 1.0 / 6.0, 2.0 / 6.0, 3.0 / 6.0, 4.0 / 6.0, 5.0 / 6.0];

/// Line mesh outlining the layout of one colour space.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColourAxis(pub ColourSpace);

/// Spawns both outlines hidden. Visibility follows the pipeline afterwards.
pub fn spawn_colour_axes(
    mut commands: Commands,
    settings: Res<ActiveSettings>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let axis_material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        unlit: true,
        ..default()
    });

    let layout = settings.layout;
    for (space, mesh) in [
        (ColourSpace::Rgb, rgb_cube_mesh(&layout)),
        (ColourSpace::Hsv, hsv_cylinder_mesh(&layout)),
    ] {
        commands.spawn((
            Mesh3d(meshes.add(mesh)),
            MeshMaterial3d(axis_material.clone()),
            Visibility::Hidden,
            NoFrustumCulling,
            Transform::IDENTITY,
            ColourAxis(space),
        ));
    }
}

/// Shows the outline of the space the markers are in (or heading to), nothing without an image.
pub fn update_axis_visibility<B: ColourBackend>(
    pipeline: Res<ColourPipeline<B>>,
    mut axes: Query<(&ColourAxis, &mut Visibility)>,
) {
    let shown = pipeline
        .image_loaded()
        .then(|| pipeline.colour_space());

    for (axis, mut visibility) in &mut axes {
        let target = if shown == Some(axis.0) {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
        visibility.set_if_neq(target);
    }
}

/// Twelve cube edges, each corner coloured with the RGB value it stands for.
pub fn rgb_cube_mesh(layout: &ColourLayout) -> Mesh {
    let corners: Vec<[f32; 3]> = (0..8u32)
        .map(|corner| {
            [
                ((corner >> 2) & 1) as f32,
                ((corner >> 1) & 1) as f32,
                (corner & 1) as f32,
            ]
        })
        .collect();

    let mut indices = Vec::with_capacity(24);
    for corner in 0..8u32 {
        for bit in [1, 2, 4] {
            if corner & bit == 0 {
                indices.extend_from_slice(&[corner, corner | bit]);
            }
        }
    }

    let positions: Vec<[f32; 3]> = corners.iter().map(|&rgb| layout.rgb_position(rgb)).collect();
    let colours: Vec<[f32; 4]> = corners.iter().map(|&rgb| vertex_colour(rgb)).collect();
    line_mesh(positions, colours, indices)
}

/// Top rim at full value, bottom rim at zero value, the grey axis, and six hue guides.
pub fn hsv_cylinder_mesh(layout: &ColourLayout) -> Mesh {
    let mut positions = Vec::new();
    let mut colours = Vec::new();
    let mut indices = Vec::new();

    let top = layout.hsv_height * 0.5;
    let bottom = -top;
    let rim = |hue: f32, y: f32| {
        let angle = hue * TAU;
        [layout.hsv_radius * angle.cos(), y, layout.hsv_radius * angle.sin()]
    };

    for (y, value) in [(top, 1.0), (bottom, 0.0)] {
        let start = positions.len() as u32;
        for segment in 0..HSV_RING_SEGMENTS {
            let hue = segment as f32 / HSV_RING_SEGMENTS as f32;
            positions.push(rim(hue, y));
            colours.push(vertex_colour(hsv_to_rgb([hue, 1.0, value])));
            indices.extend_from_slice(&[
                start + segment,
                start + (segment + 1) % HSV_RING_SEGMENTS,
            ]);
        }
    }

    let mut segment = |from: [f32; 3], from_rgb: [f32; 3], to: [f32; 3], to_rgb: [f32; 3]| {
        let start = positions.len() as u32;
        positions.extend_from_slice(&[from, to]);
        colours.extend_from_slice(&[vertex_colour(from_rgb), vertex_colour(to_rgb)]);
        indices.extend_from_slice(&[start, start + 1]);
    };

    segment([0.0, bottom, 0.0], [0.0; 3], [0.0, top, 0.0], [1.0; 3]);
    for hue in HSV_GUIDE_HUES {
        segment(
            rim(hue, bottom),
            [0.0; 3],
            rim(hue, top),
            hsv_to_rgb([hue, 1.0, 1.0]),
        );
    }

    line_mesh(positions, colours, indices)
}

fn vertex_colour([r, g, b]: [f32; 3]) -> [f32; 4] {
    Color::srgb(r, g, b).to_linear().to_f32_array()
}

fn line_mesh(positions: Vec<[f32; 3]>, colours: Vec<[f32; 4]>, indices: Vec<u32>) -> Mesh {
    let mut mesh = Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::RENDER_WORLD);
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colours);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}
