use bevy::ecs::system::RunSystemOnce;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy::window::FileDragAndDrop;
use colour_space_render_engine::engine::animation::state::{AnimationDirection, ColourSpace};
use colour_space_render_engine::engine::colour::layout::ColourLayout;
use colour_space_render_engine::engine::colour::record::{ColourRecord, quantise};
use colour_space_render_engine::engine::compute::backend::{
    ColourBackend, HistogramOptions, WorkSetArray,
};
use colour_space_render_engine::engine::compute::cpu_backend::CpuBackend;
use colour_space_render_engine::engine::pipeline::orchestrator::{
    ColourPipeline, PipelineSettings,
};
use colour_space_render_engine::engine::render::colour_marker_plugin::marker_draw_args;
use colour_space_render_engine::engine::render::extraction::colour_markers::{
    ColourMarkers, sync_colour_markers,
};
use colour_space_render_engine::engine::source::image_source::SourceImage;
use colour_space_render_engine::engine::systems::input::ViewerInputPlugin;
use colour_space_render_engine::engine::systems::viewer::{
    ColourViewerPlugin, LastLoadRequest, ViewerImage,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn image(width: u32, height: u32, pixels: &[[u8; 4]]) -> SourceImage {
    SourceImage::from_rgba(width, height, pixels).unwrap()
}

/// 48x32 gradient with plenty of repeated colours.
fn gradient() -> SourceImage {
    let pixels: Vec<[u8; 4]> = (0..32u32)
        .flat_map(|y| {
            (0..48u32).map(move |x| {
                [
                    (x * 5) as u8 & 0xf8,
                    (y * 7) as u8 & 0xf0,
                    ((x + y) * 3) as u8,
                    255,
                ]
            })
        })
        .collect();
    image(48, 32, &pixels)
}

fn pipeline(animation_time: f32) -> ColourPipeline<CpuBackend> {
    ColourPipeline::new(
        CpuBackend,
        PipelineSettings {
            animation_time,
            ..PipelineSettings::default()
        },
    )
}

fn colour_counts(records: &[ColourRecord]) -> BTreeMap<[u8; 3], u32> {
    records
        .iter()
        .map(|record| (quantise(record.rgb()), record.count))
        .collect()
}

fn work(pipeline: &mut ColourPipeline<CpuBackend>, array: WorkSetArray) -> Vec<ColourRecord> {
    pipeline.read_records(array).unwrap().unwrap()
}

#[test]
fn histogram_counts_every_pixel_once() {
    let source = gradient();
    let histogram = CpuBackend.build_histogram(&source, &HistogramOptions::default());
    assert_eq!(histogram.total(), 48 * 32);
}

#[test]
fn unique_colours_match_a_reference_dedup() {
    let source = gradient();
    let mut reference: BTreeMap<[u8; 3], u32> = BTreeMap::new();
    for [r, g, b, _] in source.rgba() {
        *reference.entry([r, g, b]).or_default() += 1;
    }

    let mut pipeline = pipeline(1.0);
    let summary = pipeline.load(Ok(source)).unwrap();

    assert_eq!(summary.unique_colours as usize, reference.len());
    let rgb = work(&mut pipeline, WorkSetArray::RgbSpace);
    assert_eq!(colour_counts(&rgb), reference);
}

#[test]
fn hsv_array_shares_colours_and_round_trips() {
    let mut pipeline = pipeline(1.0);
    pipeline.load(Ok(gradient())).unwrap();
    let layout = ColourLayout::default();

    let rgb = work(&mut pipeline, WorkSetArray::RgbSpace);
    let hsv = work(&mut pipeline, WorkSetArray::HsvSpace);
    assert_eq!(rgb.len(), hsv.len());

    for (a, b) in rgb.iter().zip(&hsv) {
        assert_eq!(a.colour, b.colour);
        assert_eq!(a.count, b.count);
        let from_cylinder = layout.rgb_from_cylinder_position(b.position);
        assert_eq!(quantise(from_cylinder), quantise(a.rgb()));
    }
}

#[test]
fn animator_starts_at_the_source_and_lands_on_the_destination() {
    let mut pipeline = pipeline(1.0);
    pipeline.load(Ok(gradient())).unwrap();
    let rgb = work(&mut pipeline, WorkSetArray::RgbSpace);
    let hsv = work(&mut pipeline, WorkSetArray::HsvSpace);

    assert!(pipeline.start_animation());
    let first = pipeline.tick(0.0).unwrap();
    assert_eq!(first.weight, 0.0);
    assert_eq!(work(&mut pipeline, WorkSetArray::Work), rgb);

    // Track the distance to the destination of one moving record.
    let moving = rgb
        .iter()
        .zip(&hsv)
        .position(|(a, b)| a.position != b.position)
        .unwrap();
    let distance = |records: &[ColourRecord]| {
        let [x, y, z] = records[moving].position;
        let [hx, hy, hz] = hsv[moving].position;
        ((x - hx).powi(2) + (y - hy).powi(2) + (z - hz).powi(2)).sqrt()
    };

    let mut previous_t = 0.0;
    let mut previous_distance = distance(&rgb);
    loop {
        let step = pipeline.tick(0.05).unwrap();
        assert!(step.t >= previous_t);
        let current = work(&mut pipeline, WorkSetArray::Work);
        let current_distance = distance(&current);
        assert!(current_distance <= previous_distance + 1e-4);
        previous_t = step.t;
        previous_distance = current_distance;
        if step.finished {
            break;
        }
    }

    assert_eq!(work(&mut pipeline, WorkSetArray::Work), hsv);
    assert_eq!(pipeline.animation().direction(), AnimationDirection::HsvToRgb);
}

#[test]
fn loading_the_same_image_twice_is_stable() {
    let mut pipeline = pipeline(1.0);
    let first = pipeline.load(Ok(gradient())).unwrap();
    let first_set = colour_counts(&work(&mut pipeline, WorkSetArray::RgbSpace));

    let second = pipeline.load(Ok(gradient())).unwrap();
    let second_set = colour_counts(&work(&mut pipeline, WorkSetArray::RgbSpace));

    assert_eq!(first.unique_colours, second.unique_colours);
    assert_eq!(first_set, second_set);
    assert_ne!(first.generation, second.generation);
}

#[test]
fn four_colour_image_yields_four_instances() {
    let mut pipeline = pipeline(1.0);
    let source = image(
        2,
        2,
        &[[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255], [255, 255, 255, 255]],
    );
    let summary = pipeline.load(Ok(source)).unwrap();

    assert_eq!(summary.unique_colours, 4);
    let work_set = pipeline.generation().unwrap().work_set().unwrap();
    assert_eq!(work_set.len(), 4);

    let mut world = World::new();
    world.insert_resource(pipeline);
    let marker = world.spawn(ColourMarkers::default()).id();
    world
        .run_system_once(sync_colour_markers::<CpuBackend>)
        .unwrap();

    let markers = world.get::<ColourMarkers>(marker).unwrap();
    let instances = markers.instances.as_ref().unwrap();
    let (_, args) = marker_draw_args(instances, 36, 0, 0).unwrap();
    assert_eq!(args.instance_count, 4);
}

#[test]
fn single_colour_image_yields_one_record_with_the_full_count() {
    let mut pipeline = pipeline(1.0);
    let source = image(4, 4, &[[12, 34, 56, 255]; 16]);
    pipeline.load(Ok(source)).unwrap();

    assert_eq!(pipeline.unique_count(), 1);
    let rgb = work(&mut pipeline, WorkSetArray::RgbSpace);
    assert_eq!(rgb.len(), 1);
    assert_eq!(rgb[0].count, 16);
    assert_eq!(quantise(rgb[0].rgb()), [12, 34, 56]);
}

#[test]
fn zero_byte_input_leaves_nothing_loaded() {
    let mut pipeline = pipeline(1.0);
    pipeline.load(Ok(gradient())).unwrap();

    assert!(pipeline.load(SourceImage::from_encoded(&[])).is_err());
    assert!(!pipeline.ready_for_animation());
    assert_eq!(pipeline.unique_count(), 0);
    assert!(pipeline.generation().is_none());
}

#[test]
fn start_while_running_is_ignored() {
    let mut pipeline = pipeline(1.0);
    pipeline.load(Ok(gradient())).unwrap();

    assert!(pipeline.start_animation());
    pipeline.tick(0.25);
    let before = pipeline.animation().clone();

    assert!(!pipeline.start_animation());
    assert_eq!(pipeline.animation(), &before);
    assert_eq!(pipeline.colour_space(), ColourSpace::Hsv);
}

#[test]
fn new_load_mid_animation_returns_to_idle() {
    let mut pipeline = pipeline(1.0);
    pipeline.load(Ok(gradient())).unwrap();
    pipeline.start_animation();
    pipeline.tick(0.4);
    assert!(pipeline.animation().is_running());

    pipeline.load(Ok(gradient())).unwrap();
    assert!(!pipeline.animation().is_running());
    assert_eq!(pipeline.animation().t(), 0.0);
    assert_eq!(pipeline.colour_space(), ColourSpace::Rgb);
    assert_eq!(
        work(&mut pipeline, WorkSetArray::Work),
        work(&mut pipeline, WorkSetArray::RgbSpace)
    );
}

/// PNG under the system temp dir, unique per test.
fn write_png(name: &str, width: u32, height: u32, pixels: &[[u8; 4]]) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "colour_space_{name}_{}.png",
        std::process::id()
    ));
    let raw: Vec<u8> = pixels.iter().flatten().copied().collect();
    image::RgbaImage::from_raw(width, height, raw)
        .unwrap()
        .save(&path)
        .unwrap();
    path
}

fn viewer_app(animation_time: f32) -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, AssetPlugin::default()))
        .init_asset::<Image>()
        .add_event::<FileDragAndDrop>()
        .init_resource::<ButtonInput<KeyCode>>()
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)))
        .insert_resource(pipeline(animation_time))
        .add_plugins(ColourViewerPlugin::<CpuBackend>::default())
        .add_plugins(ViewerInputPlugin);
    app
}

fn drop_file(app: &mut App, path: &Path) {
    let path_buf = path.to_path_buf();
    app.world_mut()
        .run_system_once(move |mut drops: EventWriter<FileDragAndDrop>| {
            drops.write(FileDragAndDrop::DroppedFile {
                window: Entity::PLACEHOLDER,
                path_buf: path_buf.clone(),
            });
        })
        .unwrap();
    app.update();
}

fn tap(app: &mut App, key: KeyCode) {
    app.world_mut()
        .resource_mut::<ButtonInput<KeyCode>>()
        .press(key);
    app.update();
    let mut keyboard = app.world_mut().resource_mut::<ButtonInput<KeyCode>>();
    keyboard.release(key);
    keyboard.clear();
}

fn viewer_pipeline(app: &mut App) -> Mut<'_, ColourPipeline<CpuBackend>> {
    app.world_mut().resource_mut::<ColourPipeline<CpuBackend>>()
}

#[test]
fn dropped_file_is_loaded_and_published() {
    let path = write_png(
        "drop",
        2,
        2,
        &[[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255], [255, 0, 0, 255]],
    );
    let mut app = viewer_app(1.0);
    drop_file(&mut app, &path);

    assert_eq!(viewer_pipeline(&mut app).unique_count(), 3);
    assert_eq!(
        app.world().resource::<LastLoadRequest>().path.as_deref(),
        Some(path.as_path())
    );

    let viewer_image = app.world().resource::<ViewerImage>();
    assert_eq!(viewer_image.generation(), Some(1));
    let handle = viewer_image.handle.clone().unwrap();
    let texture = app.world().resource::<Assets<Image>>().get(&handle).unwrap();
    assert_eq!(texture.size(), UVec2::new(2, 2));

    std::fs::remove_file(path).ok();
}

#[test]
fn keyboard_drives_animation_reload_and_scale() {
    let path = write_png(
        "keys",
        3,
        1,
        &[[200, 20, 20, 255], [20, 200, 20, 255], [20, 20, 200, 255]],
    );
    let mut app = viewer_app(1.0);
    drop_file(&mut app, &path);

    tap(&mut app, KeyCode::Enter);
    assert!(viewer_pipeline(&mut app).animation().is_running());
    assert_eq!(viewer_pipeline(&mut app).colour_space(), ColourSpace::Hsv);

    let mut frames = 0;
    while viewer_pipeline(&mut app).animation().is_running() && frames < 50 {
        app.update();
        frames += 1;
    }
    assert!(frames < 50);
    {
        let mut pipeline = viewer_pipeline(&mut app);
        assert_eq!(
            work(&mut pipeline, WorkSetArray::Work),
            work(&mut pipeline, WorkSetArray::HsvSpace)
        );
    }

    tap(&mut app, KeyCode::Equal);
    assert_eq!(viewer_pipeline(&mut app).scale(), 1.25);

    tap(&mut app, KeyCode::Space);
    {
        let pipeline = viewer_pipeline(&mut app);
        assert_eq!(pipeline.generation().map(|generation| generation.id()), Some(2));
        assert_eq!(pipeline.colour_space(), ColourSpace::Rgb);
        assert_eq!(pipeline.unique_count(), 3);
    }

    std::fs::remove_file(path).ok();
}

#[test]
fn unreadable_drop_tears_down_the_current_image() {
    let path = write_png("teardown", 1, 1, &[[1, 2, 3, 255]]);
    let mut app = viewer_app(1.0);
    drop_file(&mut app, &path);
    assert!(viewer_pipeline(&mut app).image_loaded());

    drop_file(&mut app, &path.with_extension("missing.png"));
    assert!(!viewer_pipeline(&mut app).image_loaded());
    assert_eq!(app.world().resource::<ViewerImage>().handle, None);

    // Enter without an image does nothing.
    tap(&mut app, KeyCode::Enter);
    assert!(!viewer_pipeline(&mut app).animation().is_running());

    std::fs::remove_file(path).ok();
}
