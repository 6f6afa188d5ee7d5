use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;

use crate::engine::compute::backend::ColourBackend;
use crate::engine::core::app_state::StatusText;
use crate::engine::pipeline::orchestrator::ColourPipeline;

pub fn status_text_update_system<B: ColourBackend>(
    pipeline: Res<ColourPipeline<B>>,
    diagnostics: Res<DiagnosticsStore>,
    mut query: Query<&mut Text, With<StatusText>>,
) {
    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|fps| fps.smoothed());
    let status = status_lines(&pipeline, fps);

    for mut text in &mut query {
        if text.0 != status {
            text.0 = status.clone();
        }
    }
}

pub fn status_lines<B: ColourBackend>(pipeline: &ColourPipeline<B>, fps: Option<f64>) -> String {
    let mut lines = if pipeline.image_loaded() {
        format!(
            "Colours: {}\nSpace: {}\nScale: {:.2}",
            pipeline.unique_count(),
            pipeline.colour_space().label(),
            pipeline.scale()
        )
    } else {
        "Drop an image onto the window".to_string()
    };
    lines.push_str(&format!("\nBackend: {}", pipeline.backend().name()));
    if let Some(fps) = fps {
        lines.push_str(&format!("\nFPS: {fps:.1}"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compute::cpu_backend::CpuBackend;
    use crate::engine::pipeline::orchestrator::PipelineSettings;
    use crate::engine::source::image_source::SourceImage;

    #[test]
    fn status_reports_the_loaded_image() {
        let mut pipeline = ColourPipeline::new(CpuBackend, PipelineSettings::default());
        assert_eq!(
            status_lines(&pipeline, None),
            "Drop an image onto the window\nBackend: cpu"
        );

        let image = SourceImage::from_rgba(2, 1, &[[1, 2, 3, 255], [1, 2, 3, 255]]).unwrap();
        pipeline.load(Ok(image)).unwrap();
        assert_eq!(
            status_lines(&pipeline, Some(59.96)),
            "Colours: 1\nSpace: RGB\nScale: 1.00\nBackend: cpu\nFPS: 60.0"
        );
    }
}
