use bevy::log::{debug, info};
use bevy::prelude::Resource;
use constants::compute::HISTOGRAM_DOMAIN_SIZE;
use constants::render_settings::{
    DEFAULT_ANIMATION_TIME, DEFAULT_MARKER_SCALE, MAX_MARKER_SCALE, MIN_MARKER_SCALE,
};
use std::num::NonZeroU32;
use thiserror::Error;

use crate::engine::animation::state::{AnimationState, AnimationStep, ColourSpace};
use crate::engine::colour::layout::ColourLayout;
use crate::engine::colour::record::ColourRecord;
use crate::engine::compute::backend::{ColourBackend, HistogramOptions, ReadbackError, WorkSetArray};
use crate::engine::pipeline::generation::{Generation, GenerationContent};
use crate::engine::source::image_source::{SourceError, SourceImage};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("unique colour count readback failed: {0}")]
    Readback(#[from] ReadbackError),
    #[error("{width}x{height} image is over the {backend} backend's {max_pixels} pixel limit")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
        backend: &'static str,
    },
}

/// Tunables the pipeline reads on every load and frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineSettings {
    pub animation_time: f32,
    pub scale: f32,
    pub skip_transparent: bool,
    pub layout: ColourLayout,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            animation_time: DEFAULT_ANIMATION_TIME,
            scale: DEFAULT_MARKER_SCALE,
            skip_transparent: false,
            layout: ColourLayout::default(),
        }
    }
}

/// Outcome of a successful load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadSummary {
    pub generation: u64,
    pub width: u32,
    pub height: u32,
    pub unique_colours: u32,
}

/// Sequences histogram -> compaction -> count readback -> work set init, then drives the
/// animator once per frame.
///
/// At most one [`Generation`] is live. `load` drops the current one before touching the
/// backend, so a failed load always leaves nothing behind.
#[derive(Resource)]
pub struct ColourPipeline<B: ColourBackend> {
    backend: B,
    settings: PipelineSettings,
    animation: AnimationState,
    generation: Option<Generation<B>>,
    generations_built: u64,
}

impl<B: ColourBackend> ColourPipeline<B> {
    pub fn new(backend: B, settings: PipelineSettings) -> Self {
        let mut pipeline = Self {
            backend,
            settings,
            animation: AnimationState::new(settings.animation_time),
            generation: None,
            generations_built: 0,
        };
        pipeline.settings.scale = clamp_scale(settings.scale);
        pipeline
    }

    /// Releases the current generation, then runs every stage for `source`.
    ///
    /// Takes the image source's result directly so a failed decode still tears the previous
    /// generation down.
    pub fn load(
        &mut self,
        source: Result<SourceImage, SourceError>,
    ) -> Result<LoadSummary, PipelineError> {
        self.release();
        let image = source?;
        check_pixel_budget(&image, self.backend.max_pixels(), self.backend.name())?;

        let options = HistogramOptions {
            skip_transparent: self.settings.skip_transparent,
        };
        let layout = self.settings.layout;
        let capacity = image.pixel_count().min(HISTOGRAM_DOMAIN_SIZE);

        debug!(
            "{} backend: histogram over {}x{} pixels",
            self.backend.name(),
            image.width(),
            image.height()
        );
        let histogram = self.backend.build_histogram(&image, &options);
        let unique = self
            .backend
            .compact_unique_colours(&histogram, capacity, &layout);
        drop(histogram);

        let count = self.backend.read_unique_count(&unique)?;
        let content = match NonZeroU32::new(count) {
            None => GenerationContent::Empty,
            Some(count) => {
                let work_set = self.backend.init_work_set(&unique, count, &layout);
                GenerationContent::Populated {
                    unique,
                    work_set,
                    count,
                }
            }
        };

        self.generations_built += 1;
        let summary = LoadSummary {
            generation: self.generations_built,
            width: image.width(),
            height: image.height(),
            unique_colours: count,
        };
        self.generation = Some(Generation::new(self.generations_built, image, content));

        info!(
            "Loaded {}x{} image: {} unique colours (generation {})",
            summary.width, summary.height, summary.unique_colours, summary.generation
        );
        Ok(summary)
    }

    /// Drops the live generation and returns the animator to its post-load state.
    pub fn release(&mut self) {
        if let Some(generation) = self.generation.take() {
            debug!("Releasing generation {}", generation.id());
        }
        self.animation.reset();
    }

    /// Starts a transition towards the other layout. Ignored while one is running or before
    /// an image is loaded.
    pub fn start_animation(&mut self) -> bool {
        if !self.image_loaded() {
            return false;
        }
        let started = self.animation.start();
        if started {
            info!(
                "Animating {:?} towards {}",
                self.animation.direction(),
                self.animation.colour_space().label()
            );
        }
        started
    }

    /// Advances the animator and, if it produced a step, dispatches the blend for this frame.
    pub fn tick(&mut self, delta_secs: f32) -> Option<AnimationStep> {
        let step = self.animation.tick(delta_secs)?;
        if let Some(work_set) = self
            .generation
            .as_mut()
            .and_then(|generation| generation.work_set_mut())
        {
            self.backend.animate(work_set, step.direction, step.weight);
        }
        if step.finished {
            debug!("Animation finished in {}", step.direction.destination().label());
        }
        Some(step)
    }

    /// Host copy of one work set array; `None` when nothing is loaded or the image had no colours.
    pub fn read_records(
        &mut self,
        array: WorkSetArray,
    ) -> Result<Option<Vec<ColourRecord>>, ReadbackError> {
        let Some(work_set) = self
            .generation
            .as_ref()
            .and_then(|generation| generation.work_set())
        else {
            return Ok(None);
        };
        self.backend.read_records(work_set, array).map(Some)
    }

    pub fn colour_space(&self) -> ColourSpace {
        self.animation.colour_space()
    }

    pub fn ready_for_animation(&self) -> bool {
        self.image_loaded() && !self.animation.is_running()
    }

    pub fn image_loaded(&self) -> bool {
        self.generation.is_some()
    }

    pub fn image(&self) -> Option<&SourceImage> {
        self.generation.as_ref().map(Generation::image)
    }

    pub fn unique_count(&self) -> u32 {
        self.generation
            .as_ref()
            .map_or(0, Generation::unique_count)
    }

    pub fn generation(&self) -> Option<&Generation<B>> {
        self.generation.as_ref()
    }

    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    pub fn scale(&self) -> f32 {
        self.settings.scale
    }

    /// Sets the marker scale, clamped to the supported range. Returns the value applied.
    pub fn set_scale(&mut self, scale: f32) -> f32 {
        self.settings.scale = clamp_scale(scale);
        self.settings.scale
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// New settings apply to the next load; animation time and scale apply immediately.
    pub fn apply_settings(&mut self, settings: PipelineSettings) {
        self.animation.set_duration(settings.animation_time);
        self.settings = settings;
        self.settings.scale = clamp_scale(settings.scale);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// Rejects images the backend cannot upload before any stage allocates for them.
fn check_pixel_budget(
    image: &SourceImage,
    max_pixels: u64,
    backend: &'static str,
) -> Result<(), PipelineError> {
    if u64::from(image.pixel_count()) <= max_pixels {
        return Ok(());
    }
    Err(PipelineError::ImageTooLarge {
        width: image.width(),
        height: image.height(),
        max_pixels,
        backend,
    })
}

fn clamp_scale(scale: f32) -> f32 {
    if scale.is_finite() {
        scale.clamp(MIN_MARKER_SCALE, MAX_MARKER_SCALE)
    } else {
        DEFAULT_MARKER_SCALE
    }
}
