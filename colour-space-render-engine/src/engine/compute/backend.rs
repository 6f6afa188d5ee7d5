use bevy::render::render_resource::BufferAsyncError;
use std::num::NonZeroU32;
use thiserror::Error;

use crate::engine::animation::state::AnimationDirection;
use crate::engine::colour::layout::ColourLayout;
use crate::engine::colour::record::ColourRecord;
use crate::engine::source::image_source::SourceImage;

#[derive(Debug, Error)]
pub enum ReadbackError {
    #[error("mapping the {label} staging buffer failed: {source}")]
    Map {
        label: &'static str,
        #[source]
        source: BufferAsyncError,
    },
    #[error("the device dropped the {label} readback before it completed")]
    Disconnected { label: &'static str },
}

/// Histogram build switches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HistogramOptions {
    /// Leave pixels with alpha 0 out of the counts.
    pub skip_transparent: bool,
}

/// The three index-aligned arrays of a work set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkSetArray {
    RgbSpace,
    HsvSpace,
    Work,
}

/// One implementation of the dedup and animation kernels.
///
/// Each stage consumes the previous stage's output by reference, so a stage cannot run
/// before its input exists. The orchestrator owns every returned value and decides when
/// it is dropped.
pub trait ColourBackend: Send + Sync + 'static {
    /// Dense 256³ occurrence counts.
    type Histogram: Send + Sync;
    /// Compacted records plus the append counter.
    type UniqueColours: Send + Sync;
    /// RGB-space, HSV-space and Work arrays of length N.
    type WorkSet: Send + Sync;

    fn name(&self) -> &'static str;

    /// Largest image, in pixels, that [`Self::build_histogram`] can take in one upload.
    fn max_pixels(&self) -> u64 {
        u64::MAX
    }

    /// Zeroes a fresh histogram and counts every pixel of `image` into it.
    fn build_histogram(
        &mut self,
        image: &SourceImage,
        options: &HistogramOptions,
    ) -> Self::Histogram;

    /// Appends one record per non-zero slot. `capacity` bounds the number of records stored.
    fn compact_unique_colours(
        &mut self,
        histogram: &Self::Histogram,
        capacity: u32,
        layout: &ColourLayout,
    ) -> Self::UniqueColours;

    /// Blocks until the append counter is visible on the host.
    fn read_unique_count(&mut self, unique: &Self::UniqueColours) -> Result<u32, ReadbackError>;

    /// Builds the RGB-space and HSV-space arrays and seeds Work with RGB-space.
    fn init_work_set(
        &mut self,
        unique: &Self::UniqueColours,
        count: NonZeroU32,
        layout: &ColourLayout,
    ) -> Self::WorkSet;

    /// Writes `mix(source, destination, weight)` into Work. `weight >= 1` copies the destination.
    fn animate(&mut self, work_set: &mut Self::WorkSet, direction: AnimationDirection, weight: f32);

    /// Copies one array back to the host.
    fn read_records(
        &mut self,
        work_set: &Self::WorkSet,
        array: WorkSetArray,
    ) -> Result<Vec<ColourRecord>, ReadbackError>;
}

/// Component-wise blend of colour and position. Counts are index-aligned and never blended.
///
/// `a + (b - a) * w` rounds once per operation, each monotonic in `w`, so every component moves
/// towards the destination without f32 back-steps.
pub fn blend_records(
    source: &ColourRecord,
    destination: &ColourRecord,
    weight: f32,
) -> ColourRecord {
    if weight >= 1.0 {
        return *destination;
    }
    let mix = |a: f32, b: f32| a + (b - a) * weight;
    ColourRecord {
        colour: std::array::from_fn(|i| mix(source.colour[i], destination.colour[i])),
        position: std::array::from_fn(|i| mix(source.position[i], destination.position[i])),
        count: source.count,
    }
}
