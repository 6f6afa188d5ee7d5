use bevy::log::debug;
use constants::compute::HISTOGRAM_DOMAIN_SIZE;
use rayon::prelude::*;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::engine::animation::state::AnimationDirection;
use crate::engine::colour::layout::ColourLayout;
use crate::engine::colour::record::{ColourRecord, slot_index};
use crate::engine::compute::backend::{
    ColourBackend, HistogramOptions, ReadbackError, WorkSetArray, blend_records,
};
use crate::engine::source::image_source::SourceImage;

/// Data-parallel host implementation of every kernel.
///
/// Runs on the rayon pool with the same atomics-and-append shape as the WGSL kernels. Used by
/// the test suite and as a software fallback when no GPU is wanted.
#[derive(Debug, Default)]
pub struct CpuBackend;

/// 256³ atomic counters, indexed by [`slot_index`].
pub struct CpuHistogram {
    counts: Vec<AtomicU32>,
}

impl CpuHistogram {
    fn zeroed() -> Self {
        Self {
            counts: (0..HISTOGRAM_DOMAIN_SIZE)
                .into_par_iter()
                .map(|_| AtomicU32::new(0))
                .collect(),
        }
    }

    #[cfg(test)]
    fn count(&self, rgb: [u8; 3]) -> u32 {
        self.counts[slot_index(rgb) as usize].load(Ordering::Relaxed)
    }

    /// Sum over every slot. Public for the integration tests, which check it against the
    /// pixel count.
    pub fn total(&self) -> u64 {
        self.counts
            .par_iter()
            .map(|count| u64::from(count.load(Ordering::Relaxed)))
            .sum()
    }
}

pub struct CpuUniqueColours {
    records: Vec<ColourRecord>,
    appended: u32,
}

impl CpuUniqueColours {
    pub fn records(&self) -> &[ColourRecord] {
        &self.records
    }
}

pub struct CpuWorkSet {
    rgb: Vec<ColourRecord>,
    hsv: Vec<ColourRecord>,
    work: Vec<ColourRecord>,
}

impl CpuWorkSet {
    pub fn array(&self, array: WorkSetArray) -> &[ColourRecord] {
        match array {
            WorkSetArray::RgbSpace => &self.rgb,
            WorkSetArray::HsvSpace => &self.hsv,
            WorkSetArray::Work => &self.work,
        }
    }

    pub fn len(&self) -> usize {
        self.work.len()
    }

    pub fn is_empty(&self) -> bool {
        self.work.is_empty()
    }
}

impl ColourBackend for CpuBackend {
    type Histogram = CpuHistogram;
    type UniqueColours = CpuUniqueColours;
    type WorkSet = CpuWorkSet;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn build_histogram(&mut self, image: &SourceImage, options: &HistogramOptions) -> CpuHistogram {
        let histogram = CpuHistogram::zeroed();
        image.pixels().par_chunks_exact(4).for_each(|pixel| {
            if options.skip_transparent && pixel[3] == 0 {
                return;
            }
            let slot = slot_index([pixel[0], pixel[1], pixel[2]]) as usize;
            histogram.counts[slot].fetch_add(1, Ordering::Relaxed);
        });
        histogram
    }

    fn compact_unique_colours(
        &mut self,
        histogram: &CpuHistogram,
        capacity: u32,
        layout: &ColourLayout,
    ) -> CpuUniqueColours {
        // Filter-and-collect is the scan/scatter form of the GPU's atomic append.
        let mut records: Vec<ColourRecord> = histogram
            .counts
            .par_iter()
            .enumerate()
            .filter_map(|(slot, count)| {
                let count = count.load(Ordering::Relaxed);
                (count > 0).then(|| ColourRecord::from_slot(slot as u32, count, layout))
            })
            .collect();

        let appended = records.len() as u32;
        records.truncate(capacity as usize);
        debug!("cpu compaction appended {appended} records (capacity {capacity})");

        CpuUniqueColours { records, appended }
    }

    fn read_unique_count(&mut self, unique: &CpuUniqueColours) -> Result<u32, ReadbackError> {
        Ok(unique.appended.min(unique.records.len() as u32))
    }

    fn init_work_set(
        &mut self,
        unique: &CpuUniqueColours,
        count: NonZeroU32,
        layout: &ColourLayout,
    ) -> CpuWorkSet {
        let rgb = unique.records[..count.get() as usize].to_vec();
        let hsv = rgb
            .par_iter()
            .map(|record| record.with_position(layout.hsv_position(record.rgb())))
            .collect();
        let work = rgb.clone();
        CpuWorkSet { rgb, hsv, work }
    }

    fn animate(&mut self, work_set: &mut CpuWorkSet, direction: AnimationDirection, weight: f32) {
        let (source, destination) = match direction {
            AnimationDirection::RgbToHsv => (&work_set.rgb, &work_set.hsv),
            AnimationDirection::HsvToRgb => (&work_set.hsv, &work_set.rgb),
        };
        work_set
            .work
            .par_iter_mut()
            .zip(source.par_iter().zip(destination.par_iter()))
            .for_each(|(work, (from, to))| *work = blend_records(from, to, weight));
    }

    fn read_records(
        &mut self,
        work_set: &CpuWorkSet,
        array: WorkSetArray,
    ) -> Result<Vec<ColourRecord>, ReadbackError> {
        Ok(work_set.array(array).to_vec())
    }
}
