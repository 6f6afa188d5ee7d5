use bevy::log::{debug, warn};
use bevy::render::{
    render_resource::{
        BindGroup, BindGroupEntry, BindGroupLayout, BindGroupLayoutEntry, BindingType, Buffer,
        BufferBindingType, BufferDescriptor, BufferInitDescriptor, BufferUsages, CommandEncoder,
        CommandEncoderDescriptor, ComputePassDescriptor, ComputePipeline, Maintain, MapMode,
        PipelineLayoutDescriptor, RawComputePipelineDescriptor, ShaderModuleDescriptor,
        ShaderSource, ShaderStages,
    },
    renderer::{RenderDevice, RenderQueue},
};
use bytemuck::{Pod, Zeroable};
use constants::compute::{COLOUR_RECORD_SIZE, HISTOGRAM_DOMAIN_SIZE};
use std::borrow::Cow;
use std::num::NonZeroU32;
use std::sync::mpsc;

use crate::engine::animation::state::AnimationDirection;
use crate::engine::colour::layout::ColourLayout;
use crate::engine::colour::record::ColourRecord;
use crate::engine::compute::backend::{
    ColourBackend, HistogramOptions, ReadbackError, WorkSetArray,
};
use crate::engine::compute::dispatch::{
    Workgroups, histogram_domain_workgroups, image_workgroups, linear_workgroups,
};
use crate::engine::source::image_source::SourceImage;

/// Bytes per uploaded RGBA8 pixel.
const PIXEL_SIZE: u64 = 4;

const HISTOGRAM_SHADER: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/shaders/colour_histogram.wgsl"
));
const COMPACTION_SHADER: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/shaders/unique_colours.wgsl"
));
const WORK_SET_SHADER: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/shaders/colour_work_set.wgsl"
));
const ANIMATE_SHADER: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/shaders/animate_colours.wgsl"
));

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct HistogramParams {
    width: u32,
    height: u32,
    skip_transparent: u32,
    _padding: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct CompactionParams {
    rgb_extent: f32,
    capacity: u32,
    _padding: [u32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct WorkSetParams {
    count: u32,
    hsv_radius: f32,
    hsv_height: f32,
    _padding: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct AnimateParams {
    count: u32,
    weight: f32,
    direction: u32,
    _padding: u32,
}

/// How a kernel sees each binding, in binding order.
#[derive(Clone, Copy)]
enum KernelBinding {
    Uniform,
    Storage { read_only: bool },
}

impl KernelBinding {
    fn binding_type(self) -> BindingType {
        let ty = match self {
            Self::Uniform => BufferBindingType::Uniform,
            Self::Storage { read_only } => BufferBindingType::Storage { read_only },
        };
        BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        }
    }
}

/// One compiled compute pipeline with its single bind group layout.
struct ComputeKernel {
    label: &'static str,
    layout: BindGroupLayout,
    pipeline: ComputePipeline,
}

impl ComputeKernel {
    fn new(
        render_device: &RenderDevice,
        label: &'static str,
        source: &'static str,
        bindings: &[KernelBinding],
    ) -> Self {
        let entries: Vec<BindGroupLayoutEntry> = bindings
            .iter()
            .enumerate()
            .map(|(binding, kind)| BindGroupLayoutEntry {
                binding: binding as u32,
                visibility: ShaderStages::COMPUTE,
                ty: kind.binding_type(),
                count: None,
            })
            .collect();
        let layout = render_device.create_bind_group_layout(label, &entries);

        let module = render_device
            .wgpu_device()
            .create_shader_module(ShaderModuleDescriptor {
                label: Some(label),
                source: ShaderSource::Wgsl(Cow::Borrowed(source)),
            });
        let pipeline_layout = render_device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&*layout],
            push_constant_ranges: &[],
        });
        let pipeline = render_device.create_compute_pipeline(&RawComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            label,
            layout,
            pipeline,
        }
    }

    fn bind(&self, render_device: &RenderDevice, buffers: &[&Buffer]) -> BindGroup {
        let entries: Vec<BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(binding, buffer)| BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();
        render_device.create_bind_group(self.label, &self.layout, &entries)
    }

    fn record(&self, encoder: &mut CommandEncoder, bind_group: &BindGroup, groups: Workgroups) {
        if groups.is_empty() {
            return;
        }
        let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
            label: Some(self.label),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(groups.x, groups.y, groups.z);
    }
}

/// WGSL implementation of every kernel on Bevy's render device.
///
/// Runs from main-world systems: each stage records into its own encoder and submits straight
/// to the queue, so submission order is stage order. The only host wait is [`Self::read_buffer`].
pub struct GpuBackend {
    render_device: RenderDevice,
    render_queue: RenderQueue,
    histogram_kernel: ComputeKernel,
    compaction_kernel: ComputeKernel,
    work_set_kernel: ComputeKernel,
    animate_kernel: ComputeKernel,
    /// Largest record array a single storage binding can hold on this device.
    max_records: u32,
    /// Largest RGBA8 pixel upload a single storage binding can hold on this device.
    max_pixels: u64,
}

pub struct GpuHistogram {
    counts: Buffer,
}

pub struct GpuUniqueColours {
    records: Buffer,
    counter: Buffer,
    capacity: u32,
}

pub struct GpuWorkSet {
    rgb_space: Buffer,
    hsv_space: Buffer,
    work: Buffer,
    count: u32,
    animate_params: Buffer,
    animate_bind_group: BindGroup,
}

impl GpuWorkSet {
    /// Instance buffer for the marker draw (`STORAGE | VERTEX`).
    pub fn work_buffer(&self) -> &Buffer {
        &self.work
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    fn buffer(&self, array: WorkSetArray) -> &Buffer {
        match array {
            WorkSetArray::RgbSpace => &self.rgb_space,
            WorkSetArray::HsvSpace => &self.hsv_space,
            WorkSetArray::Work => &self.work,
        }
    }
}

impl GpuBackend {
    pub fn new(render_device: RenderDevice, render_queue: RenderQueue) -> Self {
        use KernelBinding::{Storage, Uniform};
        let read = Storage { read_only: true };
        let write = Storage { read_only: false };

        let histogram_kernel = ComputeKernel::new(
            &render_device,
            "colour_histogram",
            HISTOGRAM_SHADER,
            &[Uniform, read, write],
        );
        let compaction_kernel = ComputeKernel::new(
            &render_device,
            "unique_colours",
            COMPACTION_SHADER,
            &[Uniform, read, write, write],
        );
        let work_set_kernel = ComputeKernel::new(
            &render_device,
            "colour_work_set",
            WORK_SET_SHADER,
            &[Uniform, read, write, write, write],
        );
        let animate_kernel = ComputeKernel::new(
            &render_device,
            "animate_colours",
            ANIMATE_SHADER,
            &[Uniform, read, read, write],
        );

        let limits = render_device.limits();
        let max_binding =
            u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
        let max_records =
            (max_binding / COLOUR_RECORD_SIZE).min(u64::from(HISTOGRAM_DOMAIN_SIZE)) as u32;
        let max_pixels = pixel_upload_limit(max_binding);
        debug!("gpu colour backend ready: {max_records} records, {max_pixels} pixels per image");

        Self {
            render_device,
            render_queue,
            histogram_kernel,
            compaction_kernel,
            work_set_kernel,
            animate_kernel,
            max_records,
            max_pixels,
        }
    }

    fn encoder(&self, label: &'static str) -> CommandEncoder {
        self.render_device
            .create_command_encoder(&CommandEncoderDescriptor { label: Some(label) })
    }

    fn uniform<T: Pod>(&self, label: &'static str, value: &T) -> Buffer {
        self.render_device
            .create_buffer_with_data(&BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(value),
                usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            })
    }

    fn record_array(&self, label: &'static str, records: u32, usage: BufferUsages) -> Buffer {
        self.render_device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size: u64::from(records.max(1)) * COLOUR_RECORD_SIZE,
            usage,
            mapped_at_creation: false,
        })
    }

    /// Copies `size` bytes of `source` into a staging buffer and blocks until they are mapped.
    fn read_buffer(
        &self,
        source: &Buffer,
        size: u64,
        label: &'static str,
    ) -> Result<Vec<u8>, ReadbackError> {
        let staging = self.render_device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self.encoder(label);
        encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
        self.render_queue.submit([encoder.finish()]);

        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        self.render_device
            .map_buffer(&slice, MapMode::Read, move |result| {
                let _ = sender.send(result);
            });
        let _ = self.render_device.poll(Maintain::Wait);

        match receiver.recv() {
            Ok(Ok(())) => {}
            Ok(Err(source)) => return Err(ReadbackError::Map { label, source }),
            Err(_) => return Err(ReadbackError::Disconnected { label }),
        }

        let bytes = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(bytes)
    }
}

impl ColourBackend for GpuBackend {
    type Histogram = GpuHistogram;
    type UniqueColours = GpuUniqueColours;
    type WorkSet = GpuWorkSet;

    fn name(&self) -> &'static str {
        "gpu"
    }

    fn max_pixels(&self) -> u64 {
        self.max_pixels
    }

    fn build_histogram(&mut self, image: &SourceImage, options: &HistogramOptions) -> GpuHistogram {
        let params = self.uniform(
            "colour_histogram_params",
            &HistogramParams {
                width: image.width(),
                height: image.height(),
                skip_transparent: u32::from(options.skip_transparent),
                _padding: 0,
            },
        );
        let pixels = self
            .render_device
            .create_buffer_with_data(&BufferInitDescriptor {
                label: Some("source_pixels"),
                contents: image.pixels(),
                usage: BufferUsages::STORAGE,
            });
        let counts = self.render_device.create_buffer(&BufferDescriptor {
            label: Some("colour_histogram"),
            size: u64::from(HISTOGRAM_DOMAIN_SIZE) * std::mem::size_of::<u32>() as u64,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group =
            self.histogram_kernel
                .bind(&self.render_device, &[&params, &pixels, &counts]);

        let mut encoder = self.encoder("colour_histogram");
        encoder.clear_buffer(&counts, 0, None);
        self.histogram_kernel.record(
            &mut encoder,
            &bind_group,
            image_workgroups(image.width(), image.height()),
        );
        self.render_queue.submit([encoder.finish()]);

        GpuHistogram { counts }
    }

    fn compact_unique_colours(
        &mut self,
        histogram: &GpuHistogram,
        capacity: u32,
        layout: &ColourLayout,
    ) -> GpuUniqueColours {
        let capacity = if capacity > self.max_records {
            warn!(
                "unique colour capacity {capacity} exceeds the device limit, keeping the first {}",
                self.max_records
            );
            self.max_records
        } else {
            capacity
        };

        let params = self.uniform(
            "unique_colours_params",
            &CompactionParams {
                rgb_extent: layout.rgb_extent,
                capacity,
                _padding: [0; 2],
            },
        );
        let records = self.record_array(
            "unique_colours",
            capacity,
            BufferUsages::STORAGE | BufferUsages::COPY_SRC,
        );
        let counter = self.render_device.create_buffer(&BufferDescriptor {
            label: Some("unique_colour_counter"),
            size: std::mem::size_of::<u32>() as u64,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.compaction_kernel.bind(
            &self.render_device,
            &[&params, &histogram.counts, &records, &counter],
        );

        let mut encoder = self.encoder("unique_colours");
        encoder.clear_buffer(&counter, 0, None);
        self.compaction_kernel
            .record(&mut encoder, &bind_group, histogram_domain_workgroups());
        self.render_queue.submit([encoder.finish()]);

        GpuUniqueColours {
            records,
            counter,
            capacity,
        }
    }

    fn read_unique_count(&mut self, unique: &GpuUniqueColours) -> Result<u32, ReadbackError> {
        let bytes = self.read_buffer(
            &unique.counter,
            std::mem::size_of::<u32>() as u64,
            "unique_colour_count",
        )?;
        let appended: u32 = bytemuck::pod_read_unaligned(&bytes);
        if appended > unique.capacity {
            warn!(
                "{appended} unique colours found but only {} were stored",
                unique.capacity
            );
        }
        Ok(appended.min(unique.capacity))
    }

    fn init_work_set(
        &mut self,
        unique: &GpuUniqueColours,
        count: NonZeroU32,
        layout: &ColourLayout,
    ) -> GpuWorkSet {
        let count = count.get();
        let [_, hsv_radius, hsv_height] = layout.as_uniform();
        let params = self.uniform(
            "colour_work_set_params",
            &WorkSetParams {
                count,
                hsv_radius,
                hsv_height,
                _padding: 0,
            },
        );

        let array_usage = BufferUsages::STORAGE | BufferUsages::COPY_SRC;
        let rgb_space = self.record_array("rgb_space_colours", count, array_usage);
        let hsv_space = self.record_array("hsv_space_colours", count, array_usage);
        let work = self.record_array(
            "work_colours",
            count,
            array_usage | BufferUsages::VERTEX,
        );

        let bind_group = self.work_set_kernel.bind(
            &self.render_device,
            &[&params, &unique.records, &rgb_space, &hsv_space, &work],
        );

        let mut encoder = self.encoder("colour_work_set");
        self.work_set_kernel
            .record(&mut encoder, &bind_group, linear_workgroups(count));
        self.render_queue.submit([encoder.finish()]);

        let animate_params = self.uniform(
            "animate_colours_params",
            &AnimateParams {
                count,
                weight: 0.0,
                direction: AnimationDirection::RgbToHsv.as_gpu_flag(),
                _padding: 0,
            },
        );
        let animate_bind_group = self.animate_kernel.bind(
            &self.render_device,
            &[&animate_params, &rgb_space, &hsv_space, &work],
        );

        GpuWorkSet {
            rgb_space,
            hsv_space,
            work,
            count,
            animate_params,
            animate_bind_group,
        }
    }

    fn animate(&mut self, work_set: &mut GpuWorkSet, direction: AnimationDirection, weight: f32) {
        let params = AnimateParams {
            count: work_set.count,
            weight,
            direction: direction.as_gpu_flag(),
            _padding: 0,
        };
        self.render_queue
            .write_buffer(&work_set.animate_params, 0, bytemuck::bytes_of(&params));

        let mut encoder = self.encoder("animate_colours");
        self.animate_kernel.record(
            &mut encoder,
            &work_set.animate_bind_group,
            linear_workgroups(work_set.count),
        );
        self.render_queue.submit([encoder.finish()]);
    }

    fn read_records(
        &mut self,
        work_set: &GpuWorkSet,
        array: WorkSetArray,
    ) -> Result<Vec<ColourRecord>, ReadbackError> {
        let bytes = self.read_buffer(
            work_set.buffer(array),
            u64::from(work_set.count) * COLOUR_RECORD_SIZE,
            "colour_record_readback",
        )?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }
}

/// Pixels that fit one storage binding of `max_binding` bytes.
fn pixel_upload_limit(max_binding: u64) -> u64 {
    max_binding / PIXEL_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_limit_follows_the_storage_binding_size() {
        // wgpu's default 128 MiB binding holds 32 Mi RGBA8 pixels.
        assert_eq!(pixel_upload_limit(128 << 20), 32 << 20);
        assert_eq!(pixel_upload_limit(4), 1);
        assert_eq!(pixel_upload_limit(3), 0);
    }

    #[test]
    fn uniform_blocks_are_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<HistogramParams>(), 16);
        assert_eq!(std::mem::size_of::<CompactionParams>(), 16);
        assert_eq!(std::mem::size_of::<WorkSetParams>(), 16);
        assert_eq!(std::mem::size_of::<AnimateParams>(), 16);
    }

    #[test]
    fn kernels_embed_their_entry_points() {
        for source in [HISTOGRAM_SHADER, COMPACTION_SHADER, WORK_SET_SHADER, ANIMATE_SHADER] {
            assert!(source.contains("@compute"));
            assert!(source.contains("fn main("));
        }
    }
}
