use std::num::NonZeroU32;

use crate::engine::compute::backend::ColourBackend;
use crate::engine::source::image_source::SourceImage;

/// Everything derived from one loaded image. Dropping it releases every device array at once.
pub struct Generation<B: ColourBackend> {
    id: u64,
    image: SourceImage,
    content: GenerationContent<B>,
}

/// Either no colour survived counting, or all arrays exist together.
pub enum GenerationContent<B: ColourBackend> {
    Empty,
    Populated {
        unique: B::UniqueColours,
        work_set: B::WorkSet,
        count: NonZeroU32,
    },
}

impl<B: ColourBackend> Generation<B> {
    pub(crate) fn new(id: u64, image: SourceImage, content: GenerationContent<B>) -> Self {
        Self { id, image, content }
    }

    /// Monotonic per pipeline; changes on every successful load.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn image(&self) -> &SourceImage {
        &self.image
    }

    pub fn unique_count(&self) -> u32 {
        match &self.content {
            GenerationContent::Empty => 0,
            GenerationContent::Populated { count, .. } => count.get(),
        }
    }

    pub fn unique_colours(&self) -> Option<&B::UniqueColours> {
        match &self.content {
            GenerationContent::Empty => None,
            GenerationContent::Populated { unique, .. } => Some(unique),
        }
    }

    pub fn work_set(&self) -> Option<&B::WorkSet> {
        match &self.content {
            GenerationContent::Empty => None,
            GenerationContent::Populated { work_set, .. } => Some(work_set),
        }
    }

    pub(crate) fn work_set_mut(&mut self) -> Option<&mut B::WorkSet> {
        match &mut self.content {
            GenerationContent::Empty => None,
            GenerationContent::Populated { work_set, .. } => Some(work_set),
        }
    }
}
