use constants::colour_layout::CHANNEL_LEVELS;
use constants::compute::{
    COMPACTION_WORKGROUP_SIZE, HISTOGRAM_WORKGROUP_SIZE, LINEAR_WORKGROUP_SIZE,
    MAX_WORKGROUPS_PER_DIMENSION,
};

/// Workgroup counts for one `dispatch_workgroups` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Workgroups {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Workgroups {
    pub const NONE: Self = Self { x: 0, y: 0, z: 0 };

    fn total(&self) -> u64 {
        u64::from(self.x) * u64::from(self.y) * u64::from(self.z)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// One lane per pixel over a `width x height` grid. Lanes past the edge are masked in the kernel.
pub fn image_workgroups(width: u32, height: u32) -> Workgroups {
    let [wx, wy] = HISTOGRAM_WORKGROUP_SIZE;
    let groups = Workgroups {
        x: width.div_ceil(wx),
        y: height.div_ceil(wy),
        z: 1,
    };
    debug_assert!(
        groups.x <= MAX_WORKGROUPS_PER_DIMENSION && groups.y <= MAX_WORKGROUPS_PER_DIMENSION,
        "{width}x{height} image exceeds the dispatch limit"
    );
    groups
}

/// One lane per histogram slot; the 256 levels divide evenly so no lane is masked.
pub fn histogram_domain_workgroups() -> Workgroups {
    let [wb, wg, wr] = COMPACTION_WORKGROUP_SIZE;
    Workgroups {
        x: CHANNEL_LEVELS / wb,
        y: CHANNEL_LEVELS / wg,
        z: CHANNEL_LEVELS / wr,
    }
}

/// One lane per colour record.
///
/// A single row holds at most 65535 workgroups, one short of a full 256³ palette, so larger
/// counts fold into a roughly square 2D grid. Kernels rebuild the flat index as
/// `(group.y * groups.x + group.x) * 256 + local.x` and mask anything `>= items`.
pub fn linear_workgroups(items: u32) -> Workgroups {
    let groups = items.div_ceil(LINEAR_WORKGROUP_SIZE);
    if groups == 0 {
        return Workgroups::NONE;
    }
    if groups <= MAX_WORKGROUPS_PER_DIMENSION {
        return Workgroups {
            x: groups,
            y: 1,
            z: 1,
        };
    }

    let side = (f64::from(groups).sqrt().ceil() as u32).min(MAX_WORKGROUPS_PER_DIMENSION);
    Workgroups {
        x: side,
        y: groups.div_ceil(side),
        z: 1,
    }
}
