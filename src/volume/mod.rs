use bevy::{
    prelude::*,
    math::bounding::Aabb3d,
};
use serde::{
    Deserialize,
    Serialize,
};

pub mod buffer;
pub mod rand;
pub mod render_info;

pub use buffer::{
    VdbBufferId,
    VdbRenderBuffer,
};
pub use render_info::VdbRenderInfo;

use render_info::union_bounds;


#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    Reflect,
    Serialize,
    Deserialize,
)]
pub enum VdbGridType {
    #[default]
    Float,
    Double,
    Vector3,
    Vector3Double,
}

impl VdbGridType {
    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Vector3 | Self::Vector3Double)
    }
}


#[derive(Clone, Debug)]
pub struct VdbVolumeStatic {
    pub grid_type: VdbGridType,
    pub render_info: VdbRenderInfo,
}

impl VdbVolumeStatic {
    pub fn new(grid_type: VdbGridType, render_info: VdbRenderInfo) -> Self {
        Self {
            grid_type,
            render_info,
        }
    }
}


/// Upper bound on the frame slots a sequence can hold.
pub const MAX_SEQUENCE_FRAMES: u32 = 1 << 20;


/// Per-frame render infos of a time-varying grid.
///
/// A `None` frame is not resident: either it has not been streamed in yet or the
/// cache evicted it.
#[derive(Clone, Debug)]
pub struct VdbVolumeSequence {
    pub grid_type: VdbGridType,
    pub frame_rate: Option<f32>,
    frames: Vec<Option<VdbRenderInfo>>,
}

impl VdbVolumeSequence {
    pub fn new(grid_type: VdbGridType) -> Self {
        Self {
            grid_type,
            frame_rate: None,
            frames: Vec::new(),
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: f32) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    pub fn from_frames(
        grid_type: VdbGridType,
        frames: impl IntoIterator<Item = VdbRenderInfo>,
    ) -> Self {
        Self {
            grid_type,
            frame_rate: None,
            frames: frames
                .into_iter()
                .take(MAX_SEQUENCE_FRAMES as usize)
                .map(Some)
                .collect(),
        }
    }

    /// Appends a frame and returns its index, or `None` once the sequence is full.
    pub fn push_frame(&mut self, render_info: VdbRenderInfo) -> Option<u32> {
        let frame_index = self.frame_count();
        if frame_index >= MAX_SEQUENCE_FRAMES {
            warn!(frame_index, "vdb sequence is full, frame dropped");
            return None;
        }

        self.frames.push(Some(render_info));
        Some(frame_index)
    }

    /// Stores a frame, growing the sequence with non-resident frames as needed.
    pub fn set_frame(&mut self, frame_index: u32, render_info: VdbRenderInfo) -> bool {
        if frame_index >= MAX_SEQUENCE_FRAMES {
            warn!(frame_index, "vdb sequence frame index out of range");
            return false;
        }

        let index = frame_index as usize;
        if index >= self.frames.len() {
            self.frames.resize(index + 1, None);
        }

        self.frames[index] = Some(render_info);
        true
    }

    /// Drops the cached render info for a frame, returning it to the caller.
    pub fn evict_frame(&mut self, frame_index: u32) -> Option<VdbRenderInfo> {
        self.frames
            .get_mut(frame_index as usize)
            .and_then(Option::take)
    }

    pub fn render_info(&self, frame_index: u32) -> Option<&VdbRenderInfo> {
        self.frames
            .get(frame_index as usize)
            .and_then(Option::as_ref)
    }

    pub fn frame_count(&self) -> u32 {
        self.frames.len() as u32
    }

    pub fn resident_frames(&self) -> impl Iterator<Item = &VdbRenderInfo> {
        self.frames.iter().flatten()
    }

    pub fn duration(&self) -> Option<f32> {
        self.frame_rate
            .filter(|rate| *rate > 0.0)
            .map(|rate| self.frame_count() as f32 / rate)
    }
}


#[derive(Asset, Clone, Debug, TypePath)]
pub enum VdbVolume {
    Static(VdbVolumeStatic),
    Sequence(VdbVolumeSequence),
}

impl VdbVolume {
    pub fn grid_type(&self) -> VdbGridType {
        match self {
            Self::Static(volume) => volume.grid_type,
            Self::Sequence(sequence) => sequence.grid_type,
        }
    }

    pub fn is_vector_grid(&self) -> bool {
        self.grid_type().is_vector()
    }

    /// Render info for `frame_index`; static volumes ignore the frame.
    pub fn render_info(&self, frame_index: u32) -> Option<&VdbRenderInfo> {
        match self {
            Self::Static(volume) => Some(&volume.render_info),
            Self::Sequence(sequence) => sequence.render_info(frame_index),
        }
    }

    /// Render info of a time-varying volume; static volumes have none.
    pub fn sequence_render_info(&self, frame_index: u32) -> Option<&VdbRenderInfo> {
        match self {
            Self::Static(_) => None,
            Self::Sequence(sequence) => sequence.render_info(frame_index),
        }
    }

    pub fn frame_count(&self) -> u32 {
        match self {
            Self::Static(_) => 1,
            Self::Sequence(sequence) => sequence.frame_count(),
        }
    }

    pub fn frame_rate(&self) -> Option<f32> {
        match self {
            Self::Static(_) => None,
            Self::Sequence(sequence) => sequence.frame_rate,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Self::Static(volume) => volume.render_info.is_valid(),
            Self::Sequence(sequence) => {
                sequence.resident_frames().next().is_some()
                    && sequence.resident_frames().all(VdbRenderInfo::is_valid)
            },
        }
    }

    /// Local-space bounds enclosing every resident frame.
    pub fn global_bounds(&self) -> Aabb3d {
        match self {
            Self::Static(volume) => volume.render_info.local_bounds(),
            Self::Sequence(sequence) => sequence
                .resident_frames()
                .map(VdbRenderInfo::local_bounds)
                .reduce(union_bounds)
                .unwrap_or_else(|| Aabb3d::new(Vec3::ZERO, Vec3::ZERO)),
        }
    }
}

impl From<VdbVolumeStatic> for VdbVolume {
    fn from(volume: VdbVolumeStatic) -> Self {
        Self::Static(volume)
    }
}

impl From<VdbVolumeSequence> for VdbVolume {
    fn from(sequence: VdbVolumeSequence) -> Self {
        Self::Sequence(sequence)
    }
}
