use bevy::prelude::*;

use crate::volume::VdbVolume;


pub const NUM_FLOAT_VDBS: usize = 4;
pub const NUM_VECTOR_VDBS: usize = 4;
pub const NUM_EXTRA_VDBS: usize = NUM_FLOAT_VDBS + NUM_VECTOR_VDBS;


/// Named volume slots feeding one principled volume.
///
/// `density` gates rendering; every other slot is optional. Extra slots are ordered
/// float 1..4 followed by vector 1..4 wherever they are flattened.
#[derive(Component, Clone, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct VdbAssets {
    pub density: Option<Handle<VdbVolume>>,
    pub temperature: Option<Handle<VdbVolume>>,
    pub color: Option<Handle<VdbVolume>>,
    pub floats: [Option<Handle<VdbVolume>>; NUM_FLOAT_VDBS],
    pub vectors: [Option<Handle<VdbVolume>>; NUM_VECTOR_VDBS],
}

impl VdbAssets {
    pub fn new(density: Handle<VdbVolume>) -> Self {
        Self {
            density: Some(density),
            ..default()
        }
    }

    pub fn with_temperature(mut self, handle: Handle<VdbVolume>) -> Self {
        self.temperature = Some(handle);
        self
    }

    pub fn with_color(mut self, handle: Handle<VdbVolume>) -> Self {
        self.color = Some(handle);
        self
    }

    pub fn with_float(mut self, slot: usize, handle: Handle<VdbVolume>) -> Self {
        match self.floats.get_mut(slot) {
            Some(entry) => *entry = Some(handle),
            None => warn!(slot, "float vdb slot out of range"),
        }
        self
    }

    pub fn with_vector(mut self, slot: usize, handle: Handle<VdbVolume>) -> Self {
        match self.vectors.get_mut(slot) {
            Some(entry) => *entry = Some(handle),
            None => warn!(slot, "vector vdb slot out of range"),
        }
        self
    }

    pub fn extra_handles(&self) -> impl Iterator<Item = &Option<Handle<VdbVolume>>> {
        self.floats.iter().chain(self.vectors.iter())
    }

    /// Borrows the currently loaded volumes; unloaded handles resolve to absent.
    pub fn volumes<'a>(&self, assets: &'a Assets<VdbVolume>) -> VdbAssetVolumes<'a> {
        let resolve = move |handle: &Option<Handle<VdbVolume>>| {
            handle.as_ref().and_then(|handle| assets.get(handle))
        };

        let mut extras = [None; NUM_EXTRA_VDBS];
        for (extra, handle) in extras.iter_mut().zip(self.extra_handles()) {
            *extra = resolve(handle);
        }

        VdbAssetVolumes {
            density: resolve(&self.density),
            temperature: resolve(&self.temperature),
            color: resolve(&self.color),
            extras,
        }
    }
}


/// Borrowed view of the volumes bound to a [`VdbAssets`], valid for one system run.
#[derive(Clone, Copy, Debug, Default)]
pub struct VdbAssetVolumes<'a> {
    pub density: Option<&'a VdbVolume>,
    pub temperature: Option<&'a VdbVolume>,
    pub color: Option<&'a VdbVolume>,
    pub extras: [Option<&'a VdbVolume>; NUM_EXTRA_VDBS],
}

impl VdbAssetVolumes<'_> {
    pub fn has_extras(&self) -> bool {
        self.extras.iter().any(Option::is_some)
    }
}


/// Pushed by the frame driver of `source` whenever its frame index changes.
#[derive(Event, Clone, Copy, Debug, PartialEq, Eq)]
pub struct VdbFrameChanged {
    pub source: Entity,
    pub frame_index: u32,
}
