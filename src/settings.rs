use bevy::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};


#[derive(Resource, Reflect, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[reflect(Resource)]
#[serde(default)]
pub struct VdbPrincipledSettings {
    /// Playback rate for sequences that carry no frame rate of their own.
    pub default_frame_rate: f32,
    pub warn_on_skipped_frames: bool,
    pub upload_gpu_buffers: bool,
}

impl Default for VdbPrincipledSettings {
    fn default() -> Self {
        Self {
            default_frame_rate: 24.0,
            warn_on_skipped_frames: false,
            upload_gpu_buffers: true,
        }
    }
}
