use rand::{
    prelude::Distribution,
    Rng,
};

use bevy::prelude::*;

use crate::volume::{
    VdbGridType,
    VdbRenderBuffer,
    VdbRenderInfo,
    VdbVolume,
    VdbVolumeSequence,
    VdbVolumeStatic,
};


/// Random dense grid, one value per voxel (three for vector grids).
pub struct RandomGrid {
    pub grid_type: VdbGridType,
    pub index_size: IVec3,
    pub voxel_size: f32,
}

impl Distribution<VdbRenderInfo> for RandomGrid {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> VdbRenderInfo {
        let components = if self.grid_type.is_vector() { 3 } else { 1 };
        let voxel_count = self.index_size.max(IVec3::ZERO).as_uvec3().element_product() as usize;

        let voxels: Vec<f32> = (0..voxel_count * components)
            .map(|_| rng.gen_range(0.0..1.0))
            .collect();

        let index_min = IVec3::new(
            rng.gen_range(-8..8),
            rng.gen_range(-8..8),
            rng.gen_range(-8..8),
        );

        VdbRenderInfo::new(
            index_min,
            self.index_size,
            Mat4::from_scale(Vec3::splat(self.voxel_size)),
            VdbRenderBuffer::from_voxels(&voxels),
        )
    }
}


pub fn random_volume_static(grid_type: VdbGridType, index_size: IVec3) -> VdbVolume {
    let mut rng = rand::thread_rng();
    let grid = RandomGrid {
        grid_type,
        index_size,
        voxel_size: 0.1,
    };

    VdbVolumeStatic::new(grid_type, grid.sample(&mut rng)).into()
}

pub fn random_volume_sequence(
    grid_type: VdbGridType,
    index_size: IVec3,
    frame_count: u32,
    frame_rate: f32,
) -> VdbVolume {
    let mut rng = rand::thread_rng();
    let grid = RandomGrid {
        grid_type,
        index_size,
        voxel_size: 0.1,
    };

    VdbVolumeSequence::from_frames(
        grid_type,
        grid.sample_iter(&mut rng).take(frame_count as usize),
    )
    .with_frame_rate(frame_rate)
    .into()
}
