use bevy::{
    prelude::*,
    math::{
        Vec3A,
        bounding::Aabb3d,
    },
};

use crate::volume::buffer::VdbRenderBuffer;


/// Gpu-ready description of one grid at one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct VdbRenderInfo {
    pub index_min: IVec3,
    pub index_size: IVec3,
    pub index_to_local: Mat4,
    pub render_resource: VdbRenderBuffer,
}

impl VdbRenderInfo {
    pub fn new(
        index_min: IVec3,
        index_size: IVec3,
        index_to_local: Mat4,
        render_resource: VdbRenderBuffer,
    ) -> Self {
        Self {
            index_min,
            index_size,
            index_to_local,
            render_resource,
        }
    }

    pub fn index_min(&self) -> IVec3 {
        self.index_min
    }

    pub fn index_size(&self) -> IVec3 {
        self.index_size
    }

    pub fn index_to_local(&self) -> Mat4 {
        self.index_to_local
    }

    pub fn render_resource(&self) -> &VdbRenderBuffer {
        &self.render_resource
    }

    pub fn voxel_count(&self) -> u64 {
        if self.index_size.cmple(IVec3::ZERO).any() {
            return 0;
        }

        self.index_size.as_u64vec3().element_product()
    }

    pub fn is_valid(&self) -> bool {
        self.index_size.cmpgt(IVec3::ZERO).all()
            && self.index_to_local.is_finite()
            && self.index_to_local.determinant() != 0.0
            && !self.render_resource.is_empty()
    }

    /// Index-space box mapped into the volume's local space.
    pub fn local_bounds(&self) -> Aabb3d {
        let min = self.index_min.as_vec3();
        let max = (self.index_min + self.index_size).as_vec3();

        transform_box(&self.index_to_local, min, max)
    }
}


pub(crate) fn transform_box(transform: &Mat4, min: Vec3, max: Vec3) -> Aabb3d {
    let mut out_min = Vec3::splat(f32::INFINITY);
    let mut out_max = Vec3::splat(f32::NEG_INFINITY);

    for corner in 0..8 {
        let point = Vec3::new(
            if corner & 1 == 0 { min.x } else { max.x },
            if corner & 2 == 0 { min.y } else { max.y },
            if corner & 4 == 0 { min.z } else { max.z },
        );
        let point = transform.transform_point3(point);

        out_min = out_min.min(point);
        out_max = out_max.max(point);
    }

    Aabb3d {
        min: Vec3A::from(out_min),
        max: Vec3A::from(out_max),
    }
}

pub(crate) fn union_bounds(lhs: Aabb3d, rhs: Aabb3d) -> Aabb3d {
    Aabb3d {
        min: lhs.min.min(rhs.min),
        max: lhs.max.max(rhs.max),
    }
}
