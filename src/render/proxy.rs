use bevy::prelude::*;
use bytemuck::{
    Pod,
    Zeroable,
};
use static_assertions::assert_eq_size;

use crate::{
    assets::NUM_EXTRA_VDBS,
    principled::VdbPrincipledAttributes,
    volume::VdbRenderBuffer,
};


pub const FLAG_HAS_TEMPERATURE: u32 = 1 << 0;
pub const FLAG_HAS_COLOR: u32 = 1 << 1;


/// Render-world mirror of one principled volume.
///
/// Only mutated through whole-frame updates, so its buffers always belong to a
/// single resolved frame.
#[derive(Clone, Debug)]
pub struct VdbPrincipledSceneProxy {
    attributes: VdbPrincipledAttributes,
    index_to_local: Mat4,
    index_min: IVec3,
    index_size: IVec3,
    density: Option<VdbRenderBuffer>,
    temperature: Option<VdbRenderBuffer>,
    color: Option<VdbRenderBuffer>,
    extra_buffers: [Option<VdbRenderBuffer>; NUM_EXTRA_VDBS],
    frame_updates: u32,
    extra_buffer_updates: u32,
}

impl VdbPrincipledSceneProxy {
    pub fn new(attributes: VdbPrincipledAttributes) -> Self {
        Self {
            attributes,
            index_to_local: Mat4::IDENTITY,
            index_min: IVec3::ZERO,
            index_size: IVec3::ZERO,
            density: None,
            temperature: None,
            color: None,
            extra_buffers: Default::default(),
            frame_updates: 0,
            extra_buffer_updates: 0,
        }
    }

    pub fn update(
        &mut self,
        index_to_local: Mat4,
        index_min: IVec3,
        index_size: IVec3,
        density: VdbRenderBuffer,
        temperature: Option<VdbRenderBuffer>,
        color: Option<VdbRenderBuffer>,
    ) {
        self.index_to_local = index_to_local;
        self.index_min = index_min;
        self.index_size = index_size;
        self.density = Some(density);
        self.temperature = temperature;
        self.color = color;
        self.frame_updates += 1;
    }

    pub fn update_extra_buffers(&mut self, buffers: [Option<VdbRenderBuffer>; NUM_EXTRA_VDBS]) {
        self.extra_buffers = buffers;
        self.extra_buffer_updates += 1;
    }

    pub fn attributes(&self) -> &VdbPrincipledAttributes {
        &self.attributes
    }

    pub fn index_to_local(&self) -> Mat4 {
        self.index_to_local
    }

    pub fn index_min(&self) -> IVec3 {
        self.index_min
    }

    pub fn index_size(&self) -> IVec3 {
        self.index_size
    }

    pub fn density_buffer(&self) -> Option<&VdbRenderBuffer> {
        self.density.as_ref()
    }

    pub fn temperature_buffer(&self) -> Option<&VdbRenderBuffer> {
        self.temperature.as_ref()
    }

    pub fn color_buffer(&self) -> Option<&VdbRenderBuffer> {
        self.color.as_ref()
    }

    pub fn extra_buffers(&self) -> &[Option<VdbRenderBuffer>; NUM_EXTRA_VDBS] {
        &self.extra_buffers
    }

    pub fn frame_updates(&self) -> u32 {
        self.frame_updates
    }

    pub fn extra_buffer_updates(&self) -> u32 {
        self.extra_buffer_updates
    }

    pub fn referenced_buffers(&self) -> impl Iterator<Item = &VdbRenderBuffer> {
        [&self.density, &self.temperature, &self.color]
            .into_iter()
            .chain(self.extra_buffers.iter())
            .flatten()
    }

    pub fn uniform(&self) -> VdbPrincipledUniform {
        let mut flags = 0;
        if self.temperature.is_some() {
            flags |= FLAG_HAS_TEMPERATURE;
        }
        if self.color.is_some() {
            flags |= FLAG_HAS_COLOR;
        }

        let attributes = &self.attributes;

        VdbPrincipledUniform {
            index_to_local: self.index_to_local.to_cols_array_2d(),
            index_min: self.index_min.extend(0).to_array(),
            index_size: self.index_size.extend(0).to_array(),
            albedo: rgba(attributes.albedo),
            emission_color: rgba(attributes.emission_color),
            blackbody_tint: rgba(attributes.blackbody_tint),
            density_multiplier: attributes.density_multiplier,
            emission_strength: attributes.emission_strength,
            blackbody_intensity: attributes.blackbody_intensity,
            temperature_multiplier: attributes.temperature_multiplier,
            anisotropy: attributes.anisotropy,
            step_multiplier: attributes.step_multiplier,
            flags,
            _pad: 0,
        }
    }
}


fn rgba(color: LinearRgba) -> [f32; 4] {
    [color.red, color.green, color.blue, color.alpha]
}


#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct VdbPrincipledUniform {
    pub index_to_local: [[f32; 4]; 4],
    pub index_min: [i32; 4],
    pub index_size: [i32; 4],
    pub albedo: [f32; 4],
    pub emission_color: [f32; 4],
    pub blackbody_tint: [f32; 4],
    pub density_multiplier: f32,
    pub emission_strength: f32,
    pub blackbody_intensity: f32,
    pub temperature_multiplier: f32,
    pub anisotropy: f32,
    pub step_multiplier: f32,
    pub flags: u32,
    pub _pad: u32,
}

assert_eq_size!(VdbPrincipledUniform, [u8; 176]);
