use bevy::{
    prelude::*,
    math::{
        Vec3A,
        bounding::Aabb3d,
    },
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    assets::VdbAssetVolumes,
    render::proxy::VdbPrincipledSceneProxy,
    sync::resolve_frame,
    volume::render_info::transform_box,
};


/// Shading parameters of a principled volume.
#[derive(Clone, Debug, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct VdbPrincipledAttributes {
    pub density_multiplier: f32,
    pub step_multiplier: f32,
    pub albedo: LinearRgba,
    pub anisotropy: f32,
    pub emission_strength: f32,
    pub emission_color: LinearRgba,
    pub blackbody_intensity: f32,
    pub blackbody_tint: LinearRgba,
    pub temperature_multiplier: f32,
}

impl Default for VdbPrincipledAttributes {
    fn default() -> Self {
        Self {
            density_multiplier: 1.0,
            step_multiplier: 1.0,
            albedo: LinearRgba::WHITE,
            anisotropy: 0.0,
            emission_strength: 0.0,
            emission_color: LinearRgba::WHITE,
            blackbody_intensity: 1.0,
            blackbody_tint: LinearRgba::WHITE,
            temperature_multiplier: 1.0,
        }
    }
}


#[derive(Clone, Debug, PartialEq, Eq, Reflect)]
pub struct VdbRenderState {
    /// Cleared on prototypes and other non-live instances; blocks attribute mutation.
    pub allow_dynamic_changes: bool,
    pub dirty: bool,
}

impl Default for VdbRenderState {
    fn default() -> Self {
        Self {
            allow_dynamic_changes: true,
            dirty: false,
        }
    }
}


/// Renders the volumes of the bound [`VdbAssets`](crate::VdbAssets) entity.
#[derive(Component, Clone, Debug, Reflect)]
#[reflect(Component)]
#[require(Transform, Visibility, VdbWorldBounds)]
pub struct VdbPrincipled {
    vdb_assets: Option<Entity>,
    current_frame: u32,
    attributes: VdbPrincipledAttributes,
    render_state: VdbRenderState,
}

impl Default for VdbPrincipled {
    fn default() -> Self {
        Self {
            vdb_assets: None,
            current_frame: 0,
            attributes: VdbPrincipledAttributes::default(),
            render_state: VdbRenderState::default(),
        }
    }
}

impl VdbPrincipled {
    pub fn new(vdb_assets: Entity) -> Self {
        Self {
            vdb_assets: Some(vdb_assets),
            ..default()
        }
    }

    pub fn with_attributes(mut self, attributes: VdbPrincipledAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Listens to the frame changes of `vdb_assets` from now on.
    ///
    /// The bound volumes are only validated when the proxy is recreated.
    pub fn bind(&mut self, vdb_assets: Entity) {
        self.vdb_assets = Some(vdb_assets);
        self.mark_render_state_dirty();
    }

    pub fn vdb_assets(&self) -> Option<Entity> {
        self.vdb_assets
    }

    pub fn listens_to(&self, source: Entity) -> bool {
        self.vdb_assets == Some(source)
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    pub(crate) fn set_current_frame(&mut self, frame_index: u32) {
        self.current_frame = frame_index;
    }

    pub fn attributes(&self) -> &VdbPrincipledAttributes {
        &self.attributes
    }

    pub fn render_state(&self) -> &VdbRenderState {
        &self.render_state
    }

    pub fn set_allow_dynamic_changes(&mut self, allow: bool) {
        self.render_state.allow_dynamic_changes = allow;
    }

    pub fn are_dynamic_data_changes_allowed(&self) -> bool {
        self.render_state.allow_dynamic_changes
    }

    pub fn mark_render_state_dirty(&mut self) {
        self.render_state.dirty = true;
    }

    pub fn is_render_state_dirty(&self) -> bool {
        self.render_state.dirty
    }

    pub(crate) fn clear_render_state_dirty(&mut self) {
        self.render_state.dirty = false;
    }

    /// Assigns `value` to the selected attribute and dirties the render state.
    ///
    /// Returns `false` without touching anything when changes are disallowed or the
    /// value is already equal.
    pub fn set_attribute<T: PartialEq>(
        &mut self,
        select: impl FnOnce(&mut VdbPrincipledAttributes) -> &mut T,
        value: T,
    ) -> bool {
        if !self.render_state.allow_dynamic_changes {
            return false;
        }

        let attribute = select(&mut self.attributes);
        if *attribute == value {
            return false;
        }

        *attribute = value;
        self.render_state.dirty = true;
        true
    }

    pub fn set_density_multiplier(&mut self, value: f32) -> bool {
        self.set_attribute(|attributes| &mut attributes.density_multiplier, value)
    }

    pub fn set_step_multiplier(&mut self, value: f32) -> bool {
        self.set_attribute(|attributes| &mut attributes.step_multiplier, value)
    }

    pub fn set_albedo(&mut self, value: LinearRgba) -> bool {
        self.set_attribute(|attributes| &mut attributes.albedo, value)
    }

    pub fn set_anisotropy(&mut self, value: f32) -> bool {
        self.set_attribute(|attributes| &mut attributes.anisotropy, value)
    }

    pub fn set_emission_strength(&mut self, value: f32) -> bool {
        self.set_attribute(|attributes| &mut attributes.emission_strength, value)
    }

    pub fn set_emission_color(&mut self, value: LinearRgba) -> bool {
        self.set_attribute(|attributes| &mut attributes.emission_color, value)
    }

    pub fn set_blackbody_intensity(&mut self, value: f32) -> bool {
        self.set_attribute(|attributes| &mut attributes.blackbody_intensity, value)
    }

    pub fn set_blackbody_tint(&mut self, value: LinearRgba) -> bool {
        self.set_attribute(|attributes| &mut attributes.blackbody_tint, value)
    }

    pub fn set_temperature_multiplier(&mut self, value: f32) -> bool {
        self.set_attribute(|attributes| &mut attributes.temperature_multiplier, value)
    }

    /// Only a valid scalar density grid yields a drawable volume.
    pub fn can_render(volumes: &VdbAssetVolumes) -> bool {
        match volumes.density {
            Some(density) => density.is_valid() && !density.is_vector_grid(),
            None => false,
        }
    }

    /// Density bounds in world space, or a zero-size box at the origin of
    /// `local_to_world` when no density is bound.
    pub fn calc_bounds(volumes: &VdbAssetVolumes, local_to_world: &GlobalTransform) -> Aabb3d {
        let matrix = local_to_world.compute_matrix();

        match volumes.density {
            Some(density) => {
                let bounds = density.global_bounds();
                transform_box(&matrix, bounds.min.into(), bounds.max.into())
            },
            None => {
                let origin = Vec3A::from(local_to_world.translation());
                Aabb3d {
                    min: origin,
                    max: origin,
                }
            },
        }
    }

    /// Builds the render-side mirror at the current frame, or `None` when nothing
    /// should be drawn.
    pub fn create_render_proxy(&self, volumes: &VdbAssetVolumes) -> Option<VdbPrincipledSceneProxy> {
        if !Self::can_render(volumes) {
            return None;
        }

        let mut proxy = VdbPrincipledSceneProxy::new(self.attributes.clone());

        if let Some((update, extras)) = resolve_frame(volumes, self.current_frame) {
            update.apply(&mut proxy);
            if let Some(extras) = extras {
                extras.apply(&mut proxy);
            }
        }

        Some(proxy)
    }
}


#[derive(Component, Clone, Copy, Debug, Reflect)]
#[reflect(Component)]
pub struct VdbWorldBounds(pub Aabb3d);

impl Default for VdbWorldBounds {
    fn default() -> Self {
        Self(Aabb3d {
            min: Vec3A::ZERO,
            max: Vec3A::ZERO,
        })
    }
}
