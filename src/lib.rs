use bevy::{
    asset::AssetEvents,
    prelude::*,
    render::RenderApp,
    transform::TransformSystem,
};

pub use assets::{
    VdbAssetVolumes,
    VdbAssets,
    VdbFrameChanged,
};
pub use principled::{
    VdbPrincipled,
    VdbPrincipledAttributes,
    VdbWorldBounds,
};
pub use render::{
    VdbPrincipledSceneProxy,
    VdbSceneProxies,
};
pub use sequence::VdbSequencePlayer;
pub use settings::VdbPrincipledSettings;
pub use sync::{
    VdbRenderCommand,
    VdbRenderQueue,
    VdbSceneProxyRegistry,
};
pub use volume::{
    VdbGridType,
    VdbRenderBuffer,
    VdbRenderInfo,
    VdbVolume,
    VdbVolumeSequence,
    VdbVolumeStatic,
};

pub mod assets;
pub mod principled;
pub mod render;
pub mod sequence;
pub mod settings;
pub mod sync;
pub mod volume;


#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum VdbSystems {
    AdvanceSequences,
    ManageProxies,
    SynchronizeFrames,
    UpdateBounds,
}


#[derive(Default)]
pub struct VdbPrincipledPlugin;

impl Plugin for VdbPrincipledPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<VdbVolume>();
        app.add_event::<VdbFrameChanged>();

        app.init_resource::<VdbPrincipledSettings>();
        app.init_resource::<VdbSceneProxyRegistry>();

        app.register_type::<VdbAssets>();
        app.register_type::<VdbPrincipled>();
        app.register_type::<VdbPrincipledAttributes>();
        app.register_type::<VdbPrincipledSettings>();
        app.register_type::<VdbSequencePlayer>();
        app.register_type::<VdbWorldBounds>();

        app.configure_sets(
            PostUpdate,
            (
                VdbSystems::ManageProxies,
                VdbSystems::SynchronizeFrames,
            ).chain().after(AssetEvents),
        );
        app.configure_sets(
            PostUpdate,
            VdbSystems::UpdateBounds.after(TransformSystem::TransformPropagate),
        );

        app.add_systems(
            Update,
            sequence::advance_sequence_players.in_set(VdbSystems::AdvanceSequences),
        );
        app.add_systems(
            PostUpdate,
            (
                sync::manage_scene_proxies.in_set(VdbSystems::ManageProxies),
                sync::synchronize_frames.in_set(VdbSystems::SynchronizeFrames),
                sync::update_world_bounds.in_set(VdbSystems::UpdateBounds),
            ),
        );

        let (queue, receiver) = VdbRenderQueue::channel();
        app.insert_resource(queue);

        if let Some(render_app) = app.get_sub_app_mut(RenderApp) {
            render::build_render_app(render_app, receiver);
        } else {
            // headless: consume in the main world after the producers
            debug!("no render app, vdb proxies live in the main world");

            app.insert_resource(receiver);
            app.init_resource::<VdbSceneProxies>();
            app.add_systems(Last, render::apply_render_commands);
        }
    }
}
