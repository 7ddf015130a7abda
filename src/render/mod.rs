use std::collections::HashMap;

use bevy::{
    app::SubApp,
    prelude::*,
    render::{
        Extract,
        ExtractSchedule,
        Render,
        RenderSet,
    },
};

use crate::{
    settings::VdbPrincipledSettings,
    sync::{
        VdbRenderCommand,
        VdbRenderQueueReceiver,
    },
};

pub mod proxy;

pub use proxy::{
    VdbPrincipledSceneProxy,
    VdbPrincipledUniform,
};


/// Render-world proxies keyed by their main-world entity.
#[derive(Resource, Default, Debug)]
pub struct VdbSceneProxies {
    proxies: HashMap<Entity, VdbPrincipledSceneProxy>,
}

impl VdbSceneProxies {
    pub fn get(&self, entity: Entity) -> Option<&VdbPrincipledSceneProxy> {
        self.proxies.get(&entity)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.proxies.contains_key(&entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Entity, &VdbPrincipledSceneProxy)> {
        self.proxies.iter()
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Returns false when the command targeted a proxy that no longer exists.
    pub fn apply(&mut self, command: VdbRenderCommand) -> bool {
        match command {
            VdbRenderCommand::CreateProxy { entity, proxy } => {
                self.proxies.insert(entity, *proxy);
                true
            },
            VdbRenderCommand::DestroyProxy { entity } => {
                self.proxies.remove(&entity).is_some()
            },
            VdbRenderCommand::Update { entity, update } => {
                match self.proxies.get_mut(&entity) {
                    Some(proxy) => {
                        update.apply(proxy);
                        true
                    },
                    None => {
                        trace!(?entity, frame_index = update.frame_index, "dropping vdb frame update for missing proxy");
                        false
                    },
                }
            },
            VdbRenderCommand::UpdateExtraBuffers { entity, update } => {
                match self.proxies.get_mut(&entity) {
                    Some(proxy) => {
                        update.apply(proxy);
                        true
                    },
                    None => {
                        trace!(?entity, frame_index = update.frame_index, "dropping vdb extra buffers for missing proxy");
                        false
                    },
                }
            },
        }
    }
}


pub fn apply_render_commands(
    receiver: Res<VdbRenderQueueReceiver>,
    mut proxies: ResMut<VdbSceneProxies>,
) {
    for command in receiver.drain() {
        proxies.apply(command);
    }
}


pub fn extract_settings(
    mut commands: Commands,
    settings: Extract<Res<VdbPrincipledSettings>>,
) {
    commands.insert_resource(settings.clone());
}


#[cfg(feature = "gpu_upload")]
mod gpu {
    use std::collections::HashMap;

    use bevy::{
        prelude::*,
        render::{
            render_resource::{
                Buffer,
                BufferInitDescriptor,
                BufferUsages,
            },
            renderer::{
                RenderDevice,
                RenderQueue,
            },
        },
    };

    use super::VdbSceneProxies;
    use crate::{
        settings::VdbPrincipledSettings,
        volume::VdbBufferId,
    };

    #[derive(Resource, Default)]
    pub struct VdbGpuBuffers {
        pub storage: HashMap<VdbBufferId, Buffer>,
        pub uniforms: HashMap<Entity, Buffer>,
    }

    pub fn prepare_vdb_gpu_buffers(
        render_device: Res<RenderDevice>,
        render_queue: Res<RenderQueue>,
        settings: Option<Res<VdbPrincipledSettings>>,
        proxies: Res<VdbSceneProxies>,
        mut gpu: ResMut<VdbGpuBuffers>,
    ) {
        if settings.is_some_and(|settings| !settings.upload_gpu_buffers) {
            return;
        }

        for (entity, proxy) in proxies.iter() {
            for buffer in proxy.referenced_buffers() {
                if buffer.is_empty() || gpu.storage.contains_key(&buffer.id()) {
                    continue;
                }

                let storage = render_device.create_buffer_with_data(&BufferInitDescriptor {
                    label: Some("vdb voxel buffer"),
                    contents: buffer.bytes(),
                    usage: BufferUsages::STORAGE | BufferUsages::COPY_DST,
                });
                gpu.storage.insert(buffer.id(), storage);
            }

            let uniform = proxy.uniform();
            let contents = bytemuck::bytes_of(&uniform);

            match gpu.uniforms.get(entity) {
                Some(existing) => render_queue.write_buffer(existing, 0, contents),
                None => {
                    let created = render_device.create_buffer_with_data(&BufferInitDescriptor {
                        label: Some("vdb principled uniform"),
                        contents,
                        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
                    });
                    gpu.uniforms.insert(*entity, created);
                },
            }
        }

        let referenced: std::collections::HashSet<VdbBufferId> = proxies
            .iter()
            .flat_map(|(_, proxy)| proxy.referenced_buffers().map(|buffer| buffer.id()))
            .collect();

        gpu.storage.retain(|id, _| referenced.contains(id));
        gpu.uniforms.retain(|entity, _| proxies.contains(*entity));
    }
}

#[cfg(feature = "gpu_upload")]
pub use gpu::{
    VdbGpuBuffers,
    prepare_vdb_gpu_buffers,
};


/// Installs the consumer end of the queue inside the render app.
pub fn build_render_app(render_app: &mut SubApp, receiver: VdbRenderQueueReceiver) {
    render_app
        .insert_resource(receiver)
        .init_resource::<VdbSceneProxies>()
        .add_systems(ExtractSchedule, extract_settings)
        .add_systems(
            Render,
            apply_render_commands.in_set(RenderSet::PrepareResources),
        );

    #[cfg(feature = "gpu_upload")]
    render_app
        .init_resource::<VdbGpuBuffers>()
        .add_systems(
            Render,
            prepare_vdb_gpu_buffers
                .in_set(RenderSet::PrepareResources)
                .after(apply_render_commands),
        );
}
