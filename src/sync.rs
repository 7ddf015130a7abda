use std::collections::HashSet;

use bevy::prelude::*;
use crossbeam_channel::{
    Receiver,
    Sender,
};

use crate::{
    assets::{
        NUM_EXTRA_VDBS,
        VdbAssetVolumes,
        VdbAssets,
        VdbFrameChanged,
    },
    principled::{
        VdbPrincipled,
        VdbWorldBounds,
    },
    render::proxy::VdbPrincipledSceneProxy,
    settings::VdbPrincipledSettings,
    volume::{
        VdbRenderBuffer,
        VdbVolume,
    },
};


/// Primary-slot snapshot of one frame.
#[derive(Clone, Debug)]
pub struct VdbFrameUpdate {
    pub frame_index: u32,
    pub index_to_local: Mat4,
    pub index_min: IVec3,
    pub index_size: IVec3,
    pub density: VdbRenderBuffer,
    pub temperature: Option<VdbRenderBuffer>,
    pub color: Option<VdbRenderBuffer>,
}

impl VdbFrameUpdate {
    pub fn apply(self, proxy: &mut VdbPrincipledSceneProxy) {
        proxy.update(
            self.index_to_local,
            self.index_min,
            self.index_size,
            self.density,
            self.temperature,
            self.color,
        );
    }
}


/// Extra-slot snapshot of one frame, float 1..4 then vector 1..4.
#[derive(Clone, Debug)]
pub struct VdbExtraBuffersUpdate {
    pub frame_index: u32,
    pub buffers: [Option<VdbRenderBuffer>; NUM_EXTRA_VDBS],
}

impl VdbExtraBuffersUpdate {
    pub fn apply(self, proxy: &mut VdbPrincipledSceneProxy) {
        proxy.update_extra_buffers(self.buffers);
    }
}


/// Secondary slots only contribute when they are time-varying.
fn buffer_at(volume: Option<&VdbVolume>, frame_index: u32) -> Option<VdbRenderBuffer> {
    volume
        .and_then(|volume| volume.sequence_render_info(frame_index))
        .map(|info| info.render_resource().clone())
}

/// Captures every buffer of `frame_index` at once.
///
/// Returns `None` when the density has no render info for the frame; a static density
/// is constant across frames. Optional slots that are static or fail to resolve become
/// `None` buffers. The extra update is only produced when at least one extra slot is
/// bound.
pub fn resolve_frame(
    volumes: &VdbAssetVolumes,
    frame_index: u32,
) -> Option<(VdbFrameUpdate, Option<VdbExtraBuffersUpdate>)> {
    let density = volumes.density?.render_info(frame_index)?;

    let update = VdbFrameUpdate {
        frame_index,
        index_to_local: density.index_to_local(),
        index_min: density.index_min(),
        index_size: density.index_size(),
        density: density.render_resource().clone(),
        temperature: buffer_at(volumes.temperature, frame_index),
        color: buffer_at(volumes.color, frame_index),
    };

    let extras = volumes.has_extras().then(|| VdbExtraBuffersUpdate {
        frame_index,
        buffers: volumes.extras.map(|volume| buffer_at(volume, frame_index)),
    });

    Some((update, extras))
}


#[derive(Debug)]
pub enum VdbRenderCommand {
    CreateProxy {
        entity: Entity,
        proxy: Box<VdbPrincipledSceneProxy>,
    },
    DestroyProxy {
        entity: Entity,
    },
    Update {
        entity: Entity,
        update: VdbFrameUpdate,
    },
    UpdateExtraBuffers {
        entity: Entity,
        update: VdbExtraBuffersUpdate,
    },
}

impl VdbRenderCommand {
    pub fn entity(&self) -> Entity {
        match self {
            Self::CreateProxy { entity, .. }
            | Self::DestroyProxy { entity }
            | Self::Update { entity, .. }
            | Self::UpdateExtraBuffers { entity, .. } => *entity,
        }
    }
}


/// Producer end of the ordered command channel into the render world.
#[derive(Resource, Clone, Debug)]
pub struct VdbRenderQueue {
    sender: Sender<VdbRenderCommand>,
}

impl VdbRenderQueue {
    pub fn channel() -> (Self, VdbRenderQueueReceiver) {
        let (sender, receiver) = crossbeam_channel::unbounded();

        (
            Self { sender },
            VdbRenderQueueReceiver { receiver },
        )
    }

    /// Never blocks; a disconnected consumer only logs.
    pub fn enqueue(&self, command: VdbRenderCommand) -> bool {
        let entity = command.entity();

        match self.sender.send(command) {
            Ok(()) => true,
            Err(err) => {
                warn!(?entity, "vdb render queue disconnected: {err}");
                false
            },
        }
    }

    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }
}


#[derive(Resource, Debug)]
pub struct VdbRenderQueueReceiver {
    receiver: Receiver<VdbRenderCommand>,
}

impl VdbRenderQueueReceiver {
    /// Pending commands in enqueue order.
    pub fn drain(&self) -> impl Iterator<Item = VdbRenderCommand> + '_ {
        self.receiver.try_iter()
    }
}


/// Main-world record of which entities currently own a render proxy.
#[derive(Resource, Default, Debug)]
pub struct VdbSceneProxyRegistry {
    entities: HashSet<Entity>,
}

impl VdbSceneProxyRegistry {
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn insert(&mut self, entity: Entity) {
        self.entities.insert(entity);
    }

    fn remove(&mut self, entity: Entity) -> bool {
        self.entities.remove(&entity)
    }
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VdbFrameSync {
    NoProxy,
    Skipped,
    Enqueued {
        tasks: usize,
    },
}

/// Pushes the snapshot of `frame_index` for `entity`.
///
/// Nothing is enqueued when the entity owns no proxy or the density does not resolve
/// at this frame; the proxy then keeps showing its previous frame.
pub fn on_frame_changed(
    entity: Entity,
    frame_index: u32,
    volumes: &VdbAssetVolumes,
    registry: &VdbSceneProxyRegistry,
    queue: &VdbRenderQueue,
) -> VdbFrameSync {
    if !registry.contains(entity) {
        return VdbFrameSync::NoProxy;
    }

    let Some((update, extras)) = resolve_frame(volumes, frame_index) else {
        return VdbFrameSync::Skipped;
    };

    let mut tasks = 0;
    if queue.enqueue(VdbRenderCommand::Update { entity, update }) {
        tasks += 1;
    }

    if let Some(update) = extras {
        if queue.enqueue(VdbRenderCommand::UpdateExtraBuffers { entity, update }) {
            tasks += 1;
        }
    }

    VdbFrameSync::Enqueued { tasks }
}


fn volumes_touched(
    assets: &VdbAssets,
    events: &[AssetEvent<VdbVolume>],
) -> bool {
    if events.is_empty() {
        return false;
    }

    [&assets.density, &assets.temperature, &assets.color]
        .into_iter()
        .chain(assets.extra_handles())
        .flatten()
        .map(Handle::id)
        .any(|id| {
            events.iter().any(|event| {
                event.is_added(id)
                    || event.is_modified(id)
                    || event.is_removed(id)
                    || event.is_loaded_with_dependencies(id)
            })
        })
}

/// Creates, recreates and destroys render proxies as principled volumes change.
#[allow(clippy::too_many_arguments)]
pub fn manage_scene_proxies(
    mut principled: Query<(Entity, &mut VdbPrincipled)>,
    vdb_assets: Query<Ref<VdbAssets>>,
    volume_assets: Res<Assets<VdbVolume>>,
    mut volume_events: EventReader<AssetEvent<VdbVolume>>,
    mut removed: RemovedComponents<VdbPrincipled>,
    mut registry: ResMut<VdbSceneProxyRegistry>,
    queue: Res<VdbRenderQueue>,
) {
    for entity in removed.read() {
        if registry.remove(entity) {
            debug!(?entity, "destroying vdb scene proxy of removed component");
            queue.enqueue(VdbRenderCommand::DestroyProxy { entity });
        }
    }

    let volume_events: Vec<AssetEvent<VdbVolume>> = volume_events.read().cloned().collect();

    for (entity, mut principled) in &mut principled {
        let assets = principled
            .vdb_assets()
            .and_then(|source| vdb_assets.get(source).ok());

        let assets_changed = assets
            .as_ref()
            .is_some_and(|assets| assets.is_changed() || volumes_touched(assets, &volume_events));

        if !(principled.is_added() || principled.is_render_state_dirty() || assets_changed) {
            continue;
        }

        let volumes = assets
            .as_ref()
            .map(|assets| assets.volumes(&volume_assets))
            .unwrap_or_default();

        match principled.create_render_proxy(&volumes) {
            Some(proxy) => {
                debug!(?entity, frame_index = principled.current_frame(), "creating vdb scene proxy");

                registry.insert(entity);
                queue.enqueue(VdbRenderCommand::CreateProxy {
                    entity,
                    proxy: Box::new(proxy),
                });
            },
            None => {
                debug!(?entity, "vdb principled has no drawable density");

                if registry.remove(entity) {
                    queue.enqueue(VdbRenderCommand::DestroyProxy { entity });
                }
            },
        }

        if principled.is_render_state_dirty() {
            principled.clear_render_state_dirty();
        }
    }
}


/// Forwards frame changes of bound asset entities to their listeners.
pub fn synchronize_frames(
    mut frame_events: EventReader<VdbFrameChanged>,
    mut principled: Query<(Entity, &mut VdbPrincipled)>,
    vdb_assets: Query<&VdbAssets>,
    volume_assets: Res<Assets<VdbVolume>>,
    registry: Res<VdbSceneProxyRegistry>,
    queue: Res<VdbRenderQueue>,
    settings: Res<VdbPrincipledSettings>,
) {
    for event in frame_events.read() {
        let frame_index = event.frame_index;

        for (entity, mut principled) in &mut principled {
            if !principled.listens_to(event.source) {
                continue;
            }

            principled.set_current_frame(frame_index);

            let volumes = vdb_assets
                .get(event.source)
                .map(|assets| assets.volumes(&volume_assets))
                .unwrap_or_default();

            match on_frame_changed(entity, frame_index, &volumes, &registry, &queue) {
                VdbFrameSync::NoProxy => {},
                VdbFrameSync::Skipped => {
                    if settings.warn_on_skipped_frames {
                        warn!(?entity, frame_index, "vdb density unresolved, frame skipped");
                    } else {
                        debug!(?entity, frame_index, "vdb density unresolved, frame skipped");
                    }
                },
                VdbFrameSync::Enqueued { tasks } => {
                    trace!(?entity, frame_index, tasks, "enqueued vdb frame update");
                },
            }
        }
    }
}


pub fn update_world_bounds(
    mut principled: Query<(&VdbPrincipled, &GlobalTransform, &mut VdbWorldBounds)>,
    vdb_assets: Query<&VdbAssets>,
    volume_assets: Res<Assets<VdbVolume>>,
) {
    for (principled, transform, mut bounds) in &mut principled {
        let volumes = principled
            .vdb_assets()
            .and_then(|source| vdb_assets.get(source).ok())
            .map(|assets| assets.volumes(&volume_assets))
            .unwrap_or_default();

        let world_bounds = VdbPrincipled::calc_bounds(&volumes, transform);
        if bounds.0.min != world_bounds.min || bounds.0.max != world_bounds.max {
            bounds.0 = world_bounds;
        }
    }
}
