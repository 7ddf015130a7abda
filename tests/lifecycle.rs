use bevy::{
    asset::AssetPlugin,
    prelude::*,
    transform::TransformPlugin,
};

use bevy_vdb_principled::{
    VdbAssets,
    VdbGridType,
    VdbPrincipled,
    VdbPrincipledPlugin,
    VdbRenderBuffer,
    VdbRenderInfo,
    VdbSceneProxies,
    VdbSceneProxyRegistry,
    VdbSequencePlayer,
    VdbVolume,
    VdbVolumeSequence,
    VdbVolumeStatic,
    VdbWorldBounds,
    volume::rand::random_volume_static,
};


fn headless_app() -> App {
    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins,
        AssetPlugin::default(),
        TransformPlugin,
        VdbPrincipledPlugin,
    ));
    app
}

fn frame_info(frame: i32) -> VdbRenderInfo {
    VdbRenderInfo::new(
        IVec3::new(frame, 0, 0),
        IVec3::splat(2),
        Mat4::IDENTITY,
        VdbRenderBuffer::from_voxels(&[frame as f32; 8]),
    )
}

fn add_volume(app: &mut App, volume: impl Into<VdbVolume>) -> Handle<VdbVolume> {
    app.world_mut()
        .resource_mut::<Assets<VdbVolume>>()
        .add(volume.into())
}

fn density_sequence(app: &mut App, frames: i32) -> Handle<VdbVolume> {
    add_volume(
        app,
        VdbVolumeSequence::from_frames(VdbGridType::Float, (0..frames).map(frame_info)),
    )
}

/// Spawns a paused player driving `assets` and a principled volume listening to it.
fn spawn_pair(app: &mut App, assets: VdbAssets) -> (Entity, Entity) {
    let source = app
        .world_mut()
        .spawn((assets, VdbSequencePlayer::paused()))
        .id();
    let principled = app
        .world_mut()
        .spawn(VdbPrincipled::new(source))
        .id();

    (source, principled)
}

fn seek(app: &mut App, source: Entity, frame_index: u32) {
    app.world_mut()
        .get_mut::<VdbSequencePlayer>(source)
        .unwrap()
        .seek(frame_index);
    app.update();
}

fn proxies(app: &App) -> &VdbSceneProxies {
    app.world().resource::<VdbSceneProxies>()
}


#[test]
fn proxy_created_for_scalar_density() {
    let mut app = headless_app();
    let density = density_sequence(&mut app, 4);
    let (_, principled) = spawn_pair(&mut app, VdbAssets::new(density));

    app.update();

    assert!(app.world().resource::<VdbSceneProxyRegistry>().contains(principled));

    let proxy = proxies(&app).get(principled).unwrap();
    assert_eq!(proxy.index_min(), IVec3::ZERO);
    assert!(proxy.density_buffer().is_some());
}

#[test]
fn no_proxy_without_drawable_density() {
    let mut app = headless_app();
    let vector = add_volume(
        &mut app,
        random_volume_static(VdbGridType::Vector3, IVec3::splat(2)),
    );

    let (_, unbound) = spawn_pair(&mut app, VdbAssets::default());
    let (_, vector_density) = spawn_pair(&mut app, VdbAssets::new(vector));

    app.update();

    assert!(!proxies(&app).contains(unbound));
    assert!(!proxies(&app).contains(vector_density));
    assert!(app.world().resource::<VdbSceneProxyRegistry>().is_empty());
}

#[test]
fn frame_change_updates_proxy_snapshot() {
    let mut app = headless_app();
    let density = density_sequence(&mut app, 4);
    let temperature = density_sequence(&mut app, 4);
    let (source, principled) = spawn_pair(
        &mut app,
        VdbAssets::new(density.clone()).with_temperature(temperature.clone()),
    );

    app.update();
    seek(&mut app, source, 2);

    assert_eq!(app.world().get::<VdbPrincipled>(principled).unwrap().current_frame(), 2);

    let volumes = app.world().resource::<Assets<VdbVolume>>();
    let expected_density = volumes.get(&density).unwrap().render_info(2).unwrap();
    let expected_temperature = volumes.get(&temperature).unwrap().render_info(2).unwrap();

    let proxy = proxies(&app).get(principled).unwrap();
    assert_eq!(proxy.index_min(), expected_density.index_min());
    assert_eq!(proxy.density_buffer(), Some(expected_density.render_resource()));
    assert_eq!(proxy.temperature_buffer(), Some(expected_temperature.render_resource()));
    assert_eq!(proxy.extra_buffer_updates(), 0);
}

#[test]
fn unresolved_frame_keeps_previous_snapshot() {
    let mut app = headless_app();

    let mut sequence = VdbVolumeSequence::new(VdbGridType::Float);
    sequence.set_frame(0, frame_info(0));
    sequence.set_frame(1, frame_info(1));
    sequence.set_frame(3, frame_info(3));
    let density = add_volume(&mut app, sequence);

    let (source, principled) = spawn_pair(&mut app, VdbAssets::new(density));

    app.update();
    seek(&mut app, source, 1);
    seek(&mut app, source, 2);

    assert_eq!(app.world().get::<VdbPrincipled>(principled).unwrap().current_frame(), 2);
    assert_eq!(proxies(&app).get(principled).unwrap().index_min(), IVec3::new(1, 0, 0));

    seek(&mut app, source, 3);
    assert_eq!(proxies(&app).get(principled).unwrap().index_min(), IVec3::new(3, 0, 0));
}

#[test]
fn extra_buffers_follow_frame_changes_only_when_bound() {
    let mut app = headless_app();
    let density = density_sequence(&mut app, 3);
    let extra = density_sequence(&mut app, 3);
    let static_extra = add_volume(
        &mut app,
        VdbVolumeStatic::new(VdbGridType::Float, frame_info(7)),
    );

    let (plain_source, plain) = spawn_pair(&mut app, VdbAssets::new(density.clone()));
    let (extra_source, with_extra) = spawn_pair(
        &mut app,
        VdbAssets::new(density)
            .with_float(2, extra.clone())
            .with_vector(0, static_extra),
    );

    app.update();
    let created_updates = proxies(&app).get(with_extra).unwrap().extra_buffer_updates();

    seek(&mut app, plain_source, 1);
    seek(&mut app, extra_source, 1);

    assert_eq!(proxies(&app).get(plain).unwrap().extra_buffer_updates(), 0);

    let proxy = proxies(&app).get(with_extra).unwrap();
    assert_eq!(proxy.extra_buffer_updates(), created_updates + 1);
    let expected = app
        .world()
        .resource::<Assets<VdbVolume>>()
        .get(&extra)
        .unwrap()
        .render_info(1)
        .unwrap()
        .render_resource();
    assert_eq!(proxy.extra_buffers()[2].as_ref(), Some(expected));
    // static extras carry no per-frame data
    assert_eq!(proxy.extra_buffers().iter().flatten().count(), 1);
}

#[test]
fn late_optional_volume_reaches_proxy() {
    let mut app = headless_app();
    let density = add_volume(
        &mut app,
        VdbVolumeStatic::new(VdbGridType::Float, frame_info(0)),
    );
    let temperature = app
        .world()
        .resource::<Assets<VdbVolume>>()
        .reserve_handle();

    let (_, principled) = spawn_pair(
        &mut app,
        VdbAssets::new(density).with_temperature(temperature.clone()),
    );

    app.update();
    assert!(proxies(&app).get(principled).unwrap().temperature_buffer().is_none());

    let sequence = VdbVolumeSequence::from_frames(VdbGridType::Float, (0..2).map(frame_info));
    app.world_mut()
        .resource_mut::<Assets<VdbVolume>>()
        .insert(temperature.id(), sequence.into());
    app.update();

    let volumes = app.world().resource::<Assets<VdbVolume>>();
    let expected = volumes.get(&temperature).unwrap().render_info(0).unwrap().render_resource();
    assert_eq!(proxies(&app).get(principled).unwrap().temperature_buffer(), Some(expected));
}

#[test]
fn attribute_change_recreates_proxy() {
    let mut app = headless_app();
    let density = density_sequence(&mut app, 2);
    let (_, principled) = spawn_pair(&mut app, VdbAssets::new(density));
    app.update();

    {
        let mut component = app.world_mut().get_mut::<VdbPrincipled>(principled).unwrap();
        assert!(component.set_density_multiplier(4.0));
        assert!(!component.set_density_multiplier(4.0));
    }
    app.update();

    let component = app.world().get::<VdbPrincipled>(principled).unwrap();
    assert!(!component.is_render_state_dirty());
    assert_eq!(proxies(&app).get(principled).unwrap().attributes().density_multiplier, 4.0);
}

#[test]
fn locked_attributes_leave_proxy_untouched() {
    let mut app = headless_app();
    let density = density_sequence(&mut app, 2);
    let (_, principled) = spawn_pair(&mut app, VdbAssets::new(density));
    app.update();

    {
        let mut component = app.world_mut().get_mut::<VdbPrincipled>(principled).unwrap();
        component.set_allow_dynamic_changes(false);
        assert!(!component.set_anisotropy(0.5));
    }
    app.update();

    assert_eq!(proxies(&app).get(principled).unwrap().attributes().anisotropy, 0.0);
}

#[test]
fn removing_component_destroys_proxy() {
    let mut app = headless_app();
    let density = density_sequence(&mut app, 2);
    let (source, principled) = spawn_pair(&mut app, VdbAssets::new(density));
    app.update();
    assert!(proxies(&app).contains(principled));

    app.world_mut().entity_mut(principled).remove::<VdbPrincipled>();
    app.update();

    assert!(!proxies(&app).contains(principled));
    assert!(!app.world().resource::<VdbSceneProxyRegistry>().contains(principled));

    seek(&mut app, source, 1);
    assert!(proxies(&app).is_empty());
}

#[test]
fn rebinding_switches_frame_source() {
    let mut app = headless_app();
    let first = density_sequence(&mut app, 2);
    let second = density_sequence(&mut app, 5);
    let (first_source, principled) = spawn_pair(&mut app, VdbAssets::new(first));
    let second_source = app
        .world_mut()
        .spawn((VdbAssets::new(second), VdbSequencePlayer::paused()))
        .id();
    app.update();

    app.world_mut()
        .get_mut::<VdbPrincipled>(principled)
        .unwrap()
        .bind(second_source);
    app.update();

    seek(&mut app, first_source, 1);
    assert_eq!(app.world().get::<VdbPrincipled>(principled).unwrap().current_frame(), 0);

    seek(&mut app, second_source, 4);
    assert_eq!(app.world().get::<VdbPrincipled>(principled).unwrap().current_frame(), 4);
    assert_eq!(proxies(&app).get(principled).unwrap().index_min(), IVec3::new(4, 0, 0));
}

#[test]
fn world_bounds_follow_transform() {
    let mut app = headless_app();
    let density = add_volume(
        &mut app,
        VdbVolumeStatic::new(VdbGridType::Float, frame_info(0)),
    );
    let source = app.world_mut().spawn(VdbAssets::new(density)).id();
    let principled = app
        .world_mut()
        .spawn((
            VdbPrincipled::new(source),
            Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)),
        ))
        .id();

    app.update();

    let bounds = app.world().get::<VdbWorldBounds>(principled).unwrap().0;
    assert_eq!(Vec3::from(bounds.min), Vec3::new(10.0, 0.0, 0.0));
    assert_eq!(Vec3::from(bounds.max), Vec3::new(12.0, 2.0, 2.0));
}
