use bevy::{
    prelude::*,
    transform::TransformPlugin,
};

use bevy_splat_stream::{
    gaussian::{
        raw::write_raw_buffer,
        RawSplat,
    },
    stream::systems::{
        SplatContainer,
        ToggleSplatVisibility,
    },
    BatchId,
    BatchManager,
    RawLayout,
    SortMode,
    SplatCamera,
    SplatData,
    SplatStreamPlugin,
    SplatStreamSettings,
};


fn splat_app() -> App {
    let mut app = App::new();
    app.insert_resource(SplatStreamSettings {
        sort_mode: SortMode::Inline,
        ..default()
    });
    app.add_plugins((
        MinimalPlugins,
        TransformPlugin,
        SplatStreamPlugin,
    ));
    app.finish();
    app.cleanup();

    app.world_mut().spawn((
        Camera::default(),
        Projection::Perspective(PerspectiveProjection {
            far: 100.0,
            ..default()
        }),
        Transform::default(),
        SplatCamera,
    ));

    let splats: Vec<RawSplat> = (0..8)
        .map(|i| RawSplat {
            position: Vec3::new(i as f32 * 0.05, 0.0, -5.0),
            ..default()
        })
        .collect();
    app.world_mut()
        .resource_mut::<BatchManager>()
        .set_buffer(SplatData::raw(write_raw_buffer(&RawLayout::FULL, &splats)));

    app
}


#[test]
fn test_plugin_spawns_and_sorts_batches() {
    let mut app = splat_app();
    app.update();
    app.update();

    let manager = app.world().resource::<BatchManager>();
    let batch = &manager.batches()[0];
    let entity = batch.entity().expect("batch entity spawned");

    assert_eq!(batch.render_order(), Some(0));
    assert_eq!(batch.instance_count(), 8);
    assert_eq!(app.world().get::<BatchId>(entity), Some(&batch.id()));

    let container = manager.container().expect("container spawned");
    assert!(app.world().get::<SplatContainer>(container).is_some());
    assert_eq!(app.world().get::<ChildOf>(entity).map(|parent| parent.parent()), Some(container));
}

#[test]
fn test_visibility_toggle_event() {
    let mut app = splat_app();
    app.update();

    app.world_mut().send_event(ToggleSplatVisibility);
    app.update();
    app.update();

    let manager = app.world().resource::<BatchManager>();
    assert!(manager.is_hidden());

    let entity = manager.batches()[0].entity().expect("batch entity spawned");
    assert_eq!(app.world().get::<Visibility>(entity), Some(&Visibility::Hidden));
}
