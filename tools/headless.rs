use bevy::{
    app::{
        AppExit,
        ScheduleRunnerPlugin,
    },
    log::LogPlugin,
    prelude::*,
    transform::TransformPlugin,
};
use bevy_args::{
    parse_args,
    BevyArgsPlugin,
};
use byte_unit::{
    Byte,
    UnitType,
};

use bevy_splat_stream::{
    gaussian::rand::random_raw_buffer,
    io::FileSource,
    stream::{
        systems::SplatSourceHandle,
        ChunkState,
    },
    BatchManager,
    ChunkStreamer,
    SplatCamera,
    SplatData,
    SplatStreamPlugin,
    SplatStreamSettings,
};


const RANDOM_SPLAT_COUNT: usize = 16_384;


fn setup_scene(
    mut commands: Commands,
    settings: Res<SplatStreamSettings>,
    mut manager: ResMut<BatchManager>,
) {
    if settings.scene.is_empty() {
        info!("no scene given, generating {} random splats", RANDOM_SPLAT_COUNT);
        manager.set_buffer(SplatData::raw(random_raw_buffer(RANDOM_SPLAT_COUNT)));
    }

    commands.spawn((
        Name::new("splat_camera"),
        Camera::default(),
        Projection::Perspective(PerspectiveProjection {
            far: 100.0,
            ..default()
        }),
        Transform::from_translation(Vec3::new(0.0, 1.5, 30.0)).looking_at(Vec3::ZERO, Vec3::Y),
        SplatCamera,
    ));
}


fn orbit_camera(
    time: Res<Time>,
    mut cameras: Query<&mut Transform, With<SplatCamera>>,
) {
    for mut transform in cameras.iter_mut() {
        let angle = time.elapsed_secs() * 0.25;
        let radius = transform.translation.xz().length().max(1.0);
        transform.translation.x = radius * angle.sin();
        transform.translation.z = radius * angle.cos();
        transform.look_at(Vec3::ZERO, Vec3::Y);
    }
}


fn report_and_exit(
    settings: Res<SplatStreamSettings>,
    manager: Res<BatchManager>,
    streamer: Res<ChunkStreamer>,
    mut frames: Local<u32>,
    mut exit: EventWriter<AppExit>,
) {
    *frames += 1;
    if settings.max_frames == 0 || *frames < settings.max_frames {
        return;
    }

    let resident_bytes: u64 = manager
        .batches()
        .iter()
        .filter_map(|batch| batch.texture())
        .map(|texture| texture.as_bytes().len() as u64)
        .sum();
    let visible: usize = manager.batches().iter().map(|batch| batch.instance_count()).sum();

    info!(
        "{} frames: {} batches, {} visible splats, {} packed, {} chunks loaded",
        *frames,
        manager.len(),
        visible,
        Byte::from_u64(resident_bytes).get_appropriate_unit(UnitType::Decimal),
        streamer.count(ChunkState::Loaded),
    );

    exit.write(AppExit::Success);
}


fn headless_app() {
    let settings = parse_args::<SplatStreamSettings>();

    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(
            std::time::Duration::from_secs_f64(1.0 / 60.0),
        )),
        LogPlugin::default(),
        TransformPlugin,
    ));
    app.add_plugins(BevyArgsPlugin::<SplatStreamSettings>::default());

    app.insert_resource(SplatSourceHandle(std::sync::Arc::new(FileSource::new(&settings.source_root))));
    app.add_plugins(SplatStreamPlugin);

    app.add_systems(Startup, setup_scene);
    app.add_systems(Update, (orbit_camera, report_and_exit));

    app.run();
}

pub fn main() {
    headless_app();
}
