use std::sync::Arc;

use bevy::{
    prelude::*,
    tasks::{
        block_on,
        futures_lite::future,
        IoTaskPool,
        Task,
    },
};

use crate::{
    batch::{
        BatchId,
        BatchManager,
    },
    camera::{
        CameraMatrices,
        SplatCamera,
    },
    error::SplatError,
    gaussian::data::SplatData,
    io::SplatSource,
    render::{
        DeferredCompositor,
        EnvironmentMap,
        RenderBackend,
    },
    settings::SplatStreamSettings,
    stream::{
        manifest::{
            ChunkDescriptor,
            ChunkManifest,
        },
        streamer::{
            ChunkState,
            ChunkStreamer,
        },
    },
};


#[derive(Resource, Clone)]
pub struct SplatSourceHandle(pub Arc<dyn SplatSource>);


/// Parent of every batch entity so batch transforms compose with the scene.
#[derive(
    Clone,
    Component,
    Debug,
    Default,
    Reflect,
)]
pub struct SplatContainer;


#[derive(Resource)]
pub struct SplatCompositor {
    pub compositor: DeferredCompositor,
    pub backend: Box<dyn RenderBackend>,
}


#[derive(Event, Clone, Copy, Debug)]
pub struct CycleCompositeMode;

#[derive(Event, Clone, Copy, Debug)]
pub struct ToggleSplatVisibility;


pub struct ChunkFetch {
    pub id: String,
    pub centroid: Vec3,
    pub result: Result<SplatData, SplatError>,
}


#[derive(Resource, Default)]
pub struct SplatLoadTasks {
    scene: Option<Task<Result<SplatData, SplatError>>>,
    environment: Option<Task<Result<EnvironmentMap, SplatError>>>,
    manifest: Option<Task<Result<ChunkManifest, SplatError>>>,
    sweep: Option<Task<Vec<ChunkFetch>>>,
}


async fn load_scene(source: Arc<dyn SplatSource>, scene: String) -> Result<SplatData, SplatError> {
    let payload = source.fetch_scene(&scene).await?;
    Ok(payload.validate()?)
}

async fn load_environment(source: Arc<dyn SplatSource>, scene: String) -> Result<EnvironmentMap, SplatError> {
    let payload = source.fetch_environment_map(&scene).await?;
    Ok(EnvironmentMap::try_from(payload)?)
}

async fn load_manifest(source: Arc<dyn SplatSource>, scene: String) -> Result<ChunkManifest, SplatError> {
    source.fetch_chunk_manifest(&scene).await
}

async fn fetch_chunk(source: Arc<dyn SplatSource>, scene: String, chunk: ChunkDescriptor) -> ChunkFetch {
    let result = match source.fetch_chunk(&scene, &chunk).await {
        Ok(payload) => payload.validate().map_err(SplatError::from),
        Err(err) => Err(err),
    };

    ChunkFetch {
        centroid: chunk.centroid(),
        id: chunk.id,
        result,
    }
}


pub fn setup_container(
    mut commands: Commands,
    mut manager: ResMut<BatchManager>,
) {
    if manager.container().is_some() {
        return;
    }

    let container = commands.spawn((
        Name::new("splat_container"),
        SplatContainer,
        Transform::default(),
        Visibility::default(),
    )).id();

    manager.set_container(container);
}


pub fn start_scene_load(
    settings: Res<SplatStreamSettings>,
    source: Option<Res<SplatSourceHandle>>,
    mut tasks: ResMut<SplatLoadTasks>,
) {
    let Some(source) = source else {
        debug!("no splat source registered, skipping scene load");
        return;
    };

    if settings.scene.is_empty() {
        return;
    }

    let pool = IoTaskPool::get();
    let scene = settings.scene.clone();

    if settings.chunk_streaming {
        tasks.manifest = Some(pool.spawn(load_manifest(source.0.clone(), scene.clone())));
    } else {
        tasks.scene = Some(pool.spawn(load_scene(source.0.clone(), scene.clone())));
    }

    tasks.environment = Some(pool.spawn(load_environment(source.0.clone(), scene)));
    info!("loading scene '{}'", settings.scene);
}


pub fn poll_scene_load(
    mut tasks: ResMut<SplatLoadTasks>,
    mut manager: ResMut<BatchManager>,
    mut streamer: ResMut<ChunkStreamer>,
    compositor: Option<ResMut<SplatCompositor>>,
) {
    if let Some(task) = tasks.scene.as_mut() {
        if let Some(result) = block_on(future::poll_once(task)) {
            tasks.scene = None;
            match result {
                Ok(data) => {
                    info!("scene loaded, {} splats", data.vertex_count());
                    manager.set_buffer(data);
                }
                Err(err) => error!("scene load aborted: {err}"),
            }
        }
    }

    if let Some(task) = tasks.manifest.as_mut() {
        if let Some(result) = block_on(future::poll_once(task)) {
            tasks.manifest = None;
            match result {
                Ok(manifest) => streamer.set_manifest(manifest),
                Err(err) => error!("chunk manifest load aborted: {err}"),
            }
        }
    }

    if let Some(task) = tasks.environment.as_mut() {
        if let Some(result) = block_on(future::poll_once(task)) {
            tasks.environment = None;
            match (result, compositor) {
                (Ok(environment), Some(mut compositor)) => compositor.compositor.set_environment_map(environment),
                (Ok(_), None) => debug!("environment map loaded without a compositor"),
                (Err(SplatError::Io(err)), _) => debug!("no environment map: {err}"),
                (Err(err), _) => error!("environment map rejected: {err}"),
            }
        }
    }
}


/// Spawns an entity under the container for every batch that has none.
pub fn sync_batch_entities(
    mut commands: Commands,
    mut manager: ResMut<BatchManager>,
) {
    let container = manager.container();

    let pending: Vec<BatchId> = manager
        .batches()
        .iter()
        .filter(|batch| batch.entity().is_none())
        .map(|batch| batch.id())
        .collect();

    for id in pending {
        let entity = commands.spawn((
            Name::new(format!("splat_batch_{}", id.0)),
            id,
            Transform::default(),
            Visibility::default(),
        )).id();

        if let Some(container) = container {
            commands.entity(container).add_child(entity);
        }

        if let Some(batch) = manager.batch_mut(id) {
            batch.set_entity(entity);
        }
    }
}


pub fn sync_batch_transforms(
    mut manager: ResMut<BatchManager>,
    mut batches: Query<(&BatchId, &GlobalTransform, &mut Visibility)>,
) {
    for (id, transform, mut visibility) in batches.iter_mut() {
        let Some(batch) = manager.batch_mut(*id) else {
            continue;
        };

        batch.set_world_from_local(transform.compute_matrix());

        let target = if batch.is_visible() {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        if *visibility != target {
            *visibility = target;
        }
    }
}


pub fn update_batches(
    mut manager: ResMut<BatchManager>,
    cameras: Query<(&Camera, &Projection, &GlobalTransform), With<SplatCamera>>,
) {
    let Ok((camera, projection, transform)) = cameras.single() else {
        manager.poll();
        return;
    };

    let matrices = CameraMatrices::from_camera(camera, projection, transform);
    manager.set_viewport(matrices.viewport);
    manager.update_uniforms(&matrices.view, &matrices.projection, matrices.focal());
}


pub fn sweep_chunks(
    settings: Res<SplatStreamSettings>,
    source: Option<Res<SplatSourceHandle>>,
    mut streamer: ResMut<ChunkStreamer>,
    mut tasks: ResMut<SplatLoadTasks>,
    cameras: Query<(&Camera, &Projection, &GlobalTransform), With<SplatCamera>>,
) {
    if !settings.chunk_streaming || tasks.sweep.is_some() {
        return;
    }

    let (Some(source), Ok((camera, projection, transform))) = (source, cameras.single()) else {
        return;
    };

    if !streamer.tick() {
        return;
    }

    let matrices = CameraMatrices::from_camera(camera, projection, transform);
    let planned = streamer.plan_sweep(&matrices.view, &matrices.projection);
    if planned.is_empty() {
        return;
    }

    let scene = if streamer.manifest().scene.is_empty() {
        settings.scene.clone()
    } else {
        streamer.manifest().scene.clone()
    };

    let pool = IoTaskPool::get();
    let fetches: Vec<Task<ChunkFetch>> = planned
        .into_iter()
        .map(|chunk| pool.spawn(fetch_chunk(source.0.clone(), scene.clone(), chunk)))
        .collect();

    tasks.sweep = Some(pool.spawn(async move {
        let mut results = Vec::with_capacity(fetches.len());
        for fetch in fetches {
            results.push(fetch.await);
        }
        results
    }));
}


pub fn poll_chunk_sweep(
    mut tasks: ResMut<SplatLoadTasks>,
    mut streamer: ResMut<ChunkStreamer>,
    mut manager: ResMut<BatchManager>,
) {
    let Some(task) = tasks.sweep.as_mut() else {
        return;
    };

    let Some(fetches) = block_on(future::poll_once(task)) else {
        return;
    };
    tasks.sweep = None;

    let mut loaded = 0;
    for fetch in fetches {
        match fetch.result {
            Ok(data) => {
                manager.add_chunk_batch(data, fetch.id.clone(), fetch.centroid);
                streamer.complete_fetch(&fetch.id, true);
                loaded += 1;
            }
            Err(err) => {
                if err.is_transient() {
                    warn!("chunk {} will be retried: {err}", fetch.id);
                } else {
                    error!("chunk {} rejected: {err}", fetch.id);
                }
                streamer.fail_fetch(&fetch.id, &err);
            }
        }
    }

    streamer.finish_sweep();
    debug!(
        "chunk sweep finished, {} loaded this sweep, {} loaded total",
        loaded,
        streamer.count(ChunkState::Loaded),
    );
}


pub fn handle_splat_events(
    mut manager: ResMut<BatchManager>,
    compositor: Option<ResMut<SplatCompositor>>,
    mut cycle_events: EventReader<CycleCompositeMode>,
    mut toggle_events: EventReader<ToggleSplatVisibility>,
) {
    if let Some(mut compositor) = compositor {
        for _ in cycle_events.read() {
            let mode = compositor.compositor.set_mode();
            info!("composite mode: {:?}", mode);
        }
    } else {
        cycle_events.clear();
    }

    for _ in toggle_events.read() {
        let visible = manager.toggle_visible();
        info!("splats visible: {}", visible);
    }
}


pub fn composite_splats(
    mut manager: ResMut<BatchManager>,
    splat_compositor: Option<ResMut<SplatCompositor>>,
    cameras: Query<(&Camera, &Projection, &GlobalTransform), With<SplatCamera>>,
) {
    let (Some(mut splat_compositor), Ok((camera, projection, transform))) = (splat_compositor, cameras.single()) else {
        return;
    };

    let matrices = CameraMatrices::from_camera(camera, projection, transform);
    let SplatCompositor {
        compositor,
        backend,
    } = &mut *splat_compositor;

    compositor.render(backend.as_mut(), &mut manager, &matrices);
}
