use bevy::prelude::*;

pub use batch::{
    BatchId,
    BatchManager,
    SplatBatch,
};
pub use camera::SplatCamera;
pub use error::{
    SplatError,
    ValidationError,
};
pub use gaussian::{
    PackedSplatRecord,
    PackedTexture,
    RawLayout,
    SplatData,
};
pub use settings::SplatStreamSettings;
pub use sort::{
    DepthIndex,
    SortMode,
    VisibilitySorter,
};
pub use stream::{
    ChunkManifest,
    ChunkStreamer,
};

use render::{
    BackendCapabilities,
    DeferredCompositor,
    HeadlessBackend,
    RenderBackend,
};
use stream::systems::{
    composite_splats,
    handle_splat_events,
    poll_chunk_sweep,
    poll_scene_load,
    setup_container,
    start_scene_load,
    sweep_chunks,
    sync_batch_entities,
    sync_batch_transforms,
    update_batches,
    CycleCompositeMode,
    SplatCompositor,
    SplatLoadTasks,
    ToggleSplatVisibility,
};

pub mod batch;
pub mod camera;
pub mod error;
pub mod gaussian;
pub mod io;
pub mod math;
pub mod render;
pub mod settings;
pub mod sort;
pub mod stream;


const HEADLESS_COMMAND_LIMIT: usize = 4096;


#[derive(Debug, Hash, PartialEq, Eq, Clone, SystemSet)]
pub enum SplatStreamSet {
    Load,
    Sort,
    Stream,
}


/// Wires the camera, batch manager, chunk streamer and compositor into the app.
///
/// Register a [`stream::systems::SplatSourceHandle`] to load `settings.scene`.
/// Without a [`SplatCompositor`] resource a recording headless backend is used.
#[derive(Default)]
pub struct SplatStreamPlugin;

impl Plugin for SplatStreamPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<SplatCamera>();
        app.register_type::<SplatStreamSettings>();
        app.register_type::<BatchId>();

        app.init_resource::<SplatStreamSettings>();
        app.init_resource::<SplatLoadTasks>();

        app.add_event::<CycleCompositeMode>();
        app.add_event::<ToggleSplatVisibility>();

        app.configure_sets(
            Update,
            (
                SplatStreamSet::Load,
                SplatStreamSet::Sort,
                SplatStreamSet::Stream,
            ).chain(),
        );

        app.add_systems(Startup, (setup_container, start_scene_load));
        app.add_systems(
            Update,
            (
                (poll_scene_load, poll_chunk_sweep).in_set(SplatStreamSet::Load),
                (
                    sync_batch_entities,
                    sync_batch_transforms,
                    handle_splat_events,
                    update_batches,
                ).chain().in_set(SplatStreamSet::Sort),
                sweep_chunks.in_set(SplatStreamSet::Stream),
            ),
        );
        app.add_systems(PostUpdate, composite_splats);
    }

    fn finish(&self, app: &mut App) {
        let settings = app
            .world()
            .get_resource::<SplatStreamSettings>()
            .cloned()
            .unwrap_or_default();

        if !app.world().contains_resource::<BatchManager>() {
            app.insert_resource(BatchManager::from_settings(&settings));
        }

        if !app.world().contains_resource::<ChunkStreamer>() {
            app.insert_resource(ChunkStreamer::from_settings(ChunkManifest::default(), &settings));
        }

        if !app.world().contains_resource::<SplatCompositor>() {
            let backend = HeadlessBackend::new(BackendCapabilities::default()).with_command_limit(HEADLESS_COMMAND_LIMIT);
            app.insert_resource(SplatCompositor {
                compositor: DeferredCompositor::new(backend.capabilities(), settings.deferred),
                backend: Box::new(backend),
            });
        }
    }
}
