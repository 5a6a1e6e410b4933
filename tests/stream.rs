use std::f32::consts::FRAC_PI_3;

use bevy::prelude::*;

use bevy_splat_stream::{
    error::{
        SplatError,
        ValidationError,
    },
    stream::{
        ChunkBounds,
        ChunkDescriptor,
        ChunkState,
    },
    ChunkManifest,
    ChunkStreamer,
};


fn chunk(id: &str, center: Vec3) -> ChunkDescriptor {
    ChunkDescriptor {
        id: id.to_string(),
        file: format!("{id}.bin"),
        bounds: ChunkBounds {
            min: (center - Vec3::ONE).to_array(),
            max: (center + Vec3::ONE).to_array(),
        },
        vertex_count: 64,
    }
}

/// a and b lie ahead of a camera at the origin looking down -z, c behind it
fn manifest() -> ChunkManifest {
    ChunkManifest {
        scene: "garden".to_string(),
        chunks: vec![
            chunk("c", Vec3::new(0.0, 0.0, 20.0)),
            chunk("b", Vec3::new(0.0, 0.0, -15.0)),
            chunk("a", Vec3::new(0.0, 0.0, -5.0)),
        ],
        ..default()
    }
}

fn projection() -> Mat4 {
    Mat4::perspective_rh_gl(FRAC_PI_3, 1.0, 0.1, 100.0)
}

fn ids(chunks: &[ChunkDescriptor]) -> Vec<&str> {
    chunks.iter().map(|chunk| chunk.id.as_str()).collect()
}


#[test]
fn test_manifest_json() {
    let manifest = ChunkManifest::from_json(r#"{
        "trunk_size": 16.0,
        "total_vertex": 192,
        "chunks": [
            { "id": "0_0_0", "file": "0_0_0.bin", "bounds": { "min": [0, 0, 0], "max": [16, 16, 16] }, "vertexCount": 128 },
            { "id": "1_0_0", "file": "1_0_0.bin", "bounds": { "min": [16, 0, 0], "max": [32, 16, 16] }, "vertexCount": 64 }
        ]
    }"#).expect("valid manifest");

    assert_eq!(manifest.chunks.len(), 2);
    assert_eq!(manifest.trunk_size, Some(16.0));
    assert_eq!(manifest.total_vertex, Some(192));
    assert!(manifest.scene.is_empty());

    let second = manifest.get("1_0_0").expect("chunk present");
    assert_eq!(second.vertex_count, 64);
    assert_eq!(second.centroid(), Vec3::new(24.0, 8.0, 8.0));
}

#[test]
fn test_manifest_rejects_duplicates_and_inverted_bounds() {
    let mut duplicated = manifest();
    duplicated.chunks.push(chunk("a", Vec3::ZERO));
    assert!(matches!(duplicated.validate(), Err(ValidationError::ChunkMetadata(_))));

    let mut inverted = manifest();
    inverted.chunks[0].bounds.min = [5.0, 0.0, 0.0];
    inverted.chunks[0].bounds.max = [0.0, 1.0, 1.0];
    assert!(matches!(inverted.validate(), Err(ValidationError::ChunkMetadata(_))));

    let malformed = ChunkManifest::from_json(r#"{ "chunks": [ { "id": "a" } ] }"#);
    assert!(matches!(malformed, Err(SplatError::Json(_))));
}


#[test]
fn test_sweep_selects_chunks_in_view_nearest_first() {
    let mut streamer = ChunkStreamer::new(manifest(), 1, 8, 4);

    let planned = streamer.plan_sweep(&Mat4::IDENTITY, &projection());

    assert_eq!(ids(&planned), vec!["a", "b"]);
    assert_eq!(streamer.state("a"), ChunkState::Loading);
    assert_eq!(streamer.state("b"), ChunkState::Loading);
    assert_eq!(streamer.state("c"), ChunkState::Unknown);
    assert!(streamer.is_sweeping());
}

#[test]
fn test_sweeps_never_overlap_or_refetch() {
    let mut streamer = ChunkStreamer::new(manifest(), 1, 8, 4);

    let first = streamer.plan_sweep(&Mat4::IDENTITY, &projection());
    assert_eq!(first.len(), 2);
    assert!(!streamer.tick());
    assert!(streamer.plan_sweep(&Mat4::IDENTITY, &projection()).is_empty());

    streamer.complete_fetch("a", true);
    streamer.complete_fetch("b", true);
    streamer.finish_sweep();

    assert_eq!(streamer.count(ChunkState::Loaded), 2);
    assert!(streamer.plan_sweep(&Mat4::IDENTITY, &projection()).is_empty());
    assert!(!streamer.is_sweeping());
}

#[test]
fn test_failed_fetch_is_retried() {
    let mut streamer = ChunkStreamer::new(manifest(), 1, 8, 4);

    streamer.plan_sweep(&Mat4::IDENTITY, &projection());
    streamer.complete_fetch("a", true);
    streamer.complete_fetch("b", false);
    streamer.finish_sweep();

    assert_eq!(streamer.state("a"), ChunkState::Loaded);
    assert_eq!(streamer.state("b"), ChunkState::Unknown);

    let retry = streamer.plan_sweep(&Mat4::IDENTITY, &projection());
    assert_eq!(ids(&retry), vec!["b"]);
}

#[test]
fn test_validation_failure_is_not_retried() {
    let mut streamer = ChunkStreamer::new(manifest(), 1, 8, 4);

    streamer.plan_sweep(&Mat4::IDENTITY, &projection());
    streamer.fail_fetch("a", &SplatError::transient("a", "connection reset"));
    streamer.fail_fetch("b", &ValidationError::ChannelCount { declared: 12, expected: 16 }.into());
    streamer.finish_sweep();

    assert_eq!(streamer.state("a"), ChunkState::Unknown);
    assert_eq!(streamer.state("b"), ChunkState::Loaded);
    assert!(streamer.is_rejected("b"));
    assert!(!streamer.is_rejected("a"));

    let retry = streamer.plan_sweep(&Mat4::IDENTITY, &projection());
    assert_eq!(ids(&retry), vec!["a"]);
    streamer.complete_fetch("a", true);
    streamer.finish_sweep();

    assert!(streamer.plan_sweep(&Mat4::IDENTITY, &projection()).is_empty());
    assert!(matches!(streamer.fetch_chunk("b"), Ok(false)));
}

#[test]
fn test_sweep_respects_far_plane() {
    let unit_box = |id: &str, min: [f32; 3]| ChunkDescriptor {
        id: id.to_string(),
        file: format!("{id}.bin"),
        bounds: ChunkBounds {
            min,
            max: [min[0] + 1.0, min[1] + 1.0, min[2] + 1.0],
        },
        vertex_count: 64,
    };

    let manifest = ChunkManifest {
        chunks: vec![
            unit_box("C", [10.0, 0.0, 0.0]),
            unit_box("B", [2.0, 0.0, 0.0]),
            unit_box("A", [0.0, 0.0, 0.0]),
        ],
        ..default()
    };
    let mut streamer = ChunkStreamer::new(manifest, 1, 8, 4);

    let view = Mat4::look_to_rh(Vec3::ZERO, Vec3::X, Vec3::Y);
    let projection = Mat4::perspective_rh_gl(FRAC_PI_3, 1.0, 0.1, 5.0);

    let planned = streamer.plan_sweep(&view, &projection);

    assert_eq!(ids(&planned), vec!["A", "B"]);
    assert_eq!(streamer.state("C"), ChunkState::Unknown);
}

#[test]
fn test_sweep_limits() {
    let mut streamer = ChunkStreamer::new(manifest(), 1, 8, 1);
    assert_eq!(ids(&streamer.plan_sweep(&Mat4::IDENTITY, &projection())), vec!["a"]);

    // b ranks outside the visible budget
    let mut streamer = ChunkStreamer::new(manifest(), 1, 1, 4);
    assert_eq!(ids(&streamer.plan_sweep(&Mat4::IDENTITY, &projection())), vec!["a"]);
}

#[test]
fn test_empty_frustum_falls_back_to_distance() {
    let streamer = ChunkStreamer::new(manifest(), 1, 8, 4);
    let looking_up = Mat4::look_at_rh(Vec3::ZERO, Vec3::Y, Vec3::Z);

    let candidates: Vec<&str> = streamer
        .select_candidates(&looking_up, &projection())
        .into_iter()
        .map(|chunk| chunk.id.as_str())
        .collect();

    assert_eq!(candidates, vec!["a", "b", "c"]);
}

#[test]
fn test_tick_interval() {
    let mut streamer = ChunkStreamer::new(manifest(), 3, 8, 4);

    let due: Vec<bool> = (0..7).map(|_| streamer.tick()).collect();
    assert_eq!(due, vec![true, false, false, true, false, false, true]);
}

#[test]
fn test_fetch_chunk() {
    let mut streamer = ChunkStreamer::new(manifest(), 1, 8, 4);

    assert!(matches!(streamer.fetch_chunk("missing"), Err(SplatError::UnknownChunk(_))));
    assert!(matches!(streamer.fetch_chunk("c"), Ok(true)));
    assert!(matches!(streamer.fetch_chunk("c"), Ok(false)));

    streamer.complete_fetch("c", true);
    assert!(matches!(streamer.fetch_chunk("c"), Ok(false)));
    assert_eq!(streamer.state("c"), ChunkState::Loaded);
}

#[test]
fn test_set_manifest_keeps_surviving_states() {
    let mut streamer = ChunkStreamer::new(manifest(), 1, 8, 4);
    streamer.plan_sweep(&Mat4::IDENTITY, &projection());
    streamer.complete_fetch("a", true);
    streamer.complete_fetch("b", true);
    streamer.finish_sweep();

    let mut next = manifest();
    next.chunks.retain(|chunk| chunk.id != "b");
    streamer.set_manifest(next);

    assert_eq!(streamer.state("a"), ChunkState::Loaded);
    assert_eq!(streamer.count(ChunkState::Loaded), 1);
    assert_eq!(streamer.count(ChunkState::Unknown), 1);
}
