use std::{
    collections::HashSet,
    f32::consts::FRAC_PI_2,
    time::Duration,
};

use bevy::prelude::*;

use bevy_splat_stream::{
    gaussian::{
        packed::pack_all,
        rand::random_raw_buffer,
        raw::write_raw_buffer,
        RawSplat,
    },
    settings::{
        DATA_TEXTURE_WIDTH,
        DEPTH_BUCKETS,
    },
    sort::{
        CullMargin,
        SortGate,
        SplatWorker,
    },
    PackedSplatRecord,
    RawLayout,
    SplatData,
    VisibilitySorter,
};


fn camera() -> (Mat4, Mat4) {
    (
        Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y),
        Mat4::perspective_rh_gl(FRAC_PI_2, 1.0, 0.1, 100.0),
    )
}

fn records_at(positions: &[Vec3], scale: f32) -> Vec<PackedSplatRecord> {
    let splats: Vec<RawSplat> = positions
        .iter()
        .map(|position| RawSplat {
            position: *position,
            scale: Vec3::new(scale, scale, 0.0),
            ..default()
        })
        .collect();

    pack_all(RawLayout::FULL, &write_raw_buffer(&RawLayout::FULL, &splats))
}

fn view_z(view: &Mat4, record: &PackedSplatRecord) -> f32 {
    view.row(2).dot(record.position().extend(1.0))
}


#[test]
fn test_sort_is_a_back_to_front_subset() {
    let records = pack_all(RawLayout::FULL, &random_raw_buffer(5000));
    let (view, projection) = camera();

    let mut sorter = VisibilitySorter::new(0.1, CullMargin::Fixed(0.2));
    let depth_index = sorter.sort_now(&records, &view, &projection);

    let visible = depth_index.visible();
    assert!(!visible.is_empty());
    assert_eq!(depth_index.padded().len() % DATA_TEXTURE_WIDTH, 0);
    assert!(depth_index.padded()[visible.len()..].iter().all(|index| *index == 0));

    let unique: HashSet<u32> = visible.iter().copied().collect();
    assert_eq!(unique.len(), visible.len());
    assert!(visible.iter().all(|index| (*index as usize) < records.len()));

    let depths: Vec<f32> = visible.iter().map(|index| view_z(&view, &records[*index as usize])).collect();
    let range = depths.iter().cloned().fold(f32::NEG_INFINITY, f32::max)
        - depths.iter().cloned().fold(f32::INFINITY, f32::min);
    let bucket = range / (DEPTH_BUCKETS - 1) as f32;

    for pair in depths.windows(2) {
        assert!(pair[0] <= pair[1] + bucket + 1e-4, "{} after {}", pair[1], pair[0]);
    }
    assert!(depths.iter().all(|depth| *depth <= 0.0));
}

#[test]
fn test_sort_keeps_every_splat_inside_the_frustum() {
    let records = pack_all(RawLayout::FULL, &random_raw_buffer(5000));
    let (view, projection) = camera();
    let clip_from_world = projection * view;

    let mut sorter = VisibilitySorter::new(0.1, CullMargin::Fixed(0.0));
    let depth_index = sorter.sort_now(&records, &view, &projection);
    let visible: HashSet<u32> = depth_index.visible().iter().copied().collect();

    for (index, record) in records.iter().enumerate() {
        let clip = clip_from_world * record.position().extend(1.0);
        if clip.w <= 0.0 || view_z(&view, record) > 0.0 {
            assert!(!visible.contains(&(index as u32)));
            continue;
        }

        let ndc = clip.truncate() / clip.w;
        if ndc.abs().max_element() < 0.999 {
            assert!(visible.contains(&(index as u32)), "splat {index} at {ndc} culled");
        }
    }
}

#[test]
fn test_sort_orders_known_depths() {
    let records = records_at(
        &[
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::new(0.0, 0.0, -20.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 20.0),
        ],
        0.01,
    );
    let (view, projection) = camera();

    let depth_index = VisibilitySorter::default().sort_now(&records, &view, &projection);

    // the splat behind the camera is culled, the far one draws first
    assert_eq!(depth_index.visible(), &[1, 2, 0]);
    assert_eq!(depth_index.visible_count(), 3);
}

#[test]
fn test_sort_with_nothing_visible_is_empty() {
    let (view, projection) = camera();
    let behind = records_at(&[Vec3::new(0.0, 0.0, 30.0), Vec3::new(1.0, 0.0, 15.0)], 0.01);

    let depth_index = VisibilitySorter::default().sort_now(&behind, &view, &projection);
    assert_eq!(depth_index.visible_count(), 0);
    assert!(depth_index.padded().is_empty());

    let depth_index = VisibilitySorter::default().sort_now(&[], &view, &projection);
    assert_eq!(depth_index.visible_count(), 0);
}

#[test]
fn test_single_depth_does_not_divide_by_zero() {
    let (view, projection) = camera();
    let records = records_at(&[Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)], 0.01);

    let depth_index = VisibilitySorter::default().sort_now(&records, &view, &projection);
    assert_eq!(depth_index.visible_count(), 2);
}

#[test]
fn test_epsilon_gate() {
    let records = pack_all(RawLayout::FULL, &random_raw_buffer(100));
    let (view, projection) = camera();
    let mut sorter = VisibilitySorter::new(0.1, CullMargin::default());

    assert!(sorter.sort(&records, &view, &projection).is_some());
    assert!(sorter.sort(&records, &view, &projection).is_none());

    let nudged = Mat4::from_translation(Vec3::new(0.01, 0.0, 0.0)) * view;
    assert!(sorter.sort(&records, &nudged, &projection).is_none());

    let moved = Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0)) * view;
    assert!(sorter.sort(&records, &moved, &projection).is_some());

    sorter.invalidate();
    assert!(sorter.sort(&records, &moved, &projection).is_some());
}

#[test]
fn test_sort_gate_tracks_projection() {
    let (view, projection) = camera();
    let mut gate = SortGate::new(0.1);

    assert!(gate.admit(&view, &projection));
    assert!(!gate.is_dirty(&view, &projection));

    let zoomed = Mat4::perspective_rh_gl(FRAC_PI_2 * 0.5, 1.0, 0.1, 100.0);
    assert!(gate.is_dirty(&view, &zoomed));
}

#[test]
fn test_adaptive_margin_keeps_large_splats_at_the_edge() {
    let view = Mat4::IDENTITY;
    let projection = Mat4::perspective_rh_gl(FRAC_PI_2, 1.0, 0.1, 100.0);

    // ndc x of 1.1, radius 3
    let records = records_at(&[Vec3::new(5.5, 0.0, -5.0)], 1.0);

    let fixed = VisibilitySorter::new(0.1, CullMargin::Fixed(0.0)).sort_now(&records, &view, &projection);
    assert_eq!(fixed.visible_count(), 0);

    let adaptive = VisibilitySorter::new(0.1, CullMargin::Adaptive { base: 0.0 }).sort_now(&records, &view, &projection);
    assert_eq!(adaptive.visible_count(), 1);
}


#[test]
fn test_worker_matches_inline_sort() {
    let buffer = random_raw_buffer(3000);
    let (view, projection) = camera();

    let mut worker = SplatWorker::spawn(CullMargin::default());
    let generation = worker.submit(SplatData::raw(buffer.clone()));
    worker.request_sort(view, projection);

    let (texture, depth_index) = worker
        .wait_for_sort(Duration::from_secs(10))
        .expect("worker sort timed out");
    let texture = texture.expect("packed texture precedes the depth index");

    assert_eq!(generation, worker.generation());
    assert_eq!(texture.vertex_count(), 3000);

    let records = pack_all(RawLayout::FULL, &buffer);
    let inline = VisibilitySorter::default().sort_now(&records, &view, &projection);
    assert_eq!(depth_index, inline);

    worker.shutdown();
    assert!(!worker.is_alive());
}

#[test]
fn test_worker_drops_superseded_buffers() {
    let (view, projection) = camera();
    let mut worker = SplatWorker::spawn(CullMargin::default());

    worker.submit(SplatData::raw(random_raw_buffer(4000)));
    worker.submit(SplatData::raw(random_raw_buffer(10)));
    worker.request_sort(view, projection);

    let (texture, _) = worker
        .wait_for_sort(Duration::from_secs(10))
        .expect("worker sort timed out");

    assert_eq!(texture.map(|texture| texture.vertex_count()), Some(10));
    assert!(worker.drain_results().is_empty());
}

#[test]
fn test_worker_resorts_new_buffer_with_last_camera() {
    let (view, projection) = camera();
    let mut worker = SplatWorker::spawn(CullMargin::default());

    worker.submit(SplatData::raw(random_raw_buffer(100)));
    worker.request_sort(view, projection);
    worker
        .wait_for_sort(Duration::from_secs(10))
        .expect("worker sort timed out");

    let records = records_at(&[Vec3::ZERO], 0.01);
    worker.submit(SplatData::Packed(records));

    let (texture, depth_index) = worker
        .wait_for_sort(Duration::from_secs(10))
        .expect("buffer replacement should trigger a sort");
    assert_eq!(texture.map(|texture| texture.vertex_count()), Some(1));
    assert_eq!(depth_index.visible(), &[0]);
}
