use std::{
    sync::Arc,
    thread::JoinHandle,
};

use bevy::prelude::*;
use crossbeam_channel::{
    Receiver,
    Sender,
};

use crate::{
    gaussian::{
        data::SplatData,
        packed::PackedTexture,
    },
    sort::{
        CullMargin,
        DepthIndex,
        VisibilitySorter,
    },
};


enum WorkerRequest {
    SetBuffer {
        generation: u64,
        data: SplatData,
    },
    Sort {
        view: Mat4,
        projection: Mat4,
    },
}


pub enum WorkerResponse {
    Packed {
        generation: u64,
        texture: Arc<PackedTexture>,
    },
    Sorted {
        generation: u64,
        depth_index: DepthIndex,
    },
}

impl WorkerResponse {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Packed { generation, .. } => *generation,
            Self::Sorted { generation, .. } => *generation,
        }
    }
}


/// Packs and sorts one batch on its own thread.
///
/// Buffers move into the worker; the packed texture comes back behind an
/// `Arc` and is never written again. Queued requests are coalesced so only
/// the newest buffer and newest camera are processed, and responses from an
/// older buffer generation are dropped by [`drain_results`](Self::drain_results).
pub struct SplatWorker {
    requests: Option<Sender<WorkerRequest>>,
    responses: Receiver<WorkerResponse>,
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl SplatWorker {
    pub fn spawn(margin: CullMargin) -> Self {
        let (request_tx, request_rx) = crossbeam_channel::unbounded();
        let (response_tx, response_rx) = crossbeam_channel::unbounded();

        let handle = std::thread::Builder::new()
            .name("splat-sort".to_string())
            .spawn(move || worker_loop(request_rx, response_tx, margin))
            .map_err(|err| error!("failed to spawn splat worker: {err}"))
            .ok();

        Self {
            requests: Some(request_tx),
            responses: response_rx,
            handle,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// supersedes any buffer still queued or in flight
    pub fn submit(&mut self, data: SplatData) -> u64 {
        self.generation += 1;
        self.send(WorkerRequest::SetBuffer {
            generation: self.generation,
            data,
        });
        self.generation
    }

    pub fn request_sort(&self, view: Mat4, projection: Mat4) {
        self.send(WorkerRequest::Sort { view, projection });
    }

    fn send(&self, request: WorkerRequest) {
        let Some(requests) = &self.requests else {
            return;
        };

        if requests.send(request).is_err() {
            warn!("splat worker has exited, request dropped");
        }
    }

    pub fn drain_results(&self) -> Vec<WorkerResponse> {
        let mut results = Vec::new();
        while let Ok(response) = self.responses.try_recv() {
            if response.generation() == self.generation {
                results.push(response);
            }
        }
        results
    }

    /// blocks until the current generation has a depth index, test and tooling helper
    pub fn wait_for_sort(&self, timeout: std::time::Duration) -> Option<(Option<Arc<PackedTexture>>, DepthIndex)> {
        let deadline = std::time::Instant::now() + timeout;
        let mut texture = None;

        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            let response = self.responses.recv_timeout(remaining).ok()?;
            if response.generation() != self.generation {
                continue;
            }

            match response {
                WorkerResponse::Packed { texture: packed, .. } => texture = Some(packed),
                WorkerResponse::Sorted { depth_index, .. } => return Some((texture, depth_index)),
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SplatWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}


fn worker_loop(
    requests: Receiver<WorkerRequest>,
    responses: Sender<WorkerResponse>,
    margin: CullMargin,
) {
    let mut sorter = VisibilitySorter::new(0.0, margin);
    let mut texture: Option<(u64, Arc<PackedTexture>)> = None;
    let mut camera: Option<(Mat4, Mat4)> = None;

    while let Ok(first) = requests.recv() {
        let mut buffer = None;
        let mut sort_requested = false;

        for request in std::iter::once(first).chain(requests.try_iter()) {
            match request {
                WorkerRequest::SetBuffer { generation, data } => buffer = Some((generation, data)),
                WorkerRequest::Sort { view, projection } => {
                    camera = Some((view, projection));
                    sort_requested = true;
                }
            }
        }

        if let Some((generation, data)) = buffer {
            let packed = Arc::new(data.into_texture());
            sorter.invalidate();

            if responses.send(WorkerResponse::Packed {
                generation,
                texture: packed.clone(),
            }).is_err() {
                return;
            }

            texture = Some((generation, packed));
            sort_requested = true;
        }

        let (Some((generation, packed)), Some((view, projection)), true) = (&texture, &camera, sort_requested) else {
            continue;
        };

        let depth_index = sorter.sort_now(packed.records(), view, projection);
        if responses.send(WorkerResponse::Sorted {
            generation: *generation,
            depth_index,
        }).is_err() {
            return;
        }
    }
}
