use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use hashbrown::HashMap;
use lumen_blocks::{BlockId, BlockMetadataProvider, Face};
use lumen_chunk::{Chunk, FacesState, LightValue, NeighborFaces};
use lumen_world::ChunkCoord;

/// One active voxel handed to the mesher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshVoxel {
    pub idx: usize,
    pub block: BlockId,
    pub faces: FacesState,
    /// Light sampled across each visible face, `NULL` for hidden faces. Indexed by `Face::index`.
    pub light: [LightValue; 6],
}

/// Everything a renderer needs to build geometry for one chunk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshInput {
    pub coord: ChunkCoord,
    pub voxels: Vec<MeshVoxel>,
}

impl MeshInput {
    /// Collects the active voxels of `chunk` with their visible faces and face light.
    pub fn build(chunk: &Chunk, neighbors: &NeighborFaces, meta: &dyn BlockMetadataProvider) -> Self {
        let voxels = chunk
            .active()
            .into_iter()
            .filter_map(|idx| {
                let faces = chunk.faces_state(idx, neighbors, meta);
                if !faces.any() {
                    return None;
                }
                let mut light = [LightValue::NULL; 6];
                for face in faces.faces() {
                    light[face.index()] = chunk.face_light(idx, face, neighbors);
                }
                Some(MeshVoxel {
                    idx,
                    block: chunk.block(idx),
                    faces,
                    light,
                })
            })
            .collect();
        Self {
            coord: chunk.coord(),
            voxels,
        }
    }

    pub fn face_count(&self) -> usize {
        self.voxels.iter().map(|v| v.faces.count() as usize).sum()
    }

    pub fn voxel(&self, idx: usize) -> Option<&MeshVoxel> {
        self.voxels.iter().find(|v| v.idx == idx)
    }

    pub fn face_light(&self, idx: usize, face: Face) -> Option<LightValue> {
        self.voxel(idx)
            .filter(|v| v.faces.is_visible(face))
            .map(|v| v.light[face.index()])
    }
}

/// Receives finished chunks from the mesh stage. Called from worker threads.
pub trait Mesher: Send + Sync {
    fn add_mesh(&self, input: MeshInput);

    fn remove(&self, coord: ChunkCoord);
}

/// Discards every mesh; useful for headless pregeneration.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullMesher;

impl Mesher for NullMesher {
    fn add_mesh(&self, _input: MeshInput) {}

    fn remove(&self, _coord: ChunkCoord) {}
}

/// Keeps the latest mesh input per chunk and counts calls.
#[derive(Default)]
pub struct RecordingMesher {
    meshes: Mutex<HashMap<ChunkCoord, MeshInput>>,
    adds: AtomicUsize,
    removes: AtomicUsize,
}

impl RecordingMesher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_meshed(&self, coord: ChunkCoord) -> bool {
        self.meshes.lock().unwrap().contains_key(&coord)
    }

    pub fn mesh(&self, coord: ChunkCoord) -> Option<MeshInput> {
        self.meshes.lock().unwrap().get(&coord).cloned()
    }

    pub fn coords(&self) -> Vec<ChunkCoord> {
        let mut out: Vec<ChunkCoord> = self.meshes.lock().unwrap().keys().copied().collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.meshes.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(add_mesh calls, remove calls)` so far.
    pub fn call_counts(&self) -> (usize, usize) {
        (
            self.adds.load(Ordering::Relaxed),
            self.removes.load(Ordering::Relaxed),
        )
    }
}

impl Mesher for RecordingMesher {
    fn add_mesh(&self, input: MeshInput) {
        self.adds.fetch_add(1, Ordering::Relaxed);
        self.meshes.lock().unwrap().insert(input.coord, input);
    }

    fn remove(&self, coord: ChunkCoord) {
        self.removes.fetch_add(1, Ordering::Relaxed);
        self.meshes.lock().unwrap().remove(&coord);
    }
}
