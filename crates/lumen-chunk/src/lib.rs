//! Chunk storage, light values, face visibility, and the chunk adjacency graph.
#![forbid(unsafe_code)]

mod chunk;
mod faces;
pub mod graph;
mod light;

pub use chunk::{Chunk, ChunkState, ChunkStorage, Voxels};
pub use faces::{
    BorderPlane, FacesState, NeighborFaces, NeighborPlane, VoxelStep, border_indexes,
    plane_index, step,
};
pub use graph::{Adjacency, ChunkGraph, Link, SymmetryViolation};
pub use light::{Channel, LightValue};
