//! Dual-channel light propagation across linked chunks.
#![forbid(unsafe_code)]

mod arena;
mod engine;
pub mod seed;
mod volume;

pub use arena::ChunkArena;
pub use engine::{FloodStats, LightEngine};
pub use seed::LightSeed;
pub use volume::{LightNode, LightVolume, NeighborSlot};
