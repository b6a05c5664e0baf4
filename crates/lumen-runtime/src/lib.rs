//! Region streaming and the staged generate/link/light/mesh pipeline.
#![forbid(unsafe_code)]

pub mod bulk;
mod cancel;
pub mod config;
mod light_actor;
pub mod mesher;
mod pipeline;
pub mod region;
mod world;

pub use bulk::{BulkReport, pregenerate};
pub use cancel::CancelToken;
pub use config::PipelineConfig;
pub use light_actor::LightRequest;
pub use mesher::{MeshInput, MeshVoxel, Mesher, NullMesher, RecordingMesher};
pub use pipeline::{Pipeline, PipelineError, StageCounts};
pub use region::{Region, RegionPlan, Stencil};
pub use world::{ChunkHandle, Linker, World, WorldVolume};
