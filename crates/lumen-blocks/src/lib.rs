//! Block ids, faces, and block metadata.
#![forbid(unsafe_code)]

pub mod config;
pub mod face;
pub mod metadata;
pub mod registry;
pub mod types;

pub use face::Face;
pub use metadata::BlockMetadataProvider;
pub use registry::{BlockRegistry, BlockType, RegistryError};
pub use types::{AIR, BlockId, MAX_LIGHT};
