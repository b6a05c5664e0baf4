/// Compact block-type id stored per voxel. `0` is always air.
pub type BlockId = u16;

pub const AIR: BlockId = 0;

/// Highest value either light channel can hold.
pub const MAX_LIGHT: u8 = 15;
