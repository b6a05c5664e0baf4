use crate::face::Face;
use crate::types::BlockId;

/// Per-block facts the chunk, lighting and meshing code needs.
///
/// Implementations must treat air (`0`) as transparent and non-emitting.
pub trait BlockMetadataProvider: Send + Sync {
    fn is_transparent(&self, id: BlockId) -> bool;

    /// Block-channel light emitted by this block, `0..=15`.
    fn light_emission(&self, id: BlockId) -> u8;

    #[inline]
    fn is_light_source(&self, id: BlockId) -> bool {
        self.light_emission(id) > 0
    }

    /// True when the block uses different materials per face.
    fn is_multiface(&self, id: BlockId) -> bool;

    fn face_material(&self, id: BlockId, face: Face) -> Option<&str>;

    fn name(&self, id: BlockId) -> Option<&str>;

    #[inline]
    fn is_opaque(&self, id: BlockId) -> bool {
        !self.is_transparent(id)
    }
}
