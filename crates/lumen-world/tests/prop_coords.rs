use lumen_blocks::Face;
use lumen_world::{CHUNK_SIZE, ChunkCoord, locate, voxel_coords};
use proptest::prelude::*;

proptest! {
    #[test]
    fn locate_recovers_world_position(
        wx in -100_000i32..100_000,
        wy in -4_096i32..4_096,
        wz in -100_000i32..100_000,
    ) {
        let (coord, idx) = locate(wx, wy, wz);
        let (ox, oy, oz) = coord.origin();
        let (x, y, z) = voxel_coords(idx);
        prop_assert_eq!((ox + x as i32, oy + y as i32, oz + z as i32), (wx, wy, wz));
        prop_assert_eq!(ChunkCoord::containing(wx, wy, wz), coord);
        prop_assert!(x < CHUNK_SIZE && y < CHUNK_SIZE && z < CHUNK_SIZE);
    }

    #[test]
    fn neighbors_are_one_step_away(cx in -1000i32..1000, cy in -64i32..64, cz in -1000i32..1000) {
        let c = ChunkCoord::new(cx, cy, cz);
        for face in Face::ALL {
            let n = c.neighbor(face);
            prop_assert_eq!(c.manhattan(n), 1);
            prop_assert_eq!(c.chebyshev(n), 1);
            prop_assert_eq!(n.neighbor(face.opposite()), c);
        }
    }
}
