//! Six-direction adjacency between loaded chunks.
//!
//! Records live in an arena keyed by [`ChunkCoord`]; links are coordinates,
//! never references. Layers at or above the sky level are open sky and count
//! as present without being stored, unless an edit materialized one of them.

use hashbrown::HashMap;
use lumen_blocks::Face;
use lumen_world::ChunkCoord;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Link {
    Chunk(ChunkCoord),
    /// Synthetic open-sky chunk above generated terrain.
    Sky,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Adjacency {
    neighbors: [Option<Link>; 6],
}

impl Adjacency {
    #[inline]
    pub fn get(&self, face: Face) -> Option<Link> {
        self.neighbors[face.index()]
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.neighbors.iter().all(Option::is_some)
    }

    pub fn linked_chunks(&self) -> impl Iterator<Item = (Face, ChunkCoord)> + '_ {
        Face::ALL.into_iter().filter_map(|f| match self.get(f) {
            Some(Link::Chunk(c)) => Some((f, c)),
            _ => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymmetryViolation {
    pub from: ChunkCoord,
    pub face: Face,
    pub link: Option<Link>,
}

impl std::fmt::Display for SymmetryViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "chunk {} has {:?} towards {:?} without a matching back link",
            self.from, self.link, self.face
        )
    }
}

#[derive(Clone, Debug, Default)]
pub struct ChunkGraph {
    nodes: HashMap<ChunkCoord, Adjacency>,
    sky_level: Option<i32>,
}

impl ChunkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph in which every layer `cy >= sky_level` is open sky.
    pub fn with_sky_level(sky_level: i32) -> Self {
        Self {
            nodes: HashMap::new(),
            sky_level: Some(sky_level),
        }
    }

    #[inline]
    pub fn sky_level(&self) -> Option<i32> {
        self.sky_level
    }

    #[inline]
    pub fn is_sky(&self, coord: ChunkCoord) -> bool {
        self.sky_level.is_some_and(|level| coord.cy >= level)
    }

    #[inline]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.nodes.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.nodes.keys().copied()
    }

    pub fn adjacency(&self, coord: ChunkCoord) -> Option<&Adjacency> {
        self.nodes.get(&coord)
    }

    /// Registers `coord` and links it with every present neighbor.
    ///
    /// Idempotent. Returns the stored neighbors that gained a link to `coord`
    /// during this call.
    pub fn calculate_adjacency(&mut self, coord: ChunkCoord) -> Vec<ChunkCoord> {
        let mut record = self.nodes.get(&coord).copied().unwrap_or_default();
        let mut linked = Vec::new();
        for face in Face::ALL {
            if matches!(record.get(face), Some(Link::Chunk(_))) {
                continue;
            }
            let target = coord.neighbor(face);
            if let Some(other) = self.nodes.get_mut(&target) {
                other.neighbors[face.opposite().index()] = Some(Link::Chunk(coord));
                record.neighbors[face.index()] = Some(Link::Chunk(target));
                linked.push(target);
            } else if self.is_sky(target) {
                record.neighbors[face.index()] = Some(Link::Sky);
            }
        }
        self.nodes.insert(coord, record);
        linked
    }

    /// Removes `coord` and clears every back link pointing at it.
    pub fn dereference(&mut self, coord: ChunkCoord) -> Option<Adjacency> {
        let record = self.nodes.remove(&coord)?;
        let replacement = self.is_sky(coord).then_some(Link::Sky);
        for (face, other) in record.linked_chunks() {
            if let Some(n) = self.nodes.get_mut(&other) {
                n.neighbors[face.opposite().index()] = replacement;
            }
        }
        Some(record)
    }

    /// World coordinates of the directions `coord` still lacks.
    pub fn null_chunk_indexes(&self, coord: ChunkCoord) -> Vec<ChunkCoord> {
        let record = self.nodes.get(&coord);
        Face::ALL
            .into_iter()
            .filter(|f| record.and_then(|r| r.get(*f)).is_none())
            .map(|f| coord.neighbor(f))
            .collect()
    }

    #[inline]
    pub fn neighbor(&self, coord: ChunkCoord, face: Face) -> Option<Link> {
        self.nodes.get(&coord).and_then(|r| r.get(face))
    }

    pub fn all_neighbors_exist(&self, coord: ChunkCoord) -> bool {
        self.nodes.get(&coord).is_some_and(Adjacency::is_complete)
    }

    /// First link that has no matching back link, if any.
    pub fn check_symmetry(&self) -> Result<(), SymmetryViolation> {
        for (&from, record) in &self.nodes {
            for face in Face::ALL {
                let link = record.get(face);
                let target = from.neighbor(face);
                let ok = match link {
                    Some(Link::Chunk(c)) => {
                        c == target
                            && self.neighbor(c, face.opposite()) == Some(Link::Chunk(from))
                    }
                    Some(Link::Sky) => self.is_sky(target) && !self.contains(target),
                    None => !self.contains(target) && !self.is_sky(target),
                };
                if !ok {
                    return Err(SymmetryViolation { from, face, link });
                }
            }
        }
        Ok(())
    }
}
