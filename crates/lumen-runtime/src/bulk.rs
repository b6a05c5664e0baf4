//! One-shot pregeneration of a fixed set of chunks.
//!
//! Phases run back to back over the whole set instead of per chunk: generate
//! in parallel, link, seed the sky-facing layer, seed the rest, flood once,
//! mesh in parallel. The returned engine carries any deferred light so a
//! streaming [`crate::Pipeline`] can pick up where this left off.

use std::time::Instant;

use lumen_blocks::Face;
use lumen_chunk::{Chunk, ChunkState};
use lumen_lighting::{LightEngine, LightSeed, LightVolume, NeighborSlot, seed};
use lumen_world::ChunkCoord;
use rayon::prelude::*;

use crate::mesher::Mesher;
use crate::pipeline::mesh_chunk;
use crate::world::{World, WorldVolume};

#[derive(Debug, Default)]
pub struct BulkReport {
    pub engine: LightEngine,
    pub generated: usize,
    pub empty: usize,
    pub seeded: usize,
    pub meshed: usize,
}

/// Generates, links, lights and meshes `coords` in `world`.
///
/// Chunks whose neighbors are not all present stay in the linker's pending set.
pub fn pregenerate(world: &World, coords: &[ChunkCoord], mesher: &dyn Mesher) -> BulkReport {
    let started = Instant::now();
    let mut report = BulkReport::default();

    let chunks: Vec<Chunk> = coords
        .par_iter()
        .filter(|c| !world.region().contains(**c))
        .map(|&c| world.generate(c))
        .collect();
    report.generated = chunks.len();
    report.empty = chunks.iter().filter(|c| c.is_empty()).count();
    let installed: Vec<ChunkCoord> = chunks
        .into_iter()
        .map(|c| {
            let coord = c.coord();
            world.install(c);
            coord
        })
        .collect();
    log::info!(
        target: "bulk",
        "generated {} chunks ({} empty) in {:?}",
        report.generated,
        report.empty,
        started.elapsed()
    );

    let linked: Vec<ChunkCoord> = {
        let mut linker = world.linker_mut();
        for &c in &installed {
            linker.graph.calculate_adjacency(c);
        }
        let mut linked = Vec::new();
        for &c in &installed {
            let Some(h) = world.chunk(c) else { continue };
            let mut chunk = h.write().unwrap();
            if chunk.state() != ChunkState::Generated {
                continue;
            }
            if linker.graph.all_neighbors_exist(c) {
                chunk.set_state(ChunkState::Linked);
                linked.push(c);
            } else {
                linker.pending.insert(c);
            }
        }
        linked
    };

    let (sky_facing, buried): (Vec<ChunkCoord>, Vec<ChunkCoord>) = {
        let vol = WorldVolume::new(world);
        linked
            .iter()
            .partition(|c| vol.neighbor(**c, Face::PosY) == NeighborSlot::Empty)
    };
    let mut engine = LightEngine::new();
    for phase in [&sky_facing, &buried] {
        let plans: Vec<Vec<LightSeed>> = phase
            .par_iter()
            .map(|&c| {
                let vol = WorldVolume::new(world);
                let mut seeds = seed::initial_skylight(&vol, c);
                seeds.extend(seed::initial_light(&vol, c));
                seeds
            })
            .collect();
        let mut vol = WorldVolume::new(world);
        for seeds in &plans {
            engine.apply_seeds(&mut vol, seeds);
        }
        for &c in phase.iter() {
            if let Some(h) = world.chunk(c) {
                h.write().unwrap().set_state(ChunkState::LightSeeded);
            }
        }
    }
    report.seeded = linked.len();

    let stats = {
        let mut vol = WorldVolume::new(world);
        engine.flood_fill(&mut vol)
    };
    engine.take_touched();
    for &c in &linked {
        if let Some(h) = world.chunk(c) {
            h.write().unwrap().set_state(ChunkState::Lit);
        }
    }
    log::info!(
        target: "bulk",
        "lit {} chunks: processed={} updated={} deferred={}",
        linked.len(),
        stats.processed,
        stats.updated,
        stats.deferred
    );

    linked.par_iter().for_each(|&c| mesh_chunk(world, mesher, c));
    report.meshed = linked
        .iter()
        .filter(|&&c| world.state(c) == Some(ChunkState::Ready))
        .count();
    log::info!(
        target: "bulk",
        "pregenerated {} chunks in {:?}",
        installed.len(),
        started.elapsed()
    );
    report.engine = engine;
    report
}
