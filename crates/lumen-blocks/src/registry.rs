use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{BlockDef, BlocksConfig};
use crate::face::Face;
use crate::metadata::BlockMetadataProvider;
use crate::types::{AIR, BlockId, MAX_LIGHT};

/// Block set shipped with the crate; mirrors `config/blocks.toml`.
pub const DEFAULT_BLOCKS_TOML: &str = r#"
[[blocks]]
name = "air"
id = 0
transparent = true

[[blocks]]
name = "stone"
id = 1
material = "stone"

[[blocks]]
name = "dirt"
id = 2
material = "dirt"

[[blocks]]
name = "grass"
id = 3
[blocks.faces]
top = "grass_top"
bottom = "dirt"
side = "grass_side"

[[blocks]]
name = "sand"
id = 4
material = "sand"

[[blocks]]
name = "snow"
id = 5
material = "snow"

[[blocks]]
name = "water"
id = 6
transparent = true
material = "water"

[[blocks]]
name = "glass"
id = 7
transparent = true
material = "glass"

[[blocks]]
name = "glowstone"
id = 8
emission = 14
material = "glowstone"

[[blocks]]
name = "torch"
id = 9
transparent = true
emission = 14
material = "torch"

[[blocks]]
name = "lantern"
id = 10
transparent = true
emission = 10
material = "lantern"

[[blocks]]
name = "candle"
id = 11
transparent = true
emission = 5
material = "candle"

[[blocks]]
name = "coal_ore"
id = 12
material = "coal_ore"

[[blocks]]
name = "log"
id = 13
[blocks.faces]
top = "log_top"
bottom = "log_top"
side = "log_side"

[[blocks]]
name = "leaves"
id = 14
transparent = true
material = "leaves"
"#;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read block config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid block config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("block id {id} is used by both '{first}' and '{second}'")]
    DuplicateId {
        id: BlockId,
        first: String,
        second: String,
    },
    #[error("block name '{0}' is defined twice")]
    DuplicateName(String),
    #[error("block id 0 must be a transparent, non-emitting 'air' block")]
    InvalidAir,
    #[error("block '{name}' emits {emission}, above the maximum of {max}")]
    EmissionOutOfRange { name: String, emission: u8, max: u8 },
}

#[derive(Clone, Debug)]
pub struct BlockType {
    pub id: BlockId,
    pub name: String,
    pub transparent: bool,
    pub emission: u8,
    /// Material per face, indexed by `Face::index`.
    pub materials: [Option<String>; 6],
    pub multiface: bool,
}

impl BlockType {
    fn from_def(id: BlockId, def: &BlockDef) -> Result<Self, RegistryError> {
        let emission = def.emission.unwrap_or(0);
        if emission > MAX_LIGHT {
            return Err(RegistryError::EmissionOutOfRange {
                name: def.name.clone(),
                emission,
                max: MAX_LIGHT,
            });
        }
        let base = def.material.clone();
        let mut materials: [Option<String>; 6] = Default::default();
        let mut multiface = false;
        for face in Face::ALL {
            materials[face.index()] = base.clone();
        }
        if let Some(faces) = &def.faces {
            multiface = true;
            let side = faces.side.clone().or_else(|| base.clone());
            materials[Face::PosY.index()] = faces.top.clone().or_else(|| side.clone());
            materials[Face::NegY.index()] = faces.bottom.clone().or_else(|| side.clone());
            for face in [Face::PosX, Face::NegX, Face::PosZ, Face::NegZ] {
                materials[face.index()] = side.clone();
            }
        }
        Ok(Self {
            id,
            name: def.name.clone(),
            transparent: def.transparent.unwrap_or(false),
            emission,
            materials,
            multiface,
        })
    }
}

/// TOML-backed block table implementing [`BlockMetadataProvider`].
///
/// Unknown ids behave as opaque, non-emitting blocks.
#[derive(Clone, Debug, Default)]
pub struct BlockRegistry {
    blocks: Vec<Option<BlockType>>,
    by_name: HashMap<String, BlockId>,
}

impl BlockRegistry {
    pub fn from_config(cfg: BlocksConfig) -> Result<Self, RegistryError> {
        let mut reg = Self::default();
        let mut next_id: BlockId = cfg
            .blocks
            .iter()
            .filter_map(|b| b.id)
            .max()
            .map(|m| m.saturating_add(1))
            .unwrap_or(0);
        for def in &cfg.blocks {
            let id = match def.id {
                Some(id) => id,
                None => {
                    let id = next_id;
                    next_id = next_id.saturating_add(1);
                    id
                }
            };
            if reg.by_name.contains_key(&def.name) {
                return Err(RegistryError::DuplicateName(def.name.clone()));
            }
            let slot = id as usize;
            if reg.blocks.len() <= slot {
                reg.blocks.resize(slot + 1, None);
            }
            if let Some(existing) = &reg.blocks[slot] {
                return Err(RegistryError::DuplicateId {
                    id,
                    first: existing.name.clone(),
                    second: def.name.clone(),
                });
            }
            reg.blocks[slot] = Some(BlockType::from_def(id, def)?);
            reg.by_name.insert(def.name.clone(), id);
        }
        match reg.get(AIR) {
            Some(air) if air.transparent && air.emission == 0 => Ok(reg),
            _ => Err(RegistryError::InvalidAir),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, RegistryError> {
        let cfg: BlocksConfig = toml::from_str(s)?;
        Self::from_config(cfg)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, RegistryError> {
        let s = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    /// Registry built from [`DEFAULT_BLOCKS_TOML`].
    pub fn builtin() -> Self {
        Self::from_toml_str(DEFAULT_BLOCKS_TOML).expect("builtin block table is valid")
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&BlockType> {
        self.blocks.get(id as usize).and_then(|b| b.as_ref())
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockType> {
        self.blocks.iter().flatten()
    }
}

impl BlockMetadataProvider for BlockRegistry {
    #[inline]
    fn is_transparent(&self, id: BlockId) -> bool {
        self.get(id).map(|b| b.transparent).unwrap_or(false)
    }

    #[inline]
    fn light_emission(&self, id: BlockId) -> u8 {
        self.get(id).map(|b| b.emission).unwrap_or(0)
    }

    fn is_multiface(&self, id: BlockId) -> bool {
        self.get(id).map(|b| b.multiface).unwrap_or(false)
    }

    fn face_material(&self, id: BlockId, face: Face) -> Option<&str> {
        self.get(id)
            .and_then(|b| b.materials[face.index()].as_deref())
    }

    fn name(&self, id: BlockId) -> Option<&str> {
        self.get(id).map(|b| b.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_has_expected_lighting_facts() {
        let reg = BlockRegistry::builtin();
        let air = reg.id_by_name("air").unwrap();
        let stone = reg.id_by_name("stone").unwrap();
        let torch = reg.id_by_name("torch").unwrap();
        let glowstone = reg.id_by_name("glowstone").unwrap();
        assert_eq!(air, AIR);
        assert!(reg.is_transparent(air));
        assert!(!reg.is_transparent(stone));
        assert!(reg.is_transparent(torch));
        assert_eq!(reg.light_emission(torch), 14);
        assert!(reg.is_light_source(glowstone));
        assert!(reg.is_opaque(glowstone));
        assert!(!reg.is_light_source(stone));
    }

    #[test]
    fn multiface_lookup_resolves_top_bottom_side() {
        let reg = BlockRegistry::builtin();
        let grass = reg.id_by_name("grass").unwrap();
        assert!(reg.is_multiface(grass));
        assert_eq!(reg.face_material(grass, Face::PosY), Some("grass_top"));
        assert_eq!(reg.face_material(grass, Face::NegY), Some("dirt"));
        assert_eq!(reg.face_material(grass, Face::PosX), Some("grass_side"));
        let stone = reg.id_by_name("stone").unwrap();
        assert!(!reg.is_multiface(stone));
        assert_eq!(reg.face_material(stone, Face::NegZ), Some("stone"));
    }

    #[test]
    fn unknown_ids_are_opaque_and_dark() {
        let reg = BlockRegistry::builtin();
        assert!(!reg.is_transparent(9999));
        assert_eq!(reg.light_emission(9999), 0);
        assert_eq!(reg.name(9999), None);
    }

    #[test]
    fn missing_ids_are_assigned_after_the_highest_explicit_id() {
        let reg = BlockRegistry::from_toml_str(
            r#"
            [[blocks]]
            name = "air"
            id = 0
            transparent = true
            [[blocks]]
            name = "rock"
            id = 4
            [[blocks]]
            name = "moss"
            "#,
        )
        .unwrap();
        assert_eq!(reg.id_by_name("moss"), Some(5));
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn rejects_bad_tables() {
        let dup = r#"
            [[blocks]]
            name = "air"
            id = 0
            transparent = true
            [[blocks]]
            name = "a"
            id = 1
            [[blocks]]
            name = "b"
            id = 1
        "#;
        assert!(matches!(
            BlockRegistry::from_toml_str(dup),
            Err(RegistryError::DuplicateId { id: 1, .. })
        ));

        let solid_air = r#"
            [[blocks]]
            name = "air"
            id = 0
        "#;
        assert!(matches!(
            BlockRegistry::from_toml_str(solid_air),
            Err(RegistryError::InvalidAir)
        ));

        let bright = r#"
            [[blocks]]
            name = "air"
            id = 0
            transparent = true
            [[blocks]]
            name = "sun"
            emission = 20
        "#;
        assert!(matches!(
            BlockRegistry::from_toml_str(bright),
            Err(RegistryError::EmissionOutOfRange { emission: 20, .. })
        ));
    }
}
