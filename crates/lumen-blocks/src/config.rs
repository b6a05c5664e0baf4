use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct BlocksConfig {
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BlockDef {
    pub name: String,
    #[serde(default)]
    pub id: Option<u16>,
    #[serde(default)]
    pub transparent: Option<bool>,
    #[serde(default)]
    pub emission: Option<u8>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub faces: Option<FaceMaterials>,
}

/// Per-face material overrides; `side` covers the four horizontal faces.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct FaceMaterials {
    #[serde(default)]
    pub top: Option<String>,
    #[serde(default)]
    pub bottom: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
}
