//! Block types and the immutable block-property registry.
//!
//! The GPU writes one `u32` per block. The registry maps that value to the
//! properties the mesher needs (tint, opacity, texture layer). A registry is
//! built once at startup and handed to every consumer behind an `Arc`; there
//! is no global palette.

use std::path::Path;

use bytemuck::{Pod, Zeroable};
use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

/// A block type as written by the terrain generator.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
pub struct BlockType(pub u32);

impl BlockType {
    /// Empty space.
    pub const AIR: Self = Self(0);
    /// Dirt, found under the grass layer.
    pub const DIRT: Self = Self(1);
    /// Grass, the top layer above sea level.
    pub const GRASS: Self = Self(2);
    /// Stone, the bulk of the terrain.
    pub const STONE: Self = Self(3);
    /// Water, fills everything below sea level.
    pub const WATER: Self = Self(4);
    /// Sand, the top layer around the shore.
    pub const SAND: Self = Self(5);

    /// Returns true if this is air.
    #[inline]
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.0 == 0
    }

    /// Raw id as written by the GPU.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }
}

/// Per-type rendering properties.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlockProperties {
    /// Human readable name.
    pub name: String,
    /// RGBA tint written into every vertex of the block's faces.
    pub color: [f32; 4],
    /// Opaque blocks hide the faces of anything behind them.
    pub opaque: bool,
    /// Layer in the block texture array.
    #[serde(default)]
    pub texture_layer: u32,
}

#[derive(Deserialize)]
struct PaletteFile {
    blocks: Vec<PaletteEntry>,
}

#[derive(Deserialize)]
struct PaletteEntry {
    id: u32,
    #[serde(flatten)]
    properties: BlockProperties,
}

/// Immutable `BlockType -> properties` lookup.
///
/// Ids are dense: entry `i` describes `BlockType(i)`. Unknown ids resolve to
/// air so a corrupt read-back can never index out of bounds.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    blocks: Vec<BlockProperties>,
}

impl BlockRegistry {
    /// Builds a registry from properties indexed by block id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPalette`] if the palette is empty or if
    /// id 0 is not a transparent air entry.
    pub fn new(blocks: Vec<BlockProperties>) -> ConfigResult<Self> {
        match blocks.first() {
            None => Err(ConfigError::InvalidPalette("palette is empty".into())),
            Some(air) if air.opaque => Err(ConfigError::InvalidPalette(
                "block 0 is reserved for air and must not be opaque".into(),
            )),
            Some(_) => Ok(Self { blocks }),
        }
    }

    /// The built-in terrain palette.
    #[must_use]
    pub fn builtin() -> Self {
        let entry = |name: &str, color: [f32; 4], opaque: bool, texture_layer: u32| {
            BlockProperties {
                name: name.to_owned(),
                color,
                opaque,
                texture_layer,
            }
        };
        Self {
            blocks: vec![
                entry("air", [0.0, 0.0, 0.0, 0.0], false, 0),
                entry("dirt", [0.54, 0.27, 0.07, 1.0], true, 1),
                entry("grass", [0.1, 0.6, 0.2, 1.0], true, 2),
                entry("stone", [0.5, 0.5, 0.5, 1.0], true, 3),
                entry("water", [0.1, 0.3, 0.8, 0.5], false, 4),
                entry("sand", [0.86, 0.8, 0.55, 1.0], true, 5),
            ],
        }
    }

    /// Parses a palette from TOML.
    ///
    /// ```toml
    /// [[blocks]]
    /// id = 0
    /// name = "air"
    /// color = [0.0, 0.0, 0.0, 0.0]
    /// opaque = false
    /// ```
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML, duplicate or missing ids, or an opaque air
    /// entry.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let mut file: PaletteFile = toml::from_str(source)?;
        file.blocks.sort_by_key(|entry| entry.id);

        let mut blocks = Vec::with_capacity(file.blocks.len());
        for (expected, entry) in (0u32..).zip(file.blocks) {
            if entry.id != expected {
                return Err(ConfigError::InvalidPalette(format!(
                    "block ids must be dense and unique, expected {expected} but found {}",
                    entry.id
                )));
            }
            blocks.push(entry.properties);
        }
        Self::new(blocks)
    }

    /// Loads a palette from a TOML file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not parse.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_toml_str(&source)?;
        tracing::info!(
            "loaded block palette from {} ({} types)",
            path.display(),
            registry.len()
        );
        Ok(registry)
    }

    /// Properties of a block type; unknown ids resolve to air.
    #[inline]
    #[must_use]
    pub fn properties(&self, block: BlockType) -> &BlockProperties {
        self.blocks
            .get(block.0 as usize)
            .unwrap_or(&self.blocks[0])
    }

    /// Whether the block hides faces behind it.
    #[inline]
    #[must_use]
    pub fn is_opaque(&self, block: BlockType) -> bool {
        self.blocks
            .get(block.0 as usize)
            .is_some_and(|props| props.opaque)
    }

    /// Whether the id is known to this registry.
    #[inline]
    #[must_use]
    pub fn contains(&self, block: BlockType) -> bool {
        (block.0 as usize) < self.blocks.len()
    }

    /// Number of block types including air.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// A registry always holds at least air.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_opacity() {
        let registry = BlockRegistry::builtin();
        assert!(!registry.is_opaque(BlockType::AIR));
        assert!(registry.is_opaque(BlockType::STONE));
        assert!(!registry.is_opaque(BlockType::WATER));
        assert_eq!(registry.properties(BlockType::GRASS).name, "grass");
    }

    #[test]
    fn test_unknown_block_is_air() {
        let registry = BlockRegistry::builtin();
        let unknown = BlockType(9999);
        assert!(!registry.contains(unknown));
        assert!(!registry.is_opaque(unknown));
        assert_eq!(registry.properties(unknown).name, "air");
    }

    #[test]
    fn test_palette_from_toml() {
        let registry = BlockRegistry::from_toml_str(
            r#"
            [[blocks]]
            id = 1
            name = "glass"
            color = [0.9, 0.9, 1.0, 0.3]
            opaque = false
            texture_layer = 7

            [[blocks]]
            id = 0
            name = "air"
            color = [0.0, 0.0, 0.0, 0.0]
            opaque = false
            "#,
        )
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.properties(BlockType(1)).texture_layer, 7);
        assert!(!registry.is_opaque(BlockType(1)));
    }

    #[test]
    fn test_palette_rejects_gaps_and_opaque_air() {
        let gap = r#"
            [[blocks]]
            id = 0
            name = "air"
            color = [0.0, 0.0, 0.0, 0.0]
            opaque = false

            [[blocks]]
            id = 2
            name = "stone"
            color = [0.5, 0.5, 0.5, 1.0]
            opaque = true
        "#;
        assert!(matches!(
            BlockRegistry::from_toml_str(gap),
            Err(ConfigError::InvalidPalette(_))
        ));

        let solid_air = r#"
            [[blocks]]
            id = 0
            name = "air"
            color = [0.0, 0.0, 0.0, 0.0]
            opaque = true
        "#;
        assert!(matches!(
            BlockRegistry::from_toml_str(solid_air),
            Err(ConfigError::InvalidPalette(_))
        ));
    }
}
