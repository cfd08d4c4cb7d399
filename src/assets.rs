use std::{collections::HashMap, path::Path};

use image::{DynamicImage, imageops::FilterType};

use crate::{error::BridgeError, mappings::SCENE_SLOTS};

/// Every image the bridge paints, each in an on and an off variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    Live,
    Scene1,
    Scene2,
    Scene3,
    Mic,
}

impl Asset {
    pub const ALL: [Asset; 5] = [
        Asset::Live,
        Asset::Scene1,
        Asset::Scene2,
        Asset::Scene3,
        Asset::Mic,
    ];

    /// Images of the scene slots, slot 1 first
    pub const SCENES: [Asset; SCENE_SLOTS as usize] = [Asset::Scene1, Asset::Scene2, Asset::Scene3];

    pub fn name(self) -> &'static str {
        match self {
            Asset::Live => "live",
            Asset::Scene1 => "scene1",
            Asset::Scene2 => "scene2",
            Asset::Scene3 => "scene3",
            Asset::Mic => "mic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Asset::ALL.into_iter().find(|asset| asset.name() == name)
    }

}

/// Decoded key images. Filled once at startup, read-only afterwards.
#[derive(Debug, Default)]
pub struct AssetCache {
    images: HashMap<(Asset, bool), DynamicImage>,
}

impl AssetCache {
    /// Loads `<name>_<true|false>.png` files from `dir`, resized to `size`x`size`
    pub fn load(dir: &Path, size: u32) -> Result<Self, BridgeError> {
        log::info!("Loading assets from {}", dir.display());

        let load_error = |path: &Path, reason: String| BridgeError::AssetLoad {
            path: path.to_path_buf(),
            reason,
        };

        let entries = std::fs::read_dir(dir).map_err(|e| load_error(dir, e.to_string()))?;

        let mut cache = AssetCache::default();

        for entry in entries {
            let path = entry.map_err(|e| load_error(dir, e.to_string()))?.path();

            if path.extension().and_then(|ext| ext.to_str()) != Some("png") {
                continue;
            }

            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let Some((name, state)) = stem.split_once('_') else {
                log::debug!("Skipping {}, no state suffix", path.display());
                continue;
            };

            let Some(asset) = Asset::from_name(name) else {
                log::debug!("Skipping {}, unknown asset name", path.display());
                continue;
            };

            let state: bool = state
                .parse()
                .map_err(|_| load_error(&path, format!("invalid state suffix {:?}", state)))?;

            let image = image::open(&path).map_err(|e| load_error(&path, e.to_string()))?;

            cache.insert(asset, state, image.resize_exact(size, size, FilterType::Lanczos3));

            log::debug!("Asset {}/{} loaded", name, state);
        }

        cache.validate()?;

        log::info!("Loaded {} assets", cache.images.len());

        Ok(cache)
    }

    pub fn insert(&mut self, asset: Asset, state: bool, image: DynamicImage) {
        self.images.insert((asset, state), image);
    }

    /// Makes sure every asset is present in both states
    pub fn validate(&self) -> Result<(), BridgeError> {
        for asset in Asset::ALL {
            for state in [true, false] {
                self.lookup(asset, state)?;
            }
        }

        Ok(())
    }

    pub fn lookup(&self, asset: Asset, state: bool) -> Result<&DynamicImage, BridgeError> {
        self.images
            .get(&(asset, state))
            .ok_or(BridgeError::AssetMissing {
                name: asset.name(),
                state,
            })
    }
}
