//! Name-keyed palette cache over the registry.
//!
//! Lump decodes are allocate-and-return with no implicit caching, but the
//! renderer asks for the same few palettes constantly. This cache decodes a
//! named palette lump once and hands out the shared decode afterwards.
//! Insert-if-absent only, so it follows the same single-writer/many-reader
//! discipline as the section tables.

use std::sync::{Arc, Mutex};

use hashbrown::HashMap;
use log::warn;

use crate::image::Palette;
use crate::registry::Registry;

pub struct PaletteCache {
    palettes: Mutex<HashMap<String, Arc<Palette>>>,
}

impl PaletteCache {
    pub fn new() -> PaletteCache {
        PaletteCache { palettes: Mutex::new(HashMap::new()) }
    }

    /// The palette decoded from the normal-section lump `name`, cached by
    /// name. A missing or palette-less lump yields the greyscale fallback
    /// (and caches it, so the warning fires once).
    pub fn get(&self, registry: &Registry, name: &str) -> Arc<Palette> {
        let key = name.to_ascii_uppercase();

        if let Some(palette) = self.palettes.lock().expect("palette cache poisoned").get(&key) {
            return Arc::clone(palette);
        }

        let decoded = registry
            .open_name(&key)
            .and_then(|lump| lump.read_palette().ok().flatten());

        let palette = decoded.unwrap_or_else(|| {
            warn!("no palette lump '{}', using greyscale", key);
            Arc::new(Palette::grey256())
        });

        self.palettes
            .lock()
            .expect("palette cache poisoned")
            .entry(key)
            .or_insert(palette)
            .clone()
    }
}

impl Default for PaletteCache {
    fn default() -> Self {
        Self::new()
    }
}
