//! N64 ROM container: the WAD image embedded in a Doom 64 cartridge dump.
//!
//! The cartridge header identifies the build and the dump's byte order; a
//! fixed table keyed by (country, version) locates the embedded WAD, which
//! is then parsed like a plain WAD with two twists: the sign bit of each
//! directory name's first byte is a per-lump "is compressed" flag, and a
//! handful of named lumps are format-specialized into graphics, sprite and
//! sound kinds regardless of their position in the directory.
//!
//! Compressed lumps in the textures section and `MAP*` lumps use the
//! adaptive-Huffman codec; everything else compressed uses LZSS.

mod lumps;
mod names;


use std::path::Path;
use std::sync::{Arc, Mutex};

use hashbrown::HashMap;
use log::{debug, warn};

use ashfall_n64::{decode_huff, decode_lzss};

use crate::device::{Device, DeviceLoader};
use crate::doom::{dir_name, DIR_ENTRY_SIZE};
use crate::error::{Error, Result};
use crate::image::Palette;
use crate::lump::LumpData;
use crate::section::Section;

use lumps::{
    GfxLump, GfxQuirk, NormalLump, PaletteRef, SoundLump, SpriteHeader, SpriteLump, TextureLump,
};

/// Cartridge header size; the image name sits at 0x20, the country and
/// version codes at 0x3e/0x3f.
const ROM_HEADER_SIZE: usize = 64;
const ROM_NAME_OFFSET: usize = 0x20;
const ROM_COUNTRY_OFFSET: usize = 0x3e;
const ROM_VERSION_OFFSET: usize = 0x3f;

/// Image name, padded to 20 characters - and its byte-swapped twin, which is
/// how a wrong-endian dump identifies itself.
const ROM_NAME: &[u8; 20] = b"Doom64              ";
const ROM_NAME_SWAPPED: &[u8; 20] = b"oDmo46              ";

/// Known retail builds: (country, version) to the embedded WAD's location.
const ROM_LOCATIONS: [(u8, u8, usize, usize); 4] = [
    (b'P', 0, 0x63f60, 0x5d6cdc),
    (b'J', 0, 0x64580, 0x5d8478),
    (b'E', 0, 0x63d10, 0x5d18b0),
    (b'E', 1, 0x63dc0, 0x5d301c),
];

/// Provider of pre-synthesized audio for the fixed sound/music lump table.
///
/// Sequence synthesis lives outside the wad layer; whatever implements it
/// hands the finished bytes back through this seam. Sound lumps from a
/// device opened without a bank decode to empty buffers.
pub trait SoundBank: Send + Sync {
    /// Audio bytes for track `index` of [`names::SND_NAMES`]'s order.
    fn track(&self, index: usize) -> Option<Vec<u8>>;
}

/// Loader probe for Doom 64 cartridge dumps.
pub struct RomLoader {
    sound_bank: Option<Arc<dyn SoundBank>>,
}

impl RomLoader {
    pub fn new() -> RomLoader {
        RomLoader { sound_bank: None }
    }

    /// Attach a sound bank; sound lumps of devices opened by this loader
    /// will redirect to it.
    pub fn with_sound_bank(bank: Arc<dyn SoundBank>) -> RomLoader {
        RomLoader { sound_bank: Some(bank) }
    }
}

impl Default for RomLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceLoader for RomLoader {
    fn name(&self) -> &'static str {
        "rom"
    }

    fn probe(&self, prefix: &[u8]) -> bool {
        prefix
            .get(ROM_NAME_OFFSET..ROM_NAME_OFFSET + 20)
            .is_some_and(|name| {
                name.eq_ignore_ascii_case(ROM_NAME) || name.eq_ignore_ascii_case(ROM_NAME_SWAPPED)
            })
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Device>> {
        let data = std::fs::read(path)?;
        if data.len() < ROM_HEADER_SIZE {
            return Err(Error::Format("file too short for a ROM header".into()));
        }

        let name = &data[ROM_NAME_OFFSET..ROM_NAME_OFFSET + 20];
        let swapped = if name.eq_ignore_ascii_case(ROM_NAME) {
            false
        } else if name.eq_ignore_ascii_case(ROM_NAME_SWAPPED) {
            true
        } else {
            return Err(Error::Format("unrecognized ROM image name".into()));
        };

        // a swapped dump swaps the two code bytes along with everything else
        let (country, version) = if swapped {
            (data[ROM_VERSION_OFFSET], data[ROM_COUNTRY_OFFSET])
        } else {
            (data[ROM_COUNTRY_OFFSET], data[ROM_VERSION_OFFSET])
        };

        let (wad_offset, wad_size) = ROM_LOCATIONS
            .iter()
            .find(|&&(c, v, _, _)| c == country && v == version)
            .map(|&(_, _, offset, size)| (offset, size))
            .ok_or_else(|| {
                Error::Format(format!(
                    "no embedded WAD known for ROM build (country {}, version {})",
                    country as char, version
                ))
            })?;

        if wad_offset + wad_size > data.len() {
            return Err(Error::Corrupt(format!(
                "embedded WAD at {:#x}+{:#x} past end of ROM ({:#x})",
                wad_offset, wad_size, data.len()
            )));
        }

        let mut wad = data[wad_offset..wad_offset + wad_size].to_vec();
        if swapped {
            for pair in wad.chunks_exact_mut(2) {
                pair.swap(0, 1);
            }
        }

        if &wad[0..4] != b"IWAD" {
            return Err(Error::Format("embedded WAD signature missing".into()));
        }

        debug!(
            "ROM '{}': country {}, version {}, byte-swapped: {}",
            path.display(),
            country as char,
            version,
            swapped
        );

        Ok(Box::new(RomDevice {
            source: Arc::new(RomSource {
                path: path.display().to_string(),
                wad,
                sprite_entries: Mutex::new(HashMap::new()),
                palettes: Mutex::new(HashMap::new()),
            }),
            sound_bank: self.sound_bank.clone(),
            enumerated: false,
        }))
    }
}

/// Which decoder a compressed entry runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Codec {
    None,
    Lzss,
    Huffman,
}

/// Location and decoding of one directory entry inside the embedded WAD.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RomEntry {
    pub(crate) pos: usize,
    pub(crate) size: usize,
    pub(crate) codec: Codec,
}

/// The extracted WAD bytes plus the device-wide palette table shared by its
/// sprite lumps.
pub(crate) struct RomSource {
    path: String,
    wad: Vec<u8>,
    /// Sprite-format entries by name, for shared-palette resolution.
    sprite_entries: Mutex<HashMap<String, RomEntry>>,
    /// Decoded palettes by source lump name, insert-if-absent.
    palettes: Mutex<HashMap<String, Arc<Palette>>>,
}

impl RomSource {
    /// Materialize one entry's bytes, running the codec its flag selects.
    pub(crate) fn load(&self, entry: RomEntry) -> Result<Vec<u8>> {
        let raw = &self.wad[entry.pos..entry.pos + entry.size];
        match entry.codec {
            Codec::None => Ok(raw.to_vec()),
            Codec::Lzss => Ok(decode_lzss(raw)?),
            Codec::Huffman => Ok(decode_huff(raw)?),
        }
    }

    /// The 256-entry palette stored after `name`'s sprite bitmap, decoded at
    /// most once per device. Missing or undecodable sources fall back to
    /// greyscale, like the engine-wide palette cache.
    pub(crate) fn sprite_palette(&self, name: &str) -> Arc<Palette> {
        if let Some(palette) = self.palettes.lock().expect("palette table poisoned").get(name) {
            return Arc::clone(palette);
        }

        let palette = match self.decode_sprite_palette(name) {
            Ok(palette) => Arc::new(palette),
            Err(err) => {
                warn!("no usable palette in '{}': {}", name, err);
                Arc::new(Palette::grey256())
            }
        };

        self.palettes
            .lock()
            .expect("palette table poisoned")
            .entry(name.to_owned())
            .or_insert(palette)
            .clone()
    }

    fn decode_sprite_palette(&self, name: &str) -> Result<Palette> {
        let entry = self
            .sprite_entries
            .lock()
            .expect("palette table poisoned")
            .get(name)
            .copied()
            .ok_or_else(|| Error::Format(format!("no sprite lump named '{}'", name)))?;

        let bytes = self.load(entry)?;
        let header = SpriteHeader::parse(&bytes)?;
        if header.compressed >= 0 {
            return Err(Error::Format(format!(
                "'{}' is 4bpp and carries no shared palette",
                name
            )));
        }

        let bitmap = crate::image::pad(usize::from(header.width.unsigned_abs()), 8)
            * usize::from(header.height.unsigned_abs());
        Palette::read(
            bytes
                .get(SpriteHeader::SIZE + bitmap..)
                .ok_or_else(|| Error::Corrupt(format!("'{}' ends before its palette", name)))?,
            256,
        )
    }
}

struct RomDevice {
    source: Arc<RomSource>,
    sound_bank: Option<Arc<dyn SoundBank>>,
    enumerated: bool,
}

/// Decoding format a directory bracket or name table selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LumpFormat {
    None,
    Gfx,
    Sprite,
    Texture,
}

impl Device for RomDevice {
    fn name(&self) -> &str {
        &self.source.path
    }

    fn enumerate(&mut self) -> Result<Vec<Arc<dyn LumpData>>> {
        if self.enumerated {
            return Err(Error::State("device already enumerated"));
        }
        self.enumerated = true;

        let wad = &self.source.wad;
        let numlumps = u32::from_le_bytes(wad[4..8].try_into().expect("sized")) as usize;
        let dir_offset = u32::from_le_bytes(wad[8..12].try_into().expect("sized")) as usize;

        if dir_offset + numlumps * DIR_ENTRY_SIZE > wad.len() {
            return Err(Error::Corrupt("ROM WAD directory past end of image".into()));
        }

        let mut lumps: Vec<Arc<dyn LumpData>> = Vec::new();
        let mut section = Section::Normal;
        let mut format = LumpFormat::None;
        let mut past_recto0 = false;
        // first weapon sprite of each name prefix holds the shared palette
        let mut weapon_first: HashMap<String, String> = HashMap::new();

        for i in 0..numlumps {
            let at = dir_offset + i * DIR_ENTRY_SIZE;
            let entry = &wad[at..at + DIR_ENTRY_SIZE];

            let filepos = u32::from_le_bytes(entry[0..4].try_into().expect("sized")) as usize;
            let size = u32::from_le_bytes(entry[4..8].try_into().expect("sized")) as usize;

            let mut raw_name: [u8; 8] = entry[8..16].try_into().expect("sized");
            // the name's first byte carries the compression flag in its sign bit
            let compressed = raw_name[0] & 0x80 != 0;
            raw_name[0] &= 0x7f;
            let name = dir_name(&raw_name);

            // demo playback data is not usable as lumps
            if name.starts_with("DEMO") {
                debug!("ignore '{}'", name);
                continue;
            }

            // graphics assignments from the name tables last a single entry
            if section == Section::Graphics {
                section = Section::Normal;
                format = LumpFormat::None;
            }

            let mut gfx_found = false;
            if names::GFX_NAMES.contains(&name.as_str()) {
                section = Section::Graphics;
                format = LumpFormat::Gfx;
                gfx_found = true;
            } else if names::GFX_SPRITES.contains(&name.as_str()) {
                section = Section::Graphics;
                format = LumpFormat::Sprite;
                gfx_found = true;
            }

            if !gfx_found && size == 0 {
                match name.as_str() {
                    "T_START" => {
                        section = Section::Textures;
                        format = LumpFormat::Texture;
                    }
                    "S_START" => {
                        section = Section::Sprites;
                        format = LumpFormat::Sprite;
                    }
                    "T_END" | "S_END" => {
                        section = Section::Normal;
                        format = LumpFormat::None;
                    }
                    "ENDOFWAD" => break,
                    _ => warn!("unknown ROM WAD directory '{}'", name),
                }
                continue;
            }

            if filepos + size > wad.len() {
                return Err(Error::Corrupt(format!(
                    "lump '{}' at {:#x}+{:#x} past end of embedded WAD",
                    name, filepos, size
                )));
            }

            let bracket_section = section;

            // palettes live with the sprites but are plain named lumps
            let mut lump_section = section;
            if name.starts_with("PAL") {
                lump_section = Section::Normal;
            }

            let is_weapon = lump_section == Section::Sprites && past_recto0;
            // every sprite after RECTO0 is a weapon sprite
            if lump_section == Section::Sprites && name == "RECTO0" {
                past_recto0 = true;
            }

            let codec = if !compressed {
                Codec::None
            } else if bracket_section == Section::Textures || name.starts_with("MAP") {
                Codec::Huffman
            } else {
                Codec::Lzss
            };
            let rom_entry = RomEntry { pos: filepos, size, codec };

            let lump: Arc<dyn LumpData> = match format {
                LumpFormat::Texture => Arc::new(TextureLump {
                    source: Arc::clone(&self.source),
                    name,
                    section: lump_section,
                    entry: rom_entry,
                }),
                LumpFormat::Gfx => {
                    let quirk = match name.as_str() {
                        "CLOUD" => GfxQuirk::Cloud,
                        "FIRE" => GfxQuirk::Fire,
                        _ => GfxQuirk::None,
                    };
                    Arc::new(GfxLump {
                        source: Arc::clone(&self.source),
                        name,
                        section: lump_section,
                        entry: rom_entry,
                        quirk,
                    })
                }
                LumpFormat::Sprite => {
                    self.source
                        .sprite_entries
                        .lock()
                        .expect("palette table poisoned")
                        .insert(name.clone(), rom_entry);

                    let prefix: String = name.chars().take(4).collect();
                    let palette = if is_weapon {
                        match weapon_first.get(&prefix) {
                            Some(first) => PaletteRef::Sprite(first.clone()),
                            None => {
                                weapon_first.insert(prefix, name.clone());
                                PaletteRef::SelfTail
                            }
                        }
                    } else if bracket_section == Section::Graphics {
                        PaletteRef::SelfTail
                    } else {
                        PaletteRef::External(format!("PAL{}0", prefix))
                    };

                    Arc::new(SpriteLump {
                        source: Arc::clone(&self.source),
                        name,
                        section: lump_section,
                        entry: rom_entry,
                        is_weapon,
                        palette,
                    })
                }
                LumpFormat::None => Arc::new(NormalLump {
                    source: Arc::clone(&self.source),
                    name,
                    section: lump_section,
                    entry: rom_entry,
                }),
            };

            lumps.push(lump);
            section = bracket_section;
        }

        for (track, name) in names::SND_NAMES.iter().enumerate() {
            lumps.push(Arc::new(SoundLump {
                name: (*name).to_owned(),
                track,
                bank: self.sound_bank.clone(),
            }));
        }

        Ok(lumps)
    }
}
