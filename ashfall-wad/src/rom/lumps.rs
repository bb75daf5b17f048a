//! Lump kinds backed by the ROM's embedded WAD.
//!
//! All pixel data is stored big-endian and tile-interleaved the way the
//! console's RDP wanted it: 4-bit textures and sprites pack two pixels per
//! byte, rows are padded to 8 or 16 bytes, and alternating tile rows have
//! the halves of each aligned group swapped ("unshuffle" below undoes it).

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::image::{check_dimensions, pad, Image, Palette};
use crate::lump::LumpData;
use crate::section::Section;

use super::{RomEntry, RomSource, SoundBank};

fn be_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_be_bytes(buf[at..at + 2].try_into().expect("sized"))
}

fn be_i16(buf: &[u8], at: usize) -> i16 {
    i16::from_be_bytes(buf[at..at + 2].try_into().expect("sized"))
}

/// Swap the halves of each `align`-byte group of one row.
fn unshuffle_row(row: &mut [u8], align: usize) {
    let half = align / 2;
    let mut x = 0;
    while x + align <= row.len() {
        for i in 0..half {
            row.swap(x + i, x + half + i);
        }
        x += align;
    }
}

// =============================================================================
// Plain lumps
// =============================================================================

/// A lump with no special interpretation: maps, text, tables.
pub(crate) struct NormalLump {
    pub(crate) source: Arc<RomSource>,
    pub(crate) name: String,
    pub(crate) section: Section,
    pub(crate) entry: RomEntry,
}

impl LumpData for NormalLump {
    fn name(&self) -> &str {
        &self.name
    }

    fn section(&self) -> Section {
        self.section
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        self.source.load(self.entry)
    }
}

// =============================================================================
// Texture lumps
// =============================================================================

/// Wall/floor texture: 8-byte header with shift-encoded dimensions, 4bpp
/// pixels, then `numpal * 16` palette entries.
///
/// ```text
/// 0x00: id (u16 BE)
/// 0x02: palette count (u16 BE)
/// 0x04: width shift (u16 BE, width = 1 << shift)
/// 0x06: height shift (u16 BE)
/// ```
pub(crate) struct TextureLump {
    pub(crate) source: Arc<RomSource>,
    pub(crate) name: String,
    pub(crate) section: Section,
    pub(crate) entry: RomEntry,
}

impl LumpData for TextureLump {
    fn name(&self) -> &str {
        &self.name
    }

    fn section(&self) -> Section {
        self.section
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        self.source.load(self.entry)
    }

    fn read_image(&self) -> Result<Option<Image>> {
        let bytes = self.source.load(self.entry)?;
        if bytes.len() < 8 {
            return Err(Error::Corrupt(format!("texture '{}' shorter than its header", self.name)));
        }

        let numpal = usize::from(be_u16(&bytes, 2));
        let wshift = be_u16(&bytes, 4);
        let hshift = be_u16(&bytes, 6);

        if wshift > 8 || hshift > 8 {
            return Err(Error::Format(format!(
                "texture '{}' dimension shifts {}/{} out of range",
                self.name, wshift, hshift
            )));
        }
        let (width, height) = check_dimensions(1 << wshift, 1 << hshift)?;

        let mut image = Image::new(width, height, 8);

        // two pixels per byte, padding included
        let packed = image.data().len() / 2;
        let pixels = bytes
            .get(8..8 + packed)
            .ok_or_else(|| Error::Corrupt(format!("texture '{}' pixel data truncated", self.name)))?
            .to_vec();
        for (i, byte) in pixels.iter().enumerate() {
            image.data_mut()[2 * i] = byte >> 4;
            image.data_mut()[2 * i + 1] = byte & 0x0f;
        }

        // undo the RDP tile interleave on every other 8-pixel row
        let mask = usize::from(width) / 8;
        let data = image.data_mut();
        let mut i = 0;
        while i + 16 <= data.len() {
            if (i / 8) & mask != 0 {
                unshuffle_row(&mut data[i..i + 16], 16);
            }
            i += 16;
        }

        let palette = Palette::read(&bytes[8 + packed..], numpal * 16)?;
        image.set_palette(Arc::new(palette));

        Ok(Some(image))
    }
}

// =============================================================================
// Graphics lumps
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GfxQuirk {
    None,
    /// The CLOUD lump's header is garbage; it is an ordinary 64x64 8bpp
    /// graphic otherwise.
    Cloud,
    /// The FIRE lump has no palette after its pixels.
    Fire,
}

/// Full-screen graphic: 8-byte header, 8bpp pixels, 256-entry palette after
/// the pixel block padded to 8 bytes.
///
/// ```text
/// 0x00: compressed marker (u16 BE, always 0xffff in retail data)
/// 0x02: unused
/// 0x04: width (u16 BE)
/// 0x06: height (u16 BE)
/// ```
pub(crate) struct GfxLump {
    pub(crate) source: Arc<RomSource>,
    pub(crate) name: String,
    pub(crate) section: Section,
    pub(crate) entry: RomEntry,
    pub(crate) quirk: GfxQuirk,
}

impl LumpData for GfxLump {
    fn name(&self) -> &str {
        &self.name
    }

    fn section(&self) -> Section {
        self.section
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        self.source.load(self.entry)
    }

    fn read_image(&self) -> Result<Option<Image>> {
        let bytes = self.source.load(self.entry)?;
        if bytes.len() < 8 {
            return Err(Error::Corrupt(format!("graphic '{}' shorter than its header", self.name)));
        }

        let (width, height) = match self.quirk {
            GfxQuirk::Cloud => (64, 64),
            _ => (
                i32::from(be_u16(&bytes, 4)),
                i32::from(be_u16(&bytes, 6)),
            ),
        };
        let (width, height) = check_dimensions(width, height)?;

        let mut image = Image::new(width, height, 4);
        let w = usize::from(width);
        let h = usize::from(height);

        if bytes.len() < 8 + w * h {
            return Err(Error::Corrupt(format!("graphic '{}' pixel data truncated", self.name)));
        }
        for y in 0..h {
            image.row_mut(y)[..w].copy_from_slice(&bytes[8 + y * w..8 + (y + 1) * w]);
        }

        if self.quirk == GfxQuirk::Cloud {
            // cloud rows are tile-interleaved like sprites
            let data = image.data_mut();
            let mut i = 0;
            while i + 16 <= 64 * 64 {
                if i & 64 != 0 {
                    unshuffle_row(&mut data[i..i + 8], 8);
                }
                i += 8;
            }
        }

        if self.quirk != GfxQuirk::Fire {
            // the palette sits after the pixel block, padded to 8 bytes
            let palofs = 8 + pad(w * h, 8);
            let palette = Palette::read(
                bytes.get(palofs..).ok_or_else(|| {
                    Error::Corrupt(format!("graphic '{}' ends before its palette", self.name))
                })?,
                256,
            )?;
            image.set_palette(Arc::new(palette));
        }

        Ok(Some(image))
    }
}

// =============================================================================
// Sprite lumps
// =============================================================================

/// Where an 8bpp sprite's palette comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PaletteRef {
    /// Stored after this sprite's own bitmap.
    SelfTail,
    /// Stored after another sprite's bitmap (first weapon sprite of the
    /// name prefix).
    Sprite(String),
    /// Stored in a separate `PAL<prefix>0` lump.
    External(String),
}

/// 16-byte sprite header, all fields big-endian i16.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SpriteHeader {
    pub(crate) tiles: i16,
    /// `>= 0`: 4bpp two-pixels-per-byte; `-1`: 8bpp.
    pub(crate) compressed: i16,
    pub(crate) cmpsize: i16,
    pub(crate) xoffs: i16,
    pub(crate) yoffs: i16,
    pub(crate) width: i16,
    pub(crate) height: i16,
    /// Rows per tile piece; the unshuffle runs per tile.
    pub(crate) tileheight: i16,
}

impl SpriteHeader {
    pub(crate) const SIZE: usize = 16;

    pub(crate) fn parse(bytes: &[u8]) -> Result<SpriteHeader> {
        if bytes.len() < Self::SIZE {
            return Err(Error::Corrupt("sprite lump shorter than its header".into()));
        }

        Ok(SpriteHeader {
            tiles: be_i16(bytes, 0),
            compressed: be_i16(bytes, 2),
            cmpsize: be_i16(bytes, 4),
            xoffs: be_i16(bytes, 6),
            yoffs: be_i16(bytes, 8),
            width: be_i16(bytes, 10),
            height: be_i16(bytes, 12),
            tileheight: be_i16(bytes, 14),
        })
    }
}

/// Sprite: 16-byte header, 4bpp or 8bpp pixels, palette inline, at the tail,
/// or shared with another lump.
pub(crate) struct SpriteLump {
    pub(crate) source: Arc<RomSource>,
    pub(crate) name: String,
    pub(crate) section: Section,
    pub(crate) entry: RomEntry,
    pub(crate) is_weapon: bool,
    pub(crate) palette: PaletteRef,
}

impl LumpData for SpriteLump {
    fn name(&self) -> &str {
        &self.name
    }

    fn section(&self) -> Section {
        self.section
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        self.source.load(self.entry)
    }

    fn read_image(&self) -> Result<Option<Image>> {
        let bytes = self.source.load(self.entry)?;
        let header = SpriteHeader::parse(&bytes)?;

        let (width, height) =
            check_dimensions(i32::from(header.width), i32::from(header.height))?;

        let align: usize = if header.compressed == -1 { 8 } else { 16 };
        let mut image = Image::new(width, height, align);
        let pitch = image.pitch();
        let h = usize::from(height);

        let palette: Arc<Palette>;

        if header.compressed >= 0 {
            // 4bpp: two pixels per byte, rows padded to 16
            let packed = pitch / 2 * h;
            let pixels = bytes.get(Self::SIZE..Self::SIZE + packed).ok_or_else(|| {
                Error::Corrupt(format!("sprite '{}' pixel data truncated", self.name))
            })?;
            for (i, byte) in pixels.iter().enumerate() {
                image.data_mut()[2 * i] = byte >> 4;
                image.data_mut()[2 * i + 1] = byte & 0x0f;
            }

            palette = Arc::new(Palette::read(&bytes[Self::SIZE + packed..], 16)?);
        } else {
            let need = pitch * h;
            if bytes.len() < Self::SIZE + need {
                return Err(Error::Corrupt(format!(
                    "sprite '{}' pixel data truncated",
                    self.name
                )));
            }
            image
                .data_mut()
                .copy_from_slice(&bytes[Self::SIZE..Self::SIZE + need]);

            palette = match &self.palette {
                PaletteRef::SelfTail => self.source.sprite_palette(&self.name),
                PaletteRef::Sprite(first) => self.source.sprite_palette(first),
                PaletteRef::External(pal) => self.source.sprite_palette(pal),
            };
        }

        // undo the tile interleave: within each tile, every other row has
        // the halves of its aligned groups swapped
        let tileheight = header.tileheight;
        let mut id: i16 = 0;
        let mut inv = false;
        for y in 0..h {
            if id == tileheight {
                id = 0;
                inv = false;
            }
            if inv {
                unshuffle_row(image.row_mut(y), align);
            }
            inv = !inv;
            id += 1;
        }

        let (mut xoffs, mut yoffs) = (header.xoffs, header.yoffs);
        if self.is_weapon {
            // weapon sprites are drawn relative to the status bar origin
            xoffs -= 160;
            yoffs -= 208;
        }
        image.set_sprite_offset((xoffs, yoffs));

        image.set_palette(palette);

        Ok(Some(image))
    }

    fn read_palette(&self) -> Result<Option<Arc<Palette>>> {
        let bytes = self.source.load(self.entry)?;
        let header = SpriteHeader::parse(&bytes)?;

        if header.compressed >= 0 {
            // inline 16-entry palette after the 4bpp pixels
            let (width, height) =
                check_dimensions(i32::from(header.width), i32::from(header.height))?;
            let packed = pad(usize::from(width), 16) / 2 * usize::from(height);
            let palette = Palette::read(
                bytes.get(Self::SIZE + packed..).ok_or_else(|| {
                    Error::Corrupt(format!("sprite '{}' ends before its palette", self.name))
                })?,
                16,
            )?;
            return Ok(Some(Arc::new(palette)));
        }

        Ok(Some(self.source.sprite_palette(&self.name)))
    }
}

impl SpriteLump {
    const SIZE: usize = SpriteHeader::SIZE;
}

// =============================================================================
// Sound lumps
// =============================================================================

/// Sound/music lump redirecting to pre-synthesized audio. The ROM stores
/// sequencer data, not samples; whatever synthesizes it hands the result
/// back through the [`SoundBank`].
pub(crate) struct SoundLump {
    pub(crate) name: String,
    pub(crate) track: usize,
    pub(crate) bank: Option<Arc<dyn SoundBank>>,
}

impl LumpData for SoundLump {
    fn name(&self) -> &str {
        &self.name
    }

    fn section(&self) -> Section {
        Section::Sounds
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(self
            .bank
            .as_ref()
            .and_then(|bank| bank.track(self.track))
            .unwrap_or_default())
    }
}
