//! Ashfall-WAD: the engine's virtual asset layer.
//!
//! Everything the engine draws, plays or simulates comes out of "lumps" -
//! named binary resources living in one of three container formats:
//!
//! - plain WAD files (`IWAD`/`PWAD`),
//! - ZIP packages carrying engine data,
//! - the WAD image embedded in a Doom 64 cartridge dump, whose lumps are
//!   selectively LZSS- or Huffman-compressed (see the `ashfall-n64` crate).
//!
//! A [`Registry`] aggregates the lumps of every registered container into
//! per-[`Section`] tables. Later containers shadow same-named lumps of
//! earlier ones without losing them - a [`Lump`] handle can step back
//! through the override chain. After [`Registry::merge`] every lump is also
//! addressable by a stable global index.
//!
//! ```no_run
//! use ashfall_wad::{Registry, Section};
//!
//! # fn main() -> ashfall_wad::Result<()> {
//! let mut wad = Registry::with_default_loaders();
//! wad.add_device_path("doom64.rom")?;
//! wad.add_device_path("ashfall.pk3")?;
//! wad.merge();
//!
//! if let Some(mut lump) = wad.open(Section::Graphics, "TITLE") {
//!     let bytes = lump.bytes()?;
//!     println!("TITLE is {} bytes", bytes.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Containers register at startup and the tables are immutable afterwards;
//! lookups are pure and safe to run concurrently between registrations.

mod device;
mod doom;
mod error;
mod image;
mod lump;
mod palette_cache;
mod registry;
mod rom;
mod section;
mod zip;

pub use device::{Device, DeviceLoader, PROBE_LEN};
pub use doom::DoomLoader;
pub use error::{Error, Result};
pub use image::{Image, Palette, Rgba5551};
pub use lump::{Lump, LumpData};
pub use palette_cache::PaletteCache;
pub use registry::Registry;
pub use rom::{RomLoader, SoundBank};
pub use section::Section;
pub use zip::ZipLoader;
