//! Plain WAD container (the classic id format).
//!
//! # Layout
//! ```text
//! 0x00: magic "IWAD" or "PWAD"
//! 0x04: lump count (u32 LE)
//! 0x08: directory offset (u32 LE)
//! ...
//! directory: 16-byte entries
//!   0x00: file offset (u32 LE)
//!   0x04: size (u32 LE)
//!   0x08: name (8 bytes, NUL padded)
//! ```
//!
//! Zero-size entries with marker names bracket the texture, graphics, sprite
//! and sound sections; everything outside a bracket is a normal lump.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex};

use log::warn;

use crate::device::{Device, DeviceLoader};
use crate::error::{Error, Result};
use crate::lump::LumpData;
use crate::section::Section;

pub(crate) const HEADER_SIZE: usize = 12;
pub(crate) const DIR_ENTRY_SIZE: usize = 16;

/// Trim an 8-byte directory name at the first NUL.
pub(crate) fn dir_name(raw: &[u8; 8]) -> String {
    let len = raw.iter().position(|&b| b == 0).unwrap_or(8);
    String::from_utf8_lossy(&raw[..len]).into_owned()
}

/// Loader probe for plain WAD files.
pub struct DoomLoader;

impl DeviceLoader for DoomLoader {
    fn name(&self) -> &'static str {
        "wad"
    }

    fn probe(&self, prefix: &[u8]) -> bool {
        prefix.starts_with(b"IWAD") || prefix.starts_with(b"PWAD")
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Device>> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        Ok(Box::new(DoomDevice {
            source: Arc::new(WadSource { path: path.display().to_string(), file: Mutex::new(file) }),
            file_len,
            enumerated: false,
        }))
    }
}

/// Shared read access to the WAD file for the device and its lumps.
struct WadSource {
    path: String,
    file: Mutex<File>,
}

impl WadSource {
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut file = self.file.lock().expect("wad source poisoned");
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

struct DoomDevice {
    source: Arc<WadSource>,
    file_len: u64,
    enumerated: bool,
}

impl Device for DoomDevice {
    fn name(&self) -> &str {
        &self.source.path
    }

    fn enumerate(&mut self) -> Result<Vec<Arc<dyn LumpData>>> {
        if self.enumerated {
            return Err(Error::State("device already enumerated"));
        }
        self.enumerated = true;

        let header = self.source.read_at(0, HEADER_SIZE)?;
        if &header[0..4] != b"IWAD" && &header[0..4] != b"PWAD" {
            return Err(Error::Format("WAD signature missing".into()));
        }

        let numlumps = u32::from_le_bytes(header[4..8].try_into().expect("sized")) as u64;
        let dir_offset = u32::from_le_bytes(header[8..12].try_into().expect("sized")) as u64;

        let dir_size = numlumps * DIR_ENTRY_SIZE as u64;
        if dir_offset + dir_size > self.file_len {
            return Err(Error::Corrupt(format!(
                "directory at {:#x}+{:#x} past end of file ({:#x})",
                dir_offset, dir_size, self.file_len
            )));
        }

        let dir = self.source.read_at(dir_offset, dir_size as usize)?;

        let mut lumps: Vec<Arc<dyn LumpData>> = Vec::new();
        let mut section = Section::Normal;

        for entry in dir.chunks_exact(DIR_ENTRY_SIZE) {
            let filepos = u32::from_le_bytes(entry[0..4].try_into().expect("sized")) as u64;
            let size = u32::from_le_bytes(entry[4..8].try_into().expect("sized")) as u64;
            let name = dir_name(entry[8..16].try_into().expect("sized"));

            if size == 0 {
                match name.as_str() {
                    "T_START" => section = Section::Textures,
                    "G_START" => section = Section::Graphics,
                    "S_START" => section = Section::Sprites,
                    "DS_START" => section = Section::Sounds,
                    "T_END" | "G_END" | "S_END" | "DS_END" => section = Section::Normal,
                    "ENDOFWAD" => break,
                    _ => warn!("unknown WAD directory '{}'", name),
                }
                continue;
            }

            if filepos + size > self.file_len {
                return Err(Error::Corrupt(format!(
                    "lump '{}' at {:#x}+{:#x} past end of file ({:#x})",
                    name, filepos, size, self.file_len
                )));
            }

            lumps.push(Arc::new(DoomLump {
                source: Arc::clone(&self.source),
                name,
                section,
                filepos,
                size: size as usize,
            }));
        }

        Ok(lumps)
    }
}

struct DoomLump {
    source: Arc<WadSource>,
    name: String,
    section: Section,
    filepos: u64,
    size: usize,
}

impl LumpData for DoomLump {
    fn name(&self) -> &str {
        &self.name
    }

    fn section(&self) -> Section {
        self.section
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        self.source.read_at(self.filepos, self.size)
    }
}
