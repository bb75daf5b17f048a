//! ZIP package container (engine data in `.pk3` style archives).
//!
//! Only what the asset layer needs: a backward scan for the end-of-central-
//! directory record, a walk of the central directory, and the "stored" and
//! "deflate" methods. Entries are routed into sections by their first path
//! segment (`Graphics/`, `Textures/`, `Sounds/`, `Sprites/`, anything else
//! is normal) and their names are uppercased and truncated to 8 characters
//! on ingest.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex};

use flate2::read::DeflateDecoder;
use log::warn;

use crate::device::{Device, DeviceLoader};
use crate::error::{Error, Result};
use crate::lump::LumpData;
use crate::section::Section;

const LOCAL_FILE_SIG: &[u8; 4] = b"PK\x03\x04";
const CENTRAL_DIR_SIG: &[u8; 4] = b"PK\x01\x02";
const END_OF_DIR_SIG: &[u8; 4] = b"PK\x05\x06";

/// Fixed part of the end-of-central-directory record, signature included.
const END_OF_DIR_SIZE: usize = 22;
/// Fixed part of a central directory entry, signature included.
const CENTRAL_ENTRY_SIZE: usize = 46;
/// Fixed part of a local file header, signature included.
const LOCAL_HEADER_SIZE: usize = 30;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes(buf[at..at + 2].try_into().expect("sized"))
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(buf[at..at + 4].try_into().expect("sized"))
}

/// Keep the leading alphanumeric run, uppercased - the lump-name charset.
fn normalize(name: &str) -> String {
    name.chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Loader probe for ZIP packages.
pub struct ZipLoader;

impl DeviceLoader for ZipLoader {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn probe(&self, prefix: &[u8]) -> bool {
        // an archive with entries starts with a local file header, an empty
        // one with the end-of-central-directory record
        prefix.starts_with(LOCAL_FILE_SIG) || prefix.starts_with(END_OF_DIR_SIG)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Device>> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        Ok(Box::new(ZipDevice {
            source: Arc::new(ZipSource { path: path.display().to_string(), file: Mutex::new(file) }),
            file_len,
            enumerated: false,
        }))
    }
}

struct ZipSource {
    path: String,
    file: Mutex<File>,
}

impl ZipSource {
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut file = self.file.lock().expect("zip source poisoned");
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

struct ZipDevice {
    source: Arc<ZipSource>,
    file_len: u64,
    enumerated: bool,
}

impl ZipDevice {
    /// Scan backward over the trailing comment for the end-of-central-
    /// directory record and return the central directory's offset and size.
    fn find_central_dir(&self) -> Result<(u64, usize)> {
        let tail_len = (self.file_len as usize).min(END_OF_DIR_SIZE + 65536);
        if tail_len < END_OF_DIR_SIZE {
            return Err(Error::Format("file too short for a ZIP archive".into()));
        }
        let tail_start = self.file_len - tail_len as u64;
        let tail = self.source.read_at(tail_start, tail_len)?;

        for pos in (0..=tail_len - END_OF_DIR_SIZE).rev() {
            if &tail[pos..pos + 4] != END_OF_DIR_SIG {
                continue;
            }

            let record = &tail[pos..pos + END_OF_DIR_SIZE];
            let comment_len = read_u16(record, 20) as usize;

            // the record is genuine only if its comment runs to end of file
            if tail_start as usize + pos + END_OF_DIR_SIZE + comment_len != self.file_len as usize {
                continue;
            }

            let disk_num = read_u16(record, 4);
            let entries_on_disk = read_u16(record, 8);
            let entries_total = read_u16(record, 10);
            if disk_num != 0 || entries_on_disk != entries_total {
                return Err(Error::Format("multi-part ZIPs are not supported".into()));
            }

            let dir_size = read_u32(record, 12) as usize;
            let dir_offset = u64::from(read_u32(record, 16));
            if dir_offset + dir_size as u64 > self.file_len {
                return Err(Error::Corrupt(format!(
                    "central directory at {:#x}+{:#x} past end of file",
                    dir_offset, dir_size
                )));
            }

            return Ok((dir_offset, dir_size));
        }

        Err(Error::Corrupt("end of central directory not found".into()))
    }
}

impl Device for ZipDevice {
    fn name(&self) -> &str {
        &self.source.path
    }

    fn enumerate(&mut self) -> Result<Vec<Arc<dyn LumpData>>> {
        if self.enumerated {
            return Err(Error::State("device already enumerated"));
        }
        self.enumerated = true;

        let (dir_offset, dir_size) = self.find_central_dir()?;
        let dir = self.source.read_at(dir_offset, dir_size)?;

        let mut lumps: Vec<Arc<dyn LumpData>> = Vec::new();
        let mut pos = 0;

        while pos + CENTRAL_ENTRY_SIZE <= dir.len() {
            if &dir[pos..pos + 4] != CENTRAL_DIR_SIG {
                break;
            }
            let entry = &dir[pos..pos + CENTRAL_ENTRY_SIZE];

            let method = read_u16(entry, 10);
            let compressed = read_u32(entry, 20) as usize;
            let uncompressed = read_u32(entry, 24) as usize;
            let name_len = read_u16(entry, 28) as usize;
            let extra_len = read_u16(entry, 30) as usize;
            let comment_len = read_u16(entry, 32) as usize;
            let local_offset = u64::from(read_u32(entry, 42));

            let name_end = pos + CENTRAL_ENTRY_SIZE + name_len;
            if name_end > dir.len() {
                return Err(Error::Corrupt("central directory entry truncated".into()));
            }
            let filename =
                String::from_utf8_lossy(&dir[pos + CENTRAL_ENTRY_SIZE..name_end]).into_owned();

            pos = name_end + extra_len + comment_len;

            if method != METHOD_STORED && method != METHOD_DEFLATE {
                warn!("unsupported compression method {} for '{}'", method, filename);
                continue;
            }

            // directory placeholder
            if compressed == 0 && uncompressed == 0 {
                continue;
            }

            let (section, rest) = match filename.find('/') {
                Some(slash) if slash > 0 => {
                    let section = match normalize(&filename[..slash]).as_str() {
                        "GRAPHICS" => Section::Graphics,
                        "TEXTURES" => Section::Textures,
                        "SOUNDS" => Section::Sounds,
                        "SPRITES" => Section::Sprites,
                        _ => Section::Normal,
                    };
                    (section, &filename[slash + 1..])
                }
                _ => (Section::Normal, filename.as_str()),
            };

            let mut name = normalize(rest);
            name.truncate(8);
            if name.is_empty() {
                continue;
            }

            lumps.push(Arc::new(ZipLump {
                source: Arc::clone(&self.source),
                name,
                section,
                local_offset,
                method,
                compressed,
                uncompressed,
            }));
        }

        Ok(lumps)
    }
}

struct ZipLump {
    source: Arc<ZipSource>,
    name: String,
    section: Section,
    local_offset: u64,
    method: u16,
    compressed: usize,
    uncompressed: usize,
}

impl LumpData for ZipLump {
    fn name(&self) -> &str {
        &self.name
    }

    fn section(&self) -> Section {
        self.section
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        let header = self.source.read_at(self.local_offset, LOCAL_HEADER_SIZE)?;
        if &header[0..4] != LOCAL_FILE_SIG {
            return Err(Error::Corrupt(format!(
                "'{}': local file header signature missing",
                self.name
            )));
        }

        let name_len = read_u16(&header, 26) as usize;
        let extra_len = read_u16(&header, 28) as usize;
        let data_offset = self.local_offset + (LOCAL_HEADER_SIZE + name_len + extra_len) as u64;

        let raw = self.source.read_at(data_offset, self.compressed)?;

        match self.method {
            METHOD_STORED => Ok(raw),
            METHOD_DEFLATE => {
                let mut bytes = Vec::with_capacity(self.uncompressed);
                DeflateDecoder::new(raw.as_slice())
                    .read_to_end(&mut bytes)
                    .map_err(|e| Error::Corrupt(format!("'{}': bad deflate stream: {}", self.name, e)))?;

                if bytes.len() != self.uncompressed {
                    return Err(Error::Corrupt(format!(
                        "'{}': inflated to {} bytes, directory says {}",
                        self.name,
                        bytes.len(),
                        self.uncompressed
                    )));
                }

                Ok(bytes)
            }
            _ => unreachable!("filtered at enumerate"),
        }
    }
}
