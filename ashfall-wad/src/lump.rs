//! The lump contract and the lump handle handed out by the registry.

use std::sync::Arc;

use crate::error::Result;
use crate::image::{Image, Palette};
use crate::section::Section;

/// Backend contract for one named resource inside a device.
///
/// Implementations hold only location/compression metadata, never the bytes:
/// `read_bytes` decodes fresh on every call. Callers that want caching cache
/// at the handle ([`Lump::bytes`]) or externally (the palette cache).
pub trait LumpData: Send + Sync {
    /// Lump name, uppercase, at most 8 meaningful characters in the archive
    /// formats. Constant for the lump's lifetime.
    fn name(&self) -> &str;

    /// Section the lump lives in. Constant for the lump's lifetime.
    fn section(&self) -> Section;

    /// Decode the lump's entire contents into a fresh buffer.
    fn read_bytes(&self) -> Result<Vec<u8>>;

    /// Interpret the lump as an indexed image. `None` for lump kinds with no
    /// image interpretation.
    fn read_image(&self) -> Result<Option<Image>> {
        Ok(None)
    }

    /// Interpret the lump as a palette. `None` for lump kinds with no
    /// palette interpretation.
    fn read_palette(&self) -> Result<Option<Arc<Palette>>> {
        Ok(None)
    }
}

/// One entry of a name's override chain: the lump and the device that
/// defined it, in registration order.
#[derive(Clone)]
pub(crate) struct ChainEntry {
    pub(crate) device: usize,
    pub(crate) global_index: Option<usize>,
    pub(crate) data: Arc<dyn LumpData>,
}

/// A cheap, clonable reference to a resolved lump.
///
/// The handle pairs one version of a named lump with its whole override
/// chain (so older/newer versions of the same name stay reachable) and a
/// lazily filled byte buffer: [`Lump::bytes`] decodes once per handle and
/// returns the same buffer afterwards.
#[derive(Clone)]
pub struct Lump {
    versions: Vec<ChainEntry>,
    pos: usize,
    section_index: usize,
    bytes: Option<Arc<[u8]>>,
}

impl Lump {
    pub(crate) fn new(versions: Vec<ChainEntry>, pos: usize, section_index: usize) -> Lump {
        debug_assert!(pos < versions.len());
        Lump { versions, pos, section_index, bytes: None }
    }

    fn entry(&self) -> &ChainEntry {
        &self.versions[self.pos]
    }

    pub fn name(&self) -> &str {
        self.entry().data.name()
    }

    pub fn section(&self) -> Section {
        self.entry().data.section()
    }

    /// Id of the device that defined this version (registration order).
    pub fn device_id(&self) -> usize {
        self.entry().device
    }

    /// Position of this name's slot within its section table.
    pub fn section_index(&self) -> usize {
        self.section_index
    }

    /// Process-wide index assigned by `Registry::merge`, `None` before it.
    pub fn global_index(&self) -> Option<usize> {
        self.entry().global_index
    }

    /// Whether this handle points at the winning (latest) version.
    pub fn is_current(&self) -> bool {
        self.pos + 1 == self.versions.len()
    }

    /// The version this one shadowed, if an earlier device defined the name.
    pub fn previous(&self) -> Option<Lump> {
        let pos = self.pos.checked_sub(1)?;
        Some(Lump::new(self.versions.clone(), pos, self.section_index))
    }

    /// The version that shadows this one, if any.
    pub fn next_version(&self) -> Option<Lump> {
        if self.is_current() {
            return None;
        }
        Some(Lump::new(self.versions.clone(), self.pos + 1, self.section_index))
    }

    /// The lump's bytes, decoded on first use and memoized in the handle.
    pub fn bytes(&mut self) -> Result<&[u8]> {
        if self.bytes.is_none() {
            self.bytes = Some(self.entry().data.read_bytes()?.into());
        }
        Ok(self.bytes.as_deref().expect("memoized above"))
    }

    /// Decode a fresh copy of the lump's bytes, bypassing the handle memo.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        self.entry().data.read_bytes()
    }

    /// Interpret the lump as an indexed image, if its kind has one.
    pub fn read_image(&self) -> Result<Option<Image>> {
        self.entry().data.read_image()
    }

    /// Interpret the lump as a palette, if its kind has one.
    pub fn read_palette(&self) -> Result<Option<Arc<Palette>>> {
        self.entry().data.read_palette()
    }
}

impl core::fmt::Debug for Lump {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Lump")
            .field("name", &self.name())
            .field("section", &self.section())
            .field("device", &self.device_id())
            .field("version", &self.pos)
            .finish()
    }
}
