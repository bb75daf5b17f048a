//! The lump registry: section tables, override chains and the lookup API.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use hashbrown::HashMap;
use log::{debug, info};

use crate::device::{Device, DeviceLoader, PROBE_LEN};
use crate::error::{Error, Result};
use crate::lump::{ChainEntry, Lump, LumpData};
use crate::section::Section;

/// One name's slot in a section table. `versions` is the override chain in
/// registration order; the last entry is the one lookups resolve to.
struct Slot {
    versions: Vec<ChainEntry>,
}

#[derive(Default)]
struct SectionTable {
    slots: Vec<Slot>,
    by_name: HashMap<String, usize>,
}

impl SectionTable {
    fn insert(&mut self, device: usize, data: std::sync::Arc<dyn LumpData>) {
        let name = data.name().to_ascii_uppercase();
        let entry = ChainEntry { device, global_index: None, data };

        match self.by_name.get(&name) {
            Some(&slot) => self.slots[slot].versions.push(entry),
            None => {
                self.by_name.insert(name, self.slots.len());
                self.slots.push(Slot { versions: vec![entry] });
            }
        }
    }
}

/// Aggregates lumps from every registered device into per-section ordered
/// tables with name lookup and override tracking.
///
/// The registry is an explicit value owned by engine startup; registration
/// (`add_device*`, `merge`) takes `&mut self` and must be serialized against
/// lookups, which take `&self` and are safe to run concurrently afterwards.
#[derive(Default)]
pub struct Registry {
    loaders: Vec<Box<dyn DeviceLoader>>,
    device_names: Vec<String>,
    tables: [SectionTable; Section::COUNT],
    /// (section, slot, version) per global index, built by `merge`.
    by_index: Vec<(Section, usize, usize)>,
    merged: bool,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// A registry with the stock loaders, probed in the engine's order:
    /// ZIP package, plain WAD, console ROM.
    pub fn with_default_loaders() -> Registry {
        let mut registry = Registry::new();
        registry.add_loader(Box::new(crate::zip::ZipLoader));
        registry.add_loader(Box::new(crate::doom::DoomLoader));
        registry.add_loader(Box::new(crate::rom::RomLoader::new()));
        registry
    }

    /// Append a format loader. Order is probe order.
    pub fn add_loader(&mut self, loader: Box<dyn DeviceLoader>) {
        self.loaders.push(loader);
    }

    /// Drain a device's lumps into the section tables. Later devices'
    /// same-named lumps shadow earlier ones; the shadowed versions stay
    /// reachable through the handle's version chain.
    ///
    /// Returns the device id used in `Lump::device_id`.
    pub fn add_device(&mut self, mut device: Box<dyn Device>) -> Result<usize> {
        let id = self.device_names.len();
        let lumps = device.enumerate()?;
        let count = lumps.len();

        for lump in lumps {
            self.tables[lump.section().index()].insert(id, lump);
        }

        info!("added {} lumps from '{}'", count, device.name());
        self.device_names.push(device.name().to_owned());
        self.merged = false;

        Ok(id)
    }

    /// Probe the registered loaders against `path` and add the first device
    /// that claims it. `Error::NotFound` if no loader recognizes the file.
    pub fn add_device_path(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();

        let mut prefix = [0u8; PROBE_LEN];
        let mut file = File::open(path)?;
        let mut len = 0;
        while len < PROBE_LEN {
            let n = file.read(&mut prefix[len..])?;
            if n == 0 {
                break;
            }
            len += n;
        }
        drop(file);

        for loader in &self.loaders {
            if loader.probe(&prefix[..len]) {
                debug!("'{}' claimed by {} loader", path.display(), loader.name());
                let device = loader.open(path)?;
                return self.add_device(device);
            }
        }

        Err(Error::NotFound(path.to_owned()))
    }

    /// Number of devices registered so far.
    pub fn device_count(&self) -> usize {
        self.device_names.len()
    }

    /// Total number of registered lumps, shadowed versions included.
    pub fn lump_count(&self) -> usize {
        self.tables
            .iter()
            .map(|t| t.slots.iter().map(|s| s.versions.len()).sum::<usize>())
            .sum()
    }

    /// Assign the process-wide lump index: every registered version, in
    /// section order, then slot insertion order, then chain order. Call once
    /// after the last `add_device`; repeated calls with no devices added in
    /// between assign the same indices.
    pub fn merge(&mut self) {
        self.by_index.clear();

        for section in Section::ALL {
            let table = &mut self.tables[section.index()];
            for (slot_idx, slot) in table.slots.iter_mut().enumerate() {
                for (ver_idx, entry) in slot.versions.iter_mut().enumerate() {
                    entry.global_index = Some(self.by_index.len());
                    self.by_index.push((section, slot_idx, ver_idx));
                }
            }
        }

        self.merged = true;
    }

    fn handle(&self, section: Section, slot_idx: usize, pos: usize) -> Lump {
        let slot = &self.tables[section.index()].slots[slot_idx];
        Lump::new(slot.versions.clone(), pos, slot_idx)
    }

    /// Look up the current version of `name` within `section`. Names are
    /// case-insensitive; a miss is `None`, never an error.
    pub fn open(&self, section: Section, name: &str) -> Option<Lump> {
        let table = &self.tables[section.index()];
        let &slot_idx = table.by_name.get(&name.to_ascii_uppercase())?;
        let pos = table.slots[slot_idx].versions.len() - 1;
        Some(self.handle(section, slot_idx, pos))
    }

    /// Look up a lump by its slot position within a section table.
    pub fn open_at(&self, section: Section, index: usize) -> Option<Lump> {
        let table = &self.tables[section.index()];
        let slot = table.slots.get(index)?;
        Some(self.handle(section, index, slot.versions.len() - 1))
    }

    /// Look up a lump by the global index assigned by [`Registry::merge`].
    /// Before `merge` this is `Error::State`; after it, a miss is `None`.
    pub fn open_index(&self, index: usize) -> Result<Option<Lump>> {
        if !self.merged {
            return Err(Error::State("global-index lookup before merge()"));
        }

        Ok(self
            .by_index
            .get(index)
            .map(|&(section, slot_idx, pos)| self.handle(section, slot_idx, pos)))
    }

    /// Shorthand for [`Registry::open`] in the normal section.
    pub fn open_name(&self, name: &str) -> Option<Lump> {
        self.open(Section::Normal, name)
    }

    pub fn exists(&self, section: Section, name: &str) -> bool {
        self.open(section, name).is_some()
    }

    /// The full ordered table of a section's current lumps, for bulk
    /// iteration (e.g. building the simulation layer's texture name table).
    pub fn list_section(&self, section: Section) -> Vec<Lump> {
        let table = &self.tables[section.index()];
        (0..table.slots.len())
            .map(|slot_idx| {
                self.handle(section, slot_idx, table.slots[slot_idx].versions.len() - 1)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    struct FakeLump {
        name: &'static str,
        section: Section,
        payload: Vec<u8>,
    }

    impl LumpData for FakeLump {
        fn name(&self) -> &str {
            self.name
        }

        fn section(&self) -> Section {
            self.section
        }

        fn read_bytes(&self) -> Result<Vec<u8>> {
            Ok(self.payload.clone())
        }
    }

    struct FakeDevice {
        name: &'static str,
        lumps: Vec<(&'static str, Section, Vec<u8>)>,
        enumerated: bool,
    }

    impl FakeDevice {
        fn boxed(name: &'static str, lumps: Vec<(&'static str, Section, Vec<u8>)>) -> Box<Self> {
            Box::new(FakeDevice { name, lumps, enumerated: false })
        }
    }

    impl Device for FakeDevice {
        fn name(&self) -> &str {
            self.name
        }

        fn enumerate(&mut self) -> Result<Vec<Arc<dyn LumpData>>> {
            if self.enumerated {
                return Err(Error::State("device already enumerated"));
            }
            self.enumerated = true;

            Ok(self
                .lumps
                .drain(..)
                .map(|(name, section, payload)| {
                    Arc::new(FakeLump { name, section, payload }) as Arc<dyn LumpData>
                })
                .collect())
        }
    }

    #[test]
    fn test_open_by_name_case_insensitive() {
        let mut reg = Registry::new();
        reg.add_device(FakeDevice::boxed(
            "a",
            vec![("FOO", Section::Normal, vec![1, 2, 3, 4])],
        ))
        .unwrap();

        let mut lump = reg.open(Section::Normal, "foo").unwrap();
        assert_eq!(lump.name(), "FOO");
        assert_eq!(lump.bytes().unwrap(), &[1, 2, 3, 4]);
        assert!(reg.open(Section::Textures, "FOO").is_none());
        assert!(reg.open(Section::Normal, "BAR").is_none());
    }

    #[test]
    fn test_handle_memoizes_bytes() {
        let mut reg = Registry::new();
        reg.add_device(FakeDevice::boxed("a", vec![("FOO", Section::Normal, vec![9])]))
            .unwrap();

        let mut lump = reg.open_name("FOO").unwrap();
        let first = lump.bytes().unwrap().to_vec();
        assert_eq!(lump.bytes().unwrap(), first.as_slice());
        // fresh-decode path still works independently of the memo
        assert_eq!(lump.read_bytes().unwrap(), first);
    }

    #[test]
    fn test_later_device_shadows_earlier() {
        let mut reg = Registry::new();
        let d1 = reg
            .add_device(FakeDevice::boxed("base", vec![("FOO", Section::Normal, vec![1])]))
            .unwrap();
        let d2 = reg
            .add_device(FakeDevice::boxed("patch", vec![("FOO", Section::Normal, vec![2])]))
            .unwrap();

        let lump = reg.open_name("FOO").unwrap();
        assert_eq!(lump.device_id(), d2);
        assert_eq!(lump.read_bytes().unwrap(), vec![2]);
        assert!(lump.is_current());

        let prev = lump.previous().unwrap();
        assert_eq!(prev.device_id(), d1);
        assert_eq!(prev.read_bytes().unwrap(), vec![1]);
        assert!(prev.previous().is_none());

        let back = prev.next_version().unwrap();
        assert_eq!(back.device_id(), d2);
        assert!(back.next_version().is_none());

        // shadowing does not grow the table
        assert_eq!(reg.list_section(Section::Normal).len(), 1);
    }

    #[test]
    fn test_same_name_different_sections_independent() {
        let mut reg = Registry::new();
        reg.add_device(FakeDevice::boxed(
            "a",
            vec![
                ("FOO", Section::Normal, vec![1]),
                ("FOO", Section::Textures, vec![2]),
            ],
        ))
        .unwrap();

        assert_eq!(reg.open(Section::Normal, "FOO").unwrap().read_bytes().unwrap(), vec![1]);
        assert_eq!(reg.open(Section::Textures, "FOO").unwrap().read_bytes().unwrap(), vec![2]);
    }

    #[test]
    fn test_merge_assigns_permutation() {
        let mut reg = Registry::new();
        reg.add_device(FakeDevice::boxed(
            "a",
            vec![
                ("A", Section::Normal, vec![]),
                ("B", Section::Textures, vec![]),
                ("C", Section::Sounds, vec![]),
            ],
        ))
        .unwrap();
        reg.add_device(FakeDevice::boxed(
            "b",
            vec![("A", Section::Normal, vec![]), ("D", Section::Sprites, vec![])],
        ))
        .unwrap();

        reg.merge();

        let total = reg.lump_count();
        assert_eq!(total, 5);

        let mut seen = vec![false; total];
        for i in 0..total {
            let lump = reg.open_index(i).unwrap().unwrap();
            let idx = lump.global_index().unwrap();
            assert_eq!(idx, i);
            assert!(!seen[idx]);
            seen[idx] = true;
        }
        assert!(seen.iter().all(|&s| s));
        assert!(reg.open_index(total).unwrap().is_none());

        // stable across repeated merges
        let before: Vec<_> = (0..total)
            .map(|i| {
                let l = reg.open_index(i).unwrap().unwrap();
                (l.name().to_owned(), l.device_id())
            })
            .collect();
        reg.merge();
        let after: Vec<_> = (0..total)
            .map(|i| {
                let l = reg.open_index(i).unwrap().unwrap();
                (l.name().to_owned(), l.device_id())
            })
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_global_index_covers_shadowed_versions() {
        let mut reg = Registry::new();
        reg.add_device(FakeDevice::boxed("a", vec![("FOO", Section::Normal, vec![1])]))
            .unwrap();
        reg.add_device(FakeDevice::boxed("b", vec![("FOO", Section::Normal, vec![2])]))
            .unwrap();
        reg.merge();

        // both versions are addressable; chain order within the slot
        assert_eq!(reg.open_index(0).unwrap().unwrap().read_bytes().unwrap(), vec![1]);
        assert_eq!(reg.open_index(1).unwrap().unwrap().read_bytes().unwrap(), vec![2]);
    }

    #[test]
    fn test_open_index_before_merge_is_state_error() {
        let mut reg = Registry::new();
        reg.add_device(FakeDevice::boxed("a", vec![("FOO", Section::Normal, vec![])]))
            .unwrap();

        assert!(matches!(reg.open_index(0), Err(Error::State(_))));

        reg.merge();
        assert!(reg.open_index(0).unwrap().is_some());

        // adding another device invalidates the merge
        reg.add_device(FakeDevice::boxed("b", vec![("BAR", Section::Normal, vec![])]))
            .unwrap();
        assert!(matches!(reg.open_index(0), Err(Error::State(_))));
    }

    #[test]
    fn test_open_at_slot_order() {
        let mut reg = Registry::new();
        reg.add_device(FakeDevice::boxed(
            "a",
            vec![
                ("X", Section::Sprites, vec![0]),
                ("Y", Section::Sprites, vec![1]),
            ],
        ))
        .unwrap();

        assert_eq!(reg.open_at(Section::Sprites, 0).unwrap().name(), "X");
        assert_eq!(reg.open_at(Section::Sprites, 1).unwrap().name(), "Y");
        assert!(reg.open_at(Section::Sprites, 2).is_none());
    }

    #[test]
    fn test_add_device_path_no_loader_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.bin");
        std::fs::write(&path, b"not a container").unwrap();

        let mut reg = Registry::with_default_loaders();
        assert!(matches!(reg.add_device_path(&path), Err(Error::NotFound(_))));
    }
}
