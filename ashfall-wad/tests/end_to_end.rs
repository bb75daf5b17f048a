//! End-to-end tests over the public API: synthetic containers on disk,
//! loader dispatch, shadowing across devices, and the merged index.

use std::io::Write;
use std::path::PathBuf;

use ashfall_wad::{Error, Registry, Section};

/// Minimal WAD writer: 12-byte header, body, 16-byte directory entries.
fn write_wad(dir: &std::path::Path, file: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let mut body: Vec<u8> = Vec::new();
    let mut directory = Vec::new();

    for (name, payload) in entries {
        let filepos = if payload.is_empty() { 0 } else { 12 + body.len() };
        directory.push((filepos as u32, payload.len() as u32, *name));
        body.extend_from_slice(payload);
    }

    let mut wad = Vec::new();
    wad.extend_from_slice(b"PWAD");
    wad.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    wad.extend_from_slice(&((12 + body.len()) as u32).to_le_bytes());
    wad.extend_from_slice(&body);
    for (filepos, size, name) in directory {
        wad.extend_from_slice(&filepos.to_le_bytes());
        wad.extend_from_slice(&size.to_le_bytes());
        let mut raw = [0u8; 8];
        raw[..name.len()].copy_from_slice(name.as_bytes());
        wad.extend_from_slice(&raw);
    }

    let path = dir.join(file);
    std::fs::write(&path, wad).unwrap();
    path
}

/// Minimal ZIP writer with stored entries only.
fn write_zip(dir: &std::path::Path, file: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let mut data: Vec<u8> = Vec::new();
    let mut central: Vec<u8> = Vec::new();

    for (name, payload) in entries {
        let local_offset = data.len() as u32;

        data.extend_from_slice(b"PK\x03\x04");
        data.extend_from_slice(&[20, 0, 0, 0, 0, 0]); // version, flags, method=0
        data.extend_from_slice(&[0; 8]); // time, date, crc32
        data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&(name.len() as u16).to_le_bytes());
        data.extend_from_slice(&[0, 0]); // extra len
        data.extend_from_slice(name.as_bytes());
        data.extend_from_slice(payload);

        central.extend_from_slice(b"PK\x01\x02");
        central.extend_from_slice(&[20, 0, 20, 0, 0, 0, 0, 0]); // made by, needed, flags, method
        central.extend_from_slice(&[0; 8]); // time, date, crc32
        central.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        central.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        central.extend_from_slice(&(name.len() as u16).to_le_bytes());
        central.extend_from_slice(&[0; 12]); // extra, comment, disk, attrs
        central.extend_from_slice(&local_offset.to_le_bytes());
        central.extend_from_slice(name.as_bytes());
    }

    let dir_offset = data.len() as u32;
    let dir_size = central.len() as u32;
    data.extend_from_slice(&central);
    data.extend_from_slice(b"PK\x05\x06");
    data.extend_from_slice(&[0; 4]); // disk numbers
    data.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    data.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    data.extend_from_slice(&dir_size.to_le_bytes());
    data.extend_from_slice(&dir_offset.to_le_bytes());
    data.extend_from_slice(&[0, 0]); // comment len

    let path = dir.join(file);
    std::fs::write(&path, data).unwrap();
    path
}

#[test]
fn open_stream_yields_stored_bytes() {
    // the canonical scenario: one lump "FOO" of size 4 containing 1 2 3 4
    let dir = tempfile::tempdir().unwrap();
    let wad = write_wad(dir.path(), "base.wad", &[("FOO", &[1, 2, 3, 4])]);

    let mut registry = Registry::with_default_loaders();
    registry.add_device_path(&wad).unwrap();
    registry.merge();

    let mut lump = registry.open(Section::Normal, "FOO").unwrap();
    assert_eq!(lump.bytes().unwrap(), &[1, 2, 3, 4]);
}

#[test]
fn shadowing_across_wad_and_zip_devices() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_wad(dir.path(), "base.wad", &[("TITLE", b"old title")]);
    let patch = write_zip(dir.path(), "patch.pk3", &[("TITLE.lmp", b"new title")]);

    let mut registry = Registry::with_default_loaders();
    let base_id = registry.add_device_path(&base).unwrap();
    let patch_id = registry.add_device_path(&patch).unwrap();
    registry.merge();

    let current = registry.open(Section::Normal, "TITLE").unwrap();
    assert_eq!(current.device_id(), patch_id);
    assert_eq!(current.read_bytes().unwrap(), b"new title");

    let shadowed = current.previous().unwrap();
    assert_eq!(shadowed.device_id(), base_id);
    assert_eq!(shadowed.read_bytes().unwrap(), b"old title");
    assert!(shadowed.previous().is_none());

    // load order decides the winner: reversed registration flips the result
    let mut reversed = Registry::with_default_loaders();
    reversed.add_device_path(&patch).unwrap();
    reversed.add_device_path(&base).unwrap();
    let current = reversed.open(Section::Normal, "TITLE").unwrap();
    assert_eq!(current.read_bytes().unwrap(), b"old title");
}

#[test]
fn zip_sections_and_wad_brackets_agree() {
    let dir = tempfile::tempdir().unwrap();
    let wad = write_wad(
        dir.path(),
        "tex.wad",
        &[("T_START", b""), ("BRICK", b"from wad"), ("T_END", b"")],
    );
    let zip = write_zip(dir.path(), "tex.pk3", &[("Textures/brick.png", b"from zip")]);

    let mut registry = Registry::with_default_loaders();
    registry.add_device_path(&wad).unwrap();
    registry.add_device_path(&zip).unwrap();
    registry.merge();

    // same section, same normalized name: the ZIP entry shadows the WAD one
    let lump = registry.open(Section::Textures, "BRICK").unwrap();
    assert_eq!(lump.read_bytes().unwrap(), b"from zip");
    assert_eq!(lump.previous().unwrap().read_bytes().unwrap(), b"from wad");
    assert_eq!(registry.list_section(Section::Textures).len(), 1);
}

#[test]
fn merged_index_is_stable_permutation() {
    let dir = tempfile::tempdir().unwrap();
    let wad = write_wad(
        dir.path(),
        "mix.wad",
        &[
            ("ALPHA", b"a"),
            ("T_START", b""),
            ("BRICK", b"t"),
            ("T_END", b""),
            ("BETA", b"b"),
        ],
    );

    let mut registry = Registry::with_default_loaders();
    registry.add_device_path(&wad).unwrap();

    // global lookups are gated on the merge
    assert!(matches!(registry.open_index(0), Err(Error::State(_))));

    registry.merge();

    let total = registry.lump_count();
    assert_eq!(total, 3);

    let mut names: Vec<String> = (0..total)
        .map(|i| registry.open_index(i).unwrap().unwrap().name().to_owned())
        .collect();
    // normal section first, then textures
    assert_eq!(names, ["ALPHA", "BETA", "BRICK"]);

    registry.merge();
    let again: Vec<String> = (0..total)
        .map(|i| registry.open_index(i).unwrap().unwrap().name().to_owned())
        .collect();
    names.sort();
    let mut sorted_again = again.clone();
    sorted_again.sort();
    assert_eq!(names, sorted_again);
    assert_eq!(again, ["ALPHA", "BETA", "BRICK"]);
}

#[test]
fn version_chain_spans_three_devices() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<_> = [b"one", b"two", b"ten"]
        .iter()
        .enumerate()
        .map(|(i, payload)| {
            write_wad(dir.path(), &format!("v{i}.wad"), &[("FOO", payload.as_slice())])
        })
        .collect();

    let mut registry = Registry::with_default_loaders();
    for path in &paths {
        registry.add_device_path(path).unwrap();
    }
    registry.merge();

    // walk the chain backward from the winner...
    let newest = registry.open(Section::Normal, "FOO").unwrap();
    assert_eq!(newest.read_bytes().unwrap(), b"ten");
    let middle = newest.previous().unwrap();
    assert_eq!(middle.read_bytes().unwrap(), b"two");
    let oldest = middle.previous().unwrap();
    assert_eq!(oldest.read_bytes().unwrap(), b"one");
    assert!(oldest.previous().is_none());

    // ...and forward again to the same winner
    let forward = oldest.next_version().unwrap().next_version().unwrap();
    assert_eq!(forward.device_id(), newest.device_id());
    assert!(forward.is_current());

    // one slot, three addressable versions
    assert_eq!(registry.list_section(Section::Normal).len(), 1);
    assert_eq!(registry.lump_count(), 3);
}

#[test]
fn unrecognized_container_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.bin");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"GLORP????").unwrap();

    let mut registry = Registry::with_default_loaders();
    assert!(matches!(registry.add_device_path(&path), Err(Error::NotFound(_))));
}
