//! The device contract and the format-loader probe interface.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::lump::LumpData;

/// How many leading bytes of a container a loader probe gets to look at.
/// Enough for every supported magic, including the 64-byte ROM header.
pub const PROBE_LEN: usize = 64;

/// One opened physical container: a WAD or ZIP file, or the WAD region
/// carved out of a console ROM image.
///
/// A device owns its byte source for the lifetime of the session and has an
/// immutable directory: `enumerate` scans it exactly once.
pub trait Device: Send {
    /// Display name for logs, usually the path it was opened from.
    fn name(&self) -> &str;

    /// Scan the container's directory and produce every lump it contains.
    ///
    /// Callable exactly once; a second call is `Error::State`. Fails with
    /// `Error::Format` on a bad signature and `Error::Corrupt` when
    /// directory entries point outside the container.
    fn enumerate(&mut self) -> Result<Vec<Arc<dyn LumpData>>>;
}

/// Format probe used by `Registry::add_device_path` to dispatch a path to
/// the right container implementation.
///
/// Probes inspect a short header prefix and either claim the container or
/// decline, so dispatch across the WAD, ZIP and ROM formats is unambiguous.
pub trait DeviceLoader: Send + Sync {
    /// Loader name for logs ("wad", "zip", "rom").
    fn name(&self) -> &'static str;

    /// Quick check on the first [`PROBE_LEN`] bytes (fewer if the file is
    /// shorter). Must not do I/O.
    fn probe(&self, prefix: &[u8]) -> bool;

    /// Open the container. Only called after `probe` accepted it.
    fn open(&self, path: &Path) -> Result<Box<dyn Device>>;
}
