//! File-backed generation store
//!
//! Layout of the data directory:
//!
//! ```text
//! status.bin          bincode manifest: complete generation -> shape count
//! generation_{n}.bin  length-prefixed frames, each a bincode batch of grids
//! generation_{n}.tmp  in-progress write, renamed into place when done
//! ```
//!
//! Shape data and completion live in separate files. The manifest is only
//! updated after a data file has been fully written and renamed, so a crash
//! at any point leaves each generation either absent or complete. Opening a
//! store deletes data files of generations the manifest does not list.
//! [`FileStore::recover`] rebuilds an unreadable manifest from the data files.

use super::GenerationStore;
use crate::error::{PolycubeError, Result};
use crate::generation::validate_shapes;
use crate::grid::Grid;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

const MANIFEST_FILE: &str = "status.bin";
const MANIFEST_VERSION: u32 = 1;
/// Frame header: big-endian byte length of the batch that follows
const FRAME_HEADER: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    /// Complete generation -> number of shapes
    complete: BTreeMap<usize, usize>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            complete: BTreeMap::new(),
        }
    }
}

/// Generation store in a local directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    batch_size: usize,
    manifest: Manifest,
    /// Shape counts of generations written by this handle but not yet marked
    written: HashMap<usize, usize>,
}

impl FileStore {
    /// Open (or create) a store in `dir`, writing at most `batch_size` shapes per frame.
    ///
    /// Fails with [`PolycubeError::InvalidBatchSize`] when `batch_size` is zero.
    pub fn open(dir: impl Into<PathBuf>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(PolycubeError::InvalidBatchSize);
        }
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let manifest = load_manifest(&dir.join(MANIFEST_FILE))?;

        let store = Self {
            dir,
            batch_size,
            manifest,
            written: HashMap::new(),
        };
        store.remove_incomplete()?;
        Ok(store)
    }

    /// Open a store, rebuilding its manifest from the data files if it is unreadable.
    ///
    /// Each `generation_{n}.bin` that decodes and validates is listed as complete,
    /// the rest are removed. A readable manifest is used as is.
    pub fn recover(dir: impl Into<PathBuf>, batch_size: usize) -> Result<Self> {
        let dir = dir.into();
        match Self::open(dir.clone(), batch_size) {
            Err(PolycubeError::CorruptManifest(reason)) => {
                warn!(%reason, "rebuilding manifest from data files");
            }
            other => return other,
        }

        let mut store = Self {
            dir,
            batch_size,
            manifest: Manifest::default(),
            written: HashMap::new(),
        };
        for entry in fs::read_dir(&store.dir)? {
            let entry = entry?;
            let Some((n, false)) = entry.file_name().to_str().and_then(parse_data_file) else {
                continue;
            };
            let loaded = store
                .read_frames(n)
                .and_then(|shapes| validate_shapes(n, &shapes).map(|()| shapes.len()));
            match loaded {
                Ok(count) => {
                    store.manifest.complete.insert(n, count);
                }
                Err(PolycubeError::CorruptGeneration { reason, .. }) => {
                    warn!(n, %reason, "dropping unreadable generation");
                }
                Err(err) => return Err(err),
            }
        }
        store.save_manifest()?;
        store.remove_incomplete()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn data_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("generation_{n}.bin"))
    }

    fn temp_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("generation_{n}.tmp"))
    }

    /// Delete leftovers of interrupted writes.
    fn remove_incomplete(&self) -> Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some((n, temp)) = name.to_str().and_then(parse_data_file) else {
                continue;
            };
            if temp || !self.manifest.complete.contains_key(&n) {
                warn!(n, path = %entry.path().display(), "removing incomplete generation data");
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    fn save_manifest(&self) -> Result<()> {
        let data = bincode::serialize(&self.manifest).map_err(encode_error)?;
        let path = self.dir.join(MANIFEST_FILE);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data)?;
        fs::rename(tmp, &path)?;
        Ok(())
    }

    fn read_frames(&self, n: usize) -> Result<Vec<Grid>> {
        let bytes = match fs::read(self.data_path(n)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(PolycubeError::MissingGeneration(n));
            }
            Err(err) => return Err(PolycubeError::StoreUnavailable(err)),
        };

        let corrupt = |reason: String| PolycubeError::CorruptGeneration { n, reason };
        let mut shapes = Vec::new();
        let mut rest = bytes.as_slice();
        while !rest.is_empty() {
            if rest.len() < FRAME_HEADER {
                return Err(corrupt(format!(
                    "truncated frame header: {} bytes",
                    rest.len()
                )));
            }
            let (header, body) = rest.split_at(FRAME_HEADER);
            let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
            if body.len() < len {
                return Err(corrupt(format!(
                    "truncated frame: expected {} bytes, only {} available",
                    len,
                    body.len()
                )));
            }
            let (frame, tail) = body.split_at(len);
            let batch: Vec<Grid> =
                bincode::deserialize(frame).map_err(|err| corrupt(err.to_string()))?;
            shapes.extend(batch);
            rest = tail;
        }
        Ok(shapes)
    }
}

impl GenerationStore for FileStore {
    fn max_complete_generation(&self) -> Result<usize> {
        Ok(self
            .manifest
            .complete
            .last_key_value()
            .map_or(0, |(&n, _)| n))
    }

    fn complete_generations(&self) -> Result<Vec<usize>> {
        Ok(self.manifest.complete.keys().copied().collect())
    }

    fn get_generation(&self, n: usize) -> Result<Vec<Grid>> {
        let Some(&expected) = self.manifest.complete.get(&n) else {
            return Err(PolycubeError::GenerationNotComplete(n));
        };

        let shapes = self.read_frames(n).map_err(|err| match err {
            PolycubeError::MissingGeneration(n) => PolycubeError::CorruptGeneration {
                n,
                reason: "data file is missing".into(),
            },
            other => other,
        })?;
        if shapes.len() != expected {
            return Err(PolycubeError::CorruptGeneration {
                n,
                reason: format!("expected {} shapes, found {}", expected, shapes.len()),
            });
        }
        validate_shapes(n, &shapes)?;

        debug!(n, shapes = shapes.len(), "loaded generation");
        Ok(shapes)
    }

    fn put_generation(&mut self, n: usize, shapes: &[Grid]) -> Result<()> {
        if self.manifest.complete.remove(&n).is_some() {
            self.save_manifest()?;
        }
        self.written.remove(&n);

        let tmp = self.temp_path(n);
        let file = fs::File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        for (batch, chunk) in shapes.chunks(self.batch_size).enumerate() {
            let data = bincode::serialize(chunk).map_err(encode_error)?;
            writer.write_all(&frame_header(data.len())?)?;
            writer.write_all(&data)?;
            debug!(n, batch, shapes = chunk.len(), "wrote batch");
        }
        let file = writer.into_inner().map_err(|err| err.into_error())?;
        file.sync_all()?;
        fs::rename(&tmp, self.data_path(n))?;

        self.written.insert(n, shapes.len());
        Ok(())
    }

    fn mark_complete(&mut self, n: usize) -> Result<()> {
        let count = match self.written.remove(&n) {
            Some(count) => count,
            None => self.read_frames(n)?.len(),
        };
        self.manifest.complete.insert(n, count);
        self.save_manifest()
    }

    fn count_generation(&self, n: usize) -> Result<usize> {
        self.manifest
            .complete
            .get(&n)
            .copied()
            .ok_or(PolycubeError::GenerationNotComplete(n))
    }

    fn discard_generation(&mut self, n: usize) -> Result<()> {
        if self.manifest.complete.remove(&n).is_some() {
            self.save_manifest()?;
        }
        self.written.remove(&n);
        match fs::remove_file(self.data_path(n)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PolycubeError::StoreUnavailable(err)),
        }
    }
}

fn load_manifest(path: &Path) -> Result<Manifest> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Manifest::default()),
        Err(err) => return Err(PolycubeError::StoreUnavailable(err)),
    };
    let manifest: Manifest = bincode::deserialize(&bytes)
        .map_err(|err| PolycubeError::CorruptManifest(err.to_string()))?;
    if manifest.version != MANIFEST_VERSION {
        return Err(PolycubeError::CorruptManifest(format!(
            "unsupported version {}",
            manifest.version
        )));
    }
    Ok(manifest)
}

/// `generation_{n}.bin` -> `(n, false)`, `generation_{n}.tmp` -> `(n, true)`
fn parse_data_file(name: &str) -> Option<(usize, bool)> {
    let stem = name.strip_prefix("generation_")?;
    let (n, temp) = match stem.strip_suffix(".bin") {
        Some(n) => (n, false),
        None => (stem.strip_suffix(".tmp")?, true),
    };
    n.parse().ok().map(|n| (n, temp))
}

fn frame_header(len: usize) -> Result<[u8; FRAME_HEADER]> {
    let len = u32::try_from(len).map_err(|_| {
        PolycubeError::StoreUnavailable(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("batch of {len} bytes does not fit a frame; lower the batch size"),
        ))
    })?;
    Ok(len.to_be_bytes())
}

fn encode_error(err: bincode::Error) -> PolycubeError {
    PolycubeError::StoreUnavailable(io::Error::other(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grow::grow;
    use crate::dedup::dedup;
    use tempfile::TempDir;

    fn trominoes() -> Vec<Grid> {
        let dominoes = dedup(grow(&Grid::unit()).unwrap());
        dedup(grow(&dominoes[0]).unwrap())
    }

    fn store_with_generation_3(dir: &TempDir, batch_size: usize) -> FileStore {
        let mut store = FileStore::open(dir.path(), batch_size).unwrap();
        store.put_generation(3, &trominoes()).unwrap();
        store.mark_complete(3).unwrap();
        store
    }

    #[test]
    fn test_parse_data_file() {
        assert_eq!(parse_data_file("generation_12.bin"), Some((12, false)));
        assert_eq!(parse_data_file("generation_3.tmp"), Some((3, true)));
        assert_eq!(parse_data_file("status.bin"), None);
        assert_eq!(parse_data_file("generation_x.bin"), None);
    }

    #[test]
    fn test_roundtrip_across_batches() {
        let dir = TempDir::new().unwrap();
        let store = store_with_generation_3(&dir, 1);

        assert_eq!(store.max_complete_generation().unwrap(), 3);
        assert_eq!(store.count_generation(3).unwrap(), 2);
        assert_eq!(store.get_generation(3).unwrap(), trominoes());
    }

    #[test]
    fn test_reopen_keeps_complete_generations() {
        let dir = TempDir::new().unwrap();
        drop(store_with_generation_3(&dir, 1000));

        let store = FileStore::open(dir.path(), 1000).unwrap();
        assert_eq!(store.complete_generations().unwrap(), vec![3]);
        assert_eq!(store.get_generation(3).unwrap(), trominoes());
    }

    #[test]
    fn test_unmarked_data_is_removed_on_open() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = FileStore::open(dir.path(), 1000).unwrap();
            store.put_generation(1, &[Grid::unit()]).unwrap();
        }
        fs::write(dir.path().join("generation_2.tmp"), b"partial").unwrap();

        let store = FileStore::open(dir.path(), 1000).unwrap();
        assert_eq!(store.max_complete_generation().unwrap(), 0);
        assert!(!dir.path().join("generation_1.bin").exists());
        assert!(!dir.path().join("generation_2.tmp").exists());
    }

    #[test]
    fn test_incomplete_generation_is_not_readable() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::open(dir.path(), 1000).unwrap();
        store.put_generation(1, &[Grid::unit()]).unwrap();
        assert!(matches!(
            store.get_generation(1),
            Err(PolycubeError::GenerationNotComplete(1))
        ));
        assert!(matches!(
            store.count_generation(1),
            Err(PolycubeError::GenerationNotComplete(1))
        ));
    }

    #[test]
    fn test_mark_without_data_fails() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::open(dir.path(), 1000).unwrap();
        assert!(matches!(
            store.mark_complete(5),
            Err(PolycubeError::MissingGeneration(5))
        ));
        assert_eq!(store.max_complete_generation().unwrap(), 0);
    }

    #[test]
    fn test_truncated_data_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = store_with_generation_3(&dir, 1);
        let path = dir.path().join("generation_3.bin");
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        match store.get_generation(3) {
            Err(PolycubeError::CorruptGeneration { n: 3, .. }) => {}
            other => panic!("Expected CorruptGeneration, got {:?}", other),
        }
    }

    #[test]
    fn test_foreign_shapes_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::open(dir.path(), 1000).unwrap();
        // Dominoes stored under generation 3
        store
            .put_generation(3, &dedup(grow(&Grid::unit()).unwrap()))
            .unwrap();
        store.mark_complete(3).unwrap();

        assert!(matches!(
            store.get_generation(3),
            Err(PolycubeError::CorruptGeneration { n: 3, .. })
        ));
    }

    #[test]
    fn test_missing_data_file_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = store_with_generation_3(&dir, 1000);
        fs::remove_file(dir.path().join("generation_3.bin")).unwrap();
        assert!(matches!(
            store.get_generation(3),
            Err(PolycubeError::CorruptGeneration { n: 3, .. })
        ));
    }

    #[test]
    fn test_garbage_manifest_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), b"\x01").unwrap();
        assert!(matches!(
            FileStore::open(dir.path(), 1000),
            Err(PolycubeError::CorruptManifest(_))
        ));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            FileStore::open(dir.path(), 0),
            Err(PolycubeError::InvalidBatchSize)
        ));
    }

    #[test]
    fn test_frame_header() {
        assert_eq!(frame_header(9).unwrap(), [0, 0, 0, 9]);
        assert_eq!(frame_header(u32::MAX as usize).unwrap(), [0xff; 4]);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_oversized_frame_is_an_error() {
        assert!(matches!(
            frame_header(u32::MAX as usize + 1),
            Err(PolycubeError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_recover_rebuilds_manifest() {
        let dir = TempDir::new().unwrap();
        drop(store_with_generation_3(&dir, 1000));
        {
            let mut store = FileStore::open(dir.path(), 1000).unwrap();
            store.put_generation(1, &[Grid::unit()]).unwrap();
            store.mark_complete(1).unwrap();
        }
        fs::write(dir.path().join("generation_2.bin"), b"\x00\x00\x00\x02ab").unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), b"\x01").unwrap();

        let store = FileStore::recover(dir.path(), 1000).unwrap();
        assert_eq!(store.complete_generations().unwrap(), vec![1, 3]);
        assert_eq!(store.get_generation(3).unwrap(), trominoes());
        assert!(!dir.path().join("generation_2.bin").exists());

        // The rebuilt manifest is what later opens see
        let store = FileStore::open(dir.path(), 1000).unwrap();
        assert_eq!(store.count_generation(3).unwrap(), 2);
    }

    #[test]
    fn test_recover_keeps_readable_manifest() {
        let dir = TempDir::new().unwrap();
        drop(store_with_generation_3(&dir, 1000));
        let store = FileStore::recover(dir.path(), 1000).unwrap();
        assert_eq!(store.complete_generations().unwrap(), vec![3]);
    }

    #[test]
    fn test_discard_removes_data_and_flag() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_generation_3(&dir, 1000);
        store.discard_generation(3).unwrap();
        assert_eq!(store.max_complete_generation().unwrap(), 0);
        assert!(!dir.path().join("generation_3.bin").exists());
        // Discarding twice is fine
        store.discard_generation(3).unwrap();
    }

    #[test]
    fn test_rewrite_clears_completion_on_disk() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_generation_3(&dir, 1000);
        store.put_generation(3, &trominoes()).unwrap();
        drop(store);

        let store = FileStore::open(dir.path(), 1000).unwrap();
        assert_eq!(store.max_complete_generation().unwrap(), 0);
    }
}
