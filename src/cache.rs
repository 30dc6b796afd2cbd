//! On-disk cache of the pipeline tables
//!
//! Every artifact is a bincode file made of a fixed header followed by the
//! payload. The header is decoded and checked first; the payload is only
//! decoded once the magic, schema version, artifact kind and corpus
//! fingerprint all match. Saves go through a temporary file in the same
//! directory and are renamed into place, so a crash never leaves a
//! truncated artifact under the final name.

use crate::counts::Aggregator;
use crate::error::{CacheError, CollocError};
use rustc_hash::FxHasher;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Bumped whenever the layout of any payload changes
pub const SCHEMA_VERSION: u32 = 1;

const MAGIC: [u8; 8] = *b"COLLOCAT";

/// The artifacts the cache knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    Unigrams,
    Bigrams,
    Surfaces,
    Pos,
    Checkpoint,
}

impl ArtifactKind {
    /// The four tables a complete cache holds
    pub const TABLES: [ArtifactKind; 4] = [
        ArtifactKind::Unigrams,
        ArtifactKind::Bigrams,
        ArtifactKind::Surfaces,
        ArtifactKind::Pos,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Unigrams => "unigrams.bin",
            ArtifactKind::Bigrams => "bigrams.bin",
            ArtifactKind::Surfaces => "surfaces.bin",
            ArtifactKind::Pos => "pos.bin",
            ArtifactKind::Checkpoint => "checkpoint.bin",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Identity of the input snapshot an artifact was built from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Hash canonical path, byte length and modification time of each path.
    /// The error names the first path that could not be inspected.
    pub fn of_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self, CollocError> {
        let mut hasher = FxHasher::default();
        for path in paths {
            let path = path.as_ref();
            hash_file(&mut hasher, path).map_err(|source| CollocError::FileOpen {
                path: path.to_path_buf(),
                source,
            })?;
        }
        Ok(Self(hasher.finish()))
    }

    /// Mix build settings into the fingerprint
    pub fn with<H: Hash + ?Sized>(self, settings: &H) -> Self {
        let mut hasher = FxHasher::default();
        hasher.write_u64(self.0);
        settings.hash(&mut hasher);
        Self(hasher.finish())
    }
}

fn hash_file(hasher: &mut FxHasher, path: &Path) -> io::Result<()> {
    let canonical = fs::canonicalize(path)?;
    let meta = fs::metadata(&canonical)?;
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos());

    hasher.write(canonical.as_os_str().as_encoded_bytes());
    hasher.write_u64(meta.len());
    hasher.write_u128(mtime);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Header {
    magic: [u8; 8],
    schema_version: u32,
    kind: ArtifactKind,
    fingerprint: Fingerprint,
}

impl Header {
    fn new(kind: ArtifactKind, fingerprint: Fingerprint) -> Self {
        Self {
            magic: MAGIC,
            schema_version: SCHEMA_VERSION,
            kind,
            fingerprint,
        }
    }

    fn check(&self, path: &Path, kind: ArtifactKind, fingerprint: Fingerprint) -> Result<(), CacheError> {
        if self.magic != MAGIC {
            return Err(CacheError::Corrupt {
                path: path.to_path_buf(),
                source: Box::new(bincode::ErrorKind::Custom("bad magic bytes".to_string())),
            });
        }
        if self.schema_version != SCHEMA_VERSION {
            return Err(CacheError::VersionMismatch {
                path: path.to_path_buf(),
                found: self.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        if self.kind != kind {
            return Err(CacheError::KindMismatch {
                path: path.to_path_buf(),
                found: self.kind.to_string(),
                expected: kind.to_string(),
            });
        }
        if self.fingerprint != fingerprint {
            return Err(CacheError::SnapshotMismatch {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// Atomically write `payload` to `path` as an artifact of `kind`
pub fn save_artifact<T: Serialize>(
    path: &Path,
    kind: ArtifactKind,
    fingerprint: Fingerprint,
    payload: &T,
) -> Result<(), CacheError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        bincode::serialize_into(&mut writer, &Header::new(kind, fingerprint))
            .map_err(CacheError::Encode)?;
        bincode::serialize_into(&mut writer, payload).map_err(CacheError::Encode)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;

    debug!("wrote {kind} artifact to {}", path.display());
    Ok(())
}

/// Load an artifact of `kind`, refusing anything not built by this schema
/// version from the snapshot identified by `fingerprint`
pub fn load_artifact<T: DeserializeOwned>(
    path: &Path,
    kind: ArtifactKind,
    fingerprint: Fingerprint,
) -> Result<T, CacheError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(CacheError::Missing(path.to_path_buf()));
        }
        Err(err) => return Err(err.into()),
    };
    let mut reader = BufReader::new(file);

    let corrupt = |source| CacheError::Corrupt {
        path: path.to_path_buf(),
        source,
    };
    let header: Header = bincode::deserialize_from(&mut reader).map_err(corrupt)?;
    header.check(path, kind, fingerprint)?;
    bincode::deserialize_from(&mut reader).map_err(corrupt)
}

/// Saved state of an interrupted aggregation scan
#[derive(Debug, Clone, Deserialize)]
pub struct Checkpoint {
    /// Line pairs consumed from the corpus
    pub lines: u64,
    pub aggregator: Aggregator,
}

// Same layout as `Checkpoint`, without taking the aggregator by value
#[derive(Serialize)]
struct CheckpointRef<'a> {
    lines: u64,
    aggregator: &'a Aggregator,
}

/// A directory holding one file per artifact kind
#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    pub fn save<T: Serialize>(
        &self,
        kind: ArtifactKind,
        fingerprint: Fingerprint,
        payload: &T,
    ) -> Result<(), CacheError> {
        save_artifact(&self.path(kind), kind, fingerprint, payload)
    }

    pub fn load<T: DeserializeOwned>(
        &self,
        kind: ArtifactKind,
        fingerprint: Fingerprint,
    ) -> Result<T, CacheError> {
        load_artifact(&self.path(kind), kind, fingerprint)
    }

    /// Delete an artifact; a missing file is not an error
    pub fn remove(&self, kind: ArtifactKind) -> Result<(), CacheError> {
        match fs::remove_file(self.path(kind)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save_checkpoint(
        &self,
        fingerprint: Fingerprint,
        lines: u64,
        aggregator: &Aggregator,
    ) -> Result<(), CacheError> {
        let checkpoint = CheckpointRef { lines, aggregator };
        self.save(ArtifactKind::Checkpoint, fingerprint, &checkpoint)?;
        info!("checkpoint saved after {lines} lines");
        Ok(())
    }

    pub fn load_checkpoint(&self, fingerprint: Fingerprint) -> Result<Checkpoint, CacheError> {
        self.load(ArtifactKind::Checkpoint, fingerprint)
    }

    pub fn remove_checkpoint(&self) -> Result<(), CacheError> {
        self.remove(ArtifactKind::Checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::AlignedCorpus;
    use crate::counts::UnigramTable;
    use tempfile::TempDir;

    const FP: Fingerprint = Fingerprint(42);

    fn unigrams() -> UnigramTable {
        let mut table = UnigramTable::default();
        for lemma in ["kissa", "istua", "kissa"] {
            table.add(lemma);
        }
        table
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let cache = CacheDir::new(dir.path());
        cache.save(ArtifactKind::Unigrams, FP, &unigrams()).unwrap();

        let loaded: UnigramTable = cache.load(ArtifactKind::Unigrams, FP).unwrap();
        assert_eq!(loaded, unigrams());
        assert_eq!(loaded.freq_of("kissa"), 2);
    }

    #[test]
    fn test_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let cache = CacheDir::new(dir.path());
        let err = cache.load::<UnigramTable>(ArtifactKind::Unigrams, FP).unwrap_err();
        assert!(matches!(err, CacheError::Missing(_)));
    }

    #[test]
    fn test_version_mismatch_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unigrams.bin");

        let mut header = Header::new(ArtifactKind::Unigrams, FP);
        header.schema_version = SCHEMA_VERSION + 1;
        let mut bytes = bincode::serialize(&header).unwrap();
        bytes.extend(bincode::serialize(&unigrams()).unwrap());
        fs::write(&path, bytes).unwrap();

        let err = load_artifact::<UnigramTable>(&path, ArtifactKind::Unigrams, FP).unwrap_err();
        assert!(matches!(
            err,
            CacheError::VersionMismatch { found, expected, .. }
                if found == SCHEMA_VERSION + 1 && expected == SCHEMA_VERSION
        ));
    }

    #[test]
    fn test_version_checked_before_payload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bigrams.bin");

        // header from an older schema followed by garbage
        let mut header = Header::new(ArtifactKind::Bigrams, FP);
        header.schema_version = 0;
        let mut bytes = bincode::serialize(&header).unwrap();
        bytes.extend([0xff; 3]);
        fs::write(&path, bytes).unwrap();

        let err = load_artifact::<UnigramTable>(&path, ArtifactKind::Bigrams, FP).unwrap_err();
        assert!(matches!(err, CacheError::VersionMismatch { .. }));
    }

    #[test]
    fn test_kind_and_snapshot_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("artifact.bin");
        save_artifact(&path, ArtifactKind::Unigrams, FP, &unigrams()).unwrap();

        let err = load_artifact::<UnigramTable>(&path, ArtifactKind::Pos, FP).unwrap_err();
        assert!(matches!(err, CacheError::KindMismatch { .. }));

        let err = load_artifact::<UnigramTable>(&path, ArtifactKind::Unigrams, Fingerprint(7))
            .unwrap_err();
        assert!(matches!(err, CacheError::SnapshotMismatch { .. }));
    }

    #[test]
    fn test_truncated_or_foreign_file_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unigrams.bin");

        fs::write(&path, b"not a cache").unwrap();
        let err = load_artifact::<UnigramTable>(&path, ArtifactKind::Unigrams, FP).unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));

        save_artifact(&path, ArtifactKind::Unigrams, FP, &unigrams()).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();
        let err = load_artifact::<UnigramTable>(&path, ArtifactKind::Unigrams, FP).unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let cache = CacheDir::new(dir.path().join("nested"));
        cache.save(ArtifactKind::Unigrams, FP, &unigrams()).unwrap();
        cache.save(ArtifactKind::Unigrams, FP, &unigrams()).unwrap();

        let names: Vec<String> = fs::read_dir(cache.root())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["unigrams.bin".to_string()]);
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = CacheDir::new(dir.path());

        let mut aggregator = Aggregator::default();
        aggregator
            .add_all(AlignedCorpus::from_strs("hyvä päivä\n", "hyvää päivää\n"))
            .unwrap();
        cache.save_checkpoint(FP, 1, &aggregator).unwrap();

        let restored = cache.load_checkpoint(FP).unwrap();
        assert_eq!(restored.lines, 1);
        assert_eq!(restored.aggregator.sentences(), 1);
        assert_eq!(
            restored.aggregator.finish().bigram_freq("hyvä", "päivä"),
            1
        );

        cache.remove_checkpoint().unwrap();
        cache.remove_checkpoint().unwrap();
        assert!(matches!(
            cache.load_checkpoint(FP),
            Err(CacheError::Missing(_))
        ));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lemmas.txt");
        fs::write(&path, "kissa istua\n").unwrap();
        let before = Fingerprint::of_paths(&[&path]).unwrap();
        assert_eq!(before, Fingerprint::of_paths(&[&path]).unwrap());

        fs::write(&path, "kissa istua matto\n").unwrap();
        let after = Fingerprint::of_paths(&[&path]).unwrap();
        assert_ne!(before, after);

        let missing = dir.path().join("missing");
        let err = Fingerprint::of_paths(&[&path, &missing]).unwrap_err();
        assert!(matches!(err, CollocError::FileOpen { path, .. } if path == missing));
    }

    #[test]
    fn test_fingerprint_mixes_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lemmas.txt");
        fs::write(&path, "kissa istua\n").unwrap();
        let base = Fingerprint::of_paths(&[&path]).unwrap();

        assert_eq!(base.with(&(16usize, 8usize)), base.with(&(16usize, 8usize)));
        assert_ne!(base.with(&(16usize, 8usize)), base.with(&(16usize, 1usize)));
        assert_ne!(base.with(&["vrt"][..]), base.with(&["conllu"][..]));
    }
}
