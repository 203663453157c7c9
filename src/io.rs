//! Byte-stream endpoints and transformations.
//!
//! License keys travel as whole byte blobs: a [`Source`] yields them, a
//! [`Sink`] accepts them, and a [`Store`] is both plus existence/delete
//! semantics. A [`Transformation`] is a reversible byte filter (compression,
//! encryption) that composes left-to-right in the write direction and is
//! undone in the opposite order on read.

use crate::errors::KeywrightError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Stable identity of a [`Source`], used as a cache key by consumer managers.
///
/// Filesystem sources are identified by path, in-memory sources by a unique
/// per-instance id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceToken {
    /// A filesystem-backed source, identified by its path.
    Path(PathBuf),
    /// An anonymous in-memory source, identified by instance.
    Instance(u64),
}

/// Readable byte-stream endpoint.
pub trait Source: Send + Sync {
    /// The cache identity of this source.
    fn token(&self) -> SourceToken;

    /// Reads the full contents of this source.
    fn read(&self) -> Result<Vec<u8>, KeywrightError>;
}

/// Writable byte-stream endpoint.
pub trait Sink: Send + Sync {
    /// Replaces the contents of this sink.
    fn write(&self, data: &[u8]) -> Result<(), KeywrightError>;
}

/// Persistent byte container with existence and delete semantics.
pub trait Store: Source + Sink {
    /// Returns whether the store currently holds data.
    fn exists(&self) -> Result<bool, KeywrightError>;

    /// Deletes the stored data. Fails if nothing is stored.
    fn delete(&self) -> Result<(), KeywrightError>;
}

/// Reversible byte-stream filter.
///
/// `apply` runs in the write direction (plain to wire), `unapply` in the
/// read direction. For every transformation `t` and input `b`,
/// `t.unapply(&t.apply(b)?)? == b`.
pub trait Transformation: Send + Sync {
    /// Transforms data in the write direction.
    fn apply(&self, data: &[u8]) -> Result<Vec<u8>, KeywrightError>;

    /// Reverses the transformation in the read direction.
    fn unapply(&self, data: &[u8]) -> Result<Vec<u8>, KeywrightError>;
}

/// Left-to-right composition of two transformations.
///
/// Writing applies `first` then `second`; reading undoes `second` then
/// `first`.
pub struct ChainedTransformation {
    first: Arc<dyn Transformation>,
    second: Arc<dyn Transformation>,
}

impl ChainedTransformation {
    /// Composes `first` with `second` in write order.
    pub fn new(first: Arc<dyn Transformation>, second: Arc<dyn Transformation>) -> Self {
        Self { first, second }
    }
}

impl Transformation for ChainedTransformation {
    fn apply(&self, data: &[u8]) -> Result<Vec<u8>, KeywrightError> {
        self.second.apply(&self.first.apply(data)?)
    }

    fn unapply(&self, data: &[u8]) -> Result<Vec<u8>, KeywrightError> {
        self.first.unapply(&self.second.unapply(data)?)
    }
}

/// The do-nothing transformation.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformation;

impl Transformation for IdentityTransformation {
    fn apply(&self, data: &[u8]) -> Result<Vec<u8>, KeywrightError> {
        Ok(data.to_vec())
    }

    fn unapply(&self, data: &[u8]) -> Result<Vec<u8>, KeywrightError> {
        Ok(data.to_vec())
    }
}

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// In-memory store.
///
/// Useful as a scratch target for key generation (the chained manager probes
/// its signing capability against one) and in tests.
pub struct MemoryStore {
    id: u64,
    data: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self {
            id: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            data: Mutex::new(None),
        }
    }

    /// Creates an in-memory store holding the given bytes.
    pub fn with_data(data: Vec<u8>) -> Self {
        let store = Self::new();
        *store.data.lock().unwrap_or_else(PoisonError::into_inner) = Some(data);
        store
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for MemoryStore {
    fn token(&self) -> SourceToken {
        SourceToken::Instance(self.id)
    }

    fn read(&self) -> Result<Vec<u8>, KeywrightError> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| KeywrightError::Store("memory store is empty".to_string()))
    }
}

impl Sink for MemoryStore {
    fn write(&self, data: &[u8]) -> Result<(), KeywrightError> {
        *self.data.lock().unwrap_or_else(PoisonError::into_inner) = Some(data.to_vec());
        Ok(())
    }
}

impl Store for MemoryStore {
    fn exists(&self) -> Result<bool, KeywrightError> {
        Ok(self
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some())
    }

    fn delete(&self) -> Result<(), KeywrightError> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|_| ())
            .ok_or_else(|| KeywrightError::Store("memory store is empty".to_string()))
    }
}

/// Filesystem store with atomic writes.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// concurrent reader sees either the old or the new key, never a torn one.
pub struct PathStore {
    path: PathBuf,
}

impl PathStore {
    /// Creates a store at the given path. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store under the OS user data directory,
    /// `<data_dir>/<namespace>/<name>`, creating the directory if needed.
    pub fn in_user_data(namespace: &str, name: &str) -> Result<Self, KeywrightError> {
        let base = dirs::data_dir()
            .ok_or_else(|| KeywrightError::Store("could not find user data directory".into()))?;
        let dir = base.join(namespace);
        fs::create_dir_all(&dir)?;
        Ok(Self::new(dir.join(name)))
    }

    /// The path this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Source for PathStore {
    fn token(&self) -> SourceToken {
        SourceToken::Path(self.path.clone())
    }

    fn read(&self) -> Result<Vec<u8>, KeywrightError> {
        Ok(fs::read(&self.path)?)
    }
}

impl Sink for PathStore {
    fn write(&self, data: &[u8]) -> Result<(), KeywrightError> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Store for PathStore {
    fn exists(&self) -> Result<bool, KeywrightError> {
        Ok(self.path.exists())
    }

    fn delete(&self) -> Result<(), KeywrightError> {
        Ok(fs::remove_file(&self.path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Reverse;

    impl Transformation for Reverse {
        fn apply(&self, data: &[u8]) -> Result<Vec<u8>, KeywrightError> {
            Ok(data.iter().rev().copied().collect())
        }

        fn unapply(&self, data: &[u8]) -> Result<Vec<u8>, KeywrightError> {
            self.apply(data)
        }
    }

    struct AppendByte(u8);

    impl Transformation for AppendByte {
        fn apply(&self, data: &[u8]) -> Result<Vec<u8>, KeywrightError> {
            let mut out = data.to_vec();
            out.push(self.0);
            Ok(out)
        }

        fn unapply(&self, data: &[u8]) -> Result<Vec<u8>, KeywrightError> {
            match data.split_last() {
                Some((last, rest)) if *last == self.0 => Ok(rest.to_vec()),
                _ => Err(KeywrightError::Unexpected("marker missing".into())),
            }
        }
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(!store.exists().unwrap());
        store.write(b"key material").unwrap();
        assert!(store.exists().unwrap());
        assert_eq!(store.read().unwrap(), b"key material");
        store.delete().unwrap();
        assert!(!store.exists().unwrap());
    }

    #[test]
    fn memory_store_read_empty_fails() {
        let store = MemoryStore::new();
        assert!(matches!(store.read(), Err(KeywrightError::Store(_))));
    }

    #[test]
    fn memory_store_tokens_are_distinct() {
        assert_ne!(MemoryStore::new().token(), MemoryStore::new().token());
    }

    #[test]
    fn path_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = PathStore::new(dir.path().join("license.key"));
        assert!(!store.exists().unwrap());
        store.write(b"bytes").unwrap();
        assert_eq!(store.read().unwrap(), b"bytes");
        store.delete().unwrap();
        assert!(!store.exists().unwrap());
    }

    #[test]
    fn path_store_token_is_path() {
        let store = PathStore::new("/tmp/k.lic");
        assert_eq!(store.token(), SourceToken::Path(PathBuf::from("/tmp/k.lic")));
    }

    #[test]
    fn path_store_delete_missing_fails() {
        let dir = TempDir::new().unwrap();
        let store = PathStore::new(dir.path().join("absent"));
        assert!(store.delete().is_err());
    }

    #[test]
    fn chained_transformation_order() {
        let chained = ChainedTransformation::new(Arc::new(AppendByte(0xAA)), Arc::new(Reverse));
        let wire = chained.apply(b"abc").unwrap();
        // Append runs first, reverse second.
        assert_eq!(wire, vec![0xAA, b'c', b'b', b'a']);
        assert_eq!(chained.unapply(&wire).unwrap(), b"abc");
    }

    #[test]
    fn identity_transformation_is_identity() {
        let id = IdentityTransformation;
        assert_eq!(id.apply(b"x").unwrap(), b"x");
        assert_eq!(id.unapply(b"x").unwrap(), b"x");
    }
}
