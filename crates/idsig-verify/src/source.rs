//! Where signature bytes come from.

use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Fetches raw v4 signature bytes for a package path.
///
/// `Ok(None)` means the package has no v4 signature; an empty buffer is
/// treated the same way by the verifier.
pub trait SignatureSource: Send + Sync {
    /// Fetch signature bytes for `path`.
    fn fetch(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;

    /// Size of the package file the signature is bound to.
    fn file_size(&self, path: &Path) -> io::Result<u64> {
        std::fs::metadata(path).map(|m| m.len())
    }
}

impl<F> SignatureSource for F
where
    F: Fn(&Path) -> io::Result<Option<Vec<u8>>> + Send + Sync,
{
    fn fetch(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        self(path)
    }
}

/// Reads `<package>.<extension>` next to the package, the layout signing
/// tools use when they write a v4 signature file.
#[derive(Debug, Clone)]
pub struct SidecarFileSource {
    extension: String,
}

impl SidecarFileSource {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    /// Path of the signature file for `package`.
    pub fn sidecar_path(&self, package: &Path) -> PathBuf {
        let mut name = OsString::from(package.as_os_str());
        name.push(".");
        name.push(&self.extension);
        PathBuf::from(name)
    }
}

impl Default for SidecarFileSource {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SIDECAR_EXTENSION)
    }
}

impl SignatureSource for SidecarFileSource {
    fn fetch(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        let sidecar = self.sidecar_path(path);
        match std::fs::read(&sidecar) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %sidecar.display(), "no v4 signature file");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Fixed in-memory signatures and file sizes.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    entries: HashMap<PathBuf, (Vec<u8>, u64)>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register signature bytes for a package of `file_size` bytes.
    pub fn insert(&mut self, path: impl Into<PathBuf>, signature: Vec<u8>, file_size: u64) {
        self.entries.insert(path.into(), (signature, file_size));
    }

    pub fn with_entry(
        mut self,
        path: impl Into<PathBuf>,
        signature: Vec<u8>,
        file_size: u64,
    ) -> Self {
        self.insert(path, signature, file_size);
        self
    }
}

impl SignatureSource for InMemorySource {
    fn fetch(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        Ok(self.entries.get(path).map(|(bytes, _)| bytes.clone()))
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        self.entries
            .get(path)
            .map(|(_, size)| *size)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "package not registered"))
    }
}
