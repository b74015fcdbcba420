//! Shared-memory object naming and mmap wrappers for basalt.
//!
//! A region is a plain file in the host's shared-memory namespace
//! (`/dev/shm` on Linux, the temp dir elsewhere) so that unrelated
//! processes can attach to it by name. The wrappers keep the `File`
//! handle alive for as long as the mapping exists.

use memmap2::{Mmap, MmapMut, MmapOptions};
use std::{
    fs, io,
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

/// Resolves a region name to its backing path in the shared-memory
/// namespace. A leading `/` in the name (POSIX shm convention) is
/// stripped.
pub fn shm_path(name: &str) -> PathBuf {
    let name = name.trim_start_matches('/');
    shm_dir().join(name)
}

/// Removes the backing object for a region name. Attached processes keep
/// their mappings; the name simply stops resolving.
pub fn shm_unlink(name: &str) -> io::Result<()> {
    fs::remove_file(shm_path(name))
}

#[cfg(target_os = "linux")]
fn shm_dir() -> PathBuf {
    PathBuf::from("/dev/shm")
}

#[cfg(not(target_os = "linux"))]
fn shm_dir() -> PathBuf {
    std::env::temp_dir()
}

pub struct ShmMapMut {
    /// File handle kept alive to maintain the memory map validity
    _file: File,
    /// Memory-mapped region providing mutable access to file contents
    mmap: MmapMut,
}

pub struct ShmMap {
    /// File handle kept alive to maintain the memory map validity
    _file: File,
    /// Memory-mapped region providing read-only access to file contents
    mmap: Mmap,
}

impl ShmMapMut {
    /// Create a new file of `size_bytes` (replacing any previous
    /// contents) and map it read-write.
    pub fn create_rw<P: AsRef<Path>>(path: P, size_bytes: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.set_len(size_bytes)?;

        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Open an existing file and map exactly `len` bytes read-write.
    /// Fails if the file is shorter than `len`.
    pub fn open_rw_len<P: AsRef<Path>>(path: P, len: u64) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        if file.metadata()?.len() < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "shared-memory object is shorter than the requested mapping",
            ));
        }

        let mmap = unsafe { MmapOptions::new().len(len as usize).map_mut(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Return raw pointer to start of memory mapped file data
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.len() == 0
    }
}

impl ShmMap {
    /// Open an existing file and map its first `len` bytes read-only.
    /// Used as a bounded probe of a region header before committing to a
    /// full-size mapping.
    pub fn open_ro_len<P: AsRef<Path>>(path: P, len: u64) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        if file.metadata()?.len() < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "shared-memory object is shorter than the requested mapping",
            ));
        }

        let mmap = unsafe { MmapOptions::new().len(len as usize).map(&file)? };
        Ok(Self { _file: file, mmap })
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.len() == 0
    }
}
