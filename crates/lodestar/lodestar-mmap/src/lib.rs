use memmap2::MmapMut;
use std::{
    fs::{File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

/// A fixed-size, file-backed shared segment mapped read-write.
///
/// The segment is created if it does not exist yet and is never truncated,
/// so bytes a producer already wrote survive a consumer attaching.
pub struct SharedSegment {
    _file: File,
    mmap: MmapMut,
    path: PathBuf,
}

impl SharedSegment {
    /// Create the backing file if needed, grow it to `size_bytes` and map it
    /// read-write.
    pub fn create_or_open<P: AsRef<Path>>(path: P, size_bytes: u64) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        // Only grow. A producer may have sized the segment first.
        if file.metadata()?.len() < size_bytes {
            file.set_len(size_bytes)?;
        }

        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self {
            _file: file,
            mmap,
            path,
        })
    }

    /// Open an existing segment and map it read-write. Fails if the backing
    /// file does not exist; this is how a producer attaches.
    pub fn open_existing<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self {
            _file: file,
            mmap,
            path,
        })
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.mmap
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
