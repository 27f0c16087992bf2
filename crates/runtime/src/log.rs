//! Log file writer and loader
//!
//! File access goes through the [`FileStorage`] trait, a handle-based
//! interface shaped like the host's file-system API (open, seek, read,
//! write, close). [`StdStorage`] implements it over `std::fs`.
//!
//! `LogWriter::write` appends one newline-terminated record per string. The
//! file is created (truncated) when creation is forced or when it does not
//! exist yet; otherwise it is opened and written at its end. Errors are
//! values: natives turn them into a logical result instead of failing the
//! call.

use crate::config::BridgeConfig;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    ReadWrite,
    /// Create or truncate, then read/write
    Create,
}

/// Open file handle issued by a [`FileStorage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

pub trait FileStorage {
    fn exists(&self, path: &Path) -> bool;
    fn open(&mut self, path: &Path, mode: OpenMode) -> io::Result<Handle>;
    /// Read from the current position to the end into `buf`
    fn read(&mut self, handle: Handle, buf: &mut Vec<u8>) -> io::Result<usize>;
    fn write(&mut self, handle: Handle, data: &[u8]) -> io::Result<usize>;
    fn seek(&mut self, handle: Handle, pos: SeekFrom) -> io::Result<u64>;
    fn size(&mut self, handle: Handle) -> io::Result<u64>;
    fn close(&mut self, handle: Handle) -> io::Result<()>;
}

impl<S: FileStorage + ?Sized> FileStorage for Box<S> {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn open(&mut self, path: &Path, mode: OpenMode) -> io::Result<Handle> {
        (**self).open(path, mode)
    }

    fn read(&mut self, handle: Handle, buf: &mut Vec<u8>) -> io::Result<usize> {
        (**self).read(handle, buf)
    }

    fn write(&mut self, handle: Handle, data: &[u8]) -> io::Result<usize> {
        (**self).write(handle, data)
    }

    fn seek(&mut self, handle: Handle, pos: SeekFrom) -> io::Result<u64> {
        (**self).seek(handle, pos)
    }

    fn size(&mut self, handle: Handle) -> io::Result<u64> {
        (**self).size(handle)
    }

    fn close(&mut self, handle: Handle) -> io::Result<()> {
        (**self).close(handle)
    }
}

/// [`FileStorage`] over the real file system
#[derive(Debug, Default)]
pub struct StdStorage {
    files: HashMap<Handle, File>,
    next: u32,
}

impl StdStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn file(&mut self, handle: Handle) -> io::Result<&mut File> {
        self.files.get_mut(&handle).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "unknown file handle")
        })
    }

    /// Number of handles currently open
    pub fn open_count(&self) -> usize {
        self.files.len()
    }
}

impl FileStorage for StdStorage {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn open(&mut self, path: &Path, mode: OpenMode) -> io::Result<Handle> {
        let file = match mode {
            OpenMode::Read => File::open(path)?,
            OpenMode::ReadWrite => OpenOptions::new().read(true).write(true).open(path)?,
            OpenMode::Create => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
        };
        self.next = self.next.wrapping_add(1);
        let handle = Handle(self.next);
        self.files.insert(handle, file);
        Ok(handle)
    }

    fn read(&mut self, handle: Handle, buf: &mut Vec<u8>) -> io::Result<usize> {
        self.file(handle)?.read_to_end(buf)
    }

    fn write(&mut self, handle: Handle, data: &[u8]) -> io::Result<usize> {
        let file = self.file(handle)?;
        file.write_all(data)?;
        Ok(data.len())
    }

    fn seek(&mut self, handle: Handle, pos: SeekFrom) -> io::Result<u64> {
        self.file(handle)?.seek(pos)
    }

    fn size(&mut self, handle: Handle) -> io::Result<u64> {
        Ok(self.file(handle)?.metadata()?.len())
    }

    fn close(&mut self, handle: Handle) -> io::Result<()> {
        match self.files.remove(&handle) {
            Some(file) => file.sync_all(),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "unknown file handle",
            )),
        }
    }
}

pub struct LogWriter<S: FileStorage = StdStorage> {
    storage: S,
    newline: String,
    base_dir: Option<PathBuf>,
}

impl<S: FileStorage> LogWriter<S> {
    pub fn new(storage: S) -> Self {
        LogWriter {
            storage,
            newline: "\n".to_string(),
            base_dir: None,
        }
    }

    pub fn from_config(storage: S, config: &BridgeConfig) -> Self {
        LogWriter {
            storage,
            newline: config.log_newline.clone(),
            base_dir: config.log_dir.clone(),
        }
    }

    pub fn with_newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = newline.into();
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Relative paths resolve against the base directory, if one is set
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Append `records`, one per line
    pub fn write<R: AsRef<[u8]>>(
        &mut self,
        path: impl AsRef<Path>,
        create: bool,
        records: &[R],
    ) -> io::Result<()> {
        let path = self.resolve(path.as_ref());
        let handle = if create || !self.storage.exists(&path) {
            self.storage.open(&path, OpenMode::Create)?
        } else {
            self.storage.open(&path, OpenMode::ReadWrite)?
        };

        let written = self.append(handle, records);
        let closed = self.storage.close(handle);
        written.and(closed)
    }

    fn append<R: AsRef<[u8]>>(&mut self, handle: Handle, records: &[R]) -> io::Result<()> {
        self.storage.seek(handle, SeekFrom::End(0))?;
        for record in records {
            self.storage.write(handle, record.as_ref())?;
            self.storage.write(handle, self.newline.as_bytes())?;
        }
        Ok(())
    }

    /// Whole content of a log file
    pub fn load(&mut self, path: impl AsRef<Path>) -> io::Result<Vec<u8>> {
        let path = self.resolve(path.as_ref());
        let handle = self.storage.open(&path, OpenMode::Read)?;

        let mut content = Vec::new();
        let read = self
            .storage
            .size(handle)
            .and_then(|size| {
                content.reserve(usize::try_from(size).unwrap_or(0));
                self.storage.seek(handle, SeekFrom::Start(0))
            })
            .and_then(|_| self.storage.read(handle, &mut content));
        let closed = self.storage.close(handle);
        read.and(closed)?;
        Ok(content)
    }
}
