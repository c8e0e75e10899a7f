use std::{
    collections::HashMap,
    fs::{self, File},
    io::{self, ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use fs4::fs_std::FileExt;
use tracing::debug;

/// Interface for abstracting the string store state is kept in. Writes to a single key are
/// expected to be atomic, nothing is promised across keys.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore {
    /// Returns `None` when nothing is stored under `key`.
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> io::Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> io::Result<()>;
}

/// Keeps everything in memory. Used in tests and when nothing should touch the disk.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// The main realization of [KeyValueStore]. Every key is a `<key>.json` file inside a directory.
/// Readers take a shared lock and writers an exclusive one, so a reader never sees half of a
/// write.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Result<Self, io::Error> {
        fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.path_for(key);
        debug!("Reading {path:?}");
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        FileExt::lock_shared(&file)?;
        let mut value = String::new();
        let result = file.read_to_string(&mut value);
        FileExt::unlock(&file)?;
        result?;

        Ok(Some(value))
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key);
        debug!("Writing {} bytes into {path:?}", value.len());
        // Truncation has to wait for the lock, otherwise a reader could observe an empty file.
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        FileExt::lock_exclusive(&file)?;
        let result = write_locked(&mut file, value);
        FileExt::unlock(&file)?;
        result
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        let path = self.path_for(key);
        debug!("Removing {path:?}");
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn write_locked(file: &mut File, value: &str) -> io::Result<()> {
    file.set_len(0)?;
    file.write_all(value.as_bytes())?;
    file.sync_data()
}
