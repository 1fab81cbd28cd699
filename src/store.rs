use log::warn;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Size of the emulated non-volatile area in bytes.
pub const STORE_SIZE: usize = 256;

/// Byte addressable non-volatile storage, EEPROM style: reads and
/// writes cannot fail at this level. Implementations that sit on
/// fallible media deal with trouble themselves and keep serving the
/// in-memory copy.
pub trait NvStore: Send {
    fn read_byte(&self, addr: u16) -> u8;
    fn write_byte(&mut self, addr: u16, value: u8);
}

/// Volatile stand-in, zero filled. Used when no backing file is
/// configured and in tests.
pub struct MemStore {
    bytes: [u8; STORE_SIZE],
}

impl MemStore {
    pub fn new() -> MemStore {
        MemStore {
            bytes: [0; STORE_SIZE],
        }
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NvStore for MemStore {
    fn read_byte(&self, addr: u16) -> u8 {
        self.bytes.get(addr as usize).copied().unwrap_or(0)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        if let Some(b) = self.bytes.get_mut(addr as usize) {
            *b = value;
        }
    }
}

/// File backed store. The whole area is loaded at open and written
/// through on every update; a failed flush keeps the in-memory copy
/// and logs, it never surfaces as a protocol error.
pub struct FileStore {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<FileStore> {
        let path = path.as_ref().to_path_buf();
        let mut bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        bytes.resize(STORE_SIZE, 0);
        Ok(FileStore { path, bytes })
    }

    fn flush(&self) {
        if let Err(e) = fs::write(&self.path, &self.bytes) {
            warn!("failed to write {}: {}", self.path.display(), e);
        }
    }
}

impl NvStore for FileStore {
    fn read_byte(&self, addr: u16) -> u8 {
        self.bytes.get(addr as usize).copied().unwrap_or(0)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        if let Some(b) = self.bytes.get_mut(addr as usize) {
            *b = value;
            self.flush();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mem_store_round_trip() {
        let mut store = MemStore::new();
        assert_eq!(store.read_byte(0), 0);
        store.write_byte(0, 0xa5);
        store.write_byte(7, 1);
        assert_eq!(store.read_byte(0), 0xa5);
        assert_eq!(store.read_byte(7), 1);
        // Out of range access is ignored, not a panic.
        store.write_byte(STORE_SIZE as u16, 1);
        assert_eq!(store.read_byte(STORE_SIZE as u16), 0);
    }

    #[test]
    fn file_store_persists() {
        let path = std::env::temp_dir().join(format!("dali_gateway_nvm_{}.bin", std::process::id()));
        let _ = fs::remove_file(&path);
        {
            let mut store = FileStore::open(&path).unwrap();
            assert_eq!(store.read_byte(3), 0);
            store.write_byte(3, 0x42);
        }
        {
            let store = FileStore::open(&path).unwrap();
            assert_eq!(store.read_byte(3), 0x42);
        }
        let _ = fs::remove_file(&path);
    }
}
