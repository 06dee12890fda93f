use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::DiskError;

/// Default number of bytes (sectors) on a virtual disk.
pub const DEFAULT_DISK_SIZE: usize = 512;

/// Fixed-size virtual block device. One byte per sector, bound to a host
/// file that is only touched by explicit `load`/`save` calls.
#[derive(Debug, Clone)]
pub struct Disk {
    path: PathBuf,
    size: usize,
    blocks: Vec<u8>,
}

/// Directory holding disk files when none is given: the user's home, else `.`.
pub fn default_disk_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Disk {
    /// Binds to `~/.<name>`.
    pub fn new(size: usize, name: &str) -> Self {
        Self::with_dir(size, name, default_disk_dir())
    }

    pub fn with_dir(size: usize, name: &str, dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!(".{}", name)),
            size,
            blocks: vec![0; size],
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn check_sector(&self, sector: i64) -> Result<usize, DiskError> {
        if sector < 0 || sector as u64 >= self.size as u64 {
            return Err(DiskError::InvalidSector {
                sector,
                size: self.size,
            });
        }
        Ok(sector as usize)
    }

    pub fn write(&mut self, sector: i64, value: u32) -> Result<(), DiskError> {
        let index = self
            .check_sector(sector)
            .inspect_err(|e| warn!("[DISK] {}", e))?;
        if value > 0xFF {
            warn!("[DISK] rejected value {} for sector {}", value, sector);
            return Err(DiskError::InvalidValue(value));
        }
        self.blocks[index] = value as u8;
        Ok(())
    }

    pub fn read(&self, sector: i64) -> Result<u8, DiskError> {
        let index = self
            .check_sector(sector)
            .inspect_err(|e| warn!("[DISK] {}", e))?;
        Ok(self.blocks[index])
    }

    /// Replaces the blocks with the bound file's contents, truncated or
    /// zero-padded to the disk size. Returns the number of bytes taken from the file.
    pub fn load(&mut self) -> Result<usize, DiskError> {
        let mut data = Vec::new();
        File::open(&self.path)
            .and_then(|mut f| f.read_to_end(&mut data))
            .map_err(|source| {
                warn!("[DISK] problem opening {}: {}", self.path.display(), source);
                DiskError::Io {
                    path: self.path.clone(),
                    source,
                }
            })?;

        let used = data.len().min(self.size);
        data.resize(self.size, 0);
        self.blocks = data;
        info!("[DISK] loaded {} byte(s) from {}", used, self.path.display());
        Ok(used)
    }

    /// Overwrites the bound file with every block. Returns the bytes written,
    /// which is always the disk size.
    pub fn save(&self) -> Result<usize, DiskError> {
        let io_err = |source| {
            warn!("[DISK] problem writing {}: {}", self.path.display(), source);
            DiskError::Io {
                path: self.path.clone(),
                source,
            }
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let mut file = File::create(&self.path).map_err(io_err)?;
        file.write_all(&self.blocks).map_err(io_err)?;
        info!("[DISK] wrote {} byte(s) to {}", self.blocks.len(), self.path.display());
        Ok(self.blocks.len())
    }

    /// Hex + ASCII listing of sectors `[start, end)`, 16 per row, rows prefixed
    /// with a 6-digit sector number.
    pub fn dump(&self, start: usize, end: usize) -> Result<Vec<String>, DiskError> {
        if start > end || end > self.size {
            let bad = if start > end { start } else { end };
            return Err(DiskError::InvalidSector {
                sector: i64::try_from(bad).unwrap_or(i64::MAX),
                size: self.size,
            });
        }
        Ok(self.blocks[start..end]
            .chunks(16)
            .enumerate()
            .map(|(row, chunk)| format!("{:06X}  {}", start + row * 16, crate::cpu::hex_ascii(chunk)))
            .collect())
    }
}
