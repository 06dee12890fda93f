use std::fmt;

use tracing::{trace, warn};

use crate::error::MemoryError;

/// Bytes per page (one 64K segment).
pub const PAGE_SIZE: usize = 0x10000;

/// Anything that looks like paged, bounds-checked memory.
///
/// `Memory` is the real store; `TracedMemory` decorates any other bus and
/// records every access it forwards. Handlers only ever see `&mut dyn MemoryBus`.
pub trait MemoryBus {
    fn page_count(&self) -> usize;
    fn active_page(&self) -> usize;

    /// Reading takes `&mut self` so decorators can log the access.
    fn peek(&mut self, page: usize, address: usize) -> Result<u8, MemoryError>;

    /// `value` must be 0-255. On any error nothing is written.
    fn poke(&mut self, page: usize, address: usize, value: u32) -> Result<(), MemoryError>;

    fn peek_active(&mut self, address: usize) -> Result<u8, MemoryError> {
        let page = self.active_page();
        self.peek(page, address)
    }

    fn poke_active(&mut self, address: usize, value: u32) -> Result<(), MemoryError> {
        let page = self.active_page();
        self.poke(page, address, value)
    }

    /// Writes the bytes of `text` starting at `address`. The whole range is
    /// checked up front so a string that would overflow the page writes nothing.
    fn poke_str(&mut self, page: usize, address: usize, text: &str) -> Result<(), MemoryError> {
        self.poke_bytes(page, address, text.as_bytes())
    }

    fn poke_bytes(&mut self, page: usize, address: usize, bytes: &[u8]) -> Result<(), MemoryError> {
        check_page(page, self.page_count())?;
        if address >= PAGE_SIZE {
            return Err(MemoryError::InvalidAddress(address));
        }
        if address + bytes.len() > PAGE_SIZE {
            return Err(MemoryError::Overflow {
                address,
                len: bytes.len(),
            });
        }
        for (i, b) in bytes.iter().enumerate() {
            self.poke(page, address + i, *b as u32)?;
        }
        Ok(())
    }

    /// Little-endian word read. The high byte wraps to offset 0 at the page end.
    fn read_16(&mut self, page: usize, address: usize) -> Result<u16, MemoryError> {
        let low = self.peek(page, address)? as u16;
        let high = self.peek(page, (address + 1) & 0xFFFF)? as u16;
        Ok((high << 8) | low)
    }

    /// Little-endian word write. Both bytes are checked before either is written.
    fn write_16(&mut self, page: usize, address: usize, value: u16) -> Result<(), MemoryError> {
        check_page(page, self.page_count())?;
        if address >= PAGE_SIZE {
            return Err(MemoryError::InvalidAddress(address));
        }
        self.poke(page, address, (value & 0x00FF) as u32)?;
        self.poke(page, (address + 1) & 0xFFFF, (value >> 8) as u32)
    }
}

fn check_page(page: usize, pages: usize) -> Result<(), MemoryError> {
    if page >= pages {
        return Err(MemoryError::InvalidPage { page, pages });
    }
    Ok(())
}

fn check_access(page: usize, pages: usize, address: usize) -> Result<(), MemoryError> {
    check_page(page, pages)?;
    if address >= PAGE_SIZE {
        return Err(MemoryError::InvalidAddress(address));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Memory {
    pages: Vec<Vec<u8>>,
    active_page: usize,
}

impl Memory {
    /// `pages` 64K pages, page 0 active. Zero is raised to one page; callers
    /// that must refuse an empty machine check before constructing.
    pub fn new(pages: usize) -> Self {
        Self {
            pages: vec![vec![0; PAGE_SIZE]; pages.max(1)],
            active_page: 0,
        }
    }

    pub fn set_active_page(&mut self, page: usize) -> Result<(), MemoryError> {
        check_page(page, self.pages.len())?;
        self.active_page = page;
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(1)
    }
}

impl MemoryBus for Memory {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn active_page(&self) -> usize {
        self.active_page
    }

    fn peek(&mut self, page: usize, address: usize) -> Result<u8, MemoryError> {
        check_access(page, self.pages.len(), address).inspect_err(|e| warn!("[MEM] {}", e))?;
        Ok(self.pages[page][address])
    }

    fn poke(&mut self, page: usize, address: usize, value: u32) -> Result<(), MemoryError> {
        check_access(page, self.pages.len(), address).inspect_err(|e| warn!("[MEM] {}", e))?;
        if value > 0xFF {
            warn!("[MEM] rejected value {} at {:04X}:{:04X}", value, page, address);
            return Err(MemoryError::InvalidValue(value));
        }
        self.pages[page][address] = value as u8;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// One forwarded memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemAccess {
    pub direction: Access,
    pub page: usize,
    pub address: usize,
    pub value: u8,
}

impl fmt::Display for MemAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = match self.direction {
            Access::Read => 'R',
            Access::Write => 'W',
        };
        write!(f, "{}[p{}:{:04X}]={:02X}", d, self.page, self.address, self.value)
    }
}

/// Decorates a bus, logging every access it forwards. Lives for one
/// instruction; the log is handed to the trace formatter afterwards.
pub struct TracedMemory<'a, M: MemoryBus + ?Sized> {
    inner: &'a mut M,
    log: Vec<MemAccess>,
}

impl<'a, M: MemoryBus + ?Sized> TracedMemory<'a, M> {
    pub fn new(inner: &'a mut M) -> Self {
        Self {
            inner,
            log: Vec::new(),
        }
    }

    pub fn accesses(&self) -> &[MemAccess] {
        &self.log
    }

    pub fn into_log(self) -> Vec<MemAccess> {
        self.log
    }

    fn record(&mut self, direction: Access, page: usize, address: usize, value: u8) {
        trace!(?direction, page, address, value, "memory access");
        self.log.push(MemAccess {
            direction,
            page,
            address,
            value,
        });
    }
}

impl<M: MemoryBus + ?Sized> MemoryBus for TracedMemory<'_, M> {
    fn page_count(&self) -> usize {
        self.inner.page_count()
    }

    fn active_page(&self) -> usize {
        self.inner.active_page()
    }

    fn peek(&mut self, page: usize, address: usize) -> Result<u8, MemoryError> {
        let value = self.inner.peek(page, address)?;
        self.record(Access::Read, page, address, value);
        Ok(value)
    }

    fn poke(&mut self, page: usize, address: usize, value: u32) -> Result<(), MemoryError> {
        self.inner.poke(page, address, value)?;
        self.record(Access::Write, page, address, value as u8);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_checked() {
        let mut mem = Memory::new(2);
        assert_eq!(
            mem.peek(2, 0),
            Err(MemoryError::InvalidPage { page: 2, pages: 2 })
        );
        assert_eq!(mem.peek(0, 0x10000), Err(MemoryError::InvalidAddress(0x10000)));
        assert_eq!(mem.poke(0, 5, 256), Err(MemoryError::InvalidValue(256)));
        assert_eq!(mem.peek(0, 5), Ok(0));

        mem.poke(1, 0xFFFF, 0xAB).unwrap();
        assert_eq!(mem.peek(1, 0xFFFF), Ok(0xAB));
        assert_eq!(mem.peek_active(0xFFFF), Ok(0));
    }

    #[test]
    fn string_overflow_writes_nothing() {
        let mut mem = Memory::new(1);
        assert!(matches!(
            mem.poke_str(0, 0xFFFE, "abc"),
            Err(MemoryError::Overflow { .. })
        ));
        assert_eq!(mem.peek(0, 0xFFFE), Ok(0));
        assert_eq!(mem.peek(0, 0xFFFF), Ok(0));

        mem.poke_str(0, 0xFFFD, "abc").unwrap();
        assert_eq!(mem.peek(0, 0xFFFF), Ok(b'c'));
    }

    #[test]
    fn traced_memory_logs_and_forwards() {
        let mut mem = Memory::new(1);
        {
            let mut traced = TracedMemory::new(&mut mem);
            traced.poke(0, 0x200, 0x48).unwrap();
            assert_eq!(traced.peek(0, 0x200), Ok(0x48));
            // Rejected accesses reach nothing and log nothing
            assert!(traced.poke(0, 0x201, 300).is_err());
            let log = traced.into_log();
            assert_eq!(log.len(), 2);
            assert_eq!(log[0].to_string(), "W[p0:0200]=48");
            assert_eq!(log[1].to_string(), "R[p0:0200]=48");
        }
        assert_eq!(mem.peek(0, 0x200), Ok(0x48));
    }

    #[test]
    fn words_are_little_endian() {
        let mut mem = Memory::new(1);
        mem.write_16(0, 0x10, 0x1234).unwrap();
        assert_eq!(mem.peek(0, 0x10), Ok(0x34));
        assert_eq!(mem.peek(0, 0x11), Ok(0x12));
        assert_eq!(mem.read_16(0, 0x10), Ok(0x1234));
    }
}
