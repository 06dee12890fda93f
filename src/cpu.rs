use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::assembler;
use crate::console::{Console, StdConsole};
use crate::debugger::{ContSummary, Step, StopReason};
use crate::disk::{default_disk_dir, Disk, DEFAULT_DISK_SIZE};
use crate::error::{DiskError, EmuError, MemoryError, Result};
use crate::instructions::Outcome;
use crate::memory::{Memory, MemoryBus, PAGE_SIZE};
use crate::parser::{InstructionParser, TraceSink, DEFAULT_MAX_STEPS};
use crate::registers::RegisterSet;

/// Default program base address (the .COM entry point).
pub const DEFAULT_BASE_ADDR: u16 = 0x0100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    Running,
    /// INT 21h/4Ch was executed with this exit code.
    Terminated(u8),
}

/// Machine shape. Mirrors the command line options of the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuConfig {
    pub pages: usize,
    pub active_page: usize,
    pub disk_size: usize,
    pub disk_name: String,
    /// Directory holding the disk file; the home directory when `None`.
    pub disk_dir: Option<PathBuf>,
    pub base_addr: u16,
    pub trace: bool,
    pub max_steps: usize,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            pages: 1,
            active_page: 0,
            disk_size: DEFAULT_DISK_SIZE,
            disk_name: "vdisk".to_string(),
            disk_dir: None,
            base_addr: DEFAULT_BASE_ADDR,
            trace: false,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

pub struct Cpu<C: Console = StdConsole> {
    pub parser: InstructionParser,
    pub memory: Memory,
    pub disk: Disk,
    pub console: C,
    pub state: CpuState,
    pub config: CpuConfig,
}

impl Cpu<StdConsole> {
    pub fn new(config: CpuConfig) -> Result<Self> {
        Self::with_console(config, StdConsole)
    }
}

impl<C: Console> Cpu<C> {
    pub fn with_console(config: CpuConfig, console: C) -> Result<Self> {
        if config.pages == 0 {
            return Err(MemoryError::InvalidPage {
                page: config.active_page,
                pages: 0,
            }
            .into());
        }
        let mut memory = Memory::new(config.pages);
        memory.set_active_page(config.active_page)?;

        let dir = config.disk_dir.clone().unwrap_or_else(default_disk_dir);
        let disk = Disk::with_dir(config.disk_size, &config.disk_name, dir);

        let mut parser = InstructionParser::new();
        parser.max_steps = config.max_steps;
        if config.trace {
            parser.enable_trace(true, None);
        }

        Ok(Self {
            parser,
            memory,
            disk,
            console,
            state: CpuState::Running,
            config,
        })
    }

    pub fn registers(&self) -> &RegisterSet {
        &self.parser.registers
    }

    pub fn set_register(&mut self, name: &str, value: u32) -> Result<()> {
        self.parser.registers.commit();
        self.parser.registers.set_by_name(name, value)?;
        Ok(())
    }

    /// Register listing, changed registers marked with `*`.
    pub fn register_lines(&self) -> Vec<String> {
        self.parser.registers.dump_lines()
    }

    fn track(&mut self, outcome: Outcome) -> Outcome {
        if let Outcome::Exit(code) = outcome {
            self.state = CpuState::Terminated(code);
        }
        outcome
    }

    /// Parses and executes one instruction line.
    pub fn parse_instruction(&mut self, line: &str) -> Result<Outcome> {
        let outcome = self
            .parser
            .parse(line, &mut self.memory, &mut self.console)?;
        Ok(self.track(outcome))
    }

    // ========================================================================
    // DEBUGGER
    // ========================================================================

    pub fn load_program<S: AsRef<str>>(&mut self, lines: &[S], base_addr: u16) {
        self.parser.load_program(lines, base_addr);
        self.state = CpuState::Running;
    }

    /// Loads a source file. Returns the number of executable lines.
    pub fn load_program_file(&mut self, path: &Path, base_addr: u16) -> Result<usize> {
        let text = fs::read_to_string(path).map_err(|source| EmuError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let lines: Vec<&str> = text.lines().collect();
        self.load_program(&lines, base_addr);
        Ok(self.parser.program().map_or(0, |p| p.lines().len()))
    }

    pub fn step(&mut self) -> Result<Step> {
        let step = self.parser.step(&mut self.memory, &mut self.console)?;
        if let Step::Exited { code, .. } = step {
            self.state = CpuState::Terminated(code);
        }
        Ok(step)
    }

    pub fn cont(&mut self, max_steps: Option<usize>) -> Result<ContSummary> {
        let summary = self
            .parser
            .cont(&mut self.memory, &mut self.console, max_steps)?;
        if let StopReason::Exited(code) = summary.reason {
            self.state = CpuState::Terminated(code);
        }
        Ok(summary)
    }

    pub fn enable_trace(&mut self, on: bool, sink: Option<TraceSink>) {
        self.parser.enable_trace(on, sink);
    }

    pub fn disassemble(&self) -> Result<Vec<String>> {
        self.parser.disassemble_program()
    }

    pub fn assemble_program<S: AsRef<str>>(&self, lines: &[S]) -> Result<Vec<u8>> {
        assembler::assemble_program(lines)
    }

    // ========================================================================
    // MEMORY UTILITIES (active page)
    // ========================================================================

    pub fn set_active_page(&mut self, page: usize) -> Result<()> {
        self.memory.set_active_page(page)?;
        self.config.active_page = page;
        Ok(())
    }

    fn check_range(start: usize, end: usize) -> Result<()> {
        if start >= PAGE_SIZE {
            return Err(MemoryError::InvalidAddress(start).into());
        }
        if end < start || end > PAGE_SIZE {
            return Err(MemoryError::InvalidAddress(end).into());
        }
        Ok(())
    }

    /// `start + len`, or an address error when that leaves `usize`.
    fn range_end(start: usize, len: usize) -> Result<usize> {
        start
            .checked_add(len)
            .ok_or_else(|| MemoryError::InvalidAddress(start).into())
    }

    fn read_range(&mut self, start: usize, end: usize) -> Result<Vec<u8>> {
        Self::check_range(start, end)?;
        let mut bytes = Vec::with_capacity(end - start);
        for addr in start..end {
            bytes.push(self.memory.peek_active(addr)?);
        }
        Ok(bytes)
    }

    /// Writes the bytes of `text` starting at `start`.
    pub fn load_into(&mut self, start: usize, text: &str) -> Result<()> {
        let page = self.memory.active_page();
        self.memory.poke_str(page, start, text)?;
        Ok(())
    }

    /// Repeats `pattern` over `[start, end)`.
    pub fn fill(&mut self, start: usize, end: usize, pattern: &[u8]) -> Result<()> {
        Self::check_range(start, end)?;
        if pattern.is_empty() {
            return Ok(());
        }
        let bytes: Vec<u8> = pattern.iter().copied().cycle().take(end - start).collect();
        let page = self.memory.active_page();
        self.memory.poke_bytes(page, start, &bytes)?;
        Ok(())
    }

    /// Copies `[from_begin, from_end)` to `destination`. Overlapping ranges are fine.
    pub fn move_block(&mut self, from_begin: usize, from_end: usize, destination: usize) -> Result<()> {
        let bytes = self.read_range(from_begin, from_end)?;
        let page = self.memory.active_page();
        self.memory.poke_bytes(page, destination, &bytes)?;
        Ok(())
    }

    /// Every `PPPP:AAAA` from `start` to the end of the page where `pattern` begins.
    pub fn search(&mut self, start: usize, pattern: &[u8]) -> Result<Vec<String>> {
        let page = self.memory.active_page();
        let haystack = self.read_range(start, PAGE_SIZE)?;
        if pattern.is_empty() {
            return Ok(Vec::new());
        }
        Ok(haystack
            .windows(pattern.len())
            .enumerate()
            .filter(|(_, w)| *w == pattern)
            .map(|(i, _)| format!("{:04X}:{:04X}", page, start + i))
            .collect())
    }

    /// `PPPP:AAAA xx yy PPPP:BBBB` for every byte of `[from, end)` that
    /// differs from its counterpart at `to`.
    pub fn compare(&mut self, from: usize, end: usize, to: usize) -> Result<Vec<String>> {
        let page = self.memory.active_page();
        let left = self.read_range(from, end)?;
        let right = self.read_range(to, Self::range_end(to, left.len())?)?;
        Ok(left
            .iter()
            .zip(right.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, (a, b))| {
                format!("{:04X}:{:04X} {:02X} {:02X} {:04X}:{:04X}", page, from + i, a, b, page, to + i)
            })
            .collect())
    }

    /// Hex + ASCII listing of `[start, end)`, 16 bytes per row.
    pub fn dump(&mut self, start: usize, end: usize) -> Result<Vec<String>> {
        let page = self.memory.active_page();
        let bytes = self.read_range(start, end)?;
        Ok(bytes
            .chunks(16)
            .enumerate()
            .map(|(row, chunk)| format!("{:04X}:{:04X}  {}", page, start + row * 16, hex_ascii(chunk)))
            .collect())
    }

    // ========================================================================
    // DISK
    // ========================================================================

    pub fn disk_dump(&self, start: usize, end: usize) -> Result<Vec<String>> {
        Ok(self.disk.dump(start, end)?)
    }

    fn check_disk_range(&self, first_sector: usize, count: usize) -> Result<()> {
        let size = self.disk.size();
        match first_sector.checked_add(count) {
            Some(end) if end <= size => Ok(()),
            end => Err(DiskError::InvalidSector {
                sector: end.and_then(|e| i64::try_from(e).ok()).unwrap_or(i64::MAX),
                size,
            }
            .into()),
        }
    }

    /// Copies `count` bytes from memory at `address` to the disk. Returns `count`.
    pub fn write_to_disk(&mut self, address: usize, first_sector: usize, count: usize) -> Result<usize> {
        self.check_disk_range(first_sector, count)?;
        let bytes = self.read_range(address, Self::range_end(address, count)?)?;
        for (i, b) in bytes.iter().enumerate() {
            self.disk.write((first_sector + i) as i64, *b as u32)?;
        }
        info!("[DISK] {} byte(s) {:04X} -> sector {}", count, address, first_sector);
        Ok(count)
    }

    /// Copies `count` disk bytes into memory at `address`. Returns `count`.
    pub fn read_from_disk(&mut self, address: usize, first_sector: usize, count: usize) -> Result<usize> {
        self.check_disk_range(first_sector, count)?;
        Self::check_range(address, Self::range_end(address, count)?)?;
        let mut bytes = Vec::with_capacity(count);
        for i in 0..count {
            bytes.push(self.disk.read((first_sector + i) as i64)?);
        }
        let page = self.memory.active_page();
        self.memory.poke_bytes(page, address, &bytes)?;
        info!("[DISK] {} byte(s) sector {} -> {:04X}", count, first_sector, address);
        Ok(count)
    }
}

/// `48 45 4C 4C 4F ..  HELLO` with the hex column padded to 16 bytes.
pub fn hex_ascii(chunk: &[u8]) -> String {
    let hex = assembler::format_bytes(chunk);
    let ascii: String = chunk
        .iter()
        .map(|b| if b.is_ascii_graphic() || *b == b' ' { *b as char } else { '.' })
        .collect();
    format!("{:<47}  {}", hex, ascii)
}
