use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info};

use crate::assembler::disassemble_line;
use crate::console::Console;
use crate::error::{EmuError, Result};
use crate::instructions::lexer::{label_name, strip_comment};
use crate::instructions::Outcome;
use crate::memory::MemoryBus;
use crate::parser::InstructionParser;
use crate::registers::{CpuFlags, Register, RegisterSet};

/// A loaded program: executable lines, label offsets and the program counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    lines: Vec<String>,
    labels: HashMap<String, usize>,
    base_addr: u16,
    pc: usize,
}

impl Program {
    /// Drops blank lines and comments; `label:` lines name the next
    /// executable line and are not executable themselves.
    pub fn new<S: AsRef<str>>(source: &[S], base_addr: u16) -> Self {
        let mut lines = Vec::new();
        let mut labels = HashMap::new();
        for raw in source {
            let raw = raw.as_ref();
            if let Some(name) = label_name(raw) {
                labels.insert(name.to_ascii_uppercase(), lines.len());
                continue;
            }
            let text = strip_comment(raw).trim();
            if !text.is_empty() {
                lines.push(text.to_string());
            }
        }
        Self {
            lines,
            labels,
            base_addr,
            pc: 0,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn base_addr(&self) -> u16 {
        self.base_addr
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn is_halted(&self) -> bool {
        self.pc >= self.lines.len()
    }

    /// Address of line `index`: one unit per line.
    pub fn address_of(&self, index: usize) -> u16 {
        self.base_addr.wrapping_add(index as u16)
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn label_at(&self, index: usize) -> Option<&str> {
        self.labels
            .iter()
            .find(|(_, i)| **i == index)
            .map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchTarget {
    Register(Register),
    Flag(CpuFlags),
    /// `[DS:DX]`, re-resolved on every evaluation.
    DosPointer,
    /// `[page:addr]`, or `[addr]` on the active page when `page` is `None`.
    Memory { page: Option<usize>, address: usize },
}

impl WatchTarget {
    pub fn parse(expr: &str) -> Result<WatchTarget> {
        let invalid = || EmuError::InvalidWatch(expr.to_string());
        let text: String = expr.split_whitespace().collect::<String>().to_ascii_uppercase();

        if let Some(reg) = Register::from_name(&text) {
            return Ok(WatchTarget::Register(reg));
        }
        if let Some(name) = text.strip_prefix("FLAGS.") {
            return CpuFlags::from_label(name)
                .map(WatchTarget::Flag)
                .ok_or_else(invalid);
        }

        let inner = text
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .ok_or_else(invalid)?;
        if inner == "DS:DX" {
            return Ok(WatchTarget::DosPointer);
        }
        match inner.split_once(':') {
            Some((page, addr)) => Ok(WatchTarget::Memory {
                page: Some(parse_hex(page).ok_or_else(invalid)?),
                address: parse_hex(addr).ok_or_else(invalid)?,
            }),
            None => Ok(WatchTarget::Memory {
                page: None,
                address: parse_hex(inner).ok_or_else(invalid)?,
            }),
        }
    }

    /// Current value as shown on watch lines. Unreadable memory shows as `??`.
    pub fn evaluate(&self, regs: &RegisterSet, memory: &mut dyn MemoryBus) -> String {
        match self {
            WatchTarget::Register(r) => format!("0x{:04X}", regs.get(*r)),
            WatchTarget::Flag(f) => (regs.flag(*f) as u8).to_string(),
            WatchTarget::DosPointer => {
                let addr = ((regs.get(Register::DS) as usize) << 4) + regs.get(Register::DX) as usize;
                read_byte(memory, None, addr)
            }
            WatchTarget::Memory { page, address } => read_byte(memory, *page, *address),
        }
    }
}

fn read_byte(memory: &mut dyn MemoryBus, page: Option<usize>, address: usize) -> String {
    let page = page.unwrap_or_else(|| memory.active_page());
    match memory.peek(page, address) {
        Ok(v) => format!("0x{:02X}", v),
        Err(_) => "??".to_string(),
    }
}

/// Hex with or without `0x`.
pub fn parse_hex(text: &str) -> Option<usize> {
    let t = text.trim();
    let t = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t);
    usize::from_str_radix(t, 16).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watch {
    pub expr: String,
    pub target: WatchTarget,
    pub last: Option<String>,
}

/// Result of one `step`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Executed(String),
    /// Stopped in front of a breakpoint at this address; nothing ran.
    Break(u16),
    Halted,
    Exited { line: String, code: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Breakpoint(u16),
    Halted,
    StepLimit,
    Exited(u8),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Breakpoint(addr) => write!(f, "breakpoint at {:04X}", addr),
            StopReason::Halted => f.write_str("program halted"),
            StopReason::StepLimit => f.write_str("step limit reached"),
            StopReason::Exited(code) => write!(f, "program exited with code {}", code),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContSummary {
    pub reason: StopReason,
    pub steps: usize,
}

impl InstructionParser {
    /// Replaces any loaded program and rewinds to its first line.
    pub fn load_program<S: AsRef<str>>(&mut self, source: &[S], base_addr: u16) {
        let program = Program::new(source, base_addr);
        info!(
            "loaded {} line(s), {} label(s) at {:04X}",
            program.lines.len(),
            program.labels.len(),
            base_addr
        );
        self.program = Some(program);
        self.resume_from = None;
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    /// A label of the loaded program, else a hex address (`0104` or `0x0104`).
    pub fn resolve_location(&self, location: &str) -> Result<u16> {
        let location = location.trim();
        if let Some(program) = &self.program {
            if let Some(index) = program.label(location) {
                return Ok(program.address_of(index));
            }
        }
        parse_hex(location)
            .and_then(|v| u16::try_from(v).ok())
            .ok_or_else(|| EmuError::UnknownLabel(location.to_string()))
    }

    pub fn add_breakpoint(&mut self, location: &str) -> Result<u16> {
        let addr = self.resolve_location(location)?;
        self.breakpoints.insert(addr);
        info!("breakpoint set at {:04X}", addr);
        Ok(addr)
    }

    /// Returns whether a breakpoint was actually removed.
    pub fn remove_breakpoint(&mut self, location: &str) -> Result<bool> {
        let addr = self.resolve_location(location)?;
        let removed = self.breakpoints.remove(&addr);
        if removed {
            info!("breakpoint cleared at {:04X}", addr);
        }
        Ok(removed)
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    pub fn breakpoints(&self) -> Vec<u16> {
        self.breakpoints.iter().copied().collect()
    }

    pub fn add_watch(&mut self, expr: &str) -> Result<()> {
        let target = WatchTarget::parse(expr)?;
        let expr = expr.split_whitespace().collect::<String>().to_ascii_uppercase();
        if !self.watches.iter().any(|w| w.expr == expr) {
            self.watches.push(Watch {
                expr,
                target,
                last: None,
            });
        }
        Ok(())
    }

    pub fn remove_watch(&mut self, expr: &str) -> bool {
        let expr = expr.split_whitespace().collect::<String>().to_ascii_uppercase();
        let before = self.watches.len();
        self.watches.retain(|w| w.expr != expr);
        self.watches.len() != before
    }

    pub fn clear_watches(&mut self) {
        self.watches.clear();
    }

    pub fn watches(&self) -> &[Watch] {
        &self.watches
    }

    /// Re-reads every watch, emitting `[watch] expr: old->new` on change.
    /// A watch's first reading only records the baseline.
    pub(crate) fn evaluate_watches(&mut self, memory: &mut dyn MemoryBus) {
        let mut changes = Vec::new();
        for watch in &mut self.watches {
            let value = watch.target.evaluate(&self.registers, memory);
            if let Some(old) = &watch.last {
                if *old != value {
                    changes.push(format!("[watch] {}: {}->{}", watch.expr, old, value));
                }
            }
            watch.last = Some(value);
        }
        for line in changes {
            self.emit(&line);
        }
    }

    /// Runs the line under the pc, unless a not yet reported breakpoint sits
    /// there. The address just past the last line can hold a breakpoint too.
    /// The pc moves before execution, so a failing line is still consumed.
    pub fn step(&mut self, memory: &mut dyn MemoryBus, console: &mut dyn Console) -> Result<Step> {
        let program = self.program.as_mut().ok_or(EmuError::NoProgram)?;
        let pc = program.pc;
        let addr = program.address_of(pc);

        if self.breakpoints.contains(&addr) && self.resume_from != Some(pc) {
            let text = program
                .lines
                .get(pc)
                .cloned()
                .unwrap_or_else(|| "<end>".to_string());
            let label = program
                .label_at(pc)
                .map(|l| format!(" ({})", l))
                .unwrap_or_default();
            self.resume_from = Some(pc);
            self.emit(&format!("[break] {:04X}{}: {}", addr, label, text));
            return Ok(Step::Break(addr));
        }

        let line = match program.lines.get(pc) {
            Some(line) => line.clone(),
            None => return Ok(Step::Halted),
        };
        program.pc += 1;
        self.resume_from = None;
        debug!("step {:04X}: {}", addr, line);

        match self.parse(&line, memory, console)? {
            Outcome::Continue => Ok(Step::Executed(line)),
            Outcome::Exit(code) => {
                if let Some(program) = self.program.as_mut() {
                    program.pc = program.lines.len();
                }
                Ok(Step::Exited { line, code })
            }
        }
    }

    /// Steps until a breakpoint, the end of the program, an exit request or
    /// `max_steps` executed lines (the configured cap when `None`).
    pub fn cont(
        &mut self,
        memory: &mut dyn MemoryBus,
        console: &mut dyn Console,
        max_steps: Option<usize>,
    ) -> Result<ContSummary> {
        let limit = max_steps.unwrap_or(self.max_steps);
        let mut steps = 0;
        while steps < limit {
            let reason = match self.step(memory, console)? {
                Step::Executed(_) => {
                    steps += 1;
                    continue;
                }
                Step::Break(addr) => StopReason::Breakpoint(addr),
                Step::Halted => StopReason::Halted,
                Step::Exited { code, .. } => {
                    steps += 1;
                    StopReason::Exited(code)
                }
            };
            return Ok(ContSummary { reason, steps });
        }
        Ok(ContSummary {
            reason: StopReason::StepLimit,
            steps,
        })
    }

    /// One listing line per executable line of the loaded program.
    pub fn disassemble_program(&self) -> Result<Vec<String>> {
        let program = self.program.as_ref().ok_or(EmuError::NoProgram)?;
        Ok(program
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| disassemble_line(line, program.address_of(i)))
            .collect())
    }
}
