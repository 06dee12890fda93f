use std::collections::BTreeSet;
use std::io::Write;

use tracing::{info, warn};

use crate::assembler::encode;
use crate::console::Console;
use crate::debugger::{Program, Watch};
use crate::error::Result;
use crate::instructions::lexer::{label_name, parse_line};
use crate::instructions::{execute_instruction, ExecContext, Outcome};
use crate::memory::{MemoryBus, TracedMemory};
use crate::registers::RegisterSet;
use crate::trace::TraceRecord;

/// Receives trace, watch and break lines.
pub type TraceSink = Box<dyn FnMut(&str)>;

/// Default `cont` step cap.
pub const DEFAULT_MAX_STEPS: usize = 10_000;

fn stdout_sink() -> TraceSink {
    Box::new(|line: &str| println!("{}", line))
}

/// Prints each line and appends it to `writer`. Only the first write
/// failure is reported; later lines still reach stdout.
pub fn tee_sink<W: Write + 'static>(mut writer: W, name: String) -> TraceSink {
    let mut failed = false;
    Box::new(move |line: &str| {
        println!("{}", line);
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            if !failed {
                warn!("[TRACE] cannot write {}: {}", name, e);
                failed = true;
            }
        }
    })
}

/// Decodes and executes single lines against a register set, and carries
/// the debugger state (program, breakpoints, watches, tracing).
pub struct InstructionParser {
    pub registers: RegisterSet,
    pub(crate) program: Option<Program>,
    pub(crate) breakpoints: BTreeSet<u16>,
    pub(crate) watches: Vec<Watch>,
    /// Program index whose breakpoint was already reported.
    pub(crate) resume_from: Option<usize>,
    pub max_steps: usize,
    trace_enabled: bool,
    trace_sink: TraceSink,
}

impl Default for InstructionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionParser {
    pub fn new() -> Self {
        Self {
            registers: RegisterSet::new(),
            program: None,
            breakpoints: BTreeSet::new(),
            watches: Vec::new(),
            resume_from: None,
            max_steps: DEFAULT_MAX_STEPS,
            trace_enabled: false,
            trace_sink: stdout_sink(),
        }
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace_enabled
    }

    /// Turns tracing on or off. A new sink replaces the current one; without
    /// one the previous sink is kept.
    pub fn enable_trace(&mut self, on: bool, sink: Option<TraceSink>) {
        self.trace_enabled = on;
        if let Some(sink) = sink {
            self.trace_sink = sink;
        }
        info!("trace {}", if on { "on" } else { "off" });
    }

    pub(crate) fn emit(&mut self, line: &str) {
        (self.trace_sink)(line);
    }

    /// Parses and executes one line. Blank and `label:` lines do nothing.
    pub fn parse(
        &mut self,
        line: &str,
        memory: &mut dyn MemoryBus,
        console: &mut dyn Console,
    ) -> Result<Outcome> {
        if label_name(line).is_some() {
            return Ok(Outcome::Continue);
        }
        let instr = match parse_line(line)? {
            Some(instr) => instr,
            None => return Ok(Outcome::Continue),
        };

        self.registers.commit();

        if !self.trace_enabled {
            let mut ctx = ExecContext {
                regs: &mut self.registers,
                memory,
                console,
            };
            return execute_instruction(&mut ctx, &instr);
        }

        let before = self.registers.snapshot();
        let mut traced = TracedMemory::new(&mut *memory);
        let result = {
            let mut ctx = ExecContext {
                regs: &mut self.registers,
                memory: &mut traced,
                console,
            };
            execute_instruction(&mut ctx, &instr)
        };
        let accesses = traced.into_log();

        let record = TraceRecord {
            text: crate::instructions::lexer::strip_comment(line).trim().to_string(),
            bytes: encode(&instr).ok(),
            instruction: Some(instr),
            before,
            after: self.registers.snapshot(),
            accesses,
        };
        let mut formatted = record.format();
        if let Err(e) = &result {
            formatted.push_str(&format!(" | error: {}", e));
        }
        self.emit(&formatted);
        self.evaluate_watches(memory);

        result
    }
}
