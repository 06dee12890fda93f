use std::path::Path;

use crate::console::Console;
use crate::cpu::{Cpu, CpuState};
use crate::debugger::{parse_hex, Step};
use crate::error::Result;
use crate::instructions::Outcome;

pub const HELP: &[&str] = &[
    "r [reg value]          show registers / set a register",
    "p <instruction>        execute one instruction",
    "d <start> <end>        dump memory",
    "f <start> <end> <pat>  fill memory with a pattern",
    "m <begin> <end> <dst>  move a block",
    "s <start> <pat>        search for a pattern",
    "c <from> <end> <to>    compare two blocks",
    "e <addr> <text>        enter text at an address",
    "sp <page>              select the active page",
    "load <file> [base]     load a program",
    "trace on|off           per-instruction tracing",
    "bp <label|addr>        set a breakpoint",
    "delbp <label|addr>     clear a breakpoint",
    "bpl                    list breakpoints",
    "watch <expr>           watch AX, FLAGS.CF, [DS:DX], [page:addr], [addr]",
    "unwatch <expr>         remove a watch",
    "watches                list watches",
    "step                   execute the next program line",
    "cont [max]             run until breakpoint, end or limit",
    "disas                  list the program with pseudo bytes",
    "disk load|save         sync the virtual disk with its file",
    "disk dump <a> <b>      dump disk sectors",
    "w <addr> <sec> <n>     memory -> disk",
    "l <addr> <sec> <n>     disk -> memory",
    "q                      quit",
];

/// Lines to show for one command, and whether the session should end.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl CommandOutput {
    fn lines(lines: Vec<String>) -> Self {
        Self { lines, quit: false }
    }

    fn line(line: impl Into<String>) -> Self {
        Self::lines(vec![line.into()])
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CommandDispatcher;

fn hex_arg(args: &[&str], index: usize) -> Option<usize> {
    args.get(index).and_then(|a| parse_hex(a))
}

/// `"text"` as its bytes, otherwise whitespace-separated hex bytes.
fn pattern_arg(text: &str) -> Option<Vec<u8>> {
    let text = text.trim();
    if let Some(quoted) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        return Some(quoted.as_bytes().to_vec());
    }
    text.split_whitespace()
        .map(|b| parse_hex(b).and_then(|v| u8::try_from(v).ok()))
        .collect()
}

/// Everything after the first `skip` whitespace-separated words.
fn rest_after(text: &str, skip: usize) -> &str {
    let mut rest = text.trim_start();
    for _ in 0..skip {
        rest = match rest.find(char::is_whitespace) {
            Some(i) => rest[i..].trim_start(),
            None => "",
        };
    }
    rest
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Runs one console line. Errors become output lines; nothing here ends
    /// the session except `q` or a terminated program.
    pub fn dispatch<C: Console>(&self, cpu: &mut Cpu<C>, input: &str) -> CommandOutput {
        let input = input.trim();
        let (command, args) = match input.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (input, ""),
        };
        if command.is_empty() {
            return CommandOutput::default();
        }

        let mut output = match self.run(cpu, &command.to_ascii_lowercase(), args) {
            Ok(Some(output)) => output,
            Ok(None) => CommandOutput::line("Input not recognized."),
            Err(e) => CommandOutput::line(format!("Error: {}", e)),
        };
        if let CpuState::Terminated(code) = cpu.state {
            output.lines.push(format!("Program terminated with exit code {}", code));
            output.quit = true;
        }
        output
    }

    fn run<C: Console>(&self, cpu: &mut Cpu<C>, command: &str, args: &str) -> Result<Option<CommandOutput>> {
        let argv: Vec<&str> = args.split_whitespace().collect();

        let output = match (command, argv.as_slice()) {
            ("q", _) => CommandOutput {
                lines: Vec::new(),
                quit: true,
            },
            ("h" | "?", _) => CommandOutput::lines(HELP.iter().map(|l| l.to_string()).collect()),

            ("r", []) => CommandOutput::lines(cpu.register_lines()),
            ("r", [name, value]) => match parse_hex(value).and_then(|v| u32::try_from(v).ok()) {
                Some(v) if v <= 0xFFFF => {
                    cpu.set_register(name, v)?;
                    CommandOutput::lines(cpu.register_lines())
                }
                _ => return Ok(None),
            },

            ("p", [_, ..]) => match cpu.parse_instruction(args)? {
                Outcome::Continue => CommandOutput::lines(cpu.register_lines()),
                Outcome::Exit(_) => CommandOutput::default(),
            },

            ("d", [_, _]) => match (hex_arg(&argv, 0), hex_arg(&argv, 1)) {
                (Some(start), Some(end)) => CommandOutput::lines(cpu.dump(start, end)?),
                _ => return Ok(None),
            },
            ("f", [_, _, _, ..]) => {
                match (hex_arg(&argv, 0), hex_arg(&argv, 1), pattern_arg(rest_after(args, 2))) {
                    (Some(start), Some(end), Some(pattern)) => {
                        cpu.fill(start, end, &pattern)?;
                        CommandOutput::default()
                    }
                    _ => return Ok(None),
                }
            }
            ("m", [_, _, _]) => match (hex_arg(&argv, 0), hex_arg(&argv, 1), hex_arg(&argv, 2)) {
                (Some(begin), Some(end), Some(dest)) => {
                    cpu.move_block(begin, end, dest)?;
                    CommandOutput::default()
                }
                _ => return Ok(None),
            },
            ("s", [_, _, ..]) => match (hex_arg(&argv, 0), pattern_arg(rest_after(args, 1))) {
                (Some(start), Some(pattern)) => CommandOutput::lines(cpu.search(start, &pattern)?),
                _ => return Ok(None),
            },
            ("c", [_, _, _]) => match (hex_arg(&argv, 0), hex_arg(&argv, 1), hex_arg(&argv, 2)) {
                (Some(from), Some(end), Some(to)) => CommandOutput::lines(cpu.compare(from, end, to)?),
                _ => return Ok(None),
            },
            ("e", [_, _, ..]) => match hex_arg(&argv, 0) {
                Some(addr) => {
                    let text = rest_after(args, 1);
                    let text = text
                        .strip_prefix('"')
                        .and_then(|t| t.strip_suffix('"'))
                        .unwrap_or(text);
                    cpu.load_into(addr, text)?;
                    CommandOutput::default()
                }
                None => return Ok(None),
            },
            ("sp", [_]) => match hex_arg(&argv, 0) {
                Some(page) => {
                    cpu.set_active_page(page)?;
                    CommandOutput::line(format!("Active page {:04X}", page))
                }
                None => return Ok(None),
            },

            ("load", [file]) | ("load", [file, _]) => {
                let base = match argv.get(1) {
                    Some(b) => match parse_hex(b).and_then(|v| u16::try_from(v).ok()) {
                        Some(base) => base,
                        None => return Ok(None),
                    },
                    None => cpu.config.base_addr,
                };
                let count = cpu.load_program_file(Path::new(file), base)?;
                CommandOutput::line(format!("Loaded {} line(s) at {:04X}", count, base))
            }
            ("trace", ["on"]) => {
                cpu.enable_trace(true, None);
                CommandOutput::line("Trace on")
            }
            ("trace", ["off"]) => {
                cpu.enable_trace(false, None);
                CommandOutput::line("Trace off")
            }
            ("bp", [_, ..]) => {
                let addr = cpu.parser.add_breakpoint(args)?;
                CommandOutput::line(format!("Breakpoint at {:04X}", addr))
            }
            ("delbp", [_, ..]) => {
                if cpu.parser.remove_breakpoint(args)? {
                    CommandOutput::line("Breakpoint removed")
                } else {
                    CommandOutput::line("No breakpoint there")
                }
            }
            ("bpl", []) => CommandOutput::lines(
                cpu.parser
                    .breakpoints()
                    .iter()
                    .map(|a| format!("{:04X}", a))
                    .collect(),
            ),
            ("watch", [_, ..]) => {
                cpu.parser.add_watch(args)?;
                CommandOutput::default()
            }
            ("unwatch", [_, ..]) => {
                if cpu.parser.remove_watch(args) {
                    CommandOutput::default()
                } else {
                    CommandOutput::line("No such watch")
                }
            }
            ("watches", []) => CommandOutput::lines(
                cpu.parser
                    .watches()
                    .iter()
                    .map(|w| format!("{} = {}", w.expr, w.last.as_deref().unwrap_or("?")))
                    .collect(),
            ),
            ("step", []) => CommandOutput::line(match cpu.step()? {
                Step::Executed(line) => format!("Executed {}", line),
                Step::Break(addr) => format!("Stopped at breakpoint {:04X}", addr),
                Step::Halted => "Program halted".to_string(),
                Step::Exited { line, code } => format!("Executed {} (exit code {})", line, code),
            }),
            ("cont", []) | ("cont", [_]) => {
                let max = match argv.first() {
                    Some(m) => match m.parse::<usize>() {
                        Ok(m) => Some(m),
                        Err(_) => return Ok(None),
                    },
                    None => None,
                };
                let summary = cpu.cont(max)?;
                CommandOutput::line(format!("{} after {} step(s)", summary.reason, summary.steps))
            }
            ("disas", []) => CommandOutput::lines(cpu.disassemble()?),

            ("disk", ["load"]) => {
                let n = cpu.disk.load()?;
                CommandOutput::line(format!("Read {} byte(s) from {}", n, cpu.disk.path().display()))
            }
            ("disk", ["save"]) => {
                let n = cpu.disk.save()?;
                CommandOutput::line(format!("Wrote {} byte(s) to {}", n, cpu.disk.path().display()))
            }
            ("disk", ["dump", _, _]) => match (hex_arg(&argv, 1), hex_arg(&argv, 2)) {
                (Some(start), Some(end)) => CommandOutput::lines(cpu.disk_dump(start, end)?),
                _ => return Ok(None),
            },
            ("w", [_, _, _]) => match (hex_arg(&argv, 0), hex_arg(&argv, 1), hex_arg(&argv, 2)) {
                (Some(addr), Some(sector), Some(count)) => {
                    let n = cpu.write_to_disk(addr, sector, count)?;
                    CommandOutput::line(format!("{} byte(s) written to disk", n))
                }
                _ => return Ok(None),
            },
            ("l", [_, _, _]) => match (hex_arg(&argv, 0), hex_arg(&argv, 1), hex_arg(&argv, 2)) {
                (Some(addr), Some(sector), Some(count)) => {
                    let n = cpu.read_from_disk(addr, sector, count)?;
                    CommandOutput::line(format!("{} byte(s) read from disk", n))
                }
                _ => return Ok(None),
            },

            _ => return Ok(None),
        };
        Ok(Some(output))
    }
}
