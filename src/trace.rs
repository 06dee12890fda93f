use crate::assembler::format_bytes;
use crate::instructions::Instruction;
use crate::memory::MemAccess;
use crate::registers::{CpuFlags, Register, Snapshot};

/// Memory accesses shown on a trace line before the rest are summarised.
pub const MAX_SHOWN_ACCESSES: usize = 8;

/// Everything observed while executing one instruction with tracing on.
#[derive(Debug, Clone)]
pub struct TraceRecord {
    pub text: String,
    pub instruction: Option<Instruction>,
    pub bytes: Option<Vec<u8>>,
    pub before: Snapshot,
    pub after: Snapshot,
    pub accesses: Vec<MemAccess>,
}

impl TraceRecord {
    pub fn register_changes(&self) -> Vec<(Register, u16, u16)> {
        Register::ALL
            .iter()
            .filter(|r| self.before.get(**r) != self.after.get(**r))
            .map(|r| (*r, self.before.get(*r), self.after.get(*r)))
            .collect()
    }

    pub fn flag_changes(&self) -> Vec<(&'static str, bool, bool)> {
        CpuFlags::NAMED
            .iter()
            .filter(|(_, f)| self.before.flag(*f) != self.after.flag(*f))
            .map(|(name, f)| (*name, self.before.flag(*f), self.after.flag(*f)))
            .collect()
    }

    /// `<source> | bytes(pseudo): .. | regsΔ: .. | flagsΔ: .. | mem: ..`
    pub fn format(&self) -> String {
        let bytes = match &self.bytes {
            Some(b) if !b.is_empty() => format_bytes(b),
            _ => "--".to_string(),
        };

        let regs: Vec<String> = self
            .register_changes()
            .iter()
            .map(|(r, old, new)| format!("{} {:04X}->{:04X}", r, old, new))
            .collect();
        let flags: Vec<String> = self
            .flag_changes()
            .iter()
            .map(|(name, old, new)| format!("{} {}->{}", name, *old as u8, *new as u8))
            .collect();

        let mut mem: Vec<String> = self
            .accesses
            .iter()
            .take(MAX_SHOWN_ACCESSES)
            .map(|a| a.to_string())
            .collect();
        if self.accesses.len() > MAX_SHOWN_ACCESSES {
            mem.push(format!("…(+{})", self.accesses.len() - MAX_SHOWN_ACCESSES));
        }

        format!(
            "{} | bytes(pseudo): {} | regsΔ: {} | flagsΔ: {} | mem: {}",
            self.text.trim(),
            bytes,
            or_dash(regs.join(", ")),
            or_dash(flags.join(", ")),
            or_dash(mem.join(" ")),
        )
    }
}

fn or_dash(s: String) -> String {
    if s.is_empty() { "-".to_string() } else { s }
}
