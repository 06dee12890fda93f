use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

use crate::error::ExecError;

// Constants for Flag Bits (same positions as the 8086 FLAGS word)
bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CpuFlags: u16 {
        const CF = 0x0001;
        const PF = 0x0004;
        const ZF = 0x0040;
        const SF = 0x0080;
    }
}

impl CpuFlags {
    /// Display order used by register dumps, traces and watches.
    pub const NAMED: [(&'static str, CpuFlags); 4] = [
        ("ZF", CpuFlags::ZF),
        ("SF", CpuFlags::SF),
        ("PF", CpuFlags::PF),
        ("CF", CpuFlags::CF),
    ];

    /// Case-insensitive lookup of a flag by its two-letter name.
    pub fn from_label(name: &str) -> Option<CpuFlags> {
        Self::NAMED
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, f)| *f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Register {
    AX,
    BX,
    CX,
    DX,
    SP,
    BP,
    SI,
    DI,
    CS,
    DS,
    SS,
    ES,
    FS,
    GS,
}

impl Register {
    pub const ALL: [Register; 14] = [
        Register::AX,
        Register::BX,
        Register::CX,
        Register::DX,
        Register::SP,
        Register::BP,
        Register::SI,
        Register::DI,
        Register::CS,
        Register::DS,
        Register::SS,
        Register::ES,
        Register::FS,
        Register::GS,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Register::AX => "AX",
            Register::BX => "BX",
            Register::CX => "CX",
            Register::DX => "DX",
            Register::SP => "SP",
            Register::BP => "BP",
            Register::SI => "SI",
            Register::DI => "DI",
            Register::CS => "CS",
            Register::DS => "DS",
            Register::SS => "SS",
            Register::ES => "ES",
            Register::FS => "FS",
            Register::GS => "GS",
        }
    }

    /// Case-insensitive lookup of one of the 14 register names.
    pub fn from_name(name: &str) -> Option<Register> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.name().eq_ignore_ascii_case(name))
    }

    /// 3-bit register field used by the pseudo-encoder. Segment registers have none.
    pub fn encoding_index(self) -> Option<u8> {
        match self {
            Register::AX => Some(0),
            Register::CX => Some(1),
            Register::DX => Some(2),
            Register::BX => Some(3),
            Register::SP => Some(4),
            Register::BP => Some(5),
            Register::SI => Some(6),
            Register::DI => Some(7),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Register {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Register::from_name(s.trim()).ok_or_else(|| ExecError::InvalidRegister(s.to_string()))
    }
}

/// Operation families, as far as flag computation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOp {
    Add,
    Sub,
    Logic,
    Shift,
    Rotate,
    Inc,
    Dec,
}

impl FlagOp {
    /// Families whose handler supplies the carry/borrow that lands in CF.
    pub fn defines_carry(self) -> bool {
        matches!(
            self,
            FlagOp::Add | FlagOp::Sub | FlagOp::Logic | FlagOp::Shift | FlagOp::Rotate
        )
    }
}

/// Register values and flags at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub values: [u16; 14],
    pub flags: CpuFlags,
}

impl Snapshot {
    pub fn get(&self, reg: Register) -> u16 {
        self.values[reg.slot()]
    }

    pub fn flag(&self, flag: CpuFlags) -> bool {
        self.flags.contains(flag)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterSet {
    values: [u16; 14],
    previous: [u16; 14],
    flags: CpuFlags,
    previous_flags: CpuFlags,
}

impl RegisterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reg: Register) -> u16 {
        self.values[reg.slot()]
    }

    pub fn get_by_name(&self, name: &str) -> Result<u16, ExecError> {
        Ok(self.get(name.parse()?))
    }

    /// Writes `value & 0xFFFF`, remembering what was there before.
    pub fn set(&mut self, reg: Register, value: u32) {
        let slot = reg.slot();
        self.previous[slot] = self.values[slot];
        self.values[slot] = (value & 0xFFFF) as u16;
    }

    pub fn set_by_name(&mut self, name: &str, value: u32) -> Result<(), ExecError> {
        self.set(name.parse()?, value);
        Ok(())
    }

    /// High byte (AH for AX, ...).
    pub fn get_upper(&self, reg: Register) -> u8 {
        (self.get(reg) >> 8) as u8
    }

    /// Low byte (AL for AX, ...).
    pub fn get_lower(&self, reg: Register) -> u8 {
        (self.get(reg) & 0xFF) as u8
    }

    pub fn set_upper(&mut self, reg: Register, value: u8) {
        let v = Self::set_register_upper(self.get(reg), value);
        self.set(reg, v as u32);
    }

    pub fn set_lower(&mut self, reg: Register, value: u8) {
        let v = Self::set_register_lower(self.get(reg), value);
        self.set(reg, v as u32);
    }

    pub fn set_register_upper(reg: u16, value: u8) -> u16 {
        (reg & 0x00FF) | ((value as u16) << 8)
    }

    pub fn set_register_lower(reg: u16, value: u8) -> u16 {
        (reg & 0xFF00) | value as u16
    }

    pub fn flag(&self, flag: CpuFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn flags(&self) -> CpuFlags {
        self.flags
    }

    pub fn set_flag(&mut self, flag: CpuFlags, value: bool) {
        self.previous_flags = self.flags;
        self.flags.set(flag, value);
    }

    /// ZF/SF/PF always follow `result` (16-bit view, parity over the low byte).
    /// CF only moves when `op` is a carry-defining family and the handler
    /// supplied the carry; every other instruction leaves it alone.
    pub fn update_flags(&mut self, result: u32, op: Option<FlagOp>, carry: Option<bool>) {
        let result = (result & 0xFFFF) as u16;
        self.previous_flags = self.flags;

        self.flags.set(CpuFlags::ZF, result == 0);
        self.flags.set(CpuFlags::SF, result & 0x8000 != 0);
        // Even parity means an even number of 1s in the low byte
        self.flags
            .set(CpuFlags::PF, (result & 0xFF).count_ones() % 2 == 0);

        if let (Some(op), Some(carry)) = (op, carry) {
            if op.defines_carry() {
                self.flags.set(CpuFlags::CF, carry);
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            values: self.values,
            flags: self.flags,
        }
    }

    pub fn previous_snapshot(&self) -> Snapshot {
        Snapshot {
            values: self.previous,
            flags: self.previous_flags,
        }
    }

    /// Forgets the recorded prior values, so the next change report only
    /// covers what happens from here on.
    pub fn commit(&mut self) {
        self.previous = self.values;
        self.previous_flags = self.flags;
    }

    /// `(register, old, new)` for every register written with a different
    /// value since the last `commit`.
    pub fn changed_registers(&self) -> Vec<(Register, u16, u16)> {
        Register::ALL
            .iter()
            .filter(|r| self.previous[r.slot()] != self.values[r.slot()])
            .map(|r| (*r, self.previous[r.slot()], self.values[r.slot()]))
            .collect()
    }

    /// DEBUG-style register listing, changed registers marked with `*`.
    pub fn dump_lines(&self) -> Vec<String> {
        let changed: Vec<Register> = self.changed_registers().iter().map(|c| c.0).collect();
        let cell = |r: &Register| {
            let mark = if changed.contains(r) { "*" } else { " " };
            format!("{}={:04X}{}", r, self.get(*r), mark)
        };
        let general: Vec<String> = Register::ALL[..8].iter().map(cell).collect();
        let segments: Vec<String> = Register::ALL[8..].iter().map(cell).collect();
        let flags: Vec<String> = CpuFlags::NAMED
            .iter()
            .map(|(name, f)| format!("{}={}", name, self.flag(*f) as u8))
            .collect();
        vec![general.join(" "), segments.join(" "), flags.join(" ")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_masks_to_16_bits() {
        let mut regs = RegisterSet::new();
        for reg in Register::ALL {
            for v in [0u32, 1, 0xFFFF, 0x1_0000, 0x1_2345, u32::MAX] {
                regs.set(reg, v);
                assert_eq!(regs.get(reg) as u32, v & 0xFFFF, "{} <- {:#X}", reg, v);
            }
        }
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(Register::from_name("ax"), Some(Register::AX));
        assert_eq!(Register::from_name("Gs"), Some(Register::GS));
        assert_eq!(Register::from_name("BL"), None);
        assert!(matches!(
            "FOO".parse::<Register>(),
            Err(ExecError::InvalidRegister(_))
        ));
    }

    #[test]
    fn update_flags_on_zero() {
        let mut regs = RegisterSet::new();
        regs.update_flags(0, None, None);
        assert!(regs.flag(CpuFlags::ZF));
        assert!(!regs.flag(CpuFlags::SF));
        assert!(regs.flag(CpuFlags::PF));
    }

    #[test]
    fn update_flags_leaves_carry_without_carry_family() {
        let mut regs = RegisterSet::new();
        regs.set_flag(CpuFlags::CF, true);
        regs.update_flags(0x8001, Some(FlagOp::Inc), Some(false));
        assert!(regs.flag(CpuFlags::CF));
        assert!(regs.flag(CpuFlags::SF));
        // 0x01 has a single bit set: odd parity
        assert!(!regs.flag(CpuFlags::PF));

        regs.update_flags(0x8001, Some(FlagOp::Add), None);
        assert!(regs.flag(CpuFlags::CF));

        regs.update_flags(0x0003, Some(FlagOp::Logic), Some(false));
        assert!(!regs.flag(CpuFlags::CF));
    }

    #[test]
    fn upper_and_lower_bytes() {
        assert_eq!(RegisterSet::set_register_upper(0x00FF, 0x12), 0x12FF);
        assert_eq!(RegisterSet::set_register_lower(0xFF00, 0x34), 0xFF34);

        let mut regs = RegisterSet::new();
        regs.set(Register::AX, 0x4C07);
        assert_eq!(regs.get_upper(Register::AX), 0x4C);
        assert_eq!(regs.get_lower(Register::AX), 0x07);
        regs.set_lower(Register::AX, 0xEF);
        assert_eq!(regs.get(Register::AX), 0x4CEF);
    }

    #[test]
    fn changed_registers_since_commit() {
        let mut regs = RegisterSet::new();
        regs.set(Register::AX, 1);
        regs.commit();
        assert!(regs.changed_registers().is_empty());

        regs.set(Register::BX, 7);
        regs.set(Register::AX, 1);
        assert_eq!(regs.changed_registers(), vec![(Register::BX, 0, 7)]);
        assert!(regs.dump_lines()[0].contains("BX=0007*"));
    }
}
