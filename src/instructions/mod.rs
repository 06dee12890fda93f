use std::fmt;

use tracing::debug;

use crate::console::Console;
use crate::error::Result;
use crate::memory::MemoryBus;
use crate::registers::{Register, RegisterSet};

pub mod lexer;
pub mod utils;
pub mod math;
pub mod logic;
pub mod transfer;
pub mod misc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Mov,
    Add,
    Sub,
    And,
    Or,
    Xor,
    Not,
    Neg,
    Inc,
    Dec,
    Shl,
    Shr,
    Rol,
    Ror,
    Push,
    Pop,
    Int,
}

impl Opcode {
    pub const ALL: [Opcode; 17] = [
        Opcode::Mov,
        Opcode::Add,
        Opcode::Sub,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Not,
        Opcode::Neg,
        Opcode::Inc,
        Opcode::Dec,
        Opcode::Shl,
        Opcode::Shr,
        Opcode::Rol,
        Opcode::Ror,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Int,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Mov => "MOV",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::Not => "NOT",
            Opcode::Neg => "NEG",
            Opcode::Inc => "INC",
            Opcode::Dec => "DEC",
            Opcode::Shl => "SHL",
            Opcode::Shr => "SHR",
            Opcode::Rol => "ROL",
            Opcode::Ror => "ROR",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Int => "INT",
        }
    }

    pub fn from_mnemonic(text: &str) -> Option<Opcode> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(text))
    }

    pub fn operand_count(self) -> usize {
        match self {
            Opcode::Mov | Opcode::Add | Opcode::Sub | Opcode::And | Opcode::Or | Opcode::Xor => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Register(Register),
    Immediate(u16),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "{}", r),
            Operand::Immediate(v) => write!(f, "0x{:04X}", v),
        }
    }
}

/// One parsed source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for (i, op) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, op)?;
        }
        Ok(())
    }
}

/// What a handler may touch while executing one instruction.
pub struct ExecContext<'a> {
    pub regs: &'a mut RegisterSet,
    pub memory: &'a mut dyn MemoryBus,
    pub console: &'a mut dyn Console,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// INT 21h/4Ch: the program asked to end with this code.
    Exit(u8),
}

pub fn execute_instruction(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<Outcome> {
    debug!("exec {}", instr);

    match instr.opcode {
        // --- Data Transfer ---
        Opcode::Mov | Opcode::Push | Opcode::Pop => transfer::handle(ctx, instr),

        // --- Math / Arithmetic ---
        Opcode::Add | Opcode::Sub | Opcode::Inc | Opcode::Dec | Opcode::Neg => {
            math::handle(ctx, instr)
        }

        // --- Logic / Shift / Rotate ---
        Opcode::And
        | Opcode::Or
        | Opcode::Xor
        | Opcode::Not
        | Opcode::Shl
        | Opcode::Shr
        | Opcode::Rol
        | Opcode::Ror => logic::handle(ctx, instr),

        // --- Interrupts ---
        Opcode::Int => misc::handle(ctx, instr),
    }
}
