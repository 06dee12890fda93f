use crate::error::{ExecError, ParseError, Result};
use crate::registers::{Register, RegisterSet};

use super::{Instruction, Operand};

/// Destination operand of a register-writing instruction.
pub fn dest_register(instr: &Instruction) -> Result<Register> {
    match instr.operands.first() {
        Some(Operand::Register(r)) => Ok(*r),
        Some(Operand::Immediate(v)) => Err(ExecError::InvalidRegister(format!("0x{:04X}", v)).into()),
        None => Err(ExecError::InvalidRegister(String::new()).into()),
    }
}

/// Current value of an operand: a register's contents or the immediate itself.
pub fn operand_value(regs: &RegisterSet, op: &Operand) -> u16 {
    match op {
        Operand::Register(r) => regs.get(*r),
        Operand::Immediate(v) => *v,
    }
}

/// Value of operand `index`, or an error naming the instruction when it is missing.
pub fn source_value(regs: &RegisterSet, instr: &Instruction, index: usize) -> Result<u16> {
    instr
        .operands
        .get(index)
        .map(|op| operand_value(regs, op))
        .ok_or_else(|| ParseError::UnexpectedEnd(instr.to_string()).into())
}
