//! Pseudo-encoding of instructions for display.
//!
//! The byte layout below is deliberately NOT real 8086 machine code:
//!
//! | shape              | bytes                                   |
//! |--------------------|-----------------------------------------|
//! | `MOV reg, imm16`   | `B8+r lo hi`                            |
//! | `MOV reg, reg`     | `8B C0|(dst<<3)|src`                    |
//! | `ALU reg, imm16`   | `base r lo hi` (ADD 70, SUB 71, AND 72, OR 73, XOR 74) |
//! | `ALU reg, reg`     | `base C0|(dst<<3)|src` (ADD 10 .. XOR 14) |
//! | `INC/DEC/PUSH/POP` | `40+r` / `48+r` / `50+r` / `58+r`        |
//! | `INT imm8`         | `CD imm8`                               |
//!
//! Register indices: AX=0 CX=1 DX=2 BX=3 SP=4 BP=5 SI=6 DI=7.

use crate::error::{EmuError, ExecError, Result};
use crate::instructions::lexer::{label_name, parse_line};
use crate::instructions::{Instruction, Opcode, Operand};
use crate::registers::Register;

fn reg_index(reg: Register, instr: &Instruction) -> Result<u8> {
    reg.encoding_index()
        .ok_or_else(|| ExecError::Encoding(instr.to_string()).into())
}

fn modrm(dst: u8, src: u8) -> u8 {
    0xC0 | (dst << 3) | src
}

/// (imm form, reg-reg form) opcode bytes of the two-operand ALU families.
fn alu_bases(opcode: Opcode) -> Option<(u8, u8)> {
    match opcode {
        Opcode::Add => Some((0x70, 0x10)),
        Opcode::Sub => Some((0x71, 0x11)),
        Opcode::And => Some((0x72, 0x12)),
        Opcode::Or => Some((0x73, 0x13)),
        Opcode::Xor => Some((0x74, 0x14)),
        _ => None,
    }
}

fn single_reg_base(opcode: Opcode) -> Option<u8> {
    match opcode {
        Opcode::Inc => Some(0x40),
        Opcode::Dec => Some(0x48),
        Opcode::Push => Some(0x50),
        Opcode::Pop => Some(0x58),
        _ => None,
    }
}

pub fn encode(instr: &Instruction) -> Result<Vec<u8>> {
    let unsupported = || -> EmuError { ExecError::Encoding(instr.to_string()).into() };
    let ops = instr.operands.as_slice();

    match (instr.opcode, ops) {
        (Opcode::Mov, [Operand::Register(dst), Operand::Immediate(imm)]) => {
            let [lo, hi] = imm.to_le_bytes();
            Ok(vec![0xB8 + reg_index(*dst, instr)?, lo, hi])
        }
        (Opcode::Mov, [Operand::Register(dst), Operand::Register(src)]) => Ok(vec![
            0x8B,
            modrm(reg_index(*dst, instr)?, reg_index(*src, instr)?),
        ]),
        (Opcode::Int, [Operand::Immediate(imm)]) => match u8::try_from(*imm) {
            Ok(vector) => Ok(vec![0xCD, vector]),
            Err(_) => Err(unsupported()),
        },
        (op, [Operand::Register(dst), Operand::Immediate(imm)]) => {
            let (base, _) = alu_bases(op).ok_or_else(unsupported)?;
            let [lo, hi] = imm.to_le_bytes();
            Ok(vec![base, reg_index(*dst, instr)?, lo, hi])
        }
        (op, [Operand::Register(dst), Operand::Register(src)]) => {
            let (_, base) = alu_bases(op).ok_or_else(unsupported)?;
            Ok(vec![base, modrm(reg_index(*dst, instr)?, reg_index(*src, instr)?)])
        }
        (op, [Operand::Register(reg)]) => {
            let base = single_reg_base(op).ok_or_else(unsupported)?;
            Ok(vec![base + reg_index(*reg, instr)?])
        }
        _ => Err(unsupported()),
    }
}

/// Bytes for one source line. Blank lines and `label:` lines give none.
pub fn assemble_line(line: &str) -> Result<Vec<u8>> {
    if label_name(line).is_some() {
        return Ok(Vec::new());
    }
    match parse_line(line)? {
        Some(instr) => encode(&instr),
        None => Ok(Vec::new()),
    }
}

/// Concatenated bytes of every line, in order.
pub fn assemble_program<S: AsRef<str>>(lines: &[S]) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    for line in lines {
        bytes.extend(assemble_line(line.as_ref())?);
    }
    Ok(bytes)
}

pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `AAAA: <source>  bytes(pseudo): xx xx ..`, with `--` for lines that
/// have no pseudo-encoding.
pub fn disassemble_line(line: &str, address: u16) -> String {
    let text = crate::instructions::lexer::strip_comment(line).trim();
    let bytes = match assemble_line(line) {
        Ok(b) if !b.is_empty() => format_bytes(&b),
        _ => "--".to_string(),
    };
    format!("{:04X}: {:<24} bytes(pseudo): {}", address, text, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mov_forms() {
        assert_eq!(assemble_line("MOV AX, 0x0003").unwrap(), vec![0xB8, 0x03, 0x00]);
        assert_eq!(assemble_line("mov di, 0x1234").unwrap(), vec![0xBF, 0x34, 0x12]);
        // BX <- AX: dst=3, src=0
        assert_eq!(assemble_line("MOV BX, AX").unwrap(), vec![0x8B, 0xD8]);
    }

    #[test]
    fn alu_forms() {
        assert_eq!(assemble_line("ADD AX, 5").unwrap(), vec![0x70, 0x00, 0x05, 0x00]);
        assert_eq!(assemble_line("XOR CX, 0xFFFF").unwrap(), vec![0x74, 0x01, 0xFF, 0xFF]);
        assert_eq!(assemble_line("SUB DX, BX").unwrap(), vec![0x11, 0xD3]);
        assert_eq!(assemble_line("OR SI, DI").unwrap(), vec![0x13, 0xF7]);
    }

    #[test]
    fn single_register_and_int() {
        assert_eq!(assemble_line("INC BX").unwrap(), vec![0x43]);
        assert_eq!(assemble_line("DEC SP").unwrap(), vec![0x4C]);
        assert_eq!(assemble_line("PUSH BP").unwrap(), vec![0x55]);
        assert_eq!(assemble_line("POP SI").unwrap(), vec![0x5E]);
        assert_eq!(assemble_line("INT 0x21").unwrap(), vec![0xCD, 0x21]);
    }

    #[test]
    fn nothing_for_blank_and_labels() {
        assert!(assemble_line("").unwrap().is_empty());
        assert!(assemble_line("start:").unwrap().is_empty());
    }

    #[test]
    fn unsupported_shapes() {
        assert!(assemble_line("NOT AX").is_err());
        assert!(assemble_line("MOV DS, AX").is_err());
        assert!(assemble_line("INT 0x121").is_err());
        assert!(assemble_line("NOP").is_err());
    }

    #[test]
    fn listing_line() {
        let line = disassemble_line("ADD AX, 1", 0x0200);
        assert!(line.starts_with("0200: ADD AX, 1"));
        assert!(line.ends_with("bytes(pseudo): 70 00 01 00"));
        assert!(disassemble_line("SHL AX", 0).ends_with("bytes(pseudo): --"));
    }
}
