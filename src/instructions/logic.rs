use tracing::warn;

use crate::error::Result;
use crate::registers::FlagOp;

use super::utils::{dest_register, source_value};
use super::{ExecContext, Instruction, Opcode, Outcome};

pub fn handle(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<Outcome> {
    match instr.opcode {
        Opcode::And | Opcode::Or | Opcode::Xor => bitwise(ctx, instr)?,
        Opcode::Not => not(ctx, instr)?,
        Opcode::Shl | Opcode::Shr => shift(ctx, instr)?,
        Opcode::Rol | Opcode::Ror => rotate(ctx, instr)?,
        _ => warn!("[LOGIC] Unsupported instruction: {}", instr.opcode),
    }
    Ok(Outcome::Continue)
}

// AND/OR/XOR always clear CF
fn bitwise(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<()> {
    let dest = dest_register(instr)?;
    let a = ctx.regs.get(dest);
    let b = source_value(ctx.regs, instr, 1)?;
    let result = match instr.opcode {
        Opcode::And => a & b,
        Opcode::Or => a | b,
        _ => a ^ b,
    };

    ctx.regs.set(dest, result as u32);
    ctx.regs.update_flags(result as u32, Some(FlagOp::Logic), Some(false));
    Ok(())
}

// NOT does not affect flags
fn not(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<()> {
    let dest = dest_register(instr)?;
    let result = !ctx.regs.get(dest);
    ctx.regs.set(dest, result as u32);
    Ok(())
}

fn shift(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<()> {
    let dest = dest_register(instr)?;
    let val = ctx.regs.get(dest);
    let (result, carry) = if instr.opcode == Opcode::Shl {
        (val << 1, val & 0x8000 != 0)
    } else {
        (val >> 1, val & 0x0001 != 0)
    };

    ctx.regs.set(dest, result as u32);
    ctx.regs.update_flags(result as u32, Some(FlagOp::Shift), Some(carry));
    Ok(())
}

// CF receives the bit that wrapped around
fn rotate(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<()> {
    let dest = dest_register(instr)?;
    let val = ctx.regs.get(dest);
    let (result, carry) = if instr.opcode == Opcode::Rol {
        (val.rotate_left(1), val & 0x8000 != 0)
    } else {
        (val.rotate_right(1), val & 0x0001 != 0)
    };

    ctx.regs.set(dest, result as u32);
    ctx.regs.update_flags(result as u32, Some(FlagOp::Rotate), Some(carry));
    Ok(())
}
