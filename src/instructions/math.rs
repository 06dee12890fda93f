use tracing::warn;

use crate::error::Result;
use crate::registers::FlagOp;

use super::utils::{dest_register, source_value};
use super::{ExecContext, Instruction, Opcode, Outcome};

pub fn handle(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<Outcome> {
    match instr.opcode {
        Opcode::Add => add(ctx, instr)?,
        Opcode::Sub => sub(ctx, instr)?,
        Opcode::Inc => inc(ctx, instr)?,
        Opcode::Dec => dec(ctx, instr)?,
        Opcode::Neg => neg(ctx, instr)?,
        _ => warn!("[MATH] Unsupported instruction: {}", instr.opcode),
    }
    Ok(Outcome::Continue)
}

// ADD: CF set when the unsigned sum leaves 16 bits
fn add(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<()> {
    let dest = dest_register(instr)?;
    let a = ctx.regs.get(dest) as u32;
    let b = source_value(ctx.regs, instr, 1)? as u32;
    let result = a + b;

    ctx.regs.set(dest, result);
    ctx.regs.update_flags(result, Some(FlagOp::Add), Some(result > 0xFFFF));
    Ok(())
}

// SUB: CF set on borrow (b > a)
fn sub(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<()> {
    let dest = dest_register(instr)?;
    let a = ctx.regs.get(dest);
    let b = source_value(ctx.regs, instr, 1)?;
    let result = a.wrapping_sub(b);

    ctx.regs.set(dest, result as u32);
    ctx.regs.update_flags(result as u32, Some(FlagOp::Sub), Some(b > a));
    Ok(())
}

// INC/DEC leave CF alone
fn inc(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<()> {
    let dest = dest_register(instr)?;
    let result = ctx.regs.get(dest).wrapping_add(1);
    ctx.regs.set(dest, result as u32);
    ctx.regs.update_flags(result as u32, Some(FlagOp::Inc), None);
    Ok(())
}

fn dec(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<()> {
    let dest = dest_register(instr)?;
    let result = ctx.regs.get(dest).wrapping_sub(1);
    ctx.regs.set(dest, result as u32);
    ctx.regs.update_flags(result as u32, Some(FlagOp::Dec), None);
    Ok(())
}

// NEG is 0 - dest: borrows unless dest was zero
fn neg(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<()> {
    let dest = dest_register(instr)?;
    let a = ctx.regs.get(dest);
    let result = 0u16.wrapping_sub(a);
    ctx.regs.set(dest, result as u32);
    ctx.regs.update_flags(result as u32, Some(FlagOp::Sub), Some(a != 0));
    Ok(())
}
