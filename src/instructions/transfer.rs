use tracing::warn;

use crate::error::Result;
use crate::registers::Register;

use super::utils::{dest_register, source_value};
use super::{ExecContext, Instruction, Opcode, Outcome};

pub fn handle(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<Outcome> {
    match instr.opcode {
        Opcode::Mov => mov(ctx, instr)?,

        // Stack Operations
        Opcode::Push => push(ctx, instr)?,
        Opcode::Pop => pop(ctx, instr)?,

        _ => warn!("[TRANSFER] Unsupported instruction: {}", instr.opcode),
    }
    Ok(Outcome::Continue)
}

// MOV does not affect flags
fn mov(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<()> {
    let dest = dest_register(instr)?;
    let val = source_value(ctx.regs, instr, 1)?;
    ctx.regs.set(dest, val as u32);
    Ok(())
}

// The stack lives on the active page; SP wraps within it.
// SP only moves once the memory access has succeeded.
fn push(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<()> {
    let src = dest_register(instr)?;
    let value = ctx.regs.get(src);
    let sp = ctx.regs.get(Register::SP).wrapping_sub(2);

    let page = ctx.memory.active_page();
    ctx.memory.write_16(page, sp as usize, value)?;
    ctx.regs.set(Register::SP, sp as u32);
    Ok(())
}

fn pop(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<()> {
    let dest = dest_register(instr)?;
    let sp = ctx.regs.get(Register::SP);

    let page = ctx.memory.active_page();
    let value = ctx.memory.read_16(page, sp as usize)?;
    ctx.regs.set(Register::SP, sp.wrapping_add(2) as u32);
    ctx.regs.set(dest, value as u32);
    Ok(())
}
