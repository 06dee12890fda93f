use tracing::warn;

use crate::error::Result;
use crate::interrupts;

use super::utils::source_value;
use super::{ExecContext, Instruction, Opcode, Outcome};

pub fn handle(ctx: &mut ExecContext<'_>, instr: &Instruction) -> Result<Outcome> {
    match instr.opcode {
        Opcode::Int => {
            let int_num = source_value(ctx.regs, instr, 0)?;
            interrupts::handle_interrupt(ctx, int_num)
        }
        _ => {
            warn!("[MISC] Unsupported instruction: {}", instr.opcode);
            Ok(Outcome::Continue)
        }
    }
}
