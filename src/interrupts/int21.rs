use tracing::{info, warn};

use crate::error::{ExecError, MemoryError, Result};
use crate::instructions::{ExecContext, Outcome};
use crate::memory::PAGE_SIZE;
use crate::registers::Register;

pub fn handle(ctx: &mut ExecContext<'_>) -> Result<Outcome> {
    let ah = ctx.regs.get_upper(Register::AX);
    match ah {
        // AH = 09h: Print String
        // DS:DX -> '$'-terminated string on the active page
        0x09 => {
            let mut offset = dos_address(ctx)?;
            let page = ctx.memory.active_page();
            let mut text = Vec::new();
            loop {
                let char_byte = ctx.memory.peek(page, offset)?;
                if char_byte == b'$' {
                    break;
                }
                text.push(char_byte);
                offset += 1;
            }
            ctx.console.write_bytes(&text);
            Ok(Outcome::Continue)
        }

        // AH = 0Ah: Buffered Keyboard Input
        // [DS:DX] = max length, [DS:DX+1] <- actual length, [DS:DX+2..] <- text, then 00h
        0x0A => {
            let buffer = dos_address(ctx)?;
            let page = ctx.memory.active_page();
            let max_len = ctx.memory.peek(page, buffer)? as usize;

            // Whole buffer must fit before anything is read or written
            let end = buffer + 2 + max_len;
            if end >= PAGE_SIZE {
                return Err(MemoryError::Overflow {
                    address: buffer,
                    len: max_len + 3,
                }
                .into());
            }

            let line = ctx.console.read_line().unwrap_or_default();
            let input: Vec<u8> = line.bytes().take(max_len).collect();

            ctx.memory.poke(page, buffer + 1, input.len() as u32)?;
            ctx.memory.poke_bytes(page, buffer + 2, &input)?;
            ctx.memory.poke(page, buffer + 2 + input.len(), 0)?;
            Ok(Outcome::Continue)
        }

        // AH = 4Ch: Terminate with Return Code
        0x4C => {
            let exit_code = ctx.regs.get_lower(Register::AX);
            info!("[DOS] Program Terminated (INT 21h, 4Ch). ExitCode={:02X}", exit_code);
            Ok(Outcome::Exit(exit_code))
        }

        _ => {
            warn!("[DOS] Unhandled INT 21h Function AH={:02X}", ah);
            Err(ExecError::UnsupportedService(ah).into())
        }
    }
}

/// Linear address `(DS << 4) + DX`; anything past the page is an address error.
fn dos_address(ctx: &ExecContext<'_>) -> Result<usize> {
    let addr = ((ctx.regs.get(Register::DS) as usize) << 4) + ctx.regs.get(Register::DX) as usize;
    if addr >= PAGE_SIZE {
        return Err(MemoryError::InvalidAddress(addr).into());
    }
    Ok(addr)
}
