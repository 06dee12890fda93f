use tracing::warn;

use crate::error::{ExecError, Result};
use crate::instructions::{ExecContext, Outcome};

pub mod int21;

pub fn handle_interrupt(ctx: &mut ExecContext<'_>, vector: u16) -> Result<Outcome> {
    match vector {
        0x21 => int21::handle(ctx),
        _ => {
            warn!("[CPU] Unhandled Interrupt Vector {:02X}", vector);
            Err(ExecError::UnsupportedInterrupt(vector).into())
        }
    }
}
