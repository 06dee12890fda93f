use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmuError>;

/// Rejected memory accesses. Nothing is written when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("invalid page {page:04X} (memory has {pages} page(s))")]
    InvalidPage { page: usize, pages: usize },
    #[error("invalid address {0:X} (pages are 64K)")]
    InvalidAddress(usize),
    #[error("invalid byte value {0} (must be 0-255)")]
    InvalidValue(u32),
    #[error("{len} byte(s) at {address:04X} would overflow the page")]
    Overflow { address: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum DiskError {
    #[error("invalid sector {sector} (disk has {size} sectors)")]
    InvalidSector { sector: i64, size: usize },
    #[error("invalid byte value {0} (must be 0-255)")]
    InvalidValue(u32),
    #[error("problem accessing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Lexing and grammar failures. `column` is the 1-based position of the
/// offending text in the source line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown opcode '{text}' at column {column}")]
    UnknownOpcode { text: String, column: usize },
    #[error("invalid operand '{text}' at column {column}")]
    InvalidOperand { text: String, column: usize },
    #[error("unexpected token '{text}' at column {column}")]
    UnexpectedToken { text: String, column: usize },
    #[error("unexpected end of line after '{0}'")]
    UnexpectedEnd(String),
    #[error("{opcode} expects {expected} operand(s), found {found}")]
    OperandCount {
        opcode: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Well-formed instructions the machine cannot carry out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("invalid register '{0}'")]
    InvalidRegister(String),
    #[error("unsupported interrupt vector {0:#04X}")]
    UnsupportedInterrupt(u16),
    #[error("unsupported INT 21h service AH={0:#04X}")]
    UnsupportedService(u8),
    #[error("cannot encode '{0}'")]
    Encoding(String),
}

#[derive(Debug, Error)]
pub enum EmuError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Disk(#[from] DiskError),
    #[error("unknown label '{0}'")]
    UnknownLabel(String),
    #[error("invalid watch expression '{0}'")]
    InvalidWatch(String),
    #[error("no program loaded")]
    NoProgram,
    #[error("problem reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
