pub mod assembler;
pub mod command;
pub mod console;
pub mod cpu;
pub mod debugger;
pub mod disk;
pub mod error;
pub mod instructions;
pub mod interrupts;
pub mod memory;
pub mod parser;
pub mod registers;
pub mod trace;
