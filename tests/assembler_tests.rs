use rust_debug::assembler::{assemble_line, assemble_program, disassemble_line};
mod testrunners;
use testrunners::{cleanup, test_cpu};

#[test]
fn test_assemble_program_flattens_lines() {
    let program = [
        "start:",
        "MOV AX, 0x0003",
        "",
        "ADD AX, 5",
        "MOV BX, AX",
        "INT 0x21",
    ];
    let bytes = assemble_program(&program).unwrap();
    assert_eq!(
        bytes,
        vec![0xB8, 0x03, 0x00, 0x70, 0x00, 0x05, 0x00, 0x8B, 0xD8, 0xCD, 0x21]
    );
}

#[test]
fn test_assemble_logic_families() {
    assert_eq!(assemble_line("AND BX, 0x00FF").unwrap(), vec![0x72, 0x03, 0xFF, 0x00]);
    assert_eq!(assemble_line("OR AX, BX").unwrap(), vec![0x13, 0xC3]);
    assert_eq!(assemble_line("XOR DX, DX").unwrap(), vec![0x14, 0xD2]);
    assert_eq!(assemble_line("SUB SP, 2").unwrap(), vec![0x71, 0x04, 0x02, 0x00]);
}

#[test]
fn test_assemble_rejects_unsupported() {
    let err = assemble_line("ROL AX").unwrap_err();
    assert!(err.to_string().contains("cannot encode"));
    assert!(assemble_program(&["MOV AX, 1", "NEG AX"]).is_err());
}

#[test]
fn test_disassemble_loaded_program() {
    let mut cpu = test_cpu("test_disassemble_loaded");
    cpu.load_program(&["MOV AX, 0x0003", "here:", "ADD AX, 1 ; bump", "SHL AX"], 0x0100);

    let listing = cpu.disassemble().unwrap();
    assert_eq!(listing.len(), 3);
    assert!(listing[0].starts_with("0100: MOV AX, 0x0003"));
    assert!(listing[0].ends_with("bytes(pseudo): B8 03 00"));
    assert!(listing[1].starts_with("0101: ADD AX, 1"));
    assert!(listing[2].ends_with("bytes(pseudo): --"));

    // Nothing was executed
    assert_eq!(cpu.registers().get_by_name("AX").unwrap(), 0);
    cleanup("test_disassemble_loaded");
}

#[test]
fn test_disassemble_single_line() {
    let line = disassemble_line("add ax, 1 ; comment", 0x0200);
    assert!(line.starts_with("0200: add ax, 1"));
    assert!(line.ends_with("bytes(pseudo): 70 00 01 00"));
    assert!(!line.contains("comment"));
}

#[test]
fn test_disassemble_without_program() {
    let cpu = test_cpu("test_disassemble_none");
    assert!(cpu.disassemble().is_err());
    cleanup("test_disassemble_none");
}
