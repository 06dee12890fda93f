use rust_debug::registers::{CpuFlags, Register};
mod testrunners;
use testrunners::{cleanup, run_lines, test_cpu};

#[test]
fn test_logic_and_or_xor_clear_carry() {
    let mut cpu = test_cpu("test_logic_bitwise");

    // Set CF first so we can see it being forced to 0
    run_lines(&mut cpu, &["MOV AX, 0xFFFF", "ADD AX, 1"]);
    assert!(cpu.registers().flag(CpuFlags::CF));

    run_lines(&mut cpu, &["MOV AX, 0x0F0F", "AND AX, 0x00FF"]);
    assert_eq!(cpu.registers().get(Register::AX), 0x000F);
    assert!(!cpu.registers().flag(CpuFlags::CF));
    // 0x0F has four bits set: even parity
    assert!(cpu.registers().flag(CpuFlags::PF));

    run_lines(&mut cpu, &["OR AX, 0x8000"]);
    assert_eq!(cpu.registers().get(Register::AX), 0x800F);
    assert!(cpu.registers().flag(CpuFlags::SF));

    run_lines(&mut cpu, &["MOV BX, AX", "XOR AX, BX"]);
    assert_eq!(cpu.registers().get(Register::AX), 0);
    assert!(cpu.registers().flag(CpuFlags::ZF));
    assert!(!cpu.registers().flag(CpuFlags::CF));
    cleanup("test_logic_bitwise");
}

#[test]
fn test_logic_not_keeps_flags() {
    let mut cpu = test_cpu("test_logic_not");
    run_lines(&mut cpu, &["MOV AX, 0", "ADD AX, 0"]);
    assert!(cpu.registers().flag(CpuFlags::ZF));

    run_lines(&mut cpu, &["NOT AX"]);
    assert_eq!(cpu.registers().get(Register::AX), 0xFFFF);
    // NOT leaves the flags from the ADD
    assert!(cpu.registers().flag(CpuFlags::ZF));
    assert!(!cpu.registers().flag(CpuFlags::SF));
    cleanup("test_logic_not");
}

#[test]
fn test_logic_shifts() {
    let mut cpu = test_cpu("test_logic_shifts");

    run_lines(&mut cpu, &["MOV AX, 0x8001", "SHL AX"]);
    assert_eq!(cpu.registers().get(Register::AX), 0x0002);
    assert!(cpu.registers().flag(CpuFlags::CF));

    run_lines(&mut cpu, &["SHR AX"]);
    assert_eq!(cpu.registers().get(Register::AX), 0x0001);
    assert!(!cpu.registers().flag(CpuFlags::CF));

    run_lines(&mut cpu, &["SHR AX"]);
    assert_eq!(cpu.registers().get(Register::AX), 0);
    assert!(cpu.registers().flag(CpuFlags::CF));
    assert!(cpu.registers().flag(CpuFlags::ZF));
    cleanup("test_logic_shifts");
}

#[test]
fn test_logic_rotates() {
    let mut cpu = test_cpu("test_logic_rotates");

    // ROL moves bit 15 into bit 0 and CF
    run_lines(&mut cpu, &["MOV AX, 0x8001", "ROL AX"]);
    assert_eq!(cpu.registers().get(Register::AX), 0x0003);
    assert!(cpu.registers().flag(CpuFlags::CF));

    // ROR moves bit 0 into bit 15 and CF
    run_lines(&mut cpu, &["ROR AX"]);
    assert_eq!(cpu.registers().get(Register::AX), 0x8001);
    assert!(cpu.registers().flag(CpuFlags::CF));

    run_lines(&mut cpu, &["MOV DX, 0x0002", "ROR DX"]);
    assert_eq!(cpu.registers().get(Register::DX), 0x0001);
    assert!(!cpu.registers().flag(CpuFlags::CF));
    cleanup("test_logic_rotates");
}
