use rust_debug::command::CommandDispatcher;
use rust_debug::cpu::CpuState;
use rust_debug::registers::Register;
mod testrunners;
use testrunners::{cleanup, test_cpu};

#[test]
fn test_register_commands() {
    let mut cpu = test_cpu("test_cmd_registers");
    let dispatcher = CommandDispatcher::new();

    let out = dispatcher.dispatch(&mut cpu, "r");
    assert_eq!(out.lines.len(), 3);
    assert!(out.lines[0].starts_with("AX=0000"));
    assert!(!out.quit);

    let out = dispatcher.dispatch(&mut cpu, "r AX 1234");
    assert!(out.lines[0].starts_with("AX=1234*"));
    assert_eq!(cpu.registers().get(Register::AX), 0x1234);

    let out = dispatcher.dispatch(&mut cpu, "r QX 1");
    assert_eq!(out.lines, vec!["Error: invalid register 'QX'"]);

    let out = dispatcher.dispatch(&mut cpu, "r AX 12345");
    assert_eq!(out.lines, vec!["Input not recognized."]);
    cleanup("test_cmd_registers");
}

#[test]
fn test_execute_and_memory_commands() {
    let mut cpu = test_cpu("test_cmd_execute");
    let dispatcher = CommandDispatcher::new();

    let out = dispatcher.dispatch(&mut cpu, "p MOV BX, 0x0010");
    assert!(out.lines[0].contains("BX=0010*"));

    let out = dispatcher.dispatch(&mut cpu, "p FOO AX");
    assert_eq!(out.lines.len(), 1);
    assert!(out.lines[0].starts_with("Error: unknown opcode 'FOO'"));

    assert!(dispatcher.dispatch(&mut cpu, "e 200 \"HI THERE\"").lines.is_empty());
    let out = dispatcher.dispatch(&mut cpu, "s 0 \"THERE\"");
    assert_eq!(out.lines, vec!["0000:0203"]);

    let out = dispatcher.dispatch(&mut cpu, "d 200 208");
    assert_eq!(out.lines.len(), 1);
    assert!(out.lines[0].starts_with("0000:0200  48 49 20 54"));

    dispatcher.dispatch(&mut cpu, "f 300 304 41 42");
    let out = dispatcher.dispatch(&mut cpu, "c 300 302 200");
    assert_eq!(out.lines, vec!["0000:0300 41 48 0000:0200", "0000:0301 42 49 0000:0201"]);

    let out = dispatcher.dispatch(&mut cpu, "sp 5");
    assert!(out.lines[0].starts_with("Error: invalid page"));

    assert_eq!(dispatcher.dispatch(&mut cpu, "frobnicate").lines, vec!["Input not recognized."]);
    assert!(dispatcher.dispatch(&mut cpu, "").lines.is_empty());
    cleanup("test_cmd_execute");
}

#[test]
fn test_debugger_commands() {
    let mut cpu = test_cpu("test_cmd_debugger");
    let dispatcher = CommandDispatcher::new();

    let out = dispatcher.dispatch(&mut cpu, "step");
    assert_eq!(out.lines, vec!["Error: no program loaded"]);

    cpu.load_program(&["MOV AX, 1", "AGAIN:", "INC AX", "INC AX"], 0x0100);

    let out = dispatcher.dispatch(&mut cpu, "bp again");
    assert_eq!(out.lines, vec!["Breakpoint at 0101"]);
    assert_eq!(dispatcher.dispatch(&mut cpu, "bpl").lines, vec!["0101"]);
    assert!(dispatcher
        .dispatch(&mut cpu, "bp NOWHERE")
        .lines[0]
        .starts_with("Error: unknown label"));

    let out = dispatcher.dispatch(&mut cpu, "cont");
    assert_eq!(out.lines, vec!["breakpoint at 0101 after 1 step(s)"]);

    let out = dispatcher.dispatch(&mut cpu, "step");
    assert_eq!(out.lines, vec!["Executed INC AX"]);

    let out = dispatcher.dispatch(&mut cpu, "cont");
    assert_eq!(out.lines, vec!["program halted after 1 step(s)"]);
    assert_eq!(cpu.registers().get(Register::AX), 3);

    assert_eq!(dispatcher.dispatch(&mut cpu, "delbp 0x0101").lines, vec!["Breakpoint removed"]);
    assert_eq!(dispatcher.dispatch(&mut cpu, "delbp 0x0101").lines, vec!["No breakpoint there"]);

    let out = dispatcher.dispatch(&mut cpu, "disas");
    assert_eq!(out.lines.len(), 3);
    assert!(out.lines[0].starts_with("0100: MOV AX, 1"));

    assert!(dispatcher.dispatch(&mut cpu, "watch AX").lines.is_empty());
    assert_eq!(dispatcher.dispatch(&mut cpu, "watches").lines.len(), 1);
    assert_eq!(dispatcher.dispatch(&mut cpu, "unwatch BX").lines, vec!["No such watch"]);
    assert!(dispatcher.dispatch(&mut cpu, "unwatch ax").lines.is_empty());

    assert_eq!(dispatcher.dispatch(&mut cpu, "trace on").lines, vec!["Trace on"]);
    assert!(cpu.parser.trace_enabled());
    assert_eq!(dispatcher.dispatch(&mut cpu, "trace off").lines, vec!["Trace off"]);
    cleanup("test_cmd_debugger");
}

#[test]
fn test_termination_and_quit() {
    let mut cpu = test_cpu("test_cmd_quit");
    let dispatcher = CommandDispatcher::new();

    let out = dispatcher.dispatch(&mut cpu, "q");
    assert!(out.quit);
    assert!(out.lines.is_empty());

    dispatcher.dispatch(&mut cpu, "p MOV AX, 0x4C07");
    let out = dispatcher.dispatch(&mut cpu, "p INT 0x21");
    assert!(out.quit);
    assert_eq!(out.lines, vec!["Program terminated with exit code 7"]);
    assert_eq!(cpu.state, CpuState::Terminated(7));
    cleanup("test_cmd_quit");
}

#[test]
fn test_disk_commands() {
    let mut cpu = test_cpu("test_cmd_disk");
    let dispatcher = CommandDispatcher::new();

    dispatcher.dispatch(&mut cpu, "e 100 \"AB\"");
    assert_eq!(dispatcher.dispatch(&mut cpu, "w 100 0 2").lines, vec!["2 byte(s) written to disk"]);
    let out = dispatcher.dispatch(&mut cpu, "disk save");
    assert!(out.lines[0].starts_with("Wrote 512 byte(s)"));

    cpu.disk.write(0, 0).unwrap();
    let out = dispatcher.dispatch(&mut cpu, "disk load");
    assert!(out.lines[0].starts_with("Read 512 byte(s)"));
    assert_eq!(dispatcher.dispatch(&mut cpu, "l 400 0 2").lines, vec!["2 byte(s) read from disk"]);
    assert_eq!(dispatcher.dispatch(&mut cpu, "s 400 \"AB\"").lines, vec!["0000:0400"]);

    let out = dispatcher.dispatch(&mut cpu, "disk dump 0 2");
    assert!(out.lines[0].starts_with("000000  41 42"));
    cleanup("test_cmd_disk");
}

#[test]
fn test_huge_arguments_are_errors() {
    let mut cpu = test_cpu("test_cmd_huge_args");
    let dispatcher = CommandDispatcher::new();

    for line in [
        "w 0 FFFFFFFFFFFFFFFF 1",
        "w FFFFFFFFFFFFFFFF 0 1",
        "l FFFFFFFFFFFFFFFF 0 1",
        "l 0 1 FFFFFFFFFFFFFFFF",
        "c 0 1 FFFFFFFFFFFFFFFF",
        "m 0 1 FFFFFFFFFFFFFFFF",
        "d FFFFFFFFFFFFFFFF FFFFFFFFFFFFFFFF",
    ] {
        let out = dispatcher.dispatch(&mut cpu, line);
        assert_eq!(out.lines.len(), 1, "{}", line);
        assert!(out.lines[0].starts_with("Error: "), "{}: {:?}", line, out.lines);
        assert!(!out.quit);
    }
    cleanup("test_cmd_huge_args");
}

#[test]
fn test_breakpoint_addresses_are_hex() {
    let mut cpu = test_cpu("test_cmd_bp_hex");
    let dispatcher = CommandDispatcher::new();
    cpu.load_program(&["INC AX", "INC AX", "INC AX", "INC AX", "INC AX", "INC AX"], 0x0100);

    assert_eq!(dispatcher.dispatch(&mut cpu, "bp 0104").lines, vec!["Breakpoint at 0104"]);
    assert_eq!(dispatcher.dispatch(&mut cpu, "bp 0x0102").lines, vec!["Breakpoint at 0102"]);
    assert_eq!(dispatcher.dispatch(&mut cpu, "bpl").lines, vec!["0102", "0104"]);
    assert!(dispatcher.dispatch(&mut cpu, "bp 10000").lines[0].starts_with("Error: "));

    assert_eq!(dispatcher.dispatch(&mut cpu, "delbp 102").lines, vec!["Breakpoint removed"]);
    let out = dispatcher.dispatch(&mut cpu, "cont");
    assert_eq!(out.lines, vec!["breakpoint at 0104 after 4 step(s)"]);
    assert_eq!(cpu.registers().get(Register::AX), 4);
    cleanup("test_cmd_bp_hex");
}
