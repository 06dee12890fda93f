#![allow(dead_code)]

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use rust_debug::console::BufferedConsole;
use rust_debug::cpu::{Cpu, CpuConfig};
use rust_debug::instructions::Outcome;

/// A one-page machine with a scripted console. The disk file lives under
/// `target/<dir>`, which is created fresh.
pub fn test_cpu(dir: &str) -> Cpu<BufferedConsole> {
    test_cpu_with_input(dir, Vec::<String>::new())
}

pub fn test_cpu_with_input<I, S>(dir: &str, input: I) -> Cpu<BufferedConsole>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let disk_dir = PathBuf::from("target").join(dir);
    if disk_dir.exists() {
        std::fs::remove_dir_all(&disk_dir).unwrap();
    }
    std::fs::create_dir_all(&disk_dir).unwrap();

    let config = CpuConfig {
        disk_dir: Some(disk_dir),
        ..CpuConfig::default()
    };
    Cpu::with_console(config, BufferedConsole::with_input(input)).unwrap()
}

/// Executes each line in order, panicking on the first error.
pub fn run_lines(cpu: &mut Cpu<BufferedConsole>, lines: &[&str]) -> Outcome {
    let mut last = Outcome::Continue;
    for line in lines {
        last = cpu
            .parse_instruction(line)
            .unwrap_or_else(|e| panic!("'{}' failed: {}", line, e));
    }
    last
}

/// Routes trace/watch/break lines into a shared vector.
pub fn capture_trace(cpu: &mut Cpu<BufferedConsole>, on: bool) -> Rc<RefCell<Vec<String>>> {
    let lines = Rc::new(RefCell::new(Vec::new()));
    let sink = lines.clone();
    cpu.enable_trace(on, Some(Box::new(move |l: &str| sink.borrow_mut().push(l.to_string()))));
    lines
}

pub fn cleanup(dir: &str) {
    let _ = std::fs::remove_dir_all(PathBuf::from("target").join(dir));
}
