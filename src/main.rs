use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rust_debug::command::CommandDispatcher;
use rust_debug::cpu::{Cpu, CpuConfig, CpuState};
use rust_debug::debugger::parse_hex;
use rust_debug::parser::{tee_sink, TraceSink};

/// DOS DEBUG-style 8086 emulator and debugger
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of 64K memory pages
    #[arg(long, default_value_t = 1, value_parser = parse_pages)]
    pages: usize,

    /// Page targeted by single-address memory operations
    #[arg(long, default_value_t = 0)]
    active_page: usize,

    /// Virtual disk size in bytes
    #[arg(long, default_value_t = 512)]
    disk_size: usize,

    /// Logical disk name; the backing file is `.<name>`
    #[arg(long, default_value = "vdisk")]
    disk_name: String,

    /// Directory holding the disk file (defaults to the home directory)
    #[arg(long)]
    disk_dir: Option<PathBuf>,

    /// Source file to load at startup
    #[arg(long)]
    program: Option<PathBuf>,

    /// Program base address (hex)
    #[arg(long, default_value = "0100", value_parser = parse_base)]
    base: u16,

    /// Start with tracing enabled
    #[arg(long)]
    trace: bool,

    /// Also write trace lines to a file (timestamped name when none is given)
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    trace_log: Option<String>,

    /// Default step limit for `cont`
    #[arg(long, default_value_t = 10_000)]
    max_steps: usize,
}

fn parse_pages(text: &str) -> Result<usize, String> {
    match text.parse::<usize>() {
        Ok(0) => Err("at least one page is required".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_base(text: &str) -> Result<u16, String> {
    parse_hex(text)
        .and_then(|v| u16::try_from(v).ok())
        .ok_or_else(|| format!("'{}' is not a 16-bit hex address", text))
}

fn trace_log_sink(name: &str) -> io::Result<(String, TraceSink)> {
    let filename = if name.is_empty() {
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        format!("rust-debug_trace_{}.log", timestamp)
    } else {
        name.to_string()
    };
    let writer = BufWriter::new(File::create(&filename)?);
    let sink = tee_sink(writer, filename.clone());
    Ok((filename, sink))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = CpuConfig {
        pages: args.pages,
        active_page: args.active_page,
        disk_size: args.disk_size,
        disk_name: args.disk_name.clone(),
        disk_dir: args.disk_dir.clone(),
        base_addr: args.base,
        trace: args.trace,
        max_steps: args.max_steps,
    };

    let mut cpu = match Cpu::new(config) {
        Ok(cpu) => cpu,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(name) = &args.trace_log {
        match trace_log_sink(name) {
            Ok((filename, sink)) => {
                info!("[TRACE] logging to {}", filename);
                cpu.enable_trace(cpu.parser.trace_enabled(), Some(sink));
            }
            Err(e) => eprintln!("Error: cannot create trace log: {}", e),
        }
    }

    if let Some(path) = &args.program {
        match cpu.load_program_file(path, args.base) {
            Ok(n) => println!("Loaded {} line(s) from {}", n, path.display()),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    let dispatcher = CommandDispatcher::new();
    let stdin = io::stdin();
    loop {
        print!("-");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                error!("stdin: {}", e);
                break;
            }
        }

        let output = dispatcher.dispatch(&mut cpu, &line);
        for l in &output.lines {
            println!("{}", l);
        }
        if output.quit {
            break;
        }
    }

    match cpu.state {
        CpuState::Terminated(code) => ExitCode::from(code),
        CpuState::Running => ExitCode::SUCCESS,
    }
}
