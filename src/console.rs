use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Character device seen by the DOS services.
pub trait Console {
    fn write_bytes(&mut self, bytes: &[u8]);

    /// One line of input without its terminator, or `None` at end of input.
    fn read_line(&mut self) -> Option<String>;
}

/// Process stdin/stdout.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write_bytes(&mut self, bytes: &[u8]) {
        let mut out = io::stdout().lock();
        let _ = out.write_all(bytes);
        let _ = out.flush();
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Scripted console: input lines are queued up front, output is captured.
#[derive(Debug, Default, Clone)]
pub struct BufferedConsole {
    pub output: Vec<u8>,
    pub input: VecDeque<String>,
}

impl BufferedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            output: Vec::new(),
            input: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Console for BufferedConsole {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }

    fn read_line(&mut self) -> Option<String> {
        self.input.pop_front()
    }
}
