//! Command-line interpreter: run a Glulx image against a line-oriented
//! stdio presentation provider.

use std::collections::HashMap;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use glulx_isa::glk as glksel;
use glulx_vm::glk::{GlkDispatch, GlkVm};
use glulx_vm::params::VmParams;
use glulx_vm::prelude::Interpreter;

#[derive(Debug, Parser)]
#[command(name = "glulx", about = "Glulx virtual machine interpreter")]
struct Args {
    /// Path to a Glulx game image (.ulx).
    game: PathBuf,

    /// Log instruction execution at trace level.
    #[arg(long)]
    trace: bool,

    /// Snapshots retained for restoreundo.
    #[arg(long, default_value_t = 6)]
    undo_depth: usize,

    /// Stack size override in bytes (multiple of 256).
    #[arg(long)]
    stack_size: Option<u32>,

    /// Feed line input from a file before falling back to stdin.
    #[arg(long)]
    script: Option<PathBuf>,
}

/// Which input the game asked for, if any.
#[derive(Debug, Clone, Copy)]
enum PendingInput {
    Line { win: u32, buf: u32, maxlen: u32 },
    Char { win: u32 },
}

/// A single-window, line-oriented provider over stdin/stdout. Styles,
/// timers and window arrangement are accepted and ignored; memory
/// streams back the save instructions.
#[derive(Debug, Default)]
struct StdioGlk {
    window_open: bool,
    pending: Option<PendingInput>,
    streams: HashMap<u32, (Vec<u8>, usize)>,
    scripted: Vec<String>,
}

impl StdioGlk {
    fn with_script(lines: Vec<String>) -> Self {
        Self {
            scripted: lines,
            ..Self::default()
        }
    }

    fn next_line(&mut self) -> Option<String> {
        if !self.scripted.is_empty() {
            let line = self.scripted.remove(0);
            println!("{line}");
            return Some(line);
        }
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    }
    fn put_char(ch: u32) {
        match char::from_u32(ch) {
            Some(c) => print!("{c}"),
            None => print!("?"),
        }
    }

    fn write_event(vm: &mut GlkVm<'_>, addr: u32, event: [u32; 4]) {
        if addr == u32::MAX {
            for word in event.iter().rev() {
                let _ = vm.push(*word);
            }
        } else if addr != 0 {
            for (i, word) in event.iter().enumerate() {
                let _ = vm.write_word(addr + 4 * i as u32, *word);
            }
        }
    }

    fn select(&mut self, vm: &mut GlkVm<'_>, event_addr: u32) -> u32 {
        let _ = io::stdout().flush();
        match self.pending.take() {
            Some(PendingInput::Line { win, buf, maxlen }) => {
                let Some(line) = self.next_line() else {
                    vm.request_stop();
                    Self::write_event(vm, event_addr, [glksel::EVTYPE_NONE, 0, 0, 0]);
                    return 0;
                };
                let bytes: Vec<u8> = line
                    .trim_end_matches(['\r', '\n'])
                    .bytes()
                    .take(maxlen as usize)
                    .collect();
                let _ = vm.write_bytes(buf, &bytes);
                Self::write_event(
                    vm,
                    event_addr,
                    [glksel::EVTYPE_LINE_INPUT, win, bytes.len() as u32, 0],
                );
                0
            }
            Some(PendingInput::Char { win }) => {
                let mut byte = [0u8; 1];
                if io::stdin().lock().read_exact(&mut byte).is_err() {
                    vm.request_stop();
                    Self::write_event(vm, event_addr, [glksel::EVTYPE_NONE, 0, 0, 0]);
                    return 0;
                }
                Self::write_event(
                    vm,
                    event_addr,
                    [glksel::EVTYPE_CHAR_INPUT, win, byte[0] as u32, 0],
                );
                0
            }
            None => {
                // nothing requested: stopping beats spinning forever
                vm.request_stop();
                Self::write_event(vm, event_addr, [glksel::EVTYPE_NONE, 0, 0, 0]);
                0
            }
        }
    }
}

impl GlkDispatch for StdioGlk {
    fn dispatch(&mut self, vm: &mut GlkVm<'_>, selector: u32, args: &[u32]) -> u32 {
        let arg = |i: usize| args.get(i).copied().unwrap_or(0);
        match selector {
            glksel::EXIT => {
                vm.request_stop();
                0
            }
            glksel::WINDOW_OPEN => {
                if self.window_open {
                    return 0; // a single window is all we offer
                }
                self.window_open = true;
                1
            }
            glksel::WINDOW_CLOSE => {
                self.window_open = false;
                0
            }
            glksel::SET_WINDOW | glksel::SET_STYLE | glksel::WINDOW_CLEAR => 0,
            glksel::WINDOW_GET_SIZE => {
                if arg(1) != 0 {
                    let _ = vm.write_word(arg(1), 80);
                }
                if arg(2) != 0 {
                    let _ = vm.write_word(arg(2), 24);
                }
                0
            }
            glksel::PUT_CHAR | glksel::PUT_CHAR_UNI => {
                Self::put_char(arg(0));
                0
            }
            glksel::PUT_STRING => {
                if let Ok(bytes) = vm.read_cstring(arg(0)) {
                    for b in bytes {
                        Self::put_char(b as u32);
                    }
                }
                0
            }
            glksel::PUT_BUFFER => {
                if let Ok(bytes) = vm.bytes(arg(0), arg(1)) {
                    let owned = bytes.to_vec();
                    for b in owned {
                        Self::put_char(b as u32);
                    }
                }
                0
            }
            glksel::PUT_CHAR_STREAM => {
                self.streams.entry(arg(0)).or_default().0.push(arg(1) as u8);
                0
            }
            glksel::GET_CHAR_STREAM => {
                let entry = self.streams.entry(arg(0)).or_default();
                match entry.0.get(entry.1) {
                    Some(&byte) => {
                        entry.1 += 1;
                        byte as u32
                    }
                    None => u32::MAX,
                }
            }
            glksel::STREAM_OPEN_FILE | glksel::STREAM_OPEN_MEMORY => {
                // hand out small ids; contents live in `streams`
                let id = (self.streams.len() as u32).wrapping_add(16);
                self.streams.entry(id).or_default();
                id
            }
            glksel::STREAM_CLOSE => 0,
            glksel::FILEREF_CREATE_BY_NAME
            | glksel::FILEREF_CREATE_BY_PROMPT
            | glksel::FILEREF_CREATE_TEMP => 1,
            glksel::FILEREF_DESTROY | glksel::FILEREF_DOES_FILE_EXIST => 0,
            glksel::CHAR_TO_LOWER => (arg(0) as u8).to_ascii_lowercase() as u32,
            glksel::CHAR_TO_UPPER => (arg(0) as u8).to_ascii_uppercase() as u32,
            glksel::REQUEST_LINE_EVENT => {
                self.pending = Some(PendingInput::Line {
                    win: arg(0),
                    buf: arg(1),
                    maxlen: arg(2),
                });
                0
            }
            glksel::REQUEST_CHAR_EVENT => {
                self.pending = Some(PendingInput::Char { win: arg(0) });
                0
            }
            glksel::CANCEL_LINE_EVENT | glksel::CANCEL_CHAR_EVENT => {
                self.pending = None;
                0
            }
            glksel::SELECT => self.select(vm, arg(0)),
            glksel::SELECT_POLL => {
                Self::write_event(vm, arg(0), [glksel::EVTYPE_NONE, 0, 0, 0]);
                0
            }
            _ => 0,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.trace {
        tracing::Level::TRACE
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let image = match std::fs::read(&args.game) {
        Ok(image) => image,
        Err(err) => {
            eprintln!("glulx: {}: {err}", args.game.display());
            return ExitCode::FAILURE;
        }
    };
    if image.starts_with(b"FORM") {
        eprintln!("glulx: Blorb containers are not supported; extract the Glulx chunk first");
        return ExitCode::FAILURE;
    }

    let script = match &args.script {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => text.lines().map(str::to_owned).collect(),
            Err(err) => {
                eprintln!("glulx: {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Vec::new(),
    };

    let params = VmParams {
        stack_size: args.stack_size,
        undo_depth: args.undo_depth,
    };
    let mut vm = match Interpreter::new(image, StdioGlk::with_script(script), params) {
        Ok(vm) => vm,
        Err(err) => {
            eprintln!("glulx: {err}");
            return ExitCode::FAILURE;
        }
    };
    match vm.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("glulx: {err}");
            ExitCode::FAILURE
        }
    }
}
