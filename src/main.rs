//! vtconsole - run ANSI terminal output on the Windows console
//!
//! Reads a byte stream containing ANSI escape sequences and replays it on the
//! native console, or echoes translated key codes.
//!
//! # Quick Start
//!
//! ```text
//! vtconsole build.log         # Show a colored log file
//! some-tool | vtconsole       # Translate a program's output
//! vtconsole --keys            # Show the key codes of pressed keys
//! ```
//!
//! Off Windows the output is replayed on an in-memory screen sized like the
//! current terminal, which is then printed.

use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vtconsole::config::{Config, LoggingConfig};
use vtconsole::input::{keys, InputSource, KeyCode, KeyTranslator, VirtualKeyMap};
use vtconsole::{AnsiWriter, Console};

/// Command line options
#[derive(Debug, Default)]
struct Options {
    /// Input file, stdin when absent
    input: Option<PathBuf>,
    /// Echo key codes instead of translating output
    keys: bool,
    /// Config file overriding ~/.vtconsole/config.toml
    config: Option<PathBuf>,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("vtconsole {}", VERSION);
}

fn print_help() {
    eprintln!("vtconsole {} - ANSI terminal output on the Windows console", VERSION);
    eprintln!();
    eprintln!("Usage: vtconsole [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("  FILE                  Translate FILE (default: stdin)");
    eprintln!("  -k, --keys            Print key codes of pressed keys (q or Esc quits)");
    eprintln!("  -c, --config <FILE>   Use FILE instead of ~/.vtconsole/config.toml");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Supported sequences: ESC[K (erase line), ESC[A (cursor up),");
    eprintln!("                     ESC[<n>m with n = 0..7 (color / reset)");
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-k" | "--keys" => {
                options.keys = true;
            }
            "-c" | "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing config file argument".to_string());
                }
                options.config = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with('-') && arg != "-" => {
                return Err(format!("Unknown option: {}", arg));
            }
            arg => {
                if options.input.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                if arg != "-" {
                    options.input = Some(PathBuf::from(arg));
                }
            }
        }
        i += 1;
    }

    Ok(options)
}

/// Log to a file; the console itself is the program's output
fn init_logging(logging: &LoggingConfig) {
    let log_path = logging.log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&logging.level));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let config = match &options.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    init_logging(&config.logging);
    info!("vtconsole starting...");

    if options.keys {
        run_keys(&config)
    } else {
        run_translate(&config, &options)
    }
}

fn open_input(options: &Options) -> anyhow::Result<Box<dyn BufRead>> {
    match &options.input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// Feed the input line by line so piped output shows up as it arrives
fn for_each_line(mut input: Box<dyn BufRead>, mut f: impl FnMut(&[u8])) -> anyhow::Result<()> {
    let mut line = Vec::new();
    loop {
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }
        f(&line);
    }
}

#[cfg(windows)]
fn run_translate(config: &Config, options: &Options) -> anyhow::Result<()> {
    use vtconsole::core::win32;

    let mut terminal = win32::init(&config.console).context("Failed to initialize console")?;
    let (cols, rows) = terminal.stdout.terminal_size()?;
    info!("Terminal size: {}x{}", cols, rows);

    let writer = AnsiWriter::new(&terminal.defaults);
    let result = open_input(options)
        .and_then(|input| for_each_line(input, |line| writer.write(&mut terminal.stdout, line)));

    if let Err(e) = result {
        report_error(&writer, &mut terminal.stderr, &e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(not(windows))]
fn run_translate(_config: &Config, options: &Options) -> anyhow::Result<()> {
    use std::io::Read;
    use vtconsole::{ConsoleDefaults, MemoryConsole};

    let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 25));
    info!("Demo mode, screen {}x{}", cols, rows);

    let mut console = MemoryConsole::new(cols, rows);
    let defaults = ConsoleDefaults::capture(&console)?;
    let writer = AnsiWriter::new(&defaults);

    let mut buf = Vec::new();
    let result = open_input(options).and_then(|mut input| {
        input.read_to_end(&mut buf)?;
        Ok(())
    });
    writer.write(&mut console, &buf);
    if let Err(e) = &result {
        report_error(&writer, &mut console, e);
    }

    let mut stdout = io::stdout().lock();
    console.render(&mut stdout)?;
    stdout.flush()?;

    if result.is_err() {
        std::process::exit(1);
    }
    Ok(())
}

/// Print an error line in bright red through the translator
fn report_error<C: Console + ?Sized>(writer: &AnsiWriter<'_>, console: &mut C, err: &anyhow::Error) {
    let line = format!("\x1b[1mvtconsole: {:#}\x1b[0m\n", err);
    writer.write(console, line.as_bytes());
}

#[cfg(windows)]
fn run_keys(config: &Config) -> anyhow::Result<()> {
    use vtconsole::core::win32;

    let mut terminal = win32::init(&config.console).context("Failed to initialize console")?;
    echo_keys(&mut terminal.input, config.input.poll_interval())
}

#[cfg(not(windows))]
fn run_keys(config: &Config) -> anyhow::Result<()> {
    use crossterm::terminal;
    use vtconsole::input::TermEvents;

    terminal::enable_raw_mode()?;
    let result = echo_keys(&mut TermEvents::new(), config.input.poll_interval());
    terminal::disable_raw_mode()?;
    result
}

/// Print every translated key until `q` or Esc
fn echo_keys<S: InputSource>(source: &mut S, interval: Duration) -> anyhow::Result<()> {
    let translator = KeyTranslator::new(VirtualKeyMap);
    let mut pending: Vec<KeyCode> = Vec::new();
    let mut stdout = io::stdout();

    write!(stdout, "Press keys, q or Esc to quit\r\n")?;
    stdout.flush()?;

    loop {
        if !translator.read_keys(source, &mut pending) {
            thread::sleep(interval);
            continue;
        }

        for key in pending.drain(..) {
            write!(stdout, "{:<12} {:#x}\r\n", key.to_string(), key.0)?;
            if key == keys::ESC || key == KeyCode('q' as u32) {
                stdout.flush()?;
                info!("Key echo finished");
                return Ok(());
            }
        }
        stdout.flush()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtconsole::core::COLOR_TABLE;
    use vtconsole::{Attribute, ConsoleDefaults, MemoryConsole};

    #[test]
    fn test_report_error_is_colored_then_reset() {
        let defaults = ConsoleDefaults::new(COLOR_TABLE[7]);
        let mut console = MemoryConsole::with_attribute(60, 3, defaults.default_attr());
        let err = anyhow::anyhow!("No such file").context("Failed to open x.log");

        report_error(&AnsiWriter::new(&defaults), &mut console, &err);

        assert_eq!(console.row_text(0), "vtconsole: Failed to open x.log: No such file");
        assert_eq!(
            console.cell(0, 0).map(|c| c.attr),
            Some(COLOR_TABLE[1] | Attribute::FOREGROUND_INTENSITY)
        );
        assert_eq!(console.attribute(), defaults.default_attr());
    }
}
