//! vtconsole - ANSI terminal output and key input for the Windows console
//!
//! Programs written against a VT100-style terminal print escape sequences and
//! read a stream of key codes. A native Windows console does neither: it has
//! a screen buffer API and delivers batched input records. This crate adapts
//! between the two.
//!
//! - [`AnsiWriter`] replays an output buffer on a [`Console`], turning
//!   `ESC [ K`, `ESC [ A` and `ESC [ n m` into native calls and passing text
//!   through unchanged.
//! - [`KeyTranslator`] polls an [`InputSource`] and yields at most one
//!   application [`KeyCode`] per poll.
//!
//! ```
//! use vtconsole::{AnsiWriter, ConsoleDefaults, MemoryConsole};
//!
//! let mut console = MemoryConsole::new(80, 25);
//! let defaults = ConsoleDefaults::capture(&console).unwrap();
//! AnsiWriter::new(&defaults).write(&mut console, b"\x1b[2mok\x1b[0m\n");
//! assert_eq!(console.row_text(0), "ok");
//! ```

pub mod config;
pub mod core;
pub mod input;

pub use crate::config::Config;
pub use crate::core::{AnsiWriter, Attribute, Console, ConsoleDefaults, ConsoleError, Coord, MemoryConsole};
pub use crate::input::{InputRecord, InputSource, KeyCode, KeyMap, KeySink, KeyTranslator, VirtualKeyMap};
