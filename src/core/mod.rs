//! Console output translation.
//!
//! - **console**: the `Console` primitive trait, attributes, captured defaults
//! - **ansi**: ANSI escape sequence parser and replay onto a `Console`
//! - **memory**: in-memory screen buffer (tests, demo mode)
//! - **win32**: native console handles and initialization (Windows only)
//!
//! # Architecture
//!
//! ```text
//! application bytes
//! └── AnsiWriter
//!     ├── Segments (text / ESC [ params opcode)
//!     └── Console ──> Win32Console | MemoryConsole
//!             ^
//!             └── ConsoleDefaults (captured once at init)
//! ```

pub mod ansi;
pub mod console;
pub mod memory;
#[cfg(windows)]
pub mod win32;

pub use ansi::{AnsiWriter, EscapeCommand, Segment, Segments};
pub use console::{Attribute, Console, ConsoleDefaults, ConsoleError, Coord, ScreenInfo, COLOR_TABLE};
pub use memory::MemoryConsole;
