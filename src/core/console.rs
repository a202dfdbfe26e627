//! Native console primitives
//!
//! The translators only talk to the screen through the [`Console`] trait, which
//! mirrors the handful of screen-buffer calls a native console exposes. The
//! Win32 backend lives in `win32.rs`, an in-memory grid in `memory.rs`.

use bitflags::bitflags;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Failed to get standard handle: {0}")]
    StdHandle(String),

    #[error("Failed to query console: {0}")]
    Query(String),

    #[error("Failed to update console: {0}")]
    Update(String),

    #[error("Failed to write to console: {0}")]
    Write(#[source] std::io::Error),

    #[error("Failed to read console input: {0}")]
    Read(String),

    #[error("Not attached to a console")]
    NoConsole,
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

bitflags! {
    /// Character attribute bits, laid out as the native console stores them.
    ///
    /// Other native bits (DBCS lead/trailing, grid lines) survive through
    /// `from_bits_retain`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Attribute: u16 {
        const FOREGROUND_BLUE      = 0x0001;
        const FOREGROUND_GREEN     = 0x0002;
        const FOREGROUND_RED       = 0x0004;
        const FOREGROUND_INTENSITY = 0x0008;
        const BACKGROUND_BLUE      = 0x0010;
        const BACKGROUND_GREEN     = 0x0020;
        const BACKGROUND_RED       = 0x0040;
        const BACKGROUND_INTENSITY = 0x0080;
    }
}

/// ANSI color index (0-7) to native foreground bits
pub const COLOR_TABLE: [Attribute; 8] = [
    Attribute::empty(),
    Attribute::FOREGROUND_RED,
    Attribute::FOREGROUND_GREEN,
    Attribute::FOREGROUND_GREEN.union(Attribute::FOREGROUND_RED),
    Attribute::FOREGROUND_BLUE,
    Attribute::FOREGROUND_BLUE.union(Attribute::FOREGROUND_RED),
    Attribute::FOREGROUND_BLUE.union(Attribute::FOREGROUND_GREEN),
    Attribute::FOREGROUND_BLUE
        .union(Attribute::FOREGROUND_GREEN)
        .union(Attribute::FOREGROUND_RED),
];

/// Cell coordinate, 0-based. Signed like the native type: rows above the
/// buffer are representable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Coord {
    pub x: i16,
    pub y: i16,
}

impl Coord {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// Snapshot of the screen buffer geometry and state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScreenInfo {
    /// Buffer size in cells
    pub size: Coord,
    pub cursor: Coord,
    pub attributes: Attribute,
    /// Largest window the buffer can be shown in
    pub max_window: Coord,
}

/// Screen-buffer operations of a native console.
///
/// Every call is allowed to fail; callers in this crate treat failures as
/// best-effort no-ops.
pub trait Console {
    fn screen_info(&self) -> Result<ScreenInfo>;

    fn set_cursor_position(&mut self, at: Coord) -> Result<()>;

    /// Write `ch` into `len` cells starting at `at`, without moving the cursor
    fn fill_output_character(&mut self, ch: char, len: u32, at: Coord) -> Result<u32>;

    fn set_text_attribute(&mut self, attr: Attribute) -> Result<()>;

    /// Write literal text at the cursor. The bytes are UTF-8 (lossy); the
    /// backend converts to whatever the device expects.
    fn write_text(&mut self, text: &[u8]) -> Result<()>;
}

impl<C: Console + ?Sized> Console for &mut C {
    fn screen_info(&self) -> Result<ScreenInfo> {
        (**self).screen_info()
    }

    fn set_cursor_position(&mut self, at: Coord) -> Result<()> {
        (**self).set_cursor_position(at)
    }

    fn fill_output_character(&mut self, ch: char, len: u32, at: Coord) -> Result<u32> {
        (**self).fill_output_character(ch, len, at)
    }

    fn set_text_attribute(&mut self, attr: Attribute) -> Result<()> {
        (**self).set_text_attribute(attr)
    }

    fn write_text(&mut self, text: &[u8]) -> Result<()> {
        (**self).write_text(text)
    }
}

/// Console state captured once at startup, before any escape processing.
///
/// Shared read-only by every console handle of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsoleDefaults {
    default_attr: Attribute,
}

impl ConsoleDefaults {
    pub const fn new(default_attr: Attribute) -> Self {
        Self { default_attr }
    }

    /// Capture the current attribute of `console` as the reset target
    pub fn capture<C: Console + ?Sized>(console: &C) -> Result<Self> {
        let info = console.screen_info()?;
        tracing::info!("Default console attribute: {:#06x}", info.attributes.bits());
        Ok(Self::new(info.attributes))
    }

    /// Attribute restored by `ESC [ 0 m`
    pub fn default_attr(&self) -> Attribute {
        self.default_attr
    }
}

impl Default for ConsoleDefaults {
    /// Light gray on black, the stock console colors
    fn default() -> Self {
        Self::new(COLOR_TABLE[7])
    }
}
