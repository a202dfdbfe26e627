//! In-memory console
//!
//! A cell grid that behaves like a native screen buffer with processed output
//! and wrap-at-EOL enabled. It records the calls made against it, which makes
//! it the test double for the translators, and it can paint itself onto a real
//! terminal for the demo mode off Windows.

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use unicode_width::UnicodeWidthChar;

use super::console::{Attribute, Console, ConsoleDefaults, ConsoleError, Coord, Result, ScreenInfo};

const TAB_WIDTH: i16 = 8;

/// A single screen cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub attr: Attribute,
    /// Right half of a wide character
    pub continuation: bool,
}

impl Cell {
    fn blank(attr: Attribute) -> Self {
        Self {
            ch: ' ',
            attr,
            continuation: false,
        }
    }
}

/// Screen buffer kept in memory
#[derive(Clone, Debug)]
pub struct MemoryConsole {
    width: i16,
    height: i16,
    rows: Vec<Vec<Cell>>,
    cursor: Coord,
    attr: Attribute,
    written: Vec<u8>,
    fills: Vec<(Coord, u32)>,
    attribute_changes: usize,
    failing: bool,
}

impl MemoryConsole {
    pub fn new(width: u16, height: u16) -> Self {
        Self::with_attribute(width, height, ConsoleDefaults::default().default_attr())
    }

    pub fn with_attribute(width: u16, height: u16, attr: Attribute) -> Self {
        let width = width.clamp(1, i16::MAX as u16) as i16;
        let height = height.clamp(1, i16::MAX as u16) as i16;
        Self {
            width,
            height,
            rows: vec![vec![Cell::blank(attr); width as usize]; height as usize],
            cursor: Coord::default(),
            attr,
            written: Vec::new(),
            fills: Vec::new(),
            attribute_changes: 0,
            failing: false,
        }
    }

    pub fn cursor(&self) -> Coord {
        self.cursor
    }

    /// Move the cursor without going through the `Console` trait
    pub fn set_cursor(&mut self, at: Coord) {
        self.cursor = at;
    }

    pub fn attribute(&self) -> Attribute {
        self.attr
    }

    /// Number of successful `set_text_attribute` calls
    pub fn attribute_changes(&self) -> usize {
        self.attribute_changes
    }

    /// All bytes passed to `write_text`, concatenated
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// `(start, length)` of every fill request
    pub fn fills(&self) -> &[(Coord, u32)] {
        &self.fills
    }

    /// Make every subsequent console call fail
    pub fn fail_calls(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn cell(&self, x: i16, y: i16) -> Option<&Cell> {
        let row = self.rows.get(usize::try_from(y).ok()?)?;
        row.get(usize::try_from(x).ok()?)
    }

    /// Text of a row with trailing blanks removed
    pub fn row_text(&self, y: i16) -> String {
        let Some(row) = usize::try_from(y).ok().and_then(|y| self.rows.get(y)) else {
            return String::new();
        };
        let text: String = row.iter().filter(|c| !c.continuation).map(|c| c.ch).collect();
        text.trim_end_matches(' ').to_string()
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            Err(ConsoleError::Update("simulated failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn contains(&self, at: Coord) -> bool {
        (0..self.width).contains(&at.x) && (0..self.height).contains(&at.y)
    }

    fn newline(&mut self) {
        self.cursor.x = 0;
        self.cursor.y = self.cursor.y.saturating_add(1);
        if self.cursor.y >= self.height {
            self.rows.remove(0);
            self.rows.push(vec![Cell::blank(self.attr); self.width as usize]);
            self.cursor.y = self.height - 1;
        }
    }

    fn put_char(&mut self, ch: char) {
        let width = match ch.width() {
            Some(0) => return,
            Some(w) => w as i16,
            None => 1,
        };

        if self.cursor.x + width > self.width {
            self.newline();
        }

        let attr = self.attr;
        let x = usize::try_from(self.cursor.x).ok();
        let row = usize::try_from(self.cursor.y).ok().and_then(|y| self.rows.get_mut(y));
        // Positions off the buffer still advance the cursor but draw nothing
        if let (Some(x), Some(row)) = (x, row) {
            row[x] = Cell {
                ch,
                attr,
                continuation: false,
            };
            if width == 2 {
                row[x + 1] = Cell {
                    ch: ' ',
                    attr,
                    continuation: true,
                };
            }
        }

        self.cursor.x += width;
        if self.cursor.x >= self.width {
            self.newline();
        }
    }

    /// Paint the used part of the buffer onto a terminal
    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let last = self
            .rows
            .iter()
            .rposition(|row| row.iter().any(|c| c.ch != ' '))
            .unwrap_or(0)
            .max(usize::try_from(self.cursor.y).unwrap_or(0));

        for row in self.rows.iter().take(last + 1) {
            let mut current = None;
            for cell in row.iter().filter(|c| !c.continuation) {
                if current != Some(cell.attr) {
                    let (fg, bg) = terminal_colors(cell.attr);
                    queue!(out, SetForegroundColor(fg), SetBackgroundColor(bg))?;
                    current = Some(cell.attr);
                }
                let ch = if cell.ch.is_control() { ' ' } else { cell.ch };
                queue!(out, Print(ch))?;
            }
            queue!(out, ResetColor, Print("\r\n"))?;
        }
        out.flush()
    }
}

impl Console for MemoryConsole {
    fn screen_info(&self) -> Result<ScreenInfo> {
        if self.failing {
            return Err(ConsoleError::Query("simulated failure".to_string()));
        }
        Ok(ScreenInfo {
            size: Coord::new(self.width, self.height),
            cursor: self.cursor,
            attributes: self.attr,
            max_window: Coord::new(self.width, self.height),
        })
    }

    /// Any position is accepted, including rows above the buffer
    fn set_cursor_position(&mut self, at: Coord) -> Result<()> {
        self.check()?;
        self.cursor = at;
        Ok(())
    }

    fn fill_output_character(&mut self, ch: char, len: u32, at: Coord) -> Result<u32> {
        self.check()?;
        if !self.contains(at) {
            return Err(ConsoleError::Update(format!("fill origin {:?} outside buffer", at)));
        }
        self.fills.push((at, len));

        // Runs past the end of a row continue on the next one, up to the buffer end
        let start = at.y as usize * self.width as usize + at.x as usize;
        let total = self.width as usize * self.height as usize;
        let end = start.saturating_add(len as usize).min(total);
        for index in start..end {
            let cell = &mut self.rows[index / self.width as usize][index % self.width as usize];
            cell.ch = ch;
            cell.continuation = false;
        }
        Ok((end - start) as u32)
    }

    fn set_text_attribute(&mut self, attr: Attribute) -> Result<()> {
        self.check()?;
        self.attr = attr;
        self.attribute_changes += 1;
        Ok(())
    }

    fn write_text(&mut self, text: &[u8]) -> Result<()> {
        if self.failing {
            return Err(ConsoleError::Write(io::Error::new(
                io::ErrorKind::Other,
                "simulated failure",
            )));
        }
        self.written.extend_from_slice(text);

        for ch in String::from_utf8_lossy(text).chars() {
            match ch {
                '\n' => self.newline(),
                '\r' => self.cursor.x = 0,
                '\t' => {
                    let next = (self.cursor.x / TAB_WIDTH + 1) * TAB_WIDTH;
                    self.cursor.x = next.min(self.width - 1);
                }
                '\x08' => self.cursor.x = (self.cursor.x - 1).max(0),
                '\x07' => {}
                _ => self.put_char(ch),
            }
        }
        Ok(())
    }
}

/// Native attribute to terminal colors
fn terminal_colors(attr: Attribute) -> (Color, Color) {
    let bits = attr.bits();
    let fg = ansi_color(bits & 0x7, bits & 0x8 != 0);
    let bg = ansi_color((bits >> 4) & 0x7, bits & 0x80 != 0);
    (fg, bg)
}

/// Native BGR triplet to the terminal's 16-color palette
fn ansi_color(bgr: u16, bright: bool) -> Color {
    match (bgr, bright) {
        (0, false) => Color::Black,
        (0, true) => Color::DarkGrey,
        (1, false) => Color::DarkBlue,
        (1, true) => Color::Blue,
        (2, false) => Color::DarkGreen,
        (2, true) => Color::Green,
        (3, false) => Color::DarkCyan,
        (3, true) => Color::Cyan,
        (4, false) => Color::DarkRed,
        (4, true) => Color::Red,
        (5, false) => Color::DarkMagenta,
        (5, true) => Color::Magenta,
        (6, false) => Color::DarkYellow,
        (6, true) => Color::Yellow,
        (_, false) => Color::Grey,
        (_, true) => Color::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_wraps_and_scrolls() {
        let mut console = MemoryConsole::new(4, 2);
        console.write_text(b"abcdefgh").unwrap();

        // "abcd" scrolled off, the cursor sits on a fresh last row
        assert_eq!(console.row_text(0), "efgh");
        assert_eq!(console.row_text(1), "");
        assert_eq!(console.cursor(), Coord::new(0, 1));
    }

    #[test]
    fn test_control_characters() {
        let mut console = MemoryConsole::new(20, 3);
        console.write_text(b"ab\tc\rX\x08Y\nz").unwrap();
        assert_eq!(console.row_text(0), "Yb      c");
        assert_eq!(console.row_text(1), "z");
    }

    #[test]
    fn test_wide_characters() {
        let mut console = MemoryConsole::new(5, 2);
        console.write_text("a\u{4e16}b".as_bytes()).unwrap();
        assert_eq!(console.row_text(0), "a\u{4e16}b");
        assert_eq!(console.cursor(), Coord::new(4, 0));
        assert!(console.cell(2, 0).unwrap().continuation);

        // No room for another wide char on this row
        console.write_text("\u{754c}".as_bytes()).unwrap();
        assert_eq!(console.row_text(1), "\u{754c}");
    }

    #[test]
    fn test_fill_keeps_cursor_and_attributes() {
        let mut console = MemoryConsole::new(6, 2);
        console.write_text(b"abcdef").unwrap();
        console.set_cursor(Coord::new(2, 0));
        let red = Attribute::FOREGROUND_RED;
        console.set_text_attribute(red).unwrap();

        let filled = console.fill_output_character('-', 10, Coord::new(2, 0)).unwrap();
        assert_eq!(filled, 10);
        assert_eq!(console.row_text(0), "ab----");
        assert_eq!(console.row_text(1), "------");
        assert_eq!(console.cursor(), Coord::new(2, 0));
        assert_ne!(console.cell(3, 0).unwrap().attr, red);
    }

    #[test]
    fn test_fill_clipped_at_buffer_end() {
        let mut console = MemoryConsole::new(4, 2);
        let filled = console.fill_output_character('x', 100, Coord::new(1, 1)).unwrap();
        assert_eq!(filled, 3);
        assert!(console.fill_output_character('x', 1, Coord::new(0, 2)).is_err());
    }

    #[test]
    fn test_render_uses_colors() {
        let mut console = MemoryConsole::new(4, 2);
        console.set_text_attribute(Attribute::FOREGROUND_RED | Attribute::FOREGROUND_INTENSITY).unwrap();
        console.write_text(b"hi").unwrap();

        let mut out = Vec::new();
        console.render(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("hi"));
        assert_eq!(out.matches("\r\n").count(), 1);
    }

    #[test]
    fn test_terminal_colors() {
        assert_eq!(terminal_colors(Attribute::from_bits_retain(0x07)), (Color::Grey, Color::Black));
        assert_eq!(terminal_colors(Attribute::from_bits_retain(0x1e)), (Color::Yellow, Color::DarkBlue));
    }
}
