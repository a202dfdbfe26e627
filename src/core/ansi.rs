//! ANSI escape sequence translator
//!
//! Splits an outgoing byte stream into literal text and CSI commands, and
//! replays it on a [`Console`]. Only the sequences programs actually emit at a
//! plain console are honored:
//!
//! ```text
//! ESC [ K          erase to end of line
//! ESC [ A          cursor up one row
//! ESC [ n ; n m    foreground color / reset
//! ```
//!
//! Everything else in CSI form is consumed silently. An ESC that does not
//! start a CSI is written out as a literal byte.

use super::console::{Attribute, Console, ConsoleDefaults, Coord, COLOR_TABLE};

const ESC: u8 = 0x1B;

/// Parameters read per command. The byte after the last one is the opcode.
pub const MAX_PARAMS: usize = 2;

/// One parsed `ESC [ ... <opcode>` sequence
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EscapeCommand {
    /// Final byte; `None` when the buffer ended first
    pub opcode: Option<u8>,
    /// Parameters in order; capture stops at the first unset one
    pub params: [Option<i64>; MAX_PARAMS],
}

impl EscapeCommand {
    /// Captured parameters, in order
    pub fn params(&self) -> impl Iterator<Item = i64> + '_ {
        self.params.iter().map_while(|p| *p)
    }
}

/// A piece of the output stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Bytes to write verbatim
    Text(&'a [u8]),
    Command(EscapeCommand),
}

/// Iterator over the segments of a buffer.
///
/// The buffer is read like a C string: a nul byte ends it.
pub struct Segments<'a> {
    rest: &'a [u8],
}

impl<'a> Segments<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        Self { rest: &buf[..end] }
    }

    /// Parse a CSI body (after `ESC [`) and return it with the unconsumed tail
    fn parse_csi(mut input: &'a [u8]) -> (EscapeCommand, &'a [u8]) {
        let mut cmd = EscapeCommand::default();
        let mut count = 0;

        while count < MAX_PARAMS {
            let Some((value, tail)) = parse_int(input) else {
                break;
            };
            cmd.params[count] = Some(value);
            count += 1;
            input = tail;
            // A ';' after the last stored parameter is consumed; the byte
            // after it is the opcode
            match input.first() {
                Some(b';') => input = &input[1..],
                _ => break,
            }
        }

        if let Some((&code, tail)) = input.split_first() {
            cmd.opcode = Some(code);
            input = tail;
        }

        (cmd, input)
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        if self.rest.is_empty() {
            return None;
        }

        let Some(pos) = self.rest.iter().position(|&b| b == ESC) else {
            let text = self.rest;
            self.rest = &[];
            return Some(Segment::Text(text));
        };

        if pos > 0 {
            let (text, tail) = self.rest.split_at(pos);
            self.rest = tail;
            return Some(Segment::Text(text));
        }

        // At ESC
        if self.rest.get(1) != Some(&b'[') {
            let (esc, tail) = self.rest.split_at(1);
            self.rest = tail;
            return Some(Segment::Text(esc));
        }

        let (cmd, tail) = Self::parse_csi(&self.rest[2..]);
        self.rest = tail;
        Some(Segment::Command(cmd))
    }
}

/// Parse a decimal integer the way `strtol` does: leading whitespace, an
/// optional sign, then digits. Returns `None` when there are no digits.
fn parse_int(input: &[u8]) -> Option<(i64, &[u8])> {
    let mut i = input
        .iter()
        .position(|&b| !matches!(b, b' ' | b'\t' | b'\n' | 0x0B | 0x0C | b'\r'))
        .unwrap_or(input.len());

    let negative = match input.get(i) {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let digits = input[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }

    let value = input[i..i + digits].iter().fold(0i64, |acc, &d| {
        let digit = i64::from(d - b'0');
        if negative {
            acc.saturating_mul(10).saturating_sub(digit)
        } else {
            acc.saturating_mul(10).saturating_add(digit)
        }
    });

    Some((value, &input[i + digits..]))
}

/// Replays ANSI output on a console
#[derive(Clone, Copy, Debug)]
pub struct AnsiWriter<'d> {
    defaults: &'d ConsoleDefaults,
}

impl<'d> AnsiWriter<'d> {
    pub fn new(defaults: &'d ConsoleDefaults) -> Self {
        Self { defaults }
    }

    /// Write `buf` to `console`, executing the escape sequences it contains.
    ///
    /// Never fails: a native call that errors is skipped.
    pub fn write<C: Console + ?Sized>(&self, console: &mut C, buf: &[u8]) {
        for segment in Segments::new(buf) {
            match segment {
                Segment::Text(text) => {
                    if let Err(e) = console.write_text(text) {
                        tracing::trace!("Console write failed: {}", e);
                    }
                }
                Segment::Command(cmd) => self.execute(console, &cmd),
            }
        }
    }

    /// Execute a single parsed command
    pub fn execute<C: Console + ?Sized>(&self, console: &mut C, cmd: &EscapeCommand) {
        let Some(code) = cmd.opcode else {
            return;
        };

        let result = match code {
            b'K' => Self::erase_to_eol(console),
            b'A' => Self::cursor_up(console),
            b'm' => self.select_graphic_rendition(console, cmd),
            _ => {
                tracing::debug!("Ignored CSI: params={:?}, final={:?}", cmd.params, code as char);
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::trace!("CSI {:?} failed: {}", code as char, e);
        }
    }

    fn erase_to_eol<C: Console + ?Sized>(console: &mut C) -> super::console::Result<()> {
        let info = console.screen_info()?;
        let at = info.cursor;
        let len = (i32::from(info.size.x) - i32::from(at.x)).max(0) as u32;
        // The fill can leave the cursor elsewhere on some hosts; put it back either way
        let filled = console.fill_output_character(' ', len, at);
        console.set_cursor_position(at)?;
        filled.map(|_| ())
    }

    fn cursor_up<C: Console + ?Sized>(console: &mut C) -> super::console::Result<()> {
        let info = console.screen_info()?;
        let at = Coord::new(info.cursor.x, info.cursor.y.saturating_sub(1));
        console.set_cursor_position(at)
    }

    fn select_graphic_rendition<C: Console + ?Sized>(
        &self,
        console: &mut C,
        cmd: &EscapeCommand,
    ) -> super::console::Result<()> {
        // No parameters: nothing changes (no implicit reset)
        for param in cmd.params() {
            match param {
                p if p <= 0 => console.set_text_attribute(self.defaults.default_attr())?,
                p @ 1..=7 => console.set_text_attribute(
                    COLOR_TABLE[p as usize] | Attribute::FOREGROUND_INTENSITY,
                )?,
                _ => {}
            }
        }
        Ok(())
    }
}
