//! Win32 console backend
//!
//! Wraps the standard output, error and input handles of the process console.

use std::io;

use windows::Win32::Foundation::HANDLE;
use windows::Win32::System::Console::{
    AttachConsole, FillConsoleOutputCharacterW, GetConsoleMode, GetConsoleScreenBufferInfo,
    GetNumberOfConsoleInputEvents, GetStdHandle, ReadConsoleInputW, SetConsoleCursorPosition,
    SetConsoleMode, SetConsoleTextAttribute, WriteConsoleW, ATTACH_PARENT_PROCESS,
    CONSOLE_CHARACTER_ATTRIBUTES, CONSOLE_MODE, CONSOLE_SCREEN_BUFFER_INFO, COORD,
    ENABLE_PROCESSED_OUTPUT, ENABLE_WRAP_AT_EOL_OUTPUT, FOCUS_EVENT, INPUT_RECORD, KEY_EVENT,
    MENU_EVENT, MOUSE_EVENT, STD_ERROR_HANDLE, STD_HANDLE, STD_INPUT_HANDLE, STD_OUTPUT_HANDLE,
    WINDOW_BUFFER_SIZE_EVENT,
};

use super::console::{Attribute, Console, ConsoleDefaults, ConsoleError, Coord, Result, ScreenInfo};
use crate::config::ConsoleConfig;
use crate::input::{ControlKeyState, InputRecord, InputSource, KeyRecord};

fn std_handle(which: STD_HANDLE) -> Result<HANDLE> {
    let handle = unsafe { GetStdHandle(which) }.map_err(|e| ConsoleError::StdHandle(e.to_string()))?;
    if handle.is_invalid() {
        return Err(ConsoleError::NoConsole);
    }
    Ok(handle)
}

/// Recover the Win32 error code wrapped in an HRESULT
fn io_error(e: &windows::core::Error) -> io::Error {
    let code = e.code().0 as u32;
    if code & 0xFFFF_0000 == 0x8007_0000 {
        io::Error::from_raw_os_error((code & 0xFFFF) as i32)
    } else {
        io::Error::new(io::ErrorKind::Other, e.to_string())
    }
}

fn to_coord(at: Coord) -> COORD {
    COORD { X: at.x, Y: at.y }
}

fn from_coord(at: COORD) -> Coord {
    Coord::new(at.X, at.Y)
}

/// A console output handle (stdout or stderr)
#[derive(Debug)]
pub struct Win32Console {
    handle: HANDLE,
}

impl Win32Console {
    pub fn stdout() -> Result<Self> {
        Ok(Self {
            handle: std_handle(STD_OUTPUT_HANDLE)?,
        })
    }

    pub fn stderr() -> Result<Self> {
        Ok(Self {
            handle: std_handle(STD_ERROR_HANDLE)?,
        })
    }

    /// Usable terminal size as (columns, rows)
    pub fn terminal_size(&self) -> Result<(u16, u16)> {
        let info = self.screen_info()?;
        let cols = info.max_window.x.saturating_sub(1).max(1) as u16;
        let rows = info.max_window.y.max(1) as u16;
        Ok((cols, rows))
    }

    /// OR `mode` into the handle's console mode
    fn enable_mode(&self, mode: CONSOLE_MODE) -> Result<()> {
        let mut current = CONSOLE_MODE::default();
        unsafe {
            // A redirected handle has no mode; start from empty like the console would
            let _ = GetConsoleMode(self.handle, &mut current);
            SetConsoleMode(self.handle, current | mode).map_err(|e| ConsoleError::Update(e.to_string()))
        }
    }
}

impl Console for Win32Console {
    fn screen_info(&self) -> Result<ScreenInfo> {
        let mut info = CONSOLE_SCREEN_BUFFER_INFO::default();
        unsafe {
            GetConsoleScreenBufferInfo(self.handle, &mut info)
                .map_err(|e| ConsoleError::Query(e.to_string()))?;
        }
        Ok(ScreenInfo {
            size: from_coord(info.dwSize),
            cursor: from_coord(info.dwCursorPosition),
            attributes: Attribute::from_bits_retain(info.wAttributes.0),
            max_window: from_coord(info.dwMaximumWindowSize),
        })
    }

    fn set_cursor_position(&mut self, at: Coord) -> Result<()> {
        unsafe {
            SetConsoleCursorPosition(self.handle, to_coord(at))
                .map_err(|e| ConsoleError::Update(e.to_string()))
        }
    }

    fn fill_output_character(&mut self, ch: char, len: u32, at: Coord) -> Result<u32> {
        let mut unit = [0u16; 2];
        let unit = ch.encode_utf16(&mut unit)[0];
        let mut written = 0u32;
        unsafe {
            FillConsoleOutputCharacterW(self.handle, unit, len, to_coord(at), &mut written)
                .map_err(|e| ConsoleError::Update(e.to_string()))?;
        }
        Ok(written)
    }

    fn set_text_attribute(&mut self, attr: Attribute) -> Result<()> {
        unsafe {
            SetConsoleTextAttribute(self.handle, CONSOLE_CHARACTER_ATTRIBUTES(attr.bits()))
                .map_err(|e| ConsoleError::Update(e.to_string()))
        }
    }

    fn write_text(&mut self, text: &[u8]) -> Result<()> {
        let wide: Vec<u16> = String::from_utf8_lossy(text).encode_utf16().collect();
        if wide.is_empty() {
            return Ok(());
        }
        unsafe {
            WriteConsoleW(self.handle, &wide, None, None).map_err(|e| ConsoleError::Write(io_error(&e)))
        }
    }
}

/// The console input queue
#[derive(Debug)]
pub struct Win32Input {
    handle: HANDLE,
}

impl Win32Input {
    pub fn new() -> Result<Self> {
        Ok(Self {
            handle: std_handle(STD_INPUT_HANDLE)?,
        })
    }
}

impl InputSource for Win32Input {
    fn pending_events(&mut self) -> Result<usize> {
        let mut count = 0u32;
        unsafe {
            GetNumberOfConsoleInputEvents(self.handle, &mut count)
                .map_err(|e| ConsoleError::Read(e.to_string()))?;
        }
        Ok(count as usize)
    }

    fn read_events(&mut self, max: usize) -> Result<Vec<InputRecord>> {
        let mut buffer = vec![INPUT_RECORD::default(); max];
        let mut read = 0u32;
        unsafe {
            ReadConsoleInputW(self.handle, &mut buffer, &mut read)
                .map_err(|e| ConsoleError::Read(e.to_string()))?;
        }
        buffer.truncate(read as usize);
        Ok(buffer.iter().filter_map(convert_record).collect())
    }
}

fn convert_record(record: &INPUT_RECORD) -> Option<InputRecord> {
    // The union member matching EventType is the initialized one
    unsafe {
        match u32::from(record.EventType) {
            KEY_EVENT => {
                let key = record.Event.KeyEvent;
                Some(InputRecord::Key(KeyRecord {
                    key_down: key.bKeyDown.as_bool(),
                    virtual_key: key.wVirtualKeyCode,
                    unicode_char: key.uChar.UnicodeChar,
                    control_state: ControlKeyState::from_bits_retain(key.dwControlKeyState),
                }))
            }
            MOUSE_EVENT => {
                let at = record.Event.MouseEvent.dwMousePosition;
                Some(InputRecord::Mouse {
                    column: at.X.max(0) as u16,
                    row: at.Y.max(0) as u16,
                })
            }
            WINDOW_BUFFER_SIZE_EVENT => {
                let size = record.Event.WindowBufferSizeEvent.dwSize;
                Some(InputRecord::WindowBufferSize {
                    cols: size.X.max(0) as u16,
                    rows: size.Y.max(0) as u16,
                })
            }
            FOCUS_EVENT => Some(InputRecord::Focus {
                gained: record.Event.FocusEvent.bSetFocus.as_bool(),
            }),
            MENU_EVENT => Some(InputRecord::Menu {
                command_id: record.Event.MenuEvent.dwCommandId,
            }),
            other => {
                tracing::debug!("Unknown input record type: {}", other);
                None
            }
        }
    }
}

/// Process console, set up for ANSI translation
#[derive(Debug)]
pub struct Win32Terminal {
    pub stdout: Win32Console,
    /// Diagnostics, kept apart from translated output
    pub stderr: Win32Console,
    pub input: Win32Input,
    pub defaults: ConsoleDefaults,
}

/// Attach to the console, set the output modes and capture the default
/// attribute. Call once, before any output is translated.
pub fn init(config: &ConsoleConfig) -> Result<Win32Terminal> {
    if config.attach_parent {
        // Fails when already attached or when the parent has no console
        if unsafe { AttachConsole(ATTACH_PARENT_PROCESS) }.is_ok() {
            tracing::info!("Attached to parent console");
        }
    }

    let stdout = Win32Console::stdout()?;
    let stderr = Win32Console::stderr()?;

    let mut mode = CONSOLE_MODE::default();
    if config.processed_output {
        mode |= ENABLE_PROCESSED_OUTPUT;
    }
    if config.wrap_at_eol {
        mode |= ENABLE_WRAP_AT_EOL_OUTPUT;
    }
    for console in [&stdout, &stderr] {
        if let Err(e) = console.enable_mode(mode) {
            tracing::warn!("Failed to set console mode: {}", e);
        }
    }

    let defaults = ConsoleDefaults::capture(&stdout)?;
    let input = Win32Input::new()?;

    Ok(Win32Terminal {
        stdout,
        stderr,
        input,
        defaults,
    })
}
