//! Input source backed by `crossterm` events
//!
//! Lets the key translator run on any terminal crossterm supports. Key events
//! are converted back into native-style key records: navigation keys get their
//! virtual key and the extended flag, everything else carries its character.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode as TermKey, KeyEvent, KeyEventKind, KeyModifiers};

use super::keymap::vk;
use super::{ControlKeyState, InputRecord, InputSource, KeyRecord};
use crate::core::console::{ConsoleError, Result};

/// Terminal event queue. Raw mode is the caller's business.
#[derive(Debug, Default)]
pub struct TermEvents;

impl TermEvents {
    pub fn new() -> Self {
        Self
    }

    fn ready() -> Result<bool> {
        event::poll(Duration::ZERO).map_err(|e| ConsoleError::Read(e.to_string()))
    }
}

impl InputSource for TermEvents {
    /// crossterm cannot count its queue; reports 1 when anything is ready
    fn pending_events(&mut self) -> Result<usize> {
        Ok(usize::from(Self::ready()?))
    }

    fn read_events(&mut self, max: usize) -> Result<Vec<InputRecord>> {
        let mut records = Vec::new();
        while records.len() < max && Self::ready()? {
            let event = event::read().map_err(|e| ConsoleError::Read(e.to_string()))?;
            if let Some(record) = convert_event(&event) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

/// Convert a terminal event to a native input record
pub fn convert_event(event: &Event) -> Option<InputRecord> {
    match event {
        Event::Key(key) => convert_key(key).map(InputRecord::Key),
        Event::Mouse(mouse) => Some(InputRecord::Mouse {
            column: mouse.column,
            row: mouse.row,
        }),
        Event::Resize(cols, rows) => Some(InputRecord::WindowBufferSize {
            cols: *cols,
            rows: *rows,
        }),
        Event::FocusGained => Some(InputRecord::Focus { gained: true }),
        Event::FocusLost => Some(InputRecord::Focus { gained: false }),
        Event::Paste(_) => None,
    }
}

fn convert_key(key: &KeyEvent) -> Option<KeyRecord> {
    let mut control_state = ControlKeyState::empty();
    if key.modifiers.contains(KeyModifiers::SHIFT) {
        control_state |= ControlKeyState::SHIFT_PRESSED;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        control_state |= ControlKeyState::LEFT_CTRL_PRESSED;
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        control_state |= ControlKeyState::LEFT_ALT_PRESSED;
    }

    let (virtual_key, unicode_char, extended) = match key.code {
        TermKey::Char(ch) => (char_virtual_key(ch), char_unit(ch, key.modifiers), false),
        TermKey::Enter => (vk::RETURN, 0x0D, false),
        TermKey::Tab => (vk::TAB, 0x09, false),
        TermKey::BackTab => {
            control_state |= ControlKeyState::SHIFT_PRESSED;
            (vk::TAB, 0x09, false)
        }
        TermKey::Backspace => (vk::BACK, 0x08, false),
        TermKey::Esc => (vk::ESCAPE, 0x1B, false),
        TermKey::Left => (vk::LEFT, 0, true),
        TermKey::Right => (vk::RIGHT, 0, true),
        TermKey::Up => (vk::UP, 0, true),
        TermKey::Down => (vk::DOWN, 0, true),
        TermKey::Home => (vk::HOME, 0, true),
        TermKey::End => (vk::END, 0, true),
        TermKey::PageUp => (vk::PRIOR, 0, true),
        TermKey::PageDown => (vk::NEXT, 0, true),
        TermKey::Insert => (vk::INSERT, 0, true),
        TermKey::Delete => (vk::DELETE, 0, true),
        TermKey::F(n @ 1..=24) => (vk::F1 + u16::from(n) - 1, 0, false),
        TermKey::Pause => (vk::PAUSE, 0, false),
        TermKey::PrintScreen => (vk::SNAPSHOT, 0, false),
        TermKey::Menu => (vk::APPS, 0, false),
        _ => return None,
    };

    if extended {
        control_state |= ControlKeyState::ENHANCED_KEY;
    }

    Some(KeyRecord {
        key_down: key.kind != KeyEventKind::Release,
        virtual_key,
        unicode_char,
        control_state,
    })
}

/// Letters and digits have virtual keys equal to their uppercase ASCII
fn char_virtual_key(ch: char) -> u16 {
    if ch.is_ascii_alphanumeric() {
        ch.to_ascii_uppercase() as u16
    } else {
        0
    }
}

/// UTF-16 unit a console would report for `ch`. Ctrl+letter gives the
/// control code; characters outside the BMP give 0.
fn char_unit(ch: char, modifiers: KeyModifiers) -> u16 {
    if modifiers.contains(KeyModifiers::CONTROL) && ch.is_ascii_alphabetic() {
        return u16::from(ch.to_ascii_uppercase() as u8 - b'@');
    }
    let mut units = [0u16; 2];
    match ch.encode_utf16(&mut units) {
        [unit] => *unit,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{keys, KeyCode, KeyTranslator, VirtualKeyMap};

    fn press(code: TermKey, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    fn translate(event: Event) -> Option<KeyCode> {
        match convert_event(&event)? {
            InputRecord::Key(key) if key.key_down => KeyTranslator::new(VirtualKeyMap).translate(&key),
            _ => None,
        }
    }

    #[test]
    fn test_navigation_keys_are_extended() {
        let Some(InputRecord::Key(key)) = convert_event(&press(TermKey::Home, KeyModifiers::NONE)) else {
            panic!("expected key record");
        };
        assert!(key.is_extended());
        assert_eq!(key.virtual_key, vk::HOME);
        assert_eq!(translate(press(TermKey::Home, KeyModifiers::NONE)), Some(keys::HOME));
        assert_eq!(translate(press(TermKey::Down, KeyModifiers::NONE)), Some(keys::DOWN));
    }

    #[test]
    fn test_characters() {
        assert_eq!(translate(press(TermKey::Char('a'), KeyModifiers::NONE)), Some(KeyCode('a' as u32)));
        assert_eq!(translate(press(TermKey::Char('A'), KeyModifiers::SHIFT)), Some(KeyCode('A' as u32)));
        assert_eq!(translate(press(TermKey::Char('c'), KeyModifiers::CONTROL)), Some(KeyCode(3)));
        assert_eq!(translate(press(TermKey::Char('\u{1F600}'), KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_special_keys() {
        assert_eq!(translate(press(TermKey::Enter, KeyModifiers::NONE)), Some(keys::ENTER));
        assert_eq!(translate(press(TermKey::Esc, KeyModifiers::NONE)), Some(keys::ESC));
        assert_eq!(translate(press(TermKey::F(5), KeyModifiers::NONE)), Some(KeyCode::function(5)));
        assert_eq!(translate(press(TermKey::BackTab, KeyModifiers::SHIFT)), Some(keys::TAB));
    }

    #[test]
    fn test_release_is_key_up() {
        let mut event = KeyEvent::new(TermKey::Char('x'), KeyModifiers::NONE);
        event.kind = KeyEventKind::Release;
        let Some(InputRecord::Key(key)) = convert_event(&Event::Key(event)) else {
            panic!("expected key record");
        };
        assert!(!key.key_down);
    }

    #[test]
    fn test_other_events() {
        assert_eq!(convert_event(&Event::Resize(100, 40)), Some(InputRecord::WindowBufferSize { cols: 100, rows: 40 }));
        assert_eq!(convert_event(&Event::FocusLost), Some(InputRecord::Focus { gained: false }));
        assert_eq!(convert_event(&Event::Paste("x".to_string())), None);
    }
}
